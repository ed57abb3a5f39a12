
use std::fmt::Write as _;

use chrono::{DateTime, TimeZone};

use super::{Assessment, Evidence, duplicate_claims, top_overlaps};
use crate::config::Thresholds;
use crate::embeddings::truncate_chars;
use crate::factual::format_value;

const CLAIM_LABEL_CHARS: usize = 180;
const EVIDENCE_SNIPPET_CHARS: usize = 200;
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

fn joined_or(items: &[String], empty: &str) -> String {
    if items.is_empty() {
        empty.to_string()
    } else {
        items.join("; ")
    }
}

/// `TRUE`/`FALSE` line per mapped claim. A claim matching existing work is
/// labelled `FALSE`.
#[inline]
pub fn claim_label_lines(evidence: &Evidence) -> Vec<String> {
    match &evidence.claims {
        Some(claims) if !claims.mappings.is_empty() => claims
            .mappings
            .iter()
            .map(|m| {
                format!(
                    "{} → {} (sim={})",
                    if m.is_novel { "TRUE" } else { "FALSE" },
                    truncate_chars(&m.claim, CLAIM_LABEL_CHARS),
                    m.similarity
                )
            })
            .collect(),
        _ => vec![
            "No candidate claims were extracted from the paper. To enable claim labeling, run the claims stage so it produces mappings."
                .to_string(),
        ],
    }
}

#[inline]
pub fn overlap_lines(evidence: &Evidence, k: usize) -> Vec<String> {
    let Some(plagiarism) = &evidence.plagiarism else {
        return vec!["No plagiarism report found.".to_string()];
    };

    let top = top_overlaps(plagiarism, k);
    if top.is_empty() {
        return vec!["No overlaps reported by plagiarism step.".to_string()];
    }

    top.into_iter()
        .map(|overlap| {
            let source = match &overlap.link {
                Some(link) => format!("[{}]({})", overlap.pdf_name, link),
                None => overlap.pdf_name.clone(),
            };
            format!(
                "- {} (score={:.3}) — {}...",
                source,
                overlap.score,
                truncate_chars(&overlap.chunk, EVIDENCE_SNIPPET_CHARS)
            )
        })
        .collect()
}

#[inline]
pub fn duplicate_claim_lines(evidence: &Evidence, thresholds: &Thresholds) -> Vec<String> {
    let Some(claims) = &evidence.claims else {
        return vec!["No claim mapping available.".to_string()];
    };

    let (mappings, exact) =
        duplicate_claims(claims, thresholds.exact_match, thresholds.evidence_count);
    if mappings.is_empty() {
        return vec!["No claims were mapped against prior work.".to_string()];
    }

    mappings
        .into_iter()
        .map(|m| {
            let claim = truncate_chars(&m.claim, EVIDENCE_SNIPPET_CHARS);
            if exact {
                format!("- sim={:.3} — {}...", m.similarity, claim)
            } else {
                format!(
                    "- sim={:.3} — {} ({}) — {}...",
                    m.similarity,
                    m.matched_paper_title.as_deref().unwrap_or("Unknown"),
                    m.matched_paper_link.as_deref().unwrap_or_default(),
                    claim
                )
            }
        })
        .collect()
}

/// Recommendation paragraph ending in the decision
#[inline]
pub fn final_recommendation(assessment: &Assessment, thresholds: &Thresholds) -> String {
    if assessment.exact_match {
        return format!(
            "The analysis found near-exact reuse of prior text/claims (exact-match similarity >= {:.3}). This is a serious integrity issue.\n\
             Recommendation: **Reject**. The manuscript must be substantially rewritten to remove copied content, clearly attribute prior work, and re-state original contributions before reconsideration.",
            thresholds.exact_match
        );
    }

    let mut parts = Vec::new();
    for (label, items) in [
        ("Strengths", &assessment.strengths),
        ("Weaknesses", &assessment.weaknesses),
        ("Suggestions", &assessment.suggestions),
    ] {
        if !items.is_empty() {
            parts.push(format!("{}: {}.", label, items.join("; ")));
        }
    }

    format!(
        "{}\n\n**Decision: {}** — {}",
        parts.join("\n"),
        assessment.decision,
        assessment.decision.rationale()
    )
}

/// Nine-section review text
#[inline]
pub fn render_review<Tz>(
    evidence: &Evidence,
    assessment: &Assessment,
    thresholds: &Thresholds,
    narrative: Option<&str>,
    generated_at: &DateTime<Tz>,
) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    let k = thresholds.evidence_count;
    let citation = assessment
        .citation_score
        .map_or_else(|| "N/A".to_string(), format_value);
    let scores = &assessment.scores;

    let mut out = String::new();
    let _ = writeln!(out, "**1. Summary of the Paper**");
    let _ = writeln!(
        out,
        "This paper addresses a research problem of interest. Top similarity to corpus: {:.3}. Citation quality score: {}.",
        assessment.novelty.best_similarity, citation
    );
    if let Some(narrative) = narrative.map(str::trim).filter(|n| !n.is_empty()) {
        let _ = writeln!(out, "\n{}", narrative);
    }

    let _ = writeln!(out, "\n**2. Strengths**");
    let _ = writeln!(out, "- {}", joined_or(&assessment.strengths, "None identified."));
    let _ = writeln!(out, "\n**3. Weaknesses**");
    let _ = writeln!(out, "- {}", joined_or(&assessment.weaknesses, "None identified."));
    let _ = writeln!(out, "\n**4. Suggestions for Improvement**");
    let _ = writeln!(
        out,
        "- {}",
        joined_or(&assessment.suggestions, "No major suggestions provided.")
    );

    let _ = writeln!(out, "\n**5. Section-wise Scores (0–10 each)**");
    let _ = writeln!(out, "- Novelty: {}", scores.novelty);
    let _ = writeln!(out, "- Claims (Citation Quality): {}", scores.claims);
    let _ = writeln!(out, "- Plagiarism: {}", scores.plagiarism);
    let _ = writeln!(out, "- Factual Accuracy: {}", scores.factual_accuracy);

    let _ = writeln!(out, "\n**6. Claim Labels (TRUE/FALSE)**");
    for line in claim_label_lines(evidence) {
        let _ = writeln!(out, "{}", line);
    }

    let _ = writeln!(out, "\n**7. Plagiarism / Overlap Evidence (top {})**", k);
    for line in overlap_lines(evidence, k) {
        let _ = writeln!(out, "{}", line);
    }

    let _ = writeln!(out, "\n**8. Duplicate Claim Evidence (top {})**", k);
    for line in duplicate_claim_lines(evidence, thresholds) {
        let _ = writeln!(out, "{}", line);
    }

    let _ = writeln!(out, "\n**9. Final Recommendation**");
    let _ = writeln!(out, "{}", final_recommendation(assessment, thresholds));

    let _ = writeln!(out, "\n---");
    let _ = writeln!(out, "Generated on {}", generated_at.format(TIMESTAMP_FORMAT));

    out
}

/// Prompt asking a language model for a short reviewer summary of the
/// assessment. The model never sees or changes the decision logic.
#[inline]
pub fn narrative_prompt(assessment: &Assessment) -> String {
    let scores = &assessment.scores;
    format!(
        "You are an experienced peer reviewer. Write one concise paragraph (at most 120 words) \
         summarizing the automated review below for the authors. Do not change the decision.\n\n\
         Decision: {}\n\
         Scores (0-10): novelty {}, claims {}, plagiarism {}, factual accuracy {}\n\
         Strengths: {}\n\
         Weaknesses: {}\n\
         Suggestions: {}\n",
        assessment.decision,
        scores.novelty,
        scores.claims,
        scores.plagiarism,
        scores.factual_accuracy,
        joined_or(&assessment.strengths, "none"),
        joined_or(&assessment.weaknesses, "none"),
        joined_or(&assessment.suggestions, "none"),
    )
}
