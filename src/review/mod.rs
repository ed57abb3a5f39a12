// Evidence synthesis
// Per-axis scores and the final decision from every stage's report


pub mod report;

pub use report::{narrative_prompt, render_review};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::citations::CitationReport;
use crate::claims::{ClaimMapping, ClaimMappingReport};
use crate::config::Thresholds;
use crate::factual::FactualReport;
use crate::novelty::NoveltyReport;
use crate::overlap::{OverlapMatch, PlagiarismReport};

const MAX_SCORE: u8 = 10;
/// Claims score when no citation analysis exists
const NEUTRAL_SCORE: u8 = 5;
/// Citation quality at or above this is a strength
const GOOD_CITATION_QUALITY: f64 = 7.0;
/// Citation quality below this is a weakness
const POOR_CITATION_QUALITY: f64 = 5.0;
/// Combined overlaps from which the plagiarism score is lowest
const MANY_OVERLAPS: usize = 5;

/// Every stage report available for one paper
#[derive(Debug, Clone, Default)]
pub struct Evidence {
    pub citation: Option<CitationReport>,
    pub novelty: Option<NoveltyReport>,
    pub plagiarism: Option<PlagiarismReport>,
    pub factual: Option<FactualReport>,
    pub claims: Option<ClaimMappingReport>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NoveltyStats {
    pub best_similarity: f32,
    pub mean_top_similarity: f32,
    pub score: u8,
    pub num_results: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scores {
    pub novelty: u8,
    pub claims: u8,
    pub plagiarism: u8,
    pub factual_accuracy: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Decision {
    #[serde(rename = "Reject")]
    Reject,
    #[serde(rename = "Major Revisions")]
    MajorRevisions,
    #[serde(rename = "Minor Revisions")]
    MinorRevisions,
    #[serde(rename = "Accept with Minor Revisions")]
    AcceptWithMinorRevisions,
}

impl Decision {
    #[inline]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Reject => "Reject",
            Self::MajorRevisions => "Major Revisions",
            Self::MinorRevisions => "Minor Revisions",
            Self::AcceptWithMinorRevisions => "Accept with Minor Revisions",
        }
    }

    /// One-line reason shown with the decision
    #[inline]
    pub fn rationale(self) -> &'static str {
        match self {
            Self::Reject => {
                "Serious originality/plagiarism concerns. Please substantially rewrite and resubmit."
            }
            Self::MajorRevisions => {
                "The manuscript has important issues (novelty/originality) to address."
            }
            Self::MinorRevisions => "Fix factual issues and clarify methods/results.",
            Self::AcceptWithMinorRevisions => {
                "Overall solid, but polish presentation and address minor issues."
            }
        }
    }
}

impl std::fmt::Display for Decision {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Scores, decision and narrative evidence for one paper
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assessment {
    pub novelty: NoveltyStats,
    pub citation_score: Option<f64>,
    pub total_overlaps: Option<usize>,
    pub factual_issues: usize,
    pub scores: Scores,
    /// An overlap or claim reached the exact-match threshold
    pub exact_match: bool,
    pub decision: Decision,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    pub suggestions: Vec<String>,
}

fn round_score(value: f64) -> u8 {
    value.round_ties_even().clamp(0.0, f64::from(MAX_SCORE)) as u8
}

/// `round(10 * (1 - best_similarity))` clamped to [0, 10]
#[inline]
pub fn novelty_score(best_similarity: f32) -> u8 {
    round_score(10.0 * (1.0 - f64::from(best_similarity)))
}

/// Best and mean top-`k` similarity of the novelty results. No results
/// scores the maximum.
#[inline]
pub fn novelty_stats(report: Option<&NoveltyReport>, k: usize) -> NoveltyStats {
    match report.filter(|r| !r.results.is_empty()) {
        Some(report) => {
            let best = report.best_similarity();
            NoveltyStats {
                best_similarity: best,
                mean_top_similarity: report.mean_top_similarity(k),
                score: novelty_score(best),
                num_results: report.results.len(),
            }
        }
        None => NoveltyStats {
            best_similarity: 0.0,
            mean_top_similarity: 0.0,
            score: MAX_SCORE,
            num_results: 0,
        },
    }
}

/// 10 without overlaps, 5 below five combined overlaps, 2 otherwise
#[inline]
pub fn plagiarism_score(total_overlaps: Option<usize>) -> u8 {
    match total_overlaps {
        None | Some(0) => MAX_SCORE,
        Some(n) if n < MANY_OVERLAPS => 5,
        Some(_) => 2,
    }
}

#[inline]
pub fn factual_score(issue_count: usize) -> u8 {
    if issue_count == 0 {
        MAX_SCORE
    } else {
        8_usize.saturating_sub(issue_count).max(1) as u8
    }
}

/// Citation quality rounded, or the neutral score without it
#[inline]
pub fn claims_score(citation_quality: Option<f64>) -> u8 {
    citation_quality.map_or(NEUTRAL_SCORE, round_score)
}

/// Decision by strict priority: an exact match rejects outright, then the
/// score rules apply in order.
#[inline]
pub fn decide(scores: &Scores, exact_match: bool) -> Decision {
    if exact_match || scores.plagiarism <= 2 || scores.novelty <= 2 {
        Decision::Reject
    } else if scores.novelty <= 4 || scores.plagiarism <= 4 {
        Decision::MajorRevisions
    } else if scores.factual_accuracy <= 5 {
        Decision::MinorRevisions
    } else {
        Decision::AcceptWithMinorRevisions
    }
}

/// The `k` highest-scoring overlaps of both kinds
#[inline]
pub fn top_overlaps(report: &PlagiarismReport, k: usize) -> Vec<&OverlapMatch> {
    let mut ranked = report.ranked_overlaps();
    ranked.truncate(k);
    ranked
}

/// Claim mappings at or above the exact-match threshold, or the most similar
/// mappings when there are none. The flag tells which of the two was returned.
#[inline]
pub fn duplicate_claims(
    report: &ClaimMappingReport,
    exact_match: f32,
    k: usize,
) -> (Vec<&ClaimMapping>, bool) {
    let exact: Vec<&ClaimMapping> = report
        .mappings
        .iter()
        .filter(|m| m.similarity >= exact_match)
        .take(k)
        .collect();
    if !exact.is_empty() {
        return (exact, true);
    }

    let mut closest: Vec<&ClaimMapping> = report.mappings.iter().collect();
    closest.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
    closest.truncate(k);
    (closest, false)
}

/// Whether any overlap or claim reaches `exact_match`
#[inline]
pub fn has_exact_match(evidence: &Evidence, exact_match: f32) -> bool {
    let overlap_exact = evidence.plagiarism.as_ref().is_some_and(|p| {
        p.exact_overlap
            .iter()
            .chain(&p.paraphrase_overlap)
            .any(|o| o.score >= exact_match)
    });
    let claim_exact = evidence
        .claims
        .as_ref()
        .is_some_and(|c| c.mappings.iter().any(|m| m.similarity >= exact_match));
    overlap_exact || claim_exact
}

/// Score every axis, decide, and collect the narrative evidence
#[inline]
pub fn assess(evidence: &Evidence, thresholds: &Thresholds) -> Assessment {
    let mut strengths = Vec::new();
    let mut weaknesses = Vec::new();
    let mut suggestions = Vec::new();

    let citation_score = evidence
        .citation
        .as_ref()
        .map(|c| c.analysis.citation_quality_score);
    match citation_score {
        Some(score) if score >= GOOD_CITATION_QUALITY => {
            strengths.push("Good citation quality (diverse and recent references).".to_string());
        }
        Some(score) if score < POOR_CITATION_QUALITY => {
            weaknesses.push(
                "Citation quality is low or many missing DOIs/outdated references.".to_string(),
            );
            suggestions.push(
                "Update references and include more recent and diverse citations.".to_string(),
            );
        }
        Some(_) => {}
        None => strengths.push("Citation analysis unavailable.".to_string()),
    }

    let novelty = novelty_stats(evidence.novelty.as_ref(), thresholds.evidence_count);
    let best = novelty.best_similarity;
    if novelty.num_results == 0 {
        strengths.push("No similar papers found in the corpus (novel signal).".to_string());
    } else if best >= thresholds.exact_match {
        weaknesses.push(format!(
            "Top similarity = {:.3} (near-exact match with an existing paper).",
            best
        ));
        suggestions.push("Rewrite sections identical to prior work and clearly cite them.".to_string());
    } else if best >= thresholds.not_novel_similarity {
        weaknesses.push(format!("High similarity found (top similarity = {:.3}).", best));
        suggestions.push(
            "Clarify novelty and explicitly contrast contributions vs. the closest prior art."
                .to_string(),
        );
    } else {
        strengths.push(format!(
            "Top similarity is {:.3}, which suggests some overlap but not critical.",
            best
        ));
    }

    let total_overlaps = evidence.plagiarism.as_ref().map(PlagiarismReport::total_overlaps);
    match total_overlaps {
        None => strengths.push("No plagiarism analysis available.".to_string()),
        Some(0) => strengths.push("No plagiarism detected.".to_string()),
        Some(n) => {
            weaknesses.push(format!("{} plagiarism/paraphrase overlaps detected.", n));
            suggestions.push(
                "Key overlaps found, see evidence list in report; consider rewriting those parts."
                    .to_string(),
            );
        }
    }

    let factual_issues = evidence.factual.as_ref().map_or(0, FactualReport::issue_count);
    if evidence.factual.is_some() {
        if factual_issues > 0 {
            weaknesses.push(format!("Factual issues detected ({}).", factual_issues));
            suggestions
                .push("Correct factual inconsistencies and double-check units/values.".to_string());
        } else {
            strengths.push("Factual consistency verified.".to_string());
        }
    }

    let scores = Scores {
        novelty: novelty.score,
        claims: claims_score(citation_score),
        plagiarism: plagiarism_score(total_overlaps),
        factual_accuracy: factual_score(factual_issues),
    };
    let exact_match = has_exact_match(evidence, thresholds.exact_match);
    let decision = decide(&scores, exact_match);

    debug!("Scores: {:?}", scores);
    info!(
        "Decision: {}{}",
        decision,
        if exact_match { " (exact-match override)" } else { "" }
    );

    Assessment {
        novelty,
        citation_score,
        total_overlaps,
        factual_issues,
        scores,
        exact_match,
        decision,
        strengths,
        weaknesses,
        suggestions,
    }
}
