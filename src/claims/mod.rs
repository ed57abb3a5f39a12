// Claim extraction and mapping
// Contribution sentences of the paper matched against claims of similar papers


use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::Config;
use crate::documents::{comparison_text, resolve_document_text};
use crate::embeddings::{Embedder, cosine_similarity, split_into_sentences};
use crate::novelty::NoveltyReport;
use crate::{ReviewError, Result};

/// Phrases that announce a contribution, matched case-insensitively
pub const CLAIM_KEYWORDS: [&str; 12] = [
    "we propose",
    "we present",
    "this paper",
    "our contribution",
    "we show",
    "we demonstrate",
    "we introduce",
    "in this work",
    "we report",
    "we observe",
    "we develop",
    "we design",
];

/// Longest sentences kept when the paper under review has no keyword claims
pub const REVIEWED_PAPER_FALLBACK: usize = 5;
/// Longest sentences kept per comparison paper without keyword claims
pub const COMPARISON_PAPER_FALLBACK: usize = 3;

/// A claim drawn from a similar paper
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExistingClaim {
    pub claim: String,
    pub paper_title: Option<String>,
    pub link: Option<String>,
}

/// Best match of one new claim among the existing claims
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimMapping {
    pub claim: String,
    pub is_novel: bool,
    pub matched_claim: Option<String>,
    #[serde(default)]
    pub matched_paper_title: Option<String>,
    #[serde(default)]
    pub matched_paper_link: Option<String>,
    pub similarity: f32,
}

/// Contents of `claim_mapping.json`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClaimMappingReport {
    pub new_pdf: String,
    pub mappings: Vec<ClaimMapping>,
    pub num_new_claims: usize,
    pub num_existing_claims: usize,
}

/// Sentences announcing a contribution, or the `fallback` longest sentences
/// when none do
#[inline]
pub fn extract_claims(text: &str, min_sentence_chars: usize, fallback: usize) -> Vec<String> {
    let sentences = split_into_sentences(text, min_sentence_chars);

    let claims: Vec<String> = sentences
        .iter()
        .filter(|sentence| {
            let lower = sentence.to_lowercase();
            CLAIM_KEYWORDS.iter().any(|keyword| lower.contains(keyword))
        })
        .cloned()
        .collect();

    if !claims.is_empty() {
        return claims;
    }

    let mut longest = sentences;
    longest.sort_by_key(|sentence| std::cmp::Reverse(sentence.chars().count()));
    longest.truncate(fallback);
    longest
}

/// Claims of every similar paper whose text can be read. Papers without
/// readable text are skipped.
#[inline]
pub fn gather_existing_claims(
    novelty: &NoveltyReport,
    min_sentence_chars: usize,
) -> Vec<ExistingClaim> {
    let mut existing = Vec::new();

    for paper in &novelty.results {
        let Some(text) = comparison_text(paper.pdf_path.as_deref(), paper.text_path.as_deref())
        else {
            debug!(
                "No text for similar paper {:?}, skipping",
                paper.title.as_deref().or(paper.pdf_path.as_deref())
            );
            continue;
        };

        existing.extend(
            extract_claims(&text, min_sentence_chars, COMPARISON_PAPER_FALLBACK)
                .into_iter()
                .map(|claim| ExistingClaim {
                    claim,
                    paper_title: paper.title.clone(),
                    link: paper.link.clone(),
                }),
        );
    }

    existing
}

fn round4(value: f32) -> f32 {
    (value * 10_000.0).round() / 10_000.0
}

fn embed_exactly(embedder: &dyn Embedder, texts: &[String]) -> Result<Vec<Vec<f32>>> {
    let vectors = embedder.embed(texts)?;
    if vectors.len() != texts.len() {
        return Err(ReviewError::Embedding(format!(
            "Expected {} claim embeddings, got {}",
            texts.len(),
            vectors.len()
        )));
    }
    Ok(vectors)
}

/// Match every new claim to its most similar existing claim.
///
/// A claim is novel when its best similarity is below `threshold`. With no
/// existing claims every claim is novel with similarity 0.0.
#[inline]
pub fn map_claims(
    new_claims: &[String],
    existing: &[ExistingClaim],
    embedder: &dyn Embedder,
    threshold: f32,
) -> Result<Vec<ClaimMapping>> {
    if new_claims.is_empty() {
        return Ok(Vec::new());
    }

    if existing.is_empty() {
        return Ok(new_claims
            .iter()
            .map(|claim| ClaimMapping {
                claim: claim.clone(),
                is_novel: true,
                matched_claim: None,
                matched_paper_title: None,
                matched_paper_link: None,
                similarity: 0.0,
            })
            .collect());
    }

    let existing_texts: Vec<String> = existing.iter().map(|c| c.claim.clone()).collect();
    let new_vectors = embed_exactly(embedder, new_claims)?;
    let existing_vectors = embed_exactly(embedder, &existing_texts)?;

    let mappings = new_claims
        .iter()
        .zip(&new_vectors)
        .map(|(claim, vector)| {
            let (best, score) = existing_vectors
                .iter()
                .map(|other| cosine_similarity(vector, other))
                .enumerate()
                .fold((0, f32::NEG_INFINITY), |best, (j, score)| {
                    if score > best.1 { (j, score) } else { best }
                });
            let matched = &existing[best];

            ClaimMapping {
                claim: claim.clone(),
                is_novel: score < threshold,
                matched_claim: Some(matched.claim.clone()),
                matched_paper_title: matched.paper_title.clone(),
                matched_paper_link: matched.link.clone(),
                similarity: round4(score),
            }
        })
        .collect();

    Ok(mappings)
}

/// Extract the paper's claims and map them against claims of the papers the
/// novelty stage retrieved. No readable text for the paper is fatal.
#[inline]
pub fn run_claim_mapping(
    pdf_path: &Path,
    config: &Config,
    novelty: &NoveltyReport,
    embedder: &dyn Embedder,
) -> Result<ClaimMappingReport> {
    let text = resolve_document_text(pdf_path, &config.parsed_text_dir())?;
    let min_chars = config.chunking.min_sentence_chars;

    let new_claims = extract_claims(&text, min_chars, REVIEWED_PAPER_FALLBACK);
    info!("Found {} candidate claims in {}", new_claims.len(), pdf_path.display());

    let existing = gather_existing_claims(novelty, min_chars);
    info!(
        "Collected {} claims from {} similar papers",
        existing.len(),
        novelty.results.len()
    );

    let mappings = map_claims(
        &new_claims,
        &existing,
        embedder,
        config.thresholds.claim_similarity,
    )?;

    Ok(ClaimMappingReport {
        new_pdf: pdf_path.to_string_lossy().into_owned(),
        num_new_claims: new_claims.len(),
        num_existing_claims: existing.len(),
        mappings,
    })
}
