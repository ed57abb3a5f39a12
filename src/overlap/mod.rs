// Overlap detection
// Paraphrase overlap by embedding search and exact overlap by character diff


use std::fs;
use std::path::Path;

use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};
use similar::TextDiff;
use tracing::{debug, info, warn};

use crate::Result;
use crate::config::Config;
use crate::database::CorpusIndex;
use crate::documents::resolve_document_text;
use crate::embeddings::{ChunkingConfig, ContentChunk, Embedder, chunk_words, truncate_chars};

/// Combined overlap count above which the plagiarism risk is high
pub const HIGH_RISK_OVERLAPS: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OverlapKind {
    #[serde(rename = "exact_overlap")]
    Exact,
    #[serde(rename = "paraphrase_overlap")]
    Paraphrase,
}

/// A chunk of the paper found in a corpus document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverlapMatch {
    pub chunk: String,
    pub score: f32,
    pub pdf_name: String,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(rename = "type")]
    pub kind: OverlapKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PlagiarismRisk {
    High,
    Low,
}

impl PlagiarismRisk {
    #[inline]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::High => "HIGH",
            Self::Low => "LOW",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverlapSummary {
    pub exact_overlap_count: usize,
    pub paraphrase_overlap_count: usize,
    pub plagiarism_risk: PlagiarismRisk,
}

/// Contents of `plagiarism.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlagiarismReport {
    pub paper: String,
    pub exact_overlap: Vec<OverlapMatch>,
    pub paraphrase_overlap: Vec<OverlapMatch>,
    pub summary: OverlapSummary,
}

impl PlagiarismReport {
    #[inline]
    pub fn new(
        paper: String,
        exact_overlap: Vec<OverlapMatch>,
        paraphrase_overlap: Vec<OverlapMatch>,
    ) -> Self {
        let summary = OverlapSummary {
            exact_overlap_count: exact_overlap.len(),
            paraphrase_overlap_count: paraphrase_overlap.len(),
            plagiarism_risk: risk_label(exact_overlap.len() + paraphrase_overlap.len()),
        };
        Self {
            paper,
            exact_overlap,
            paraphrase_overlap,
            summary,
        }
    }

    #[inline]
    pub fn total_overlaps(&self) -> usize {
        self.exact_overlap.len() + self.paraphrase_overlap.len()
    }

    /// Every overlap of both kinds, highest score first
    #[inline]
    pub fn ranked_overlaps(&self) -> Vec<&OverlapMatch> {
        let mut all: Vec<&OverlapMatch> = self
            .paraphrase_overlap
            .iter()
            .chain(&self.exact_overlap)
            .collect();
        all.sort_by(|a, b| b.score.total_cmp(&a.score));
        all
    }
}

#[inline]
pub fn risk_label(total_overlaps: usize) -> PlagiarismRisk {
    if total_overlaps > HIGH_RISK_OVERLAPS {
        PlagiarismRisk::High
    } else {
        PlagiarismRisk::Low
    }
}

/// Character-sequence similarity ratio of two texts in [0, 1]
#[inline]
pub fn exact_ratio(a: &str, b: &str) -> f32 {
    TextDiff::from_chars(a, b).ratio()
}

/// Chunks whose nearest corpus entries score at or above `threshold`
#[inline]
pub fn paraphrase_overlaps(
    chunks: &[ContentChunk],
    corpus: &CorpusIndex,
    embedder: &dyn Embedder,
    top_k: usize,
    threshold: f32,
) -> Result<Vec<OverlapMatch>> {
    if chunks.is_empty() || corpus.is_empty() {
        return Ok(Vec::new());
    }

    let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
    info!("Encoding {} chunks for paraphrase search", texts.len());
    let vectors = embedder.embed_normalized(&texts)?;
    let hits = corpus.search(&vectors, top_k)?;

    let matches = chunks
        .iter()
        .zip(hits)
        .flat_map(|(chunk, chunk_hits)| {
            chunk_hits
                .into_iter()
                .filter(|hit| hit.score >= threshold)
                .map(move |hit| OverlapMatch {
                    chunk: chunk.content.clone(),
                    score: hit.score,
                    pdf_name: hit.entry.display_name(),
                    link: hit.entry.link.clone(),
                    kind: OverlapKind::Paraphrase,
                })
        })
        .collect();

    Ok(matches)
}

/// Compare every chunk with every chunk of each corpus document that has
/// cached text, keeping pairs whose ratio reaches `threshold`
#[inline]
pub fn exact_overlaps(
    chunks: &[ContentChunk],
    corpus: &CorpusIndex,
    chunking: &ChunkingConfig,
    threshold: f32,
) -> Vec<OverlapMatch> {
    let bar = if console::user_attended_stderr() {
        match ProgressStyle::with_template("{spinner} [{pos}/{len}] Comparing {msg}") {
            Ok(style) => ProgressBar::new(corpus.len() as u64).with_style(style),
            Err(_) => ProgressBar::new(corpus.len() as u64),
        }
    } else {
        ProgressBar::hidden()
    };

    let mut matches = Vec::new();
    for (slot, entry) in corpus.mapping().iter() {
        bar.inc(1);
        let Some(text_path) = entry.text_path.as_deref().filter(|p| Path::new(p).exists()) else {
            continue;
        };
        let reference = match fs::read_to_string(text_path) {
            Ok(text) => text,
            Err(e) => {
                warn!("Skipping unreadable corpus text {}: {}", text_path, e);
                continue;
            }
        };

        let name = entry.display_name();
        bar.set_message(name.clone());
        let reference_chunks = chunk_words(&reference, chunking);
        debug!(
            "Comparing {} chunks with {} chunks of slot {}",
            chunks.len(),
            reference_chunks.len(),
            slot
        );

        for chunk in chunks {
            for reference_chunk in &reference_chunks {
                let score = exact_ratio(&chunk.content, &reference_chunk.content);
                if score >= threshold {
                    matches.push(OverlapMatch {
                        chunk: chunk.content.clone(),
                        score,
                        pdf_name: name.clone(),
                        link: entry.link.clone(),
                        kind: OverlapKind::Exact,
                    });
                }
            }
        }
    }
    bar.finish_and_clear();

    matches
}

/// Run both overlap channels for the paper against the global corpus
#[inline]
pub fn run_plagiarism_check(
    pdf_path: &Path,
    config: &Config,
    corpus: &CorpusIndex,
    embedder: &dyn Embedder,
) -> Result<PlagiarismReport> {
    let text = resolve_document_text(pdf_path, &config.parsed_text_dir())?;
    let text = truncate_chars(&text, config.chunking.max_document_chars).trim();
    let chunks = chunk_words(text, &config.chunking);

    let thresholds = &config.thresholds;
    let paraphrase = paraphrase_overlaps(
        &chunks,
        corpus,
        embedder,
        thresholds.top_k,
        thresholds.paraphrase_similarity,
    )?;
    info!("Checking {} chunks for exact overlap", chunks.len());
    let exact = exact_overlaps(
        &chunks,
        corpus,
        &config.chunking,
        thresholds.exact_overlap_similarity,
    );

    let report = PlagiarismReport::new(pdf_path.to_string_lossy().into_owned(), exact, paraphrase);
    info!(
        "Found {} exact and {} paraphrase overlaps (risk {:?})",
        report.summary.exact_overlap_count,
        report.summary.paraphrase_overlap_count,
        report.summary.plagiarism_risk
    );

    Ok(report)
}
