// Novelty retrieval
// Nearest corpus papers to the document under review, labeled by similarity


use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::Result;
use crate::config::{Config, Thresholds};
use crate::database::CorpusIndex;
use crate::documents::{document_excerpt, resolve_document_text};
use crate::embeddings::{Embedder, truncate_chars};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NoveltyLabel {
    #[serde(rename = "Highly Novel")]
    HighlyNovel,
    #[serde(rename = "Partially Novel")]
    PartiallyNovel,
    #[serde(rename = "Not Novel")]
    NotNovel,
}

impl NoveltyLabel {
    #[inline]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::HighlyNovel => "Highly Novel",
            Self::PartiallyNovel => "Partially Novel",
            Self::NotNovel => "Not Novel",
        }
    }
}

/// Map a similarity to its novelty label using the configured cut points
#[inline]
pub fn label_novelty(similarity: f32, thresholds: &Thresholds) -> NoveltyLabel {
    if similarity >= thresholds.not_novel_similarity {
        NoveltyLabel::NotNovel
    } else if similarity >= thresholds.partially_novel_similarity {
        NoveltyLabel::PartiallyNovel
    } else {
        NoveltyLabel::HighlyNovel
    }
}

/// One retrieved corpus paper
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarPaper {
    pub similarity: f32,
    pub novelty: NoveltyLabel,
    #[serde(default)]
    pub pdf_path: Option<String>,
    #[serde(default)]
    pub text_path: Option<String>,
    #[serde(default)]
    pub refs_path: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
}

/// Contents of `novelty.json`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NoveltyReport {
    pub pdf: String,
    #[serde(default)]
    pub results: Vec<SimilarPaper>,
}

impl NoveltyReport {
    /// Highest similarity among the results, 0.0 when there are none
    #[inline]
    pub fn best_similarity(&self) -> f32 {
        self.results
            .iter()
            .map(|r| r.similarity)
            .reduce(f32::max)
            .unwrap_or(0.0)
    }

    /// Mean of the `k` highest similarities
    #[inline]
    pub fn mean_top_similarity(&self, k: usize) -> f32 {
        let mut similarities: Vec<f32> = self.results.iter().map(|r| r.similarity).collect();
        similarities.sort_by(|a, b| b.total_cmp(a));
        similarities.truncate(k);
        if similarities.is_empty() {
            0.0
        } else {
            similarities.iter().sum::<f32>() / similarities.len() as f32
        }
    }
}

/// Excerpt of the document under review, falling back to its cached text
fn query_excerpt(pdf_path: &Path, config: &Config) -> Result<String> {
    match document_excerpt(pdf_path, &config.chunking) {
        Ok(excerpt) if !excerpt.trim().is_empty() => Ok(excerpt),
        Ok(_) | Err(_) => {
            warn!(
                "No direct excerpt for {}, using cached text",
                pdf_path.display()
            );
            let text = resolve_document_text(pdf_path, &config.parsed_text_dir())?;
            Ok(truncate_chars(&text, config.chunking.excerpt_chars).to_string())
        }
    }
}

/// Retrieve the `top_k` corpus papers most similar to the document excerpt
#[inline]
pub fn run_novelty_check(
    pdf_path: &Path,
    config: &Config,
    corpus: &CorpusIndex,
    embedder: &dyn Embedder,
) -> Result<NoveltyReport> {
    let excerpt = query_excerpt(pdf_path, config)?;
    let query = embedder.embed_normalized(&[excerpt])?;
    let hits = corpus.search(&query, config.thresholds.top_k)?;

    let results: Vec<SimilarPaper> = hits
        .into_iter()
        .flatten()
        .map(|hit| SimilarPaper {
            similarity: hit.score,
            novelty: label_novelty(hit.score, &config.thresholds),
            pdf_path: hit.entry.pdf_path.clone(),
            text_path: hit.entry.text_path.clone(),
            refs_path: hit.entry.refs_path.clone(),
            title: hit.entry.title.clone(),
            link: hit.entry.link.clone(),
        })
        .collect();

    let report = NoveltyReport {
        pdf: pdf_path.to_string_lossy().into_owned(),
        results,
    };

    info!(
        "Novelty check found {} similar papers, best similarity {:.4}",
        report.results.len(),
        report.best_similarity()
    );

    Ok(report)
}
