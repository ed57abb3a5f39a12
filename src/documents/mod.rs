#[cfg(test)]
mod tests;

pub mod ingest;
pub mod pdf;

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::embeddings::chunking::{ChunkingConfig, truncate_chars};
use crate::{ReviewError, Result};

/// Bibliographic record of a paper, as fetched or listed in `metadata.json`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaperMetadata {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(rename = "abstract", default)]
    pub abstract_text: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub published: Option<String>,
    #[serde(default)]
    pub pdf_url: Option<String>,
    #[serde(default, alias = "pdf")]
    pub pdf_path: Option<String>,
    #[serde(default, alias = "txt_path")]
    pub text_path: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawMetadata {
    Many(Vec<PaperMetadata>),
    One(PaperMetadata),
}

/// Normalize a topic into the identifier used in index file names.
///
/// Lowercases, drops everything but ASCII letters, digits and whitespace, and
/// joins the remaining words with `_`. An empty result becomes `general`.
#[inline]
pub fn normalize_topic(text: &str) -> String {
    let kept: String = text
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c.is_whitespace())
        .collect();
    let joined = kept.split_whitespace().collect::<Vec<_>>().join("_");

    if joined.is_empty() {
        "general".to_string()
    } else {
        joined
    }
}

/// Topic encoded as the file stem prefix, `nlp` for `nlp_paper_1.pdf`
#[inline]
pub fn topic_from_stem(stem: &str) -> &str {
    stem.split('_').next().unwrap_or(stem)
}

/// File stem of a document path, used to name derived artifacts
#[inline]
pub fn document_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// File name of a path as a string, `paper.pdf` for `data/pdfs/paper.pdf`
#[inline]
pub fn file_name(path: &str) -> String {
    Path::new(path)
        .file_name()
        .map_or_else(|| path.to_string(), |n| n.to_string_lossy().into_owned())
}

#[inline]
pub fn is_pdf(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
}

/// Read a PDF or plain-text document
#[inline]
pub fn read_document_text(path: &Path, max_pages: Option<usize>) -> Result<String> {
    if is_pdf(path) {
        pdf::extract_text(path, max_pages)
    } else {
        fs::read_to_string(path).map_err(|e| {
            ReviewError::Extraction(format!("Failed to read {}: {}", path.display(), e))
        })
    }
}

/// Excerpt embedded for retrieval: the first characters of the first pages
#[inline]
pub fn document_excerpt(path: &Path, config: &ChunkingConfig) -> Result<String> {
    let text = read_document_text(path, Some(config.excerpt_pages))?;
    Ok(truncate_chars(&text, config.excerpt_chars).to_string())
}

/// Cached full-text location for a document, `parsed_text/<stem>.txt`
#[inline]
pub fn cached_text_path(path: &Path, parsed_text_dir: &Path) -> PathBuf {
    parsed_text_dir.join(format!("{}.txt", document_stem(path)))
}

/// Full text of the document under review.
///
/// Tries the path itself, then the cached text derived from its stem. No text
/// from either source is a fatal extraction error.
#[inline]
pub fn resolve_document_text(path: &Path, parsed_text_dir: &Path) -> Result<String> {
    if path.exists() {
        match read_document_text(path, None) {
            Ok(text) if !text.trim().is_empty() => return Ok(text),
            Ok(_) => warn!("{} contains no text", path.display()),
            Err(e) => warn!("Could not read {}: {}", path.display(), e),
        }
    }

    let cached = cached_text_path(path, parsed_text_dir);
    if cached.exists() {
        debug!("Falling back to cached text {}", cached.display());
        let text = fs::read_to_string(&cached)?;
        if !text.trim().is_empty() {
            return Ok(text);
        }
    }

    Err(ReviewError::Extraction(format!(
        "Could not extract text for {} (no readable file and no cached text at {})",
        path.display(),
        cached.display()
    )))
}

/// Text of a comparison paper from any of its known locations, or `None`
#[inline]
pub fn comparison_text(pdf_path: Option<&str>, text_path: Option<&str>) -> Option<String> {
    let candidates = [pdf_path, text_path];
    for candidate in candidates.into_iter().flatten().filter(|p| !p.is_empty()) {
        let path = Path::new(candidate);
        if !path.exists() {
            continue;
        }
        match read_document_text(path, None) {
            Ok(text) if !text.trim().is_empty() => return Some(text),
            Ok(_) => debug!("{} contains no text", path.display()),
            Err(e) => warn!("Skipping unreadable comparison text {}: {}", path.display(), e),
        }
    }
    None
}

/// Parse a metadata file holding either a list of papers or a single paper,
/// keyed by PDF file name. Papers without a `pdf_path` are ignored.
#[inline]
pub fn load_metadata(path: &Path) -> Result<HashMap<String, PaperMetadata>> {
    if !path.exists() {
        return Err(ReviewError::missing("metadata file", path));
    }

    let raw: RawMetadata = serde_json::from_str(&fs::read_to_string(path)?)?;
    let papers = match raw {
        RawMetadata::Many(papers) => papers,
        RawMetadata::One(paper) => vec![paper],
    };

    let by_name: HashMap<String, PaperMetadata> = papers
        .into_iter()
        .filter_map(|paper| {
            let name = paper.pdf_path.as_deref().filter(|p| !p.is_empty()).map(file_name)?;
            Some((name, paper))
        })
        .collect();

    debug!("Loaded metadata for {} papers from {}", by_name.len(), path.display());
    Ok(by_name)
}

/// PDFs directly inside `dir`, sorted by name
#[inline]
pub fn list_pdfs(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.exists() {
        return Err(ReviewError::missing("PDF directory", dir));
    }

    let mut pdfs: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(std::result::Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && is_pdf(path))
        .collect();
    pdfs.sort();
    Ok(pdfs)
}
