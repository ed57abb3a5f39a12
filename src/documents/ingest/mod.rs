
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::{cached_text_path, document_stem, list_pdfs, pdf, topic_from_stem};
use crate::Result;
use crate::citations::grobid::GrobidClient;
use crate::config::Config;

pub const SUMMARY_FILE: &str = "pdf_processing_summary.json";

/// Outcome of ingesting one corpus PDF
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessedPdf {
    pub topic: String,
    pub pdf_path: String,
    pub text_path: Option<String>,
    pub refs_path: Option<String>,
}

/// Extract and cache the full text of every corpus PDF, plus its references
/// when a GROBID client is given. Unreadable files are skipped.
#[inline]
pub fn ingest_corpus(config: &Config, grobid: Option<&GrobidClient>) -> Result<Vec<ProcessedPdf>> {
    let pdfs = list_pdfs(&config.pdf_dir())?;
    let parsed_text_dir = config.parsed_text_dir();
    let references_dir = config.references_dir();
    fs::create_dir_all(&parsed_text_dir)?;
    fs::create_dir_all(&references_dir)?;

    info!("Ingesting {} PDFs from {}", pdfs.len(), config.pdf_dir().display());

    let mut processed = Vec::with_capacity(pdfs.len());
    for pdf_path in &pdfs {
        let stem = document_stem(pdf_path);

        let text_path = match pdf::extract_text(pdf_path, None) {
            Ok(text) => {
                let text_path = cached_text_path(pdf_path, &parsed_text_dir);
                fs::write(&text_path, text)?;
                Some(text_path.to_string_lossy().into_owned())
            }
            Err(e) => {
                warn!("Skipping text extraction for {}: {}", pdf_path.display(), e);
                None
            }
        };

        let refs_path = grobid.and_then(|client| fetch_references(client, pdf_path, &references_dir, &stem));

        processed.push(ProcessedPdf {
            topic: topic_from_stem(&stem).to_string(),
            pdf_path: pdf_path.to_string_lossy().into_owned(),
            text_path,
            refs_path,
        });
    }

    let summary_path = config.data_dir().join(SUMMARY_FILE);
    fs::write(&summary_path, serde_json::to_string_pretty(&processed)?)?;
    info!(
        "Ingested {} PDFs ({} with text), summary saved to {}",
        processed.len(),
        processed.iter().filter(|p| p.text_path.is_some()).count(),
        summary_path.display()
    );

    Ok(processed)
}

fn fetch_references(
    client: &GrobidClient,
    pdf_path: &Path,
    references_dir: &Path,
    stem: &str,
) -> Option<String> {
    let xml = client
        .process_references(pdf_path)
        .map_err(|e| warn!("Reference extraction failed for {}: {}", pdf_path.display(), e))
        .ok()?;

    let refs_path = references_dir.join(format!("{}_refs.xml", stem));
    match fs::write(&refs_path, xml) {
        Ok(()) => Some(refs_path.to_string_lossy().into_owned()),
        Err(e) => {
            warn!("Could not save references to {}: {}", refs_path.display(), e);
            None
        }
    }
}
