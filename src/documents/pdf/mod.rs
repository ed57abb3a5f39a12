
use std::path::Path;

use lopdf::Document;
use tracing::{debug, warn};

use crate::{ReviewError, Result};

/// Extract the text of a PDF in page order, optionally stopping after `max_pages`.
///
/// Pages that fail to decode are skipped; a document yielding no text at all is
/// an extraction error.
#[inline]
pub fn extract_text(path: &Path, max_pages: Option<usize>) -> Result<String> {
    let document = Document::load(path).map_err(|e| {
        ReviewError::Extraction(format!("Failed to load PDF {}: {}", path.display(), e))
    })?;
    extract_from_document(&document, path, max_pages)
}

/// Extract text from PDF bytes held in memory
#[inline]
pub fn extract_text_from_bytes(bytes: &[u8], max_pages: Option<usize>) -> Result<String> {
    let document = Document::load_mem(bytes)
        .map_err(|e| ReviewError::Extraction(format!("Failed to load PDF: {}", e)))?;
    extract_from_document(&document, Path::new("<memory>"), max_pages)
}

fn extract_from_document(
    document: &Document,
    path: &Path,
    max_pages: Option<usize>,
) -> Result<String> {
    // get_pages is keyed by page number, so iteration is already in page order
    let page_numbers: Vec<u32> = document
        .get_pages()
        .keys()
        .copied()
        .take(max_pages.unwrap_or(usize::MAX))
        .collect();

    let mut pages = Vec::with_capacity(page_numbers.len());
    for page_number in &page_numbers {
        match document.extract_text(&[*page_number]) {
            Ok(text) => pages.push(text),
            Err(e) => warn!(
                "Skipping page {} of {}: {}",
                page_number,
                path.display(),
                e
            ),
        }
    }

    let text = pages.join("\n").trim().to_string();
    if text.is_empty() {
        return Err(ReviewError::Extraction(format!(
            "No text content found in {}",
            path.display()
        )));
    }

    debug!(
        "Extracted {} characters from {} pages of {}",
        text.len(),
        pages.len(),
        path.display()
    );
    Ok(text)
}
