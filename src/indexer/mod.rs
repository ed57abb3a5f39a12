// Corpus indexing
// Builds the global and per-topic vector indexes with their mappings


pub mod consistency;

use std::collections::HashMap;
use std::path::Path;

use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info, warn};

pub use consistency::{ConsistencyReport, validate_consistency};

use crate::config::Config;
use crate::database::{CorpusIndex, IndexEntry, IndexMapping, Metric, VectorIndex};
use crate::documents::{
    PaperMetadata, cached_text_path, document_excerpt, document_stem, file_name, list_pdfs,
    load_metadata,
};
use crate::embeddings::Embedder;
use crate::{ReviewError, Result};

/// Outcome of an index build
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexingStats {
    pub documents_indexed: usize,
    pub documents_skipped: usize,
    pub with_metadata: usize,
}

fn progress_bar(len: usize, action: &str) -> ProgressBar {
    if console::user_attended_stderr() {
        let template = format!("{{spinner}} [{{pos}}/{{len}}] {} {{msg}}", action);
        match ProgressStyle::with_template(&template) {
            Ok(style) => ProgressBar::new(len as u64).with_style(style),
            Err(_) => ProgressBar::new(len as u64),
        }
    } else {
        ProgressBar::hidden()
    }
}

fn existing_path(path: &Path) -> Option<String> {
    path.exists().then(|| path.to_string_lossy().into_owned())
}

/// Embed the excerpt of every corpus PDF into an inner-product index and save
/// it with its mapping. Metadata is joined by PDF file name when
/// `metadata.json` exists. Unreadable PDFs are skipped.
#[inline]
pub fn build_global_index(
    config: &Config,
    embedder: &dyn Embedder,
) -> Result<(CorpusIndex, IndexingStats)> {
    let pdfs = list_pdfs(&config.pdf_dir())?;

    let metadata_path = config.metadata_path();
    let metadata: HashMap<String, PaperMetadata> = if metadata_path.exists() {
        load_metadata(&metadata_path)?
    } else {
        debug!("No metadata file at {}", metadata_path.display());
        HashMap::new()
    };

    info!("Building global index over {} PDFs", pdfs.len());

    let parsed_text_dir = config.parsed_text_dir();
    let references_dir = config.references_dir();
    let bar = progress_bar(pdfs.len(), "Reading");

    let mut excerpts = Vec::with_capacity(pdfs.len());
    let mut entries = Vec::with_capacity(pdfs.len());
    let mut skipped = 0;
    let mut with_metadata = 0;

    for pdf_path in &pdfs {
        let name = file_name(&pdf_path.to_string_lossy());
        bar.set_message(name.clone());
        bar.inc(1);

        let excerpt = match document_excerpt(pdf_path, &config.chunking) {
            Ok(excerpt) if !excerpt.trim().is_empty() => excerpt,
            Ok(_) => {
                warn!("Skipping {}: no extractable text", pdf_path.display());
                skipped += 1;
                continue;
            }
            Err(e) => {
                warn!("Skipping {}: {}", pdf_path.display(), e);
                skipped += 1;
                continue;
            }
        };

        let meta = metadata.get(&name).cloned().unwrap_or_default();
        if metadata.contains_key(&name) {
            with_metadata += 1;
        }

        let refs_path = references_dir.join(format!("{}_refs.xml", document_stem(pdf_path)));
        entries.push(IndexEntry {
            pdf_path: Some(pdf_path.to_string_lossy().into_owned()),
            text_excerpt: Some(excerpt.clone()),
            title: meta.title,
            abstract_text: meta.abstract_text,
            link: meta.link,
            published: meta.published,
            text_path: existing_path(&cached_text_path(pdf_path, &parsed_text_dir)),
            refs_path: existing_path(&refs_path),
        });
        excerpts.push(excerpt);
    }
    bar.finish_and_clear();

    if entries.is_empty() {
        return Err(ReviewError::Index(format!(
            "No PDFs found for indexing in {}",
            config.pdf_dir().display()
        )));
    }

    let vectors = embedder.embed_normalized(&excerpts)?;
    let corpus = assemble(Metric::InnerProduct, &vectors, entries)?;
    corpus.save(&config.global_index_path(), &config.global_mapping_path())?;

    let stats = IndexingStats {
        documents_indexed: corpus.len(),
        documents_skipped: skipped,
        with_metadata,
    };
    info!(
        "Global index saved to {} ({} documents, {} skipped, {} with metadata)",
        config.global_index_path().display(),
        stats.documents_indexed,
        stats.documents_skipped,
        stats.with_metadata
    );

    Ok((corpus, stats))
}

/// Embed `title + abstract` of fetched papers into a squared-L2 topic index
/// and save it with its mapping under the normalized topic name.
#[inline]
pub fn build_topic_index(
    config: &Config,
    topic: &str,
    papers: &[PaperMetadata],
    embedder: &dyn Embedder,
) -> Result<CorpusIndex> {
    if papers.is_empty() {
        return Err(ReviewError::Index(format!(
            "No papers to index for topic '{}'",
            topic
        )));
    }

    let texts: Vec<String> = papers
        .iter()
        .map(|paper| {
            format!(
                "{} {}",
                paper.title.as_deref().unwrap_or_default(),
                paper.abstract_text.as_deref().unwrap_or_default()
            )
        })
        .collect();

    let entries: Vec<IndexEntry> = papers
        .iter()
        .map(|paper| IndexEntry {
            pdf_path: paper.pdf_path.clone(),
            text_excerpt: None,
            title: paper.title.clone(),
            abstract_text: paper.abstract_text.clone(),
            link: paper.link.clone(),
            published: paper.published.clone(),
            text_path: paper.text_path.clone(),
            refs_path: None,
        })
        .collect();

    let vectors = embedder.embed(&texts)?;
    let corpus = assemble(Metric::L2, &vectors, entries)?;

    let index_path = config.topic_index_path(topic);
    corpus.save(&index_path, &config.topic_mapping_path(topic))?;
    info!(
        "Topic index for '{}' saved to {} ({} papers)",
        topic,
        index_path.display(),
        corpus.len()
    );

    Ok(corpus)
}

fn assemble(metric: Metric, vectors: &[Vec<f32>], entries: Vec<IndexEntry>) -> Result<CorpusIndex> {
    let dimension = vectors
        .first()
        .map(Vec::len)
        .ok_or_else(|| ReviewError::Embedding("Embedder returned no vectors".to_string()))?;

    let mut index = VectorIndex::new(metric, dimension);
    index.add_all(vectors)?;
    CorpusIndex::new(index, IndexMapping::from_entries(entries))
}
