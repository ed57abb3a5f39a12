// Bibliographic acquisition
// Searches public paper APIs for a topic and stores what they return


pub mod arxiv;
pub mod crossref;
pub mod semantic_scholar;

pub use arxiv::ArxivSource;
pub use crossref::CrossrefSource;
pub use semantic_scholar::SemanticScholarSource;

use std::fs;
use std::path::Path;
use std::time::Duration;

use tracing::{debug, info, warn};
use url::Url;

use crate::config::Config;
use crate::database::CorpusIndex;
use crate::documents::{PaperMetadata, normalize_topic};
use crate::embeddings::Embedder;
use crate::indexer::build_topic_index;
use crate::{ReviewError, Result};

/// Papers collected per topic unless asked otherwise
pub const DEFAULT_MAX_PAPERS: usize = 15;

const API_TIMEOUT_SECONDS: u64 = 30;
const PDF_TIMEOUT_SECONDS: u64 = 15;
const PDF_SIZE_LIMIT: u64 = 64 * 1024 * 1024;
const PAGE_DELAY: Duration = Duration::from_secs(1);

/// A searchable bibliographic database
pub trait PaperSource {
    fn name(&self) -> &str;

    /// Up to `max_results` papers matching `keyword`
    fn search(&self, keyword: &str, max_results: usize) -> Result<Vec<PaperMetadata>>;
}

/// Endpoint and HTTP agent shared by the API sources
#[derive(Debug, Clone)]
pub struct SourceClient {
    endpoint: Url,
    agent: ureq::Agent,
    page_delay: Duration,
}

impl SourceClient {
    #[inline]
    pub fn new(endpoint: &str) -> Result<Self> {
        let endpoint = Url::parse(endpoint)
            .map_err(|e| ReviewError::Config(format!("Invalid source URL {}: {}", endpoint, e)))?;

        Ok(Self {
            endpoint,
            agent: http_agent(API_TIMEOUT_SECONDS),
            page_delay: PAGE_DELAY,
        })
    }

    /// Pause between page requests
    #[inline]
    pub fn with_page_delay(mut self, delay: Duration) -> Self {
        self.page_delay = delay;
        self
    }

    /// GET the endpoint with the given query parameters
    #[inline]
    pub fn get(&self, service: &str, params: &[(&str, String)]) -> Result<String> {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .extend_pairs(params.iter().map(|(k, v)| (*k, v.as_str())));

        debug!("Querying {}: {}", service, url);

        let mut response = self
            .agent
            .get(url.as_str())
            .call()
            .map_err(|e| ReviewError::Network(format!("{} request failed: {}", service, e)))?;

        let status = response.status().as_u16();
        let text = response
            .body_mut()
            .read_to_string()
            .map_err(|e| ReviewError::Network(format!("Failed to read {} response: {}", service, e)))?;

        if status != 200 {
            return Err(ReviewError::ExternalService {
                service: service.to_string(),
                message: format!("HTTP {}", status),
            });
        }

        Ok(text)
    }

    /// Sleep between two pages of the same search
    #[inline]
    pub fn pause(&self) {
        if !self.page_delay.is_zero() {
            std::thread::sleep(self.page_delay);
        }
    }
}

fn http_agent(timeout_seconds: u64) -> ureq::Agent {
    ureq::Agent::config_builder()
        .timeout_global(Some(Duration::from_secs(timeout_seconds)))
        .http_status_as_error(false)
        .build()
        .into()
}

/// `Some(text)` for non-blank text
pub(crate) fn non_blank(text: Option<String>) -> Option<String> {
    text.map(|t| t.trim().to_string()).filter(|t| !t.is_empty())
}

/// Downloads open-access PDFs
#[derive(Debug, Clone)]
pub struct PdfDownloader {
    agent: ureq::Agent,
}

impl Default for PdfDownloader {
    fn default() -> Self {
        Self {
            agent: http_agent(PDF_TIMEOUT_SECONDS),
        }
    }
}

impl PdfDownloader {
    /// Save the document at `url` to `dest` when the server answers 200 with
    /// a PDF content type. Returns whether a file was written.
    #[inline]
    pub fn download(&self, url: &str, dest: &Path) -> Result<bool> {
        let mut response = self
            .agent
            .get(url)
            .call()
            .map_err(|e| ReviewError::Network(format!("PDF download from {} failed: {}", url, e)))?;

        let is_pdf = response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.to_lowercase().contains("pdf"));
        if response.status().as_u16() != 200 || !is_pdf {
            debug!(
                "Not saving {} (status {}, pdf content: {})",
                url,
                response.status(),
                is_pdf
            );
            return Ok(false);
        }

        let bytes = response
            .body_mut()
            .with_config()
            .limit(PDF_SIZE_LIMIT)
            .read_to_vec()
            .map_err(|e| ReviewError::Network(format!("Failed to read PDF from {}: {}", url, e)))?;
        fs::write(dest, bytes)?;
        Ok(true)
    }
}

/// Sources queried in order until enough papers are collected
pub struct PaperFetcher {
    sources: Vec<Box<dyn PaperSource>>,
    downloader: PdfDownloader,
}

impl PaperFetcher {
    #[inline]
    pub fn new(sources: Vec<Box<dyn PaperSource>>, downloader: PdfDownloader) -> Self {
        Self {
            sources,
            downloader,
        }
    }

    /// arXiv, Semantic Scholar and CrossRef at their public endpoints
    #[inline]
    pub fn public() -> Result<Self> {
        Ok(Self::new(
            vec![
                Box::new(ArxivSource::public()?),
                Box::new(SemanticScholarSource::public()?),
                Box::new(CrossrefSource::public()?),
            ],
            PdfDownloader::default(),
        ))
    }

    /// At most `max_papers` papers for `keyword`. A failing source is logged
    /// and the next one is asked for the remainder.
    #[inline]
    pub fn collect(&self, keyword: &str, max_papers: usize) -> Vec<PaperMetadata> {
        let mut papers = Vec::with_capacity(max_papers);

        for source in &self.sources {
            let needed = max_papers.saturating_sub(papers.len());
            if needed == 0 {
                break;
            }
            match source.search(keyword, needed) {
                Ok(found) => {
                    info!("{} returned {} papers for '{}'", source.name(), found.len(), keyword);
                    papers.extend(found.into_iter().take(needed));
                }
                Err(e) => warn!("{} search failed: {}", source.name(), e),
            }
        }

        papers
    }

    /// Write each paper's text record and, when available, its PDF. Returns
    /// the papers with their local paths filled in.
    #[inline]
    pub fn save_papers(
        &self,
        config: &Config,
        topic: &str,
        papers: &[PaperMetadata],
    ) -> Result<Vec<PaperMetadata>> {
        let topic = normalize_topic(topic);
        let parsed_text_dir = config.parsed_text_dir();
        let pdf_dir = config.pdf_dir();
        fs::create_dir_all(&parsed_text_dir)?;
        fs::create_dir_all(&pdf_dir)?;

        let mut saved = Vec::with_capacity(papers.len());
        for (idx, paper) in papers.iter().enumerate() {
            let stem = format!("{}_paper_{}", topic, idx + 1);

            let text_path = parsed_text_dir.join(format!("{}.txt", stem));
            fs::write(&text_path, paper_record(paper))?;

            let pdf_path = paper.pdf_url.as_deref().and_then(|url| {
                let dest = pdf_dir.join(format!("{}.pdf", stem));
                match self.downloader.download(url, &dest) {
                    Ok(true) => Some(dest.to_string_lossy().into_owned()),
                    Ok(false) => None,
                    Err(e) => {
                        warn!(
                            "PDF download failed for '{}': {}",
                            paper.title.as_deref().unwrap_or_default(),
                            e
                        );
                        None
                    }
                }
            });

            saved.push(PaperMetadata {
                text_path: Some(text_path.to_string_lossy().into_owned()),
                pdf_path,
                ..paper.clone()
            });
        }

        let cache_path = cache_path(config, &topic);
        if let Some(parent) = cache_path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&cache_path, serde_json::to_string_pretty(&saved)?)?;
        debug!("Cached {} papers at {}", saved.len(), cache_path.display());

        Ok(saved)
    }
}

impl std::fmt::Debug for PaperFetcher {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.sources.iter().map(|s| s.name()).collect();
        f.debug_struct("PaperFetcher")
            .field("sources", &names)
            .field("downloader", &self.downloader)
            .finish()
    }
}

/// Text record saved for a fetched paper
#[inline]
pub fn paper_record(paper: &PaperMetadata) -> String {
    format!(
        "Title: {}\nPublished: {}\nLink: {}\n\nAbstract:\n{}\n",
        paper.title.as_deref().unwrap_or_default(),
        paper.published.as_deref().unwrap_or_default(),
        paper.link.as_deref().unwrap_or_default(),
        paper.abstract_text.as_deref().unwrap_or_default()
    )
}

/// `cache/<topic>_papers.json`
#[inline]
pub fn cache_path(config: &Config, topic: &str) -> std::path::PathBuf {
    config
        .cache_dir_path()
        .join(format!("{}_papers.json", normalize_topic(topic)))
}

/// Cached papers of a topic, if the cache holds at least `max_papers`
#[inline]
pub fn cached_papers(config: &Config, topic: &str, max_papers: usize) -> Result<Option<Vec<PaperMetadata>>> {
    let path = cache_path(config, topic);
    if !path.exists() {
        return Ok(None);
    }

    let content = fs::read_to_string(&path)?;
    let mut cached: Vec<PaperMetadata> = serde_json::from_str(&content)?;
    if cached.len() < max_papers {
        debug!(
            "Cache for '{}' holds {} of {} papers",
            topic,
            cached.len(),
            max_papers
        );
        return Ok(None);
    }

    cached.truncate(max_papers);
    Ok(Some(cached))
}

/// Result of a topic fetch
#[derive(Debug)]
pub struct FetchOutcome {
    pub papers: Vec<PaperMetadata>,
    pub from_cache: bool,
    pub index: Option<CorpusIndex>,
}

/// Papers for a topic from the cache or the sources, with the topic index
/// built over them. A cache hit rebuilds the index only when it is missing.
#[inline]
pub fn fetch_topic(
    config: &Config,
    topic: &str,
    max_papers: usize,
    fetcher: &PaperFetcher,
    embedder: &dyn Embedder,
) -> Result<FetchOutcome> {
    if let Some(papers) = cached_papers(config, topic, max_papers)? {
        info!("Cache hit: {} papers for '{}'", papers.len(), topic);
        let index_present = config.topic_index_path(topic).exists()
            && config.topic_mapping_path(topic).exists();
        let index = if index_present {
            None
        } else {
            Some(build_topic_index(config, topic, &papers, embedder)?)
        };
        return Ok(FetchOutcome {
            papers,
            from_cache: true,
            index,
        });
    }

    info!("Cache miss: fetching up to {} papers for '{}'", max_papers, topic);
    let collected = fetcher.collect(topic, max_papers);
    if collected.is_empty() {
        warn!("No papers found for '{}'", topic);
        return Ok(FetchOutcome {
            papers: Vec::new(),
            from_cache: false,
            index: None,
        });
    }

    let papers = fetcher.save_papers(config, topic, &collected)?;
    let index = build_topic_index(config, topic, &papers, embedder)?;
    Ok(FetchOutcome {
        papers,
        from_cache: false,
        index: Some(index),
    })
}
