
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use url::Url;

use crate::documents::normalize_topic;
use crate::embeddings::chunking::ChunkingConfig;
use crate::embeddings::ollama::DEFAULT_EMBEDDING_DIMENSION;

pub const GLOBAL_INDEX_FILE: &str = "global_index.bin";
pub const GLOBAL_MAPPING_FILE: &str = "global_mapping.json";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    pub ollama: OllamaConfig,
    #[serde(default)]
    pub thresholds: Thresholds,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub grobid: GrobidConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(skip)]
    pub base_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OllamaConfig {
    pub protocol: String,
    pub host: String,
    pub port: u16,
    pub model: String,
    pub batch_size: u32,
    pub embedding_dimension: u32,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            protocol: "http".to_string(),
            host: "localhost".to_string(),
            port: 11434,
            model: "all-minilm:latest".to_string(),
            batch_size: 16,
            embedding_dimension: DEFAULT_EMBEDDING_DIMENSION,
        }
    }
}

/// Decision and retrieval thresholds. Every value can be overridden per invocation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Thresholds {
    /// A new claim at or above this similarity to an existing claim is a duplicate
    pub claim_similarity: f32,
    /// Overlap or claim similarity at or above this forces a reject
    pub exact_match: f32,
    /// Minimum inner-product score for a paraphrase overlap hit
    pub paraphrase_similarity: f32,
    /// Minimum character-sequence ratio for an exact overlap hit
    pub exact_overlap_similarity: f32,
    /// Z-score beyond which a numeric mention is a corpus outlier
    pub outlier_z: f64,
    /// Neighbours retrieved per query
    pub top_k: usize,
    /// Evidence lines shown per section of the review
    pub evidence_count: usize,
    pub not_novel_similarity: f32,
    pub partially_novel_similarity: f32,
    /// References published in or before this year count as outdated
    pub citation_year_threshold: i32,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            claim_similarity: 0.70,
            exact_match: 0.995,
            paraphrase_similarity: 0.70,
            exact_overlap_similarity: 0.85,
            outlier_z: 3.0,
            top_k: 5,
            evidence_count: 3,
            not_novel_similarity: 0.70,
            partially_novel_similarity: 0.50,
            citation_year_threshold: 2015,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GrobidConfig {
    pub url: String,
    pub timeout_seconds: u64,
}

impl Default for GrobidConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:8070".to_string(),
            timeout_seconds: 60,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    Gemini,
    Groq,
    HuggingFace,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LlmBackendConfig {
    pub provider: LlmProvider,
    pub model: String,
    /// Environment variable holding the API key
    pub api_key_env: String,
    /// Override of the provider's public endpoint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LlmConfig {
    /// Backends in the order they are tried
    pub backends: Vec<LlmBackendConfig>,
    pub temperature: f32,
    pub max_new_tokens: u32,
    pub timeout_seconds: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            backends: vec![
                LlmBackendConfig {
                    provider: LlmProvider::Gemini,
                    model: "gemini-1.5-flash".to_string(),
                    api_key_env: "GEMINI_API_KEY".to_string(),
                    endpoint: None,
                },
                LlmBackendConfig {
                    provider: LlmProvider::Groq,
                    model: "llama-3.1-8b-instant".to_string(),
                    api_key_env: "GROQ_API_KEY".to_string(),
                    endpoint: None,
                },
                LlmBackendConfig {
                    provider: LlmProvider::HuggingFace,
                    model: "mistralai/Mistral-7B-Instruct-v0.3".to_string(),
                    api_key_env: "HF_API_KEY".to_string(),
                    endpoint: None,
                },
            ],
            temperature: 0.4,
            max_new_tokens: 512,
            timeout_seconds: 60,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration directory not found or could not be created")]
    DirectoryError,
    #[error("Invalid URL format: {0}")]
    InvalidUrl(String),
    #[error("Invalid port: {0} (must be between 1 and 65535)")]
    InvalidPort(u16),
    #[error("Invalid batch size: {0} (must be between 1 and 1000)")]
    InvalidBatchSize(u32),
    #[error("Invalid model name: {0} (cannot be empty)")]
    InvalidModel(String),
    #[error("Invalid protocol: {0} (must be 'http' or 'https')")]
    InvalidProtocol(String),
    #[error("Invalid embedding dimension: {0} (must be between 64 and 4096)")]
    InvalidEmbeddingDimension(u32),
    #[error("Invalid {name} threshold: {value} (must be in (0, 1])")]
    InvalidSimilarityThreshold { name: &'static str, value: f32 },
    #[error("Invalid outlier z-score: {0} (must be between 0 and 100, exclusive of 0)")]
    InvalidZThreshold(f64),
    #[error("Invalid top-k: {0} (must be between 1 and 100)")]
    InvalidTopK(usize),
    #[error("Invalid evidence count: {0} (must be between 1 and 50)")]
    InvalidEvidenceCount(usize),
    #[error("Novelty cut points out of order: not novel ({0}) must exceed partially novel ({1})")]
    NoveltyCutsOutOfOrder(f32, f32),
    #[error("Invalid citation year threshold: {0} (must be between 1900 and 2100)")]
    InvalidCitationYear(i32),
    #[error("Invalid chunk window: {0} words (must be between 10 and 5000)")]
    InvalidChunkWindow(usize),
    #[error("Chunk overlap ({0}) must be smaller than the chunk window ({1})")]
    OverlapTooLarge(usize, usize),
    #[error("Invalid minimum sentence length: {0} (must be at most 1000)")]
    InvalidMinSentenceChars(usize),
    #[error("Invalid excerpt length: {0} characters (must be between 100 and 100000)")]
    InvalidExcerptChars(usize),
    #[error("Invalid document length cap: {0} characters (must be at least 1000)")]
    InvalidMaxDocumentChars(usize),
    #[error("Invalid timeout: {0} seconds (must be between 1 and 600)")]
    InvalidTimeout(u64),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parsing error: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

impl Config {
    /// Default configuration directory, `~/.paper-review`
    #[inline]
    pub fn default_dir() -> Result<PathBuf, ConfigError> {
        dirs::home_dir()
            .map(|home| home.join(".paper-review"))
            .or_else(|| dirs::data_dir().map(|data| data.join("paper-review")))
            .ok_or(ConfigError::DirectoryError)
    }

    /// Defaults rooted at `base_dir`
    #[inline]
    pub fn with_base_dir<P: AsRef<Path>>(base_dir: P) -> Self {
        Self {
            ollama: OllamaConfig::default(),
            thresholds: Thresholds::default(),
            chunking: ChunkingConfig::default(),
            grobid: GrobidConfig::default(),
            llm: LlmConfig::default(),
            base_dir: base_dir.as_ref().to_path_buf(),
        }
    }

    #[inline]
    pub fn load<P: AsRef<Path>>(config_dir: P) -> Result<Self> {
        let config_path = config_dir.as_ref().join("config.toml");

        if !config_path.exists() {
            return Ok(Self::with_base_dir(config_dir));
        }

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let mut config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", config_path.display()))?;
        config.base_dir = config_dir.as_ref().to_path_buf();

        config
            .validate()
            .with_context(|| "Configuration validation failed")?;

        Ok(config)
    }

    #[inline]
    pub fn save(&self) -> Result<()> {
        self.validate()
            .context("Configuration validation failed before saving")?;

        let config_dir = self.get_base_dir();

        fs::create_dir_all(config_dir).with_context(|| {
            format!(
                "Failed to create config directory: {}",
                config_dir.display()
            )
        })?;

        let config_path = self.config_file_path();
        let content = toml::to_string_pretty(self).context("Failed to serialize config to TOML")?;

        fs::write(&config_path, content)
            .with_context(|| format!("Failed to write config file: {}", config_path.display()))?;

        Ok(())
    }

    #[inline]
    pub fn get_base_dir(&self) -> &Path {
        &self.base_dir
    }

    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.ollama.validate()?;
        self.thresholds.validate()?;
        self.validate_chunking_config()?;

        if !(1..=600).contains(&self.grobid.timeout_seconds) {
            return Err(ConfigError::InvalidTimeout(self.grobid.timeout_seconds));
        }
        Url::parse(&self.grobid.url).map_err(|_| ConfigError::InvalidUrl(self.grobid.url.clone()))?;

        if !(1..=600).contains(&self.llm.timeout_seconds) {
            return Err(ConfigError::InvalidTimeout(self.llm.timeout_seconds));
        }
        for backend in &self.llm.backends {
            if backend.model.trim().is_empty() {
                return Err(ConfigError::InvalidModel(backend.model.clone()));
            }
            if let Some(endpoint) = &backend.endpoint {
                Url::parse(endpoint).map_err(|_| ConfigError::InvalidUrl(endpoint.clone()))?;
            }
        }

        Ok(())
    }

    fn validate_chunking_config(&self) -> Result<(), ConfigError> {
        let config = &self.chunking;

        if !(10..=5000).contains(&config.window_words) {
            return Err(ConfigError::InvalidChunkWindow(config.window_words));
        }

        if config.overlap_words >= config.window_words {
            return Err(ConfigError::OverlapTooLarge(
                config.overlap_words,
                config.window_words,
            ));
        }

        if config.min_sentence_chars > 1000 {
            return Err(ConfigError::InvalidMinSentenceChars(
                config.min_sentence_chars,
            ));
        }

        if !(100..=100_000).contains(&config.excerpt_chars) {
            return Err(ConfigError::InvalidExcerptChars(config.excerpt_chars));
        }

        if config.max_document_chars < 1000 {
            return Err(ConfigError::InvalidMaxDocumentChars(
                config.max_document_chars,
            ));
        }

        Ok(())
    }

    #[inline]
    pub fn ollama_url(&self) -> Result<Url, ConfigError> {
        self.ollama.ollama_url()
    }

    #[inline]
    pub fn config_file_path(&self) -> PathBuf {
        self.get_base_dir().join("config.toml")
    }

    /// Root of every artifact the pipeline reads or writes
    #[inline]
    pub fn data_dir(&self) -> PathBuf {
        self.get_base_dir().join("data")
    }

    #[inline]
    pub fn pdf_dir(&self) -> PathBuf {
        self.data_dir().join("pdfs")
    }

    #[inline]
    pub fn parsed_text_dir(&self) -> PathBuf {
        self.data_dir().join("parsed_text")
    }

    #[inline]
    pub fn references_dir(&self) -> PathBuf {
        self.data_dir().join("references")
    }

    #[inline]
    pub fn cache_dir_path(&self) -> PathBuf {
        self.data_dir().join("cache")
    }

    #[inline]
    pub fn index_dir(&self) -> PathBuf {
        self.data_dir().join("index")
    }

    #[inline]
    pub fn results_dir(&self) -> PathBuf {
        self.data_dir().join("results")
    }

    #[inline]
    pub fn metadata_path(&self) -> PathBuf {
        self.data_dir().join("metadata.json")
    }

    #[inline]
    pub fn global_index_path(&self) -> PathBuf {
        self.index_dir().join(GLOBAL_INDEX_FILE)
    }

    #[inline]
    pub fn global_mapping_path(&self) -> PathBuf {
        self.index_dir().join(GLOBAL_MAPPING_FILE)
    }

    #[inline]
    pub fn topic_index_path(&self, topic: &str) -> PathBuf {
        self.index_dir()
            .join(format!("{}_index.bin", normalize_topic(topic)))
    }

    #[inline]
    pub fn topic_mapping_path(&self, topic: &str) -> PathBuf {
        self.index_dir()
            .join(format!("{}_mapping.json", normalize_topic(topic)))
    }
}

impl Thresholds {
    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        let similarities = [
            ("claim similarity", self.claim_similarity),
            ("exact match", self.exact_match),
            ("paraphrase similarity", self.paraphrase_similarity),
            ("exact overlap similarity", self.exact_overlap_similarity),
            ("not novel", self.not_novel_similarity),
            ("partially novel", self.partially_novel_similarity),
        ];
        for (name, value) in similarities {
            if !(value > 0.0 && value <= 1.0) {
                return Err(ConfigError::InvalidSimilarityThreshold { name, value });
            }
        }

        if !(self.outlier_z > 0.0 && self.outlier_z <= 100.0) {
            return Err(ConfigError::InvalidZThreshold(self.outlier_z));
        }

        if !(1..=100).contains(&self.top_k) {
            return Err(ConfigError::InvalidTopK(self.top_k));
        }

        if !(1..=50).contains(&self.evidence_count) {
            return Err(ConfigError::InvalidEvidenceCount(self.evidence_count));
        }

        if self.not_novel_similarity <= self.partially_novel_similarity {
            return Err(ConfigError::NoveltyCutsOutOfOrder(
                self.not_novel_similarity,
                self.partially_novel_similarity,
            ));
        }

        if !(1900..=2100).contains(&self.citation_year_threshold) {
            return Err(ConfigError::InvalidCitationYear(
                self.citation_year_threshold,
            ));
        }

        Ok(())
    }
}

impl OllamaConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.protocol != "http" && self.protocol != "https" {
            return Err(ConfigError::InvalidProtocol(self.protocol.clone()));
        }

        let url_str = format!("{}://{}:{}", self.protocol, self.host, self.port);
        Url::parse(&url_str).map_err(|_| ConfigError::InvalidUrl(url_str))?;

        if self.port == 0 {
            return Err(ConfigError::InvalidPort(self.port));
        }

        if self.model.trim().is_empty() {
            return Err(ConfigError::InvalidModel(self.model.clone()));
        }

        if self.batch_size == 0 || self.batch_size > 1000 {
            return Err(ConfigError::InvalidBatchSize(self.batch_size));
        }

        if !(64..=4096).contains(&self.embedding_dimension) {
            return Err(ConfigError::InvalidEmbeddingDimension(
                self.embedding_dimension,
            ));
        }

        Ok(())
    }

    pub fn ollama_url(&self) -> Result<Url, ConfigError> {
        let url_str = format!("{}://{}:{}", self.protocol, self.host, self.port);
        Url::parse(&url_str).map_err(|_| ConfigError::InvalidUrl(url_str))
    }

    pub fn set_protocol(&mut self, protocol: String) -> Result<(), ConfigError> {
        if protocol != "http" && protocol != "https" {
            return Err(ConfigError::InvalidProtocol(protocol));
        }
        self.protocol = protocol;
        Ok(())
    }

    pub fn set_host(&mut self, host: String) -> Result<(), ConfigError> {
        let temp_config = OllamaConfig {
            host: host.clone(),
            ..self.clone()
        };
        temp_config.validate()?;
        self.host = host;
        Ok(())
    }

    pub fn set_port(&mut self, port: u16) -> Result<(), ConfigError> {
        if port == 0 {
            return Err(ConfigError::InvalidPort(port));
        }
        self.port = port;
        Ok(())
    }

    pub fn set_model(&mut self, model: String) -> Result<(), ConfigError> {
        if model.trim().is_empty() {
            return Err(ConfigError::InvalidModel(model));
        }
        self.model = model;
        Ok(())
    }

    pub fn set_batch_size(&mut self, batch_size: u32) -> Result<(), ConfigError> {
        if batch_size == 0 || batch_size > 1000 {
            return Err(ConfigError::InvalidBatchSize(batch_size));
        }
        self.batch_size = batch_size;
        Ok(())
    }
}
