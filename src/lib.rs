use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ReviewError>;

#[derive(Error, Debug)]
pub enum ReviewError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Missing {artifact}: {} (run the stage that produces it first)", path.display())]
    MissingArtifact { artifact: String, path: PathBuf },

    #[error("Extraction error: {0}")]
    Extraction(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Index error: {0}")]
    Index(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("External service error ({service}): {message}")]
    ExternalService { service: String, message: String },

    #[error("All text-completion backends failed: {}", failures.join("; "))]
    Completion { failures: Vec<String> },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

impl ReviewError {
    #[inline]
    pub fn missing(artifact: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self::MissingArtifact {
            artifact: artifact.into(),
            path: path.into(),
        }
    }
}

pub mod citations;
pub mod claims;
pub mod commands;
pub mod config;
pub mod database;
pub mod documents;
pub mod embeddings;
pub mod factual;
pub mod indexer;
pub mod llm;
pub mod novelty;
pub mod overlap;
pub mod pipeline;
pub mod review;
pub mod sources;
