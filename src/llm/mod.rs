// Text completion
// Hosted language-model backends tried in order until one answers

#[cfg(test)]
mod tests;

pub mod backends;

pub use backends::{BackendSettings, GeminiBackend, GroqBackend, HuggingFaceBackend};

use tracing::{debug, info, warn};

use crate::config::LlmConfig;
use crate::{ReviewError, Result};

/// A service that continues a prompt with generated text
pub trait TextCompletion {
    fn name(&self) -> &str;

    fn complete(&self, prompt: &str) -> Result<String>;
}

/// Backends in priority order. The first successful completion wins.
pub struct CompletionChain {
    backends: Vec<Box<dyn TextCompletion>>,
}

impl CompletionChain {
    #[inline]
    pub fn new(backends: Vec<Box<dyn TextCompletion>>) -> Self {
        Self { backends }
    }

    /// Chain of every backend listed in the configuration
    #[inline]
    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        let backends = config
            .backends
            .iter()
            .map(|backend| backends::backend_from_config(backend, config))
            .collect::<Result<Vec<_>>>()?;
        debug!("Configured {} text-completion backends", backends.len());
        Ok(Self::new(backends))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.backends.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }

    #[inline]
    pub fn names(&self) -> Vec<&str> {
        self.backends.iter().map(|b| b.name()).collect()
    }

    /// Completion from the first backend that succeeds. When all of them
    /// fail the error lists every failure in order.
    #[inline]
    pub fn complete(&self, prompt: &str) -> Result<String> {
        let mut failures = Vec::with_capacity(self.backends.len());

        for backend in &self.backends {
            match backend.complete(prompt) {
                Ok(text) => {
                    info!("Completion produced by {}", backend.name());
                    return Ok(text);
                }
                Err(e) => {
                    warn!("{} failed, falling back: {}", backend.name(), e);
                    failures.push(format!("{}: {}", backend.name(), e));
                }
            }
        }

        if failures.is_empty() {
            failures.push("no backends configured".to_string());
        }
        Err(ReviewError::Completion { failures })
    }
}

impl std::fmt::Debug for CompletionChain {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompletionChain")
            .field("backends", &self.names())
            .finish()
    }
}
