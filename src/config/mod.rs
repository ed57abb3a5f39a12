// Configuration management module
// Immutable settings loaded from TOML and passed into every stage

pub mod interactive;
pub mod settings;


pub use interactive::{run_interactive_config, show_config};
pub use settings::{
    Config, ConfigError, GrobidConfig, LlmBackendConfig, LlmConfig, LlmProvider, OllamaConfig,
    Thresholds,
};

/// Get the configuration directory path
#[inline]
pub fn get_config_dir() -> Result<std::path::PathBuf, ConfigError> {
    Config::default_dir()
}
