
use anyhow::{Context, Result};
use console::style;
use dialoguer::{Confirm, Input, Select};
use std::path::Path;

use super::{Config, ConfigError, OllamaConfig, Thresholds};

#[inline]
pub fn run_interactive_config(config_dir: &Path) -> Result<()> {
    eprintln!("{}", style("🔧 Paper Review Configuration Setup").bold().cyan());
    eprintln!();

    let mut config = load_existing_config(config_dir);

    eprintln!("{}", style("Embedding Service").bold().yellow());
    eprintln!("Configure the Ollama instance used to embed papers, chunks and claims.");
    eprintln!();

    configure_ollama(&mut config.ollama)?;

    eprintln!();
    eprintln!("{}", style("Review Thresholds").bold().yellow());
    configure_thresholds(&mut config.thresholds)?;

    eprintln!();
    config.grobid.url = Input::new()
        .with_prompt("GROBID URL")
        .default(config.grobid.url.clone())
        .validate_with(|input: &String| -> Result<(), ConfigError> {
            url::Url::parse(input).map_err(|_| ConfigError::InvalidUrl(input.clone()))?;
            Ok(())
        })
        .interact_text()?;

    eprintln!();
    eprintln!("{}", style("Testing configuration...").yellow());

    if test_ollama_connection(&config.ollama) {
        eprintln!("{}", style("✓ Ollama connection successful!").green());
    } else {
        eprintln!(
            "{}",
            style("⚠ Warning: Could not connect to Ollama").yellow()
        );
        eprintln!("You can continue, but make sure Ollama is running before indexing.");
    }

    eprintln!();
    if Confirm::new()
        .with_prompt("Save configuration?")
        .default(true)
        .interact()?
    {
        config.save().context("Failed to save configuration")?;
        eprintln!("{}", style("✓ Configuration saved successfully!").green());
        eprintln!(
            "Configuration saved to: {}",
            style(config.config_file_path().display()).cyan()
        );
    } else {
        eprintln!("Configuration not saved.");
    }

    Ok(())
}

#[inline]
pub fn show_config(config_dir: &Path) -> Result<()> {
    let config = Config::load(config_dir).context("Failed to load configuration")?;

    eprintln!("{}", style("📋 Current Configuration").bold().cyan());
    eprintln!();

    eprintln!("{}", style("Ollama Settings:").bold().yellow());
    eprintln!("  Host: {}", style(&config.ollama.host).cyan());
    eprintln!("  Port: {}", style(config.ollama.port).cyan());
    eprintln!("  Model: {}", style(&config.ollama.model).cyan());
    eprintln!("  Batch Size: {}", style(config.ollama.batch_size).cyan());
    match config.ollama_url() {
        Ok(url) => eprintln!("  Ollama URL: {}", style(url).cyan()),
        Err(e) => eprintln!("  Ollama URL: {} ({})", style("Invalid").red(), e),
    }

    eprintln!();
    eprintln!("{}", style("Thresholds:").bold().yellow());
    for line in describe_thresholds(&config.thresholds) {
        eprintln!("  {}", line);
    }

    eprintln!();
    eprintln!("{}", style("External Services:").bold().yellow());
    eprintln!("  GROBID: {}", style(&config.grobid.url).cyan());
    let backends: Vec<String> = config
        .llm
        .backends
        .iter()
        .map(|b| format!("{:?} ({})", b.provider, b.model))
        .collect();
    eprintln!("  Text backends: {}", style(backends.join(" → ")).cyan());

    eprintln!();
    eprintln!("Config file: {}", style(config.config_file_path().display()).dim());
    eprintln!("Data directory: {}", style(config.data_dir().display()).dim());

    Ok(())
}

fn describe_thresholds(thresholds: &Thresholds) -> Vec<String> {
    vec![
        format!("Claim similarity: {}", thresholds.claim_similarity),
        format!("Exact match: {}", thresholds.exact_match),
        format!("Paraphrase similarity: {}", thresholds.paraphrase_similarity),
        format!(
            "Exact overlap similarity: {}",
            thresholds.exact_overlap_similarity
        ),
        format!("Outlier z-score: {}", thresholds.outlier_z),
        format!("Top-k: {}", thresholds.top_k),
        format!("Evidence count: {}", thresholds.evidence_count),
    ]
}

fn load_existing_config(config_dir: &Path) -> Config {
    Config::load(config_dir).map_or_else(
        |_| {
            eprintln!(
                "{}",
                style("No valid configuration found. Using defaults.").yellow()
            );
            Config::with_base_dir(config_dir)
        },
        |config| {
            eprintln!("{}", style("Found existing configuration.").green());
            config
        },
    )
}

fn configure_ollama(ollama: &mut OllamaConfig) -> Result<()> {
    let protocols = &["http", "https"];
    let default_index = protocols
        .iter()
        .position(|&p| p == ollama.protocol)
        .unwrap_or(0);

    let protocol_index = Select::new()
        .with_prompt("Ollama protocol")
        .default(default_index)
        .items(protocols)
        .interact()?;

    let protocol = protocols[protocol_index].to_string();

    let host: String = Input::new()
        .with_prompt("Ollama host")
        .default(ollama.host.clone())
        .validate_with(|input: &String| -> Result<(), ConfigError> {
            let temp_config = OllamaConfig {
                protocol: protocol.clone(),
                host: input.clone(),
                ..OllamaConfig::default()
            };
            temp_config.validate()?;
            Ok(())
        })
        .interact_text()?;

    let port: u16 = Input::new()
        .with_prompt("Ollama port")
        .default(ollama.port)
        .validate_with(|input: &u16| -> Result<(), &str> {
            if *input == 0 {
                Err("Port must be greater than 0")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    let model: String = Input::new()
        .with_prompt("Embedding model")
        .default(ollama.model.clone())
        .validate_with(|input: &String| -> Result<(), &str> {
            if input.trim().is_empty() {
                Err("Model name cannot be empty")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    ollama.set_protocol(protocol)?;
    ollama.set_host(host)?;
    ollama.set_port(port)?;
    ollama.set_model(model)?;

    Ok(())
}

fn configure_thresholds(thresholds: &mut Thresholds) -> Result<()> {
    let similarity = |input: &f32| -> Result<(), &str> {
        if *input > 0.0 && *input <= 1.0 {
            Ok(())
        } else {
            Err("Similarity thresholds must be in (0, 1]")
        }
    };

    thresholds.claim_similarity = Input::new()
        .with_prompt("Claim similarity threshold")
        .default(thresholds.claim_similarity)
        .validate_with(similarity)
        .interact_text()?;

    thresholds.exact_match = Input::new()
        .with_prompt("Exact-match (automatic reject) threshold")
        .default(thresholds.exact_match)
        .validate_with(similarity)
        .interact_text()?;

    thresholds.top_k = Input::new()
        .with_prompt("Neighbours retrieved per query")
        .default(thresholds.top_k)
        .validate_with(|input: &usize| -> Result<(), &str> {
            if (1..=100).contains(input) {
                Ok(())
            } else {
                Err("Top-k must be between 1 and 100")
            }
        })
        .interact_text()?;

    thresholds.validate()?;
    Ok(())
}

fn test_ollama_connection(ollama: &OllamaConfig) -> bool {
    let url = format!(
        "{}://{}:{}/api/version",
        ollama.protocol, ollama.host, ollama.port
    );

    let agent: ureq::Agent = ureq::Agent::config_builder()
        .timeout_global(Some(std::time::Duration::from_secs(5)))
        .build()
        .into();

    match agent.get(&url).call() {
        Ok(_) => true,
        Err(ureq::Error::StatusCode(code)) if (400..500).contains(&code) => true,
        Err(_) => false,
    }
}
