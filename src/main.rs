use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use paper_review::commands::{self, ThresholdOverrides, load_config};
use paper_review::config::{get_config_dir, run_interactive_config, show_config};
use paper_review::sources::DEFAULT_MAX_PAPERS;

#[derive(Parser)]
#[command(name = "paper-review")]
#[command(about = "Peer-review triage for research papers against a local corpus")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    thresholds: ThresholdOverrides,
}

#[derive(Subcommand)]
enum Commands {
    /// Configure the embedding service, thresholds and GROBID
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
    /// Fetch papers on a topic from arXiv, Semantic Scholar and CrossRef
    Fetch {
        /// Topic keyword to search for
        topic: String,
        /// Number of papers to collect
        #[arg(long, default_value_t = DEFAULT_MAX_PAPERS)]
        max_papers: usize,
    },
    /// Extract and cache the text of every corpus PDF
    Ingest {
        /// Also fetch each PDF's references from GROBID
        #[arg(long)]
        references: bool,
    },
    /// Build the global corpus index
    Index,
    /// Find the corpus papers most similar to a paper
    Novelty {
        pdf: PathBuf,
    },
    /// Detect exact and paraphrased overlap with the corpus
    Plagiarism {
        pdf: PathBuf,
    },
    /// Check the numbers in a paper against each other and the topic corpus
    Factual {
        pdf: PathBuf,
        /// Topic whose corpus statistics to compare against (defaults to the file name prefix)
        #[arg(long)]
        topic: Option<String>,
    },
    /// Analyze the reference list with GROBID
    Citations {
        pdf: PathBuf,
    },
    /// Map the paper's claims against claims of similar papers
    Claims {
        pdf: PathBuf,
    },
    /// Write the review from whatever stage reports exist
    Synthesize {
        pdf: PathBuf,
        /// Add a generated summary paragraph from the configured language models
        #[arg(long)]
        narrative: bool,
    },
    /// Run every stage in order and write the review
    Run {
        pdf: PathBuf,
        #[arg(long)]
        topic: Option<String>,
        #[arg(long)]
        narrative: bool,
    },
    /// Show corpus, index and service status, and a paper's artifacts
    Status {
        pdf: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Commands::Config { show } = cli.command {
        let config_dir = get_config_dir()?;
        return if show {
            show_config(&config_dir)
        } else {
            run_interactive_config(&config_dir)
        };
    }

    let config = load_config(&cli.thresholds)?;

    match cli.command {
        Commands::Config { .. } => {}
        Commands::Fetch { topic, max_papers } => {
            commands::fetch_papers(&config, &topic, max_papers)?;
        }
        Commands::Ingest { references } => {
            commands::ingest(&config, references)?;
        }
        Commands::Index => {
            commands::build_index(&config)?;
        }
        Commands::Novelty { pdf } => {
            commands::novelty(&config, &pdf)?;
        }
        Commands::Plagiarism { pdf } => {
            commands::plagiarism(&config, &pdf)?;
        }
        Commands::Factual { pdf, topic } => {
            commands::factual(&config, &pdf, topic.as_deref())?;
        }
        Commands::Citations { pdf } => {
            commands::citations(&config, &pdf)?;
        }
        Commands::Claims { pdf } => {
            commands::claims(&config, &pdf)?;
        }
        Commands::Synthesize { pdf, narrative } => {
            commands::synthesize(&config, &pdf, narrative)?;
        }
        Commands::Run {
            pdf,
            topic,
            narrative,
        } => {
            commands::run(&config, &pdf, topic.as_deref(), narrative)?;
        }
        Commands::Status { pdf } => {
            commands::show_status(&config, pdf.as_deref())?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    #[test]
    fn status_without_paper() {
        let cli = Cli::try_parse_from(["paper-review", "status"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            assert!(matches!(parsed.command, Commands::Status { pdf: None }));
        }
    }

    #[test]
    fn fetch_defaults_max_papers() {
        let cli = Cli::try_parse_from(["paper-review", "fetch", "graph neural networks"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            if let Commands::Fetch { topic, max_papers } = parsed.command {
                assert_eq!(topic, "graph neural networks");
                assert_eq!(max_papers, DEFAULT_MAX_PAPERS);
            }
        }
    }

    #[test]
    fn run_with_topic_and_narrative() {
        let cli = Cli::try_parse_from([
            "paper-review",
            "run",
            "paper.pdf",
            "--topic",
            "nlp",
            "--narrative",
        ]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            if let Commands::Run {
                pdf,
                topic,
                narrative,
            } = parsed.command
            {
                assert_eq!(pdf, PathBuf::from("paper.pdf"));
                assert_eq!(topic.as_deref(), Some("nlp"));
                assert!(narrative);
            }
        }
    }

    #[test]
    fn threshold_overrides_are_global() {
        let cli = Cli::try_parse_from([
            "paper-review",
            "plagiarism",
            "paper.pdf",
            "--exact-match",
            "0.99",
            "--top-k",
            "8",
        ]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            assert_eq!(parsed.thresholds.exact_match, Some(0.99));
            assert_eq!(parsed.thresholds.top_k, Some(8));
            assert_eq!(parsed.thresholds.claim_threshold, None);
        }
    }

    #[test]
    fn config_show_flag() {
        let cli = Cli::try_parse_from(["paper-review", "config", "--show"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            if let Commands::Config { show } = parsed.command {
                assert!(show);
            }
        }
    }

    #[test]
    fn stage_requires_a_paper() {
        let cli = Cli::try_parse_from(["paper-review", "novelty"]);
        assert!(cli.is_err());

        if let Err(err) = cli {
            assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
        }
    }

    #[test]
    fn invalid_command() {
        let cli = Cli::try_parse_from(["paper-review", "invalid"]);
        assert!(cli.is_err());

        if let Err(err) = cli {
            assert_eq!(err.kind(), ErrorKind::InvalidSubcommand);
        }
    }
}
