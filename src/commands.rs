use anyhow::{Context, Result};
use console::style;
use std::path::Path;
use tracing::{info, warn};

use crate::citations::grobid::GrobidClient;
use crate::config::{Config, Thresholds, get_config_dir};
use crate::documents::ingest::{SUMMARY_FILE, ingest_corpus};
use crate::embeddings::OllamaClient;
use crate::indexer::{build_global_index, validate_consistency};
use crate::llm::CompletionChain;
use crate::pipeline::{Pipeline, ResultPaths, Stage, Synthesis, artifact_status};
use crate::sources::{PaperFetcher, fetch_topic};

/// Threshold overrides for a single invocation. The stored configuration is
/// never modified.
#[derive(Debug, Clone, Default, PartialEq, clap::Args)]
pub struct ThresholdOverrides {
    /// Similarity at which a new claim duplicates an existing one
    #[arg(long, global = true, value_name = "SIMILARITY")]
    pub claim_threshold: Option<f32>,
    /// Similarity at which an overlap or claim forces a reject
    #[arg(long, global = true, value_name = "SIMILARITY")]
    pub exact_match: Option<f32>,
    /// Minimum semantic score for a paraphrase overlap
    #[arg(long, global = true, value_name = "SIMILARITY")]
    pub paraphrase_threshold: Option<f32>,
    /// Minimum character ratio for an exact overlap
    #[arg(long, global = true, value_name = "RATIO")]
    pub exact_overlap_threshold: Option<f32>,
    /// Z-score beyond which a number is a corpus outlier
    #[arg(long, global = true, value_name = "Z")]
    pub z_threshold: Option<f64>,
    /// Neighbours retrieved from the corpus index
    #[arg(long, global = true, value_name = "K")]
    pub top_k: Option<usize>,
    /// Evidence lines shown per review section
    #[arg(long, global = true, value_name = "N")]
    pub evidence_count: Option<usize>,
}

impl ThresholdOverrides {
    #[inline]
    pub fn apply(&self, thresholds: &mut Thresholds) {
        if let Some(value) = self.claim_threshold {
            thresholds.claim_similarity = value;
        }
        if let Some(value) = self.exact_match {
            thresholds.exact_match = value;
        }
        if let Some(value) = self.paraphrase_threshold {
            thresholds.paraphrase_similarity = value;
        }
        if let Some(value) = self.exact_overlap_threshold {
            thresholds.exact_overlap_similarity = value;
        }
        if let Some(value) = self.z_threshold {
            thresholds.outlier_z = value;
        }
        if let Some(value) = self.top_k {
            thresholds.top_k = value;
        }
        if let Some(value) = self.evidence_count {
            thresholds.evidence_count = value;
        }
    }
}

/// Stored configuration with the invocation's overrides applied
#[inline]
pub fn load_config(overrides: &ThresholdOverrides) -> Result<Config> {
    let config_dir = get_config_dir()?;
    let mut config = Config::load(&config_dir).context("Failed to load configuration")?;
    overrides.apply(&mut config.thresholds);
    config
        .thresholds
        .validate()
        .context("Invalid threshold override")?;
    Ok(config)
}

fn embedder(config: &Config) -> Result<OllamaClient> {
    OllamaClient::new(&config.ollama).context("Failed to create Ollama client")
}

fn grobid(config: &Config) -> Result<GrobidClient> {
    GrobidClient::new(&config.grobid).context("Failed to create GROBID client")
}

fn narrative_chain(config: &Config, narrative: bool) -> Result<Option<CompletionChain>> {
    if !narrative {
        return Ok(None);
    }
    let chain = CompletionChain::from_config(&config.llm)
        .context("Failed to configure text-completion backends")?;
    info!("Narrative backends: {}", chain.names().join(", "));
    Ok(Some(chain))
}

fn saved(path: &Path) {
    println!("💾 Saved {}", style(path.display()).cyan());
}

/// Search the public sources for a topic and build its topic index
#[inline]
pub fn fetch_papers(config: &Config, topic: &str, max_papers: usize) -> Result<()> {
    let embedder = embedder(config)?;
    let fetcher = PaperFetcher::public()?;

    let outcome = fetch_topic(config, topic, max_papers, &fetcher, &embedder)?;

    if outcome.papers.is_empty() {
        println!("No papers found for '{}'", topic);
        return Ok(());
    }

    println!(
        "📚 {} papers for '{}'{}",
        outcome.papers.len(),
        topic,
        if outcome.from_cache { " (cached)" } else { "" }
    );
    for paper in &outcome.papers {
        println!(
            "   • {}{}",
            paper.title.as_deref().unwrap_or("Untitled"),
            if paper.pdf_path.is_some() { " [pdf]" } else { "" }
        );
    }
    if let Some(index) = &outcome.index {
        println!("🗂  Topic index built with {} papers", index.len());
    }

    Ok(())
}

/// Extract text from every corpus PDF and optionally fetch its references
#[inline]
pub fn ingest(config: &Config, with_references: bool) -> Result<()> {
    let client = if with_references {
        Some(grobid(config)?)
    } else {
        None
    };

    let processed = ingest_corpus(config, client.as_ref())?;
    let with_text = processed.iter().filter(|p| p.text_path.is_some()).count();
    let with_refs = processed.iter().filter(|p| p.refs_path.is_some()).count();

    println!("📄 Processed {} PDFs", processed.len());
    println!("   Text extracted: {}", with_text);
    if with_references {
        println!("   References fetched: {}", with_refs);
    }
    saved(&config.data_dir().join(SUMMARY_FILE));

    Ok(())
}

/// Build the global corpus index and check it against its mapping
#[inline]
pub fn build_index(config: &Config) -> Result<()> {
    let embedder = embedder(config)?;
    let (corpus, stats) = build_global_index(config, &embedder)?;

    println!("🗂  Global index built");
    println!("   Documents indexed: {}", stats.documents_indexed);
    println!("   Documents skipped: {}", stats.documents_skipped);
    println!("   With metadata: {}", stats.with_metadata);
    println!("   Dimension: {}", corpus.index().dimension());

    let report = validate_consistency(&config.global_index_path(), &config.global_mapping_path())?;
    println!("   {}", report.summary());

    Ok(())
}

#[inline]
pub fn novelty(config: &Config, pdf: &Path) -> Result<()> {
    let embedder = embedder(config)?;
    let pipeline = Pipeline::new(config, &embedder, pdf);
    let report = pipeline.novelty()?;

    println!("🔎 Novelty results for {}", pdf.display());
    for (rank, result) in report.results.iter().enumerate() {
        println!(
            "   {}. {:.4} {} {}",
            rank + 1,
            result.similarity,
            result.novelty.as_str(),
            result
                .title
                .as_deref()
                .or(result.pdf_path.as_deref())
                .unwrap_or("unknown")
        );
    }
    saved(&pipeline.paths().artifact(Stage::Novelty));
    Ok(())
}

#[inline]
pub fn plagiarism(config: &Config, pdf: &Path) -> Result<()> {
    let embedder = embedder(config)?;
    let pipeline = Pipeline::new(config, &embedder, pdf);
    let report = pipeline.plagiarism()?;

    println!("🧾 Overlap summary for {}", pdf.display());
    println!("   Exact overlaps: {}", report.summary.exact_overlap_count);
    println!("   Paraphrase overlaps: {}", report.summary.paraphrase_overlap_count);
    println!("   Risk: {}", report.summary.plagiarism_risk.as_str());
    saved(&pipeline.paths().artifact(Stage::Plagiarism));
    Ok(())
}

#[inline]
pub fn factual(config: &Config, pdf: &Path, topic: Option<&str>) -> Result<()> {
    let embedder = embedder(config)?;
    let pipeline = Pipeline::new(config, &embedder, pdf);
    let report = pipeline.factual(topic)?;

    println!("🔢 {} numeric mentions (topic '{}')", report.num_mentions, report.topic);
    for issue in report
        .issues
        .hard_checks
        .iter()
        .chain(&report.issues.statistical_checks)
    {
        println!("   ⚠️  {}", issue);
    }
    if report.issue_count() == 0 {
        println!("   ✅ No factual issues found");
    }
    saved(&pipeline.paths().artifact(Stage::Factual));
    Ok(())
}

#[inline]
pub fn citations(config: &Config, pdf: &Path) -> Result<()> {
    let embedder = embedder(config)?;
    let pipeline = Pipeline::new(config, &embedder, pdf);
    let report = pipeline.citations(&grobid(config)?)?;
    let analysis = &report.analysis;

    println!("📑 Citation analysis for {}", pdf.display());
    println!("   References: {}", analysis.total_references);
    println!("   Recent: {:.1}%", analysis.recent_percentage);
    println!("   Outdated: {:.1}%", analysis.outdated_percentage);
    println!("   Missing DOIs: {}", analysis.missing_dois);
    println!("   Quality score: {:.2}", analysis.citation_quality_score);
    saved(&pipeline.paths().artifact(Stage::Citations));
    Ok(())
}

#[inline]
pub fn claims(config: &Config, pdf: &Path) -> Result<()> {
    let embedder = embedder(config)?;
    let pipeline = Pipeline::new(config, &embedder, pdf);
    let report = pipeline.claims()?;

    let duplicates = report.mappings.iter().filter(|m| !m.is_novel).count();
    println!(
        "🧩 {} claims mapped against {} existing claims",
        report.num_new_claims, report.num_existing_claims
    );
    println!("   Novel: {}", report.mappings.len() - duplicates);
    println!("   Matching prior work: {}", duplicates);
    saved(&pipeline.paths().artifact(Stage::Claims));
    Ok(())
}

fn print_synthesis(synthesis: &Synthesis) {
    let scores = &synthesis.assessment.scores;
    println!("{}", synthesis.review);
    println!(
        "📊 Novelty {} | Claims {} | Plagiarism {} | Factual {}",
        scores.novelty, scores.claims, scores.plagiarism, scores.factual_accuracy
    );
    println!(
        "⚖️  Decision: {}",
        style(synthesis.assessment.decision).bold()
    );
    saved(&synthesis.path);
}

#[inline]
pub fn synthesize(config: &Config, pdf: &Path, narrative: bool) -> Result<()> {
    let embedder = embedder(config)?;
    let chain = narrative_chain(config, narrative)?;
    let synthesis = Pipeline::new(config, &embedder, pdf).synthesize(chain.as_ref())?;
    print_synthesis(&synthesis);
    Ok(())
}

/// Every stage in order for one paper
#[inline]
pub fn run(config: &Config, pdf: &Path, topic: Option<&str>, narrative: bool) -> Result<()> {
    let embedder = embedder(config)?;
    let grobid = grobid(config)?;
    let chain = narrative_chain(config, narrative)?;

    let synthesis = Pipeline::new(config, &embedder, pdf)
        .run(&grobid, topic, chain.as_ref())
        .with_context(|| format!("Review of {} aborted", pdf.display()))?;
    print_synthesis(&synthesis);
    Ok(())
}

/// Corpus, index and service health, plus the artifacts of one paper
#[inline]
pub fn show_status(config: &Config, pdf: Option<&Path>) -> Result<()> {
    println!("{}", style("📊 Paper Review Status").bold().cyan());
    println!();

    println!("📁 Data directory: {}", config.data_dir().display());
    match crate::documents::list_pdfs(&config.pdf_dir()) {
        Ok(pdfs) => println!("   Corpus PDFs: {}", pdfs.len()),
        Err(e) => println!("   Corpus PDFs: {}", e),
    }

    println!();
    println!("🗂  Global index:");
    let index_path = config.global_index_path();
    let mapping_path = config.global_mapping_path();
    if index_path.exists() && mapping_path.exists() {
        match validate_consistency(&index_path, &mapping_path) {
            Ok(report) if report.is_consistent => println!("   ✅ {}", report.summary()),
            Ok(report) => {
                println!("   ⚠️  {}", report.summary());
                println!("   Run 'paper-review index' to rebuild both files together");
            }
            Err(e) => println!("   ❌ Failed to check consistency: {}", e),
        }
    } else {
        println!("   📭 Not built yet, run 'paper-review index'");
    }

    println!();
    println!("🤖 Ollama:");
    match embedder(config).and_then(|client| client.health_check()) {
        Ok(()) => println!(
            "   ✅ Reachable at {}:{} with model {}",
            config.ollama.host, config.ollama.port, config.ollama.model
        ),
        Err(e) => {
            warn!("Ollama health check failed: {}", e);
            println!("   ❌ {}", e);
        }
    }

    if let Some(pdf) = pdf {
        let paths = ResultPaths::new(config, pdf);
        println!();
        println!("📄 Artifacts for {}:", pdf.display());
        for status in artifact_status(&paths) {
            println!(
                "   {} {:<11} {}",
                if status.present { "✅" } else { "⬜" },
                status.stage.as_str(),
                status.path.display()
            );
        }
    }

    Ok(())
}
