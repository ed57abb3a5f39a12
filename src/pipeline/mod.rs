// Review pipeline
// Runs each stage against one paper and keeps its artifacts under results/<stem>/

#[cfg(test)]
mod tests;

use std::cell::OnceCell;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, TimeZone};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, error, info, warn};

use crate::citations::grobid::GrobidClient;
use crate::citations::{CitationReport, run_citation_analysis};
use crate::claims::{ClaimMappingReport, run_claim_mapping};
use crate::config::Config;
use crate::database::CorpusIndex;
use crate::documents::{document_stem, topic_from_stem};
use crate::embeddings::Embedder;
use crate::factual::{FactualReport, run_factual_check};
use crate::llm::CompletionChain;
use crate::novelty::{NoveltyReport, run_novelty_check};
use crate::overlap::{PlagiarismReport, run_plagiarism_check};
use crate::review::{Assessment, Evidence, assess, narrative_prompt, render_review};
use crate::{ReviewError, Result};

/// One step of the full review, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Citations,
    Novelty,
    Plagiarism,
    Factual,
    Claims,
    Synthesize,
}

impl Stage {
    pub const ALL: [Self; 6] = [
        Self::Citations,
        Self::Novelty,
        Self::Plagiarism,
        Self::Factual,
        Self::Claims,
        Self::Synthesize,
    ];

    #[inline]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Citations => "citations",
            Self::Novelty => "novelty",
            Self::Plagiarism => "plagiarism",
            Self::Factual => "factual",
            Self::Claims => "claims",
            Self::Synthesize => "synthesize",
        }
    }

    /// File the stage writes inside the paper's results directory
    #[inline]
    pub fn artifact(self) -> &'static str {
        match self {
            Self::Citations => "citation_report.json",
            Self::Novelty => "novelty.json",
            Self::Plagiarism => "plagiarism.json",
            Self::Factual => "factual.json",
            Self::Claims => "claim_mapping.json",
            Self::Synthesize => "review.txt",
        }
    }

    fn artifact_label(self) -> &'static str {
        match self {
            Self::Citations => "citation report",
            Self::Novelty => "novelty report",
            Self::Plagiarism => "plagiarism report",
            Self::Factual => "factual report",
            Self::Claims => "claim mapping",
            Self::Synthesize => "review",
        }
    }
}

impl std::fmt::Display for Stage {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Artifact locations for one paper
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultPaths {
    dir: PathBuf,
}

impl ResultPaths {
    #[inline]
    pub fn new(config: &Config, pdf_path: &Path) -> Self {
        Self {
            dir: config.results_dir().join(document_stem(pdf_path)),
        }
    }

    #[inline]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    #[inline]
    pub fn artifact(&self, stage: Stage) -> PathBuf {
        self.dir.join(stage.artifact())
    }
}

/// Write `value` as pretty JSON, creating parent directories
#[inline]
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, serde_json::to_string_pretty(value)?)?;
    debug!("Wrote {}", path.display());
    Ok(())
}

/// Parsed JSON artifact, or `None` when the file does not exist
#[inline]
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    Ok(Some(serde_json::from_str(&content)?))
}

fn require_json<T: DeserializeOwned>(path: &Path, artifact: &str) -> Result<T> {
    read_json(path)?.ok_or_else(|| ReviewError::missing(artifact, path))
}

/// Every stage artifact that exists for the paper. A missing file leaves its
/// slot empty.
#[inline]
pub fn load_evidence(paths: &ResultPaths) -> Result<Evidence> {
    let evidence = Evidence {
        citation: read_json(&paths.artifact(Stage::Citations))?,
        novelty: read_json(&paths.artifact(Stage::Novelty))?,
        plagiarism: read_json(&paths.artifact(Stage::Plagiarism))?,
        factual: read_json(&paths.artifact(Stage::Factual))?,
        claims: read_json(&paths.artifact(Stage::Claims))?,
    };

    for (stage, present) in [
        (Stage::Citations, evidence.citation.is_some()),
        (Stage::Novelty, evidence.novelty.is_some()),
        (Stage::Plagiarism, evidence.plagiarism.is_some()),
        (Stage::Factual, evidence.factual.is_some()),
        (Stage::Claims, evidence.claims.is_some()),
    ] {
        if !present {
            warn!("No {} found in {}", stage.artifact_label(), paths.dir().display());
        }
    }

    Ok(evidence)
}

/// Topic used for corpus statistics when none is given: the stem prefix
#[inline]
pub fn default_topic(pdf_path: &Path) -> String {
    topic_from_stem(&document_stem(pdf_path)).to_string()
}

/// Output of the synthesis stage
#[derive(Debug, Clone, PartialEq)]
pub struct Synthesis {
    pub assessment: Assessment,
    pub review: String,
    pub path: PathBuf,
}

/// Presence of each stage artifact for one paper
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactStatus {
    pub stage: Stage,
    pub path: PathBuf,
    pub present: bool,
}

#[inline]
pub fn artifact_status(paths: &ResultPaths) -> Vec<ArtifactStatus> {
    Stage::ALL
        .iter()
        .map(|&stage| {
            let path = paths.artifact(stage);
            ArtifactStatus {
                stage,
                present: path.exists(),
                path,
            }
        })
        .collect()
}

/// Stage runner for a single paper. The global corpus index is loaded on
/// first use and shared by the novelty and plagiarism stages.
pub struct Pipeline<'a> {
    config: &'a Config,
    embedder: &'a dyn Embedder,
    pdf_path: PathBuf,
    paths: ResultPaths,
    corpus: OnceCell<CorpusIndex>,
}

impl<'a> Pipeline<'a> {
    #[inline]
    pub fn new(config: &'a Config, embedder: &'a dyn Embedder, pdf_path: &Path) -> Self {
        Self {
            config,
            embedder,
            pdf_path: pdf_path.to_path_buf(),
            paths: ResultPaths::new(config, pdf_path),
            corpus: OnceCell::new(),
        }
    }

    #[inline]
    pub fn paths(&self) -> &ResultPaths {
        &self.paths
    }

    fn corpus(&self) -> Result<&CorpusIndex> {
        if let Some(corpus) = self.corpus.get() {
            return Ok(corpus);
        }
        let corpus = CorpusIndex::load(
            &self.config.global_index_path(),
            &self.config.global_mapping_path(),
        )?;
        info!("Loaded global index with {} documents", corpus.len());
        Ok(self.corpus.get_or_init(|| corpus))
    }

    #[inline]
    pub fn citations(&self, grobid: &GrobidClient) -> Result<CitationReport> {
        let report = run_citation_analysis(&self.pdf_path, self.config, grobid)?;
        write_json(&self.paths.artifact(Stage::Citations), &report)?;
        Ok(report)
    }

    #[inline]
    pub fn novelty(&self) -> Result<NoveltyReport> {
        let report = run_novelty_check(&self.pdf_path, self.config, self.corpus()?, self.embedder)?;
        write_json(&self.paths.artifact(Stage::Novelty), &report)?;
        Ok(report)
    }

    #[inline]
    pub fn plagiarism(&self) -> Result<PlagiarismReport> {
        let report =
            run_plagiarism_check(&self.pdf_path, self.config, self.corpus()?, self.embedder)?;
        write_json(&self.paths.artifact(Stage::Plagiarism), &report)?;
        Ok(report)
    }

    /// Numeric checks against the statistics of `topic`, or of the topic
    /// named by the file's stem prefix
    #[inline]
    pub fn factual(&self, topic: Option<&str>) -> Result<FactualReport> {
        let topic = topic.map_or_else(|| default_topic(&self.pdf_path), str::to_string);
        let report = run_factual_check(&self.pdf_path, &topic, self.config)?;
        write_json(&self.paths.artifact(Stage::Factual), &report)?;
        Ok(report)
    }

    /// Claim mapping against the papers retrieved by the novelty stage
    #[inline]
    pub fn claims(&self) -> Result<ClaimMappingReport> {
        let novelty_path = self.paths.artifact(Stage::Novelty);
        let novelty: NoveltyReport = require_json(&novelty_path, Stage::Novelty.artifact_label())?;
        let report = run_claim_mapping(&self.pdf_path, self.config, &novelty, self.embedder)?;
        write_json(&self.paths.artifact(Stage::Claims), &report)?;
        Ok(report)
    }

    /// Assess whatever evidence exists and write the review text. With a
    /// completion chain the summary gains a generated narrative; the chain
    /// failing entirely fails the stage.
    #[inline]
    pub fn synthesize(&self, narrative: Option<&CompletionChain>) -> Result<Synthesis> {
        self.synthesize_at(narrative, &Local::now())
    }

    /// [`Pipeline::synthesize`] with a fixed generation time
    #[inline]
    pub fn synthesize_at<Tz>(
        &self,
        narrative: Option<&CompletionChain>,
        generated_at: &DateTime<Tz>,
    ) -> Result<Synthesis>
    where
        Tz: TimeZone,
        Tz::Offset: std::fmt::Display,
    {
        let thresholds = &self.config.thresholds;
        let evidence = load_evidence(&self.paths)?;
        let assessment = assess(&evidence, thresholds);

        let summary = match narrative {
            Some(chain) => Some(chain.complete(&narrative_prompt(&assessment))?),
            None => None,
        };

        let review = render_review(
            &evidence,
            &assessment,
            thresholds,
            summary.as_deref(),
            generated_at,
        );
        let path = self.paths.artifact(Stage::Synthesize);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, &review)?;
        info!("Review saved to {}", path.display());

        Ok(Synthesis {
            assessment,
            review,
            path,
        })
    }

    /// Every stage in order, stopping at the first failure
    #[inline]
    pub fn run(
        &self,
        grobid: &GrobidClient,
        topic: Option<&str>,
        narrative: Option<&CompletionChain>,
    ) -> Result<Synthesis> {
        info!("Reviewing {}", self.pdf_path.display());

        logged(Stage::Citations, || self.citations(grobid))?;
        logged(Stage::Novelty, || self.novelty())?;
        logged(Stage::Plagiarism, || self.plagiarism())?;
        logged(Stage::Factual, || self.factual(topic))?;
        logged(Stage::Claims, || self.claims())?;
        logged(Stage::Synthesize, || self.synthesize(narrative))
    }
}

fn logged<T>(stage: Stage, run: impl FnOnce() -> Result<T>) -> Result<T> {
    info!("Running {} stage", stage);
    run().inspect_err(|e| error!("{} stage failed: {}", stage, e))
}

impl std::fmt::Debug for Pipeline<'_> {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("pdf_path", &self.pdf_path)
            .field("paths", &self.paths)
            .field("corpus_loaded", &self.corpus.get().is_some())
            .finish_non_exhaustive()
    }
}
