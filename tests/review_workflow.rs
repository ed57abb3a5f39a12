#![expect(
    clippy::tests_outside_test_module,
    reason = "integration tests are only compiled in test mode"
)]

// End-to-end review of plain-text papers against a hand-built corpus index

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use paper_review::config::Config;
use paper_review::database::{CorpusIndex, IndexEntry, IndexMapping, Metric, VectorIndex};
use paper_review::embeddings::Embedder;
use paper_review::pipeline::{Pipeline, ResultPaths, Stage, artifact_status, write_json};
use paper_review::review::Decision;

const DIMENSION: usize = 128;

/// Bag-of-words hashing embedder, deterministic and offline
struct WordHashEmbedder;

impl WordHashEmbedder {
    fn vector(text: &str) -> Vec<f32> {
        let mut vector = vec![0.0_f32; DIMENSION];
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            let hash = word
                .to_lowercase()
                .bytes()
                .fold(5381_u32, |h, b| h.wrapping_mul(33) ^ u32::from(b));
            vector[hash as usize % DIMENSION] += 1.0;
        }
        vector
    }
}

impl Embedder for WordHashEmbedder {
    fn embed(&self, texts: &[String]) -> paper_review::Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| Self::vector(t)).collect())
    }
}

const PRIOR_WORK: &str = "We propose a retrieval augmented parser for legal contracts. \
    The parser reaches 88% accuracy on the contract benchmark and processes 120 pages per minute. \
    Our experiments show that retrieval reduces clause extraction errors substantially.";

const UNRELATED: &str = "Coral reef bleaching events were surveyed across twelve island sites. \
    Water temperature anomalies preceded each bleaching event by several weeks.";

/// Global index over two corpus texts, saved where the pipeline expects it
fn corpus(temp_dir: &TempDir) -> Config {
    let config = Config::with_base_dir(temp_dir.path());
    let text_dir = config.parsed_text_dir();
    fs::create_dir_all(&text_dir).expect("should create text dir");

    let mut index = VectorIndex::new(Metric::InnerProduct, DIMENSION);
    let mut mapping = IndexMapping::new();
    for (name, text, title) in [
        ("legal_paper_1", PRIOR_WORK, "Retrieval Parsers for Contracts"),
        ("bio_paper_1", UNRELATED, "Reef Bleaching Survey"),
    ] {
        let text_path = text_dir.join(format!("{}.txt", name));
        fs::write(&text_path, text).expect("should write corpus text");

        let vectors = WordHashEmbedder
            .embed_normalized(&[text.to_string()])
            .expect("should embed");
        index.add(&vectors[0]).expect("should add vector");
        mapping.push(IndexEntry {
            pdf_path: Some(text_path.to_string_lossy().into_owned()),
            text_excerpt: Some(text.to_string()),
            title: Some(title.to_string()),
            link: Some(format!("https://example.org/{}", name)),
            text_path: Some(text_path.to_string_lossy().into_owned()),
            ..IndexEntry::default()
        });
    }

    let corpus = CorpusIndex::new(index, mapping).expect("cardinality should match");
    corpus
        .save(&config.global_index_path(), &config.global_mapping_path())
        .expect("should save corpus");
    config
}

fn submission(temp_dir: &TempDir, name: &str, text: &str) -> PathBuf {
    let path = temp_dir.path().join(name);
    fs::write(&path, text).expect("should write submission");
    path
}

fn run_offline_stages(pipeline: &Pipeline<'_>) {
    pipeline.novelty().expect("novelty should run");
    pipeline.plagiarism().expect("plagiarism should run");
    pipeline.factual(None).expect("factual should run");
    pipeline.claims().expect("claims should run");
}

#[test]
fn copied_paper_is_rejected() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config = corpus(&temp_dir);
    let pdf = submission(&temp_dir, "legal_copy.txt", PRIOR_WORK);
    let pipeline = Pipeline::new(&config, &WordHashEmbedder, &pdf);

    run_offline_stages(&pipeline);
    let synthesis = pipeline.synthesize(None).expect("synthesis should run");

    assert!(synthesis.assessment.exact_match);
    assert_eq!(synthesis.assessment.decision, Decision::Reject);
    assert_eq!(synthesis.assessment.scores.novelty, 0);
    assert!(synthesis.review.contains("Recommendation: **Reject**"));
    assert!(synthesis.review.contains("[legal_paper_1.txt](https://example.org/legal_paper_1)"));

    let paths = ResultPaths::new(&config, &pdf);
    let missing: Vec<Stage> = artifact_status(&paths)
        .into_iter()
        .filter(|s| !s.present)
        .map(|s| s.stage)
        .collect();
    assert_eq!(missing, vec![Stage::Citations]);
}

#[test]
fn unrelated_paper_is_not_rejected() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config = corpus(&temp_dir);
    let pdf = submission(
        &temp_dir,
        "astro_paper_9.txt",
        "We introduce a spectral method for detecting exoplanet transits in noisy photometry. \
         The detector finds 14 new candidates in archival survey data from the last decade.",
    );
    let pipeline = Pipeline::new(&config, &WordHashEmbedder, &pdf);

    run_offline_stages(&pipeline);
    let synthesis = pipeline.synthesize(None).expect("synthesis should run");

    assert!(!synthesis.assessment.exact_match);
    assert_eq!(synthesis.assessment.total_overlaps, Some(0));
    assert_eq!(synthesis.assessment.scores.plagiarism, 10);
    assert_ne!(synthesis.assessment.decision, Decision::Reject);
    assert!(synthesis.review.contains("No overlaps reported by plagiarism step."));
}

#[test]
fn review_reads_hand_written_reports() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config = Config::with_base_dir(temp_dir.path());
    let pdf = Path::new("nlp_paper_7.pdf");
    let paths = ResultPaths::new(&config, pdf);

    write_json(
        &paths.artifact(Stage::Claims),
        &serde_json::json!({
            "new_pdf": "nlp_paper_7.pdf",
            "mappings": [{
                "claim": "We propose a novel method X",
                "is_novel": false,
                "matched_claim": "A method X is proposed",
                "matched_paper_title": "Method X",
                "matched_paper_link": "https://example.org/x",
                "similarity": 0.96
            }],
            "num_new_claims": 1,
            "num_existing_claims": 12
        }),
    )
    .expect("should write claims");

    let overlaps: Vec<serde_json::Value> = (0..25)
        .map(|i| {
            serde_json::json!({
                "chunk": format!("reused passage {}", i),
                "score": 0.8,
                "pdf_name": "prior.pdf",
                "type": "paraphrase_overlap"
            })
        })
        .collect();
    write_json(
        &paths.artifact(Stage::Plagiarism),
        &serde_json::json!({
            "paper": "nlp_paper_7.pdf",
            "exact_overlap": [],
            "paraphrase_overlap": overlaps,
            "summary": {
                "exact_overlap_count": 0,
                "paraphrase_overlap_count": 25,
                "plagiarism_risk": "HIGH"
            }
        }),
    )
    .expect("should write plagiarism");

    let synthesis = Pipeline::new(&config, &WordHashEmbedder, pdf)
        .synthesize(None)
        .expect("synthesis should run");

    assert!(synthesis.review.contains("FALSE → We propose a novel method X"));
    assert!(synthesis.review.contains("25 plagiarism/paraphrase overlaps detected."));
    assert!(synthesis.review.contains("Citation quality score: N/A."));
    assert_eq!(synthesis.assessment.scores.plagiarism, 2);
    assert_eq!(synthesis.assessment.decision, Decision::Reject);
    assert!(paths.artifact(Stage::Synthesize).exists());
}

#[test]
fn corpus_round_trip_keeps_slots() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config = corpus(&temp_dir);

    let loaded = CorpusIndex::load(&config.global_index_path(), &config.global_mapping_path())
        .expect("should load");

    assert_eq!(loaded.len(), 2);
    assert_eq!(loaded.index().metric(), Metric::InnerProduct);
    let titles: Vec<Option<&str>> = loaded
        .mapping()
        .entries()
        .iter()
        .map(|e| e.title.as_deref())
        .collect();
    assert_eq!(
        titles,
        vec![Some("Retrieval Parsers for Contracts"), Some("Reef Bleaching Survey")]
    );
}
