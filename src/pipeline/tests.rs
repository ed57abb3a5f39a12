use super::*;
use crate::config::GrobidConfig;
use crate::documents::pdf::testing::write_pdf;
use crate::embeddings::testing::HashingEmbedder;
use crate::indexer::build_global_index;
use crate::llm::TextCompletion;
use crate::review::Decision;
use chrono::{TimeZone, Utc};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SUBMISSION: &str = "We propose a novel method for sentiment analysis of product reviews. \
    Our model reaches 91% accuracy on the benchmark while using 40 ms per review. \
    The approach combines transformers with a lightweight attention head for long reviews.";

const TEI: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<TEI xmlns="http://www.tei-c.org/ns/1.0">
  <text><back><div type="references"><listBibl>
    <biblStruct>
      <analytic><title level="a">Sentiment Transformers</title>
        <idno type="DOI">10.1000/1</idno></analytic>
      <monogr><imprint><date type="published" when="2021"/></imprint></monogr>
    </biblStruct>
  </listBibl></div></back></text>
</TEI>"#;

struct Fixed(&'static str);

impl TextCompletion for Fixed {
    fn name(&self) -> &str {
        "fixed"
    }

    fn complete(&self, _prompt: &str) -> Result<String> {
        Ok(self.0.to_string())
    }
}

struct Down;

impl TextCompletion for Down {
    fn name(&self) -> &str {
        "down"
    }

    fn complete(&self, _prompt: &str) -> Result<String> {
        Err(ReviewError::Network("connection refused".to_string()))
    }
}

/// Config with a two-paper global index and the submission as a text file
fn reviewed_corpus(temp_dir: &TempDir) -> (Config, PathBuf) {
    let config = Config::with_base_dir(temp_dir.path());
    fs::create_dir_all(config.pdf_dir()).expect("should create pdf dir");
    write_pdf(
        &config.pdf_dir().join("nlp_paper_1.pdf"),
        &["Transformers for sentiment analysis of product reviews reach high accuracy."],
    );
    write_pdf(
        &config.pdf_dir().join("bio_paper_1.pdf"),
        &["Graph neural networks predict molecule properties from atom features."],
    );
    build_global_index(&config, &HashingEmbedder).expect("should build index");

    let submission = temp_dir.path().join("nlp_submission.txt");
    fs::write(&submission, SUBMISSION).expect("should write submission");
    (config, submission)
}

#[test]
fn artifacts_live_under_the_paper_stem() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config = Config::with_base_dir(temp_dir.path());
    let paths = ResultPaths::new(&config, Path::new("/papers/nlp_paper_3.pdf"));

    assert_eq!(paths.dir(), config.results_dir().join("nlp_paper_3"));
    assert_eq!(
        paths.artifact(Stage::Claims),
        config.results_dir().join("nlp_paper_3").join("claim_mapping.json")
    );
    assert_eq!(paths.artifact(Stage::Synthesize).file_name().and_then(|n| n.to_str()), Some("review.txt"));
    assert_eq!(default_topic(Path::new("/papers/nlp_paper_3.pdf")), "nlp");
}

#[test]
fn missing_artifacts_become_empty_evidence() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config = Config::with_base_dir(temp_dir.path());
    let paths = ResultPaths::new(&config, Path::new("paper.pdf"));

    let novelty = NoveltyReport {
        pdf: "paper.pdf".to_string(),
        results: Vec::new(),
    };
    write_json(&paths.artifact(Stage::Novelty), &novelty).expect("should write");

    let evidence = load_evidence(&paths).expect("should load");
    assert_eq!(evidence.novelty, Some(novelty));
    assert!(evidence.citation.is_none());
    assert!(evidence.plagiarism.is_none());
    assert!(evidence.factual.is_none());
    assert!(evidence.claims.is_none());

    let status = artifact_status(&paths);
    let present: Vec<Stage> = status.iter().filter(|s| s.present).map(|s| s.stage).collect();
    assert_eq!(present, vec![Stage::Novelty]);
}

#[test]
fn corrupt_artifact_is_an_error() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config = Config::with_base_dir(temp_dir.path());
    let paths = ResultPaths::new(&config, Path::new("paper.pdf"));
    fs::create_dir_all(paths.dir()).expect("should create");
    fs::write(paths.artifact(Stage::Factual), "{ not json").expect("should write");

    assert!(matches!(load_evidence(&paths), Err(ReviewError::Json(_))));
}

#[test]
fn claims_need_the_novelty_report() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let (config, submission) = reviewed_corpus(&temp_dir);
    let pipeline = Pipeline::new(&config, &HashingEmbedder, &submission);

    match pipeline.claims() {
        Err(ReviewError::MissingArtifact { artifact, path }) => {
            assert_eq!(artifact, "novelty report");
            assert!(path.ends_with("nlp_submission/novelty.json"));
        }
        other => panic!("expected missing novelty report, got {:?}", other),
    }
}

#[test]
fn retrieval_stages_need_the_global_index() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config = Config::with_base_dir(temp_dir.path());
    let submission = temp_dir.path().join("paper.txt");
    fs::write(&submission, SUBMISSION).expect("should write");
    let pipeline = Pipeline::new(&config, &HashingEmbedder, &submission);

    assert!(matches!(
        pipeline.novelty(),
        Err(ReviewError::MissingArtifact { .. })
    ));
    assert!(matches!(
        pipeline.plagiarism(),
        Err(ReviewError::MissingArtifact { .. })
    ));
    assert!(!pipeline.paths().artifact(Stage::Novelty).exists());
}

#[test]
fn offline_stages_feed_the_synthesis() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let (config, submission) = reviewed_corpus(&temp_dir);
    let pipeline = Pipeline::new(&config, &HashingEmbedder, &submission);

    let novelty = pipeline.novelty().expect("novelty should run");
    assert_eq!(novelty.results.len(), 2);
    pipeline.plagiarism().expect("plagiarism should run");
    let factual = pipeline.factual(None).expect("factual should run");
    assert_eq!(factual.topic, "nlp");
    assert_eq!(factual.num_mentions, 2);
    let claims = pipeline.claims().expect("claims should run");
    assert!(!claims.mappings.is_empty());

    let generated_at = Utc.with_ymd_and_hms(2024, 5, 6, 7, 8, 9).unwrap();
    let synthesis = pipeline
        .synthesize_at(None, &generated_at)
        .expect("synthesis should run");

    assert!(synthesis.path.ends_with("nlp_submission/review.txt"));
    assert_eq!(fs::read_to_string(&synthesis.path).expect("should read"), synthesis.review);
    assert!(synthesis.review.contains("Citation quality score: N/A."));
    assert!(synthesis.review.ends_with("Generated on 2024-05-06 07:08:09\n"));
    assert_eq!(synthesis.assessment.novelty.num_results, 2);
    assert_eq!(synthesis.assessment.factual_issues, 0);
}

#[test]
fn narrative_comes_from_the_completion_chain() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config = Config::with_base_dir(temp_dir.path());
    let submission = temp_dir.path().join("paper.pdf");
    let pipeline = Pipeline::new(&config, &HashingEmbedder, &submission);

    let chain = CompletionChain::new(vec![Box::new(Down), Box::new(Fixed("A careful study."))]);
    let synthesis = pipeline.synthesize(Some(&chain)).expect("should synthesize");
    assert!(synthesis.review.contains("\nA careful study.\n"));
    assert_eq!(synthesis.assessment.decision, Decision::AcceptWithMinorRevisions);

    fs::remove_file(&synthesis.path).expect("should remove");
    let exhausted = CompletionChain::new(vec![Box::new(Down)]);
    match pipeline.synthesize(Some(&exhausted)) {
        Err(ReviewError::Completion { failures }) => assert_eq!(failures.len(), 1),
        other => panic!("expected completion failure, got {:?}", other),
    }
    assert!(!synthesis.path.exists());
}

#[tokio::test(flavor = "multi_thread")]
async fn run_writes_every_artifact() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/processFulltextDocument"))
        .respond_with(ResponseTemplate::new(200).set_body_string(TEI))
        .expect(1)
        .mount(&server)
        .await;

    let temp_dir = TempDir::new().expect("should create temp dir");
    let (config, submission) = reviewed_corpus(&temp_dir);
    let grobid = GrobidClient::new(&GrobidConfig {
        url: server.uri(),
        timeout_seconds: 5,
    })
    .expect("client should build");

    let task_config = config.clone();
    let task_submission = submission.clone();
    let synthesis = tokio::task::spawn_blocking(move || {
        Pipeline::new(&task_config, &HashingEmbedder, &task_submission).run(&grobid, None, None)
    })
    .await
    .expect("task should join")
    .expect("pipeline should succeed");

    let paths = ResultPaths::new(&config, &submission);
    assert!(artifact_status(&paths).iter().all(|s| s.present));
    assert_eq!(synthesis.assessment.citation_score, Some(10.0));
    assert!(synthesis.review.contains("**9. Final Recommendation**"));
}

#[tokio::test(flavor = "multi_thread")]
async fn run_stops_at_the_first_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/processFulltextDocument"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let temp_dir = TempDir::new().expect("should create temp dir");
    let (config, submission) = reviewed_corpus(&temp_dir);
    let grobid = GrobidClient::new(&GrobidConfig {
        url: server.uri(),
        timeout_seconds: 5,
    })
    .expect("client should build");

    let task_config = config.clone();
    let task_submission = submission.clone();
    let result = tokio::task::spawn_blocking(move || {
        Pipeline::new(&task_config, &HashingEmbedder, &task_submission).run(&grobid, None, None)
    })
    .await
    .expect("task should join");

    assert!(matches!(result, Err(ReviewError::ExternalService { .. })));
    let paths = ResultPaths::new(&config, &submission);
    assert!(artifact_status(&paths).iter().all(|s| !s.present));
}
