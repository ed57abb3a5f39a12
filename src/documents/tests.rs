use super::pdf::testing::write_pdf;
use super::*;
use tempfile::TempDir;

#[test]
fn topic_normalization() {
    assert_eq!(
        normalize_topic("A Longitudinal Sentiment Analysis!!!"),
        "a_longitudinal_sentiment_analysis"
    );
    assert_eq!(normalize_topic("  Graph   Neural\tNetworks "), "graph_neural_networks");
    assert_eq!(normalize_topic("BERT-2 models"), "bert2_models");
    assert_eq!(normalize_topic(""), "general");
    assert_eq!(normalize_topic("!!!"), "general");
}

#[test]
fn stem_helpers() {
    assert_eq!(topic_from_stem("nlp_paper_1"), "nlp");
    assert_eq!(topic_from_stem("standalone"), "standalone");
    assert_eq!(document_stem(Path::new("data/pdfs/nlp_paper_1.pdf")), "nlp_paper_1");
    assert_eq!(file_name("data/pdfs/nlp_paper_1.pdf"), "nlp_paper_1.pdf");
    assert!(is_pdf(Path::new("paper.PDF")));
    assert!(!is_pdf(Path::new("paper.txt")));
}

#[test]
fn excerpt_respects_character_cap() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let path = temp_dir.path().join("notes.txt");
    fs::write(&path, "x".repeat(5000)).expect("should write");

    let excerpt = document_excerpt(&path, &ChunkingConfig::default()).expect("excerpt");
    assert_eq!(excerpt.chars().count(), 2000);
}

#[test]
fn resolves_direct_text_first() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let pdf_path = temp_dir.path().join("paper.pdf");
    write_pdf(&pdf_path, &["Direct PDF text"]);

    let parsed = temp_dir.path().join("parsed_text");
    fs::create_dir_all(&parsed).expect("should create dir");
    fs::write(parsed.join("paper.txt"), "Cached text").expect("should write");

    let text = resolve_document_text(&pdf_path, &parsed).expect("should resolve");
    assert!(text.contains("Direct PDF text"));
}

#[test]
fn resolves_cached_text_when_pdf_unreadable() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let parsed = temp_dir.path().join("parsed_text");
    fs::create_dir_all(&parsed).expect("should create dir");
    fs::write(parsed.join("paper.txt"), "Cached text of the paper").expect("should write");

    let missing_pdf = temp_dir.path().join("paper.pdf");
    let text = resolve_document_text(&missing_pdf, &parsed).expect("should fall back");
    assert_eq!(text, "Cached text of the paper");

    fs::write(&missing_pdf, b"corrupt").expect("should write");
    let text = resolve_document_text(&missing_pdf, &parsed).expect("should fall back");
    assert_eq!(text, "Cached text of the paper");
}

#[test]
fn unresolvable_text_is_fatal() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let result = resolve_document_text(&temp_dir.path().join("ghost.pdf"), temp_dir.path());
    assert!(matches!(result, Err(ReviewError::Extraction(_))));
}

#[test]
fn comparison_text_tries_each_location() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let text_path = temp_dir.path().join("other.txt");
    fs::write(&text_path, "Comparison paper text").expect("should write");
    let text_path = text_path.to_string_lossy().into_owned();

    assert_eq!(
        comparison_text(Some("/nonexistent/paper.pdf"), Some(&text_path)).as_deref(),
        Some("Comparison paper text")
    );
    assert_eq!(comparison_text(None, None), None);
    assert_eq!(comparison_text(Some(""), Some("/nonexistent.txt")), None);
}

#[test]
fn metadata_accepts_list_or_single_object() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let path = temp_dir.path().join("metadata.json");

    fs::write(
        &path,
        r#"[
            {"title": "A", "pdf_path": "data/pdfs/a.pdf", "link": "https://example.org/a"},
            {"title": "No PDF", "pdf_path": null},
            {"title": "B", "pdf": "b.pdf", "txt_path": "data/parsed_text/b.txt", "abstract": "About B"}
        ]"#,
    )
    .expect("should write");

    let metadata = load_metadata(&path).expect("list should load");
    assert_eq!(metadata.len(), 2);
    assert_eq!(metadata["a.pdf"].link.as_deref(), Some("https://example.org/a"));
    assert_eq!(metadata["b.pdf"].abstract_text.as_deref(), Some("About B"));
    assert_eq!(
        metadata["b.pdf"].text_path.as_deref(),
        Some("data/parsed_text/b.txt")
    );

    fs::write(&path, r#"{"title": "Solo", "pdf_path": "pdfs/solo.pdf"}"#).expect("should write");
    let metadata = load_metadata(&path).expect("object should load");
    assert_eq!(metadata["solo.pdf"].title.as_deref(), Some("Solo"));
}

#[test]
fn missing_metadata_is_missing_artifact() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    assert!(matches!(
        load_metadata(&temp_dir.path().join("metadata.json")),
        Err(ReviewError::MissingArtifact { .. })
    ));
}

#[test]
fn lists_only_pdfs_sorted() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    for name in ["b.pdf", "a.pdf", "c.txt"] {
        fs::write(temp_dir.path().join(name), "x").expect("should write");
    }

    let pdfs = list_pdfs(temp_dir.path()).expect("should list");
    let names: Vec<String> = pdfs
        .iter()
        .map(|p| document_stem(p))
        .collect();
    assert_eq!(names, vec!["a", "b"]);
}
