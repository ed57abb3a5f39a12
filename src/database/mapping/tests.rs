use super::*;
use tempfile::TempDir;

fn entry(name: &str) -> IndexEntry {
    IndexEntry {
        pdf_path: Some(format!("data/pdfs/{}.pdf", name)),
        text_excerpt: Some(format!("Excerpt of {}", name)),
        title: Some(format!("Title {}", name)),
        ..IndexEntry::default()
    }
}

#[test]
fn serializes_as_keyed_object_with_all_fields() {
    let mapping = IndexMapping::from_entries(vec![entry("a"), entry("b")]);
    let value = serde_json::to_value(&mapping).expect("should serialize");

    let object = value.as_object().expect("mapping is an object");
    assert_eq!(object.len(), 2);

    let first = object["0"].as_object().expect("entry is an object");
    for key in ["pdf_path", "text_excerpt", "title", "abstract", "link", "published"] {
        assert!(first.contains_key(key), "missing {}", key);
    }
    assert!(!first.contains_key("text_path"));
    assert!(first["link"].is_null());
}

#[test]
fn accepts_list_encoding() {
    let json = r#"[
        {"pdf_path": "a.pdf", "text_excerpt": null, "title": "A", "abstract": null, "link": null, "published": null},
        {"pdf_path": "b.pdf"}
    ]"#;
    let mapping: IndexMapping = serde_json::from_str(json).expect("list should parse");

    assert_eq!(mapping.len(), 2);
    assert_eq!(mapping.get(1).and_then(|e| e.pdf_path.as_deref()), Some("b.pdf"));
}

#[test]
fn accepts_unordered_numeric_keys() {
    let json = r#"{
        "2": {"pdf_path": "c.pdf"},
        "0": {"pdf_path": "a.pdf", "abstract": "About A"},
        "1": {"pdf_path": "b.pdf", "text_path": "data/parsed_text/b.txt"}
    }"#;
    let mapping: IndexMapping = serde_json::from_str(json).expect("keyed map should parse");

    let names: Vec<&str> = mapping
        .entries()
        .iter()
        .filter_map(|e| e.pdf_path.as_deref())
        .collect();
    assert_eq!(names, vec!["a.pdf", "b.pdf", "c.pdf"]);
    assert_eq!(
        mapping.get(0).and_then(|e| e.abstract_text.as_deref()),
        Some("About A")
    );
    assert_eq!(
        mapping.get(1).and_then(|e| e.text_path.as_deref()),
        Some("data/parsed_text/b.txt")
    );
}

#[test]
fn rejects_gaps_duplicates_and_bad_keys() {
    let gap = r#"{"0": {"pdf_path": "a.pdf"}, "2": {"pdf_path": "c.pdf"}}"#;
    assert!(serde_json::from_str::<IndexMapping>(gap).is_err());

    let duplicate = r#"{"0": {"pdf_path": "a.pdf"}, "00": {"pdf_path": "b.pdf"}}"#;
    assert!(serde_json::from_str::<IndexMapping>(duplicate).is_err());

    let non_numeric = r#"{"0": {"pdf_path": "a.pdf"}, "first": {"pdf_path": "b.pdf"}}"#;
    assert!(serde_json::from_str::<IndexMapping>(non_numeric).is_err());
}

#[test]
fn save_then_load_round_trip() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let path = temp_dir.path().join("index").join("global_mapping.json");

    let mut mapping = IndexMapping::new();
    assert_eq!(mapping.push(entry("a")), 0);
    assert_eq!(
        mapping.push(IndexEntry {
            refs_path: Some("data/references/b_refs.xml".to_string()),
            ..entry("b")
        }),
        1
    );

    mapping.save(&path).expect("should save mapping");
    let loaded = IndexMapping::load(&path).expect("should load mapping");
    assert_eq!(loaded, mapping);
}

#[test]
fn load_missing_mapping_is_missing_artifact() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let result = IndexMapping::load(&temp_dir.path().join("absent.json"));
    assert!(matches!(result, Err(ReviewError::MissingArtifact { .. })));
}

#[test]
fn display_name_prefers_pdf_basename() {
    assert_eq!(entry("paper").display_name(), "paper.pdf");

    let text_only = IndexEntry {
        text_path: Some("data/parsed_text/nlp_paper_1.txt".to_string()),
        ..IndexEntry::default()
    };
    assert_eq!(text_only.display_name(), "nlp_paper_1.txt");

    let titled = IndexEntry {
        title: Some("Only a title".to_string()),
        ..IndexEntry::default()
    };
    assert_eq!(titled.display_name(), "Only a title");
}

#[test]
fn raw_keys_are_read_without_validation() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let path = temp_dir.path().join("mapping.json");
    fs::write(&path, r#"{"0": {}, "5": {}, "x": {}}"#).expect("should write");

    let mut keys = read_slot_keys(&path).expect("should read keys");
    keys.sort();
    assert_eq!(keys, vec!["0", "5", "x"]);
}
