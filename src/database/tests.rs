use super::*;
use tempfile::TempDir;

fn corpus() -> CorpusIndex {
    let mut index = VectorIndex::new(Metric::InnerProduct, 2);
    let mut mapping = IndexMapping::new();
    for (name, vector) in [("a", [1.0, 0.0]), ("b", [0.0, 1.0]), ("c", [0.6, 0.8])] {
        index.add(&vector).expect("add");
        mapping.push(IndexEntry {
            pdf_path: Some(format!("data/pdfs/{}.pdf", name)),
            title: Some(name.to_uppercase()),
            ..IndexEntry::default()
        });
    }
    CorpusIndex::new(index, mapping).expect("cardinality matches")
}

#[test]
fn cardinality_mismatch_is_rejected() {
    let mut index = VectorIndex::new(Metric::InnerProduct, 2);
    index.add(&[1.0, 0.0]).expect("add");

    let result = CorpusIndex::new(index, IndexMapping::new());
    assert!(matches!(result, Err(ReviewError::Index(_))));
}

#[test]
fn search_joins_metadata() {
    let corpus = corpus();
    let matches = corpus.search(&[vec![0.0, 1.0]], 5).expect("search");

    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].len(), 3);
    assert_eq!(matches[0][0].slot, 1);
    assert_eq!(matches[0][0].entry.title.as_deref(), Some("B"));
    assert_eq!(matches[0][1].entry.title.as_deref(), Some("C"));
}

#[test]
fn round_trip_preserves_slot_correspondence() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let index_path = temp_dir.path().join("global_index.bin");
    let mapping_path = temp_dir.path().join("global_mapping.json");

    let corpus = corpus();
    corpus.save(&index_path, &mapping_path).expect("should save");

    let loaded = CorpusIndex::load(&index_path, &mapping_path).expect("should load");
    assert_eq!(loaded, corpus);
    for (slot, entry) in loaded.mapping().iter() {
        assert_eq!(corpus.mapping().get(slot), Some(entry));
        assert_eq!(loaded.index().vector(slot), corpus.index().vector(slot));
    }
}

#[test]
fn loading_half_a_pair_fails() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let index_path = temp_dir.path().join("global_index.bin");
    let mapping_path = temp_dir.path().join("global_mapping.json");

    corpus().index().save(&index_path).expect("should save index only");

    match CorpusIndex::load(&index_path, &mapping_path) {
        Err(ReviewError::MissingArtifact { artifact, .. }) => assert_eq!(artifact, "index mapping"),
        other => panic!("expected missing mapping, got {:?}", other),
    }

    std::fs::remove_file(&index_path).expect("should remove index");
    corpus().mapping().save(&mapping_path).expect("should save mapping only");

    match CorpusIndex::load(&index_path, &mapping_path) {
        Err(ReviewError::MissingArtifact { artifact, .. }) => assert_eq!(artifact, "vector index"),
        other => panic!("expected missing index, got {:?}", other),
    }
}

#[test]
fn mismatched_pair_on_disk_is_rejected() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let index_path = temp_dir.path().join("global_index.bin");
    let mapping_path = temp_dir.path().join("global_mapping.json");

    corpus().index().save(&index_path).expect("should save index");
    IndexMapping::from_entries(vec![IndexEntry::default()])
        .save(&mapping_path)
        .expect("should save mapping");

    assert!(matches!(
        CorpusIndex::load(&index_path, &mapping_path),
        Err(ReviewError::Index(_))
    ));
}
