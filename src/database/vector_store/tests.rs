use super::*;
use tempfile::TempDir;

fn sample_index(metric: Metric) -> VectorIndex {
    let mut index = VectorIndex::new(metric, 2);
    index
        .add_all(&[vec![1.0, 0.0], vec![0.0, 1.0], vec![0.6, 0.8]])
        .expect("vectors should be added");
    index
}

#[test]
fn add_assigns_sequential_slots() {
    let mut index = VectorIndex::new(Metric::InnerProduct, 3);
    assert!(index.is_empty());

    assert_eq!(index.add(&[1.0, 0.0, 0.0]).expect("add"), 0);
    assert_eq!(index.add(&[0.0, 1.0, 0.0]).expect("add"), 1);
    assert_eq!(index.len(), 2);
    assert_eq!(index.vector(1), Some(&[0.0, 1.0, 0.0][..]));
    assert_eq!(index.vector(2), None);
}

#[test]
fn add_rejects_wrong_dimension() {
    let mut index = VectorIndex::new(Metric::InnerProduct, 3);
    assert!(matches!(index.add(&[1.0, 0.0]), Err(ReviewError::Index(_))));
    assert!(index.is_empty());
}

#[test]
fn inner_product_ranks_descending() {
    let index = sample_index(Metric::InnerProduct);
    let hits = index.search(&[vec![1.0, 0.0]], 2).expect("search");

    assert_eq!(hits.ids, vec![vec![0, 2]]);
    assert!((hits.scores[0][0] - 1.0).abs() < 1e-6);
    assert!((hits.scores[0][1] - 0.6).abs() < 1e-6);
}

#[test]
fn l2_ranks_ascending() {
    let index = sample_index(Metric::L2);
    let hits = index.search(&[vec![0.0, 1.0]], 3).expect("search");

    assert_eq!(hits.ids[0], vec![1, 2, 0]);
    assert!(hits.scores[0][0].abs() < 1e-6);
    assert!((hits.scores[0][2] - 2.0).abs() < 1e-6);
}

#[test]
fn search_pads_with_sentinels() {
    let index = sample_index(Metric::InnerProduct);
    let hits = index.search(&[vec![1.0, 0.0]], 5).expect("search");

    assert_eq!(hits.ids[0], vec![0, 2, 1, -1, -1]);
    assert_eq!(hits.scores[0][3], f32::MIN);
    assert_eq!(hits.hits(0).count(), 3);

    let empty = VectorIndex::new(Metric::L2, 2);
    let hits = empty.search(&[vec![1.0, 0.0]], 2).expect("search");
    assert_eq!(hits.ids[0], vec![-1, -1]);
    assert_eq!(hits.scores[0], vec![f32::MAX, f32::MAX]);
    assert_eq!(hits.hits(0).count(), 0);
}

#[test]
fn search_handles_multiple_queries() {
    let index = sample_index(Metric::InnerProduct);
    let hits = index
        .search(&[vec![1.0, 0.0], vec![0.0, 1.0]], 1)
        .expect("search");

    assert_eq!(hits.ids, vec![vec![0], vec![1]]);
    let best: Vec<(usize, f32)> = hits.hits(1).collect();
    assert_eq!(best.len(), 1);
    assert_eq!(best[0].0, 1);
}

#[test]
fn search_rejects_wrong_query_dimension() {
    let index = sample_index(Metric::InnerProduct);
    assert!(matches!(
        index.search(&[vec![1.0, 0.0, 0.0]], 2),
        Err(ReviewError::Index(_))
    ));
}

#[test]
fn ties_resolve_to_lower_slot() {
    let mut index = VectorIndex::new(Metric::InnerProduct, 2);
    index
        .add_all(&[vec![0.0, 1.0], vec![1.0, 0.0], vec![1.0, 0.0]])
        .expect("add");

    let hits = index.search(&[vec![1.0, 0.0]], 2).expect("search");
    assert_eq!(hits.ids[0], vec![1, 2]);
}

#[test]
fn save_and_load_preserves_vectors() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let path = temp_dir.path().join("index").join("global_index.bin");

    let index = sample_index(Metric::L2);
    index.save(&path).expect("should save index");

    let loaded = VectorIndex::load(&path).expect("should load index");
    assert_eq!(loaded, index);
    assert_eq!(loaded.metric(), Metric::L2);

    let header = VectorIndex::read_header(&path).expect("should read header");
    assert_eq!(header.count, 3);
    assert_eq!(header.dimension, 2);
}

#[test]
fn load_missing_file_is_missing_artifact() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let result = VectorIndex::load(&temp_dir.path().join("absent.bin"));
    assert!(matches!(result, Err(ReviewError::MissingArtifact { .. })));
}

#[test]
fn corrupt_blobs_are_rejected() {
    assert!(VectorIndex::from_bytes(b"nope").is_err());

    let mut bytes = sample_index(Metric::InnerProduct).to_bytes();
    bytes.truncate(bytes.len() - 2);
    assert!(matches!(
        VectorIndex::from_bytes(&bytes),
        Err(ReviewError::Index(_))
    ));

    let mut bytes = sample_index(Metric::InnerProduct).to_bytes();
    bytes[8] = 9;
    assert!(VectorIndex::from_bytes(&bytes).is_err());
}
