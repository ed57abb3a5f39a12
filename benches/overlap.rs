use criterion::{Criterion, criterion_group, criterion_main};
use paper_review::embeddings::{ChunkingConfig, chunk_words};
use paper_review::overlap::exact_ratio;
use std::hint::black_box;

const SOURCE: &str = "Graph neural networks aggregate features from neighbouring nodes to \
    learn representations of molecules, citation graphs and social networks. ";
const REWORDED: &str = "Neural networks on graphs combine the features of adjacent nodes to \
    learn embeddings for molecules, citation networks and social graphs. ";

pub fn criterion_benchmark(c: &mut Criterion) {
    let config = ChunkingConfig::default();
    let paper = chunk_words(&REWORDED.repeat(60), &config);
    let corpus_document = chunk_words(&SOURCE.repeat(60), &config);

    c.bench_function("exact_ratio_chunk_pair", |b| {
        b.iter(|| exact_ratio(black_box(&paper[0].content), black_box(&corpus_document[0].content)))
    });
    c.bench_function("exact_ratio_all_pairs", |b| {
        b.iter(|| {
            paper
                .iter()
                .flat_map(|chunk| {
                    corpus_document
                        .iter()
                        .map(move |other| exact_ratio(&chunk.content, &other.content))
                })
                .filter(|&score| score >= 0.85)
                .count()
        })
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
