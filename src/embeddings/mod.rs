
pub mod chunking;
pub mod ollama;

pub use chunking::{
    ChunkingConfig, ContentChunk, chunk_words, normalize_whitespace, split_into_sentences,
    truncate_chars,
};
pub use ollama::OllamaClient;

/// A service that turns texts into fixed-dimension vectors.
///
/// Results are positional: the `i`th vector belongs to the `i`th text.
pub trait Embedder {
    fn embed(&self, texts: &[String]) -> crate::Result<Vec<Vec<f32>>>;

    /// Embed and L2-normalize, so inner products are cosine similarities
    #[inline]
    fn embed_normalized(&self, texts: &[String]) -> crate::Result<Vec<Vec<f32>>> {
        let mut vectors = self.embed(texts)?;
        for vector in &mut vectors {
            normalize_l2(vector);
        }
        Ok(vectors)
    }
}

/// Scale a vector to unit length in place. Zero vectors are left untouched.
#[inline]
pub fn normalize_l2(vector: &mut [f32]) {
    let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in vector.iter_mut() {
            *x /= norm;
        }
    }
}

#[inline]
pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Cosine similarity of two vectors; 0.0 when either has zero length or the
/// dimensions differ.
#[inline]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let norm_a = dot(a, a).sqrt();
    let norm_b = dot(b, b).sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot(a, b) / (norm_a * norm_b)
}
