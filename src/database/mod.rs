// Vector index storage
// A flat index blob plus a JSON side-table joined by slot id

#[cfg(test)]
mod tests;

pub mod mapping;
pub mod vector_store;

use std::path::Path;

use tracing::info;

pub use mapping::{IndexEntry, IndexMapping};
pub use vector_store::{IndexHeader, Metric, SearchHits, VectorIndex};

use crate::{ReviewError, Result};

/// A search hit joined with the metadata of its slot
#[derive(Debug, Clone, PartialEq)]
pub struct IndexMatch<'a> {
    pub slot: usize,
    pub score: f32,
    pub entry: &'a IndexEntry,
}

/// A vector index and its mapping, always of equal cardinality
#[derive(Debug, Clone, PartialEq)]
pub struct CorpusIndex {
    index: VectorIndex,
    mapping: IndexMapping,
}

impl CorpusIndex {
    #[inline]
    pub fn new(index: VectorIndex, mapping: IndexMapping) -> Result<Self> {
        if index.len() != mapping.len() {
            return Err(ReviewError::Index(format!(
                "Index holds {} vectors but mapping holds {} entries",
                index.len(),
                mapping.len()
            )));
        }
        Ok(Self { index, mapping })
    }

    /// Load both artifacts; either one missing is an error
    #[inline]
    pub fn load(index_path: &Path, mapping_path: &Path) -> Result<Self> {
        if !index_path.exists() {
            return Err(ReviewError::missing("vector index", index_path));
        }
        if !mapping_path.exists() {
            return Err(ReviewError::missing("index mapping", mapping_path));
        }

        let corpus = Self::new(VectorIndex::load(index_path)?, IndexMapping::load(mapping_path)?)?;
        info!(
            "Loaded corpus index with {} documents from {}",
            corpus.len(),
            index_path.display()
        );
        Ok(corpus)
    }

    /// Write both artifacts together
    #[inline]
    pub fn save(&self, index_path: &Path, mapping_path: &Path) -> Result<()> {
        self.index.save(index_path)?;
        self.mapping.save(mapping_path)
    }

    #[inline]
    pub fn index(&self) -> &VectorIndex {
        &self.index
    }

    #[inline]
    pub fn mapping(&self) -> &IndexMapping {
        &self.mapping
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.mapping.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.mapping.is_empty()
    }

    /// Search and resolve every real hit to its metadata, best first per query
    #[inline]
    pub fn search(&self, queries: &[Vec<f32>], k: usize) -> Result<Vec<Vec<IndexMatch<'_>>>> {
        let hits = self.index.search(queries, k)?;
        Ok((0..queries.len())
            .map(|query| {
                hits.hits(query)
                    .filter_map(|(slot, score)| {
                        self.mapping.get(slot).map(|entry| IndexMatch { slot, score, entry })
                    })
                    .collect()
            })
            .collect())
    }
}
