#[cfg(test)]
mod tests;

use std::cmp::Ordering;
use std::fs;
use std::path::Path;

use tracing::{debug, info};

use crate::embeddings::dot;
use crate::{ReviewError, Result};

const MAGIC: &[u8; 4] = b"PRVI";
const FORMAT_VERSION: u32 = 1;
const HEADER_LEN: usize = 24;

/// How stored vectors are compared with a query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    /// Inner product, higher is closer. Cosine similarity for normalized vectors.
    InnerProduct,
    /// Squared Euclidean distance, lower is closer
    L2,
}

impl Metric {
    fn code(self) -> u32 {
        match self {
            Self::InnerProduct => 0,
            Self::L2 => 1,
        }
    }

    fn from_code(code: u32) -> Option<Self> {
        match code {
            0 => Some(Self::InnerProduct),
            1 => Some(Self::L2),
            _ => None,
        }
    }

    /// Score reported in padding positions of a search result
    #[inline]
    pub fn sentinel(self) -> f32 {
        match self {
            Self::InnerProduct => f32::MIN,
            Self::L2 => f32::MAX,
        }
    }

    fn score(self, a: &[f32], b: &[f32]) -> f32 {
        match self {
            Self::InnerProduct => dot(a, b),
            Self::L2 => a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum(),
        }
    }

    fn rank(self, a: f32, b: f32) -> Ordering {
        match self {
            Self::InnerProduct => b.total_cmp(&a),
            Self::L2 => a.total_cmp(&b),
        }
    }
}

/// Per-query search results, padded to `k` with slot id `-1`
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHits {
    pub scores: Vec<Vec<f32>>,
    pub ids: Vec<Vec<i64>>,
}

impl SearchHits {
    /// Real hits of one query as `(slot, score)`, best first
    #[inline]
    pub fn hits(&self, query: usize) -> impl Iterator<Item = (usize, f32)> + '_ {
        let ids = self.ids.get(query).map_or(&[][..], Vec::as_slice);
        let scores = self.scores.get(query).map_or(&[][..], Vec::as_slice);
        ids.iter()
            .zip(scores)
            .filter_map(|(&id, &score)| usize::try_from(id).ok().map(|slot| (slot, score)))
    }
}

/// Header fields of a persisted index, readable without loading the rows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexHeader {
    pub metric: Metric,
    pub dimension: usize,
    pub count: usize,
}

/// Exact flat vector index. Slot ids are insertion positions and never change.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorIndex {
    metric: Metric,
    dimension: usize,
    data: Vec<f32>,
}

impl VectorIndex {
    #[inline]
    pub fn new(metric: Metric, dimension: usize) -> Self {
        Self {
            metric,
            dimension,
            data: Vec::new(),
        }
    }

    #[inline]
    pub fn metric(&self) -> Metric {
        self.metric
    }

    #[inline]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    #[inline]
    pub fn len(&self) -> usize {
        if self.dimension == 0 {
            0
        } else {
            self.data.len() / self.dimension
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Append a vector and return its slot id
    #[inline]
    pub fn add(&mut self, vector: &[f32]) -> Result<usize> {
        if vector.len() != self.dimension || self.dimension == 0 {
            return Err(ReviewError::Index(format!(
                "Vector has {} dimensions, index expects {}",
                vector.len(),
                self.dimension
            )));
        }

        let slot = self.len();
        self.data.extend_from_slice(vector);
        Ok(slot)
    }

    #[inline]
    pub fn add_all(&mut self, vectors: &[Vec<f32>]) -> Result<()> {
        for vector in vectors {
            self.add(vector)?;
        }
        Ok(())
    }

    #[inline]
    pub fn vector(&self, slot: usize) -> Option<&[f32]> {
        let start = slot.checked_mul(self.dimension)?;
        self.data.get(start..start + self.dimension)
    }

    /// Find the `k` nearest stored vectors for every query
    #[inline]
    pub fn search(&self, queries: &[Vec<f32>], k: usize) -> Result<SearchHits> {
        let mut scores = Vec::with_capacity(queries.len());
        let mut ids = Vec::with_capacity(queries.len());

        for query in queries {
            if query.len() != self.dimension {
                return Err(ReviewError::Index(format!(
                    "Query has {} dimensions, index expects {}",
                    query.len(),
                    self.dimension
                )));
            }

            let mut ranked: Vec<(usize, f32)> = (0..self.len())
                .filter_map(|slot| self.vector(slot).map(|v| (slot, self.metric.score(query, v))))
                .collect();
            ranked.sort_by(|a, b| self.metric.rank(a.1, b.1).then(a.0.cmp(&b.0)));
            ranked.truncate(k);

            let mut row_scores: Vec<f32> = ranked.iter().map(|&(_, s)| s).collect();
            let mut row_ids: Vec<i64> = ranked
                .iter()
                .map(|&(slot, _)| i64::try_from(slot).unwrap_or(-1))
                .collect();
            row_scores.resize(k, self.metric.sentinel());
            row_ids.resize(k, -1);

            scores.push(row_scores);
            ids.push(row_ids);
        }

        debug!(
            "Searched {} queries against {} vectors (k = {})",
            queries.len(),
            self.len(),
            k
        );

        Ok(SearchHits { scores, ids })
    }

    #[inline]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(HEADER_LEN + self.data.len() * 4);
        bytes.extend_from_slice(MAGIC);
        bytes.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
        bytes.extend_from_slice(&self.metric.code().to_le_bytes());
        bytes.extend_from_slice(&(self.dimension as u32).to_le_bytes());
        bytes.extend_from_slice(&(self.len() as u64).to_le_bytes());
        for value in &self.data {
            bytes.extend_from_slice(&value.to_le_bytes());
        }
        bytes
    }

    #[inline]
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let header = parse_header(bytes)?;
        let expected = header
            .count
            .checked_mul(header.dimension)
            .and_then(|n| n.checked_mul(4))
            .and_then(|n| n.checked_add(HEADER_LEN))
            .ok_or_else(|| ReviewError::Index("Index header overflows".to_string()))?;

        if bytes.len() != expected {
            return Err(ReviewError::Index(format!(
                "Index blob is {} bytes, header describes {}",
                bytes.len(),
                expected
            )));
        }

        let data = bytes
            .get(HEADER_LEN..)
            .unwrap_or_default()
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect();

        Ok(Self {
            metric: header.metric,
            dimension: header.dimension,
            data,
        })
    }

    #[inline]
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.to_bytes())?;
        info!(
            "Saved index with {} vectors ({} dimensions) to {}",
            self.len(),
            self.dimension,
            path.display()
        );
        Ok(())
    }

    #[inline]
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ReviewError::missing("vector index", path));
        }
        let index = Self::from_bytes(&fs::read(path)?)?;
        debug!("Loaded index with {} vectors from {}", index.len(), path.display());
        Ok(index)
    }

    /// Read only the header of a persisted index
    #[inline]
    pub fn read_header(path: &Path) -> Result<IndexHeader> {
        if !path.exists() {
            return Err(ReviewError::missing("vector index", path));
        }
        let bytes = fs::read(path)?;
        parse_header(&bytes)
    }
}

fn read_u32(bytes: &[u8], offset: usize) -> Option<u32> {
    let raw: [u8; 4] = bytes.get(offset..offset + 4)?.try_into().ok()?;
    Some(u32::from_le_bytes(raw))
}

fn parse_header(bytes: &[u8]) -> Result<IndexHeader> {
    if bytes.len() < HEADER_LEN || bytes.get(..4) != Some(&MAGIC[..]) {
        return Err(ReviewError::Index("Not a vector index file".to_string()));
    }

    let truncated = || ReviewError::Index("Truncated index header".to_string());

    let version = read_u32(bytes, 4).ok_or_else(truncated)?;
    if version != FORMAT_VERSION {
        return Err(ReviewError::Index(format!(
            "Unsupported index format version {}",
            version
        )));
    }

    let metric_code = read_u32(bytes, 8).ok_or_else(truncated)?;
    let metric = Metric::from_code(metric_code)
        .ok_or_else(|| ReviewError::Index(format!("Unknown metric code {}", metric_code)))?;
    let dimension = read_u32(bytes, 12).ok_or_else(truncated)? as usize;
    let count_bytes: [u8; 8] = bytes
        .get(16..24)
        .and_then(|b| b.try_into().ok())
        .ok_or_else(truncated)?;
    let count = usize::try_from(u64::from_le_bytes(count_bytes))
        .map_err(|_| ReviewError::Index("Index count too large".to_string()))?;

    Ok(IndexHeader {
        metric,
        dimension,
        count,
    })
}
