// Index consistency validation
// Ensures every vector slot has a mapping entry and vice versa


use std::collections::BTreeSet;
use std::path::Path;

use tracing::{info, warn};

use crate::Result;
use crate::database::mapping::{parse_slot_key, read_slot_keys};
use crate::database::VectorIndex;

/// Result of comparing a persisted index with its mapping
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsistencyReport {
    /// Vectors stored in the index blob
    pub index_vectors: usize,
    /// Keys present in the mapping file
    pub mapping_entries: usize,
    /// Slot ids with a vector but no mapping entry
    pub missing_in_mapping: Vec<usize>,
    /// Mapping keys that name no vector slot
    pub orphaned_in_mapping: Vec<String>,
    pub is_consistent: bool,
}

/// Compare the slot ids of an index blob with the keys of its mapping.
/// Either file missing is a missing-artifact error.
#[inline]
pub fn validate_consistency(index_path: &Path, mapping_path: &Path) -> Result<ConsistencyReport> {
    info!(
        "Validating {} against {}",
        mapping_path.display(),
        index_path.display()
    );

    let header = VectorIndex::read_header(index_path)?;
    let keys = read_slot_keys(mapping_path)?;

    let mut mapped = BTreeSet::new();
    let mut orphaned_in_mapping = Vec::new();
    for key in &keys {
        match parse_slot_key(key) {
            Ok(slot) if slot < header.count => {
                mapped.insert(slot);
            }
            _ => orphaned_in_mapping.push(key.clone()),
        }
    }
    orphaned_in_mapping.sort();

    let missing_in_mapping: Vec<usize> = (0..header.count)
        .filter(|slot| !mapped.contains(slot))
        .collect();

    let report = ConsistencyReport {
        index_vectors: header.count,
        mapping_entries: keys.len(),
        is_consistent: missing_in_mapping.is_empty() && orphaned_in_mapping.is_empty(),
        missing_in_mapping,
        orphaned_in_mapping,
    };

    if report.is_consistent {
        info!("Index consistency validation passed");
    } else {
        warn!("{}", report.summary());
    }

    Ok(report)
}

impl ConsistencyReport {
    #[inline]
    pub fn summary(&self) -> String {
        if self.is_consistent {
            format!(
                "Index is consistent: {} vectors, {} mapping entries",
                self.index_vectors, self.mapping_entries
            )
        } else {
            format!(
                "Index inconsistencies found: {} slots missing from mapping, {} orphaned mapping keys",
                self.missing_in_mapping.len(),
                self.orphaned_in_mapping.len()
            )
        }
    }

    #[inline]
    pub fn total_issues(&self) -> usize {
        self.missing_in_mapping.len() + self.orphaned_in_mapping.len()
    }
}
