use serde::Serialize;

/// Result of comparing the metadata index against the blob store's tree and
/// re-hashing the stored objects.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ConsistencyReport {
    pub icons_checked: usize,
    pub files_checked: usize,
    /// Paths the metadata index lists but the blob store does not hold.
    pub missing_blobs: Vec<String>,
    /// Paths the blob store holds but no metadata row mentions.
    pub orphan_blobs: Vec<String>,
    /// Paths whose stored bytes are missing or fail their hash check.
    pub damaged_blobs: Vec<String>,
}

impl ConsistencyReport {
    pub fn is_consistent(&self) -> bool {
        self.missing_blobs.is_empty()
            && self.orphan_blobs.is_empty()
            && self.damaged_blobs.is_empty()
    }

    pub fn discrepancy_count(&self) -> usize {
        self.missing_blobs.len() + self.orphan_blobs.len() + self.damaged_blobs.len()
    }
}
