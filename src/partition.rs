//! Deterministic join-key partitioning.

use crate::error::{JoinError, JoinResult};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Routes join keys to buckets. The partition count is fixed at
/// construction and never mutated at runtime; all records sharing a key
/// land in the same bucket for the life of the run.
#[derive(Debug, Clone)]
pub struct Partitioner {
    partitions: usize,
}

impl Partitioner {
    pub fn new(partitions: usize) -> JoinResult<Self> {
        if partitions == 0 {
            return Err(JoinError::InvalidConfiguration {
                field: "partitions",
                reason: "partition count must be at least 1".to_string(),
            });
        }
        Ok(Self { partitions })
    }

    pub fn partitions(&self) -> usize {
        self.partitions
    }

    /// Bucket index for a key. `DefaultHasher::new()` hashes with fixed
    /// SipHash keys, so routing is stable for the life of the process.
    /// Empty and non-ASCII keys hash like any other string.
    pub fn bucket_for(&self, key: &str) -> usize {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        (hasher.finish() % self.partitions as u64) as usize
    }
}
