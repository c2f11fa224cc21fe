//! Asynchronous result, failure, and GC report types.

use std::fmt;

use pier_types::ShardKey;

use crate::accessor::ShardAccessor;
use crate::error::StoreError;

/// Outcome of one submitted engine operation, delivered exactly once on the
/// result channel the caller supplied at submission time.
///
/// Acquisitions carry an accessor on success; registrations and
/// destructions complete with neither accessor nor error.
pub struct ShardResult {
    /// The shard the operation ran against.
    pub key: ShardKey,
    /// The failure, if the operation failed.
    pub error: Option<StoreError>,
    /// The accessor, for successful acquisitions.
    pub accessor: Option<Box<dyn ShardAccessor>>,
}

impl ShardResult {
    /// A successful acquisition.
    pub fn acquired(key: ShardKey, accessor: Box<dyn ShardAccessor>) -> Self {
        Self {
            key,
            error: None,
            accessor: Some(accessor),
        }
    }

    /// A successful completion with no accessor (register, destroy).
    pub fn completed(key: ShardKey) -> Self {
        Self {
            key,
            error: None,
            accessor: None,
        }
    }

    /// A failed operation.
    pub fn failed(key: ShardKey, error: StoreError) -> Self {
        Self {
            key,
            error: Some(error),
            accessor: None,
        }
    }

    /// Whether the operation succeeded.
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

impl fmt::Debug for ShardResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShardResult")
            .field("key", &self.key)
            .field("error", &self.error)
            .field("accessor", &self.accessor.as_ref().map(|_| "..."))
            .finish()
    }
}

/// One entry on the engine's failure stream: a shard whose background
/// operation failed. Consumed by the manager's recovery task.
#[derive(Debug)]
pub struct ShardFailure {
    /// The failed shard.
    pub key: ShardKey,
    /// What went wrong.
    pub error: StoreError,
}

/// Summary of one garbage-collection pass.
#[derive(Debug, Default)]
pub struct GcSummary {
    /// Shards whose transient resources were reclaimed.
    pub collected: Vec<ShardKey>,
    /// Shards GC could not reclaim, with the reason.
    pub failed: Vec<(ShardKey, String)>,
}

impl GcSummary {
    /// Total number of shards the pass touched.
    pub fn touched(&self) -> usize {
        self.collected.len() + self.failed.len()
    }
}
