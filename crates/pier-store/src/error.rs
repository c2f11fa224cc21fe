//! Error types for the engine boundary.

use pier_types::ShardKey;

/// Errors produced by shard-store engine operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The engine has never been told about this shard.
    ///
    /// Recoverable: the lifecycle manager re-registers the shard and retries
    /// the operation once.
    #[error("shard unknown: {0}")]
    ShardUnknown(ShardKey),

    /// A registration hit a key that is already registered.
    #[error("shard already registered: {0}")]
    ShardExists(ShardKey),

    /// The shard's current state does not allow the requested operation.
    #[error("shard {key} in state {state} cannot {op}")]
    InvalidState {
        /// The shard in question.
        key: ShardKey,
        /// Its current state, as a string.
        state: String,
        /// The rejected operation.
        op: String,
    },

    /// Building the shard's index failed.
    #[error("indexing failed: {0}")]
    Index(#[from] pier_index::IndexError),

    /// An I/O error from a mount or transient file.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The engine is shut down and no longer accepts requests.
    #[error("engine is closed")]
    Closed,

    /// An engine-internal failure.
    #[error("shard operation failed: {0}")]
    Failed(String),
}
