//! Error types for the lifecycle manager.

use pier_store::StoreError;
use pier_types::{BlockHash, ParseIdError, PieceCommitment, ShardKey};

/// Errors surfaced to callers of the lifecycle manager.
///
/// Each variant names the piece and the stage that failed; background-loop
/// failures are logged, never returned through this type.
#[derive(Debug, thiserror::Error)]
pub enum ManagerError {
    /// `start` was called more than once.
    #[error("manager already started")]
    AlreadyStarted,

    /// The engine rejected an acquire submission.
    #[error("failed to schedule acquire for piece {piece}: {source}")]
    AcquireSchedule {
        /// The piece being loaded.
        piece: PieceCommitment,
        /// The engine's rejection.
        source: StoreError,
    },

    /// An acquisition failed after submission.
    #[error("failed to acquire shard for piece {piece}: {source}")]
    Acquire {
        /// The piece being loaded.
        piece: PieceCommitment,
        /// The failure delivered on the result channel.
        source: StoreError,
    },

    /// A registration failed, either at submission or in its result.
    #[error("failed to register shard for piece {piece}: {source}")]
    Register {
        /// The piece being registered.
        piece: PieceCommitment,
        /// The underlying failure.
        source: StoreError,
    },

    /// The engine rejected a destroy submission.
    #[error("failed to schedule destroy for piece {piece}: {source}")]
    Destroy {
        /// The piece being destroyed.
        piece: PieceCommitment,
        /// The engine's rejection.
        source: StoreError,
    },

    /// The reverse block lookup failed inside the engine.
    #[error("getting pieces containing block {hash}: {source}")]
    Lookup {
        /// The block hash that was looked up.
        hash: BlockHash,
        /// The engine failure.
        source: StoreError,
    },

    /// A shard key returned by the engine does not parse back into a piece
    /// commitment.
    #[error("converting shard key {key} to piece commitment: {source}")]
    InvalidShardKey {
        /// The unparseable key.
        key: ShardKey,
        /// The parse failure.
        source: ParseIdError,
    },

    /// Reading the migration marker failed.
    #[error("failed to read migration marker: {0}")]
    MigrationStatus(std::io::Error),

    /// A result channel closed before delivering a result.
    #[error("result channel closed before a result arrived")]
    ResultChannelClosed,

    /// A direct engine call failed.
    #[error("engine error: {0}")]
    Store(#[from] StoreError),
}
