//! The shard-store engine contract.

use std::path::PathBuf;
use std::sync::Arc;

use pier_index::BlockOffsetIndex;
use pier_types::{BlockHash, ShardKey};
use tokio::sync::mpsc;

use crate::error::StoreError;
use crate::mount::Mount;
use crate::result::{GcSummary, ShardResult};

/// Options for acquiring a shard.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcquireOptions {}

/// Options for registering a shard.
#[derive(Debug, Clone, Default)]
pub struct RegisterOptions {
    /// A local copy of the shard's archive the engine may index from
    /// directly instead of fetching through the mount.
    pub existing_local_copy: Option<PathBuf>,
    /// Defer indexing to the first acquisition instead of running it now.
    pub lazy_init: bool,
}

/// Options for destroying a shard.
#[derive(Debug, Clone, Copy, Default)]
pub struct DestroyOptions {}

/// Options for recovering a failed shard.
#[derive(Debug, Clone, Copy, Default)]
pub struct RecoverOptions {}

/// The asynchronous shard-store engine surface.
///
/// Submission methods schedule work and return quickly; they fail only when
/// the request cannot be queued (the scheduling-error class). The outcome of
/// the scheduled operation arrives later as exactly one [`ShardResult`] on
/// the channel supplied with the request. Each channel has a single
/// consumer: the submitting caller.
///
/// The engine owns all shard state and the durable index store. It emits
/// a failure stream (one [`ShardFailure`](crate::ShardFailure) per failed
/// background operation) and a bounded trace stream, both handed over as
/// channels when the engine is constructed.
#[async_trait::async_trait]
pub trait ShardStoreEngine: Send + Sync {
    /// Schedule acquisition of a shard as a queryable blockstore.
    ///
    /// Fails fast with [`StoreError::ShardUnknown`] when the key was never
    /// registered.
    async fn acquire_shard(
        &self,
        key: ShardKey,
        results: mpsc::Sender<ShardResult>,
        opts: AcquireOptions,
    ) -> Result<(), StoreError>;

    /// Schedule registration of a shard backed by the given mount.
    async fn register_shard(
        &self,
        key: ShardKey,
        mount: Arc<dyn Mount>,
        results: mpsc::Sender<ShardResult>,
        opts: RegisterOptions,
    ) -> Result<(), StoreError>;

    /// Schedule destruction of a shard and its transient resources.
    async fn destroy_shard(
        &self,
        key: ShardKey,
        results: mpsc::Sender<ShardResult>,
        opts: DestroyOptions,
    ) -> Result<(), StoreError>;

    /// Schedule a retry of a shard currently in the errored state.
    async fn recover_shard(
        &self,
        key: ShardKey,
        results: mpsc::Sender<ShardResult>,
        opts: RecoverOptions,
    ) -> Result<(), StoreError>;

    /// Run one garbage-collection pass over reclaimable shards.
    async fn gc(&self) -> Result<GcSummary, StoreError>;

    /// Reverse lookup: every shard whose index contains the block.
    async fn shards_containing(&self, hash: &BlockHash) -> Result<Vec<ShardKey>, StoreError>;

    /// Fetch the stored index for a shard.
    async fn get_index(&self, key: &ShardKey) -> Result<BlockOffsetIndex, StoreError>;

    /// Start the engine's internal machinery.
    async fn start(&self) -> Result<(), StoreError>;

    /// Shut the engine down, rejecting further submissions.
    async fn close(&self) -> Result<(), StoreError>;
}
