//! Read access to an acquired shard.

use std::sync::Arc;

use bytes::Bytes;
use pier_types::BlockHash;

use crate::error::StoreError;

/// Block-level read access to one shard's contents.
pub trait Blockstore: Send + Sync {
    /// Fetch a block's payload by its multihash. `None` if the shard's
    /// index has no entry for it.
    fn get(&self, hash: &BlockHash) -> Result<Option<Bytes>, StoreError>;

    /// Whether the shard contains a block.
    fn has(&self, hash: &BlockHash) -> Result<bool, StoreError> {
        Ok(self.get(hash)?.is_some())
    }
}

/// A handle to an acquired shard held open inside the engine.
///
/// The engine keeps shard resources (transient copies, reference counts)
/// alive for as long as the accessor exists; [`close`](ShardAccessor::close)
/// releases them and must be called exactly once.
#[async_trait::async_trait]
pub trait ShardAccessor: Send + Sync {
    /// Open the shard's blockstore.
    fn blockstore(&self) -> Result<Arc<dyn Blockstore>, StoreError>;

    /// Release the engine-held resources backing this accessor.
    async fn close(self: Box<Self>) -> Result<(), StoreError>;
}
