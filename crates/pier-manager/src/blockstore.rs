//! The read-only blockstore handle returned by `load_shard`.

use std::sync::Arc;

use bytes::Bytes;
use pier_store::{Blockstore, ShardAccessor, StoreError};
use pier_types::BlockHash;

/// A read-only blockstore over one acquired shard.
///
/// Wraps the engine's accessor; [`close`](ClosableBlockstore::close)
/// releases the engine-held shard resources and must be called exactly
/// once. Dropping without closing leaks the engine-side acquisition until
/// garbage collection reclaims it.
pub struct ClosableBlockstore {
    blocks: Arc<dyn Blockstore>,
    accessor: Box<dyn ShardAccessor>,
}

impl std::fmt::Debug for ClosableBlockstore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClosableBlockstore").finish_non_exhaustive()
    }
}

impl ClosableBlockstore {
    pub(crate) fn new(blocks: Arc<dyn Blockstore>, accessor: Box<dyn ShardAccessor>) -> Self {
        Self { blocks, accessor }
    }

    /// Fetch a block by its multihash.
    pub fn get(&self, hash: &BlockHash) -> Result<Option<Bytes>, StoreError> {
        self.blocks.get(hash)
    }

    /// Whether the shard contains a block.
    pub fn has(&self, hash: &BlockHash) -> Result<bool, StoreError> {
        self.blocks.has(hash)
    }

    /// Release the underlying engine-held acquisition.
    pub async fn close(self) -> Result<(), StoreError> {
        self.accessor.close().await
    }
}
