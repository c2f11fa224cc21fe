//! The block-offset index: multihash → byte offset.

use std::collections::BTreeMap;

use pier_types::BlockHash;
use serde::{Deserialize, Serialize};

/// Mapping from a block's multihash to its byte offset within a shard.
///
/// Insertion follows insert-without-replace semantics: inserting a hash that
/// is already present is a no-op, so the first recorded offset wins. This is
/// what makes merging segment indices with duplicate blocks safe.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockOffsetIndex {
    entries: BTreeMap<BlockHash, u64>,
}

impl BlockOffsetIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a (hash, offset) pair unless the hash is already present.
    ///
    /// Returns `true` if the pair was inserted.
    pub fn insert_no_replace(&mut self, hash: BlockHash, offset: u64) -> bool {
        match self.entries.entry(hash) {
            std::collections::btree_map::Entry::Vacant(e) => {
                e.insert(offset);
                true
            }
            std::collections::btree_map::Entry::Occupied(_) => false,
        }
    }

    /// Look up the offset recorded for a hash.
    pub fn get(&self, hash: &BlockHash) -> Option<u64> {
        self.entries.get(hash).copied()
    }

    /// Whether the index contains a hash.
    pub fn contains(&self, hash: &BlockHash) -> bool {
        self.entries.contains_key(hash)
    }

    /// Iterate over all (hash, offset) pairs in hash order.
    pub fn iter(&self) -> impl Iterator<Item = (&BlockHash, u64)> {
        self.entries.iter().map(|(h, o)| (h, *o))
    }

    /// Number of indexed blocks.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the index is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
