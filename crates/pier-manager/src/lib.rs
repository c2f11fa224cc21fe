//! Shard lifecycle management for a storage-provider node.
//!
//! The [`ShardManager`] wraps an external [`ShardStoreEngine`] with
//! node-specific behavior: automatic re-registration when the engine does
//! not know a shard, garbage collection and trace draining on background
//! tasks, recovery of shards the engine reports as failed, and the one-time
//! bulk migration of pre-existing deals into the shard store.
//!
//! The manager holds no shard state of its own. Shards, their states, and
//! the durable index store all live inside the engine; the manager owns only
//! its process-lifetime state: the shutdown signal, background task
//! handles, and the engine's failure/trace streams.
//!
//! [`ShardStoreEngine`]: pier_store::ShardStoreEngine

mod blockstore;
mod config;
mod error;
mod manager;
mod migration;
mod recovery;

pub use blockstore::ClosableBlockstore;
pub use config::{ConfigError, ManagerConfig};
pub use error::ManagerError;
pub use manager::{EngineSinks, EngineStreams, MAX_RECOVER_ATTEMPTS, ShardManager, engine_channels};
pub use migration::{Deal, DealState};

#[cfg(test)]
mod tests;
