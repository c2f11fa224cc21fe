//! Contracts for the external shard-store engine and its collaborators.
//!
//! The engine itself (scheduling, concurrency limits, transient-file
//! management, durable index storage) lives outside pier. This crate pins
//! down the boundary the lifecycle manager consumes:
//!
//! - [`ShardStoreEngine`]: the asynchronous engine surface. Operations are
//!   submitted with a per-request result channel; outcomes arrive later as
//!   [`ShardResult`]s.
//! - [`Mount`] / [`MountReader`]: how a shard key resolves to a readable,
//!   seekable byte source. [`FileMount`] covers the local-file case.
//! - [`ShardAccessor`] / [`Blockstore`]: read access to an acquired shard.
//! - The failure and trace streams the engine emits at construction time.

mod accessor;
mod engine;
mod error;
mod mount;
mod result;

pub use accessor::{Blockstore, ShardAccessor};
pub use engine::{
    AcquireOptions, DestroyOptions, RecoverOptions, RegisterOptions, ShardStoreEngine,
};
pub use error::StoreError;
pub use mount::{FileMount, Mount, MountFactory, MountReader, MountStat};
pub use result::{GcSummary, ShardFailure, ShardResult};
