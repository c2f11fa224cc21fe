//! Shard observation types: states, operation kinds, and trace events.
//!
//! The shard state machine lives inside the shard-store engine; the
//! lifecycle manager only observes transitions through the engine's trace
//! stream.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ShardKey;

/// Engine-side state of a shard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShardState {
    /// Registered but not yet initialized.
    New,
    /// Registration/indexing in progress.
    Registering,
    /// Indexed and acquirable.
    Available,
    /// Last operation on the shard failed.
    Errored,
    /// Destruction in progress.
    Destroying,
    /// Gone; the key may be reused by a future registration.
    Destroyed,
}

impl fmt::Display for ShardState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ShardState::New => "new",
            ShardState::Registering => "registering",
            ShardState::Available => "available",
            ShardState::Errored => "errored",
            ShardState::Destroying => "destroying",
            ShardState::Destroyed => "destroyed",
        };
        f.write_str(s)
    }
}

/// Kind of operation a trace event refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OpKind {
    /// Shard acquisition.
    Acquire,
    /// Shard registration.
    Register,
    /// Shard destruction.
    Destroy,
    /// Recovery of a failed shard.
    Recover,
    /// Accessor release after a caller closed its handle.
    Release,
    /// Garbage collection touched the shard.
    Gc,
}

impl fmt::Display for OpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OpKind::Acquire => "acquire",
            OpKind::Register => "register",
            OpKind::Destroy => "destroy",
            OpKind::Recover => "recover",
            OpKind::Release => "release",
            OpKind::Gc => "gc",
        };
        f.write_str(s)
    }
}

/// One observational trace event emitted by the engine.
///
/// Append-only; the manager logs these and never persists or retries them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trace {
    /// The shard the operation ran against.
    pub key: ShardKey,
    /// What ran.
    pub op: OpKind,
    /// The shard state after the operation.
    pub after: ShardState,
}
