//! [`ShardManager`], the lifecycle wrapper around the shard-store engine.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use pier_index::BlockOffsetIndex;
use pier_store::{
    AcquireOptions, DestroyOptions, MountFactory, RegisterOptions, ShardFailure, ShardResult,
    ShardStoreEngine, StoreError,
};
use pier_types::{BlockHash, PieceCommitment, Trace};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::blockstore::ClosableBlockstore;
use crate::config::ManagerConfig;
use crate::error::ManagerError;
use crate::recovery::recover_failed_shards;

/// How many times a failed shard is retried by the recovery task.
pub const MAX_RECOVER_ATTEMPTS: u32 = 1;

/// The engine delivers at most one pending failure report.
const FAILURE_CHANNEL_CAP: usize = 1;
/// Bounded trace buffer; the engine drops events when it is full.
const TRACE_CHANNEL_CAP: usize = 32;
/// Per-request result channels carry exactly one result.
const RESULT_CHANNEL_CAP: usize = 1;

/// Sender halves of the engine's failure and trace streams, handed to the
/// engine at construction time.
pub struct EngineSinks {
    /// Where the engine reports failed background operations.
    pub failures: mpsc::Sender<ShardFailure>,
    /// Where the engine emits trace events.
    pub traces: mpsc::Sender<Trace>,
}

/// Receiver halves of the engine's streams, owned by the manager.
pub struct EngineStreams {
    /// Failure reports, consumed by the recovery task.
    pub failures: mpsc::Receiver<ShardFailure>,
    /// Trace events, consumed by the trace loop.
    pub traces: mpsc::Receiver<Trace>,
}

/// Create the failure/trace channel pair shared between an engine and the
/// manager wrapping it.
pub fn engine_channels() -> (EngineSinks, EngineStreams) {
    let (failure_tx, failure_rx) = mpsc::channel(FAILURE_CHANNEL_CAP);
    let (trace_tx, trace_rx) = mpsc::channel(TRACE_CHANNEL_CAP);
    (
        EngineSinks {
            failures: failure_tx,
            traces: trace_tx,
        },
        EngineStreams {
            failures: failure_rx,
            traces: trace_rx,
        },
    )
}

/// Lifecycle manager for the shards of a storage-provider node.
///
/// All shard state lives in the engine; the manager contributes
/// re-registration on unknown shards, background GC, trace logging, failure
/// recovery, and the one-time deal migration. `start` must be called before
/// shard operations, and `close` at most once to shut everything down.
pub struct ShardManager {
    pub(crate) engine: Arc<dyn ShardStoreEngine>,
    pub(crate) mounts: Arc<dyn MountFactory>,
    pub(crate) config: ManagerConfig,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    streams: Mutex<Option<EngineStreams>>,
}

impl ShardManager {
    /// Create a manager over the given engine.
    ///
    /// `streams` must be the receiver halves matching the sinks the engine
    /// was constructed with (see [`engine_channels`]); `mounts` builds the
    /// node-specific byte source for each piece.
    pub fn new(
        config: ManagerConfig,
        engine: Arc<dyn ShardStoreEngine>,
        mounts: Arc<dyn MountFactory>,
        streams: EngineStreams,
    ) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        Self {
            engine,
            mounts,
            config,
            shutdown_tx,
            shutdown_rx,
            tasks: Mutex::new(Vec::new()),
            streams: Mutex::new(Some(streams)),
        }
    }

    /// Start the background loops and the engine.
    ///
    /// Spawns the GC loop, the trace loop, and the one-shot recovery task
    /// for previously failed shards, then starts the engine. Callable once.
    pub async fn start(&self) -> Result<(), ManagerError> {
        {
            let streams = self
                .streams
                .lock()
                .expect("streams lock poisoned")
                .take()
                .ok_or(ManagerError::AlreadyStarted)?;

            let mut tasks = self.tasks.lock().expect("tasks lock poisoned");
            tasks.push(tokio::spawn(gc_loop(
                self.engine.clone(),
                self.config.gc_interval(),
                self.shutdown_rx.clone(),
            )));
            tasks.push(tokio::spawn(trace_loop(
                streams.traces,
                self.shutdown_rx.clone(),
            )));
            tasks.push(tokio::spawn(recover_failed_shards(
                self.engine.clone(),
                streams.failures,
                self.shutdown_rx.clone(),
                MAX_RECOVER_ATTEMPTS,
            )));
        }

        self.engine.start().await?;
        Ok(())
    }

    /// Shut down: signal the background loops, close the engine, and wait
    /// for every background task to exit.
    ///
    /// Must be called at most once; a second call would wait on handles
    /// that no longer exist and double-close the engine.
    pub async fn close(&self) -> Result<(), ManagerError> {
        let _ = self.shutdown_tx.send(true);

        debug!("closing shard store engine");
        self.engine.close().await?;

        let handles: Vec<_> = {
            let mut tasks = self.tasks.lock().expect("tasks lock poisoned");
            tasks.drain(..).collect()
        };
        debug!(tasks = handles.len(), "waiting for background tasks to exit");
        for handle in handles {
            let _ = handle.await;
        }
        debug!("shard manager closed");
        Ok(())
    }

    /// Acquire a shard as a read-only blockstore.
    ///
    /// If the engine does not know the shard, it is registered lazily (no
    /// local-copy hint) and the acquisition retried exactly once; any other
    /// failure is surfaced unchanged. The caller must `close` the returned
    /// handle exactly once.
    ///
    /// Dropping the returned future abandons the wait for the result, but
    /// the acquisition already submitted to the engine is not retracted;
    /// the engine's cancellation contract is unspecified.
    pub async fn load_shard(
        &self,
        piece: PieceCommitment,
    ) -> Result<ClosableBlockstore, ManagerError> {
        debug!(%piece, "acquiring shard");
        let key = piece.to_shard_key();

        let (res_tx, res_rx) = mpsc::channel(RESULT_CHANNEL_CAP);
        let mut res_rx = match self
            .engine
            .acquire_shard(key.clone(), res_tx, AcquireOptions::default())
            .await
        {
            Ok(()) => res_rx,
            Err(StoreError::ShardUnknown(_)) => {
                // The engine has never seen this shard: register it (lazily,
                // with no transient hint) and try the acquisition once more.
                warn!(%piece, "shard not registered, re-registering");
                self.register_shard_sync(piece, None, false).await?;
                warn!(%piece, "successfully re-registered shard");

                let (res_tx, res_rx) = mpsc::channel(RESULT_CHANNEL_CAP);
                self.engine
                    .acquire_shard(key.clone(), res_tx, AcquireOptions::default())
                    .await
                    .map_err(|source| ManagerError::Acquire { piece, source })?;
                res_rx
            }
            Err(source) => return Err(ManagerError::AcquireSchedule { piece, source }),
        };

        let result = res_rx
            .recv()
            .await
            .ok_or(ManagerError::ResultChannelClosed)?;
        if let Some(source) = result.error {
            return Err(ManagerError::Acquire { piece, source });
        }
        let accessor = result.accessor.ok_or_else(|| ManagerError::Acquire {
            piece,
            source: StoreError::Failed("acquire result carried no accessor".to_string()),
        })?;
        let blocks = accessor
            .blockstore()
            .map_err(|source| ManagerError::Acquire { piece, source })?;

        debug!(%piece, "successfully loaded blockstore");
        Ok(ClosableBlockstore::new(blocks, accessor))
    }

    /// Submit a shard registration.
    ///
    /// Builds the mount for the piece and schedules registration. Returns
    /// scheduling errors only; the outcome arrives later on `results`.
    pub async fn register_shard(
        &self,
        piece: PieceCommitment,
        existing_local_copy: Option<PathBuf>,
        eager: bool,
        results: mpsc::Sender<ShardResult>,
    ) -> Result<(), ManagerError> {
        let key = piece.to_shard_key();
        let mount = self
            .mounts
            .mount_for(&piece)
            .map_err(|source| ManagerError::Register { piece, source })?;

        let opts = RegisterOptions {
            existing_local_copy,
            lazy_init: !eager,
        };
        self.engine
            .register_shard(key, mount, results, opts)
            .await
            .map_err(|source| ManagerError::Register { piece, source })?;

        debug!(%piece, eager, "submitted shard registration");
        Ok(())
    }

    /// Register a shard and wait for its result.
    pub async fn register_shard_sync(
        &self,
        piece: PieceCommitment,
        existing_local_copy: Option<PathBuf>,
        eager: bool,
    ) -> Result<(), ManagerError> {
        let (res_tx, mut res_rx) = mpsc::channel(RESULT_CHANNEL_CAP);
        self.register_shard(piece, existing_local_copy, eager, res_tx)
            .await?;

        let result = res_rx
            .recv()
            .await
            .ok_or(ManagerError::ResultChannelClosed)?;
        match result.error {
            Some(source) => Err(ManagerError::Register { piece, source }),
            None => Ok(()),
        }
    }

    /// Submit a shard destruction; the outcome arrives on `results`.
    pub async fn destroy_shard(
        &self,
        piece: PieceCommitment,
        results: mpsc::Sender<ShardResult>,
    ) -> Result<(), ManagerError> {
        let key = piece.to_shard_key();
        self.engine
            .destroy_shard(key, results, DestroyOptions::default())
            .await
            .map_err(|source| ManagerError::Destroy { piece, source })?;

        debug!(%piece, "submitted shard destruction");
        Ok(())
    }

    /// Every piece whose index contains the given block.
    pub async fn pieces_containing_block(
        &self,
        hash: &BlockHash,
    ) -> Result<Vec<PieceCommitment>, ManagerError> {
        let keys = self
            .engine
            .shards_containing(hash)
            .await
            .map_err(|source| ManagerError::Lookup {
                hash: hash.clone(),
                source,
            })?;

        keys.into_iter()
            .map(|key| {
                key.to_commitment()
                    .map_err(|source| ManagerError::InvalidShardKey { key, source })
            })
            .collect()
    }

    /// The stored block-offset index for a piece.
    pub async fn piece_index(
        &self,
        piece: PieceCommitment,
    ) -> Result<BlockOffsetIndex, ManagerError> {
        Ok(self.engine.get_index(&piece.to_shard_key()).await?)
    }
}

/// Run engine GC on a fixed interval until shutdown.
///
/// GC is best-effort: results and errors are discarded so a failing pass
/// never disturbs the node.
async fn gc_loop(
    engine: Arc<dyn ShardStoreEngine>,
    interval: std::time::Duration,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(interval);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let _ = engine.gc().await;
            }
            _ = shutdown_rx.changed() => {
                debug!("gc loop shutting down");
                return;
            }
        }
    }
}

/// Drain and log engine trace events until shutdown.
async fn trace_loop(mut traces: mpsc::Receiver<Trace>, mut shutdown_rx: watch::Receiver<bool>) {
    loop {
        tokio::select! {
            event = traces.recv() => match event {
                Some(trace) => {
                    debug!(key = %trace.key, op = %trace.op, after = %trace.after, "trace");
                }
                None => return,
            },
            _ = shutdown_rx.changed() => {
                debug!("trace loop shutting down");
                return;
            }
        }
    }
}
