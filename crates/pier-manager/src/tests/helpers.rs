//! Shared test utilities: a scripted engine, mounts, and a wired-up node.

use std::collections::{HashMap, HashSet};
use std::io::Cursor;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use pier_index::BlockOffsetIndex;
use pier_store::{
    AcquireOptions, Blockstore, DestroyOptions, GcSummary, Mount, MountFactory, MountReader,
    MountStat, RecoverOptions, RegisterOptions, ShardAccessor, ShardResult, ShardStoreEngine,
    StoreError,
};
use pier_types::{BlockHash, PieceCommitment, ShardKey};
use tokio::sync::mpsc;

use crate::manager::{EngineSinks, ShardManager, engine_channels};
use crate::ManagerConfig;

/// Engine stub with scriptable failures and full call accounting.
///
/// Submissions deliver their result inline, so tests observe completions
/// without timing games.
#[derive(Default)]
pub struct StubEngine {
    /// Shards the engine knows about.
    pub known: Mutex<HashSet<ShardKey>>,
    /// Submission order of operations, for ordering assertions.
    pub events: Mutex<Vec<String>>,
    /// Successful register submissions.
    pub registrations: AtomicUsize,
    /// Acquire submissions, including rejected ones.
    pub acquires: AtomicUsize,
    /// Destroy submissions.
    pub destroys: AtomicUsize,
    /// Recover submissions.
    pub recoveries: AtomicUsize,
    /// Completed GC passes.
    pub gc_passes: AtomicUsize,
    pub started: AtomicBool,
    pub closed: AtomicBool,
    /// Keys whose acquire submission is rejected with a scheduling error.
    pub reject_acquire: Mutex<HashSet<ShardKey>>,
    /// Keys whose acquire delivers a failed result.
    pub fail_acquire: Mutex<HashSet<ShardKey>>,
    /// Keys whose register submission is rejected with a scheduling error.
    pub reject_register: Mutex<HashSet<ShardKey>>,
    /// Keys whose registration delivers a failed result.
    pub fail_register: Mutex<HashSet<ShardKey>>,
    /// Scripted reverse-lookup results.
    pub containing: Mutex<HashMap<BlockHash, Vec<ShardKey>>>,
    /// Scripted stored indices.
    pub indices: Mutex<HashMap<ShardKey, BlockOffsetIndex>>,
}

impl StubEngine {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn add_known(&self, piece: &PieceCommitment) {
        self.known
            .lock()
            .unwrap()
            .insert(piece.to_shard_key());
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    fn record(&self, event: &str) {
        self.events.lock().unwrap().push(event.to_string());
    }

    fn scripted(&self, set: &Mutex<HashSet<ShardKey>>, key: &ShardKey) -> bool {
        set.lock().unwrap().contains(key)
    }
}

#[async_trait::async_trait]
impl ShardStoreEngine for StubEngine {
    async fn acquire_shard(
        &self,
        key: ShardKey,
        results: mpsc::Sender<ShardResult>,
        _opts: AcquireOptions,
    ) -> Result<(), StoreError> {
        self.record("acquire");
        self.acquires.fetch_add(1, Ordering::SeqCst);

        if self.scripted(&self.reject_acquire, &key) {
            return Err(StoreError::Failed("injected acquire rejection".into()));
        }
        if !self.known.lock().unwrap().contains(&key) {
            return Err(StoreError::ShardUnknown(key));
        }

        let result = if self.scripted(&self.fail_acquire, &key) {
            ShardResult::failed(key, StoreError::Failed("injected acquire failure".into()))
        } else {
            ShardResult::acquired(key, Box::new(StubAccessor))
        };
        let _ = results.send(result).await;
        Ok(())
    }

    async fn register_shard(
        &self,
        key: ShardKey,
        _mount: Arc<dyn Mount>,
        results: mpsc::Sender<ShardResult>,
        _opts: RegisterOptions,
    ) -> Result<(), StoreError> {
        self.record("register");

        if self.scripted(&self.reject_register, &key) {
            return Err(StoreError::Failed("injected register rejection".into()));
        }
        self.registrations.fetch_add(1, Ordering::SeqCst);

        let result = if self.scripted(&self.fail_register, &key) {
            ShardResult::failed(key, StoreError::Failed("injected register failure".into()))
        } else {
            self.known.lock().unwrap().insert(key.clone());
            ShardResult::completed(key)
        };
        let _ = results.send(result).await;
        Ok(())
    }

    async fn destroy_shard(
        &self,
        key: ShardKey,
        results: mpsc::Sender<ShardResult>,
        _opts: DestroyOptions,
    ) -> Result<(), StoreError> {
        self.record("destroy");
        self.destroys.fetch_add(1, Ordering::SeqCst);
        self.known.lock().unwrap().remove(&key);
        let _ = results.send(ShardResult::completed(key)).await;
        Ok(())
    }

    async fn recover_shard(
        &self,
        key: ShardKey,
        results: mpsc::Sender<ShardResult>,
        _opts: RecoverOptions,
    ) -> Result<(), StoreError> {
        self.record("recover");
        self.recoveries.fetch_add(1, Ordering::SeqCst);
        let _ = results.send(ShardResult::completed(key)).await;
        Ok(())
    }

    async fn gc(&self) -> Result<GcSummary, StoreError> {
        self.gc_passes.fetch_add(1, Ordering::SeqCst);
        Ok(GcSummary::default())
    }

    async fn shards_containing(&self, hash: &BlockHash) -> Result<Vec<ShardKey>, StoreError> {
        Ok(self
            .containing
            .lock()
            .unwrap()
            .get(hash)
            .cloned()
            .unwrap_or_default())
    }

    async fn get_index(&self, key: &ShardKey) -> Result<BlockOffsetIndex, StoreError> {
        self.indices
            .lock()
            .unwrap()
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::ShardUnknown(key.clone()))
    }

    async fn start(&self) -> Result<(), StoreError> {
        self.started.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn close(&self) -> Result<(), StoreError> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// Accessor handing out a canned in-memory blockstore.
pub struct StubAccessor;

#[async_trait::async_trait]
impl ShardAccessor for StubAccessor {
    fn blockstore(&self) -> Result<Arc<dyn Blockstore>, StoreError> {
        Ok(Arc::new(StubBlockstore))
    }

    async fn close(self: Box<Self>) -> Result<(), StoreError> {
        Ok(())
    }
}

pub struct StubBlockstore;

impl Blockstore for StubBlockstore {
    fn get(&self, _hash: &BlockHash) -> Result<Option<Bytes>, StoreError> {
        Ok(Some(Bytes::from_static(b"block payload")))
    }
}

/// Mount factory producing empty in-memory mounts.
pub struct StubMounts;

impl MountFactory for StubMounts {
    fn mount_for(&self, _commitment: &PieceCommitment) -> Result<Arc<dyn Mount>, StoreError> {
        Ok(Arc::new(StubMount))
    }
}

pub struct StubMount;

#[async_trait::async_trait]
impl Mount for StubMount {
    async fn stat(&self) -> Result<MountStat, StoreError> {
        Ok(MountStat { size: 0 })
    }

    async fn fetch(&self) -> Result<Box<dyn MountReader>, StoreError> {
        Ok(Box::new(Cursor::new(Vec::<u8>::new())))
    }
}

/// A manager wired to a stub engine with a fast GC interval.
pub struct TestNode {
    pub engine: Arc<StubEngine>,
    pub manager: ShardManager,
    pub sinks: EngineSinks,
    pub dir: tempfile::TempDir,
}

/// Install a fmt subscriber once so `RUST_LOG=debug` works in tests.
fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init();
}

pub fn test_node() -> TestNode {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let engine = StubEngine::new();
    let (sinks, streams) = engine_channels();
    let config = ManagerConfig {
        root_dir: dir.path().to_path_buf(),
        gc_interval_ms: 20,
        ..ManagerConfig::default()
    };
    let manager = ShardManager::new(config, engine.clone(), Arc::new(StubMounts), streams);
    TestNode {
        engine,
        manager,
        sinks,
        dir,
    }
}
