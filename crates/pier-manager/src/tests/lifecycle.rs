//! Load/register/destroy/lookup behavior and background-loop lifecycle.

use std::sync::atomic::Ordering;
use std::time::Duration;

use pier_types::{BlockHash, PieceCommitment, OpKind, ShardState, Trace};
use tokio::sync::mpsc;
use tokio::time::sleep;

use crate::error::ManagerError;
use crate::tests::helpers::test_node;

fn piece(tag: &[u8]) -> PieceCommitment {
    PieceCommitment::from_data(tag)
}

#[tokio::test]
async fn test_load_unknown_shard_registers_once_then_acquires() {
    let node = test_node();
    let target = piece(b"unregistered piece");

    let handle = node.manager.load_shard(target).await.unwrap();

    assert_eq!(node.engine.registrations.load(Ordering::SeqCst), 1);
    assert_eq!(node.engine.acquires.load(Ordering::SeqCst), 2);
    assert_eq!(node.engine.events(), vec!["acquire", "register", "acquire"]);

    assert!(handle.has(&BlockHash::blake3(b"anything")).unwrap());
    handle.close().await.unwrap();
}

#[tokio::test]
async fn test_load_known_shard_skips_registration() {
    let node = test_node();
    let target = piece(b"known piece");
    node.engine.add_known(&target);

    let handle = node.manager.load_shard(target).await.unwrap();
    handle.close().await.unwrap();

    assert_eq!(node.engine.registrations.load(Ordering::SeqCst), 0);
    assert_eq!(node.engine.acquires.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_second_load_after_success_registers_nothing() {
    let node = test_node();
    let target = piece(b"loaded twice");

    node.manager.load_shard(target).await.unwrap().close().await.unwrap();
    node.manager.load_shard(target).await.unwrap().close().await.unwrap();

    // Only the first load triggered the implicit registration.
    assert_eq!(node.engine.registrations.load(Ordering::SeqCst), 1);
    assert_eq!(node.engine.acquires.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_load_scheduling_rejection_is_surfaced_unchanged() {
    let node = test_node();
    let target = piece(b"rejected piece");
    node.engine.add_known(&target);
    node.engine
        .reject_acquire
        .lock()
        .unwrap()
        .insert(target.to_shard_key());

    let err = node.manager.load_shard(target).await.unwrap_err();
    assert!(matches!(err, ManagerError::AcquireSchedule { .. }));
    // A non-ShardUnknown rejection must not trigger re-registration.
    assert_eq!(node.engine.registrations.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_load_async_failure_is_surfaced() {
    let node = test_node();
    let target = piece(b"async failing piece");
    node.engine.add_known(&target);
    node.engine
        .fail_acquire
        .lock()
        .unwrap()
        .insert(target.to_shard_key());

    let err = node.manager.load_shard(target).await.unwrap_err();
    assert!(matches!(err, ManagerError::Acquire { .. }));
}

#[tokio::test]
async fn test_load_surfaces_failed_implicit_registration() {
    let node = test_node();
    let target = piece(b"unregisterable piece");
    node.engine
        .fail_register
        .lock()
        .unwrap()
        .insert(target.to_shard_key());

    let err = node.manager.load_shard(target).await.unwrap_err();
    assert!(matches!(err, ManagerError::Register { .. }));
    // The acquisition is not retried when registration failed.
    assert_eq!(node.engine.acquires.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_register_shard_reports_async_result() {
    let node = test_node();
    let target = piece(b"explicitly registered");

    let (res_tx, mut res_rx) = mpsc::channel(1);
    node.manager
        .register_shard(target, None, true, res_tx)
        .await
        .unwrap();

    let result = res_rx.recv().await.unwrap();
    assert!(result.is_ok());
    assert_eq!(result.key, target.to_shard_key());
}

#[tokio::test]
async fn test_register_shard_sync_surfaces_async_error() {
    let node = test_node();
    let target = piece(b"sync register failure");
    node.engine
        .fail_register
        .lock()
        .unwrap()
        .insert(target.to_shard_key());

    let err = node
        .manager
        .register_shard_sync(target, None, false)
        .await
        .unwrap_err();
    assert!(matches!(err, ManagerError::Register { .. }));
}

#[tokio::test]
async fn test_destroy_shard_completes() {
    let node = test_node();
    let target = piece(b"doomed piece");
    node.engine.add_known(&target);

    let (res_tx, mut res_rx) = mpsc::channel(1);
    node.manager.destroy_shard(target, res_tx).await.unwrap();

    let result = res_rx.recv().await.unwrap();
    assert!(result.is_ok());
    assert_eq!(node.engine.destroys.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_pieces_containing_block_maps_keys_back() {
    let node = test_node();
    let (p1, p2) = (piece(b"container one"), piece(b"container two"));
    let hash = BlockHash::blake3(b"shared block");
    node.engine.containing.lock().unwrap().insert(
        hash.clone(),
        vec![p1.to_shard_key(), p2.to_shard_key()],
    );

    let pieces = node.manager.pieces_containing_block(&hash).await.unwrap();
    assert_eq!(pieces, vec![p1, p2]);
}

#[tokio::test]
async fn test_pieces_containing_block_fails_on_foreign_key() {
    let node = test_node();
    let hash = BlockHash::blake3(b"block in foreign shard");
    node.engine
        .containing
        .lock()
        .unwrap()
        .insert(hash.clone(), vec!["not-a-commitment".to_string().into()]);

    let err = node.manager.pieces_containing_block(&hash).await.unwrap_err();
    assert!(matches!(err, ManagerError::InvalidShardKey { .. }));
}

#[tokio::test]
async fn test_piece_index_is_a_passthrough() {
    let node = test_node();
    let target = piece(b"indexed piece");
    let mut index = pier_index::BlockOffsetIndex::new();
    index.insert_no_replace(BlockHash::blake3(b"b0"), 0);
    index.insert_no_replace(BlockHash::blake3(b"b1"), 4096);
    node.engine
        .indices
        .lock()
        .unwrap()
        .insert(target.to_shard_key(), index.clone());

    let fetched = node.manager.piece_index(target).await.unwrap();
    assert_eq!(fetched, index);

    let missing = node.manager.piece_index(piece(b"unindexed")).await;
    assert!(matches!(missing, Err(ManagerError::Store(_))));
}

#[tokio::test]
async fn test_start_runs_engine_and_gc_loop() {
    let node = test_node();
    node.manager.start().await.unwrap();
    assert!(node.engine.started.load(Ordering::SeqCst));

    // 20ms interval: several passes land within 200ms.
    sleep(Duration::from_millis(200)).await;
    assert!(node.engine.gc_passes.load(Ordering::SeqCst) >= 2);

    node.manager.close().await.unwrap();
}

#[tokio::test]
async fn test_start_twice_fails() {
    let node = test_node();
    node.manager.start().await.unwrap();
    let err = node.manager.start().await.unwrap_err();
    assert!(matches!(err, ManagerError::AlreadyStarted));
    node.manager.close().await.unwrap();
}

#[tokio::test]
async fn test_close_stops_background_loops() {
    let node = test_node();
    node.manager.start().await.unwrap();
    sleep(Duration::from_millis(100)).await;

    node.manager.close().await.unwrap();
    assert!(node.engine.closed.load(Ordering::SeqCst));

    // No further GC activity once close has returned.
    let after_close = node.engine.gc_passes.load(Ordering::SeqCst);
    sleep(Duration::from_millis(150)).await;
    assert_eq!(node.engine.gc_passes.load(Ordering::SeqCst), after_close);

    // The trace loop has dropped its receiver.
    let trace = Trace {
        key: piece(b"late trace").to_shard_key(),
        op: OpKind::Acquire,
        after: ShardState::Available,
    };
    assert!(node.sinks.traces.send(trace).await.is_err());
}

#[tokio::test]
async fn test_trace_loop_drains_events() {
    let node = test_node();
    node.manager.start().await.unwrap();

    for i in 0..5u8 {
        let trace = Trace {
            key: piece(&[i]).to_shard_key(),
            op: OpKind::Register,
            after: ShardState::Available,
        };
        node.sinks.traces.send(trace).await.unwrap();
    }

    // The loop keeps consuming, so the bounded channel never stays full.
    sleep(Duration::from_millis(50)).await;
    assert_eq!(node.sinks.traces.capacity(), node.sinks.traces.max_capacity());

    node.manager.close().await.unwrap();
}

#[tokio::test]
async fn test_recovery_retries_failed_shard() {
    let node = test_node();
    node.manager.start().await.unwrap();
    let target = piece(b"failed shard");
    node.engine.add_known(&target);

    node.sinks
        .failures
        .send(pier_store::ShardFailure {
            key: target.to_shard_key(),
            error: pier_store::StoreError::Failed("fetch blew up".into()),
        })
        .await
        .unwrap();

    sleep(Duration::from_millis(50)).await;
    assert_eq!(node.engine.recoveries.load(Ordering::SeqCst), 1);

    node.manager.close().await.unwrap();
}

#[tokio::test]
async fn test_recovery_respects_attempt_cap() {
    let node = test_node();
    node.manager.start().await.unwrap();
    let target = piece(b"hopeless shard");
    node.engine.add_known(&target);

    for _ in 0..3 {
        node.sinks
            .failures
            .send(pier_store::ShardFailure {
                key: target.to_shard_key(),
                error: pier_store::StoreError::Failed("still broken".into()),
            })
            .await
            .unwrap();
        sleep(Duration::from_millis(30)).await;
    }

    // One recovery attempt per shard, then the cap applies.
    assert_eq!(node.engine.recoveries.load(Ordering::SeqCst), 1);

    node.manager.close().await.unwrap();
}
