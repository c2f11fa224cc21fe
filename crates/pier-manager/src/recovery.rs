//! Recovery of shards the engine reports as failed.

use std::collections::HashMap;
use std::sync::Arc;

use pier_store::{RecoverOptions, ShardFailure, ShardStoreEngine};
use pier_types::ShardKey;
use tokio::sync::{mpsc, watch};
use tracing::{info, warn};

/// Consume the engine's failure stream and retry each failed shard
/// immediately, up to `max_attempts` times per shard.
///
/// Recovery outcomes are logged only; a shard that keeps failing stays in
/// the errored state until destroyed or recovered by other means. Exits on
/// shutdown or when the failure stream ends.
pub(crate) async fn recover_failed_shards(
    engine: Arc<dyn ShardStoreEngine>,
    mut failures: mpsc::Receiver<ShardFailure>,
    mut shutdown_rx: watch::Receiver<bool>,
    max_attempts: u32,
) {
    let mut attempts: HashMap<ShardKey, u32> = HashMap::new();

    loop {
        tokio::select! {
            failure = failures.recv() => {
                let Some(failure) = failure else { return };

                let tried = attempts.entry(failure.key.clone()).or_insert(0);
                if *tried >= max_attempts {
                    warn!(
                        key = %failure.key,
                        attempts = *tried,
                        "not recovering shard, attempt cap reached"
                    );
                    continue;
                }
                *tried += 1;

                info!(key = %failure.key, error = %failure.error, "recovering failed shard");
                let (res_tx, mut res_rx) = mpsc::channel(1);
                if let Err(err) = engine
                    .recover_shard(failure.key.clone(), res_tx, RecoverOptions::default())
                    .await
                {
                    warn!(key = %failure.key, error = %err, "failed to submit shard recovery");
                    continue;
                }

                // Log the eventual outcome without holding up the stream.
                let key = failure.key.clone();
                tokio::spawn(async move {
                    match res_rx.recv().await {
                        Some(result) if result.is_ok() => {
                            info!(%key, "recovered shard");
                        }
                        Some(result) => {
                            warn!(%key, error = ?result.error, "shard recovery failed");
                        }
                        None => {}
                    }
                });
            }
            _ = shutdown_rx.changed() => return,
        }
    }
}
