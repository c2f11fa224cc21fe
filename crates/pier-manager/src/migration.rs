//! One-time bulk migration of pre-existing deals into the shard store.
//!
//! Nodes that predate the shard store have active deals whose pieces were
//! never registered. [`ShardManager::migrate_deals`] registers them all
//! once, lazily, and records completion with a durable marker file so the
//! migration never runs twice.

use std::io::ErrorKind;

use pier_store::ShardResult;
use pier_types::PieceCommitment;
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot};
use tracing::{error, info, warn};

use crate::error::ManagerError;
use crate::manager::ShardManager;

/// Marker file recording that the bulk migration already ran.
const MIGRATION_MARKER: &str = ".shard-registration-complete";

/// Buffer for migration registration results.
const MIGRATION_RESULT_CAP: usize = 32;

/// Pipeline state of a storage deal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DealState {
    /// Proposal accepted; data transfer pending or in flight.
    Transferring,
    /// Data received, not yet handed to the sealing pipeline.
    Staged,
    /// Handed off to the sealing pipeline.
    Sealing,
    /// Sealed into a sector and live.
    Active,
    /// Expired or terminated.
    Ended,
}

impl DealState {
    /// Whether the deal's piece has been handed off to the sealing
    /// subsystem. Only such deals are migrated; earlier deals get
    /// registered through the normal path when they reach hand-off.
    pub fn handed_off_to_sealing(self) -> bool {
        matches!(self, DealState::Sealing | DealState::Active)
    }
}

/// A storage deal as seen by the migration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deal {
    /// On-chain deal identifier.
    pub id: u64,
    /// Commitment of the deal's piece.
    pub piece: PieceCommitment,
    /// Current pipeline state.
    pub state: DealState,
}

impl ShardManager {
    /// Register shards for every deal already handed off to sealing, once.
    ///
    /// Returns `Ok(false)` without side effects when a previous run already
    /// completed. Otherwise submits one lazy registration per qualifying
    /// deal, drains every submitted result (failures are logged, never
    /// propagated), writes the marker, and returns `Ok(true)`.
    pub async fn migrate_deals(&self, deals: &[Deal]) -> Result<bool, ManagerError> {
        if self.registration_complete().await? {
            info!("no shard migration necessary; already marked complete");
            return Ok(false);
        }

        info!(count = deals.len(), "registering shards for deals in sealing subsystem");

        let (res_tx, res_rx) = mpsc::channel::<ShardResult>(MIGRATION_RESULT_CAP);
        let (total_tx, total_rx) = oneshot::channel::<usize>();

        // Start consuming results now. How many to consume is unknown until
        // every registration has been submitted; the consumer learns the
        // total through the oneshot and stops after exactly that many
        // results, whichever side arrives first.
        let consumer = tokio::spawn(drain_registrations(res_rx, total_rx));

        let mut registered = 0usize;
        for deal in deals {
            if !deal.state.handed_off_to_sealing() {
                info!(deal_id = deal.id, piece = %deal.piece, "deal not ready; skipping");
                continue;
            }

            info!(deal_id = deal.id, piece = %deal.piece, "registering deal with lazy init");
            if let Err(err) = self
                .register_shard(deal.piece, None, false, res_tx.clone())
                .await
            {
                warn!(deal_id = deal.id, piece = %deal.piece, error = %err, "failed to register shard");
                continue;
            }
            registered += 1;
        }
        drop(res_tx);

        info!(total = registered, "finished submitting shard registrations");
        let _ = total_tx.send(registered);
        let _ = consumer.await;
        info!("confirmed registration of all submitted shards");

        match self.mark_registration_complete().await {
            Ok(()) => info!("successfully marked migration as complete"),
            Err(err) => error!(error = %err, "failed to mark shards as registered"),
        }

        info!("shard migration complete");
        Ok(true)
    }

    /// Whether the migration marker exists.
    async fn registration_complete(&self) -> Result<bool, ManagerError> {
        let path = self.config.root_dir.join(MIGRATION_MARKER);
        match tokio::fs::metadata(&path).await {
            Ok(_) => Ok(true),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(false),
            Err(err) => Err(ManagerError::MigrationStatus(err)),
        }
    }

    /// Create the migration marker. Its existence is the signal; the file
    /// stays empty.
    async fn mark_registration_complete(&self) -> std::io::Result<()> {
        let path = self.config.root_dir.join(MIGRATION_MARKER);
        tokio::fs::write(&path, b"").await
    }
}

/// Drain registration results until the total is known and reached.
///
/// Results may start arriving before the submitter knows how many there
/// will be; conversely the total may arrive while results are still in
/// flight. Termination requires both: `total` received on the oneshot and
/// `received == total`.
pub(crate) async fn drain_registrations(
    mut results: mpsc::Receiver<ShardResult>,
    mut total_rx: oneshot::Receiver<usize>,
) {
    let mut received = 0usize;
    let mut total: Option<usize> = None;

    loop {
        if let Some(total) = total
            && received >= total
        {
            return;
        }

        tokio::select! {
            t = &mut total_rx, if total.is_none() => {
                total = Some(t.unwrap_or(0));
            }
            result = results.recv() => match result {
                Some(result) => {
                    received += 1;
                    match result.error {
                        None => info!(key = %result.key, "async shard registration completed"),
                        Some(err) => {
                            warn!(key = %result.key, error = %err, "async shard registration failed");
                        }
                    }
                }
                None => {
                    // All senders gone: nothing more can arrive. Pick up the
                    // total if it is still pending, note any shortfall, and
                    // stop rather than wait forever.
                    if total.is_none() {
                        total = Some((&mut total_rx).await.unwrap_or(0));
                    }
                    let total = total.unwrap_or(0);
                    if received < total {
                        warn!(received, total, "registration result stream closed early");
                    }
                    return;
                }
            }
        }
    }
}
