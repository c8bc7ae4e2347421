//! Watermark tracker following confirmed rounds.
//!
//! Walks committed rounds in strictly increasing, gapless order and raises
//! the shared watermark to the highest asset id created so far, including
//! assets created by inner transactions at any depth.
//!
//! Query failures never stop the tracker: the same round is retried after
//! one poll interval, or after the node's retry-after when rate limited.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::connectors::{ApiError, LedgerClient};
use crate::events::created_asset_ids;

/// Highest asset id observed created on chain.
///
/// Cloning shares the underlying value. Only the tracker advances it; any
/// number of readers may load it concurrently.
#[derive(Clone, Default)]
pub struct Watermark(Arc<AtomicU64>);

impl Watermark {
    pub fn new(seed: u64) -> Self {
        Self(Arc::new(AtomicU64::new(seed)))
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Acquire)
    }

    /// Raises the watermark to `candidate` if larger. Returns true if it moved.
    pub fn advance(&self, candidate: u64) -> bool {
        self.0.fetch_max(candidate, Ordering::AcqRel) < candidate
    }
}

impl std::fmt::Debug for Watermark {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Watermark").field(&self.get()).finish()
    }
}

/// Configuration for the watermark tracker.
pub struct WatermarkTrackerConfig {
    /// How long to wait when the next round is not committed yet, or after
    /// a failed query.
    pub poll_interval: Duration,
}

impl Default for WatermarkTrackerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
        }
    }
}

/// Result of processing at most one round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackerStep {
    /// A round was processed; `created` assets were found in it.
    Advanced { height: u64, created: usize },
    /// The next round is not committed yet.
    NotReady { next_height: u64 },
    /// A query failed; the same round will be retried after `wait`.
    /// Non-transient failures (malformed responses, client errors) are
    /// retried too, but will not clear up without operator attention.
    Failed { transient: bool, wait: Duration },
}

pub struct WatermarkTracker {
    config: WatermarkTrackerConfig,
    ledger: Arc<dyn LedgerClient>,
    watermark: Watermark,
    next_height: Option<u64>,
}

impl WatermarkTracker {
    /// Creates a tracker starting at `start_height`, or at the round after
    /// the current one when `None`.
    pub fn new(
        ledger: Arc<dyn LedgerClient>,
        watermark: Watermark,
        start_height: Option<u64>,
    ) -> Self {
        Self::with_config(WatermarkTrackerConfig::default(), ledger, watermark, start_height)
    }

    pub fn with_config(
        config: WatermarkTrackerConfig,
        ledger: Arc<dyn LedgerClient>,
        watermark: Watermark,
        start_height: Option<u64>,
    ) -> Self {
        Self {
            config,
            ledger,
            watermark,
            next_height: start_height,
        }
    }

    pub fn watermark(&self) -> &Watermark {
        &self.watermark
    }

    /// The next round to process, once resolved.
    pub fn next_height(&self) -> Option<u64> {
        self.next_height
    }

    /// Processes the next round if it is committed.
    pub async fn step(&mut self) -> TrackerStep {
        let current = match self.ledger.current_height().await {
            Ok(height) => height,
            Err(e) => return self.failed("query current round", &e),
        };

        let next = *self.next_height.get_or_insert_with(|| {
            let start = current.saturating_add(1);
            info!("[tracker] Starting from round {}", start);
            start
        });

        if next > current {
            return TrackerStep::NotReady { next_height: next };
        }

        let txns = match self.ledger.block_at(next).await {
            Ok(txns) => txns,
            Err(e) => return self.failed(&format!("fetch round {}", next), &e),
        };

        let created: Vec<u64> = txns.iter().flat_map(created_asset_ids).collect();
        if let Some(&highest) = created.iter().max() {
            if self.watermark.advance(highest) {
                debug!("[tracker] Round {}: watermark -> {}", next, highest);
            }
        }

        self.next_height = Some(next + 1);
        TrackerStep::Advanced {
            height: next,
            created: created.len(),
        }
    }

    fn failed(&self, action: &str, e: &ApiError) -> TrackerStep {
        let transient = e.is_transient();
        if transient {
            warn!("[tracker] Failed to {}: {}", action, e);
        } else {
            error!("[tracker] Failed to {} (not transient): {}", action, e);
        }
        TrackerStep::Failed {
            transient,
            wait: e.backoff(self.config.poll_interval),
        }
    }

    /// Runs until `shutdown` carries `true` or its sender is dropped.
    ///
    /// Rounds that are already committed are processed back to back; the
    /// tracker only sleeps when it has caught up or a query failed.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        info!(
            "[tracker] Starting with watermark {} (poll every {:?})",
            self.watermark.get(),
            self.config.poll_interval
        );

        loop {
            if *shutdown.borrow() {
                break;
            }

            let wait = match self.step().await {
                TrackerStep::Advanced { .. } => continue,
                TrackerStep::NotReady { .. } => self.config.poll_interval,
                TrackerStep::Failed { wait, .. } => wait,
            };

            tokio::select! {
                _ = tokio::time::sleep(wait) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        info!(
            "[tracker] Stopped at round {:?} with watermark {}",
            self.next_height,
            self.watermark.get()
        );
    }
}

impl std::fmt::Debug for WatermarkTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatermarkTracker")
            .field("watermark", &self.watermark.get())
            .field("next_height", &self.next_height)
            .finish()
    }
}
