//! Launch detection in the pending pool.
//!
//! A launch is an application call to the target contract carrying the
//! trigger argument. Each group id is reported at most once: it is marked
//! processed before the event leaves the matcher, so a failed or skipped
//! race never re-fires for the same group.

use chrono::Utc;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::connectors::{ApiError, LedgerClient};
use crate::events::{LaunchEvent, PendingTxn};

/// Group ids that already produced a launch event.
///
/// Entries expire after `retention`. The retention must outlive any
/// transaction's validity window, so an expired group can no longer be in
/// the pending pool.
#[derive(Debug)]
pub struct ProcessedGroups {
    seen: HashMap<String, Instant>,
    retention: Duration,
}

impl ProcessedGroups {
    pub fn new(retention: Duration) -> Self {
        Self {
            seen: HashMap::new(),
            retention,
        }
    }

    /// Records `group_id`. Returns false if it was already recorded and has
    /// not expired.
    pub fn insert(&mut self, group_id: &str, now: Instant) -> bool {
        match self.seen.get(group_id) {
            Some(&at) if now.saturating_duration_since(at) < self.retention => false,
            _ => {
                self.seen.insert(group_id.to_string(), now);
                true
            }
        }
    }

    pub fn contains(&self, group_id: &str, now: Instant) -> bool {
        self.seen
            .get(group_id)
            .is_some_and(|&at| now.saturating_duration_since(at) < self.retention)
    }

    /// Drops expired entries.
    pub fn prune(&mut self, now: Instant) -> usize {
        let before = self.seen.len();
        let retention = self.retention;
        self.seen
            .retain(|_, at| now.saturating_duration_since(*at) < retention);
        before - self.seen.len()
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

/// Matches launch calls against the configured contract and trigger.
#[derive(Debug)]
pub struct LaunchMatcher {
    app_id: u64,
    trigger: Vec<u8>,
    processed: ProcessedGroups,
}

impl LaunchMatcher {
    pub fn new(app_id: u64, trigger: Vec<u8>, retention: Duration) -> Self {
        Self {
            app_id,
            trigger,
            processed: ProcessedGroups::new(retention),
        }
    }

    pub fn processed(&self) -> &ProcessedGroups {
        &self.processed
    }

    /// Returns a launch event for every new group among `pending`.
    pub fn match_pending(&mut self, pending: &[PendingTxn], now: Instant) -> Vec<LaunchEvent> {
        let expired = self.processed.prune(now);
        if expired > 0 {
            debug!("[matcher] Expired {} processed groups", expired);
        }

        let mut events = Vec::new();
        for entry in pending {
            let txn = &entry.txn;
            if !txn.is_app_call() || txn.app_id != Some(self.app_id) {
                continue;
            }
            if !txn.has_app_arg(&self.trigger) {
                continue;
            }

            let Some(group_id) = txn.group.as_deref() else {
                debug!("[matcher] Launch call from {} has no group id, skipping", txn.sender);
                continue;
            };

            if !self.processed.insert(group_id, now) {
                continue;
            }

            let asset_name = txn.first_box_name();
            if asset_name.is_none() {
                warn!("[matcher] Could not decode asset name for group {}", group_id);
            }

            info!(
                "[matcher] Launch detected: group {} name {:?} creator {}",
                group_id, asset_name, txn.sender
            );

            events.push(LaunchEvent {
                group_id: group_id.to_string(),
                asset_name,
                creator: txn.sender.clone(),
                detected_at: Utc::now(),
            });
        }

        events
    }

    /// Fetches the pending pool and matches it.
    pub async fn scan_once(&mut self, ledger: &dyn LedgerClient) -> Result<Vec<LaunchEvent>, ApiError> {
        let pending = ledger.pending_pool().await?;
        if pending.is_empty() {
            debug!("[matcher] Pending pool is empty");
        }
        Ok(self.match_pending(&pending, Instant::now()))
    }
}
