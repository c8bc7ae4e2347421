//! Launch sniping: the main control loop and the race-buy machinery.
//!
//! The control loop polls the pending pool through the launch matcher and,
//! for each new launch, races purchases against the asset ids just above the
//! watermark maintained by the tracker.

mod boxes;
mod purchase;
mod race;

pub use boxes::{asset_box_name, method_selector, tag_box_name};
pub use purchase::{LedgerPurchaser, PurchaseTarget};
pub use race::{AttemptError, Purchaser, RaceExecutor, RaceOutcome};

use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{error, info, warn};

use crate::config::SniperConfig;
use crate::connectors::LedgerClient;
use crate::events::{LaunchEvent, PurchaseReport};
use crate::watchers::{LaunchMatcher, Watermark};

/// Race parameters shared by every launch.
#[derive(Debug, Clone)]
pub struct SniperSettings {
    pub workers: usize,
    pub purchase_amount: u64,
    pub min_amount_out: u64,
    pub poll_interval: Duration,
    pub report_link_base: String,
}

impl SniperSettings {
    pub fn from_config(config: &SniperConfig) -> Self {
        Self {
            workers: config.workers,
            purchase_amount: config.purchase_amount,
            min_amount_out: config.min_amount_out,
            poll_interval: config.poll_interval,
            report_link_base: config.report_link_base.clone(),
        }
    }
}

/// The foreground loop tying matcher, watermark and race executor together.
pub struct Sniper {
    settings: SniperSettings,
    ledger: Arc<dyn LedgerClient>,
    matcher: LaunchMatcher,
    executor: RaceExecutor,
    watermark: Watermark,
    acquired: usize,
    backoff: Option<Duration>,
}

impl Sniper {
    pub fn new(
        settings: SniperSettings,
        ledger: Arc<dyn LedgerClient>,
        matcher: LaunchMatcher,
        executor: RaceExecutor,
        watermark: Watermark,
    ) -> Self {
        Self {
            settings,
            ledger,
            matcher,
            executor,
            watermark,
            acquired: 0,
            backoff: None,
        }
    }

    /// Number of assets acquired since start.
    pub fn acquired(&self) -> usize {
        self.acquired
    }

    /// How long `run` sleeps before the next scan: the poll interval, or
    /// longer after the node asked us to back off.
    pub fn next_wait(&self) -> Duration {
        self.backoff.unwrap_or(self.settings.poll_interval)
    }

    /// Scans the pending pool once and races every new launch in it.
    pub async fn tick(&mut self) -> Vec<PurchaseReport> {
        let events = match self.matcher.scan_once(self.ledger.as_ref()).await {
            Ok(events) => {
                self.backoff = None;
                events
            }
            Err(e) => {
                if e.is_transient() {
                    warn!("[sniper] Failed to scan pending pool: {}", e);
                } else {
                    error!("[sniper] Failed to scan pending pool (not transient): {}", e);
                }
                self.backoff = Some(e.backoff(self.settings.poll_interval));
                return Vec::new();
            }
        };

        let mut reports = Vec::new();
        for event in &events {
            if let Some(report) = self.handle_launch(event).await {
                self.acquired += 1;
                reports.push(report);
            }
        }
        reports
    }

    /// Races one launch. The group is already marked processed, so a skipped
    /// or lost race is never retried.
    pub async fn handle_launch(&self, event: &LaunchEvent) -> Option<PurchaseReport> {
        let Some(asset_name) = event.asset_name.as_deref() else {
            warn!(
                "[sniper] Launch {} has no decodable asset name, skipping race",
                event.group_id
            );
            return None;
        };

        let watermark = self.watermark.get();
        if watermark == 0 {
            warn!(
                "[sniper] Watermark not established yet, dropping launch {} ('{}'). \
                 Set START_ROUND or WATERMARK_SEED so the tracker has a floor before launches appear",
                event.group_id, asset_name
            );
            return None;
        }

        let outcome = self
            .executor
            .race(
                watermark,
                asset_name,
                self.settings.workers,
                self.settings.purchase_amount,
                self.settings.min_amount_out,
            )
            .await;

        match outcome.winner {
            Some(asset_id) => {
                let report = PurchaseReport::new(
                    asset_id,
                    event,
                    asset_name,
                    &self.settings.report_link_base,
                );
                log_report(&report, event, outcome.elapsed);
                Some(report)
            }
            None => {
                info!(
                    "[sniper] No purchase accepted for '{}' ({} attempts from {})",
                    asset_name,
                    outcome.attempted.len(),
                    watermark
                );
                None
            }
        }
    }

    /// Runs until `shutdown` carries `true` or its sender is dropped.
    ///
    /// A race in progress always completes before the loop checks the
    /// signal again.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        info!(
            "[sniper] Watching for launches ({} workers, {} microAlgos each)",
            self.settings.workers, self.settings.purchase_amount
        );

        loop {
            if *shutdown.borrow() {
                break;
            }

            self.tick().await;

            tokio::select! {
                _ = tokio::time::sleep(self.next_wait()) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        info!("[sniper] Stopped after acquiring {} assets", self.acquired);
    }
}

fn log_report(report: &PurchaseReport, event: &LaunchEvent, elapsed: Duration) {
    info!("[sniper] ========== ASSET ACQUIRED ==========");
    info!("[sniper] Asset ID: {}", report.asset_id);
    info!("[sniper] Asset Name: {}", report.asset_name);
    info!("[sniper] Creator Address: {}", report.creator);
    info!("[sniper] {}", report.link);
    info!("[sniper] Race time: {:?}", elapsed);
    info!(
        "[sniper] Since detection: {}ms",
        (Utc::now() - event.detected_at).num_milliseconds()
    );
    info!("[sniper] ====================================");
}

impl std::fmt::Debug for Sniper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sniper")
            .field("settings", &self.settings)
            .field("watermark", &self.watermark)
            .field("acquired", &self.acquired)
            .finish()
    }
}
