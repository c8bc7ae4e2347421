//! Launch Sniper - Main Entry Point
//!
//! Runs the watermark tracker in the background and the launch-detection
//! loop in the foreground until Ctrl+C, then drains the tracker.

use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info};

use launch_sniper::config::SniperConfig;
use launch_sniper::connectors::{AlgodClient, LedgerClient, NodeCredentials};
use launch_sniper::sniper::{LedgerPurchaser, PurchaseTarget, RaceExecutor, Sniper, SniperSettings};
use launch_sniper::utils::init_with_format;
use launch_sniper::watchers::{LaunchMatcher, Watermark, WatermarkTracker, WatermarkTrackerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    if let Err(e) = dotenvy::dotenv() {
        eprintln!("Note: No .env file found or error loading it: {}", e);
    }

    // Configuration errors are fatal before any loop starts
    let config = SniperConfig::from_env()?;
    init_with_format(config.log_format);

    info!("╔════════════════════════════════════════════════════════╗");
    info!("║   Launch Sniper                                        ║");
    info!("╚════════════════════════════════════════════════════════╝");
    info!("Node: {}", config.algod_address);
    info!("Wallet: {}", config.wallet.address());
    info!("Contract: app {} ({})", config.app_id, config.contract_address);

    let client = AlgodClient::new(
        config.algod_address.clone(),
        NodeCredentials::new(config.algod_token.clone()),
    )?;
    let ledger: Arc<dyn LedgerClient> = Arc::new(client);

    let watermark = Watermark::new(config.watermark_seed);
    let (stop_tx, stop_rx) = watch::channel(false);

    let tracker = WatermarkTracker::with_config(
        WatermarkTrackerConfig {
            poll_interval: config.poll_interval,
        },
        Arc::clone(&ledger),
        watermark.clone(),
        config.start_round,
    );
    let tracker_task = tokio::spawn(tracker.run(stop_rx.clone()));

    let purchaser = LedgerPurchaser::new(
        Arc::clone(&ledger),
        config.wallet.clone(),
        PurchaseTarget {
            app_id: config.app_id,
            contract_address: config.contract_address,
            method_signature: config.buy_method_signature.clone(),
        },
    );
    let sniper = Sniper::new(
        SniperSettings::from_config(&config),
        Arc::clone(&ledger),
        LaunchMatcher::new(config.app_id, config.trigger.clone(), config.group_retention),
        RaceExecutor::new(Arc::new(purchaser)),
        watermark,
    );

    tokio::spawn(async move {
        shutdown_signal().await;
        let _ = stop_tx.send(true);
    });

    info!("Press Ctrl+C to stop.");
    sniper.run(stop_rx).await;

    if let Err(e) = tracker_task.await {
        error!("Tracker task panicked: {:?}", e);
    }

    info!("Shut down cleanly.");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
