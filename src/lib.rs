//! Launch Sniper - race-buy engine for freshly launched assets
//!
//! This crate watches an Algorand node for a launch call to a known
//! contract and races to buy the new asset before its id is public, by
//! submitting purchases for a contiguous window of guessed ids just above
//! the highest asset id created so far.
//!
//! # Architecture
//!
//! - **Watermark tracker**: background task following committed rounds and
//!   maintaining the highest created asset id, inner transactions included
//! - **Launch matcher**: scans the pending pool for the launch signature and
//!   reports each group id at most once
//! - **Race executor**: fires one purchase group per candidate id
//!   concurrently and keeps the first success in attempt order
//!
//! All node data is normalized into typed events before it reaches the
//! executor.
//!
//! # Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use launch_sniper::config::SniperConfig;
//! use launch_sniper::connectors::{AlgodClient, NodeCredentials};
//! use launch_sniper::watchers::{Watermark, WatermarkTracker};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = SniperConfig::from_env()?;
//!     let client = AlgodClient::new(
//!         config.algod_address.clone(),
//!         NodeCredentials::new(config.algod_token.clone()),
//!     )?;
//!
//!     let watermark = Watermark::new(config.watermark_seed);
//!     let tracker = WatermarkTracker::new(Arc::new(client), watermark.clone(), config.start_round);
//!     let (_stop_tx, stop_rx) = tokio::sync::watch::channel(false);
//!     tracker.run(stop_rx).await;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod connectors;
pub mod events;
pub mod sniper;
pub mod utils;
pub mod watchers;

// Re-export commonly used types
pub use config::SniperConfig;
pub use connectors::{AlgodClient, LedgerClient};
pub use events::{LaunchEvent, PurchaseReport};
pub use sniper::{Sniper, SniperSettings};
pub use watchers::{LaunchMatcher, Watermark, WatermarkTracker};
