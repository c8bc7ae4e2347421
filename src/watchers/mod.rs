//! Ledger watchers.
//!
//! The watermark tracker follows committed rounds in the background; the
//! launch matcher inspects the pending pool from the main control loop.

mod launch_matcher;
mod watermark_tracker;

pub use launch_matcher::{LaunchMatcher, ProcessedGroups};
pub use watermark_tracker::{TrackerStep, Watermark, WatermarkTracker, WatermarkTrackerConfig};
