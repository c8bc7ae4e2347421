//! Normalized records flowing from the matcher to the race executor.
//!
//! Raw pending-pool data never reaches the executor: the matcher converts it
//! into a [`LaunchEvent`] first, and the executor reports back with a
//! [`PurchaseReport`].

use chrono::{DateTime, Utc};
use std::fmt;

/// A launch intent observed in the pending pool.
///
/// Produced at most once per group id and consumed once by the executor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchEvent {
    /// Base64 group id of the launch transaction.
    pub group_id: String,
    /// Asset name decoded from the call's first box reference.
    pub asset_name: Option<String>,
    /// Address that broadcast the launch.
    pub creator: String,
    pub detected_at: DateTime<Utc>,
}

/// One worker's guess in a race.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CandidateAttempt {
    pub asset_id: u64,
    /// Payment to the contract, in microAlgos.
    pub amount: u64,
    /// Minimum asset units the contract must return.
    pub min_output: u64,
}

impl CandidateAttempt {
    /// Builds the contiguous candidate window `[watermark, watermark + workers)`.
    pub fn window(watermark: u64, workers: usize, amount: u64, min_output: u64) -> Vec<Self> {
        (0..workers as u64)
            .map_while(|offset| watermark.checked_add(offset))
            .map(|asset_id| Self {
                asset_id,
                amount,
                min_output,
            })
            .collect()
    }
}

/// Operator-facing summary of an acquired asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PurchaseReport {
    pub asset_id: u64,
    pub asset_name: String,
    pub creator: String,
    pub link: String,
}

impl PurchaseReport {
    pub fn new(asset_id: u64, event: &LaunchEvent, asset_name: &str, link_base: &str) -> Self {
        Self {
            asset_id,
            asset_name: asset_name.to_string(),
            creator: event.creator.clone(),
            link: format!("{}/{}", link_base.trim_end_matches('/'), asset_name),
        }
    }
}

impl fmt::Display for PurchaseReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Asset ID: {} | Asset Name: {} | Creator Address: {} | {}",
            self.asset_id, self.asset_name, self.creator, self.link
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_is_contiguous_from_watermark() {
        let window = CandidateAttempt::window(1000, 5, 2_000_000, 1000);
        let ids: Vec<u64> = window.iter().map(|c| c.asset_id).collect();
        assert_eq!(ids, vec![1000, 1001, 1002, 1003, 1004]);
        assert!(window.iter().all(|c| c.amount == 2_000_000 && c.min_output == 1000));
    }

    #[test]
    fn test_window_stops_at_u64_max() {
        let window = CandidateAttempt::window(u64::MAX - 1, 5, 1, 1);
        assert_eq!(window.len(), 2);
        assert!(CandidateAttempt::window(7, 0, 1, 1).is_empty());
    }

    #[test]
    fn test_report_link() {
        let event = LaunchEvent {
            group_id: "G1".to_string(),
            asset_name: Some("FOO".to_string()),
            creator: "CREATOR".to_string(),
            detected_at: Utc::now(),
        };
        let report = PurchaseReport::new(1003, &event, "FOO", "https://rug.ninja/");
        assert_eq!(report.link, "https://rug.ninja/FOO");
        assert!(report.to_string().contains("Asset ID: 1003"));
    }
}
