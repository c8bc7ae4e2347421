//! Race-buy executor.
//!
//! Fires one purchase attempt per candidate asset id in the window starting
//! at the watermark. Attempts run concurrently and share no state; losers
//! fail quietly and only the aggregate outcome is reported.

use async_trait::async_trait;
use futures_util::future::join_all;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::connectors::{ApiError, EncodeError};
use crate::events::CandidateAttempt;

#[derive(Debug, Error)]
pub enum AttemptError {
    #[error("Failed to fetch suggested params: {0}")]
    Params(ApiError),

    #[error("Failed to build purchase: {0}")]
    Build(String),

    #[error("Failed to encode purchase: {0}")]
    Encode(#[from] EncodeError),

    #[error("Submission rejected: {0}")]
    Submit(ApiError),
}

/// Places a single purchase for one guessed asset id.
#[async_trait]
pub trait Purchaser: Send + Sync {
    /// Submits the purchase and returns the node's transaction id. Does not
    /// wait for confirmation.
    async fn attempt(&self, candidate: CandidateAttempt, asset_name: &str) -> Result<String, AttemptError>;
}

/// What happened in one race.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RaceOutcome {
    /// First accepted candidate in attempt order.
    pub winner: Option<u64>,
    /// Every candidate id that was attempted, in order.
    pub attempted: Vec<u64>,
    pub elapsed: Duration,
}

pub struct RaceExecutor {
    purchaser: Arc<dyn Purchaser>,
}

impl RaceExecutor {
    pub fn new(purchaser: Arc<dyn Purchaser>) -> Self {
        Self { purchaser }
    }

    /// Attempts `[watermark, watermark + workers)` concurrently.
    ///
    /// Waits for every attempt to finish, then returns the first success in
    /// attempt order, not completion order.
    pub async fn race(
        &self,
        watermark: u64,
        asset_name: &str,
        workers: usize,
        amount: u64,
        min_output: u64,
    ) -> RaceOutcome {
        let started = Instant::now();
        let candidates = CandidateAttempt::window(watermark, workers, amount, min_output);
        let attempted: Vec<u64> = candidates.iter().map(|c| c.asset_id).collect();

        info!(
            "[race] Firing {} attempts for '{}' from asset {}",
            candidates.len(),
            asset_name,
            watermark
        );

        let handles = candidates.into_iter().map(|candidate| {
            let purchaser = Arc::clone(&self.purchaser);
            let asset_name = asset_name.to_string();
            tokio::spawn(async move {
                match purchaser.attempt(candidate, &asset_name).await {
                    Ok(txid) => {
                        debug!("[race] Asset {} accepted: {}", candidate.asset_id, txid);
                        Some(candidate.asset_id)
                    }
                    Err(e) => {
                        debug!("[race] Asset {} failed: {}", candidate.asset_id, e);
                        None
                    }
                }
            })
        });

        let results = join_all(handles).await;
        let winner = results.into_iter().find_map(|result| match result {
            Ok(accepted) => accepted,
            Err(e) => {
                warn!("[race] Attempt task failed: {}", e);
                None
            }
        });

        let elapsed = started.elapsed();
        debug!("[race] Completed in {:?}, winner {:?}", elapsed, winner);

        RaceOutcome {
            winner,
            attempted,
            elapsed,
        }
    }
}

impl std::fmt::Debug for RaceExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RaceExecutor").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Mutex;

    /// Accepts only the listed ids, optionally delaying some of them.
    struct ScriptedPurchaser {
        accept: HashSet<u64>,
        slow: HashSet<u64>,
        seen: Mutex<Vec<u64>>,
    }

    impl ScriptedPurchaser {
        fn new(accept: &[u64], slow: &[u64]) -> Self {
            Self {
                accept: accept.iter().copied().collect(),
                slow: slow.iter().copied().collect(),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Purchaser for ScriptedPurchaser {
        async fn attempt(&self, candidate: CandidateAttempt, _asset_name: &str) -> Result<String, AttemptError> {
            self.seen.lock().unwrap().push(candidate.asset_id);
            if self.slow.contains(&candidate.asset_id) {
                tokio::time::sleep(Duration::from_millis(30)).await;
            }
            if self.accept.contains(&candidate.asset_id) {
                Ok(format!("tx-{}", candidate.asset_id))
            } else {
                Err(AttemptError::Build("asset does not exist".to_string()))
            }
        }
    }

    #[tokio::test]
    async fn test_race_covers_window_and_picks_winner() {
        let purchaser = Arc::new(ScriptedPurchaser::new(&[1003], &[]));
        let executor = RaceExecutor::new(purchaser.clone());

        let outcome = executor.race(1000, "FOO", 5, 2_000_000, 1000).await;
        assert_eq!(outcome.winner, Some(1003));
        assert_eq!(outcome.attempted, vec![1000, 1001, 1002, 1003, 1004]);

        let mut seen = purchaser.seen.lock().unwrap().clone();
        seen.sort_unstable();
        assert_eq!(seen, outcome.attempted);
    }

    #[tokio::test]
    async fn test_first_in_attempt_order_wins() {
        // 1001 finishes last but precedes 1002 in attempt order
        let purchaser = Arc::new(ScriptedPurchaser::new(&[1001, 1002], &[1001]));
        let executor = RaceExecutor::new(purchaser);

        let outcome = executor.race(1000, "FOO", 4, 1, 1).await;
        assert_eq!(outcome.winner, Some(1001));
    }

    /// Every attempt blocks until all of them are in flight.
    struct RendezvousPurchaser {
        barrier: tokio::sync::Barrier,
    }

    #[async_trait]
    impl Purchaser for RendezvousPurchaser {
        async fn attempt(&self, candidate: CandidateAttempt, _asset_name: &str) -> Result<String, AttemptError> {
            self.barrier.wait().await;
            Ok(format!("tx-{}", candidate.asset_id))
        }
    }

    #[tokio::test]
    async fn test_attempts_run_concurrently() {
        let executor = RaceExecutor::new(Arc::new(RendezvousPurchaser {
            barrier: tokio::sync::Barrier::new(5),
        }));

        // sequential attempts would never get past the barrier
        let outcome = tokio::time::timeout(
            Duration::from_secs(1),
            executor.race(1000, "FOO", 5, 1, 1),
        )
        .await
        .expect("attempts did not overlap");
        assert_eq!(outcome.winner, Some(1000));
        assert_eq!(outcome.attempted, vec![1000, 1001, 1002, 1003, 1004]);
    }

    #[tokio::test]
    async fn test_no_success_is_absent() {
        let executor = RaceExecutor::new(Arc::new(ScriptedPurchaser::new(&[], &[])));
        let outcome = executor.race(50, "BAR", 3, 1, 1).await;
        assert_eq!(outcome.winner, None);
        assert_eq!(outcome.attempted, vec![50, 51, 52]);
    }
}
