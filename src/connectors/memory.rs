//! In-memory ledger used by unit tests across the crate.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Mutex;

use crate::events::{PendingTxn, SuggestedParams, TxnNode};

use super::algod::ApiError;
use super::ledger::LedgerClient;

/// Kind of error injected by [`InMemoryLedger::fail_next_with`].
#[derive(Debug, Clone, Copy)]
pub(crate) enum Failure {
    Unavailable,
    RateLimited(u64),
    Malformed,
}

impl Failure {
    fn to_error(self) -> ApiError {
        match self {
            Failure::Unavailable => ApiError::ApiError {
                status: 503,
                message: "unavailable".to_string(),
            },
            Failure::RateLimited(ms) => ApiError::RateLimited(ms),
            Failure::Malformed => ApiError::ParseError("unexpected response shape".to_string()),
        }
    }
}

pub(crate) struct InMemoryLedger {
    height: AtomicU64,
    blocks: Mutex<HashMap<u64, Vec<TxnNode>>>,
    pending: Mutex<Vec<PendingTxn>>,
    failures: AtomicU32,
    failure: Mutex<Failure>,
    fetched: Mutex<Vec<u64>>,
    submitted: Mutex<Vec<Vec<u8>>>,
}

impl InMemoryLedger {
    pub fn new(height: u64) -> Self {
        Self {
            height: AtomicU64::new(height),
            blocks: Mutex::new(HashMap::new()),
            pending: Mutex::new(Vec::new()),
            failures: AtomicU32::new(0),
            failure: Mutex::new(Failure::Unavailable),
            fetched: Mutex::new(Vec::new()),
            submitted: Mutex::new(Vec::new()),
        }
    }

    pub fn set_height(&self, height: u64) {
        self.height.store(height, Ordering::SeqCst);
    }

    pub fn insert_block(&self, height: u64, txns: Vec<TxnNode>) {
        self.blocks.lock().unwrap().insert(height, txns);
    }

    pub fn set_pending(&self, pending: Vec<PendingTxn>) {
        *self.pending.lock().unwrap() = pending;
    }

    /// Makes the next `n` queries fail with a transient error.
    pub fn fail_next(&self, n: u32) {
        self.fail_next_with(n, Failure::Unavailable);
    }

    /// Makes the next `n` queries fail with `failure`.
    pub fn fail_next_with(&self, n: u32, failure: Failure) {
        *self.failure.lock().unwrap() = failure;
        self.failures.store(n, Ordering::SeqCst);
    }

    pub fn fetched_heights(&self) -> Vec<u64> {
        self.fetched.lock().unwrap().clone()
    }

    pub fn submitted(&self) -> Vec<Vec<u8>> {
        self.submitted.lock().unwrap().clone()
    }

    fn maybe_fail(&self) -> Result<(), ApiError> {
        let remaining = self.failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failures.store(remaining - 1, Ordering::SeqCst);
            return Err(self.failure.lock().unwrap().to_error());
        }
        Ok(())
    }
}

#[async_trait]
impl LedgerClient for InMemoryLedger {
    async fn current_height(&self) -> Result<u64, ApiError> {
        self.maybe_fail()?;
        Ok(self.height.load(Ordering::SeqCst))
    }

    async fn block_at(&self, height: u64) -> Result<Vec<TxnNode>, ApiError> {
        self.maybe_fail()?;
        self.fetched.lock().unwrap().push(height);
        Ok(self
            .blocks
            .lock()
            .unwrap()
            .get(&height)
            .cloned()
            .unwrap_or_default())
    }

    async fn pending_pool(&self) -> Result<Vec<PendingTxn>, ApiError> {
        self.maybe_fail()?;
        Ok(self.pending.lock().unwrap().clone())
    }

    async fn suggested_params(&self) -> Result<SuggestedParams, ApiError> {
        self.maybe_fail()?;
        Ok(SuggestedParams {
            fee: 0,
            min_fee: 1000,
            last_round: self.height.load(Ordering::SeqCst),
            genesis_id: "testnet-v1.0".to_string(),
            genesis_hash: "SGO1GKSzyE7IEPItTxCByw9x8FmnrCDexi9/cOUJOiI=".to_string(),
        })
    }

    async fn submit(&self, signed: Vec<u8>) -> Result<String, ApiError> {
        self.maybe_fail()?;
        self.submitted.lock().unwrap().push(signed);
        Ok("TXID".to_string())
    }
}
