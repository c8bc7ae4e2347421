//! The ledger operations the sniper depends on.
//!
//! Watchers and the race executor only ever talk to a [`LedgerClient`], so
//! tests can drive them with an in-memory ledger.

use async_trait::async_trait;

use crate::events::{PendingTxn, SuggestedParams, TxnNode};

use super::algod::{AlgodClient, ApiError};

#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Latest committed round.
    async fn current_height(&self) -> Result<u64, ApiError>;

    /// Top-level transactions of a committed round.
    async fn block_at(&self, height: u64) -> Result<Vec<TxnNode>, ApiError>;

    /// Snapshot of the pending pool.
    async fn pending_pool(&self) -> Result<Vec<PendingTxn>, ApiError>;

    async fn suggested_params(&self) -> Result<SuggestedParams, ApiError>;

    /// Submits signed transactions without waiting for confirmation.
    async fn submit(&self, signed: Vec<u8>) -> Result<String, ApiError>;
}

#[async_trait]
impl LedgerClient for AlgodClient {
    async fn current_height(&self) -> Result<u64, ApiError> {
        Ok(self.status().await?.last_round)
    }

    async fn block_at(&self, height: u64) -> Result<Vec<TxnNode>, ApiError> {
        Ok(self.block(height).await?.block.txns)
    }

    async fn pending_pool(&self) -> Result<Vec<PendingTxn>, ApiError> {
        Ok(self.pending_transactions().await?.top_transactions)
    }

    async fn suggested_params(&self) -> Result<SuggestedParams, ApiError> {
        self.transaction_params().await
    }

    async fn submit(&self, signed: Vec<u8>) -> Result<String, ApiError> {
        self.send_raw_transaction(signed).await
    }
}
