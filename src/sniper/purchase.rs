//! Purchase groups submitted through the ledger client.
//!
//! Each purchase is an atomic group of two transactions: a payment of the
//! purchase amount to the contract, followed by the contract's buy method
//! call naming the guessed asset.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use std::sync::Arc;

use crate::connectors::{
    assign_group_id, Address, BoxReference, LedgerClient, Transaction, TxnBody, TxnHeader,
    WalletKey, VALIDITY_WINDOW,
};
use crate::events::{CandidateAttempt, SuggestedParams};

use super::boxes::{asset_box_name, method_selector, tag_box_name};
use super::race::{AttemptError, Purchaser};

/// The contract a purchase targets.
#[derive(Debug, Clone)]
pub struct PurchaseTarget {
    pub app_id: u64,
    /// Account the payment leg is sent to.
    pub contract_address: Address,
    /// ABI signature of the buy method.
    pub method_signature: String,
}

/// Builds, signs and submits purchase groups for one wallet.
pub struct LedgerPurchaser {
    ledger: Arc<dyn LedgerClient>,
    wallet: WalletKey,
    target: PurchaseTarget,
    selector: [u8; 4],
}

impl LedgerPurchaser {
    pub fn new(ledger: Arc<dyn LedgerClient>, wallet: WalletKey, target: PurchaseTarget) -> Self {
        let selector = method_selector(&target.method_signature);
        Self {
            ledger,
            wallet,
            target,
            selector,
        }
    }

    /// Builds the unsigned, grouped payment and app call.
    pub fn build_group(
        &self,
        params: &SuggestedParams,
        candidate: CandidateAttempt,
        asset_name: &str,
    ) -> Result<Vec<Transaction>, AttemptError> {
        if asset_name.is_empty() {
            return Err(AttemptError::Build("asset name is empty".to_string()));
        }

        let genesis_hash = BASE64
            .decode(&params.genesis_hash)
            .map_err(|e| AttemptError::Build(format!("invalid genesis hash: {}", e)))?;
        let first_valid = params.last_round;
        let header = TxnHeader {
            sender: self.wallet.address(),
            fee: 0,
            first_valid,
            last_valid: first_valid.saturating_add(VALIDITY_WINDOW),
            genesis_id: params.genesis_id.clone(),
            genesis_hash,
        };

        let payment = Transaction::new(
            header.clone(),
            TxnBody::Payment {
                receiver: self.target.contract_address,
                amount: candidate.amount,
            },
        );

        let owner = self.wallet.address();
        let call = Transaction::new(
            header,
            TxnBody::AppCall {
                app_id: self.target.app_id,
                args: vec![
                    self.selector.to_vec(),
                    candidate.asset_id.to_be_bytes().to_vec(),
                    candidate.min_output.to_be_bytes().to_vec(),
                ],
                foreign_assets: vec![candidate.asset_id],
                boxes: vec![
                    BoxReference {
                        app_index: 0,
                        name: asset_name.as_bytes().to_vec(),
                    },
                    BoxReference {
                        app_index: 0,
                        name: tag_box_name(&owner).to_vec(),
                    },
                    BoxReference {
                        app_index: 0,
                        name: asset_box_name(&owner, candidate.asset_id).to_vec(),
                    },
                ],
            },
        );

        let mut group = vec![payment, call];
        for txn in group.iter_mut() {
            txn.apply_fee(params.fee, params.min_fee)?;
        }
        assign_group_id(&mut group)?;
        Ok(group)
    }

    /// Signs every transaction of `group` and concatenates the results.
    pub fn sign_group(&self, group: &[Transaction]) -> Result<Vec<u8>, AttemptError> {
        let mut signed = Vec::new();
        for txn in group {
            signed.extend(txn.sign(&self.wallet)?);
        }
        Ok(signed)
    }
}

#[async_trait]
impl Purchaser for LedgerPurchaser {
    async fn attempt(&self, candidate: CandidateAttempt, asset_name: &str) -> Result<String, AttemptError> {
        let params = self
            .ledger
            .suggested_params()
            .await
            .map_err(AttemptError::Params)?;
        let group = self.build_group(&params, candidate, asset_name)?;
        let signed = self.sign_group(&group)?;

        self.ledger
            .submit(signed)
            .await
            .map_err(AttemptError::Submit)
    }
}

impl std::fmt::Debug for LedgerPurchaser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LedgerPurchaser")
            .field("wallet", &self.wallet)
            .field("target", &self.target)
            .finish()
    }
}
