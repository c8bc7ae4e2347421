//! Connectors for the ledger node.
//!
//! This module provides the low-level algod client plus the address, key and
//! transaction primitives needed to build submittable groups. All data
//! fetched here is raw and must be normalized through the events layer
//! before use.

mod address;
mod algod;
mod auth;
mod ledger;
mod transaction;

pub use address::{Address, AddressError};
pub use algod::{AlgodClient, ApiError};
pub use auth::{KeyError, NodeCredentials, WalletKey, API_TOKEN_HEADER};
pub use ledger::LedgerClient;
pub use transaction::{
    assign_group_id, BoxReference, EncodeError, Transaction, TxnBody, TxnHeader, VALIDITY_WINDOW,
};

#[cfg(test)]
pub(crate) mod memory;
