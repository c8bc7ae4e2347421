//! Event and ledger data types shared across the sniper.
//!
//! Node responses are deserialized into the chain types, and everything the
//! race executor consumes is normalized into launch events first.

mod chain_events;
mod launch_events;

pub use chain_events::{
    created_asset_ids,
    EvalDelta,
    PendingBoxRef,
    PendingTxn,
    PendingTxnFields,
    SuggestedParams,
    TxnNode,
};
pub use launch_events::{CandidateAttempt, LaunchEvent, PurchaseReport};
