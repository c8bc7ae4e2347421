//! Ledger data as it arrives from the node.
//!
//! These shapes mirror the node's JSON encoding closely enough to deserialize
//! directly, but expose typed accessors so the watchers never probe fields
//! dynamically. Byte fields stay base64 strings until a consumer needs them.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::Deserialize;

/// A transaction inside a confirmed block, or an inner transaction of one.
///
/// Asset creation can happen at any depth: a contract call may emit inner
/// transactions which themselves call contracts. Children live either in
/// `inner-txns` or in the apply-data eval delta (`dt.itx`), depending on
/// which endpoint produced the node.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TxnNode {
    /// Asset id created by this transaction, if any.
    #[serde(rename = "caid", default)]
    pub created_asset_id: Option<u64>,

    #[serde(rename = "inner-txns", default)]
    pub inner_txns: Vec<TxnNode>,

    #[serde(rename = "dt", default)]
    pub eval_delta: Option<EvalDelta>,
}

/// Apply-data eval delta carrying nested inner transactions.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EvalDelta {
    #[serde(rename = "itx", default)]
    pub inner_txns: Vec<TxnNode>,
}

impl TxnNode {
    /// A leaf node that created the given asset.
    pub fn created(asset_id: u64) -> Self {
        Self {
            created_asset_id: Some(asset_id),
            ..Self::default()
        }
    }

    /// Iterates every direct child, from both nesting fields.
    pub fn children(&self) -> impl Iterator<Item = &TxnNode> {
        self.inner_txns.iter().chain(
            self.eval_delta
                .iter()
                .flat_map(|delta| delta.inner_txns.iter()),
        )
    }
}

/// Collects every created asset id in the tree rooted at `root`.
///
/// Uses an explicit worklist so deeply nested call trees cannot overflow the
/// stack. Order of the returned ids is not significant.
pub fn created_asset_ids(root: &TxnNode) -> Vec<u64> {
    let mut created = Vec::new();
    let mut pending = vec![root];

    while let Some(node) = pending.pop() {
        if let Some(id) = node.created_asset_id {
            created.push(id);
        }
        pending.extend(node.children());
    }

    created
}

/// A transaction sitting in the node's pending pool.
#[derive(Debug, Clone, Deserialize)]
pub struct PendingTxn {
    pub txn: PendingTxnFields,
}

/// The fields of a pending transaction the launch matcher inspects.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PendingTxnFields {
    /// Transaction type tag (`pay`, `appl`, `axfer`, ...).
    #[serde(rename = "type", default)]
    pub txn_type: String,

    /// Target application id for application calls.
    #[serde(rename = "apid", default)]
    pub app_id: Option<u64>,

    /// Base64 group id.
    #[serde(rename = "grp", default)]
    pub group: Option<String>,

    /// Base64 application call arguments, in order.
    #[serde(rename = "apaa", default)]
    pub app_args: Vec<String>,

    #[serde(rename = "apbx", default)]
    pub boxes: Vec<PendingBoxRef>,

    #[serde(rename = "snd", default)]
    pub sender: String,
}

/// A box reference carried by an application call.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PendingBoxRef {
    #[serde(rename = "i", default)]
    pub index: u64,

    /// Base64 box name.
    #[serde(rename = "n", default)]
    pub name: Option<String>,
}

impl PendingTxnFields {
    pub fn is_app_call(&self) -> bool {
        self.txn_type == "appl"
    }

    /// True if any call argument decodes to exactly `value`.
    ///
    /// Arguments that are not valid base64 never match.
    pub fn has_app_arg(&self, value: &[u8]) -> bool {
        self.app_args
            .iter()
            .filter_map(|arg| BASE64.decode(arg).ok())
            .any(|arg| arg == value)
    }

    /// Decodes the first box reference's name as UTF-8.
    pub fn first_box_name(&self) -> Option<String> {
        let encoded = self.boxes.first()?.name.as_ref()?;
        let bytes = BASE64.decode(encoded).ok()?;
        String::from_utf8(bytes).ok()
    }
}

/// Network parameters needed to build a submittable transaction.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SuggestedParams {
    /// Fee per byte, in microAlgos.
    pub fee: u64,

    #[serde(rename = "min-fee")]
    pub min_fee: u64,

    #[serde(rename = "last-round")]
    pub last_round: u64,

    #[serde(rename = "genesis-id")]
    pub genesis_id: String,

    /// Base64 genesis hash.
    #[serde(rename = "genesis-hash")]
    pub genesis_hash: String,
}
