//! Transaction encoding, grouping and signing.
//!
//! Transactions are encoded as canonical msgpack: map keys sorted, zero and
//! empty fields omitted, integers and lengths in their smallest form. The
//! node recomputes ids from these bytes, so any deviation makes the group id
//! or signature invalid.

use rmpv::Value;
use sha2::{Digest, Sha512_256};
use thiserror::Error;

use super::address::Address;
use super::auth::WalletKey;

/// Rounds a transaction stays valid after its first valid round.
pub const VALIDITY_WINDOW: u64 = 1000;

/// Bytes a signature adds to an encoded transaction: the outer map header,
/// the `sig` and `txn` keys, and the 64-byte bin payload with its header.
const SIGNATURE_OVERHEAD: u64 = 75;

const MAX_GROUP_SIZE: usize = 16;

#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("msgpack encoding failed: {0}")]
    Msgpack(#[from] rmpv::encode::Error),

    #[error("Group of {0} transactions exceeds the limit of {MAX_GROUP_SIZE}")]
    GroupTooLarge(usize),

    #[error("Cannot group an empty transaction list")]
    EmptyGroup,
}

/// A box the application call is allowed to touch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoxReference {
    /// Index into the foreign apps list; 0 is the called app itself.
    pub app_index: u64,
    pub name: Vec<u8>,
}

/// Type-specific transaction fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxnBody {
    Payment {
        receiver: Address,
        amount: u64,
    },
    AppCall {
        app_id: u64,
        args: Vec<Vec<u8>>,
        foreign_assets: Vec<u64>,
        boxes: Vec<BoxReference>,
    },
}

/// Fields common to every transaction, taken from the node's suggested params.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxnHeader {
    pub sender: Address,
    pub fee: u64,
    pub first_valid: u64,
    pub last_valid: u64,
    pub genesis_id: String,
    pub genesis_hash: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub header: TxnHeader,
    pub body: TxnBody,
    pub group: Option<[u8; 32]>,
}

impl Transaction {
    pub fn new(header: TxnHeader, body: TxnBody) -> Self {
        Self {
            header,
            body,
            group: None,
        }
    }

    /// Canonical msgpack map of this transaction.
    fn to_value(&self) -> Value {
        let mut fields: Vec<(&'static str, Value)> = Vec::with_capacity(16);
        let h = &self.header;

        push_uint(&mut fields, "fee", h.fee);
        push_uint(&mut fields, "fv", h.first_valid);
        push_uint(&mut fields, "lv", h.last_valid);
        if !h.genesis_id.is_empty() {
            fields.push(("gen", Value::from(h.genesis_id.as_str())));
        }
        push_bin(&mut fields, "gh", &h.genesis_hash);
        if let Some(group) = &self.group {
            push_bin(&mut fields, "grp", group);
        }
        push_bin(&mut fields, "snd", h.sender.as_bytes());

        match &self.body {
            TxnBody::Payment { receiver, amount } => {
                fields.push(("type", Value::from("pay")));
                push_uint(&mut fields, "amt", *amount);
                push_bin(&mut fields, "rcv", receiver.as_bytes());
            }
            TxnBody::AppCall {
                app_id,
                args,
                foreign_assets,
                boxes,
            } => {
                fields.push(("type", Value::from("appl")));
                push_uint(&mut fields, "apid", *app_id);
                if !args.is_empty() {
                    let args = args.iter().map(|a| Value::Binary(a.clone())).collect();
                    fields.push(("apaa", Value::Array(args)));
                }
                if !foreign_assets.is_empty() {
                    let assets = foreign_assets.iter().map(|&a| Value::from(a)).collect();
                    fields.push(("apas", Value::Array(assets)));
                }
                if !boxes.is_empty() {
                    let boxes = boxes.iter().map(box_value).collect();
                    fields.push(("apbx", Value::Array(boxes)));
                }
            }
        }

        sorted_map(fields)
    }

    /// Canonical msgpack bytes of this transaction.
    pub fn encode(&self) -> Result<Vec<u8>, EncodeError> {
        let mut buf = Vec::with_capacity(256);
        rmpv::encode::write_value(&mut buf, &self.to_value())?;
        Ok(buf)
    }

    /// Raw transaction id: SHA-512/256 over `"TX" || encoding`.
    pub fn raw_id(&self) -> Result<[u8; 32], EncodeError> {
        Ok(prefixed_digest(b"TX", &self.encode()?))
    }

    /// Size of this transaction once signed.
    pub fn estimated_signed_size(&self) -> Result<u64, EncodeError> {
        Ok(self.encode()?.len() as u64 + SIGNATURE_OVERHEAD)
    }

    /// Sets the fee to `max(min_fee, fee_per_byte * signed_size)`.
    pub fn apply_fee(&mut self, fee_per_byte: u64, min_fee: u64) -> Result<(), EncodeError> {
        self.header.fee = min_fee;
        let size = self.estimated_signed_size()?;
        self.header.fee = fee_per_byte.saturating_mul(size).max(min_fee);
        Ok(())
    }

    /// Signs with `key` and returns the encoded signed transaction.
    pub fn sign(&self, key: &WalletKey) -> Result<Vec<u8>, EncodeError> {
        let encoded = self.encode()?;
        let mut message = Vec::with_capacity(encoded.len() + 2);
        message.extend_from_slice(b"TX");
        message.extend_from_slice(&encoded);
        let signature = key.sign(&message);

        let signed = sorted_map(vec![
            ("sig", Value::Binary(signature.to_vec())),
            ("txn", self.to_value()),
        ]);
        let mut buf = Vec::with_capacity(encoded.len() + SIGNATURE_OVERHEAD as usize);
        rmpv::encode::write_value(&mut buf, &signed)?;
        Ok(buf)
    }
}

/// Computes the group id for `txns` and stamps it on each of them.
///
/// The group id is SHA-512/256 over `"TG" || msgpack({txlist: [ids]})`, where
/// each id is computed before the group field is set.
pub fn assign_group_id(txns: &mut [Transaction]) -> Result<[u8; 32], EncodeError> {
    if txns.is_empty() {
        return Err(EncodeError::EmptyGroup);
    }
    if txns.len() > MAX_GROUP_SIZE {
        return Err(EncodeError::GroupTooLarge(txns.len()));
    }

    let ids = txns
        .iter()
        .map(|txn| {
            let mut ungrouped = txn.clone();
            ungrouped.group = None;
            ungrouped.raw_id().map(|id| Value::Binary(id.to_vec()))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mut buf = Vec::new();
    rmpv::encode::write_value(&mut buf, &sorted_map(vec![("txlist", Value::Array(ids))]))?;
    let group = prefixed_digest(b"TG", &buf);

    for txn in txns.iter_mut() {
        txn.group = Some(group);
    }
    Ok(group)
}

fn prefixed_digest(prefix: &[u8], data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha512_256::new();
    hasher.update(prefix);
    hasher.update(data);
    hasher.finalize().into()
}

fn box_value(reference: &BoxReference) -> Value {
    let mut fields = Vec::with_capacity(2);
    push_uint(&mut fields, "i", reference.app_index);
    push_bin(&mut fields, "n", &reference.name);
    sorted_map(fields)
}

fn push_uint(fields: &mut Vec<(&'static str, Value)>, key: &'static str, value: u64) {
    if value != 0 {
        fields.push((key, Value::from(value)));
    }
}

fn push_bin(fields: &mut Vec<(&'static str, Value)>, key: &'static str, value: &[u8]) {
    if !value.is_empty() {
        fields.push((key, Value::Binary(value.to_vec())));
    }
}

fn sorted_map(mut fields: Vec<(&'static str, Value)>) -> Value {
    fields.sort_by(|a, b| a.0.cmp(b.0));
    Value::Map(
        fields
            .into_iter()
            .map(|(k, v)| (Value::from(k), v))
            .collect(),
    )
}
