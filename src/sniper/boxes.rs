//! Contract argument encoding: box names and the ABI method selector.

use sha2::{Digest, Sha512_256};

use crate::connectors::Address;

/// Box holding `owner`'s balance of `asset_id`: `addr32 || be_u64(asset_id)`.
pub fn asset_box_name(owner: &Address, asset_id: u64) -> [u8; 40] {
    let mut name = [0u8; 40];
    name[..32].copy_from_slice(owner.as_bytes());
    name[32..].copy_from_slice(&asset_id.to_be_bytes());
    name
}

/// Box tagging `owner` as a participant: `"t" || addr32`.
pub fn tag_box_name(owner: &Address) -> [u8; 33] {
    let mut name = [0u8; 33];
    name[0] = b't';
    name[1..].copy_from_slice(owner.as_bytes());
    name
}

/// First 4 bytes of SHA-512/256 of the method signature.
pub fn method_selector(signature: &str) -> [u8; 4] {
    let digest = Sha512_256::digest(signature.as_bytes());
    let mut selector = [0u8; 4];
    selector.copy_from_slice(&digest[..4]);
    selector
}
