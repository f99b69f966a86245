//! Superseded on-disk schemas and key layouts. Only the migrations read these.

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use crate::account::BaseAccount;
use crate::address::AddressData;
use crate::codec::StoredRecord;
use crate::link::ChainConfig;
use crate::primitives::{Owner, PublicKey, Timestamp};

// ─── Schema v1-v2 key layouts (plain concatenation, original case) ─────────

pub const LEGACY_DTAG_PREFIX: &[u8] = &[0x10];
pub const LEGACY_APP_LINK_PREFIX: &[u8] = &[0x11];
pub const LEGACY_CLIENT_ID_PREFIX: &[u8] = &[0x12];
pub const LEGACY_CHAIN_LINK_PREFIX: &[u8] = &[0x13];

fn concat(prefix: &[u8], fields: &[&str]) -> Vec<u8> {
    let mut key = prefix.to_vec();
    for field in fields {
        key.extend_from_slice(field.as_bytes());
    }
    key
}

pub fn legacy_dtag_key(dtag: &str) -> Vec<u8> {
    concat(LEGACY_DTAG_PREFIX, &[dtag])
}

pub fn legacy_app_link_key(owner: &str, application: &str, username: &str) -> Vec<u8> {
    concat(LEGACY_APP_LINK_PREFIX, &[owner, application, username])
}

pub fn legacy_client_id_key(client_id: &str) -> Vec<u8> {
    concat(LEGACY_CLIENT_ID_PREFIX, &[client_id])
}

pub fn legacy_chain_link_key(owner: &str, chain_name: &str, address: &str) -> Vec<u8> {
    concat(LEGACY_CHAIN_LINK_PREFIX, &[owner, chain_name, address])
}

// ─── Schema v1 accounts ─────────────────────────────────────────────────────

/// Profile before pictures were grouped into their own struct.
#[derive(
    Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize,
)]
pub struct ProfileV1 {
    pub account: BaseAccount,
    pub dtag: String,
    pub nickname: String,
    pub bio: String,
    pub profile_picture: String,
    pub cover_picture: String,
    pub creation_time: Timestamp,
}

#[derive(
    Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize,
)]
pub enum AccountRecordV1 {
    Base(BaseAccount),
    Profile(ProfileV1),
}

impl StoredRecord for AccountRecordV1 {
    const SCHEMA: &'static str = "account_v1";
}

// ─── Schema v1-v3 chain links ───────────────────────────────────────────────

/// Proof stored before signatures carried a value type.
#[derive(
    Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize,
)]
pub struct ProofV1 {
    pub public_key: PublicKey,
    pub signature: Vec<u8>,
    pub plaintext_hex: String,
}

#[derive(
    Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize,
)]
pub struct ChainLinkV1 {
    pub owner: Owner,
    pub address: AddressData,
    pub proof: ProofV1,
    pub chain_config: ChainConfig,
    pub creation_time: Timestamp,
}

impl StoredRecord for ChainLinkV1 {
    const SCHEMA: &'static str = "chain_link_v1";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_legacy_keys_are_plain_concatenation() {
        assert_eq!(legacy_dtag_key("Alice"), b"\x10Alice".to_vec());
        assert_eq!(
            legacy_chain_link_key("desmos1a", "cosmos", "cosmos1b"),
            b"\x13desmos1acosmoscosmos1b".to_vec()
        );
    }
}
