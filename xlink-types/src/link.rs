use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use crate::address::AddressData;
use crate::codec::StoredRecord;
use crate::primitives::{Owner, PublicKey, Timestamp};
use crate::signature::SignatureEnvelope;

/// Public key, signature and signed plaintext backing a chain link.
#[derive(
    Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize,
)]
pub struct Proof {
    pub public_key: PublicKey,
    pub signature: SignatureEnvelope,
    /// Hex encoding of the signed bytes.
    pub plaintext_hex: String,
}

impl Proof {
    pub fn new(
        public_key: PublicKey,
        signature: SignatureEnvelope,
        plaintext_hex: impl Into<String>,
    ) -> Self {
        Self {
            public_key,
            signature,
            plaintext_hex: plaintext_hex.into(),
        }
    }
}

/// The foreign chain a link points at.
#[derive(
    Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize,
)]
pub struct ChainConfig {
    pub name: String,
}

impl ChainConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// A proven association between a local account and a foreign address.
#[derive(
    Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize,
)]
pub struct ChainLink {
    pub owner: Owner,
    pub address: AddressData,
    pub proof: Proof,
    pub chain_config: ChainConfig,
    pub creation_time: Timestamp,
}

impl ChainLink {
    pub fn new(
        owner: impl Into<Owner>,
        address: AddressData,
        proof: Proof,
        chain_config: ChainConfig,
        creation_time: Timestamp,
    ) -> Self {
        Self {
            owner: owner.into(),
            address,
            proof,
            chain_config,
            creation_time,
        }
    }
}

impl StoredRecord for ChainLink {
    const SCHEMA: &'static str = "chain_link";
}
