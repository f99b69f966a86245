//! Transaction sign-documents that a foreign wallet may have wrapped the
//! proof plaintext in, plus the codec seams used to recognise them.
//!
//! The codecs are traits so callers inject them explicitly; nothing here
//! reaches for process-wide codec state.

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use crate::error::LinkError;

/// Canonical binary sign-document.
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct DirectSignDoc {
    /// Encoded [`TxBody`].
    pub body_bytes: Vec<u8>,
    pub auth_info_bytes: Vec<u8>,
    pub chain_id: String,
    pub account_number: u64,
}

/// Transaction body carried inside a [`DirectSignDoc`].
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct TxBody {
    pub messages: Vec<Vec<u8>>,
    pub memo: String,
    pub timeout_height: u64,
}

/// Fee section of a legacy JSON sign-document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LegacyFee {
    pub amount: Vec<serde_json::Value>,
    pub gas: String,
}

/// Legacy JSON sign-document. Field order is alphabetical, matching the
/// sorted-key JSON wallets sign.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LegacySignDoc {
    pub account_number: String,
    pub chain_id: String,
    pub fee: LegacyFee,
    pub memo: String,
    pub msgs: Vec<serde_json::Value>,
    pub sequence: String,
}

/// Decoder for legacy JSON sign-documents.
pub trait LegacySignDocCodec: Send + Sync {
    fn decode_legacy(&self, bytes: &[u8]) -> Result<LegacySignDoc, LinkError>;
}

/// Decoder/encoder pair for canonical binary sign-documents.
pub trait DirectSignDocCodec: Send + Sync {
    fn decode_direct(&self, bytes: &[u8]) -> Result<DirectSignDoc, LinkError>;
    fn encode_direct(&self, doc: &DirectSignDoc) -> Result<Vec<u8>, LinkError>;
    fn decode_body(&self, bytes: &[u8]) -> Result<TxBody, LinkError>;
}

/// serde_json-backed legacy codec.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSignDocCodec;

impl LegacySignDocCodec for JsonSignDocCodec {
    fn decode_legacy(&self, bytes: &[u8]) -> Result<LegacySignDoc, LinkError> {
        serde_json::from_slice(bytes).map_err(|e| LinkError::decode(e.to_string()))
    }
}

/// borsh-backed binary codec.
#[derive(Debug, Clone, Copy, Default)]
pub struct BorshSignDocCodec;

impl DirectSignDocCodec for BorshSignDocCodec {
    fn decode_direct(&self, bytes: &[u8]) -> Result<DirectSignDoc, LinkError> {
        DirectSignDoc::try_from_slice(bytes).map_err(|e| LinkError::decode(e.to_string()))
    }

    fn encode_direct(&self, doc: &DirectSignDoc) -> Result<Vec<u8>, LinkError> {
        borsh::to_vec(doc).map_err(|e| LinkError::decode(e.to_string()))
    }

    fn decode_body(&self, bytes: &[u8]) -> Result<TxBody, LinkError> {
        TxBody::try_from_slice(bytes).map_err(|e| LinkError::decode(e.to_string()))
    }
}
