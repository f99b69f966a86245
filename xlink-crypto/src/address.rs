//! Address validation and public-key cross-checks for each encoding family.

use bech32::{FromBase32, ToBase32, Variant};
use k256::elliptic_curve::sec1::ToEncodedPoint;

use xlink_types::address::AddressData;
use xlink_types::error::LinkError;
use xlink_types::primitives::PublicKey;

use crate::hash::{hash160, keccak256, sha256_truncated, ADDRESS_LEN};
use crate::keys::secp256k1_verifying_key;

/// Structural validation and key cross-checking of a foreign address.
pub trait AddressCodec {
    /// Check the address against its encoding family's structural rules.
    fn validate(&self) -> Result<(), LinkError>;

    /// Whether `key` derives to this address. A well-formed mismatch is
    /// `Ok(false)`; undecodable payloads and unusable keys are errors.
    fn verify_pubkey(&self, key: &PublicKey) -> Result<bool, LinkError>;
}

impl AddressCodec for AddressData {
    fn validate(&self) -> Result<(), LinkError> {
        match self {
            AddressData::Bech32 { value, prefix } => {
                if value.trim().is_empty() {
                    return Err(LinkError::validation("address value cannot be blank"));
                }
                if prefix.trim().is_empty() {
                    return Err(LinkError::validation("bech32 prefix cannot be blank"));
                }
                decode_bech32(value, prefix)
                    .map(|_| ())
                    .map_err(|e| LinkError::validation(e.to_string()))
            }
            AddressData::Base58 { value } => {
                if value.trim().is_empty() {
                    return Err(LinkError::validation("address value cannot be blank"));
                }
                bs58::decode(value)
                    .into_vec()
                    .map(|_| ())
                    .map_err(|e| LinkError::validation(format!("invalid base58 address: {}", e)))
            }
            AddressData::Hex { value, prefix } => {
                if value.trim().is_empty() {
                    return Err(LinkError::validation("address value cannot be blank"));
                }
                if value.len() <= prefix.len() {
                    return Err(LinkError::validation(
                        "hex address must be longer than its prefix",
                    ));
                }
                let body = value.strip_prefix(prefix.as_str()).ok_or_else(|| {
                    LinkError::validation(format!("hex address does not start with {}", prefix))
                })?;
                hex::decode(body)
                    .map(|_| ())
                    .map_err(|e| LinkError::validation(format!("invalid hex address: {}", e)))
            }
        }
    }

    fn verify_pubkey(&self, key: &PublicKey) -> Result<bool, LinkError> {
        match self {
            AddressData::Bech32 { value, prefix } => {
                let payload = decode_bech32(value, prefix)?;
                Ok(payload == account_address_bytes(key)?)
            }
            AddressData::Base58 { value } => {
                let payload = bs58::decode(value)
                    .into_vec()
                    .map_err(|e| LinkError::decode(format!("invalid base58 address: {}", e)))?;
                Ok(payload == base58_address_bytes(key)?)
            }
            AddressData::Hex { value, prefix } => {
                let body = value.strip_prefix(prefix.as_str()).ok_or_else(|| {
                    LinkError::decode(format!("hex address does not start with {}", prefix))
                })?;
                let payload = hex::decode(body)
                    .map_err(|e| LinkError::decode(format!("invalid hex address: {}", e)))?;
                Ok(payload == evm_address_bytes(key)?)
            }
        }
    }
}

/// Canonical host-style account address bytes of a key.
///
/// secp256k1 → RIPEMD160(SHA256(key)); ed25519 → SHA256(key)[..20];
/// multisig → SHA256(borsh(key))[..20].
pub fn account_address_bytes(key: &PublicKey) -> Result<Vec<u8>, LinkError> {
    match key {
        PublicKey::Secp256k1 { bytes } => Ok(hash160(bytes).to_vec()),
        PublicKey::Ed25519 { .. } | PublicKey::Multisig { .. } => {
            Ok(sha256_truncated(&key.to_bytes()?).to_vec())
        }
    }
}

/// SHA256(key bytes)[..20].
pub fn base58_address_bytes(key: &PublicKey) -> Result<Vec<u8>, LinkError> {
    Ok(sha256_truncated(&key.to_bytes()?).to_vec())
}

/// Account-centric derivation: Keccak-256 of the uncompressed point without
/// its 0x04 marker, last 20 bytes.
pub fn evm_address_bytes(key: &PublicKey) -> Result<Vec<u8>, LinkError> {
    let bytes = match key {
        PublicKey::Secp256k1 { bytes } => bytes,
        other => {
            return Err(LinkError::validation(format!(
                "hex addresses derive from secp256k1 keys, got {}",
                other.algorithm()
            )))
        }
    };
    let verifying_key = secp256k1_verifying_key(bytes)?;
    let uncompressed = verifying_key.as_affine().to_encoded_point(false);
    let hash = keccak256(&uncompressed.as_bytes()[1..]);
    Ok(hash[32 - ADDRESS_LEN..].to_vec())
}

pub fn encode_bech32(prefix: &str, bytes: &[u8]) -> Result<String, LinkError> {
    bech32::encode(prefix, bytes.to_base32(), Variant::Bech32)
        .map_err(|e| LinkError::validation(format!("cannot bech32-encode: {}", e)))
}

/// Decode a classic bech32 string and check its human-readable part.
pub fn decode_bech32(value: &str, expected_prefix: &str) -> Result<Vec<u8>, LinkError> {
    let (hrp, data, variant) = bech32::decode(value)
        .map_err(|e| LinkError::decode(format!("invalid bech32 address: {}", e)))?;
    if variant != Variant::Bech32 {
        return Err(LinkError::decode("bech32m addresses are not supported"));
    }
    if hrp != expected_prefix {
        return Err(LinkError::decode(format!(
            "bech32 prefix mismatch: expected {}, got {}",
            expected_prefix, hrp
        )));
    }
    Vec::<u8>::from_base32(&data)
        .map_err(|e| LinkError::decode(format!("invalid bech32 payload: {}", e)))
}

/// Check that `value` is a classic bech32 account string with any
/// human-readable part. Returns that part.
pub fn validate_bech32_account(value: &str) -> Result<String, LinkError> {
    if value.trim().is_empty() {
        return Err(LinkError::validation("account address cannot be blank"));
    }
    let (hrp, _, variant) = bech32::decode(value)
        .map_err(|e| LinkError::validation(format!("invalid account address {}: {}", value, e)))?;
    if variant != Variant::Bech32 {
        return Err(LinkError::validation(format!(
            "account address {} is not classic bech32",
            value
        )));
    }
    Ok(hrp)
}
