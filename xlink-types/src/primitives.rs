use std::io::{self, Read};

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use crate::codec::unknown_variant;
use crate::error::LinkError;

/// Unix timestamp in seconds.
pub type Timestamp = u64;

/// Local account address (bech32 string) of a link owner.
pub type Owner = String;

/// Value stored under pure index keys.
pub const SENTINEL: &[u8] = &[0x01];

/// Length of a compressed secp256k1 public key.
pub const SECP256K1_PUBKEY_LEN: usize = 33;

/// Length of an Ed25519 public key.
pub const ED25519_PUBKEY_LEN: usize = 32;

/// Public key supplied with a proof, tagged with its algorithm.
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PublicKey {
    /// 33-byte SEC1 compressed secp256k1 point.
    Secp256k1 { bytes: Vec<u8> },
    /// 32-byte Ed25519 key.
    Ed25519 { bytes: Vec<u8> },
    /// `threshold`-of-`keys.len()` composite key.
    Multisig { threshold: u32, keys: Vec<PublicKey> },
}

impl PublicKey {
    pub fn secp256k1(bytes: impl Into<Vec<u8>>) -> Self {
        PublicKey::Secp256k1 {
            bytes: bytes.into(),
        }
    }

    pub fn ed25519(bytes: impl Into<Vec<u8>>) -> Self {
        PublicKey::Ed25519 {
            bytes: bytes.into(),
        }
    }

    pub fn multisig(threshold: u32, keys: Vec<PublicKey>) -> Self {
        PublicKey::Multisig { threshold, keys }
    }

    pub fn algorithm(&self) -> &'static str {
        match self {
            PublicKey::Secp256k1 { .. } => "secp256k1",
            PublicKey::Ed25519 { .. } => "ed25519",
            PublicKey::Multisig { .. } => "multisig",
        }
    }

    /// Bytes that address derivation hashes: the raw key for single keys and
    /// the borsh encoding for a multisig key.
    pub fn to_bytes(&self) -> Result<Vec<u8>, LinkError> {
        match self {
            PublicKey::Secp256k1 { bytes } | PublicKey::Ed25519 { bytes } => Ok(bytes.clone()),
            PublicKey::Multisig { .. } => {
                borsh::to_vec(self).map_err(|e| LinkError::decode(e.to_string()))
            }
        }
    }
}

impl BorshDeserialize for PublicKey {
    fn deserialize_reader<R: Read>(reader: &mut R) -> io::Result<Self> {
        let tag = u8::deserialize_reader(reader)?;
        match tag {
            0 => Ok(PublicKey::Secp256k1 {
                bytes: Vec::<u8>::deserialize_reader(reader)?,
            }),
            1 => Ok(PublicKey::Ed25519 {
                bytes: Vec::<u8>::deserialize_reader(reader)?,
            }),
            2 => Ok(PublicKey::Multisig {
                threshold: u32::deserialize_reader(reader)?,
                keys: Vec::<PublicKey>::deserialize_reader(reader)?,
            }),
            other => Err(unknown_variant("public key", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::map_decode_error;

    #[test]
    fn test_multisig_roundtrip() {
        let key = PublicKey::multisig(
            2,
            vec![
                PublicKey::secp256k1(vec![2u8; 33]),
                PublicKey::ed25519(vec![7u8; 32]),
                PublicKey::multisig(1, vec![PublicKey::secp256k1(vec![3u8; 33])]),
            ],
        );
        let bytes = borsh::to_vec(&key).unwrap();
        assert_eq!(PublicKey::try_from_slice(&bytes).unwrap(), key);
    }

    #[test]
    fn test_unknown_key_tag() {
        let err = PublicKey::try_from_slice(&[9, 0, 0, 0, 0]).unwrap_err();
        assert!(matches!(
            map_decode_error(err),
            LinkError::UnsupportedVariant {
                kind: "public key",
                tag: 9
            }
        ));
    }

    #[test]
    fn test_to_bytes_single_is_raw() {
        let key = PublicKey::ed25519(vec![5u8; 32]);
        assert_eq!(key.to_bytes().unwrap(), vec![5u8; 32]);
    }
}
