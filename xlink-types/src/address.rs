use std::io::{self, Read};

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use crate::codec::unknown_variant;

/// A foreign-chain address in one of the supported textual encodings.
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AddressData {
    /// Bech32 string with the expected human-readable prefix (e.g. `cosmos`).
    Bech32 { value: String, prefix: String },
    /// Base58 string.
    Base58 { value: String },
    /// Hex string with a literal prefix (usually `0x`).
    Hex { value: String, prefix: String },
}

impl AddressData {
    pub fn bech32(value: impl Into<String>, prefix: impl Into<String>) -> Self {
        AddressData::Bech32 {
            value: value.into(),
            prefix: prefix.into(),
        }
    }

    pub fn base58(value: impl Into<String>) -> Self {
        AddressData::Base58 {
            value: value.into(),
        }
    }

    pub fn hex(value: impl Into<String>, prefix: impl Into<String>) -> Self {
        AddressData::Hex {
            value: value.into(),
            prefix: prefix.into(),
        }
    }

    /// The textual address, as used in store keys.
    pub fn value(&self) -> &str {
        match self {
            AddressData::Bech32 { value, .. }
            | AddressData::Base58 { value }
            | AddressData::Hex { value, .. } => value,
        }
    }

    pub fn encoding(&self) -> &'static str {
        match self {
            AddressData::Bech32 { .. } => "bech32",
            AddressData::Base58 { .. } => "base58",
            AddressData::Hex { .. } => "hex",
        }
    }
}

impl BorshDeserialize for AddressData {
    fn deserialize_reader<R: Read>(reader: &mut R) -> io::Result<Self> {
        let tag = u8::deserialize_reader(reader)?;
        match tag {
            0 => Ok(AddressData::Bech32 {
                value: String::deserialize_reader(reader)?,
                prefix: String::deserialize_reader(reader)?,
            }),
            1 => Ok(AddressData::Base58 {
                value: String::deserialize_reader(reader)?,
            }),
            2 => Ok(AddressData::Hex {
                value: String::deserialize_reader(reader)?,
                prefix: String::deserialize_reader(reader)?,
            }),
            other => Err(unknown_variant("address", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_accessor() {
        assert_eq!(AddressData::bech32("cosmos1abc", "cosmos").value(), "cosmos1abc");
        assert_eq!(AddressData::base58("5Hd").value(), "5Hd");
        assert_eq!(AddressData::hex("0xdead", "0x").value(), "0xdead");
    }

    #[test]
    fn test_tags_are_stable() {
        let bytes = borsh::to_vec(&AddressData::hex("0x01", "0x")).unwrap();
        assert_eq!(bytes[0], 2);
        let decoded = AddressData::try_from_slice(&bytes).unwrap();
        assert_eq!(decoded, AddressData::hex("0x01", "0x"));
    }

    #[test]
    fn test_json_shape() {
        let json = serde_json::to_string(&AddressData::base58("abc")).unwrap();
        assert_eq!(json, r#"{"type":"base58","value":"abc"}"#);
    }
}
