use std::io::{self, Read};

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};

use crate::codec::unknown_variant;
use crate::error::LinkError;

/// Which signing envelope wrapped the proof plaintext.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, BorshSerialize, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ValueType {
    /// Plain bytes, signed as-is.
    Raw,
    /// Canonical binary transaction sign-document.
    ChainDirect,
    /// Legacy JSON transaction sign-document.
    ChainLegacyJson,
}

impl BorshDeserialize for ValueType {
    fn deserialize_reader<R: Read>(reader: &mut R) -> io::Result<Self> {
        match u8::deserialize_reader(reader)? {
            0 => Ok(ValueType::Raw),
            1 => Ok(ValueType::ChainDirect),
            2 => Ok(ValueType::ChainLegacyJson),
            other => Err(unknown_variant("value type", other)),
        }
    }
}

/// Compact bit array choosing which keys of a multisig signed.
///
/// Bit `i` lives in `elems[i / 8]` at mask `0x80 >> (i % 8)`.
#[derive(
    Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize,
)]
pub struct BitSelector {
    pub bits: u32,
    pub elems: Vec<u8>,
}

impl BitSelector {
    /// An all-zero selector of `bits` bits.
    pub fn new(bits: u32) -> Self {
        Self {
            bits,
            elems: vec![0u8; (bits as usize).div_ceil(8)],
        }
    }

    pub fn from_indices(bits: u32, indices: &[usize]) -> Self {
        let mut selector = Self::new(bits);
        for &i in indices {
            selector.set(i);
        }
        selector
    }

    /// Set bit `i`. Out-of-range indices are ignored.
    pub fn set(&mut self, i: usize) {
        if i < self.bits as usize {
            if let Some(byte) = self.elems.get_mut(i / 8) {
                *byte |= 0x80 >> (i % 8);
            }
        }
    }

    pub fn get(&self, i: usize) -> bool {
        i < self.bits as usize
            && self
                .elems
                .get(i / 8)
                .is_some_and(|byte| byte & (0x80 >> (i % 8)) != 0)
    }

    /// Indices of the set bits, ascending.
    pub fn indices(&self) -> Vec<usize> {
        (0..self.bits as usize).filter(|&i| self.get(i)).collect()
    }

    pub fn count_ones(&self) -> usize {
        (0..self.bits as usize).filter(|&i| self.get(i)).count()
    }

    pub fn is_well_formed(&self) -> bool {
        self.elems.len() == (self.bits as usize).div_ceil(8)
    }
}

/// A single or threshold-multi signature.
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SignatureEnvelope {
    Single {
        value_type: ValueType,
        signature: Vec<u8>,
    },
    Multi {
        bit_selector: BitSelector,
        signatures: Vec<SignatureEnvelope>,
    },
}

impl SignatureEnvelope {
    pub fn single(value_type: ValueType, signature: impl Into<Vec<u8>>) -> Self {
        SignatureEnvelope::Single {
            value_type,
            signature: signature.into(),
        }
    }

    pub fn multi(bit_selector: BitSelector, signatures: Vec<SignatureEnvelope>) -> Self {
        SignatureEnvelope::Multi {
            bit_selector,
            signatures,
        }
    }

    /// The envelope's value type. All sub-signatures of a multi signature
    /// must agree on it.
    pub fn value_type(&self) -> Result<ValueType, LinkError> {
        match self {
            SignatureEnvelope::Single { value_type, .. } => Ok(*value_type),
            SignatureEnvelope::Multi { signatures, .. } => {
                let mut common: Option<ValueType> = None;
                for (i, sig) in signatures.iter().enumerate() {
                    let vt = sig.value_type()?;
                    match common {
                        Some(existing) if existing != vt => {
                            return Err(LinkError::validation(format!(
                                "sub-signature {} uses {:?}, others use {:?}",
                                i, vt, existing
                            )));
                        }
                        _ => common = Some(vt),
                    }
                }
                common.ok_or_else(|| LinkError::validation("multi signature has no sub-signatures"))
            }
        }
    }

    /// Check the selector/sub-signature cardinality, recursively.
    pub fn validate_structure(&self) -> Result<(), LinkError> {
        match self {
            SignatureEnvelope::Single { signature, .. } => {
                if signature.is_empty() {
                    return Err(LinkError::validation("empty signature"));
                }
                Ok(())
            }
            SignatureEnvelope::Multi {
                bit_selector,
                signatures,
            } => {
                if !bit_selector.is_well_formed() {
                    return Err(LinkError::validation(format!(
                        "bit selector of {} bits carries {} bytes",
                        bit_selector.bits,
                        bit_selector.elems.len()
                    )));
                }
                let selected = bit_selector.count_ones();
                if selected != signatures.len() {
                    return Err(LinkError::validation(format!(
                        "bit selector chooses {} signers but {} signatures were supplied",
                        selected,
                        signatures.len()
                    )));
                }
                signatures.iter().try_for_each(|s| s.validate_structure())
            }
        }
    }

    /// Overwrite the value type. Multi signatures apply it to every
    /// sub-signature, at any depth.
    pub fn retag(&mut self, new_type: ValueType) {
        match self {
            SignatureEnvelope::Single { value_type, .. } => *value_type = new_type,
            SignatureEnvelope::Multi { signatures, .. } => {
                for sig in signatures.iter_mut() {
                    sig.retag(new_type);
                }
            }
        }
    }
}

impl BorshDeserialize for SignatureEnvelope {
    fn deserialize_reader<R: Read>(reader: &mut R) -> io::Result<Self> {
        match u8::deserialize_reader(reader)? {
            0 => Ok(SignatureEnvelope::Single {
                value_type: ValueType::deserialize_reader(reader)?,
                signature: Vec::<u8>::deserialize_reader(reader)?,
            }),
            1 => Ok(SignatureEnvelope::Multi {
                bit_selector: BitSelector::deserialize_reader(reader)?,
                signatures: Vec::<SignatureEnvelope>::deserialize_reader(reader)?,
            }),
            other => Err(unknown_variant("signature", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::map_decode_error;
    use proptest::prelude::*;

    fn single(vt: ValueType) -> SignatureEnvelope {
        SignatureEnvelope::single(vt, vec![1u8; 64])
    }

    #[test]
    fn test_bit_selector_layout() {
        let sel = BitSelector::from_indices(10, &[0, 3, 9]);
        assert_eq!(sel.elems, vec![0b1001_0000, 0b0100_0000]);
        assert_eq!(sel.indices(), vec![0, 3, 9]);
        assert_eq!(sel.count_ones(), 3);
        assert!(sel.is_well_formed());
    }

    #[test]
    fn test_bit_selector_ignores_padding_bits() {
        let sel = BitSelector {
            bits: 3,
            elems: vec![0xff],
        };
        assert_eq!(sel.count_ones(), 3);
        assert!(!sel.get(5));
    }

    #[test]
    fn test_multi_cardinality_mismatch() {
        let env = SignatureEnvelope::multi(
            BitSelector::from_indices(3, &[0, 2]),
            vec![single(ValueType::Raw)],
        );
        assert!(matches!(
            env.validate_structure(),
            Err(LinkError::Validation { .. })
        ));
    }

    #[test]
    fn test_malformed_selector_rejected() {
        let env = SignatureEnvelope::multi(
            BitSelector {
                bits: 9,
                elems: vec![0x80],
            },
            vec![single(ValueType::Raw)],
        );
        assert!(env.validate_structure().is_err());
    }

    #[test]
    fn test_multi_value_type_must_agree() {
        let env = SignatureEnvelope::multi(
            BitSelector::from_indices(2, &[0, 1]),
            vec![single(ValueType::Raw), single(ValueType::ChainDirect)],
        );
        assert!(env.value_type().is_err());

        let empty = SignatureEnvelope::multi(BitSelector::new(2), vec![]);
        assert!(empty.value_type().is_err());
    }

    #[test]
    fn test_retag_recurses_into_nested_multi() {
        let inner = SignatureEnvelope::multi(
            BitSelector::from_indices(1, &[0]),
            vec![single(ValueType::Raw)],
        );
        let mut env = SignatureEnvelope::multi(
            BitSelector::from_indices(2, &[0, 1]),
            vec![single(ValueType::ChainDirect), inner],
        );
        env.retag(ValueType::ChainLegacyJson);
        assert_eq!(env.value_type().unwrap(), ValueType::ChainLegacyJson);
    }

    #[test]
    fn test_unknown_value_type_tag() {
        // Single envelope with value type tag 7.
        let err = SignatureEnvelope::try_from_slice(&[0, 7, 0, 0, 0, 0]).unwrap_err();
        assert_eq!(
            map_decode_error(err),
            LinkError::UnsupportedVariant {
                kind: "value type",
                tag: 7
            }
        );
    }

    #[test]
    fn test_unknown_envelope_tag() {
        let err = SignatureEnvelope::try_from_slice(&[4]).unwrap_err();
        assert!(matches!(
            map_decode_error(err),
            LinkError::UnsupportedVariant {
                kind: "signature",
                ..
            }
        ));
    }

    proptest! {
        #[test]
        fn prop_from_indices_counts_distinct(bits in 1u32..64, picks in proptest::collection::vec(0usize..64, 0..16)) {
            let sel = BitSelector::from_indices(bits, &picks);
            let mut expected: Vec<usize> = picks.into_iter().filter(|&i| i < bits as usize).collect();
            expected.sort_unstable();
            expected.dedup();
            prop_assert!(sel.is_well_formed());
            prop_assert_eq!(sel.indices(), expected);
        }
    }
}
