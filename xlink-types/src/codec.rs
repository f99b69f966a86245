//! Binary codec boundary for persisted records.
//!
//! Every stored schema goes through [`StoredRecord`], which maps borsh failures
//! onto [`LinkError`]. Hand-written decoders report unknown enum tags through
//! [`unknown_variant`] so they surface as `UnsupportedVariant` rather than as a
//! generic decode failure.

use std::fmt;
use std::io;

use borsh::{BorshDeserialize, BorshSerialize};

use crate::error::LinkError;

/// Marker error carried inside `io::Error` by hand-written enum decoders.
#[derive(Debug)]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub tag: u8,
}

impl fmt::Display for UnknownVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown {} tag {}", self.kind, self.tag)
    }
}

impl std::error::Error for UnknownVariant {}

pub fn unknown_variant(kind: &'static str, tag: u8) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, UnknownVariant { kind, tag })
}

/// Convert a borsh error into a [`LinkError`].
pub fn map_decode_error(err: io::Error) -> LinkError {
    if let Some(unknown) = err
        .get_ref()
        .and_then(|inner| inner.downcast_ref::<UnknownVariant>())
    {
        return LinkError::UnsupportedVariant {
            kind: unknown.kind,
            tag: unknown.tag,
        };
    }
    LinkError::decode(err.to_string())
}

/// A record with a fixed on-disk schema.
pub trait StoredRecord: BorshSerialize + BorshDeserialize {
    /// Human-readable schema name used in logs.
    const SCHEMA: &'static str;

    fn encode(&self) -> Result<Vec<u8>, LinkError> {
        borsh::to_vec(self).map_err(|e| LinkError::decode(format!("{}: {}", Self::SCHEMA, e)))
    }

    fn decode(bytes: &[u8]) -> Result<Self, LinkError> {
        Self::try_from_slice(bytes).map_err(map_decode_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq, BorshSerialize, BorshDeserialize)]
    struct Sample {
        id: u32,
        name: String,
    }

    impl StoredRecord for Sample {
        const SCHEMA: &'static str = "sample";
    }

    #[test]
    fn test_unknown_variant_maps_to_unsupported() {
        let err = map_decode_error(unknown_variant("address", 5));
        assert_eq!(
            err,
            LinkError::UnsupportedVariant {
                kind: "address",
                tag: 5
            }
        );
    }

    #[test]
    fn test_plain_io_error_maps_to_decode() {
        let err = map_decode_error(io::Error::new(io::ErrorKind::UnexpectedEof, "short"));
        assert!(matches!(err, LinkError::Decode { .. }));
    }

    #[test]
    fn test_trailing_bytes_rejected() {
        let mut bytes = Sample {
            id: 1,
            name: "a".to_string(),
        }
        .encode()
        .unwrap();
        bytes.push(0);
        assert!(matches!(
            Sample::decode(&bytes),
            Err(LinkError::Decode { .. })
        ));
    }
}
