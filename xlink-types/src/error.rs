use thiserror::Error;

/// Errors raised while decoding, validating or verifying chain-link data.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LinkError {
    // ─── Fatal ───────────────────────────────────────────────────────────────
    /// Malformed stored bytes or a malformed hex/base58/bech32/JSON/binary payload.
    #[error("decode error: {reason}")]
    Decode { reason: String },

    /// A wire tag that this version does not know about.
    #[error("unsupported {kind} variant: tag {tag}")]
    UnsupportedVariant { kind: &'static str, tag: u8 },

    // ─── Record-level ────────────────────────────────────────────────────────
    #[error("validation error: {reason}")]
    Validation { reason: String },

    #[error("address mismatch: {reason}")]
    AddressMismatch { reason: String },

    #[error("signature mismatch: {reason}")]
    SignatureMismatch { reason: String },
}

impl LinkError {
    pub fn decode(reason: impl Into<String>) -> Self {
        LinkError::Decode {
            reason: reason.into(),
        }
    }

    pub fn validation(reason: impl Into<String>) -> Self {
        LinkError::Validation {
            reason: reason.into(),
        }
    }

    pub fn signature_mismatch(reason: impl Into<String>) -> Self {
        LinkError::SignatureMismatch {
            reason: reason.into(),
        }
    }

    /// Fatal errors abort an entire migration step. Everything else means the
    /// record itself is invalid and can be dropped.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            LinkError::Decode { .. } | LinkError::UnsupportedVariant { .. }
        )
    }
}
