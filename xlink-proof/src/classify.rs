//! Recognising which sign-document envelope a proof plaintext came from.

use xlink_types::error::LinkError;
use xlink_types::link::Proof;
use xlink_types::sign_doc::{
    BorshSignDocCodec, DirectSignDocCodec, JsonSignDocCodec, LegacySignDocCodec,
};
use xlink_types::signature::ValueType;

/// The sign-document codecs used for classification and framing.
#[derive(Clone, Copy)]
pub struct SignDocCodecs<'a> {
    pub legacy: &'a dyn LegacySignDocCodec,
    pub direct: &'a dyn DirectSignDocCodec,
}

impl<'a> SignDocCodecs<'a> {
    pub fn new(legacy: &'a dyn LegacySignDocCodec, direct: &'a dyn DirectSignDocCodec) -> Self {
        Self { legacy, direct }
    }

    /// serde_json legacy documents and borsh binary documents.
    pub fn standard() -> SignDocCodecs<'static> {
        SignDocCodecs {
            legacy: &JsonSignDocCodec,
            direct: &BorshSignDocCodec,
        }
    }

    /// Whether `bytes` decodes as a binary sign-document that re-encodes to
    /// exactly the same bytes.
    pub fn is_canonical_direct(&self, bytes: &[u8]) -> bool {
        self.direct
            .decode_direct(bytes)
            .and_then(|doc| self.direct.encode_direct(&doc))
            .is_ok_and(|encoded| encoded == bytes)
    }

    pub fn is_legacy_json(&self, bytes: &[u8]) -> bool {
        self.legacy.decode_legacy(bytes).is_ok()
    }
}

/// Infer the value type of a proof plaintext.
///
/// Both checks always run and a canonical binary document overrides the
/// legacy JSON result. Plaintext that satisfies both is therefore tagged
/// `ChainDirect` even though a JSON wallet may have produced it; this
/// precedence is kept for compatibility with records already classified
/// this way and is probably a latent bug.
pub fn classify_value_type(bytes: &[u8], codecs: &SignDocCodecs<'_>) -> ValueType {
    let mut value_type = ValueType::Raw;
    if codecs.is_legacy_json(bytes) {
        value_type = ValueType::ChainLegacyJson;
    }
    if codecs.is_canonical_direct(bytes) {
        if value_type == ValueType::ChainLegacyJson {
            tracing::debug!("plaintext parses as both sign-document kinds, tagging as direct");
        }
        value_type = ValueType::ChainDirect;
    }
    value_type
}

/// The bytes that were signed for `value_type`. Framing never rewrites the
/// plaintext; it only checks that the plaintext is a well-formed document of
/// the claimed kind.
pub fn frame<'b>(
    value_type: ValueType,
    bytes: &'b [u8],
    codecs: &SignDocCodecs<'_>,
) -> Result<&'b [u8], LinkError> {
    match value_type {
        ValueType::Raw => Ok(bytes),
        ValueType::ChainDirect => {
            if codecs.is_canonical_direct(bytes) {
                Ok(bytes)
            } else {
                Err(LinkError::validation(
                    "plaintext is not a canonical binary sign-document",
                ))
            }
        }
        ValueType::ChainLegacyJson => codecs
            .legacy
            .decode_legacy(bytes)
            .map(|_| bytes)
            .map_err(|e| {
                LinkError::validation(format!(
                    "plaintext is not a legacy JSON sign-document: {}",
                    e
                ))
            }),
    }
}

/// Re-classify the plaintext and rewrite the envelope's value type,
/// recursively for multi signatures.
pub fn retag_proof(proof: &Proof, codecs: &SignDocCodecs<'_>) -> Result<Proof, LinkError> {
    let plaintext = hex::decode(&proof.plaintext_hex)
        .map_err(|e| LinkError::decode(format!("invalid plaintext hex: {}", e)))?;
    let mut retagged = proof.clone();
    retagged
        .signature
        .retag(classify_value_type(&plaintext, codecs));
    Ok(retagged)
}
