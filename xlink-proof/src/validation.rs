use xlink_crypto::address::{validate_bech32_account, AddressCodec};
use xlink_types::error::LinkError;
use xlink_types::link::{ChainLink, Proof};
use xlink_types::signature::{SignatureEnvelope, ValueType};

use crate::classify::SignDocCodecs;

/// Structural checks on a chain link. No signatures are verified here.
pub fn validate_chain_link(link: &ChainLink) -> Result<(), LinkError> {
    validate_bech32_account(&link.owner)?;
    link.address.validate()?;
    validate_proof(&link.proof)?;
    if link.chain_config.name.trim().is_empty() {
        return Err(LinkError::validation("chain name cannot be blank"));
    }
    if link.creation_time == 0 {
        return Err(LinkError::validation("creation time cannot be zero"));
    }
    Ok(())
}

/// Proof structure: non-blank hex plaintext and a well-formed envelope.
/// Malformed hex is a decode error, not a validation failure.
pub fn validate_proof(proof: &Proof) -> Result<(), LinkError> {
    if proof.plaintext_hex.trim().is_empty() {
        return Err(LinkError::validation("proof plaintext cannot be blank"));
    }
    hex::decode(&proof.plaintext_hex)
        .map_err(|e| LinkError::decode(format!("invalid plaintext hex: {}", e)))?;
    proof.signature.validate_structure()?;
    proof.signature.value_type()?;
    Ok(())
}

/// Check that the signed payload names `owner`, so a proof cannot be
/// replayed for another account.
pub fn validate_signed_value(
    signature: &SignatureEnvelope,
    plaintext: &[u8],
    owner: &str,
    codecs: &SignDocCodecs<'_>,
) -> Result<(), LinkError> {
    let signed = match signature.value_type()? {
        ValueType::Raw => String::from_utf8_lossy(plaintext).into_owned(),
        ValueType::ChainDirect => {
            let doc = codecs
                .direct
                .decode_direct(plaintext)
                .map_err(|e| LinkError::validation(format!("invalid sign-document: {}", e)))?;
            codecs
                .direct
                .decode_body(&doc.body_bytes)
                .map_err(|e| LinkError::validation(format!("invalid transaction body: {}", e)))?
                .memo
        }
        ValueType::ChainLegacyJson => {
            codecs
                .legacy
                .decode_legacy(plaintext)
                .map_err(|e| LinkError::validation(format!("invalid sign-document: {}", e)))?
                .memo
        }
    };
    if signed != owner {
        return Err(LinkError::validation(format!(
            "signed value {:?} does not match owner {}",
            signed, owner
        )));
    }
    Ok(())
}
