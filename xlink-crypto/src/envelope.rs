//! Signature envelope verification over already-framed bytes.

use xlink_types::error::LinkError;
use xlink_types::primitives::PublicKey;
use xlink_types::signature::SignatureEnvelope;

use crate::keys::{verify_ed25519, verify_secp256k1};

/// Verification of a signature envelope against a key.
pub trait VerifyEnvelope {
    /// Verify over `framed`, the exact bytes that were signed.
    fn verify(&self, key: &PublicKey, framed: &[u8]) -> Result<(), LinkError>;
}

impl VerifyEnvelope for SignatureEnvelope {
    fn verify(&self, key: &PublicKey, framed: &[u8]) -> Result<(), LinkError> {
        match self {
            SignatureEnvelope::Single { signature, .. } => match key {
                PublicKey::Secp256k1 { bytes } => verify_secp256k1(framed, signature, bytes),
                PublicKey::Ed25519 { bytes } => verify_ed25519(framed, signature, bytes),
                PublicKey::Multisig { .. } => Err(LinkError::validation(
                    "single signature cannot be checked against a multisig key",
                )),
            },
            SignatureEnvelope::Multi {
                bit_selector,
                signatures,
            } => {
                let (threshold, keys) = match key {
                    PublicKey::Multisig { threshold, keys } => (*threshold as usize, keys),
                    other => {
                        return Err(LinkError::validation(format!(
                            "multi signature requires a multisig key, got {}",
                            other.algorithm()
                        )))
                    }
                };
                if threshold == 0 || threshold > keys.len() {
                    return Err(LinkError::validation(format!(
                        "invalid multisig threshold {} of {}",
                        threshold,
                        keys.len()
                    )));
                }
                if bit_selector.bits as usize != keys.len() || !bit_selector.is_well_formed() {
                    return Err(LinkError::validation(format!(
                        "bit selector of {} bits does not cover {} keys",
                        bit_selector.bits,
                        keys.len()
                    )));
                }
                let selected = bit_selector.indices();
                if selected.len() != signatures.len() {
                    return Err(LinkError::validation(format!(
                        "bit selector chooses {} signers but {} signatures were supplied",
                        selected.len(),
                        signatures.len()
                    )));
                }

                let mut verified = 0usize;
                for (index, sub) in selected.into_iter().zip(signatures) {
                    match sub.verify(&keys[index], framed) {
                        Ok(()) => verified += 1,
                        Err(LinkError::SignatureMismatch { .. }) => {}
                        Err(e) => return Err(e),
                    }
                }
                if verified < threshold {
                    return Err(LinkError::signature_mismatch(format!(
                        "{} of {} selected signatures verify, threshold is {}",
                        verified,
                        signatures.len(),
                        threshold
                    )));
                }
                Ok(())
            }
        }
    }
}
