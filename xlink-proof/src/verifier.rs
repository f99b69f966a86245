//! Proof verification against a foreign address and key.

use xlink_crypto::address::AddressCodec;
use xlink_crypto::envelope::VerifyEnvelope;
use xlink_types::address::AddressData;
use xlink_types::error::LinkError;
use xlink_types::link::{ChainLink, Proof};
use xlink_types::primitives::PublicKey;

use crate::classify::{frame, SignDocCodecs};
use crate::validation::validate_chain_link;

/// Verifies chain-link proofs with a fixed set of sign-document codecs.
#[derive(Clone, Copy)]
pub struct ProofVerifier<'a> {
    codecs: SignDocCodecs<'a>,
}

impl ProofVerifier<'static> {
    pub fn standard() -> Self {
        Self::new(SignDocCodecs::standard())
    }
}

impl<'a> ProofVerifier<'a> {
    pub fn new(codecs: SignDocCodecs<'a>) -> Self {
        Self { codecs }
    }

    pub fn codecs(&self) -> &SignDocCodecs<'a> {
        &self.codecs
    }

    /// Check that `key` owns `address` and signed the proof plaintext.
    pub fn verify(
        &self,
        proof: &Proof,
        address: &AddressData,
        key: &PublicKey,
    ) -> Result<(), LinkError> {
        let plaintext = hex::decode(&proof.plaintext_hex)
            .map_err(|e| LinkError::decode(format!("invalid plaintext hex: {}", e)))?;

        if !address.verify_pubkey(key)? {
            return Err(LinkError::AddressMismatch {
                reason: format!(
                    "{} key does not derive {} address {}",
                    key.algorithm(),
                    address.encoding(),
                    address.value()
                ),
            });
        }

        let value_type = proof.signature.value_type()?;
        let framed = frame(value_type, &plaintext, &self.codecs)?;
        proof.signature.verify(key, framed)
    }

    /// Structural validation followed by proof verification with the
    /// link's own public key.
    pub fn verify_link(&self, link: &ChainLink) -> Result<(), LinkError> {
        validate_chain_link(link)?;
        self.verify(&link.proof, &link.address, &link.proof.public_key)
    }
}
