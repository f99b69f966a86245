use ed25519_dalek::{Signer as _, Verifier as _};
use k256::ecdsa::signature::{Signer as _, Verifier as _};
use k256::elliptic_curve::sec1::ToEncodedPoint;

use xlink_types::error::LinkError;
use xlink_types::primitives::{PublicKey, ED25519_PUBKEY_LEN, SECP256K1_PUBKEY_LEN};

/// secp256k1 signing key, as used by account-based chains.
pub struct Secp256k1Keypair {
    inner: k256::ecdsa::SigningKey,
}

impl Secp256k1Keypair {
    /// Generate a new random keypair.
    pub fn generate() -> Self {
        let mut csprng = rand::rngs::OsRng;
        Self {
            inner: k256::ecdsa::SigningKey::random(&mut csprng),
        }
    }

    /// Create a keypair from a 32-byte secret scalar.
    pub fn from_seed(seed: &[u8; 32]) -> Result<Self, LinkError> {
        let inner = k256::ecdsa::SigningKey::from_slice(seed)
            .map_err(|_| LinkError::validation("invalid secp256k1 secret key"))?;
        Ok(Self { inner })
    }

    /// Compressed SEC1 public key.
    pub fn public_key(&self) -> PublicKey {
        let point = self.inner.verifying_key().as_affine().to_encoded_point(true);
        PublicKey::secp256k1(point.as_bytes().to_vec())
    }

    /// ECDSA over SHA-256(message), 64-byte r||s with low S.
    pub fn sign(&self, message: &[u8]) -> Vec<u8> {
        let sig: k256::ecdsa::Signature = self.inner.sign(message);
        sig.to_bytes().to_vec()
    }
}

/// Ed25519 signing key.
pub struct Ed25519Keypair {
    inner: ed25519_dalek::SigningKey,
}

impl Ed25519Keypair {
    pub fn generate() -> Self {
        let mut csprng = rand::rngs::OsRng;
        Self {
            inner: ed25519_dalek::SigningKey::generate(&mut csprng),
        }
    }

    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self {
            inner: ed25519_dalek::SigningKey::from_bytes(seed),
        }
    }

    pub fn public_key(&self) -> PublicKey {
        PublicKey::ed25519(self.inner.verifying_key().to_bytes().to_vec())
    }

    pub fn sign(&self, message: &[u8]) -> Vec<u8> {
        self.inner.sign(message).to_bytes().to_vec()
    }
}

/// Parse compressed or uncompressed secp256k1 key bytes.
pub fn secp256k1_verifying_key(bytes: &[u8]) -> Result<k256::ecdsa::VerifyingKey, LinkError> {
    if bytes.len() != SECP256K1_PUBKEY_LEN && bytes.len() != 65 {
        return Err(LinkError::validation(format!(
            "secp256k1 key must be 33 or 65 bytes, got {}",
            bytes.len()
        )));
    }
    k256::ecdsa::VerifyingKey::from_sec1_bytes(bytes)
        .map_err(|_| LinkError::validation("invalid secp256k1 public key"))
}

/// Verify a secp256k1 ECDSA signature over `message`.
pub fn verify_secp256k1(message: &[u8], signature: &[u8], pubkey: &[u8]) -> Result<(), LinkError> {
    let verifying_key = secp256k1_verifying_key(pubkey)?;
    let sig = k256::ecdsa::Signature::from_slice(signature)
        .map_err(|_| LinkError::signature_mismatch("malformed secp256k1 signature"))?;
    verifying_key
        .verify(message, &sig)
        .map_err(|_| LinkError::signature_mismatch("secp256k1 signature does not verify"))
}

/// Verify an Ed25519 signature over `message`.
pub fn verify_ed25519(message: &[u8], signature: &[u8], pubkey: &[u8]) -> Result<(), LinkError> {
    let key_bytes: [u8; ED25519_PUBKEY_LEN] = pubkey.try_into().map_err(|_| {
        LinkError::validation(format!(
            "ed25519 key must be {} bytes, got {}",
            ED25519_PUBKEY_LEN,
            pubkey.len()
        ))
    })?;
    let verifying_key = ed25519_dalek::VerifyingKey::from_bytes(&key_bytes)
        .map_err(|_| LinkError::validation("invalid ed25519 public key"))?;
    let sig = ed25519_dalek::Signature::from_slice(signature)
        .map_err(|_| LinkError::signature_mismatch("malformed ed25519 signature"))?;
    verifying_key
        .verify(message, &sig)
        .map_err(|_| LinkError::signature_mismatch("ed25519 signature does not verify"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_key(key: &PublicKey) -> Vec<u8> {
        key.to_bytes().unwrap()
    }

    #[test]
    fn test_secp256k1_sign_verify_roundtrip() {
        let kp = Secp256k1Keypair::generate();
        let sig = kp.sign(b"hello xlink");
        assert!(verify_secp256k1(b"hello xlink", &sig, &raw_key(&kp.public_key())).is_ok());
    }

    #[test]
    fn test_secp256k1_wrong_message_rejected() {
        let kp = Secp256k1Keypair::from_seed(&[7u8; 32]).unwrap();
        let sig = kp.sign(b"hello xlink");
        assert!(matches!(
            verify_secp256k1(b"other", &sig, &raw_key(&kp.public_key())),
            Err(LinkError::SignatureMismatch { .. })
        ));
    }

    #[test]
    fn test_secp256k1_bad_key_is_validation_error() {
        assert!(matches!(
            verify_secp256k1(b"m", &[0u8; 64], &[1u8; 10]),
            Err(LinkError::Validation { .. })
        ));
    }

    #[test]
    fn test_secp256k1_compressed_key_length() {
        let kp = Secp256k1Keypair::from_seed(&[9u8; 32]).unwrap();
        assert_eq!(raw_key(&kp.public_key()).len(), SECP256K1_PUBKEY_LEN);
    }

    #[test]
    fn test_ed25519_sign_verify_roundtrip() {
        let kp = Ed25519Keypair::from_seed(&[42u8; 32]);
        let sig = kp.sign(b"hello xlink");
        assert!(verify_ed25519(b"hello xlink", &sig, &raw_key(&kp.public_key())).is_ok());
    }

    #[test]
    fn test_ed25519_corrupted_signature_rejected() {
        let kp = Ed25519Keypair::generate();
        let mut sig = kp.sign(b"hello xlink");
        sig[0] ^= 0xff;
        assert!(verify_ed25519(b"hello xlink", &sig, &raw_key(&kp.public_key())).is_err());
    }

    #[test]
    fn test_ed25519_wrong_key_length() {
        assert!(matches!(
            verify_ed25519(b"m", &[0u8; 64], &[0u8; 31]),
            Err(LinkError::Validation { .. })
        ));
    }
}
