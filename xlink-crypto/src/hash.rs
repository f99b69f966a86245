use ripemd::Ripemd160;
use sha2::{Digest, Sha256};
use sha3::Keccak256;

/// Length of a truncated address hash.
pub const ADDRESS_LEN: usize = 20;

pub fn sha256(data: &[u8]) -> [u8; 32] {
    Sha256::digest(data).into()
}

/// SHA-256 truncated to the first 20 bytes.
pub fn sha256_truncated(data: &[u8]) -> [u8; ADDRESS_LEN] {
    let hash = sha256(data);
    let mut out = [0u8; ADDRESS_LEN];
    out.copy_from_slice(&hash[..ADDRESS_LEN]);
    out
}

pub fn ripemd160(data: &[u8]) -> [u8; ADDRESS_LEN] {
    Ripemd160::digest(data).into()
}

/// RIPEMD160(SHA256(data)).
pub fn hash160(data: &[u8]) -> [u8; ADDRESS_LEN] {
    ripemd160(&sha256(data))
}

pub fn keccak256(data: &[u8]) -> [u8; 32] {
    Keccak256::digest(data).into()
}
