pub mod address;
pub mod envelope;
pub mod hash;
pub mod keys;
