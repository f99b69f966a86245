//! Shared type definitions for xlink chain links: addresses, signatures,
//! proofs, persisted records, key layouts and the codec boundary.

pub mod account;
pub mod address;
pub mod app_link;
pub mod codec;
pub mod error;
pub mod keys;
pub mod legacy;
pub mod link;
pub mod primitives;
pub mod sign_doc;
pub mod signature;
