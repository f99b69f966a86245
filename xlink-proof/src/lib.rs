pub mod classify;
pub mod validation;
pub mod verifier;

pub use classify::{classify_value_type, frame, retag_proof, SignDocCodecs};
pub use validation::{validate_chain_link, validate_signed_value};
pub use verifier::ProofVerifier;
