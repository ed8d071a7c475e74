//! Crate-wide error type for the mixnet cryptographic core.

use thiserror::Error;

/// All fatal conditions the core can raise. There are no retries: every
/// error is reported at the boundary and no partial DTO is ever emitted.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// `g^q != 1`, `p` is not a safe prime, or a supplied generator is `1`.
    /// Fatal at configuration time.
    #[error("invalid group parameters: {0}")]
    InvalidGroupParameters(String),

    /// The online shuffle's ciphertext count differs from the offline `N`.
    /// Rejected before any randomness is sampled.
    #[error("arity mismatch: prepared for {expected} ciphertexts, got {actual}")]
    ArityMismatch { expected: usize, actual: usize },

    /// A ciphertext's `a` component encodes to the group identity.
    #[error("degenerate ciphertext at index {0}: a-component is the group identity")]
    DegenerateCiphertext(usize),

    /// The underlying sigma-protocol generator reports an inconsistency,
    /// e.g. a witness outside its expected domain.
    #[error("proof generation failed in {subproof}: {reason}")]
    ProofGenerationFailure {
        subproof: &'static str,
        reason: String,
    },

    /// A produced element could not be encoded, or failed to decode back to
    /// the value that produced it. Indicates a library bug.
    #[error("encoding round-trip failed for {0}")]
    EncodingFailure(String),
}

pub type Result<T> = std::result::Result<T, CryptoError>;
