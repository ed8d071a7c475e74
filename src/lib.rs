//! Cryptographic core of a verifiable re-encryption mixnet: the
//! `KeyMaker` and `Mixer` trustee roles over a prime-order subgroup of
//! `(Z/pZ)*`, `p = 2q+1`.
//!
//! The core performs no I/O, no key distribution, and no transport; it
//! computes proofs and DTOs from inputs the caller supplies and returns
//! them, or a [`error::CryptoError`] (spec §7).

pub mod dto;
pub mod elgamal;
pub mod encoding;
pub mod error;
pub mod group;
pub mod keymaker;
pub mod mixer;
pub mod permutation;
pub mod sigma;
pub mod transcript;

pub use error::{CryptoError, Result};
pub use group::{CryptoSettings, GroupElement, GroupParams, ScalarElement};
pub use transcript::ProverId;
