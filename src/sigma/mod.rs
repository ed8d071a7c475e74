//! Sigma-protocol building blocks, made non-interactive via the
//! Fiat-Shamir transform in [`crate::transcript`].

pub mod equality;
pub mod preimage;
