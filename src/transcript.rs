//! Fiat-Shamir challenge derivation (spec §4.2).
//!
//! The non-interactive challenge for every sigma-protocol in this crate is
//! derived by hashing a transcript built from: (a) the public inputs of the
//! protocol in a fixed order, (b) the prover's commitment, and (c) the
//! `proverId`. The hash output is reduced mod `q`. `proverId` binds the
//! proof to a specific trustee identity and prevents replay across
//! trustees.
//!
//! This mirrors the teacher's `TranscriptBuilder` (ordered byte buffer,
//! domain-separated) and `BayerGrothTranscript` (per-index derivation for
//! auxiliary challenges), generalized from elliptic-curve absorption to the
//! canonical decimal-string encoding this crate's group uses.

use sha2::{Digest, Sha256};

use crate::group::{CryptoSettings, ScalarElement};

use num_bigint::BigUint;

/// A prover/trustee identity folded verbatim into every transcript this
/// prover builds. Arbitrary Unicode (BMP-scoped by convention at the
/// transport layer); no normalization is applied here -- whitespace or case
/// differences between prover and verifier are a silent soundness break,
/// by design of the spec, not a bug to paper over.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct ProverId(String);

impl ProverId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Ordered byte buffer accumulating a transcript prior to hashing.
///
/// Every `append_*` call length-prefixes its payload so that concatenating
/// two differently-split inputs can never collide
/// (`append_str("ab"); append_str("c")` hashes differently from
/// `append_str("a"); append_str("bc")`).
pub struct Transcript {
    buffer: Vec<u8>,
}

impl Transcript {
    pub fn new(domain: &'static str) -> Self {
        let mut t = Self {
            buffer: Vec::with_capacity(256),
        };
        t.append_str(domain);
        t
    }

    pub fn append_str(&mut self, s: &str) {
        self.buffer
            .extend_from_slice(&(s.len() as u64).to_be_bytes());
        self.buffer.extend_from_slice(s.as_bytes());
    }

    /// Append a canonically-encoded public input (a group element, scalar,
    /// or tuple/sequence encoding produced by [`crate::encoding`]).
    pub fn append_encoded(&mut self, encoded: &str) {
        self.append_str(encoded);
    }

    pub fn append_encoded_many<'a>(&mut self, encoded: impl IntoIterator<Item = &'a str>) {
        for e in encoded {
            self.append_encoded(e);
        }
    }

    pub fn append_prover_id(&mut self, prover_id: &ProverId) {
        self.append_str(prover_id.as_str());
    }

    fn digest(&self) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(&self.buffer);
        hasher.finalize().into()
    }

    /// Reduce the transcript's hash mod `q` to yield the scalar challenge.
    pub fn challenge(&self, settings: &CryptoSettings) -> ScalarElement {
        let digest = self.digest();
        let as_int = BigUint::from_bytes_be(&digest);
        ScalarElement::from_biguint_unchecked(as_int % settings.q())
    }

    /// A second, independent per-index generator used for the
    /// `bridgingCommitments`/`eValues` auxiliary sequences of the
    /// permutation-commitment and shuffle proofs (spec §4.5/§4.6): seeded
    /// with the same transcript state but bound per index, so every index
    /// gets its own reproducible scalar without the prover or verifier
    /// needing to maintain a second mutable sponge.
    pub fn challenge_at_index(&self, index: usize, settings: &CryptoSettings) -> ScalarElement {
        let mut hasher = Sha256::new();
        hasher.update(&self.buffer);
        hasher.update(b"/e-value/");
        hasher.update((index as u64).to_be_bytes());
        let digest = hasher.finalize();
        let as_int = BigUint::from_bytes_be(&digest);
        ScalarElement::from_biguint_unchecked(as_int % settings.q())
    }
}
