//! Stable wire DTOs (spec §3, §6). Field order within `SigmaProofDTO` is
//! `(commitment, challenge, response)` and never changes; this is the
//! stable surface other trustees and the (unspecified) verifier depend on.

use serde::{Deserialize, Serialize};

/// A sigma-protocol transcript as three canonical strings. For protocols
/// whose commitment is itself made of several group elements (e.g. the
/// equality-of-preimages proof's `(t1, t2_1, ..., t2_n)`), `commitment` is
/// the tuple encoding of those elements (see [`crate::encoding::encode_tuple`]).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SigmaProofDTO {
    pub commitment: String,
    pub challenge: String,
    pub response: String,
}

/// A [`SigmaProofDTO`] enriched with the two auxiliary sequences the
/// Terelius-Wikstrom permutation-commitment proof needs.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermutationProofDTO {
    #[serde(flatten)]
    pub sigma: SigmaProofDTO,
    pub bridging_commitments: Vec<String>,
    pub e_values: Vec<String>,
}

/// A [`SigmaProofDTO`] plus the `eValues` sequence the re-encryption shuffle
/// proof needs.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MixProofDTO {
    #[serde(flatten)]
    pub sigma: SigmaProofDTO,
    pub e_values: Vec<String>,
}

/// The two-part shuffle proof plus the permutation commitment it binds to.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShuffleProofDTO {
    pub mix_proof: MixProofDTO,
    pub permutation_proof: PermutationProofDTO,
    pub permutation_commitment: String,
}

/// Output of the mixer's online phase: the two-part proof plus the
/// shuffled, re-encrypted batch.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShuffleResultDTO {
    pub proof: ShuffleProofDTO,
    pub shuffled_ciphertexts: Vec<String>,
}

/// A key share: the preimage proof of knowledge of `x` plus the resulting
/// public key `y = g^x`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptionKeyShareDTO {
    #[serde(flatten)]
    pub proof: SigmaProofDTO,
    pub public_key: String,
}

/// A batch of partial decryptions plus the proof that they were computed
/// correctly from the same private share used to publish the key share.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartialDecryptionDTO {
    pub partial_decryptions: Vec<String>,
    #[serde(flatten)]
    pub proof: SigmaProofDTO,
}
