//! Permutation-commitment proof (spec §4.5): the offline half of the
//! Terelius-Wikström shuffle proof. Proves knowledge of `(pi, r)` opening
//! `c_i = g^{r_i} * h_{pi(i)}` without revealing `pi`.
//!
//! Construction note (see DESIGN.md, "permutation-commitment proof:
//! aggregation by per-index e-values"): both sides of the opening equation
//! are folded into one product via the per-index Fiat-Shamir values,
//! `c^e = prod_i c_i^{e_i} = g^R * prod_j h_j^{u_j}` with `R = sum_i r_i
//! e_i` and `u_j = e_{pi^-1(j)}`, and that single aggregate relation is
//! proved with one generalized Schnorr proof over the witness `(u, R)`.
//! This mirrors the teacher's `sigma_protocol.rs` aggregate-then-Schnorr
//! pattern, adapted from elliptic-curve Pedersen commitments to this
//! crate's multiplicative-group commitments.

use rand::RngCore;
use rayon::prelude::*;

use crate::dto::PermutationProofDTO;
use crate::encoding::{decode_tuple, encode_sequence, encode_tuple, CanonicalEncode};
use crate::error::{CryptoError, Result};
use crate::group::{CryptoSettings, GroupElement, ScalarElement};
use crate::permutation::{PermutationCommitment, PermutationData};
use crate::transcript::{ProverId, Transcript};

/// `(t_r, bridgingCommitments[], c, z[], z_r)`. `t_r = g^{w_R}` and
/// `bridgingCommitments[j] = h_j^{w_j}`; together they reconstruct the
/// combined first move `T = t_r * prod_j bridgingCommitments[j]`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PermutationCommitmentProof {
    pub t_r: GroupElement,
    pub bridging_commitments: Vec<GroupElement>,
    pub c: ScalarElement,
    pub z: Vec<ScalarElement>,
    pub z_r: ScalarElement,
    pub e_values: Vec<ScalarElement>,
}

fn e_values(
    commitment: &PermutationCommitment,
    generators: &[GroupElement],
    prover_id: &ProverId,
    settings: &CryptoSettings,
) -> Vec<ScalarElement> {
    let mut transcript = Transcript::new("mixnet-core/permutation-commitment/v1");
    transcript.append_encoded_many(encode_sequence(&commitment.components).iter().map(String::as_str));
    transcript.append_encoded_many(encode_sequence(generators).iter().map(String::as_str));
    transcript.append_prover_id(prover_id);
    (0..commitment.components.len())
        .map(|i| transcript.challenge_at_index(i, settings))
        .collect()
}

fn aggregate_commitment(
    commitment: &PermutationCommitment,
    e: &[ScalarElement],
    settings: &CryptoSettings,
) -> GroupElement {
    commitment
        .components
        .iter()
        .zip(e)
        .map(|(c_i, e_i)| c_i.pow(e_i, settings))
        .fold(GroupElement::from_biguint_unchecked(num_bigint::BigUint::from(1u8)), |acc, v| {
            acc.multiply(&v, settings)
        })
}

/// Prove knowledge of `(pi, r)` behind `commitment`, generated from
/// `data`, against the public generator family `generators` (spec §4.5
/// step 4).
pub fn prove<R: RngCore>(
    data: &PermutationData,
    commitment: &PermutationCommitment,
    generators: &[GroupElement],
    prover_id: &ProverId,
    settings: &CryptoSettings,
    rng: &mut R,
) -> Result<PermutationCommitmentProof> {
    let n = data.permutation.len();
    if generators.len() != n || commitment.components.len() != n || data.r.len() != n {
        return Err(CryptoError::ProofGenerationFailure {
            subproof: "permutation_commitment",
            reason: "permutation, randomness, generator, or commitment length mismatch".into(),
        });
    }

    let e = e_values(commitment, generators, prover_id, settings);

    // u_j = e_{pi^-1(j)}: the permuted e-sequence, in the index order the
    // generators are published in.
    let u: Vec<ScalarElement> = (0..n).map(|j| e[data.permutation.inverse_at(j)].clone()).collect();
    let r_sum = data
        .r
        .iter()
        .zip(&e)
        .map(|(r_i, e_i)| r_i.multiply(e_i, settings))
        .fold(ScalarElement::zero(), |acc, v| acc.add(&v, settings));

    let w: Vec<ScalarElement> = (0..n).map(|_| settings.random_scalar(rng)).collect();
    let w_r = settings.random_scalar(rng);

    let g = settings.generator();
    let t_r = g.pow(&w_r, settings);
    let bridging_commitments: Vec<GroupElement> = generators
        .par_iter()
        .zip(&w)
        .map(|(h_j, w_j)| h_j.pow(w_j, settings))
        .collect();

    let c = challenge(commitment, generators, &e, &t_r, &bridging_commitments, prover_id, settings);

    let z: Vec<ScalarElement> = u
        .iter()
        .zip(&w)
        .map(|(u_j, w_j)| w_j.add(&c.multiply(u_j, settings), settings))
        .collect();
    let z_r = w_r.add(&c.multiply(&r_sum, settings), settings);

    Ok(PermutationCommitmentProof {
        t_r,
        bridging_commitments,
        c,
        z,
        z_r,
        e_values: e,
    })
}

/// Verify a [`PermutationCommitmentProof`] against the public `commitment`
/// and generator family.
pub fn verify(
    commitment: &PermutationCommitment,
    generators: &[GroupElement],
    proof: &PermutationCommitmentProof,
    prover_id: &ProverId,
    settings: &CryptoSettings,
) -> bool {
    let n = commitment.components.len();
    if generators.len() != n
        || proof.z.len() != n
        || proof.bridging_commitments.len() != n
        || proof.e_values.len() != n
    {
        return false;
    }

    let expected_e = e_values(commitment, generators, prover_id, settings);
    if expected_e != proof.e_values {
        return false;
    }

    let expected_c = challenge(
        commitment,
        generators,
        &proof.e_values,
        &proof.t_r,
        &proof.bridging_commitments,
        prover_id,
        settings,
    );
    if expected_c != proof.c {
        return false;
    }

    let t_combined = proof
        .bridging_commitments
        .iter()
        .fold(proof.t_r.clone(), |acc, b| acc.multiply(b, settings));

    let g = settings.generator();
    let lhs = generators
        .iter()
        .zip(&proof.z)
        .map(|(h_j, z_j)| h_j.pow(z_j, settings))
        .fold(g.pow(&proof.z_r, settings), |acc, v| acc.multiply(&v, settings));

    let c_e = aggregate_commitment(commitment, &proof.e_values, settings);
    let rhs = t_combined.multiply(&c_e.pow(&proof.c, settings), settings);

    lhs == rhs
}

fn challenge(
    commitment: &PermutationCommitment,
    generators: &[GroupElement],
    e: &[ScalarElement],
    t_r: &GroupElement,
    bridging_commitments: &[GroupElement],
    prover_id: &ProverId,
    settings: &CryptoSettings,
) -> ScalarElement {
    let mut transcript = Transcript::new("mixnet-core/permutation-commitment-proof/v1");
    transcript.append_encoded_many(encode_sequence(&commitment.components).iter().map(String::as_str));
    transcript.append_encoded_many(encode_sequence(generators).iter().map(String::as_str));
    transcript.append_encoded_many(encode_sequence(e).iter().map(String::as_str));
    transcript.append_encoded(&t_r.encode());
    transcript.append_encoded_many(encode_sequence(bridging_commitments).iter().map(String::as_str));
    transcript.append_prover_id(prover_id);
    transcript.challenge(settings)
}

impl PermutationCommitmentProof {
    pub fn to_dto(&self) -> PermutationProofDTO {
        PermutationProofDTO {
            sigma: crate::dto::SigmaProofDTO {
                commitment: self.t_r.encode(),
                challenge: self.c.encode(),
                response: encode_tuple(&encode_sequence(&self.z).into_iter().chain(std::iter::once(self.z_r.encode())).collect::<Vec<_>>()),
            },
            bridging_commitments: encode_sequence(&self.bridging_commitments),
            e_values: encode_sequence(&self.e_values),
        }
    }

    pub fn from_dto(dto: &PermutationProofDTO) -> Result<Self> {
        let t_r = GroupElement::decode(&dto.sigma.commitment)?;
        let c = ScalarElement::decode(&dto.sigma.challenge)
            .map_err(|_| CryptoError::EncodingFailure("permutation proof challenge".into()))?;
        let response_parts = decode_tuple(&dto.sigma.response)?;
        if response_parts.is_empty() {
            return Err(CryptoError::EncodingFailure("permutation proof response is empty".into()));
        }
        let (z_parts, z_r_part) = response_parts.split_at(response_parts.len() - 1);
        let z = z_parts
            .iter()
            .map(|s| ScalarElement::decode(s))
            .collect::<Result<Vec<_>>>()?;
        let z_r = ScalarElement::decode(&z_r_part[0])
            .map_err(|_| CryptoError::EncodingFailure("permutation proof z_r".into()))?;
        let bridging_commitments = dto
            .bridging_commitments
            .iter()
            .map(|s| GroupElement::decode(s))
            .collect::<Result<Vec<_>>>()?;
        let e_values = dto
            .e_values
            .iter()
            .map(|s| ScalarElement::decode(s))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            t_r,
            bridging_commitments,
            c,
            z,
            z_r,
            e_values,
        })
    }
}
