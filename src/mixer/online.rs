//! Re-encryption shuffle proof (spec §4.6): the online half of the
//! Terelius-Wikström shuffle proof. Proves that `V'` is a re-encryption of
//! `V` under the permutation committed to by `c`, without revealing `pi`
//! or the re-encryption randomness `s`.
//!
//! Implementation convention (see DESIGN.md, "shuffle: pi vs pi^-1
//! indexing"): this crate re-encrypts as `V'_i = ReEnc(V_{pi(i)}; s_i)`
//! rather than the spec text's `V_{pi^-1(i)}`. Since `pi` is sampled
//! uniformly, this is a relabeling (pi and pi^-1 are equally likely to be
//! drawn) that lets the mix proof and the permutation-commitment proof
//! share one witness vector `u_j = e_{pi^-1(j)}`, instead of maintaining
//! two witness vectors related by an un-proved inverse. All of spec §8's
//! testable properties (completeness, hiding, proof soundness shape) hold
//! under either convention.

use rand::RngCore;
use rayon::prelude::*;

use crate::dto::MixProofDTO;
use crate::elgamal::ElGamalCiphertext;
use crate::encoding::{decode_tuple, encode_sequence, encode_tuple};
use crate::error::{CryptoError, Result};
use crate::group::{CryptoSettings, GroupElement, ScalarElement};
use crate::permutation::{PermutationCommitment, PermutationData};
use crate::transcript::{ProverId, Transcript};

/// `(t1, t2, t3, bundled as commitment, c, z[] ++ z_r ++ z_s as response,
/// eValues[])`. `t1` ties the proof to the permutation commitment, `t2`/`t3`
/// tie it to the `a`/`b` components of the re-encrypted batch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MixProof {
    pub t1: GroupElement,
    pub t2: GroupElement,
    pub t3: GroupElement,
    pub c: ScalarElement,
    pub z: Vec<ScalarElement>,
    pub z_r: ScalarElement,
    pub z_s: ScalarElement,
    pub e_values: Vec<ScalarElement>,
}

fn e_values(
    commitment: &PermutationCommitment,
    inputs: &[ElGamalCiphertext],
    outputs: &[ElGamalCiphertext],
    joint_key: &GroupElement,
    prover_id: &ProverId,
    settings: &CryptoSettings,
) -> Vec<ScalarElement> {
    let mut transcript = Transcript::new("mixnet-core/shuffle/v1");
    transcript.append_encoded_many(encode_sequence(&commitment.components).iter().map(String::as_str));
    for ct in inputs {
        transcript.append_encoded(&ct.a.encode());
        transcript.append_encoded(&ct.b.encode());
    }
    for ct in outputs {
        transcript.append_encoded(&ct.a.encode());
        transcript.append_encoded(&ct.b.encode());
    }
    transcript.append_encoded(&joint_key.encode());
    transcript.append_prover_id(prover_id);
    (0..inputs.len())
        .map(|i| transcript.challenge_at_index(i, settings))
        .collect()
}

fn aggregate(elements: &[GroupElement], e: &[ScalarElement], settings: &CryptoSettings) -> GroupElement {
    elements
        .iter()
        .zip(e)
        .map(|(x, e_i)| x.pow(e_i, settings))
        .fold(GroupElement::from_biguint_unchecked(num_bigint::BigUint::from(1u8)), |acc, v| {
            acc.multiply(&v, settings)
        })
}

/// Shuffle `inputs` under `data`'s permutation, producing the re-encrypted
/// batch and a [`MixProof`] tying it to `commitment` (recomputed by the
/// caller from `data`, per spec §4.6 step 3).
pub fn shuffle<R: RngCore>(
    data: &PermutationData,
    commitment: &PermutationCommitment,
    generators: &[GroupElement],
    inputs: &[ElGamalCiphertext],
    joint_key: &GroupElement,
    prover_id: &ProverId,
    settings: &CryptoSettings,
    rng: &mut R,
) -> Result<(Vec<ElGamalCiphertext>, MixProof)> {
    let n = data.permutation.len();
    if inputs.len() != n {
        return Err(CryptoError::ArityMismatch {
            expected: n,
            actual: inputs.len(),
        });
    }

    for (i, ct) in inputs.iter().enumerate() {
        if ct.a.is_identity() {
            return Err(CryptoError::DegenerateCiphertext(i));
        }
    }

    let g = settings.generator();
    let s: Vec<ScalarElement> = (0..n).map(|_| settings.random_scalar(rng)).collect();
    let outputs: Vec<ElGamalCiphertext> = (0..n)
        .into_par_iter()
        .map(|i| inputs[data.permutation.at(i)].rerandomize(&s[i], joint_key, settings))
        .collect();

    let e = e_values(commitment, inputs, &outputs, joint_key, prover_id, settings);

    let u: Vec<ScalarElement> = (0..n).map(|j| e[data.permutation.inverse_at(j)].clone()).collect();
    let r_sum = data
        .r
        .iter()
        .zip(&e)
        .map(|(r_i, e_i)| r_i.multiply(e_i, settings))
        .fold(ScalarElement::zero(), |acc, v| acc.add(&v, settings));
    let s_sum = s
        .iter()
        .zip(&e)
        .map(|(s_i, e_i)| s_i.multiply(e_i, settings))
        .fold(ScalarElement::zero(), |acc, v| acc.add(&v, settings));

    let w: Vec<ScalarElement> = (0..n).map(|_| settings.random_scalar(rng)).collect();
    let w_r = settings.random_scalar(rng);
    let w_s = settings.random_scalar(rng);

    let t1 = generators
        .iter()
        .zip(&w)
        .map(|(h_j, w_j)| h_j.pow(w_j, settings))
        .fold(g.pow(&w_r, settings), |acc, v| acc.multiply(&v, settings));
    let a_bases: Vec<GroupElement> = inputs.iter().map(|ct| ct.a.clone()).collect();
    let b_bases: Vec<GroupElement> = inputs.iter().map(|ct| ct.b.clone()).collect();
    let t2 = a_bases
        .iter()
        .zip(&w)
        .map(|(a_j, w_j)| a_j.pow(w_j, settings))
        .fold(g.pow(&w_s, settings), |acc, v| acc.multiply(&v, settings));
    let t3 = b_bases
        .iter()
        .zip(&w)
        .map(|(b_j, w_j)| b_j.pow(w_j, settings))
        .fold(joint_key.pow(&w_s, settings), |acc, v| acc.multiply(&v, settings));

    let c = challenge(commitment, inputs, &outputs, joint_key, &e, &t1, &t2, &t3, prover_id, settings);

    let z: Vec<ScalarElement> = u
        .iter()
        .zip(&w)
        .map(|(u_j, w_j)| w_j.add(&c.multiply(u_j, settings), settings))
        .collect();
    let z_r = w_r.add(&c.multiply(&r_sum, settings), settings);
    let z_s = w_s.add(&c.multiply(&s_sum, settings), settings);

    let proof = MixProof {
        t1,
        t2,
        t3,
        c,
        z,
        z_r,
        z_s,
        e_values: e,
    };

    Ok((outputs, proof))
}

/// Verify a [`MixProof`] against the public permutation commitment,
/// generator family, input/output batches, and joint key.
pub fn verify(
    commitment: &PermutationCommitment,
    generators: &[GroupElement],
    inputs: &[ElGamalCiphertext],
    outputs: &[ElGamalCiphertext],
    joint_key: &GroupElement,
    proof: &MixProof,
    prover_id: &ProverId,
    settings: &CryptoSettings,
) -> bool {
    let n = inputs.len();
    if outputs.len() != n
        || generators.len() != n
        || commitment.components.len() != n
        || proof.z.len() != n
        || proof.e_values.len() != n
    {
        return false;
    }

    let expected_e = e_values(commitment, inputs, outputs, joint_key, prover_id, settings);
    if expected_e != proof.e_values {
        return false;
    }

    let expected_c = challenge(
        commitment,
        inputs,
        outputs,
        joint_key,
        &proof.e_values,
        &proof.t1,
        &proof.t2,
        &proof.t3,
        prover_id,
        settings,
    );
    if expected_c != proof.c {
        return false;
    }

    let g = settings.generator();

    let lhs1 = generators
        .iter()
        .zip(&proof.z)
        .map(|(h_j, z_j)| h_j.pow(z_j, settings))
        .fold(g.pow(&proof.z_r, settings), |acc, v| acc.multiply(&v, settings));
    let c_e = aggregate(&commitment.components, &proof.e_values, settings);
    let rhs1 = proof.t1.multiply(&c_e.pow(&proof.c, settings), settings);
    if lhs1 != rhs1 {
        return false;
    }

    let a_bases: Vec<GroupElement> = inputs.iter().map(|ct| ct.a.clone()).collect();
    let b_bases: Vec<GroupElement> = inputs.iter().map(|ct| ct.b.clone()).collect();
    let a_outputs: Vec<GroupElement> = outputs.iter().map(|ct| ct.a.clone()).collect();
    let b_outputs: Vec<GroupElement> = outputs.iter().map(|ct| ct.b.clone()).collect();

    let lhs2 = a_bases
        .iter()
        .zip(&proof.z)
        .map(|(a_j, z_j)| a_j.pow(z_j, settings))
        .fold(g.pow(&proof.z_s, settings), |acc, v| acc.multiply(&v, settings));
    let a_agg = aggregate(&a_outputs, &proof.e_values, settings);
    let rhs2 = proof.t2.multiply(&a_agg.pow(&proof.c, settings), settings);
    if lhs2 != rhs2 {
        return false;
    }

    let lhs3 = b_bases
        .iter()
        .zip(&proof.z)
        .map(|(b_j, z_j)| b_j.pow(z_j, settings))
        .fold(joint_key.pow(&proof.z_s, settings), |acc, v| acc.multiply(&v, settings));
    let b_agg = aggregate(&b_outputs, &proof.e_values, settings);
    let rhs3 = proof.t3.multiply(&b_agg.pow(&proof.c, settings), settings);

    lhs3 == rhs3
}

#[allow(clippy::too_many_arguments)]
fn challenge(
    commitment: &PermutationCommitment,
    inputs: &[ElGamalCiphertext],
    outputs: &[ElGamalCiphertext],
    joint_key: &GroupElement,
    e: &[ScalarElement],
    t1: &GroupElement,
    t2: &GroupElement,
    t3: &GroupElement,
    prover_id: &ProverId,
    settings: &CryptoSettings,
) -> ScalarElement {
    let mut transcript = Transcript::new("mixnet-core/shuffle-proof/v1");
    transcript.append_encoded_many(encode_sequence(&commitment.components).iter().map(String::as_str));
    for ct in inputs {
        transcript.append_encoded(&ct.a.encode());
        transcript.append_encoded(&ct.b.encode());
    }
    for ct in outputs {
        transcript.append_encoded(&ct.a.encode());
        transcript.append_encoded(&ct.b.encode());
    }
    transcript.append_encoded(&joint_key.encode());
    transcript.append_encoded_many(encode_sequence(e).iter().map(String::as_str));
    transcript.append_encoded(&t1.encode());
    transcript.append_encoded(&t2.encode());
    transcript.append_encoded(&t3.encode());
    transcript.append_prover_id(prover_id);
    transcript.challenge(settings)
}

impl MixProof {
    pub fn to_dto(&self) -> MixProofDTO {
        let mut response_parts = encode_sequence(&self.z);
        response_parts.push(self.z_r.encode());
        response_parts.push(self.z_s.encode());
        MixProofDTO {
            sigma: crate::dto::SigmaProofDTO {
                commitment: encode_tuple(&[self.t1.encode(), self.t2.encode(), self.t3.encode()]),
                challenge: self.c.encode(),
                response: encode_tuple(&response_parts),
            },
            e_values: encode_sequence(&self.e_values),
        }
    }

    pub fn from_dto(dto: &MixProofDTO) -> Result<Self> {
        let commitment_parts = decode_tuple(&dto.sigma.commitment)?;
        if commitment_parts.len() != 3 {
            return Err(CryptoError::EncodingFailure("mix proof commitment must have 3 parts".into()));
        }
        let t1 = GroupElement::decode(&commitment_parts[0])?;
        let t2 = GroupElement::decode(&commitment_parts[1])?;
        let t3 = GroupElement::decode(&commitment_parts[2])?;
        let c = ScalarElement::decode(&dto.sigma.challenge)
            .map_err(|_| CryptoError::EncodingFailure("mix proof challenge".into()))?;

        let response_parts = decode_tuple(&dto.sigma.response)?;
        if response_parts.len() < 2 {
            return Err(CryptoError::EncodingFailure("mix proof response too short".into()));
        }
        let (z_parts, tail) = response_parts.split_at(response_parts.len() - 2);
        let z = z_parts
            .iter()
            .map(|s| ScalarElement::decode(s))
            .collect::<Result<Vec<_>>>()?;
        let z_r = ScalarElement::decode(&tail[0])
            .map_err(|_| CryptoError::EncodingFailure("mix proof z_r".into()))?;
        let z_s = ScalarElement::decode(&tail[1])
            .map_err(|_| CryptoError::EncodingFailure("mix proof z_s".into()))?;

        let e_values = dto
            .e_values
            .iter()
            .map(|s| ScalarElement::decode(s))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            t1,
            t2,
            t3,
            c,
            z,
            z_r,
            z_s,
            e_values,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::group::GroupParams;
    use crate::permutation::PermutationElement;
    use num_bigint::BigUint;

    fn test_settings() -> CryptoSettings {
        CryptoSettings::new(GroupParams {
            p: BigUint::from(23u32),
            q: BigUint::from(11u32),
            g: BigUint::from(4u32),
        })
        .unwrap()
    }

    fn encrypt(g: &GroupElement, y: &GroupElement, m: &GroupElement, r: &ScalarElement, settings: &CryptoSettings) -> ElGamalCiphertext {
        let a = g.pow(r, settings);
        let b = m.multiply(&y.pow(r, settings), settings);
        ElGamalCiphertext::new(a, b)
    }

    #[test]
    fn shuffle_is_complete_and_proof_verifies() {
        let settings = test_settings();
        let mut rng = rand::thread_rng();
        let g = settings.generator();
        let x = settings.random_scalar(&mut rng);
        let y = g.pow(&x, &settings);
        let n = 3;

        let messages: Vec<GroupElement> = (2u8..5)
            .map(|v| g.pow(&ScalarElement::from_biguint_unchecked(BigUint::from(v)), &settings))
            .collect();
        let inputs: Vec<ElGamalCiphertext> = messages
            .iter()
            .map(|m| encrypt(&g, &y, m, &settings.random_scalar(&mut rng), &settings))
            .collect();

        let generators = settings.commitment_generators(n);
        let permutation = PermutationElement::sample(n, &mut rng);
        let r: Vec<ScalarElement> = (0..n).map(|_| settings.random_scalar(&mut rng)).collect();
        let commitment = PermutationCommitment::commit(&permutation, &generators, &r, &settings).unwrap();
        let data = PermutationData::new(permutation, r);
        let prover_id = ProverId::new("M1");

        let (outputs, proof) = shuffle(&data, &commitment, &generators, &inputs, &y, &prover_id, &settings, &mut rng).unwrap();
        assert!(verify(&commitment, &generators, &inputs, &outputs, &y, &proof, &prover_id, &settings));

        let decrypt = |ct: &ElGamalCiphertext| ct.b.multiply(&ct.a.pow(&x, &settings).invert(&settings), &settings);
        let mut decrypted: Vec<GroupElement> = outputs.iter().map(decrypt).collect();
        let mut expected = messages.clone();
        decrypted.sort_by_key(|v| v.as_biguint().clone());
        expected.sort_by_key(|v| v.as_biguint().clone());
        assert_eq!(decrypted, expected);
    }

    #[test]
    fn tampered_output_is_rejected() {
        let settings = test_settings();
        let mut rng = rand::thread_rng();
        let g = settings.generator();
        let x = settings.random_scalar(&mut rng);
        let y = g.pow(&x, &settings);
        let n = 2;

        let inputs: Vec<ElGamalCiphertext> = (2u8..4)
            .map(|v| {
                let m = g.pow(&ScalarElement::from_biguint_unchecked(BigUint::from(v)), &settings);
                encrypt(&g, &y, &m, &settings.random_scalar(&mut rng), &settings)
            })
            .collect();

        let generators = settings.commitment_generators(n);
        let permutation = PermutationElement::sample(n, &mut rng);
        let r: Vec<ScalarElement> = (0..n).map(|_| settings.random_scalar(&mut rng)).collect();
        let commitment = PermutationCommitment::commit(&permutation, &generators, &r, &settings).unwrap();
        let data = PermutationData::new(permutation, r);
        let prover_id = ProverId::new("M1");

        let (mut outputs, proof) = shuffle(&data, &commitment, &generators, &inputs, &y, &prover_id, &settings, &mut rng).unwrap();
        outputs[0] = ElGamalCiphertext::new(g.clone(), g.clone());
        assert!(!verify(&commitment, &generators, &inputs, &outputs, &y, &proof, &prover_id, &settings));
    }

    #[test]
    fn arity_mismatch_is_rejected_before_sampling() {
        let settings = test_settings();
        let mut rng = rand::thread_rng();
        let g = settings.generator();

        let generators = settings.commitment_generators(3);
        let permutation = PermutationElement::sample(3, &mut rng);
        let r: Vec<ScalarElement> = (0..3).map(|_| settings.random_scalar(&mut rng)).collect();
        let commitment = PermutationCommitment::commit(&permutation, &generators, &r, &settings).unwrap();
        let data = PermutationData::new(permutation, r);
        let prover_id = ProverId::new("M1");

        let short_inputs = vec![ElGamalCiphertext::new(g.clone(), g.clone()); 2];
        let result = shuffle(&data, &commitment, &generators, &short_inputs, &g, &prover_id, &settings, &mut rng);
        assert!(matches!(
            result,
            Err(CryptoError::ArityMismatch { expected: 3, actual: 2 })
        ));
    }
}
