//! Equality-of-preimages sigma-protocol (spec §4.4): proves that a single
//! witness `x` is simultaneously the preimage of `public` under `f1(x) = g^x`
//! and, pointwise, the preimage of each `outputs[i]` under
//! `f2(x)_i = bases[i]^x`.
//!
//! This is the KeyMaker's partial-decryption proof: `g` and `public` are the
//! guardian's generator/effective public key, `bases` are the ciphertexts'
//! `a`-components, and `outputs` are the corresponding pre-inversion
//! partial-decryption values (see `crate::keymaker` for how the published
//! `d_i` relates to these in the non-threshold case).

use rand::RngCore;

use crate::dto::SigmaProofDTO;
use crate::encoding::{decode_tuple, encode_sequence, encode_tuple};
use crate::error::{CryptoError, Result};
use crate::group::{CryptoSettings, GroupElement, ScalarElement};
use crate::transcript::{ProverId, Transcript};

/// `(t1, t2[], c, z)`: one commitment per homomorphism, one shared
/// challenge and response (both `f1` and `f2` use the same witness `x`).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EqualityProof {
    pub t1: GroupElement,
    pub t2: Vec<GroupElement>,
    pub c: ScalarElement,
    pub z: ScalarElement,
}

/// Prove that the same `x` satisfies `g^x == public` and, for every `i`,
/// `bases[i]^x == outputs[i]`.
///
/// `bases.len()` must equal `outputs.len()`; callers (see
/// [`crate::keymaker::partial_decrypt`]) are responsible for rejecting
/// degenerate `bases[i] == 1` before calling this, per spec §4.4.
pub fn prove<R: RngCore>(
    x: &ScalarElement,
    g: &GroupElement,
    public: &GroupElement,
    bases: &[GroupElement],
    outputs: &[GroupElement],
    prover_id: &ProverId,
    settings: &CryptoSettings,
    rng: &mut R,
) -> Result<EqualityProof> {
    if bases.len() != outputs.len() {
        return Err(CryptoError::ProofGenerationFailure {
            subproof: "equality_of_preimages",
            reason: "bases and outputs length mismatch".into(),
        });
    }

    let s = settings.random_scalar(rng);
    let t1 = g.pow(&s, settings);
    let t2: Vec<GroupElement> = bases.iter().map(|a| a.pow(&s, settings)).collect();

    let c = challenge(public, outputs, &t1, &t2, prover_id, settings);
    let z = s.add(&c.multiply(x, settings), settings);

    Ok(EqualityProof { t1, t2, c, z })
}

/// Verify `(t1, t2, c, z)` against `g^x == public` and `bases[i]^x == outputs[i]`.
pub fn verify(
    g: &GroupElement,
    public: &GroupElement,
    bases: &[GroupElement],
    outputs: &[GroupElement],
    proof: &EqualityProof,
    prover_id: &ProverId,
    settings: &CryptoSettings,
) -> bool {
    if bases.len() != outputs.len() || bases.len() != proof.t2.len() {
        return false;
    }

    let expected_c = challenge(public, outputs, &proof.t1, &proof.t2, prover_id, settings);
    if expected_c != proof.c {
        return false;
    }

    let lhs1 = g.pow(&proof.z, settings);
    let rhs1 = proof.t1.multiply(&public.pow(&proof.c, settings), settings);
    if lhs1 != rhs1 {
        return false;
    }

    for i in 0..bases.len() {
        let lhs2 = bases[i].pow(&proof.z, settings);
        let rhs2 = proof.t2[i].multiply(&outputs[i].pow(&proof.c, settings), settings);
        if lhs2 != rhs2 {
            return false;
        }
    }
    true
}

fn challenge(
    public: &GroupElement,
    outputs: &[GroupElement],
    t1: &GroupElement,
    t2: &[GroupElement],
    prover_id: &ProverId,
    settings: &CryptoSettings,
) -> ScalarElement {
    let mut transcript = Transcript::new("mixnet-core/equality-of-preimages/v1");
    transcript.append_encoded(&public.encode());
    for d in encode_sequence(outputs) {
        transcript.append_encoded(&d);
    }
    transcript.append_encoded(&t1.encode());
    for t in encode_sequence(t2) {
        transcript.append_encoded(&t);
    }
    transcript.append_prover_id(prover_id);
    transcript.challenge(settings)
}

impl EqualityProof {
    /// `commitment` is the tuple encoding `(t1,(t2_1,...,t2_n))` so that an
    /// equality-of-preimages proof still fits the three-field
    /// `SigmaProofDTO` shape (spec §3).
    pub fn to_dto(&self) -> SigmaProofDTO {
        let t2_tuple = encode_tuple(&encode_sequence(&self.t2));
        SigmaProofDTO {
            commitment: encode_tuple(&[self.t1.encode(), t2_tuple]),
            challenge: self.c.encode(),
            response: self.z.encode(),
        }
    }

    pub fn from_dto(dto: &SigmaProofDTO) -> Result<Self> {
        let parts = decode_tuple(&dto.commitment)?;
        if parts.len() != 2 {
            return Err(CryptoError::EncodingFailure(
                "equality proof commitment must have 2 parts".into(),
            ));
        }
        let t1 = GroupElement::decode(&parts[0])?;
        let t2 = decode_tuple(&parts[1])?
            .iter()
            .map(|s| GroupElement::decode(s))
            .collect::<Result<Vec<_>>>()?;
        let c = ScalarElement::decode(&dto.challenge)
            .map_err(|_| CryptoError::EncodingFailure("equality proof challenge".into()))?;
        let z = ScalarElement::decode(&dto.response)
            .map_err(|_| CryptoError::EncodingFailure("equality proof response".into()))?;
        Ok(Self { t1, t2, c, z })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::group::GroupParams;
    use num_bigint::BigUint;

    fn test_settings() -> CryptoSettings {
        CryptoSettings::new(GroupParams {
            p: BigUint::from(23u32),
            q: BigUint::from(11u32),
            g: BigUint::from(4u32),
        })
        .unwrap()
    }

    #[test]
    fn honest_proof_verifies() {
        let settings = test_settings();
        let mut rng = rand::thread_rng();
        let g = settings.generator();
        let x = settings.random_scalar(&mut rng);
        let public = g.pow(&x, &settings);

        let bases: Vec<GroupElement> = (2u8..5)
            .map(|v| g.pow(&ScalarElement::from_biguint_unchecked(BigUint::from(v)), &settings))
            .collect();
        let outputs: Vec<GroupElement> = bases.iter().map(|a| a.pow(&x, &settings)).collect();

        let prover_id = ProverId::new("T1");
        let proof = prove(&x, &g, &public, &bases, &outputs, &prover_id, &settings, &mut rng).unwrap();
        assert!(verify(&g, &public, &bases, &outputs, &proof, &prover_id, &settings));
    }

    #[test]
    fn tampered_output_is_rejected() {
        let settings = test_settings();
        let mut rng = rand::thread_rng();
        let g = settings.generator();
        let x = settings.random_scalar(&mut rng);
        let public = g.pow(&x, &settings);
        let a = g.pow(&ScalarElement::from_biguint_unchecked(BigUint::from(3u8)), &settings);
        let bases = vec![a.clone()];
        let outputs = vec![a.pow(&x, &settings)];

        let prover_id = ProverId::new("T1");
        let proof = prove(&x, &g, &public, &bases, &outputs, &prover_id, &settings, &mut rng).unwrap();

        let mut bad_outputs = outputs.clone();
        bad_outputs[0] = g.clone();
        assert!(!verify(&g, &public, &bases, &bad_outputs, &proof, &prover_id, &settings));
    }
}
