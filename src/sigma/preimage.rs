//! Plain preimage sigma-protocol: proves knowledge of `x` such that
//! `base^x = public` for the one-way homomorphism `f(x) = base^x` (spec
//! §4.3). This is the proof `createShare` attaches to a key share.

use rand::RngCore;

use crate::dto::SigmaProofDTO;
use crate::error::{CryptoError, Result};
use crate::group::{CryptoSettings, GroupElement, ScalarElement};
use crate::transcript::{ProverId, Transcript};

/// `(t, c, z)`: commitment `t = base^s`, challenge `c`, response
/// `z = s + c*x mod q`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PreimageProof {
    pub t: GroupElement,
    pub c: ScalarElement,
    pub z: ScalarElement,
}

/// Prove knowledge of `x` with `base^x == public`.
///
/// Challenge transcript: `H(public, t, proverId)`, matching spec §4.3 step 2
/// verbatim (`c = H(y, t, proverId)`).
pub fn prove<R: RngCore>(
    x: &ScalarElement,
    base: &GroupElement,
    public: &GroupElement,
    prover_id: &ProverId,
    settings: &CryptoSettings,
    rng: &mut R,
) -> PreimageProof {
    let s = settings.random_scalar(rng);
    let t = base.pow(&s, settings);

    let mut transcript = Transcript::new("mixnet-core/preimage/v1");
    transcript.append_encoded(&public.encode());
    transcript.append_encoded(&t.encode());
    transcript.append_prover_id(prover_id);
    let c = transcript.challenge(settings);

    let z = s.add(&c.multiply(x, settings), settings);

    PreimageProof { t, c, z }
}

/// Verify `(t, c, z)` against `base^x == public`: checks `base^z == t * public^c`
/// and that `c` matches the recomputed Fiat-Shamir challenge.
pub fn verify(
    base: &GroupElement,
    public: &GroupElement,
    proof: &PreimageProof,
    prover_id: &ProverId,
    settings: &CryptoSettings,
) -> bool {
    let mut transcript = Transcript::new("mixnet-core/preimage/v1");
    transcript.append_encoded(&public.encode());
    transcript.append_encoded(&proof.t.encode());
    transcript.append_prover_id(prover_id);
    let expected_c = transcript.challenge(settings);
    if expected_c != proof.c {
        return false;
    }

    let lhs = base.pow(&proof.z, settings);
    let rhs = proof.t.multiply(&public.pow(&proof.c, settings), settings);
    lhs == rhs
}

impl PreimageProof {
    pub fn to_dto(&self) -> SigmaProofDTO {
        SigmaProofDTO {
            commitment: self.t.encode(),
            challenge: self.c.encode(),
            response: self.z.encode(),
        }
    }

    pub fn from_dto(dto: &SigmaProofDTO) -> Result<Self> {
        Ok(Self {
            t: GroupElement::decode(&dto.commitment)?,
            c: ScalarElement::decode(&dto.challenge)
                .map_err(|_| CryptoError::EncodingFailure("preimage proof challenge".into()))?,
            z: ScalarElement::decode(&dto.response)
                .map_err(|_| CryptoError::EncodingFailure("preimage proof response".into()))?,
        })
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
        let y = g.pow(&x, &settings);
        let prover_id = ProverId::new("T1");

        let proof = prove(&x, &g, &y, &prover_id, &settings, &mut rng);
        assert!(verify(&g, &y, &proof, &prover_id, &settings));
    }

    #[test]
    fn tampered_response_is_rejected() {
        let settings = test_settings();
        let mut rng = rand::thread_rng();
        let g = settings.generator();
        let x = settings.random_scalar(&mut rng);
        let y = g.pow(&x, &settings);
        let prover_id = ProverId::new("T1");

        let mut proof = prove(&x, &g, &y, &prover_id, &settings, &mut rng);
        proof.z = proof.z.add(&ScalarElement::from_biguint_unchecked(BigUint::from(1u32)), &settings);
        assert!(!verify(&g, &y, &proof, &prover_id, &settings));
    }

    #[test]
    fn wrong_prover_id_is_rejected() {
        let settings = test_settings();
        let mut rng = rand::thread_rng();
        let g = settings.generator();
        let x = settings.random_scalar(&mut rng);
        let y = g.pow(&x, &settings);

        let proof = prove(&x, &g, &y, &ProverId::new("T1"), &settings, &mut rng);
        assert!(!verify(&g, &y, &proof, &ProverId::new("T2"), &settings));
    }
}
