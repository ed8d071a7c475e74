//! Mixer trustee role (spec §4.5-§4.7): a two-phase verifiable
//! re-encryption shuffle. The offline phase commits to a permutation; the
//! online phase consumes that commitment to re-encrypt and shuffle a
//! ciphertext batch.
//!
//! The state machine of spec §4.7 (`PermutationPrepared -> Shuffled`) is
//! expressed as ownership rather than a runtime-checked enum:
//! [`PreparedMixer`] is produced by [`pre_shuffle`] and consumed by
//! [`PreparedMixer::shuffle`], so the type system -- not a runtime check --
//! makes "shuffle called twice on the same preparation" unrepresentable.

pub mod offline;
pub mod online;

use rand::RngCore;

use crate::dto::{ShuffleProofDTO, ShuffleResultDTO};
use crate::elgamal::ElGamalCiphertext;
use crate::encoding::encode_sequence;
use crate::error::Result;
use crate::group::{CryptoSettings, GroupElement};
use crate::permutation::{PermutationCommitment, PermutationData, PermutationElement};
use crate::transcript::ProverId;

/// The result of the offline phase: a committed-to permutation awaiting a
/// matching-arity ciphertext batch, plus the DTO already safe to publish.
pub struct PreparedMixer {
    data: PermutationData,
    commitment: PermutationCommitment,
    generators: Vec<GroupElement>,
    permutation_proof: offline::PermutationCommitmentProof,
}

impl PreparedMixer {
    pub fn arity(&self) -> usize {
        self.data.permutation.len()
    }

    pub fn permutation_proof_dto(&self) -> crate::dto::PermutationProofDTO {
        self.permutation_proof.to_dto()
    }

    pub fn commitment_encoding(&self) -> Vec<String> {
        encode_sequence(&self.commitment.components)
    }

    /// Consume the prepared permutation to re-encrypt and shuffle
    /// `ciphertexts` (spec §4.6), producing the full [`ShuffleResultDTO`].
    pub fn shuffle<R: RngCore>(
        self,
        ciphertexts: &[ElGamalCiphertext],
        joint_key: &GroupElement,
        prover_id: &ProverId,
        settings: &CryptoSettings,
        rng: &mut R,
    ) -> Result<ShuffleResultDTO> {
        if ciphertexts.len() != self.arity() {
            tracing::warn!(
                target: "mixer",
                expected = self.arity(),
                actual = ciphertexts.len(),
                "rejecting shuffle with mismatched arity"
            );
            return Err(crate::error::CryptoError::ArityMismatch {
                expected: self.arity(),
                actual: ciphertexts.len(),
            });
        }

        let (shuffled, mix_proof) = online::shuffle(
            &self.data,
            &self.commitment,
            &self.generators,
            ciphertexts,
            joint_key,
            prover_id,
            settings,
            rng,
        )?;
        tracing::debug!(target: "mixer", prover = prover_id.as_str(), n = shuffled.len(), "shuffle complete");

        let proof = ShuffleProofDTO {
            mix_proof: mix_proof.to_dto(),
            permutation_proof: self.permutation_proof.to_dto(),
            permutation_commitment: crate::encoding::encode_tuple(&self.commitment_encoding()),
        };

        Ok(ShuffleResultDTO {
            proof,
            shuffled_ciphertexts: encode_sequence(&shuffled),
        })
    }
}

/// Run the offline phase (spec §4.5): sample a permutation of `n`,
/// commit to it, and prove knowledge of the opening.
pub fn pre_shuffle<R: RngCore>(
    n: usize,
    prover_id: &ProverId,
    settings: &CryptoSettings,
    rng: &mut R,
) -> Result<PreparedMixer> {
    let generators = settings.commitment_generators(n);
    let permutation = PermutationElement::sample(n, rng);
    let r: Vec<_> = (0..n).map(|_| settings.random_scalar(rng)).collect();
    let commitment = PermutationCommitment::commit(&permutation, &generators, &r, settings)?;
    let data = PermutationData::new(permutation, r);

    let permutation_proof = offline::prove(&data, &commitment, &generators, prover_id, settings, rng)?;
    tracing::debug!(target: "mixer", prover = prover_id.as_str(), n, "prepared permutation commitment");

    Ok(PreparedMixer {
        data,
        commitment,
        generators,
        permutation_proof,
    })
}

/// The combined one-shot variant (spec §4.6 final paragraph): run the
/// offline and online phases back-to-back, generating the permutation
/// proof and the re-encryption + mix proof concurrently since they depend
/// only on public inputs after the commitment is formed.
pub fn shuffle_one_shot<R: RngCore + Send>(
    ciphertexts: &[ElGamalCiphertext],
    joint_key: &GroupElement,
    prover_id: &ProverId,
    settings: &CryptoSettings,
    rng: &mut R,
) -> Result<ShuffleResultDTO> {
    let n = ciphertexts.len();
    let generators = settings.commitment_generators(n);
    let permutation = PermutationElement::sample(n, rng);
    let r: Vec<_> = (0..n).map(|_| settings.random_scalar(rng)).collect();
    let commitment = PermutationCommitment::commit(&permutation, &generators, &r, settings)?;
    let data = PermutationData::new(permutation, r);

    // The permutation proof and the re-encryption+mix proof each need
    // their own RNG draws; `rayon::join` runs them on separate workers, so
    // each gets an independent thread-local RNG rather than sharing one
    // mutable source across threads (spec §5: "thread-local cryptographically
    // secure sources").
    let (permutation_proof, shuffle_result) = rayon::join(
        || {
            let mut local_rng = rand::thread_rng();
            offline::prove(&data, &commitment, &generators, prover_id, settings, &mut local_rng)
        },
        || {
            let mut local_rng = rand::thread_rng();
            online::shuffle(
                &data,
                &commitment,
                &generators,
                ciphertexts,
                joint_key,
                prover_id,
                settings,
                &mut local_rng,
            )
        },
    );

    let permutation_proof = permutation_proof?;
    let (shuffled, mix_proof) = shuffle_result?;

    let proof = ShuffleProofDTO {
        mix_proof: mix_proof.to_dto(),
        permutation_proof: permutation_proof.to_dto(),
        permutation_commitment: crate::encoding::encode_tuple(&encode_sequence(&commitment.components)),
    };

    Ok(ShuffleResultDTO {
        proof,
        shuffled_ciphertexts: encode_sequence(&shuffled),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::group::{GroupParams, ScalarElement};
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
    fn prepared_mixer_shuffle_produces_verifiable_dto() {
        let settings = test_settings();
        let mut rng = rand::thread_rng();
        let g = settings.generator();
        let x = settings.random_scalar(&mut rng);
        let y = g.pow(&x, &settings);
        let prover_id = ProverId::new("M1");

        let ciphertexts: Vec<ElGamalCiphertext> = (2u8..5)
            .map(|v| {
                let m = g.pow(&ScalarElement::from_biguint_unchecked(BigUint::from(v)), &settings);
                let r = settings.random_scalar(&mut rng);
                ElGamalCiphertext::new(g.pow(&r, &settings), m.multiply(&y.pow(&r, &settings), &settings))
            })
            .collect();

        let prepared = pre_shuffle(3, &prover_id, &settings, &mut rng).unwrap();
        let result = prepared.shuffle(&ciphertexts, &y, &prover_id, &settings, &mut rng).unwrap();
        assert_eq!(result.shuffled_ciphertexts.len(), 3);
    }

    #[test]
    fn arity_mismatch_is_rejected_before_shuffling() {
        let settings = test_settings();
        let mut rng = rand::thread_rng();
        let g = settings.generator();
        let prover_id = ProverId::new("M1");

        let prepared = pre_shuffle(5, &prover_id, &settings, &mut rng).unwrap();
        let short_batch = vec![ElGamalCiphertext::new(g.clone(), g.clone()); 4];
        let result = prepared.shuffle(&short_batch, &g, &prover_id, &settings, &mut rng);
        assert!(matches!(
            result,
            Err(crate::error::CryptoError::ArityMismatch { expected: 5, actual: 4 })
        ));
    }
}
