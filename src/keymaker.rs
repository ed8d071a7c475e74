//! KeyMaker trustee role (spec §4.3, §4.4): produces a share of a
//! distributed ElGamal public key with a proof of knowledge of the private
//! share, and later partially decrypts a batch of ciphertexts with a proof
//! of correct decryption.
//!
//! KeyMaker is stateless per call (spec §4.7): every method here takes all
//! the state it needs as arguments and returns a fresh result, with no
//! process-wide mutable state.

use rand::RngCore;
use rayon::prelude::*;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::dto::{EncryptionKeyShareDTO, PartialDecryptionDTO};
use crate::elgamal::ElGamalCiphertext;
use crate::encoding::encode_sequence;
use crate::error::{CryptoError, Result};
use crate::group::{CryptoSettings, GroupElement, ScalarElement};
use crate::sigma::{equality, preimage};
use crate::transcript::ProverId;

/// The private half of a key share. Caller-owned: must outlive the
/// key-generation call (it is the input to `partial_decrypt`) but is
/// zeroized on drop, satisfying "private shares ... must be zeroed on
/// destruction if the host platform supports it" (spec §3).
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct PrivateKeyShare {
    x: ScalarElement,
}

impl PrivateKeyShare {
    pub fn expose_scalar(&self) -> &ScalarElement {
        &self.x
    }
}

/// Whether a partial decryption is combined by straight multiplication
/// (no externally-supplied verification key) or is one of `k` threshold
/// shares reconstructed via Lagrange interpolation elsewhere (verification
/// key supplied). The branch is intrinsic to the protocol and is exposed
/// as an explicit mode rather than inferred from an `Option` at the call
/// site losing its significance (see DESIGN.md, "Threshold branch").
#[derive(Clone, Debug)]
pub enum DecryptionMode {
    /// Two-trustee / symmetric case: no externally supplied verification
    /// key. The effective public key proven about is `g^x`.
    Direct,
    /// Threshold case: `vk` is this guardian's externally supplied
    /// verification key; inversion of the combined share is deferred to
    /// reconstruction.
    Threshold { verification_key: GroupElement },
}

/// Sample a fresh private share `x` and publish `y = g^x` with a proof of
/// knowledge of `x` (spec §4.3).
pub fn create_share<R: RngCore>(
    prover_id: &ProverId,
    settings: &CryptoSettings,
    rng: &mut R,
) -> (PrivateKeyShare, EncryptionKeyShareDTO) {
    let x = settings.random_scalar(rng);
    let g = settings.generator();
    let y = g.pow(&x, settings);

    let proof = preimage::prove(&x, &g, &y, prover_id, settings, rng);
    tracing::debug!(target: "keymaker", prover = prover_id.as_str(), "created key share");

    let dto = EncryptionKeyShareDTO {
        proof: proof.to_dto(),
        public_key: y.encode(),
    };
    (PrivateKeyShare { x }, dto)
}

/// Partially decrypt a batch of ciphertexts under `share`, with a proof
/// that the same private scalar produced both the published public key and
/// every partial decryption (spec §4.4).
///
/// Rejects (spec §4.4, upgraded per DESIGN.md from the source's
/// log-and-continue behavior to a hard failure) any ciphertext whose `a`
/// component encodes to the group identity, since `a = 1` would yield
/// `d = 1` regardless of the key and trivially pass the proof.
pub fn partial_decrypt<R: RngCore>(
    ciphertexts: &[ElGamalCiphertext],
    share: &PrivateKeyShare,
    mode: &DecryptionMode,
    prover_id: &ProverId,
    settings: &CryptoSettings,
    rng: &mut R,
) -> Result<PartialDecryptionDTO> {
    for (i, ct) in ciphertexts.iter().enumerate() {
        if ct.a.is_identity() {
            tracing::warn!(target: "keymaker", index = i, "rejecting degenerate ciphertext");
            return Err(CryptoError::DegenerateCiphertext(i));
        }
    }
    tracing::debug!(target: "keymaker", prover = prover_id.as_str(), batch = ciphertexts.len(), "partially decrypting batch");

    let g = settings.generator();
    let x = &share.x;

    // The equality-of-preimages proof always certifies the *same* exponent
    // `x` against both `g` (producing `y_eff`) and every `a_i` (producing
    // the pre-inversion value `e_i = a_i^x`). In the non-threshold case the
    // published `d_i` is the group inverse of `e_i` -- see DESIGN.md
    // ("partialDecrypt: resolving the x^-1 wording") for why this, rather
    // than literally exponentiating by the modular inverse of `x`, is the
    // reading that keeps a single shared witness and matches the
    // "reconstruction multiplies partial decryptions directly" rationale.
    let y_eff = match mode {
        DecryptionMode::Direct => g.pow(x, settings),
        DecryptionMode::Threshold { verification_key } => verification_key.clone(),
    };

    let bases: Vec<GroupElement> = ciphertexts.iter().map(|ct| ct.a.clone()).collect();
    let pre_inversion: Vec<GroupElement> = bases
        .par_iter()
        .map(|a| a.pow(x, settings))
        .collect();

    let published: Vec<GroupElement> = match mode {
        DecryptionMode::Direct => pre_inversion
            .par_iter()
            .map(|e| e.invert(settings))
            .collect(),
        DecryptionMode::Threshold { .. } => pre_inversion.clone(),
    };

    let proof = equality::prove(
        x,
        &g,
        &y_eff,
        &bases,
        &pre_inversion,
        prover_id,
        settings,
        rng,
    )?;

    Ok(PartialDecryptionDTO {
        partial_decryptions: encode_sequence(&published),
        proof: proof.to_dto(),
    })
}

/// Verify a single [`PartialDecryptionDTO`] against the ciphertext batch it
/// claims to decrypt and the guardian's effective public key.
///
/// Testing/interop aid, not a verifier service (spec §1 keeps verification
/// out of scope) -- provided because the `equality` sigma-protocol module
/// this crate already depends on for `partial_decrypt` trivially supports
/// it, the way the teacher ships `prove`/`verify` side by side for every
/// sigma protocol it defines.
pub fn verify_partial_decryption(
    ciphertexts: &[ElGamalCiphertext],
    dto: &PartialDecryptionDTO,
    mode: &DecryptionMode,
    y_eff: &GroupElement,
    prover_id: &ProverId,
    settings: &CryptoSettings,
) -> Result<bool> {
    if dto.partial_decryptions.len() != ciphertexts.len() {
        return Err(CryptoError::ArityMismatch {
            expected: ciphertexts.len(),
            actual: dto.partial_decryptions.len(),
        });
    }
    let bases: Vec<GroupElement> = ciphertexts.iter().map(|ct| ct.a.clone()).collect();
    let published: Vec<GroupElement> = dto
        .partial_decryptions
        .iter()
        .map(|s| GroupElement::decode(s))
        .collect::<Result<Vec<_>>>()?;
    let outputs: Vec<GroupElement> = match mode {
        DecryptionMode::Direct => published.iter().map(|d| d.invert(settings)).collect(),
        DecryptionMode::Threshold { .. } => published,
    };
    let proof = equality::EqualityProof::from_dto(&dto.proof)?;
    Ok(equality::verify(&settings.generator(), y_eff, &bases, &outputs, &proof, prover_id, settings))
}

/// Batch-verify several [`PartialDecryptionDTO`]s produced against the
/// *same* ciphertext batch (e.g. one per trustee in a threshold
/// reconstruction). Each entry's Fiat-Shamir challenge is still checked
/// individually (a forged `(t, c, z)` must be caught before it can poison
/// the batch); the per-ciphertext multi-exponentiation is then amortized
/// across the whole batch with a random linear combination, the way the
/// teacher's `batch_verify_chaum_pedersen` amortizes many independent
/// Chaum-Pedersen checks into one multi-exponentiation. Rejects (returns
/// `Ok(false)`) unless every entry verifies; `rng` supplies the random
/// combiners and must not be under adversarial influence.
pub fn verify_partial_decryption_batch<R: RngCore>(
    ciphertexts: &[ElGamalCiphertext],
    entries: &[(GroupElement, PartialDecryptionDTO, ProverId)],
    mode: &DecryptionMode,
    settings: &CryptoSettings,
    rng: &mut R,
) -> Result<bool> {
    let n = ciphertexts.len();
    let bases: Vec<GroupElement> = ciphertexts.iter().map(|ct| ct.a.clone()).collect();

    // Fold the N per-ciphertext bases into one with a shared random
    // combiner: the same combiner works for every entry since they all
    // decrypt the same batch.
    let kappa: Vec<ScalarElement> = (0..n).map(|_| settings.random_scalar(rng)).collect();
    let combined_base = bases
        .iter()
        .zip(&kappa)
        .map(|(b, k)| b.pow(k, settings))
        .fold(GroupElement::from_biguint_unchecked(num_bigint::BigUint::from(1u8)), |acc, v| {
            acc.multiply(&v, settings)
        });

    let g = settings.generator();
    let tau = settings.random_scalar(rng);
    let combined_g = g.multiply(&combined_base.pow(&tau, settings), settings);

    let mut lhs_exponent = ScalarElement::zero();
    let mut rhs = GroupElement::from_biguint_unchecked(num_bigint::BigUint::from(1u8));

    for (y_eff, dto, prover_id) in entries {
        if dto.partial_decryptions.len() != n {
            return Err(CryptoError::ArityMismatch {
                expected: n,
                actual: dto.partial_decryptions.len(),
            });
        }
        let published: Vec<GroupElement> = dto
            .partial_decryptions
            .iter()
            .map(|s| GroupElement::decode(s))
            .collect::<Result<Vec<_>>>()?;
        let outputs: Vec<GroupElement> = match mode {
            DecryptionMode::Direct => published.iter().map(|d| d.invert(settings)).collect(),
            DecryptionMode::Threshold { .. } => published,
        };
        let proof = equality::EqualityProof::from_dto(&dto.proof)?;

        if proof.t2.len() != n {
            return Ok(false);
        }
        // Reject a forged `(t, c, z)` with the unbatched check before it can
        // be folded into the aggregate multi-exponentiation below.
        if !equality::verify(&g, y_eff, &bases, &outputs, &proof, prover_id, settings) {
            return Ok(false);
        }
        let expected_c = proof.c.clone();

        let combined_t2 = proof
            .t2
            .iter()
            .zip(&kappa)
            .map(|(t, k)| t.pow(k, settings))
            .fold(GroupElement::from_biguint_unchecked(num_bigint::BigUint::from(1u8)), |acc, v| {
                acc.multiply(&v, settings)
            });
        let combined_output = outputs
            .iter()
            .zip(&kappa)
            .map(|(o, k)| o.pow(k, settings))
            .fold(GroupElement::from_biguint_unchecked(num_bigint::BigUint::from(1u8)), |acc, v| {
                acc.multiply(&v, settings)
            });

        let m_j = proof.t1.multiply(&combined_t2.pow(&tau, settings), settings);
        let y_j = y_eff.multiply(&combined_output.pow(&tau, settings), settings);

        let rho_j = settings.random_scalar(rng);
        lhs_exponent = lhs_exponent.add(&rho_j.multiply(&proof.z, settings), settings);
        let rhs_j = m_j.multiply(&y_j.pow(&expected_c, settings), settings).pow(&rho_j, settings);
        rhs = rhs.multiply(&rhs_j, settings);
    }

    let lhs = combined_g.pow(&lhs_exponent, settings);
    Ok(lhs == rhs)
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
    fn key_share_proof_verifies() {
        let settings = test_settings();
        let mut rng = rand::thread_rng();
        let prover_id = ProverId::new("T1");

        let (_share, dto) = create_share(&prover_id, &settings, &mut rng);
        let proof = preimage::PreimageProof::from_dto(&dto.proof).unwrap();
        let y = GroupElement::decode(&dto.public_key).unwrap();
        assert!(preimage::verify(&settings.generator(), &y, &proof, &prover_id, &settings));
    }

    #[test]
    fn rejects_degenerate_ciphertext() {
        let settings = test_settings();
        let mut rng = rand::thread_rng();
        let prover_id = ProverId::new("T1");
        let (share, _) = create_share(&prover_id, &settings, &mut rng);

        let identity = settings.generator().pow(&ScalarElement::zero(), &settings);
        let ct = ElGamalCiphertext::new(identity, settings.generator());

        let result = partial_decrypt(
            &[ct],
            &share,
            &DecryptionMode::Direct,
            &prover_id,
            &settings,
            &mut rng,
        );
        assert!(matches!(result, Err(CryptoError::DegenerateCiphertext(0))));
    }

    #[test]
    fn direct_mode_partial_decryptions_combine_by_multiplication() {
        let settings = test_settings();
        let mut rng = rand::thread_rng();
        let g = settings.generator();

        let (share1, dto1) = create_share(&ProverId::new("T1"), &settings, &mut rng);
        let (share2, dto2) = create_share(&ProverId::new("T2"), &settings, &mut rng);
        let y1 = GroupElement::decode(&dto1.public_key).unwrap();
        let y2 = GroupElement::decode(&dto2.public_key).unwrap();
        let joint_y = y1.multiply(&y2, &settings);

        let r = settings.random_scalar(&mut rng);
        let message = g.pow(&ScalarElement::from_biguint_unchecked(BigUint::from(3u8)), &settings);
        let a = g.pow(&r, &settings);
        let b = message.multiply(&joint_y.pow(&r, &settings), &settings);
        let ct = ElGamalCiphertext::new(a, b);

        let d1 = partial_decrypt(&[ct.clone()], &share1, &DecryptionMode::Direct, &ProverId::new("T1"), &settings, &mut rng).unwrap();
        let d2 = partial_decrypt(&[ct.clone()], &share2, &DecryptionMode::Direct, &ProverId::new("T2"), &settings, &mut rng).unwrap();

        let d1_val = GroupElement::decode(&d1.partial_decryptions[0]).unwrap();
        let d2_val = GroupElement::decode(&d2.partial_decryptions[0]).unwrap();

        let recovered = ct.b.multiply(&d1_val, &settings).multiply(&d2_val, &settings);
        assert_eq!(recovered, message);
    }

    #[test]
    fn single_partial_decryption_verifies() {
        let settings = test_settings();
        let mut rng = rand::thread_rng();
        let g = settings.generator();
        let prover_id = ProverId::new("T1");

        let (share, dto) = create_share(&prover_id, &settings, &mut rng);
        let y = GroupElement::decode(&dto.public_key).unwrap();

        let r = settings.random_scalar(&mut rng);
        let message = g.pow(&ScalarElement::from_biguint_unchecked(BigUint::from(5u8)), &settings);
        let ct = ElGamalCiphertext::new(g.pow(&r, &settings), message.multiply(&y.pow(&r, &settings), &settings));

        let partial = partial_decrypt(&[ct.clone()], &share, &DecryptionMode::Direct, &prover_id, &settings, &mut rng).unwrap();
        assert!(verify_partial_decryption(&[ct], &partial, &DecryptionMode::Direct, &y, &prover_id, &settings).unwrap());
    }

    #[test]
    fn batch_verification_accepts_honest_entries_and_rejects_a_tampered_one() {
        let settings = test_settings();
        let mut rng = rand::thread_rng();
        let g = settings.generator();

        let (share1, dto1) = create_share(&ProverId::new("T1"), &settings, &mut rng);
        let (share2, dto2) = create_share(&ProverId::new("T2"), &settings, &mut rng);
        let y1 = GroupElement::decode(&dto1.public_key).unwrap();
        let y2 = GroupElement::decode(&dto2.public_key).unwrap();

        let r = settings.random_scalar(&mut rng);
        let message = g.pow(&ScalarElement::from_biguint_unchecked(BigUint::from(3u8)), &settings);
        let joint_y = y1.multiply(&y2, &settings);
        let ct = ElGamalCiphertext::new(g.pow(&r, &settings), message.multiply(&joint_y.pow(&r, &settings), &settings));

        let partial1 = partial_decrypt(&[ct.clone()], &share1, &DecryptionMode::Direct, &ProverId::new("T1"), &settings, &mut rng).unwrap();
        let partial2 = partial_decrypt(&[ct.clone()], &share2, &DecryptionMode::Direct, &ProverId::new("T2"), &settings, &mut rng).unwrap();

        let entries = vec![
            (y1.clone(), partial1.clone(), ProverId::new("T1")),
            (y2.clone(), partial2.clone(), ProverId::new("T2")),
        ];
        assert!(verify_partial_decryption_batch(&[ct.clone()], &entries, &DecryptionMode::Direct, &settings, &mut rng).unwrap());

        let mut tampered2 = partial2;
        tampered2.partial_decryptions[0] = g.encode();
        let bad_entries = vec![
            (y1, partial1, ProverId::new("T1")),
            (y2, tampered2, ProverId::new("T2")),
        ];
        assert!(!verify_partial_decryption_batch(&[ct], &bad_entries, &DecryptionMode::Direct, &settings, &mut rng).unwrap());
    }
}
