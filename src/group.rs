//! The prime-order subgroup of `(Z/pZ)*`, `p = 2q+1`, and its elements.
//!
//! [`GroupElement`] and [`ScalarElement`] are distinct static types rather
//! than variants of one dynamically-checked element enum (see DESIGN.md,
//! "dynamic casts to concrete algebraic types") so that e.g. multiplying a
//! scalar by a group element cannot even be expressed, let alone executed
//! with a runtime cast.

use num_bigint::{BigUint, RandBigInt};
use num_integer::Integer;
use num_traits::{One, Zero};
use rand::RngCore;
use sha2::{Digest, Sha256};
use zeroize::Zeroize;

use crate::error::{CryptoError, Result};

/// Externally supplied group parameters: `(p, q, g)` plus enough entropy to
/// deterministically derive the independent commitment generators `{h_i}`
/// used by the permutation commitment (see [`GroupParams::commitment_generators`]).
///
/// This is the "group-parameter provider" collaborator of spec §6: the core
/// validates it once, at construction time, and never re-derives `p`/`q`/`g`
/// itself.
#[derive(Clone, Debug)]
pub struct GroupParams {
    pub p: BigUint,
    pub q: BigUint,
    pub g: BigUint,
}

/// Immutable configuration shared by reference across a whole invocation:
/// the group, its order, its generator, and the canonical hash used for
/// Fiat-Shamir challenges.
///
/// Invariant: `g != 1` and `g^q == 1 (mod p)`. Checked once in [`CryptoSettings::new`].
#[derive(Clone, Debug)]
pub struct CryptoSettings {
    params: GroupParams,
}

impl CryptoSettings {
    /// Validate `params` and build the immutable settings snapshot.
    ///
    /// `p` must be an (probable) safe prime with `p == 2*q + 1`, `g` must be
    /// a non-identity element of the order-`q` subgroup.
    pub fn new(params: GroupParams) -> Result<Self> {
        if params.p.is_even() {
            return Err(CryptoError::InvalidGroupParameters(
                "p must be odd".into(),
            ));
        }
        if &params.p != &(&params.q * 2u8 + 1u8) {
            return Err(CryptoError::InvalidGroupParameters(
                "p must equal 2*q + 1".into(),
            ));
        }
        if !is_probable_prime(&params.p) || !is_probable_prime(&params.q) {
            return Err(CryptoError::InvalidGroupParameters(
                "p and q must both be (probable) prime".into(),
            ));
        }
        if params.g <= BigUint::one() {
            return Err(CryptoError::InvalidGroupParameters(
                "g must not be 0 or 1".into(),
            ));
        }
        if params.g.modpow(&params.q, &params.p) != BigUint::one() {
            return Err(CryptoError::InvalidGroupParameters(
                "g^q != 1 (mod p): g is not in the order-q subgroup".into(),
            ));
        }
        Ok(Self { params })
    }

    pub fn p(&self) -> &BigUint {
        &self.params.p
    }

    pub fn q(&self) -> &BigUint {
        &self.params.q
    }

    pub fn generator(&self) -> GroupElement {
        GroupElement(self.params.g.clone())
    }

    pub fn group_params(&self) -> &GroupParams {
        &self.params
    }

    /// Sample a scalar uniformly from `Z_q` using a cryptographically
    /// secure RNG.
    pub fn random_scalar<R: RngCore>(&self, rng: &mut R) -> ScalarElement {
        ScalarElement(rng.gen_biguint_below(&self.params.q))
    }

    /// Derive the `n` independent commitment generators `h_1,...,h_n` used
    /// by the permutation commitment.
    ///
    /// Construction (see DESIGN.md, "Open Question: {h_i} construction"):
    /// `h_i = H("mixnet-core/h-gen" || p || q || g || i)` interpreted as an
    /// integer mod `p`, then squared to land in the order-`q` subgroup
    /// (squaring any nonzero element of `Z_p*` lands in the unique subgroup
    /// of index 2, which for a safe prime is exactly the order-`q`
    /// subgroup). The seed counter is advanced until the result is not the
    /// identity, which only happens with negligible probability.
    ///
    /// This is deterministic and reproducible bit-for-bit given only
    /// `(p, q, g)` and `n`, so a verifier holding the same `GroupParams` can
    /// recompute the identical generator family without any out-of-band
    /// transport of `{h_i}`.
    pub fn commitment_generators(&self, n: usize) -> Vec<GroupElement> {
        (0..n)
            .map(|i| self.derive_generator(i as u64))
            .collect()
    }

    fn derive_generator(&self, index: u64) -> GroupElement {
        let mut attempt: u64 = 0;
        loop {
            let mut hasher = Sha256::new();
            hasher.update(b"mixnet-core/h-gen/v1");
            hasher.update(self.params.p.to_bytes_be());
            hasher.update(self.params.q.to_bytes_be());
            hasher.update(self.params.g.to_bytes_be());
            hasher.update(index.to_be_bytes());
            hasher.update(attempt.to_be_bytes());
            let digest = hasher.finalize();
            let candidate = BigUint::from_bytes_be(&digest) % &self.params.p;
            let squared = candidate.modpow(&BigUint::from(2u8), &self.params.p);
            if squared > BigUint::one() {
                return GroupElement(squared);
            }
            attempt += 1;
        }
    }
}

fn is_probable_prime(n: &BigUint) -> bool {
    // Miller-Rabin with a fixed, generous round count. This crate never
    // generates fresh safe primes itself (that is the group-parameter
    // provider's job) -- this check only guards against a misconfigured or
    // malicious provider.
    if n < &BigUint::from(2u8) {
        return false;
    }
    for small in [2u32, 3, 5, 7, 11, 13, 17, 19, 23, 29, 31] {
        let small = BigUint::from(small);
        if n == &small {
            return true;
        }
        if (n % &small).is_zero() {
            return false;
        }
    }
    miller_rabin(n, 40)
}

fn miller_rabin(n: &BigUint, rounds: u32) -> bool {
    let one = BigUint::one();
    let two = BigUint::from(2u8);
    let n_minus_one = n - &one;

    let mut d = n_minus_one.clone();
    let mut r = 0u32;
    while (&d % &two).is_zero() {
        d /= &two;
        r += 1;
    }

    let mut rng = rand::thread_rng();
    'witness: for _ in 0..rounds {
        let a = rng.gen_biguint_range(&two, &n_minus_one);
        let mut x = a.modpow(&d, n);
        if x == one || x == n_minus_one {
            continue;
        }
        for _ in 0..r - 1 {
            x = x.modpow(&two, n);
            if x == n_minus_one {
                continue 'witness;
            }
        }
        return false;
    }
    true
}

/// A member of `G`, the order-`q` subgroup of `(Z/pZ)*`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct GroupElement(BigUint);

impl GroupElement {
    pub fn from_biguint_unchecked(value: BigUint) -> Self {
        Self(value)
    }

    pub fn as_biguint(&self) -> &BigUint {
        &self.0
    }

    pub fn multiply(&self, other: &GroupElement, settings: &CryptoSettings) -> GroupElement {
        GroupElement((&self.0 * &other.0) % settings.p())
    }

    pub fn pow(&self, exponent: &ScalarElement, settings: &CryptoSettings) -> GroupElement {
        GroupElement(self.0.modpow(&exponent.0, settings.p()))
    }

    pub fn invert(&self, settings: &CryptoSettings) -> GroupElement {
        // g^-1 = g^(p-2) (mod p), valid for any nonzero element of Z_p*.
        let exponent = settings.p() - BigUint::from(2u8);
        GroupElement(self.0.modpow(&exponent, settings.p()))
    }

    pub fn is_identity(&self) -> bool {
        self.0 == BigUint::one()
    }

    /// Canonical decimal encoding in `[1, p)`.
    pub fn encode(&self) -> String {
        self.0.to_str_radix(10)
    }

    pub fn decode(s: &str) -> Result<Self> {
        BigUint::parse_bytes(s.as_bytes(), 10)
            .map(GroupElement)
            .ok_or_else(|| CryptoError::EncodingFailure(format!("not a decimal integer: {s}")))
    }
}

/// A member of the ring of integers modulo `q`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScalarElement(BigUint);

/// Hand-written rather than derived: mainline `num-bigint`'s `BigUint` does
/// not implement `Zeroize` (that support lives only in the unrelated
/// `num-bigint-dig` fork), so `#[derive(Zeroize)]` on a struct wrapping it
/// cannot be satisfied. `BigUint` also exposes no mutable access to its
/// backing digit vector, so the old limbs can't be overwritten in place
/// through its public API; the best available safe replacement is to drop
/// the value entirely by reassigning it to zero, which at least ensures no
/// read through this handle can observe the prior bits.
impl Zeroize for ScalarElement {
    fn zeroize(&mut self) {
        self.0 = BigUint::zero();
    }
}

impl ScalarElement {
    pub fn from_biguint_unchecked(value: BigUint) -> Self {
        Self(value)
    }

    pub fn as_biguint(&self) -> &BigUint {
        &self.0
    }

    pub fn zero() -> Self {
        Self(BigUint::zero())
    }

    pub fn add(&self, other: &ScalarElement, settings: &CryptoSettings) -> ScalarElement {
        ScalarElement((&self.0 + &other.0) % settings.q())
    }

    pub fn multiply(&self, other: &ScalarElement, settings: &CryptoSettings) -> ScalarElement {
        ScalarElement((&self.0 * &other.0) % settings.q())
    }

    /// Modular inverse mod `q`. `None` iff `self` is `0`.
    pub fn invert(&self, settings: &CryptoSettings) -> Option<ScalarElement> {
        if self.0.is_zero() {
            return None;
        }
        mod_inverse(&self.0, settings.q()).map(ScalarElement)
    }

    pub fn encode(&self) -> String {
        self.0.to_str_radix(10)
    }

    pub fn decode(s: &str) -> Result<Self> {
        BigUint::parse_bytes(s.as_bytes(), 10)
            .map(ScalarElement)
            .ok_or_else(|| CryptoError::EncodingFailure(format!("not a decimal integer: {s}")))
    }
}

/// Extended-Euclidean modular inverse of `a` mod `m`.
fn mod_inverse(a: &BigUint, m: &BigUint) -> Option<BigUint> {
    let (g, x, _) = extended_gcd(&a.clone().into(), &m.clone().into());
    if g != num_bigint::BigInt::one() {
        return None;
    }
    let m_i = num_bigint::BigInt::from(m.clone());
    let result = ((x % &m_i) + &m_i) % &m_i;
    result.to_biguint()
}

fn extended_gcd(
    a: &num_bigint::BigInt,
    b: &num_bigint::BigInt,
) -> (num_bigint::BigInt, num_bigint::BigInt, num_bigint::BigInt) {
    use num_bigint::BigInt;
    if b.is_zero() {
        (a.clone(), BigInt::one(), BigInt::zero())
    } else {
        let (g, x1, y1) = extended_gcd(b, &(a % b));
        let y = x1 - (a / b) * &y1;
        (g, y1, y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A small, fast test group: q = 11, p = 23, g = 4 (order 11 in Z_23*).
    fn test_settings() -> CryptoSettings {
        let params = GroupParams {
            p: BigUint::from(23u32),
            q: BigUint::from(11u32),
            g: BigUint::from(4u32),
        };
        CryptoSettings::new(params).unwrap()
    }

    #[test]
    fn rejects_bad_group_parameters() {
        let bad = GroupParams {
            p: BigUint::from(22u32),
            q: BigUint::from(11u32),
            g: BigUint::from(4u32),
        };
        assert!(CryptoSettings::new(bad).is_err());

        let bad_g = GroupParams {
            p: BigUint::from(23u32),
            q: BigUint::from(11u32),
            g: BigUint::from(1u32),
        };
        assert!(CryptoSettings::new(bad_g).is_err());
    }

    #[test]
    fn scalar_inverse_round_trips() {
        let settings = test_settings();
        let x = ScalarElement(BigUint::from(3u32));
        let inv = x.invert(&settings).unwrap();
        let product = x.multiply(&inv, &settings);
        assert_eq!(product, ScalarElement(BigUint::one()));
    }

    #[test]
    fn group_element_encode_decode_round_trips() {
        let settings = test_settings();
        let g = settings.generator();
        let encoded = g.encode();
        let decoded = GroupElement::decode(&encoded).unwrap();
        assert_eq!(g, decoded);
    }

    #[test]
    fn commitment_generators_are_deterministic_and_in_subgroup() {
        let settings = test_settings();
        let hs1 = settings.commitment_generators(4);
        let hs2 = settings.commitment_generators(4);
        assert_eq!(hs1, hs2);
        for h in &hs1 {
            assert_eq!(h.pow(&ScalarElement(settings.q().clone()), &settings).0, BigUint::one());
        }
    }
}
