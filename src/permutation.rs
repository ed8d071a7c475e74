//! Permutations and the commitments that bind a mixer to one (spec §3).

use rand::seq::SliceRandom;
use rand::RngCore;
use zeroize::Zeroize;

use crate::error::{CryptoError, Result};
use crate::group::{CryptoSettings, GroupElement, ScalarElement};

/// A bijection on `{0,...,N-1}`, drawn uniformly. `permutation[i]` is
/// `pi(i)`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PermutationElement {
    permutation: Vec<usize>,
}

impl PermutationElement {
    /// Sample `pi <- S_N` uniformly via a Fisher-Yates shuffle of `0..N`.
    pub fn sample<R: RngCore>(n: usize, rng: &mut R) -> Self {
        let mut permutation: Vec<usize> = (0..n).collect();
        permutation.shuffle(rng);
        Self { permutation }
    }

    pub fn len(&self) -> usize {
        self.permutation.len()
    }

    pub fn is_empty(&self) -> bool {
        self.permutation.is_empty()
    }

    pub fn at(&self, i: usize) -> usize {
        self.permutation[i]
    }

    /// `pi^-1(j)`: the index `i` such that `pi(i) == j`.
    pub fn inverse_at(&self, j: usize) -> usize {
        self.permutation
            .iter()
            .position(|&v| v == j)
            .expect("permutation is a bijection on 0..len")
    }

    pub fn as_slice(&self) -> &[usize] {
        &self.permutation
    }
}

/// An ordered sequence of `N` group elements committing to a permutation
/// under public generators `h_1,...,h_N`: `c_i = g^{r_i} * h_{pi(i)}`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PermutationCommitment {
    pub components: Vec<GroupElement>,
}

impl PermutationCommitment {
    /// Commit to `permutation` under `generators` with randomness `r`.
    pub fn commit(
        permutation: &PermutationElement,
        generators: &[GroupElement],
        r: &[ScalarElement],
        settings: &CryptoSettings,
    ) -> Result<Self> {
        let n = permutation.len();
        if generators.len() != n || r.len() != n {
            return Err(CryptoError::ProofGenerationFailure {
                subproof: "permutation_commitment",
                reason: "generator or randomness vector length mismatch".into(),
            });
        }
        let g = settings.generator();
        let components = (0..n)
            .map(|i| {
                let c = g.pow(&r[i], settings);
                c.multiply(&generators[permutation.at(i)], settings)
            })
            .collect();
        Ok(Self { components })
    }

    pub fn encode(&self) -> Vec<String> {
        crate::encoding::encode_sequence(&self.components)
    }
}

/// The private data behind a [`PermutationCommitment`]: the permutation
/// itself plus its randomness vector. Kept secret between the offline and
/// online phases; never serialized into transport DTOs (spec §3) -- the
/// only serialization this type exposes is the explicit opt-in
/// storage form below.
#[derive(Clone)]
pub struct PermutationData {
    pub permutation: PermutationElement,
    pub r: Vec<ScalarElement>,
}

impl Drop for PermutationData {
    fn drop(&mut self) {
        for r_i in &mut self.r {
            r_i.zeroize();
        }
    }
}

impl PermutationData {
    pub fn new(permutation: PermutationElement, r: Vec<ScalarElement>) -> Self {
        Self { permutation, r }
    }

    /// Opt-in serialization for caller-side storage between the offline and
    /// online phases. Deliberately not a `Serialize` impl: a transport DTO
    /// built via `#[derive(Serialize)]` on a struct that embedded this type
    /// would leak the permutation, so this conversion must be requested
    /// explicitly by name.
    pub fn to_storage_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(8 + self.permutation.len() * 16);
        out.extend_from_slice(&(self.permutation.len() as u64).to_be_bytes());
        for i in 0..self.permutation.len() {
            out.extend_from_slice(&(self.permutation.at(i) as u64).to_be_bytes());
        }
        for r_i in &self.r {
            let bytes = r_i.as_biguint().to_bytes_be();
            out.extend_from_slice(&(bytes.len() as u32).to_be_bytes());
            out.extend_from_slice(&bytes);
        }
        out
    }

    pub fn from_storage_bytes(bytes: &[u8]) -> Result<Self> {
        let mut cursor = bytes;
        let read_u64 = |cursor: &mut &[u8]| -> Result<u64> {
            if cursor.len() < 8 {
                return Err(CryptoError::EncodingFailure("truncated permutation data".into()));
            }
            let (head, tail) = cursor.split_at(8);
            *cursor = tail;
            Ok(u64::from_be_bytes(head.try_into().unwrap()))
        };

        let n = read_u64(&mut cursor)? as usize;
        let mut permutation = Vec::with_capacity(n);
        for _ in 0..n {
            permutation.push(read_u64(&mut cursor)? as usize);
        }

        let mut r = Vec::with_capacity(n);
        for _ in 0..n {
            if cursor.len() < 4 {
                return Err(CryptoError::EncodingFailure("truncated permutation data".into()));
            }
            let (len_bytes, tail) = cursor.split_at(4);
            let len = u32::from_be_bytes(len_bytes.try_into().unwrap()) as usize;
            cursor = tail;
            if cursor.len() < len {
                return Err(CryptoError::EncodingFailure("truncated permutation data".into()));
            }
            let (value, tail) = cursor.split_at(len);
            cursor = tail;
            r.push(ScalarElement::from_biguint_unchecked(num_bigint::BigUint::from_bytes_be(value)));
        }

        Ok(Self {
            permutation: PermutationElement { permutation },
            r,
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
    fn permutation_is_a_bijection() {
        let mut rng = rand::thread_rng();
        let perm = PermutationElement::sample(6, &mut rng);
        let mut seen = vec![false; 6];
        for i in 0..6 {
            seen[perm.at(i)] = true;
        }
        assert!(seen.into_iter().all(|v| v));
        for i in 0..6 {
            assert_eq!(perm.inverse_at(perm.at(i)), i);
        }
    }

    #[test]
    fn storage_round_trip_preserves_permutation_and_randomness() {
        let settings = test_settings();
        let mut rng = rand::thread_rng();
        let perm = PermutationElement::sample(4, &mut rng);
        let r: Vec<ScalarElement> = (0..4).map(|_| settings.random_scalar(&mut rng)).collect();
        let data = PermutationData::new(perm.clone(), r.clone());

        let bytes = data.to_storage_bytes();
        let restored = PermutationData::from_storage_bytes(&bytes).unwrap();
        assert_eq!(restored.permutation, perm);
        assert_eq!(restored.r, r);
    }
}
