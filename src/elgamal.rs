//! ElGamal over `G` (spec §4.1): key pairs and the re-encryption /
//! partial-decryption arithmetic the core needs. The core never encrypts a
//! plaintext itself -- it only generates keys, shuffles, and decrypts -- so
//! no `encrypt` entry point is exposed here.

use crate::encoding::{encode_tuple, CanonicalEncode};
use crate::group::{CryptoSettings, GroupElement, ScalarElement};

/// An ElGamal ciphertext `(a, b) = (g^r, m * y^r)`.
///
/// No `Serialize`/`Deserialize` derive here: the wire shape for a ciphertext
/// is the canonical tuple string from [`CanonicalEncode::encode`] (spec §6),
/// not a JSON object of its two `GroupElement` fields, so this type is never
/// itself a serde leaf -- callers encode it with [`CanonicalEncode`] and put
/// the resulting string into a DTO.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ElGamalCiphertext {
    pub a: GroupElement,
    pub b: GroupElement,
}

impl CanonicalEncode for ElGamalCiphertext {
    /// `encode(V_i) = "(" + encode(a) + "," + encode(b) + ")"` (spec §4.6
    /// step 5: `[encode(V'_i)]`).
    fn encode(&self) -> String {
        encode_tuple(&[self.a.encode(), self.b.encode()])
    }
}

impl ElGamalCiphertext {
    pub fn new(a: GroupElement, b: GroupElement) -> Self {
        Self { a, b }
    }

    /// Re-randomize under public key `y` with fresh randomness `s`:
    /// `(a * g^s, b * y^s)`. Used by the mixer's online shuffle phase.
    pub fn rerandomize(
        &self,
        s: &ScalarElement,
        y: &GroupElement,
        settings: &CryptoSettings,
    ) -> ElGamalCiphertext {
        let g = settings.generator();
        ElGamalCiphertext {
            a: self.a.multiply(&g.pow(s, settings), settings),
            b: self.b.multiply(&y.pow(s, settings), settings),
        }
    }
}

/// A key pair `(x, y)` with `x in Z_q`, `y = g^x`.
#[derive(Clone, Debug)]
pub struct KeyPair {
    pub x: ScalarElement,
    pub y: GroupElement,
}

impl KeyPair {
    pub fn from_private(x: ScalarElement, settings: &CryptoSettings) -> Self {
        let y = settings.generator().pow(&x, settings);
        Self { x, y }
    }
}
