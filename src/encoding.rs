//! Canonical string encodings, bit-exact for interop (spec §6).
//!
//! Scalars and group elements encode as decimal-integer strings
//! ([`GroupElement::encode`], [`ScalarElement::encode`]). Tuples of elements
//! encode as `"(" + encode(x_1) + "," + ... + ")"` with no whitespace,
//! nesting recursively. Any divergence here between prover and verifier in
//! whitespace, element order, or integer base silently breaks soundness
//! (spec §4.2) -- this module is the single place that format is defined.

use crate::error::{CryptoError, Result};

/// Anything with a canonical string encoding used in a DTO or hashed into a
/// Fiat-Shamir transcript.
pub trait CanonicalEncode {
    fn encode(&self) -> String;
}

impl CanonicalEncode for crate::group::GroupElement {
    fn encode(&self) -> String {
        crate::group::GroupElement::encode(self)
    }
}

impl CanonicalEncode for crate::group::ScalarElement {
    fn encode(&self) -> String {
        crate::group::ScalarElement::encode(self)
    }
}

/// Encode a fixed tuple of canonical child encodings as
/// `"(" child_1 "," child_2 "," ... ")"`.
pub fn encode_tuple(children: &[String]) -> String {
    let mut out = String::with_capacity(2 + children.iter().map(|c| c.len() + 1).sum::<usize>());
    out.push('(');
    for (i, child) in children.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push_str(child);
    }
    out.push(')');
    out
}

/// Inverse of [`encode_tuple`]: split `"(a,b,c)"` back into `["a","b","c"]`,
/// respecting nested parentheses so tuple-of-tuples encodings split
/// correctly.
pub fn decode_tuple(s: &str) -> Result<Vec<String>> {
    let inner = s
        .strip_prefix('(')
        .and_then(|s| s.strip_suffix(')'))
        .ok_or_else(|| CryptoError::EncodingFailure(format!("not a tuple encoding: {s}")))?;

    if inner.is_empty() {
        return Ok(Vec::new());
    }

    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut start = 0usize;
    for (i, ch) in inner.char_indices() {
        match ch {
            '(' => depth += 1,
            ')' => depth -= 1,
            ',' if depth == 0 => {
                parts.push(inner[start..i].to_string());
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(inner[start..].to_string());
    Ok(parts)
}

/// Encode an ordered, flat sequence of element encodings (the wire shape
/// used by `bridgingCommitments`, `eValues`, partial-decryption lists, and
/// shuffled ciphertext lists). These travel as externally-defined arrays
/// (e.g. JSON arrays) rather than as a parenthesized tuple string.
pub fn encode_sequence<T: CanonicalEncode>(items: &[T]) -> Vec<String> {
    items.iter().map(CanonicalEncode::encode).collect()
}
