//! Solidity ABI encoding for the two payload shapes Obscura emits.
//!
//! ```text
//! (bytes32, bytes32, bytes32)          word0 | word1 | word2
//!
//! (bytes, bytes32[])                   0x40 | tail_offset
//!                                      len(bytes) | bytes .. zero padded
//!                                      len(words) | word0 | word1 | ..
//! ```

use alloy_primitives::{B256, Bytes};
use alloy_sol_types::SolValue;

use crate::{Bytes32, FieldError, Result};

/// ABI word size in bytes.
pub const WORD: usize = 32;

/// Encode the static tuple `(bytes32, bytes32, bytes32)`.
pub fn encode_triple(words: [Bytes32; 3]) -> Vec<u8> {
    let [a, b, c] = words.map(B256::from);
    (a, b, c).abi_encode_params()
}

/// Encode the dynamic tuple `(bytes, bytes32[])`.
pub fn encode_bytes_and_words(bytes: &[u8], words: &[Bytes32]) -> Vec<u8> {
    let words: Vec<B256> = words.iter().copied().map(B256::from).collect();
    (Bytes::from(bytes.to_vec()), words).abi_encode_params()
}

/// Decode a `(bytes, bytes32[])` payload.
///
/// Only the canonical encoding (as produced by [`encode_bytes_and_words`]) is
/// accepted.
pub fn decode_bytes_and_words(payload: &[u8]) -> Result<(Vec<u8>, Vec<Bytes32>)> {
    let decoded = <(Bytes, Vec<B256>)>::abi_decode_params(payload, true)
        .map_err(|e| FieldError::InvalidAbi(e.to_string()))?;

    // offsets, padding and trailing bytes all have exactly one valid form
    if decoded.abi_encode_params() != payload {
        return Err(FieldError::InvalidAbi(
            "payload is not canonically encoded".into(),
        ));
    }

    let (bytes, words) = decoded;
    Ok((bytes.to_vec(), words.into_iter().map(|w| w.0).collect()))
}
