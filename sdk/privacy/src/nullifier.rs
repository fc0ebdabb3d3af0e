//! Nullifier Hashes
//!
//! ```text
//! nullifier_hash = H(nullifier)
//! ```
//!
//! Revealed at withdrawal time. The verifier keeps the set of spent nullifier
//! hashes and accepts each one at most once; nothing in this crate tracks
//! spends.

use ark_bn254::Fr;
use obscura_field::{self as field, Bytes32, FieldError};

/// A nullifier hash (public withdrawal tag)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NullifierHash(pub Fr);

impl NullifierHash {
    pub fn to_field(&self) -> Fr {
        self.0
    }

    /// 32-byte big-endian encoding
    pub fn to_bytes(&self) -> Bytes32 {
        field::encode(&self.0)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, FieldError> {
        field::decode_bytes(bytes).map(Self)
    }
}

impl AsRef<Fr> for NullifierHash {
    fn as_ref(&self) -> &Fr {
        &self.0
    }
}
