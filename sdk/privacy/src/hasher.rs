//! Domain Hash
//!
//! The scheme and the tree consume `H: Field × Field → Field` (and its
//! one-input form) through the [`Hasher`] trait, so an alternative hash can be
//! swapped in without touching either.
//!
//! The production instance is a Poseidon sponge over BN254 Fr. Each call
//! absorbs an arity tag before its inputs:
//!
//! ```text
//! H(a)    = Poseidon(1, a)
//! H(a, b) = Poseidon(2, a, b)
//! ```
//!
//! The withdraw circuit re-implements exactly this absorb sequence, so any
//! change here must be mirrored in `obscura_prover::circuit::poseidon`.

use std::sync::LazyLock;

use ark_bn254::Fr;
use ark_crypto_primitives::sponge::{
    CryptographicSponge,
    poseidon::{PoseidonConfig, PoseidonSponge, find_poseidon_ark_and_mds},
};
use ark_ff::PrimeField;

/// Arity tag absorbed before a one-input hash
pub const ARITY_ONE: u64 = 1;
/// Arity tag absorbed before a two-input hash
pub const ARITY_TWO: u64 = 2;

static POSEIDON_CONFIG: LazyLock<PoseidonConfig<Fr>> = LazyLock::new(|| {
    let full_rounds = 8;
    let partial_rounds = 56;
    let alpha = 5u64;
    let rate = 2;
    let capacity = 1;

    let (ark, mds) = find_poseidon_ark_and_mds::<Fr>(
        Fr::MODULUS_BIT_SIZE as u64,
        rate,
        full_rounds as u64,
        partial_rounds as u64,
        0,
    );
    PoseidonConfig::new(full_rounds, partial_rounds, alpha, mds, ark, rate, capacity)
});

/// Poseidon parameters for BN254 (rate 2, capacity 1, 128-bit security).
///
/// Shared by the native hasher and the circuit gadget.
pub fn poseidon_config() -> &'static PoseidonConfig<Fr> {
    &POSEIDON_CONFIG
}

/// Field hash consumed by the commitment scheme and the Merkle tree.
pub trait Hasher {
    /// One-input hash (nullifier hashes).
    fn hash1(&self, input: &Fr) -> Fr;

    /// Two-input hash. Order-sensitive: `hash2(a, b) != hash2(b, a)`.
    fn hash2(&self, left: &Fr, right: &Fr) -> Fr;

    /// Short identifier for logs.
    fn name(&self) -> &'static str;
}

impl<H: Hasher + ?Sized> Hasher for &H {
    fn hash1(&self, input: &Fr) -> Fr {
        (**self).hash1(input)
    }

    fn hash2(&self, left: &Fr, right: &Fr) -> Fr {
        (**self).hash2(left, right)
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}

/// Poseidon sponge hasher over BN254 Fr
#[derive(Debug, Clone)]
pub struct PoseidonHasher {
    config: PoseidonConfig<Fr>,
}

impl PoseidonHasher {
    pub fn new() -> Self {
        Self {
            config: poseidon_config().clone(),
        }
    }

    fn digest(&self, arity: u64, inputs: &[&Fr]) -> Fr {
        let mut sponge = PoseidonSponge::new(&self.config);
        sponge.absorb(&Fr::from(arity));
        for input in inputs {
            sponge.absorb(*input);
        }
        sponge.squeeze_field_elements::<Fr>(1).remove(0)
    }
}

impl Default for PoseidonHasher {
    fn default() -> Self {
        Self::new()
    }
}

impl Hasher for PoseidonHasher {
    fn hash1(&self, input: &Fr) -> Fr {
        self.digest(ARITY_ONE, &[input])
    }

    fn hash2(&self, left: &Fr, right: &Fr) -> Fr {
        self.digest(ARITY_TWO, &[left, right])
    }

    fn name(&self) -> &'static str {
        "poseidon-bn254"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_deterministic() {
        let hasher = PoseidonHasher::new();
        let a = Fr::from(7u64);
        let b = Fr::from(11u64);

        assert_eq!(hasher.hash1(&a), hasher.hash1(&a));
        assert_eq!(hasher.hash2(&a, &b), PoseidonHasher::new().hash2(&a, &b));
    }

    #[test]
    fn test_hash2_order_sensitive() {
        let hasher = PoseidonHasher::new();
        let a = Fr::from(7u64);
        let b = Fr::from(11u64);

        assert_ne!(hasher.hash2(&a, &b), hasher.hash2(&b, &a));
    }

    #[test]
    fn test_arity_domains_separated() {
        let hasher = PoseidonHasher::new();
        let a = Fr::from(7u64);

        // without the arity tag H(a) and H(a, 0) would absorb the same rate block
        assert_ne!(hasher.hash1(&a), hasher.hash2(&a, &Fr::from(0u64)));
    }

    #[test]
    fn test_reference_forwards() {
        let hasher = PoseidonHasher::new();
        let by_ref = &hasher;
        let a = Fr::from(3u64);

        assert_eq!(by_ref.hash1(&a), hasher.hash1(&a));
        assert_eq!(by_ref.name(), "poseidon-bn254");
    }
}
