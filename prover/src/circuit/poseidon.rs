//! In-circuit Poseidon, absorbing the same arity-tagged sequence as
//! [`obscura_privacy::PoseidonHasher`].

use ark_bn254::Fr;
use ark_crypto_primitives::sponge::{
    constraints::CryptographicSpongeVar,
    poseidon::{PoseidonConfig, constraints::PoseidonSpongeVar},
};
use ark_r1cs_std::fields::{FieldVar, fp::FpVar};
use ark_relations::r1cs::{ConstraintSystemRef, SynthesisError};
use obscura_privacy::hasher::{ARITY_ONE, ARITY_TWO};

/// `H(a)` inside the circuit
pub fn hash1(
    cs: ConstraintSystemRef<Fr>,
    config: &PoseidonConfig<Fr>,
    input: &FpVar<Fr>,
) -> Result<FpVar<Fr>, SynthesisError> {
    digest(cs, config, ARITY_ONE, &[input])
}

/// `H(a, b)` inside the circuit
pub fn hash2(
    cs: ConstraintSystemRef<Fr>,
    config: &PoseidonConfig<Fr>,
    left: &FpVar<Fr>,
    right: &FpVar<Fr>,
) -> Result<FpVar<Fr>, SynthesisError> {
    digest(cs, config, ARITY_TWO, &[left, right])
}

fn digest(
    cs: ConstraintSystemRef<Fr>,
    config: &PoseidonConfig<Fr>,
    arity: u64,
    inputs: &[&FpVar<Fr>],
) -> Result<FpVar<Fr>, SynthesisError> {
    let mut sponge = PoseidonSpongeVar::new(cs, config);
    sponge.absorb(&FpVar::constant(Fr::from(arity)))?;
    for input in inputs {
        sponge.absorb(*input)?;
    }

    let mut result = sponge.squeeze_field_elements(1)?;
    Ok(result.remove(0))
}
