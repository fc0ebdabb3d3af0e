//! Withdraw Circuit
//!
//! Proves knowledge of a deposit in the commitment tree without revealing
//! which one:
//!
//! ```text
//! Public Inputs:
//!   - root:           commitment tree root
//!   - nullifier_hash: H(nullifier), spent at most once
//!   - recipient:      payout binding
//!
//! Private Witness:
//!   - nullifier, secret
//!   - merkle_proof[D]: sibling hashes, leaf level first
//!   - is_valid[D]:     true when the running node is the left child
//!
//! Constraints:
//!   H(nullifier) == nullifier_hash
//!   fold(H(nullifier, secret), merkle_proof, is_valid) == root
//!   recipient^2 is computed so the recipient is bound to the proof
//! ```

use ark_bn254::Fr;
use ark_crypto_primitives::sponge::poseidon::PoseidonConfig;
use ark_r1cs_std::{
    alloc::AllocVar, boolean::Boolean, eq::EqGadget, fields::FieldVar, fields::fp::FpVar,
    select::CondSelectGadget,
};
use ark_relations::r1cs::{
    ConstraintSynthesizer, ConstraintSystem, ConstraintSystemRef, OptimizationGoal, SynthesisError,
    SynthesisMode,
};
use obscura_privacy::poseidon_config;

use super::poseidon::{hash1, hash2};
use crate::witness::WitnessInput;

/// Withdraw circuit for a tree of fixed depth.
///
/// Assignments are `None` during key generation.
#[derive(Clone)]
pub struct WithdrawCircuit {
    pub depth: usize,

    // --- Public Inputs ---
    pub root: Option<Fr>,
    pub nullifier_hash: Option<Fr>,
    pub recipient: Option<Fr>,

    // --- Private Witness ---
    pub nullifier: Option<Fr>,
    pub secret: Option<Fr>,
    pub merkle_proof: Option<Vec<Fr>>,
    pub is_valid: Option<Vec<bool>>,

    // --- Circuit config ---
    pub poseidon_config: PoseidonConfig<Fr>,
}

impl WithdrawCircuit {
    /// Circuit shape without assignments, for setup
    pub fn blank(depth: usize) -> Self {
        Self {
            depth,
            root: None,
            nullifier_hash: None,
            recipient: None,
            nullifier: None,
            secret: None,
            merkle_proof: None,
            is_valid: None,
            poseidon_config: poseidon_config().clone(),
        }
    }

    pub fn from_input(input: &WitnessInput) -> Self {
        Self {
            depth: input.depth(),
            root: Some(input.root),
            nullifier_hash: Some(input.nullifier_hash),
            recipient: Some(input.recipient),
            nullifier: Some(input.nullifier),
            secret: Some(input.secret),
            merkle_proof: Some(input.merkle_proof.clone()),
            is_valid: Some(input.is_valid.clone()),
            poseidon_config: poseidon_config().clone(),
        }
    }
}

/// Variable counts of the circuit as Groth16 setup lays them out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CircuitShape {
    /// Public inputs plus the constant one
    pub instance_variables: usize,
    pub witness_variables: usize,
}

impl CircuitShape {
    /// Length of a matching proving key's `a_query`
    pub fn num_variables(&self) -> usize {
        self.instance_variables + self.witness_variables
    }
}

impl WithdrawCircuit {
    /// Synthesize the blank circuit the way setup does and count its variables.
    pub fn shape(depth: usize) -> Result<CircuitShape, SynthesisError> {
        let cs = ConstraintSystem::<Fr>::new_ref();
        cs.set_optimization_goal(OptimizationGoal::Constraints);
        cs.set_mode(SynthesisMode::Setup);
        Self::blank(depth).generate_constraints(cs.clone())?;
        cs.finalize();

        Ok(CircuitShape {
            instance_variables: cs.num_instance_variables(),
            witness_variables: cs.num_witness_variables(),
        })
    }
}

impl ConstraintSynthesizer<Fr> for WithdrawCircuit {
    fn generate_constraints(self, cs: ConstraintSystemRef<Fr>) -> Result<(), SynthesisError> {
        // === Allocate Public Inputs ===
        let root = FpVar::new_input(cs.clone(), || {
            self.root.ok_or(SynthesisError::AssignmentMissing)
        })?;
        let nullifier_hash = FpVar::new_input(cs.clone(), || {
            self.nullifier_hash.ok_or(SynthesisError::AssignmentMissing)
        })?;
        let recipient = FpVar::new_input(cs.clone(), || {
            self.recipient.ok_or(SynthesisError::AssignmentMissing)
        })?;

        // === Allocate Private Witness ===
        let nullifier = FpVar::new_witness(cs.clone(), || {
            self.nullifier.ok_or(SynthesisError::AssignmentMissing)
        })?;
        let secret = FpVar::new_witness(cs.clone(), || {
            self.secret.ok_or(SynthesisError::AssignmentMissing)
        })?;

        // 1. Nullifier hash
        let computed_nullifier_hash = hash1(cs.clone(), &self.poseidon_config, &nullifier)?;
        computed_nullifier_hash.enforce_equal(&nullifier_hash)?;

        // 2. Commitment = H(nullifier, secret)
        let mut current = hash2(cs.clone(), &self.poseidon_config, &nullifier, &secret)?;

        // 3. Merkle path
        for level in 0..self.depth {
            let sibling = FpVar::new_witness(cs.clone(), || {
                self.merkle_proof
                    .as_ref()
                    .and_then(|path| path.get(level).copied())
                    .ok_or(SynthesisError::AssignmentMissing)
            })?;
            let is_left = Boolean::new_witness(cs.clone(), || {
                self.is_valid
                    .as_ref()
                    .and_then(|bits| bits.get(level).copied())
                    .ok_or(SynthesisError::AssignmentMissing)
            })?;

            let left = FpVar::conditionally_select(&is_left, &current, &sibling)?;
            let right = FpVar::conditionally_select(&is_left, &sibling, &current)?;
            current = hash2(cs.clone(), &self.poseidon_config, &left, &right)?;
        }
        current.enforce_equal(&root)?;

        // 4. Recipient binding
        let _recipient_square = recipient.square()?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use obscura_privacy::{CommitmentScheme, MerkleTree, PoseidonHasher};

    const DEPTH: usize = 4;

    fn valid_input() -> WitnessInput {
        let scheme = CommitmentScheme::new(PoseidonHasher::new());
        let nullifier = Fr::from(11u64);
        let secret = Fr::from(22u64);
        let commitment = scheme.commitment_of(&nullifier, &secret).to_field();

        let leaves = vec![Fr::from(1u64), Fr::from(2u64), commitment, Fr::from(3u64)];
        let tree = MerkleTree::build(DEPTH, PoseidonHasher::new(), &leaves).unwrap();
        let proof = tree.prove_membership(&commitment).unwrap();

        WitnessInput {
            root: proof.root,
            nullifier_hash: scheme.nullifier_hash_of(&nullifier).to_field(),
            recipient: Fr::from(0xdeadbeefu64),
            nullifier,
            secret,
            merkle_proof: proof.path_elements,
            is_valid: proof.path_indices,
        }
    }

    fn is_satisfied(input: &WitnessInput) -> bool {
        let cs = ConstraintSystem::<Fr>::new_ref();
        WithdrawCircuit::from_input(input)
            .generate_constraints(cs.clone())
            .unwrap();
        cs.is_satisfied().unwrap()
    }

    #[test]
    fn test_valid_witness_satisfies() {
        let cs = ConstraintSystem::<Fr>::new_ref();
        WithdrawCircuit::from_input(&valid_input())
            .generate_constraints(cs.clone())
            .unwrap();

        assert!(cs.is_satisfied().unwrap());
        // constant one + root, nullifier_hash, recipient
        assert_eq!(cs.num_instance_variables(), 4);
    }

    #[test]
    fn test_inverted_direction_bits_fail() {
        let mut input = valid_input();
        input.is_valid.iter_mut().for_each(|bit| *bit = !*bit);
        assert!(!is_satisfied(&input));
    }

    #[test]
    fn test_wrong_public_values_fail() {
        let mut input = valid_input();
        input.nullifier_hash = Fr::from(5u64);
        assert!(!is_satisfied(&input));

        let mut input = valid_input();
        input.root += Fr::from(1u64);
        assert!(!is_satisfied(&input));
    }

    #[test]
    fn test_swapped_commitment_order_fails() {
        let mut input = valid_input();
        std::mem::swap(&mut input.nullifier, &mut input.secret);
        assert!(!is_satisfied(&input));
    }

    #[test]
    fn test_any_recipient_satisfies() {
        let mut input = valid_input();
        input.recipient = Fr::from(42u64);
        assert!(is_satisfied(&input));
    }

    #[test]
    fn test_blank_circuit_shape_matches_assigned() {
        let setup = ConstraintSystem::<Fr>::new_ref();
        setup.set_mode(SynthesisMode::Setup);
        WithdrawCircuit::blank(DEPTH)
            .generate_constraints(setup.clone())
            .unwrap();

        let assigned = ConstraintSystem::<Fr>::new_ref();
        WithdrawCircuit::from_input(&valid_input())
            .generate_constraints(assigned.clone())
            .unwrap();

        assert_eq!(setup.num_constraints(), assigned.num_constraints());
        assert_eq!(setup.num_witness_variables(), assigned.num_witness_variables());
    }

    #[test]
    fn test_shape_grows_with_depth() {
        let shallow = WithdrawCircuit::shape(DEPTH).unwrap();
        let deep = WithdrawCircuit::shape(DEPTH + 1).unwrap();

        // root, nullifier_hash, recipient and the constant one
        assert_eq!(shallow.instance_variables, 4);
        assert_eq!(deep.instance_variables, 4);
        assert!(deep.witness_variables > shallow.witness_variables);
    }

    #[test]
    fn test_short_path_is_missing_assignment() {
        let mut input = valid_input();
        input.merkle_proof.pop();

        let mut circuit = WithdrawCircuit::from_input(&input);
        circuit.depth = DEPTH;
        let cs = ConstraintSystem::<Fr>::new_ref();
        assert!(matches!(
            circuit.generate_constraints(cs),
            Err(SynthesisError::AssignmentMissing)
        ));
    }
}
