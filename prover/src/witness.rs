use std::fmt;

use ark_bn254::Fr;

/// Named inputs of the withdraw circuit
#[derive(Clone, PartialEq, Eq)]
pub struct WitnessInput {
    // --- Public ---
    pub root: Fr,
    pub nullifier_hash: Fr,
    /// Payout binding; changing it invalidates the proof
    pub recipient: Fr,

    // --- Private ---
    pub nullifier: Fr,
    pub secret: Fr,
    /// Sibling hashes, leaf level first
    pub merkle_proof: Vec<Fr>,
    /// Per level: true when the running node is the left child
    pub is_valid: Vec<bool>,
}

impl WitnessInput {
    /// Number of path levels
    pub fn depth(&self) -> usize {
        self.merkle_proof.len()
    }

    /// Public inputs in circuit order
    pub fn public_inputs(&self) -> Vec<Fr> {
        vec![self.root, self.nullifier_hash, self.recipient]
    }
}

impl fmt::Debug for WitnessInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WitnessInput")
            .field("root", &self.root)
            .field("nullifier_hash", &self.nullifier_hash)
            .field("recipient", &self.recipient)
            .field("nullifier", &"<redacted>")
            .field("secret", &"<redacted>")
            .field("depth", &self.depth())
            .finish()
    }
}

/// An input assignment the circuit has accepted.
///
/// Only produced by a [`CircuitExecutor`](crate::executor::CircuitExecutor)
/// after every constraint was checked.
#[derive(Debug, Clone)]
pub struct Witness {
    input: WitnessInput,
    num_constraints: usize,
}

impl Witness {
    pub(crate) fn new(input: WitnessInput, num_constraints: usize) -> Self {
        Self {
            input,
            num_constraints,
        }
    }

    pub fn input(&self) -> &WitnessInput {
        &self.input
    }

    pub fn depth(&self) -> usize {
        self.input.depth()
    }

    pub fn public_inputs(&self) -> Vec<Fr> {
        self.input.public_inputs()
    }

    pub fn num_constraints(&self) -> usize {
        self.num_constraints
    }
}
