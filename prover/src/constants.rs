/// Public inputs of the withdraw circuit, in order: root, nullifier_hash, recipient.
pub const PUBLIC_INPUTS: usize = 3;

/// Serialized Groth16 proof size in the EVM precompile layout (A: 64, B: 128, C: 64).
pub const PROOF_BYTES: usize = 256;

/// Seed for the development setup. Keys from this seed are public knowledge.
pub const DEV_SETUP_SEED: u64 = 0;

/// Domain tag mixed into the seed of deterministic proving randomness.
pub const DETERMINISTIC_PROVING_DOMAIN: &[u8] = b"obscura/groth16/prove/v1";
