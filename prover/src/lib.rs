//! Obscura Prover
//!
//! Turns a depositor's secrets and the current commitment set into a Groth16
//! withdrawal proof:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                     Withdrawal Proof                            │
//! │                                                                 │
//! │  Public Inputs:                                                 │
//! │  ┌───────────────────────────────────────────────────────────┐  │
//! │  │ • root            (commitment tree root)                  │  │
//! │  │ • nullifier_hash  (H(nullifier), spent at most once)      │  │
//! │  │ • recipient       (payout binding)                        │  │
//! │  └───────────────────────────────────────────────────────────┘  │
//! │                                                                 │
//! │  Private Witness:                                               │
//! │  ┌───────────────────────────────────────────────────────────┐  │
//! │  │ • nullifier, secret                                       │  │
//! │  │ • Merkle path and direction bits                          │  │
//! │  └───────────────────────────────────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod backend;
pub mod circuit;
pub mod constants;
pub mod errors;
pub mod executor;
pub mod pipeline;
pub mod witness;

// Re-export key types for external usage
pub use backend::{Groth16Backend, ProofArtifact, ProofBackend, ProofOptions, TranscriptHash};
pub use circuit::WithdrawCircuit;
pub use errors::{PipelineError, ProverError};
pub use executor::{CircuitExecutor, R1csExecutor};
pub use pipeline::{ProofPipeline, ProofRequest, Stage, WithdrawalProof, verify_payload};
pub use witness::{Witness, WitnessInput};
