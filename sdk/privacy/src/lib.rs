//! Obscura Privacy SDK
//!
//! Deposit commitments, nullifier hashes and the commitment Merkle tree for a
//! fixed-denomination mixer.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                          Deposit                                │
//! │   (nullifier, secret) ──► commitment = H(nullifier, secret)     │
//! │                                   │                             │
//! │                                   ▼                             │
//! │                    ┌──────────────────────────┐                 │
//! │                    │   MerkleTree (depth D)   │                 │
//! │                    └──────────────────────────┘                 │
//! │                                   │                             │
//! │                                   ▼                             │
//! │  Withdrawal: root, H(nullifier), recipient + membership path    │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod commitment;
pub mod hasher;
pub mod merkle;
pub mod nullifier;

pub use commitment::{Commitment, CommitmentScheme, Deposit, SecretPair};
pub use hasher::{Hasher, PoseidonHasher, poseidon_config};
pub use merkle::{MAX_DEPTH, MembershipProof, MerkleTree, TREE_DEPTH, TreeError, fold_path};
pub use nullifier::NullifierHash;
