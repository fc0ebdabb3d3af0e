//! Error types for the proving stack.
//!
//! Every failure carries a stable machine-readable [`ProverError::code`];
//! pipeline failures additionally name the [`Stage`] that produced them.

use obscura_field::FieldError;
use obscura_privacy::TreeError;
use thiserror::Error;

use crate::pipeline::Stage;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProverError {
    /// Malformed or out-of-range field element input
    #[error("{0}")]
    InvalidFieldEncoding(FieldError),

    /// Malformed proof payload
    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    #[error("invalid tree depth {depth}: must be between 1 and {max}")]
    InvalidDepth { depth: usize, max: usize },

    #[error("tree capacity exceeded: depth {depth} holds {capacity} leaves, got {requested}")]
    TreeCapacityExceeded {
        depth: usize,
        capacity: u64,
        requested: u64,
    },

    #[error("commitment not found in the supplied leaves")]
    LeafNotFound,

    #[error("commitment is ambiguous: it occurs at leaves {first} and {second}")]
    AmbiguousLeaf { first: u64, second: u64 },

    /// Circuit constraints are not satisfied by the supplied inputs
    #[error("witness execution failed: {0}")]
    WitnessExecution(String),

    /// Proving key and witness were built for different tree depths
    #[error("depth mismatch: proving key expects {expected}, witness has {actual}")]
    DepthMismatch { expected: usize, actual: usize },

    #[error("proving backend error: {0}")]
    ProvingBackend(String),

    #[error("proof verification failed")]
    VerificationFailed,

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl ProverError {
    /// Stable identifier for diagnostics and exit messages
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidFieldEncoding(_) => "invalid_field_encoding",
            Self::InvalidPayload(_) => "invalid_payload",
            Self::InvalidDepth { .. } => "invalid_depth",
            Self::TreeCapacityExceeded { .. } => "tree_capacity_exceeded",
            Self::LeafNotFound => "leaf_not_found",
            Self::AmbiguousLeaf { .. } => "ambiguous_leaf",
            Self::WitnessExecution(_) => "witness_execution",
            Self::DepthMismatch { .. } => "depth_mismatch",
            Self::ProvingBackend(_) => "proving_backend",
            Self::VerificationFailed => "verification_failed",
            Self::Serialization(_) => "serialization",
        }
    }
}

impl From<FieldError> for ProverError {
    fn from(err: FieldError) -> Self {
        match err {
            FieldError::InvalidAbi(reason) => Self::InvalidPayload(reason),
            other => Self::InvalidFieldEncoding(other),
        }
    }
}

impl From<TreeError> for ProverError {
    fn from(err: TreeError) -> Self {
        match err {
            TreeError::InvalidDepth { depth, max } => Self::InvalidDepth { depth, max },
            TreeError::TreeCapacityExceeded {
                depth,
                capacity,
                requested,
            } => Self::TreeCapacityExceeded {
                depth,
                capacity,
                requested,
            },
            TreeError::LeafNotFound => Self::LeafNotFound,
            TreeError::AmbiguousLeaf { first, second } => Self::AmbiguousLeaf { first, second },
        }
    }
}

/// A failure of one pipeline run, tagged with the stage that raised it
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{stage}: {kind}")]
pub struct PipelineError {
    pub stage: Stage,
    pub kind: ProverError,
}

impl PipelineError {
    pub fn new(stage: Stage, kind: impl Into<ProverError>) -> Self {
        Self {
            stage,
            kind: kind.into(),
        }
    }

    pub fn code(&self) -> &'static str {
        self.kind.code()
    }
}

/// Result type for proving operations
pub type Result<T> = std::result::Result<T, ProverError>;
