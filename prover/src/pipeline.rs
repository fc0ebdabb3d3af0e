//! Proof Generation Pipeline
//!
//! ```text
//! COLLECT_INPUTS ─► COMPUTE_HASHES ─► BUILD_TREE ─► DERIVE_MEMBERSHIP_PROOF
//!        ─► ASSEMBLE_WITNESS ─► EXECUTE_CIRCUIT ─► GENERATE_PROOF ─► ENCODE_RESULT
//! ```
//!
//! Linear and terminal: the first failure aborts the run and is returned as a
//! [`PipelineError`] naming its stage. No partial artifact is ever returned.
//! The leaf list is treated as an immutable snapshot for the whole run.

use std::fmt;

use ark_bn254::Fr;
use obscura_field as field;
use obscura_privacy::{
    CommitmentScheme, Hasher, MembershipProof, MerkleTree, NullifierHash, SecretPair,
};

use crate::backend::{ProofArtifact, ProofBackend, ProofOptions};
use crate::errors::{PipelineError, ProverError};
use crate::executor::CircuitExecutor;
use crate::witness::WitnessInput;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    CollectInputs,
    ComputeHashes,
    BuildTree,
    DeriveMembershipProof,
    AssembleWitness,
    ExecuteCircuit,
    GenerateProof,
    EncodeResult,
}

impl Stage {
    /// Stages in execution order
    pub const ALL: [Stage; 8] = [
        Stage::CollectInputs,
        Stage::ComputeHashes,
        Stage::BuildTree,
        Stage::DeriveMembershipProof,
        Stage::AssembleWitness,
        Stage::ExecuteCircuit,
        Stage::GenerateProof,
        Stage::EncodeResult,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::CollectInputs => "COLLECT_INPUTS",
            Stage::ComputeHashes => "COMPUTE_HASHES",
            Stage::BuildTree => "BUILD_TREE",
            Stage::DeriveMembershipProof => "DERIVE_MEMBERSHIP_PROOF",
            Stage::AssembleWitness => "ASSEMBLE_WITNESS",
            Stage::ExecuteCircuit => "EXECUTE_CIRCUIT",
            Stage::GenerateProof => "GENERATE_PROOF",
            Stage::EncodeResult => "ENCODE_RESULT",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw withdrawal request, exactly as received at the boundary
#[derive(Clone, PartialEq, Eq)]
pub struct ProofRequest {
    /// Field-decodable string (decimal or 0x hex)
    pub nullifier: String,
    pub secret: String,
    /// 0x-prefixed 20-byte address or a field-decodable string
    pub recipient: String,
    /// Commitments in insertion order
    pub leaves: Vec<String>,
}

impl ProofRequest {
    pub fn new(
        nullifier: impl Into<String>,
        secret: impl Into<String>,
        recipient: impl Into<String>,
        leaves: Vec<String>,
    ) -> Self {
        Self {
            nullifier: nullifier.into(),
            secret: secret.into(),
            recipient: recipient.into(),
            leaves,
        }
    }
}

impl fmt::Debug for ProofRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProofRequest")
            .field("nullifier", &"<redacted>")
            .field("secret", &"<redacted>")
            .field("recipient", &self.recipient)
            .field("leaves", &self.leaves.len())
            .finish()
    }
}

/// Decoded request
struct Inputs {
    secrets: SecretPair,
    recipient: Fr,
    leaves: Vec<Fr>,
}

/// Successful pipeline output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WithdrawalProof {
    pub artifact: ProofArtifact,
    pub membership: MembershipProof,
    pub nullifier_hash: NullifierHash,
}

impl WithdrawalProof {
    /// `abi.encode(bytes proof, bytes32[] publicInputs)`
    pub fn encode(&self) -> Vec<u8> {
        self.artifact.encode()
    }
}

/// Orchestrates one withdrawal proof from raw strings to an encoded payload
pub struct ProofPipeline<H, C, B> {
    hasher: H,
    executor: C,
    backend: B,
    options: ProofOptions,
}

impl<H, C, B> ProofPipeline<H, C, B>
where
    H: Hasher,
    C: CircuitExecutor,
    B: ProofBackend,
{
    pub fn new(hasher: H, executor: C, backend: B) -> Self {
        Self {
            hasher,
            executor,
            backend,
            options: ProofOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ProofOptions) -> Self {
        self.options = options;
        self
    }

    /// Tree depth, fixed by the circuit
    pub fn depth(&self) -> usize {
        self.executor.depth()
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn options(&self) -> &ProofOptions {
        &self.options
    }

    /// Run every stage and return the encoded payload.
    pub fn run_encoded(&self, request: &ProofRequest) -> Result<Vec<u8>, PipelineError> {
        let proof = self.run(request)?;
        enter(Stage::EncodeResult);
        Ok(proof.encode())
    }

    /// Run every stage up to proof generation.
    pub fn run(&self, request: &ProofRequest) -> Result<WithdrawalProof, PipelineError> {
        let depth = self.depth();
        let span = tracing::info_span!(
            "withdraw_proof",
            depth,
            leaves = request.leaves.len(),
            hasher = self.hasher.name()
        );
        let _enter = span.enter();

        enter(Stage::CollectInputs);
        let inputs = collect_inputs(request).map_err(at(Stage::CollectInputs))?;

        enter(Stage::ComputeHashes);
        let scheme = CommitmentScheme::new(&self.hasher);
        let commitment = scheme.commit(&inputs.secrets);
        let nullifier_hash = scheme.nullifier_hash_of(&inputs.secrets.nullifier);

        enter(Stage::BuildTree);
        let tree = MerkleTree::build(depth, &self.hasher, &inputs.leaves)
            .map_err(at(Stage::BuildTree))?;

        enter(Stage::DeriveMembershipProof);
        let membership = tree
            .prove_membership(&commitment.to_field())
            .map_err(at(Stage::DeriveMembershipProof))?;
        tracing::debug!(leaf_index = membership.leaf_index, "commitment located");

        enter(Stage::AssembleWitness);
        let input = WitnessInput {
            root: membership.root,
            nullifier_hash: nullifier_hash.to_field(),
            recipient: inputs.recipient,
            nullifier: inputs.secrets.nullifier,
            secret: inputs.secrets.secret,
            merkle_proof: membership.path_elements.clone(),
            // circuit convention: true selects H(node, sibling), same as MembershipProof
            is_valid: membership.path_indices.clone(),
        };

        enter(Stage::ExecuteCircuit);
        let witness = self
            .executor
            .execute(&input)
            .map_err(at(Stage::ExecuteCircuit))?;

        enter(Stage::GenerateProof);
        let artifact = self
            .backend
            .prove(&witness, &self.options)
            .map_err(at(Stage::GenerateProof))?;
        if artifact.public_inputs != input.public_inputs() {
            return Err(PipelineError::new(
                Stage::GenerateProof,
                ProverError::ProvingBackend("backend returned foreign public inputs".into()),
            ));
        }

        tracing::info!(root = %field::to_decimal(&membership.root), "withdrawal proof ready");
        Ok(WithdrawalProof {
            artifact,
            membership,
            nullifier_hash,
        })
    }
}

/// Decode a proof payload and check it against `backend`.
pub fn verify_payload<B: ProofBackend>(backend: &B, payload: &[u8]) -> Result<bool, ProverError> {
    let artifact = ProofArtifact::decode(payload)?;
    backend.verify(&artifact)
}

fn collect_inputs(request: &ProofRequest) -> Result<Inputs, ProverError> {
    let secrets = SecretPair::from_strings(&request.nullifier, &request.secret)?;
    let recipient = field::decode_address(&request.recipient)?;
    let leaves = request
        .leaves
        .iter()
        .map(|leaf| field::decode_str(leaf))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Inputs {
        secrets,
        recipient,
        leaves,
    })
}

fn enter(stage: Stage) {
    tracing::debug!(stage = %stage, "entering stage");
}

fn at<E: Into<ProverError>>(stage: Stage) -> impl FnOnce(E) -> PipelineError {
    move |err| PipelineError::new(stage, err)
}
