use std::sync::OnceLock;

use ark_bn254::Fr;
use obscura_field as field;
use obscura_prover::{
    CircuitExecutor, Groth16Backend, ProofArtifact, ProofBackend, ProofOptions, ProofPipeline,
    ProofRequest, ProverError, R1csExecutor, Stage, TranscriptHash, WitnessInput,
    verify_payload,
};
use obscura_privacy::{CommitmentScheme, Hasher, MerkleTree, PoseidonHasher, SecretPair};
use rand::{SeedableRng, rngs::StdRng};

const DEPTH: usize = 4;
const RECIPIENT: &str = "0x1111111111111111111111111111111111111111";

fn backend() -> &'static Groth16Backend {
    static BACKEND: OnceLock<Groth16Backend> = OnceLock::new();
    BACKEND.get_or_init(|| {
        Groth16Backend::setup(DEPTH, &mut StdRng::seed_from_u64(0)).unwrap()
    })
}

fn pipeline(
    options: ProofOptions,
) -> ProofPipeline<PoseidonHasher, R1csExecutor, &'static Groth16Backend> {
    ProofPipeline::new(PoseidonHasher::new(), R1csExecutor::new(DEPTH), backend())
        .with_options(options)
}

fn deterministic() -> ProofOptions {
    ProofOptions {
        transcript_hash: TranscriptHash::Keccak256,
        deterministic: true,
    }
}

fn deposit(seed: u64) -> (SecretPair, String) {
    let scheme = CommitmentScheme::new(PoseidonHasher::new());
    let deposit = scheme.deposit(SecretPair::generate_with(&mut StdRng::seed_from_u64(seed)));
    let leaf = field::to_decimal(&deposit.commitment.to_field());
    (deposit.secrets, leaf)
}

fn request(secrets: &SecretPair, leaves: Vec<String>) -> ProofRequest {
    ProofRequest::new(
        field::to_decimal(&secrets.nullifier),
        field::to_decimal(&secrets.secret),
        RECIPIENT,
        leaves,
    )
}

#[test]
fn single_deposit_proves_against_empty_subtree_path() {
    let (secrets, leaf) = deposit(1);
    let proof = pipeline(deterministic())
        .run(&request(&secrets, vec![leaf.clone()]))
        .unwrap();

    let hasher = PoseidonHasher::new();
    let tree = MerkleTree::new(DEPTH, PoseidonHasher::new()).unwrap();
    let commitment = field::decode_str(&leaf).unwrap();

    // H(...H(H(c, zero_0), zero_1)..., zero_{D-1})
    let mut expected = commitment;
    for level in 0..DEPTH {
        let zero = tree.zero(level).unwrap();
        assert_eq!(proof.membership.path_elements[level], zero);
        assert!(proof.membership.path_indices[level]);
        expected = hasher.hash2(&expected, &zero);
    }

    assert_eq!(proof.membership.root, expected);
    assert_eq!(
        proof.membership.root,
        MerkleTree::build(DEPTH, hasher, &[commitment]).unwrap().root()
    );
    assert!(backend().verify(&proof.artifact).unwrap());
}

#[test]
fn proof_for_middle_leaf_verifies() {
    let (secrets, leaf) = deposit(7);
    let mut leaves: Vec<String> = (2..7).map(|seed| deposit(seed).1).collect();
    leaves.insert(3, leaf);

    let proof = pipeline(ProofOptions::default())
        .run(&request(&secrets, leaves))
        .unwrap();

    assert_eq!(proof.membership.leaf_index, 3);
    assert_eq!(proof.artifact.proof.len(), 256);
    assert!(backend().verify(&proof.artifact).unwrap());
}

#[test]
fn missing_deposit_fails_without_proof() {
    let (secrets, _) = deposit(1);
    let others = vec![deposit(2).1, deposit(3).1];

    let err = pipeline(deterministic())
        .run(&request(&secrets, others))
        .unwrap_err();

    assert_eq!(err.stage, Stage::DeriveMembershipProof);
    assert_eq!(err.kind, ProverError::LeafNotFound);
}

#[test]
fn malformed_nullifier_fails_at_collect_inputs() {
    let (_, leaf) = deposit(1);
    let request = ProofRequest::new("twelve", "1", RECIPIENT, vec![leaf]);

    let err = pipeline(deterministic()).run(&request).unwrap_err();
    assert_eq!(err.stage, Stage::CollectInputs);
    assert_eq!(err.code(), "invalid_field_encoding");
}

#[test]
fn deterministic_runs_are_byte_identical() {
    let (secrets, leaf) = deposit(4);
    let leaves = vec![deposit(5).1, leaf];
    let pipeline = pipeline(deterministic());

    let first = pipeline.run_encoded(&request(&secrets, leaves.clone())).unwrap();
    let second = pipeline.run_encoded(&request(&secrets, leaves)).unwrap();

    assert_eq!(first, second);
}

#[test]
fn transcript_hash_changes_deterministic_proof() {
    let (secrets, leaf) = deposit(4);
    let keccak = pipeline(deterministic())
        .run(&request(&secrets, vec![leaf.clone()]))
        .unwrap();
    let sha = pipeline(ProofOptions {
        transcript_hash: TranscriptHash::Sha256,
        deterministic: true,
    })
    .run(&request(&secrets, vec![leaf]))
    .unwrap();

    assert_ne!(keccak.artifact.proof, sha.artifact.proof);
    assert_eq!(keccak.artifact.public_inputs, sha.artifact.public_inputs);
    assert!(backend().verify(&sha.artifact).unwrap());
}

#[test]
fn randomized_runs_differ_but_both_verify() {
    let (secrets, leaf) = deposit(8);
    let pipeline = pipeline(ProofOptions::default());

    let first = pipeline.run(&request(&secrets, vec![leaf.clone()])).unwrap();
    let second = pipeline.run(&request(&secrets, vec![leaf])).unwrap();

    assert_ne!(first.artifact.proof, second.artifact.proof);
    assert_eq!(first.artifact.public_inputs, second.artifact.public_inputs);
    assert!(verify_payload(backend(), &first.encode()).unwrap());
    assert!(verify_payload(backend(), &second.encode()).unwrap());
}

#[test]
fn payload_bound_to_recipient() {
    let (secrets, leaf) = deposit(9);
    let proof = pipeline(deterministic())
        .run(&request(&secrets, vec![leaf]))
        .unwrap();

    let mut redirected = proof.artifact.clone();
    redirected.public_inputs[2] = Fr::from(0x2222u64);
    assert!(!backend().verify(&redirected).unwrap());

    let mut tampered = ProofArtifact::decode(&proof.encode()).unwrap();
    tampered.public_inputs[1] += Fr::from(1u64);
    assert!(!verify_payload(backend(), &tampered.encode()).unwrap());
}

#[test]
fn inverted_direction_bits_fail_circuit_execution() {
    let scheme = CommitmentScheme::new(PoseidonHasher::new());
    let secrets = SecretPair::new(Fr::from(10u64), Fr::from(20u64));
    let commitment = scheme.commit(&secrets).to_field();
    let tree = MerkleTree::build(DEPTH, PoseidonHasher::new(), &[Fr::from(1u64), commitment])
        .unwrap();
    let membership = tree.prove_membership(&commitment).unwrap();

    let input = WitnessInput {
        root: membership.root,
        nullifier_hash: scheme.nullifier_hash_of(&secrets.nullifier).to_field(),
        recipient: Fr::from(1u64),
        nullifier: secrets.nullifier,
        secret: secrets.secret,
        merkle_proof: membership.path_elements.clone(),
        is_valid: membership.path_indices.iter().map(|bit| !bit).collect(),
    };

    let err = R1csExecutor::new(DEPTH).execute(&input).unwrap_err();
    assert_eq!(err.code(), "witness_execution");
}

#[test]
fn depth_mismatch_is_rejected_by_backend() {
    let (secrets, leaf) = deposit(1);
    let pipeline = ProofPipeline::new(
        PoseidonHasher::new(),
        R1csExecutor::new(DEPTH + 1),
        backend(),
    );

    let err = pipeline.run(&request(&secrets, vec![leaf])).unwrap_err();
    assert_eq!(err.stage, Stage::GenerateProof);
    assert_eq!(
        err.kind,
        ProverError::DepthMismatch {
            expected: DEPTH,
            actual: DEPTH + 1
        }
    );
}
