//! Proving Backend
//!
//! Groth16 over BN254. Proofs are serialized in the layout expected by the
//! EVM pairing precompiles so they can be passed to an on-chain verifier
//! unchanged:
//!
//! ```text
//! offset  size  field
//!      0    32  A.x
//!     32    32  A.y
//!     64    32  B.x.c1    (Fq2 coefficients: imaginary part first)
//!     96    32  B.x.c0
//!    128    32  B.y.c1
//!    160    32  B.y.c0
//!    192    32  C.x
//!    224    32  C.y
//! ```
//!
//! All words are big-endian. The point at infinity is encoded as zeros.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use ark_bn254::{Bn254, Fq, Fq2, Fr, G1Affine, G2Affine};
use ark_ff::Zero;
use ark_groth16::{Groth16, Proof, ProvingKey, VerifyingKey};
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};
use ark_snark::SNARK;
use obscura_field::{self as field, Bytes32, abi};
use rand::{CryptoRng, RngCore, SeedableRng, rngs::OsRng, rngs::StdRng};
use sha2::{Digest, Sha256};
use sha3::Keccak256;

use crate::circuit::{CircuitShape, WithdrawCircuit};
use crate::constants::{DETERMINISTIC_PROVING_DOMAIN, PROOF_BYTES, PUBLIC_INPUTS};
use crate::errors::{ProverError, Result};
use crate::executor::untraced;
use crate::witness::{Witness, WitnessInput};

/// Hash the on-chain verifier expects for public-input binding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TranscriptHash {
    #[default]
    Keccak256,
    Sha256,
}

impl TranscriptHash {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Keccak256 => "keccak256",
            Self::Sha256 => "sha256",
        }
    }

    pub fn digest(&self, data: &[u8]) -> [u8; 32] {
        match self {
            Self::Keccak256 => Keccak256::digest(data).into(),
            Self::Sha256 => Sha256::digest(data).into(),
        }
    }
}

impl fmt::Display for TranscriptHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TranscriptHash {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "keccak256" | "keccak" => Ok(Self::Keccak256),
            "sha256" => Ok(Self::Sha256),
            other => Err(format!(
                "unknown transcript hash '{other}' (expected keccak256 or sha256)"
            )),
        }
    }
}

/// Options passed to the backend with each witness
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProofOptions {
    pub transcript_hash: TranscriptHash,
    /// Derive proving randomness from the witness instead of the OS RNG.
    /// Identical inputs then give byte-identical proofs.
    pub deterministic: bool,
}

/// Proof bytes plus the public inputs they verify against
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProofArtifact {
    pub proof: Vec<u8>,
    pub public_inputs: Vec<Fr>,
}

impl ProofArtifact {
    /// `abi.encode(bytes proof, bytes32[] publicInputs)`
    pub fn encode(&self) -> Vec<u8> {
        let words: Vec<Bytes32> = self.public_inputs.iter().map(field::encode).collect();
        abi::encode_bytes_and_words(&self.proof, &words)
    }

    pub fn decode(payload: &[u8]) -> Result<Self> {
        let (proof, words) = abi::decode_bytes_and_words(payload)?;
        let public_inputs = words
            .iter()
            .map(|word| field::decode_bytes(word))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(Self {
            proof,
            public_inputs,
        })
    }
}

/// Turns a checked witness into a succinct proof
pub trait ProofBackend {
    fn prove(&self, witness: &Witness, options: &ProofOptions) -> Result<ProofArtifact>;

    fn verify(&self, artifact: &ProofArtifact) -> Result<bool>;

    /// Hash of the verification key (for the on-chain verifier)
    fn verification_key_hash(&self) -> [u8; 32];
}

impl<B: ProofBackend + ?Sized> ProofBackend for &B {
    fn prove(&self, witness: &Witness, options: &ProofOptions) -> Result<ProofArtifact> {
        (**self).prove(witness, options)
    }

    fn verify(&self, artifact: &ProofArtifact) -> Result<bool> {
        (**self).verify(artifact)
    }

    fn verification_key_hash(&self) -> [u8; 32] {
        (**self).verification_key_hash()
    }
}

/// Groth16 backend using arkworks and the BN254 curve
pub struct Groth16Backend {
    depth: usize,
    proving_key: ProvingKey<Bn254>,
    verifying_key: VerifyingKey<Bn254>,
    vk_hash: [u8; 32],
}

impl Groth16Backend {
    /// Run a circuit-specific setup for a tree of `depth` levels.
    pub fn setup<R: RngCore + CryptoRng>(depth: usize, rng: &mut R) -> Result<Self> {
        let start = std::time::Instant::now();
        let (proving_key, verifying_key) = untraced(|| {
            Groth16::<Bn254>::circuit_specific_setup(WithdrawCircuit::blank(depth), rng)
        })
        .map_err(|e| ProverError::ProvingBackend(format!("setup failed: {e}")))?;
        tracing::info!(
            depth,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "groth16 setup complete"
        );

        Self::from_keys(depth, proving_key, verifying_key)
    }

    /// Create a backend from compressed keys
    pub fn from_bytes(depth: usize, pk_bytes: &[u8], vk_bytes: &[u8]) -> Result<Self> {
        let proving_key = ProvingKey::<Bn254>::deserialize_compressed(pk_bytes)
            .map_err(|e| ProverError::Serialization(format!("proving key: {e}")))?;
        let verifying_key = VerifyingKey::<Bn254>::deserialize_compressed(vk_bytes)
            .map_err(|e| ProverError::Serialization(format!("verifying key: {e}")))?;

        Self::from_keys(depth, proving_key, verifying_key)
    }

    /// Load compressed keys from files
    pub fn from_files(depth: usize, pk_path: &Path, vk_path: &Path) -> Result<Self> {
        let pk_bytes = std::fs::read(pk_path).map_err(|e| {
            ProverError::Serialization(format!(
                "failed to read proving key from {}: {e}",
                pk_path.display()
            ))
        })?;
        let vk_bytes = std::fs::read(vk_path).map_err(|e| {
            ProverError::Serialization(format!(
                "failed to read verifying key from {}: {e}",
                vk_path.display()
            ))
        })?;
        Self::from_bytes(depth, &pk_bytes, &vk_bytes)
    }

    fn from_keys(
        depth: usize,
        proving_key: ProvingKey<Bn254>,
        verifying_key: VerifyingKey<Bn254>,
    ) -> Result<Self> {
        // gamma_abc holds one base per public input plus the constant term
        let inputs = verifying_key.gamma_abc_g1.len().saturating_sub(1);
        if inputs != PUBLIC_INPUTS {
            return Err(ProverError::Serialization(format!(
                "verifying key has {inputs} public inputs, expected {PUBLIC_INPUTS}"
            )));
        }
        if proving_key.vk != verifying_key {
            return Err(ProverError::Serialization(
                "proving key and verifying key come from different setups".into(),
            ));
        }

        let shape = circuit_shape(depth)?;
        let key_witnesses = proving_key.l_query.len();
        if proving_key.a_query.len() != shape.num_variables()
            || key_witnesses != shape.witness_variables
        {
            return Err(match key_depth(key_witnesses)? {
                Some(actual) => ProverError::DepthMismatch {
                    expected: depth,
                    actual,
                },
                None => ProverError::Serialization(format!(
                    "proving key has {key_witnesses} witness variables, \
                     the depth-{depth} withdraw circuit has {}",
                    shape.witness_variables
                )),
            });
        }

        let vk_hash = compute_vk_hash(&verifying_key)?;
        Ok(Self {
            depth,
            proving_key,
            verifying_key,
            vk_hash,
        })
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn verifying_key(&self) -> &VerifyingKey<Bn254> {
        &self.verifying_key
    }

    /// Compressed `(proving_key, verifying_key)` bytes
    pub fn to_bytes(&self) -> Result<(Vec<u8>, Vec<u8>)> {
        let mut pk_bytes = Vec::new();
        self.proving_key
            .serialize_compressed(&mut pk_bytes)
            .map_err(|e| ProverError::Serialization(format!("proving key: {e}")))?;
        let mut vk_bytes = Vec::new();
        self.verifying_key
            .serialize_compressed(&mut vk_bytes)
            .map_err(|e| ProverError::Serialization(format!("verifying key: {e}")))?;
        Ok((pk_bytes, vk_bytes))
    }

    fn create_proof<R: RngCore + CryptoRng>(
        &self,
        input: &WitnessInput,
        rng: &mut R,
    ) -> Result<Proof<Bn254>> {
        untraced(|| {
            Groth16::<Bn254>::prove(&self.proving_key, WithdrawCircuit::from_input(input), rng)
        })
        .map_err(|e| ProverError::ProvingBackend(format!("proving failed: {e}")))
    }

    /// Seed for deterministic proving: domain tag, key hash, every assignment.
    fn deterministic_seed(&self, hash: TranscriptHash, input: &WitnessInput) -> [u8; 32] {
        let mut data = Vec::with_capacity(64 + (5 + 2 * input.depth()) * 32);
        data.extend_from_slice(DETERMINISTIC_PROVING_DOMAIN);
        data.extend_from_slice(&self.vk_hash);
        for value in [
            &input.root,
            &input.nullifier_hash,
            &input.recipient,
            &input.nullifier,
            &input.secret,
        ] {
            data.extend_from_slice(&field::encode(value));
        }
        for (sibling, is_left) in input.merkle_proof.iter().zip(&input.is_valid) {
            data.extend_from_slice(&field::encode(sibling));
            data.push(u8::from(*is_left));
        }
        hash.digest(&data)
    }
}

impl ProofBackend for Groth16Backend {
    fn prove(&self, witness: &Witness, options: &ProofOptions) -> Result<ProofArtifact> {
        if witness.depth() != self.depth {
            return Err(ProverError::DepthMismatch {
                expected: self.depth,
                actual: witness.depth(),
            });
        }

        let start = std::time::Instant::now();
        let input = witness.input();
        let proof = if options.deterministic {
            let seed = self.deterministic_seed(options.transcript_hash, input);
            self.create_proof(input, &mut StdRng::from_seed(seed))?
        } else {
            self.create_proof(input, &mut OsRng)?
        };

        let proof = proof_to_evm_bytes(&proof);
        tracing::info!(
            bytes = proof.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "generated groth16 proof"
        );

        Ok(ProofArtifact {
            proof,
            public_inputs: witness.public_inputs(),
        })
    }

    fn verify(&self, artifact: &ProofArtifact) -> Result<bool> {
        if artifact.public_inputs.len() != PUBLIC_INPUTS {
            return Ok(false);
        }
        let proof = proof_from_evm_bytes(&artifact.proof)?;

        Groth16::<Bn254>::verify(&self.verifying_key, &artifact.public_inputs, &proof)
            .map_err(|e| ProverError::ProvingBackend(format!("verification failed: {e}")))
    }

    fn verification_key_hash(&self) -> [u8; 32] {
        self.vk_hash
    }
}

fn circuit_shape(depth: usize) -> Result<CircuitShape> {
    untraced(|| WithdrawCircuit::shape(depth))
        .map_err(|e| ProverError::ProvingBackend(format!("circuit synthesis failed: {e}")))
}

/// Depth of the withdraw circuit with `witnesses` witness variables, if any.
/// Each tree level adds the same number of variables.
fn key_depth(witnesses: usize) -> Result<Option<usize>> {
    let one = circuit_shape(1)?.witness_variables;
    let per_level = circuit_shape(2)?.witness_variables.saturating_sub(one);
    match witnesses.checked_sub(one) {
        Some(extra) if per_level > 0 && extra % per_level == 0 => {
            Ok(Some(1 + extra / per_level))
        }
        _ => Ok(None),
    }
}

/// blake3 of the compressed verifying key
fn compute_vk_hash(vk: &VerifyingKey<Bn254>) -> Result<[u8; 32]> {
    let mut vk_bytes = Vec::new();
    vk.serialize_compressed(&mut vk_bytes)
        .map_err(|e| ProverError::Serialization(format!("verifying key: {e}")))?;
    Ok(*blake3::hash(&vk_bytes).as_bytes())
}

/// Serialize a proof in the EVM precompile layout (256 bytes)
pub fn proof_to_evm_bytes(proof: &Proof<Bn254>) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(PROOF_BYTES);
    push_g1(&mut bytes, &proof.a);
    push_g2(&mut bytes, &proof.b);
    push_g1(&mut bytes, &proof.c);
    bytes
}

/// Parse a proof from the EVM layout, rejecting points off the curve or
/// outside the prime-order subgroup.
pub fn proof_from_evm_bytes(bytes: &[u8]) -> Result<Proof<Bn254>> {
    if bytes.len() != PROOF_BYTES {
        return Err(ProverError::InvalidPayload(format!(
            "proof must be {PROOF_BYTES} bytes, got {}",
            bytes.len()
        )));
    }

    let words = bytes
        .chunks_exact(32)
        .map(field::decode_prime::<Fq>)
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| ProverError::InvalidPayload(format!("proof coordinate: {e}")))?;

    Ok(Proof {
        a: g1_from_coords(words[0], words[1])?,
        b: g2_from_coords(Fq2::new(words[3], words[2]), Fq2::new(words[5], words[4]))?,
        c: g1_from_coords(words[6], words[7])?,
    })
}

fn push_g1(out: &mut Vec<u8>, point: &G1Affine) {
    if point.infinity {
        out.extend_from_slice(&[0u8; 64]);
        return;
    }
    out.extend_from_slice(&field::encode_prime(&point.x));
    out.extend_from_slice(&field::encode_prime(&point.y));
}

fn push_g2(out: &mut Vec<u8>, point: &G2Affine) {
    if point.infinity {
        out.extend_from_slice(&[0u8; 128]);
        return;
    }
    for coordinate in [&point.x.c1, &point.x.c0, &point.y.c1, &point.y.c0] {
        out.extend_from_slice(&field::encode_prime(coordinate));
    }
}

fn g1_from_coords(x: Fq, y: Fq) -> Result<G1Affine> {
    if x.is_zero() && y.is_zero() {
        return Ok(G1Affine::identity());
    }
    let point = G1Affine::new_unchecked(x, y);
    if !point.is_on_curve() || !point.is_in_correct_subgroup_assuming_on_curve() {
        return Err(ProverError::InvalidPayload(
            "proof contains an invalid G1 point".into(),
        ));
    }
    Ok(point)
}

fn g2_from_coords(x: Fq2, y: Fq2) -> Result<G2Affine> {
    if x.is_zero() && y.is_zero() {
        return Ok(G2Affine::identity());
    }
    let point = G2Affine::new_unchecked(x, y);
    if !point.is_on_curve() || !point.is_in_correct_subgroup_assuming_on_curve() {
        return Err(ProverError::InvalidPayload(
            "proof contains an invalid G2 point".into(),
        ));
    }
    Ok(point)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ark_ec::CurveGroup;
    use ark_std::UniformRand;

    fn random_proof() -> Proof<Bn254> {
        let mut rng = ark_std::test_rng();
        Proof {
            a: ark_bn254::G1Projective::rand(&mut rng).into_affine(),
            b: ark_bn254::G2Projective::rand(&mut rng).into_affine(),
            c: ark_bn254::G1Projective::rand(&mut rng).into_affine(),
        }
    }

    #[test]
    fn test_evm_layout() {
        let proof = random_proof();
        let bytes = proof_to_evm_bytes(&proof);

        assert_eq!(bytes.len(), PROOF_BYTES);
        assert_eq!(&bytes[..32], &field::encode_prime(&proof.a.x));
        assert_eq!(&bytes[64..96], &field::encode_prime(&proof.b.x.c1));
        assert_eq!(&bytes[96..128], &field::encode_prime(&proof.b.x.c0));
        assert_eq!(&bytes[224..], &field::encode_prime(&proof.c.y));
        assert_eq!(proof_from_evm_bytes(&bytes).unwrap(), proof);
    }

    #[test]
    fn test_infinity_encodes_as_zeros() {
        let proof = Proof::<Bn254> {
            a: G1Affine::identity(),
            b: G2Affine::identity(),
            c: G1Affine::identity(),
        };
        let bytes = proof_to_evm_bytes(&proof);

        assert!(bytes.iter().all(|b| *b == 0));
        assert_eq!(proof_from_evm_bytes(&bytes).unwrap(), proof);
    }

    #[test]
    fn test_rejects_malformed_proofs() {
        let mut bytes = proof_to_evm_bytes(&random_proof());

        assert!(proof_from_evm_bytes(&bytes[..255]).is_err());

        // (1, 1) is not on y^2 = x^3 + 3
        bytes[..64].fill(0);
        bytes[31] = 1;
        bytes[63] = 1;
        assert!(matches!(
            proof_from_evm_bytes(&bytes),
            Err(ProverError::InvalidPayload(_))
        ));
    }

    #[test]
    fn test_transcript_hash_parse() {
        assert_eq!(
            "keccak256".parse::<TranscriptHash>().unwrap(),
            TranscriptHash::Keccak256
        );
        assert_eq!(
            "SHA256".parse::<TranscriptHash>().unwrap(),
            TranscriptHash::Sha256
        );
        assert!("blake2".parse::<TranscriptHash>().is_err());
        assert_eq!(TranscriptHash::default().to_string(), "keccak256");
    }

    #[test]
    fn test_transcript_hashes_differ() {
        let keccak = TranscriptHash::Keccak256.digest(b"obscura");
        let sha = TranscriptHash::Sha256.digest(b"obscura");
        assert_ne!(keccak, sha);
    }

    #[test]
    fn test_artifact_payload_roundtrip() {
        let artifact = ProofArtifact {
            proof: proof_to_evm_bytes(&random_proof()),
            public_inputs: vec![Fr::from(1u64), Fr::from(2u64), Fr::from(3u64)],
        };
        let payload = artifact.encode();

        assert_eq!(payload.len(), 64 + 32 + PROOF_BYTES + 32 + 3 * 32);
        assert_eq!(ProofArtifact::decode(&payload).unwrap(), artifact);
    }
}
