//! Deposit Commitments
//!
//! A depositor samples a secret pair and publishes only its commitment:
//!
//! ```text
//! commitment = H(nullifier, secret)
//! ```
//!
//! The argument order is fixed: the withdraw circuit hashes `nullifier` first.
//! Swapping it still yields a "valid" local commitment that no proof will
//! ever verify against.

use std::fmt;

use ark_bn254::Fr;
use ark_ff::UniformRand;
use obscura_field::{self as field, Bytes32, FieldError, abi};
use rand::{CryptoRng, RngCore, rngs::OsRng};

use crate::hasher::Hasher;
use crate::nullifier::NullifierHash;

/// The depositor's private pair. Never persisted by this crate.
#[derive(Clone, PartialEq, Eq)]
pub struct SecretPair {
    pub nullifier: Fr,
    pub secret: Fr,
}

impl SecretPair {
    pub fn new(nullifier: Fr, secret: Fr) -> Self {
        Self { nullifier, secret }
    }

    /// Sample a fresh pair from the operating system CSPRNG.
    pub fn generate() -> Self {
        Self::generate_with(&mut OsRng)
    }

    /// Sample a pair, each element uniform in `[0, modulus)`.
    pub fn generate_with<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        Self {
            nullifier: Fr::rand(rng),
            secret: Fr::rand(rng),
        }
    }

    /// Parse a pair from its decimal (or `0x` hex) string form.
    pub fn from_strings(nullifier: &str, secret: &str) -> Result<Self, FieldError> {
        Ok(Self {
            nullifier: field::decode_str(nullifier)?,
            secret: field::decode_str(secret)?,
        })
    }
}

impl fmt::Debug for SecretPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretPair")
            .field("nullifier", &"<redacted>")
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// A deposit commitment (a Merkle leaf)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Commitment(pub Fr);

impl Commitment {
    pub fn to_field(&self) -> Fr {
        self.0
    }

    /// 32-byte big-endian encoding
    pub fn to_bytes(&self) -> Bytes32 {
        field::encode(&self.0)
    }
}

/// Commitment scheme over an arbitrary [`Hasher`]
#[derive(Debug, Clone, Default)]
pub struct CommitmentScheme<H> {
    hasher: H,
}

impl<H: Hasher> CommitmentScheme<H> {
    pub fn new(hasher: H) -> Self {
        Self { hasher }
    }

    pub fn hasher(&self) -> &H {
        &self.hasher
    }

    /// `H(nullifier, secret)`
    pub fn commitment_of(&self, nullifier: &Fr, secret: &Fr) -> Commitment {
        Commitment(self.hasher.hash2(nullifier, secret))
    }

    /// `H(nullifier)`
    pub fn nullifier_hash_of(&self, nullifier: &Fr) -> NullifierHash {
        NullifierHash(self.hasher.hash1(nullifier))
    }

    pub fn commit(&self, pair: &SecretPair) -> Commitment {
        self.commitment_of(&pair.nullifier, &pair.secret)
    }

    /// Generate a fresh deposit: new secrets plus their commitment.
    pub fn new_deposit(&self) -> Deposit {
        self.deposit(SecretPair::generate())
    }

    pub fn deposit(&self, secrets: SecretPair) -> Deposit {
        Deposit {
            commitment: self.commit(&secrets),
            secrets,
        }
    }
}

/// Output of a commitment request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deposit {
    pub commitment: Commitment,
    pub secrets: SecretPair,
}

impl Deposit {
    /// `abi.encode(bytes32 commitment, bytes32 nullifier, bytes32 secret)`
    pub fn encode(&self) -> Vec<u8> {
        abi::encode_triple([
            self.commitment.to_bytes(),
            field::encode(&self.secrets.nullifier),
            field::encode(&self.secrets.secret),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hasher::PoseidonHasher;
    use rand::{SeedableRng, rngs::StdRng};

    fn scheme() -> CommitmentScheme<PoseidonHasher> {
        CommitmentScheme::new(PoseidonHasher::new())
    }

    #[test]
    fn test_commitment_deterministic() {
        let scheme = scheme();
        let pair = SecretPair::new(Fr::from(1u64), Fr::from(2u64));

        assert_eq!(scheme.commit(&pair), scheme.commit(&pair));
        assert_eq!(
            scheme.nullifier_hash_of(&pair.nullifier),
            scheme.nullifier_hash_of(&pair.nullifier)
        );
    }

    #[test]
    fn test_commitment_argument_order() {
        let scheme = scheme();
        let n = Fr::from(1u64);
        let s = Fr::from(2u64);

        assert_eq!(
            scheme.commitment_of(&n, &s).to_field(),
            scheme.hasher().hash2(&n, &s)
        );
        assert_ne!(scheme.commitment_of(&n, &s), scheme.commitment_of(&s, &n));
    }

    #[test]
    fn test_commitment_binding() {
        let scheme = scheme();
        let c1 = scheme.commitment_of(&Fr::from(1u64), &Fr::from(2u64));
        let c2 = scheme.commitment_of(&Fr::from(1u64), &Fr::from(3u64));

        assert_ne!(c1, c2, "different secrets should produce different commitments");
    }

    #[test]
    fn test_nullifier_hash_differs_from_commitment() {
        let scheme = scheme();
        let pair = SecretPair::new(Fr::from(5u64), Fr::from(0u64));

        assert_ne!(
            scheme.commit(&pair).to_field(),
            scheme.nullifier_hash_of(&pair.nullifier).to_field()
        );
    }

    #[test]
    fn test_generate_uses_rng() {
        let mut rng = StdRng::seed_from_u64(9);
        let a = SecretPair::generate_with(&mut rng);
        let b = SecretPair::generate_with(&mut rng);

        assert_ne!(a, b);
        assert_ne!(a.nullifier, a.secret);
        assert_ne!(SecretPair::generate(), SecretPair::generate());
    }

    #[test]
    fn test_deposit_encoding() {
        let scheme = scheme();
        let pair = SecretPair::new(Fr::from(1u64), Fr::from(2u64));
        let deposit = scheme.deposit(pair);
        let encoded = deposit.encode();

        assert_eq!(encoded.len(), 96);
        assert_eq!(&encoded[..32], &deposit.commitment.to_bytes());
        assert_eq!(encoded[63], 1);
        assert_eq!(encoded[95], 2);
    }

    #[test]
    fn test_from_strings() {
        let pair = SecretPair::from_strings("12", "0x0d").unwrap();
        assert_eq!(pair.nullifier, Fr::from(12u64));
        assert_eq!(pair.secret, Fr::from(13u64));

        assert!(SecretPair::from_strings("not-a-number", "1").is_err());
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let pair = SecretPair::new(Fr::from(123456789u64), Fr::from(987654321u64));
        let printed = format!("{pair:?}");

        assert!(!printed.contains("123456789"));
        assert!(!printed.contains("987654321"));
    }
}
