//! Obscura Field Codec
//!
//! Conversions between BN254 scalar field elements and the encodings used at
//! the system boundary.
//!
//! ```text
//!   "1234" / "0x04d2"  ──decode_str──┐
//!   0x-address         ──decode_address──►  Fr  ──encode──►  [u8; 32] (big-endian)
//!   [u8; 32]           ──decode_bytes──┘
//! ```
//!
//! Every decoder is strict: an input that is not the canonical encoding of a
//! value in `[0, modulus)` is rejected rather than reduced.

pub mod abi;

use ark_ff::{BigInteger, PrimeField};
use num_bigint::BigUint;
use thiserror::Error;

pub use ark_bn254::Fr;

/// One 32-byte big-endian word.
pub type Bytes32 = [u8; 32];

/// Width of an encoded field element.
pub const FIELD_BYTES: usize = 32;

/// Length of an Ethereum address in bytes.
const ADDRESS_BYTES: usize = 20;

/// Errors raised while decoding boundary values.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FieldError {
    /// Byte input of the wrong width
    #[error("invalid field encoding: expected {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    /// Integer is not below the field modulus
    #[error("invalid field encoding: value is not below the field modulus")]
    OutOfRange,

    /// String input is not a canonical integer
    #[error("invalid field encoding: {0}")]
    Malformed(String),

    /// ABI payload does not follow the canonical layout
    #[error("invalid ABI payload: {0}")]
    InvalidAbi(String),
}

/// Result type for codec operations
pub type Result<T> = std::result::Result<T, FieldError>;

/// The scalar field modulus as an integer.
pub fn modulus() -> BigUint {
    Fr::MODULUS.into()
}

/// Encode a scalar field element as a 32-byte big-endian word.
pub fn encode(value: &Fr) -> Bytes32 {
    encode_prime(value)
}

/// Decode a 32-byte big-endian word into a scalar field element.
pub fn decode_bytes(bytes: &[u8]) -> Result<Fr> {
    decode_prime(bytes)
}

/// Encode any 256-bit prime field element (scalar or base field) big-endian.
pub fn encode_prime<F: PrimeField>(value: &F) -> Bytes32 {
    let bytes = value.into_bigint().to_bytes_be();
    let mut out = [0u8; FIELD_BYTES];
    let take = bytes.len().min(FIELD_BYTES);
    out[FIELD_BYTES - take..].copy_from_slice(&bytes[bytes.len() - take..]);
    out
}

/// Decode a big-endian word into any 256-bit prime field, rejecting values
/// at or above the modulus.
pub fn decode_prime<F: PrimeField>(bytes: &[u8]) -> Result<F> {
    let word: &Bytes32 = bytes.try_into().map_err(|_| FieldError::InvalidLength {
        expected: FIELD_BYTES,
        actual: bytes.len(),
    })?;

    // from_be_bytes_mod_order reduces silently; a non-canonical input shows up
    // as a re-encoding mismatch.
    let value = F::from_be_bytes_mod_order(word);
    if encode_prime(&value) != *word {
        return Err(FieldError::OutOfRange);
    }
    Ok(value)
}

/// Convert an integer into a field element without reduction.
pub fn from_biguint(value: &BigUint) -> Result<Fr> {
    if *value >= modulus() {
        return Err(FieldError::OutOfRange);
    }
    Ok(Fr::from(value.clone()))
}

/// Encode an arbitrary integer as a field word, failing for values `>= modulus`.
pub fn encode_biguint(value: &BigUint) -> Result<Bytes32> {
    from_biguint(value).map(|f| encode(&f))
}

/// Decimal rendering of a field element (the form accepted by [`decode_str`]).
pub fn to_decimal(value: &Fr) -> String {
    BigUint::from(value.into_bigint()).to_string()
}

/// Decode a decimal string, or a `0x`-prefixed hex string of at most 64 digits.
pub fn decode_str(input: &str) -> Result<Fr> {
    let value = parse_uint(input)?;
    from_biguint(&value)
}

/// Decode a payout target.
///
/// A `0x`-prefixed 40-digit string is read as an Ethereum address (a 160-bit
/// big-endian integer). Anything else must be a field-decodable string.
pub fn decode_address(input: &str) -> Result<Fr> {
    match strip_hex_prefix(input) {
        Some(digits) if digits.len() == 2 * ADDRESS_BYTES => {
            let bytes = hex::decode(digits)
                .map_err(|e| FieldError::Malformed(format!("{input:?} is not an address: {e}")))?;
            let mut word = [0u8; FIELD_BYTES];
            word[FIELD_BYTES - ADDRESS_BYTES..].copy_from_slice(&bytes);
            decode_bytes(&word)
        }
        _ => decode_str(input),
    }
}

fn strip_hex_prefix(input: &str) -> Option<&str> {
    input
        .strip_prefix("0x")
        .or_else(|| input.strip_prefix("0X"))
}

fn parse_uint(input: &str) -> Result<BigUint> {
    let (digits, radix) = match strip_hex_prefix(input) {
        Some(hex_digits) => {
            if hex_digits.is_empty()
                || hex_digits.len() > 2 * FIELD_BYTES
                || !hex_digits.bytes().all(|b| b.is_ascii_hexdigit())
            {
                return Err(FieldError::Malformed(format!(
                    "{input:?} is not a hex integer"
                )));
            }
            (hex_digits, 16)
        }
        None => {
            if input.is_empty() || !input.bytes().all(|b| b.is_ascii_digit()) {
                return Err(FieldError::Malformed(format!(
                    "{input:?} is not a decimal integer"
                )));
            }
            (input, 10)
        }
    };

    BigUint::parse_bytes(digits.as_bytes(), radix)
        .ok_or_else(|| FieldError::Malformed(format!("{input:?} is not an integer")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ark_bn254::Fq;
    use ark_ff::UniformRand;

    fn max_element() -> Fr {
        -Fr::from(1u64)
    }

    #[test]
    fn test_roundtrip_edges() {
        for value in [Fr::from(0u64), Fr::from(1u64), Fr::from(u64::MAX), max_element()] {
            assert_eq!(decode_bytes(&encode(&value)).unwrap(), value);
            assert_eq!(decode_str(&to_decimal(&value)).unwrap(), value);
        }
    }

    #[test]
    fn test_roundtrip_random() {
        let mut rng = ark_std::test_rng();
        for _ in 0..32 {
            let value = Fr::rand(&mut rng);
            assert_eq!(decode_bytes(&encode(&value)).unwrap(), value);
        }
    }

    #[test]
    fn test_encoding_is_big_endian() {
        let word = encode(&Fr::from(0x0102u64));
        assert_eq!(word[30], 0x01);
        assert_eq!(word[31], 0x02);
        assert!(word[..30].iter().all(|b| *b == 0));
    }

    #[test]
    fn test_modulus_rejected() {
        let word: Vec<u8> = {
            let bytes = modulus().to_bytes_be();
            let mut padded = vec![0u8; FIELD_BYTES - bytes.len()];
            padded.extend(bytes);
            padded
        };
        assert_eq!(decode_bytes(&word), Err(FieldError::OutOfRange));
        assert_eq!(decode_bytes(&[0xffu8; 32]), Err(FieldError::OutOfRange));
        assert_eq!(
            decode_str(&modulus().to_string()),
            Err(FieldError::OutOfRange)
        );
        assert_eq!(encode_biguint(&modulus()), Err(FieldError::OutOfRange));

        let below = modulus() - 1u32;
        assert_eq!(encode_biguint(&below).unwrap(), encode(&max_element()));
    }

    #[test]
    fn test_wrong_length_rejected() {
        assert_eq!(
            decode_bytes(&[0u8; 31]),
            Err(FieldError::InvalidLength {
                expected: 32,
                actual: 31
            })
        );
        assert!(decode_bytes(&[0u8; 33]).is_err());
    }

    #[test]
    fn test_decode_str_forms() {
        assert_eq!(decode_str("1234").unwrap(), Fr::from(1234u64));
        assert_eq!(decode_str("0x04d2").unwrap(), Fr::from(1234u64));
        assert_eq!(decode_str("0X4D2").unwrap(), Fr::from(1234u64));
        assert_eq!(decode_str("0").unwrap(), Fr::from(0u64));
    }

    #[test]
    fn test_decode_str_malformed() {
        for input in ["", "abc", "-1", "+1", " 1", "1 ", "12a", "0x", "0xzz", "1.5"] {
            assert!(
                matches!(decode_str(input), Err(FieldError::Malformed(_))),
                "{input:?} should be malformed"
            );
        }
        let too_long = format!("0x{}", "0".repeat(65));
        assert!(decode_str(&too_long).is_err());
    }

    #[test]
    fn test_decode_address() {
        let address = "0x00000000000000000000000000000000000004D2";
        assert_eq!(decode_address(address).unwrap(), Fr::from(1234u64));

        let full = decode_address("0xffffffffffffffffffffffffffffffffffffffff").unwrap();
        let word = encode(&full);
        assert!(word[..12].iter().all(|b| *b == 0));
        assert!(word[12..].iter().all(|b| *b == 0xff));

        assert_eq!(decode_address("42").unwrap(), Fr::from(42u64));
        assert!(decode_address("0xg000000000000000000000000000000000000000").is_err());
    }

    #[test]
    fn test_base_field_roundtrip() {
        let mut rng = ark_std::test_rng();
        let value = Fq::rand(&mut rng);
        assert_eq!(decode_prime::<Fq>(&encode_prime(&value)).unwrap(), value);
    }
}
