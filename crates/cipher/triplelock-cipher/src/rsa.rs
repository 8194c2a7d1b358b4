//! Textbook RSA
//!
//! No padding. Plaintext is UTF-8 encoded and cut into big-endian blocks one
//! byte shorter than the modulus, so every block is below `n`:
//!
//! ```text
//! bits(n) = 32  ->  4 byte modulus  ->  3 byte blocks
//! "HELLO"  ->  [48 45 4C] [4C 4F]  ->  m = 0x48454C, 0x4C4F  ->  c = m^e mod n
//! ```
//!
//! Key sizes are a teaching knob. Weak keys factor in milliseconds; strong
//! keys are expected to defeat the factoring attack.

use num_bigint::{BigUint, RandBigInt};
use num_traits::{One, ToPrimitive, Zero};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::number::{gcd, mod_inverse, random_prime};
use triplelock_core::{Error, Result};

/// Conventional public exponent
pub const PUBLIC_EXPONENT: u32 = 65_537;

/// Smallest modulus that still fits one byte per block
pub const MIN_MODULUS_BITS: u64 = 16;

/// Key strength selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strength {
    Weak,
    #[default]
    Strong,
}

impl Strength {
    /// Pick the configured modulus size for this strength.
    pub fn modulus_bits(self, weak_bits: u64, strong_bits: u64) -> u64 {
        match self {
            Strength::Weak => weak_bits,
            Strength::Strong => strong_bits,
        }
    }
}

impl FromStr for Strength {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "weak" => Ok(Strength::Weak),
            "strong" => Ok(Strength::Strong),
            other => Err(Error::InvalidKey(format!(
                "strength must be 'weak' or 'strong', got '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for Strength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strength::Weak => write!(f, "weak"),
            Strength::Strong => write!(f, "strong"),
        }
    }
}

/// Public `(e, n)` and private `(d, n)` halves of one key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RsaKeyPair {
    pub e: BigUint,
    pub d: BigUint,
    pub n: BigUint,
}

impl RsaKeyPair {
    /// Fresh key with a modulus of exactly `bits` bits.
    pub fn generate(bits: u64) -> Result<Self> {
        Self::generate_with(bits, &mut rand::thread_rng())
    }

    pub fn generate_with<R: Rng + ?Sized>(bits: u64, rng: &mut R) -> Result<Self> {
        if bits < MIN_MODULUS_BITS {
            return Err(Error::InvalidKey(format!(
                "modulus must be at least {} bits, got {}",
                MIN_MODULUS_BITS, bits
            )));
        }

        let p_bits = bits / 2;
        let q_bits = bits - p_bits;
        let p = random_prime(p_bits, rng);
        let q = loop {
            let q = random_prime(q_bits, rng);
            if q != p {
                break q;
            }
        };

        let n = &p * &q;
        let phi = (&p - 1u32) * (&q - 1u32);

        let mut e = BigUint::from(PUBLIC_EXPONENT);
        if e >= phi || !gcd(&e, &phi).is_one() {
            // Tiny moduli: phi can be below 65537 or share a factor with it
            let three = BigUint::from(3u32);
            e = loop {
                let candidate = rng.gen_biguint_range(&three, &phi);
                if gcd(&candidate, &phi).is_one() {
                    break candidate;
                }
            };
        }

        let d = mod_inverse(&e, &phi)?;
        tracing::debug!("Generated {}-bit RSA key", n.bits());

        Ok(Self { e, d, n })
    }

    pub fn public(&self) -> (&BigUint, &BigUint) {
        (&self.e, &self.n)
    }

    pub fn private(&self) -> (&BigUint, &BigUint) {
        (&self.d, &self.n)
    }
}

pub struct Rsa;

impl Rsa {
    /// Bytes per plaintext block for modulus `n`.
    pub fn block_size(n: &BigUint) -> usize {
        let modulus_bytes = n.bits().div_ceil(8) as usize;
        modulus_bytes.saturating_sub(1).max(1)
    }

    pub fn encrypt(plaintext: &str, e: &BigUint, n: &BigUint) -> Result<Vec<BigUint>> {
        Self::check_modulus(n)?;
        let block_size = Self::block_size(n);

        plaintext
            .as_bytes()
            .chunks(block_size)
            .map(|chunk| {
                let m = BigUint::from_bytes_be(chunk);
                if &m >= n {
                    return Err(Error::EncodingTooLarge {
                        block: m.to_string(),
                        modulus: n.to_string(),
                    });
                }
                Ok(m.modpow(e, n))
            })
            .collect()
    }

    /// Decrypt blocks, dropping byte sequences that are not valid UTF-8.
    pub fn decrypt(blocks: &[BigUint], d: &BigUint, n: &BigUint) -> Result<String> {
        Self::check_modulus(n)?;

        let mut bytes = Vec::with_capacity(blocks.len() * Self::block_size(n));
        for c in blocks {
            if c >= n {
                return Err(Error::InvalidCiphertext(format!(
                    "block {} is not below n = {}",
                    c, n
                )));
            }
            let m = c.modpow(d, n);
            if !m.is_zero() {
                bytes.extend(m.to_bytes_be());
            }
        }

        Ok(utf8_skipping_invalid(&bytes))
    }

    /// Space-separated decimal blocks, the wire form of RSA ciphertext.
    pub fn format_blocks(blocks: &[BigUint]) -> String {
        blocks
            .iter()
            .map(|b| b.to_string())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Parse whitespace-separated decimal blocks. Any other token is an error.
    pub fn parse_blocks(text: &str) -> Result<Vec<BigUint>> {
        let blocks = text
            .split_whitespace()
            .map(|token| {
                token.parse::<BigUint>().map_err(|_| {
                    Error::InvalidCiphertext(format!("'{}' is not a decimal integer", token))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        if blocks.is_empty() {
            return Err(Error::InvalidCiphertext("no ciphertext blocks".into()));
        }
        Ok(blocks)
    }

    /// Keep only the all-digit tokens. Lets pasted output with labels attached
    /// still be attacked.
    pub fn sanitize_blocks(text: &str) -> Vec<BigUint> {
        text.split_whitespace()
            .filter(|token| token.bytes().all(|b| b.is_ascii_digit()))
            .filter_map(|token| token.parse::<BigUint>().ok())
            .collect()
    }

    fn check_modulus(n: &BigUint) -> Result<()> {
        if n.to_u32().is_some_and(|small| small < 2) {
            return Err(Error::InvalidKey(format!("modulus must be at least 2, got {}", n)));
        }
        Ok(())
    }
}

/// Decode UTF-8, skipping invalid sequences rather than replacing them.
fn utf8_skipping_invalid(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len());
    for chunk in bytes.utf8_chunks() {
        out.push_str(chunk.valid());
    }
    out
}
