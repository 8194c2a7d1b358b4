//! # Triple-Lock Core
//!
//! Value types shared by every layer of the demonstrator.
//!
//! ```text
//! PLAINTEXT ──Caesar(shift)──▶ ──Transposition(key)──▶ ──RSA(e, n)──▶ CIPHERTEXT
//!     ▲                                                                  │
//!     └──── Caesar attack ◀── Transposition attack ◀── RSA factoring ◀───┘
//! ```
//!
//! Keys ([`ShiftKey`], [`TransKey`]), ranked attack output ([`Candidate`],
//! [`AttackResult`]) and the [`Error`] taxonomy live here so the cipher,
//! analysis and web crates agree on them.

pub mod candidate;
pub mod key;

pub use candidate::{AttackResult, Candidate, ScoreDetails};
pub use key::{ShiftKey, TransKey, SEARCH_KEY_LEN_CAP};

/// Default ceiling on the size of RSA moduli taken from callers
pub const MAX_MODULUS_BITS: u64 = 2048;

/// Result type for triple-lock operations
pub type Result<T> = std::result::Result<T, Error>;

/// Every failure the ciphers, breakers and pipeline can report.
///
/// None of these are fatal: callers turn them into per-request values.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    #[error("Message block {block} does not fit under modulus n = {modulus}")]
    EncodingTooLarge { block: String, modulus: String },

    #[error("Invalid ciphertext: {0}")]
    InvalidCiphertext(String),

    #[error("No modular inverse: gcd(e, phi) = {gcd}, so e has no inverse mod phi")]
    NoModularInverse { gcd: String },

    #[error("Could not factorize n: budget exhausted after {iterations} iterations in {elapsed_ms} ms")]
    FactorizationTimeout { iterations: u64, elapsed_ms: u128 },

    #[error("Invalid modulus: {0}")]
    InvalidModulus(String),

    #[error("No {0} candidates found")]
    NoCandidates(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Search aborted: {0}")]
    SearchAborted(String),
}

impl Error {
    /// Render as the `FAILED: ...` status string the front end matches on.
    pub fn failed(&self) -> String {
        format!("FAILED: {}", self)
    }
}
