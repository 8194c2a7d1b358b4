//! # Triple-Lock Cipher Suite
//!
//! Pure encode/decode primitives. No search, no scoring.
//!
//! - **Caesar**: alphabetic shift, case preserved, everything else untouched
//! - **Transposition**: row-major grid, columns read out in key order, no padding
//! - **RSA**: textbook RSA over UTF-8 byte blocks
//! - **TripleLock**: `RSA(Transposition(Caesar(plaintext)))`
//!
//! ```rust,ignore
//! use triplelock_cipher::{Caesar, Transposition};
//! use triplelock_core::{ShiftKey, TransKey};
//!
//! let shifted = Caesar::encrypt("HELLO", ShiftKey::new(3));
//! assert_eq!(shifted, "KHOOR");
//!
//! let key = TransKey::from_keyword("ZEBRA")?;
//! let scrambled = Transposition::encrypt("ATTACK AT DAWN", &key);
//! assert_eq!(Transposition::decrypt(&scrambled, &key), "ATTACK AT DAWN");
//! ```

pub mod caesar;
pub mod number;
pub mod rsa;
pub mod transposition;
pub mod triple;

pub use caesar::Caesar;
pub use rsa::{Rsa, RsaKeyPair, Strength};
pub use transposition::Transposition;
pub use triple::TripleLock;

pub use triplelock_core::{Error, Result};
