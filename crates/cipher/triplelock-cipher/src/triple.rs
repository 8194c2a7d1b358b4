//! Triple-lock composition
//!
//! ```text
//! encrypt:  plaintext --Caesar(shift)--> --Transposition(key)--> --RSA(e, n)--> blocks
//! decrypt:  blocks --RSA(d, n)--> --Transposition^-1(key)--> --Caesar^-1(shift)--> plaintext
//! ```
//!
//! The attack in `triplelock-breaker` peels the layers in the same order as
//! `decrypt`, without the keys.

use num_bigint::BigUint;

use crate::{Caesar, Rsa, Transposition};
use triplelock_core::{Result, ShiftKey, TransKey};

pub struct TripleLock;

impl TripleLock {
    pub fn encrypt(
        plaintext: &str,
        shift: ShiftKey,
        trans_key: &TransKey,
        e: &BigUint,
        n: &BigUint,
    ) -> Result<Vec<BigUint>> {
        let shifted = Caesar::encrypt(plaintext, shift);
        let scrambled = Transposition::encrypt(&shifted, trans_key);
        Rsa::encrypt(&scrambled, e, n)
    }

    pub fn decrypt(
        blocks: &[BigUint],
        shift: ShiftKey,
        trans_key: &TransKey,
        d: &BigUint,
        n: &BigUint,
    ) -> Result<String> {
        let scrambled = Rsa::decrypt(blocks, d, n)?;
        let shifted = Transposition::decrypt(&scrambled, trans_key);
        Ok(Caesar::decrypt(&shifted, shift))
    }
}
