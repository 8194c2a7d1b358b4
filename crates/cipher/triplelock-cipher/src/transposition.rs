//! Columnar transposition
//!
//! Text is written row by row into `key.len()` columns and read out column by
//! column in the key's order. Every character is moved, spaces and punctuation
//! included. The last row may be short; nothing is padded, so decryption
//! recomputes which columns are one character shorter.
//!
//! ```text
//! ATTACK AT DAWN, key ZEBRA -> read order [4, 2, 1, 3, 0]
//!
//!   col: 0 1 2 3 4
//!        A T T A C
//!        K _ A T _
//!        D A W N
//!
//!   read 4,2,1,3,0 -> "C _" "TAW" "T_A" "ATN" "AKD" -> "C TAWT AATNAKD"
//! ```

use triplelock_core::TransKey;

pub struct Transposition;

impl Transposition {
    pub fn encrypt(input: &str, key: &TransKey) -> String {
        let chars: Vec<char> = input.chars().collect();
        let mut out = Vec::with_capacity(chars.len());
        Self::encrypt_chars(&chars, key.columns(), &mut out);
        out.into_iter().collect()
    }

    pub fn decrypt(input: &str, key: &TransKey) -> String {
        let chars: Vec<char> = input.chars().collect();
        let mut out = Vec::with_capacity(chars.len());
        Self::decrypt_chars(&chars, key.columns(), &mut out);
        out.into_iter().collect()
    }

    /// Encrypt into a reusable buffer. `order` must be a permutation.
    pub fn encrypt_chars(input: &[char], order: &[usize], out: &mut Vec<char>) {
        out.clear();
        let cols = order.len();
        if cols == 0 {
            out.extend_from_slice(input);
            return;
        }
        for &col in order {
            out.extend(input.iter().skip(col).step_by(cols));
        }
    }

    /// Decrypt into a reusable buffer. The breaker calls this once per
    /// candidate permutation, so it avoids per-call `String` work.
    pub fn decrypt_chars(input: &[char], order: &[usize], out: &mut Vec<char>) {
        out.clear();
        let cols = order.len();
        let len = input.len();
        if cols == 0 || len == 0 {
            out.extend_from_slice(input);
            return;
        }

        let rows = len.div_ceil(cols);
        let full_cols = len - (rows - 1) * cols;

        // Offset of each grid column inside the ciphertext
        let mut starts = vec![0usize; cols];
        let mut offset = 0;
        for &col in order {
            starts[col] = offset;
            offset += if col < full_cols { rows } else { rows - 1 };
        }

        out.extend((0..len).map(|i| input[starts[i % cols] + i / cols]));
    }
}
