//! Caesar shift cipher

use triplelock_core::ShiftKey;

pub struct Caesar;

impl Caesar {
    /// Shift ASCII letters forward by `key`, preserving case.
    pub fn encrypt(input: &str, key: ShiftKey) -> String {
        input.chars().map(|c| Self::shift_char(c, key.value())).collect()
    }

    pub fn decrypt(input: &str, key: ShiftKey) -> String {
        Self::encrypt(input, key.inverse())
    }

    /// Every shift applied as a decryption, shift 0 first.
    pub fn bruteforce(input: &str) -> Vec<(ShiftKey, String)> {
        ShiftKey::all()
            .map(|key| (key, Self::decrypt(input, key)))
            .collect()
    }

    #[inline]
    pub fn shift_char(c: char, shift: u8) -> char {
        if c.is_ascii_lowercase() {
            ((c as u8 - b'a' + shift) % 26 + b'a') as char
        } else if c.is_ascii_uppercase() {
            ((c as u8 - b'A' + shift) % 26 + b'A') as char
        } else {
            c
        }
    }
}
