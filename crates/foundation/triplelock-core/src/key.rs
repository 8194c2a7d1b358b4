//! Cipher keys
//!
//! Caesar shifts and columnar-transposition read orders.

use serde::{Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::{Error, Result};

/// Alphabet size for the shift cipher
pub const ALPHABET_LEN: i64 = 26;

/// Longest transposition key any search may be configured for.
/// 9! = 362 880 orders per ciphertext is the last tractable step.
pub const SEARCH_KEY_LEN_CAP: usize = 9;

// ═══════════════════════════════════════════════════════════
// SHIFT KEY
// ═══════════════════════════════════════════════════════════

/// Caesar shift, always reduced into `0..26`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct ShiftKey(u8);

impl ShiftKey {
    /// Reduce any integer shift modulo 26. Negative shifts wrap.
    pub fn new(shift: i64) -> Self {
        Self(shift.rem_euclid(ALPHABET_LEN) as u8)
    }

    pub fn value(self) -> u8 {
        self.0
    }

    /// The shift that undoes this one.
    pub fn inverse(self) -> Self {
        Self::new(-(self.0 as i64))
    }

    /// Every possible shift, smallest first.
    pub fn all() -> impl Iterator<Item = ShiftKey> {
        (0..ALPHABET_LEN).map(ShiftKey::new)
    }

    /// Coerce a float the way a permissive form field would: whole numbers only.
    pub fn from_f64(value: f64) -> Result<Self> {
        if value.is_finite() && value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
            Ok(Self::new(value as i64))
        } else {
            Err(Error::InvalidKey(format!("shift must be a whole number, got {}", value)))
        }
    }
}

impl FromStr for ShiftKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if let Ok(n) = s.parse::<i64>() {
            return Ok(Self::new(n));
        }
        match s.parse::<f64>() {
            Ok(f) => Self::from_f64(f),
            Err(_) => Err(Error::InvalidKey(format!("shift must be an integer, got '{}'", s))),
        }
    }
}

impl fmt::Display for ShiftKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for ShiftKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.0)
    }
}

// ═══════════════════════════════════════════════════════════
// TRANSPOSITION KEY
// ═══════════════════════════════════════════════════════════

/// Column read order for a columnar transposition.
///
/// `columns[i]` is the grid column read out `i`-th. Always a bijection on
/// `0..len`. Ordered by length first, then lexicographically, which is the
/// tie-break order used when ranking attack candidates.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TransKey {
    columns: Vec<usize>,
}

impl TransKey {
    /// Rank the keyword's characters; equal characters keep their position order.
    ///
    /// `"ZEBRA"` reads column 4 (A) first, then 2 (B), 1 (E), 3 (R), 0 (Z).
    pub fn from_keyword(keyword: &str) -> Result<Self> {
        let chars: Vec<char> = keyword.trim().chars().collect();
        if chars.is_empty() {
            return Err(Error::InvalidKey("transposition key must not be empty".into()));
        }

        let mut indexed: Vec<(usize, char)> = chars.into_iter().enumerate().collect();
        indexed.sort_by(|a, b| a.1.cmp(&b.1));
        Ok(Self {
            columns: indexed.into_iter().map(|(i, _)| i).collect(),
        })
    }

    /// Use an explicit read order. Must be a permutation of `0..len`.
    pub fn from_order(columns: Vec<usize>) -> Result<Self> {
        if columns.is_empty() {
            return Err(Error::InvalidKey("transposition key must not be empty".into()));
        }

        let mut seen = vec![false; columns.len()];
        for &c in &columns {
            if c >= columns.len() || seen[c] {
                return Err(Error::InvalidKey(format!(
                    "{:?} is not a permutation of 0..{}",
                    columns,
                    columns.len()
                )));
            }
            seen[c] = true;
        }

        Ok(Self { columns })
    }

    /// Identity order over `len` columns.
    pub fn identity(len: usize) -> Self {
        Self {
            columns: (0..len).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn columns(&self) -> &[usize] {
        &self.columns
    }
}

impl FromStr for TransKey {
    type Err = Error;

    /// Accepts a keyword (`ZEBRA`), a read order (`4,2,1,3,0`), or the attack's
    /// own display form (`Len 5 | [4, 2, 1, 3, 0]`).
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if !s.contains(',') && !s.contains('[') {
            return Self::from_keyword(s);
        }

        let list = match (s.find('['), s.rfind(']')) {
            (Some(open), Some(close)) if open < close => &s[open + 1..close],
            (None, None) => s,
            _ => return Err(Error::InvalidKey(format!("unbalanced brackets in '{}'", s))),
        };

        let columns = list
            .split(',')
            .map(|part| {
                part.trim()
                    .parse::<usize>()
                    .map_err(|_| Error::InvalidKey(format!("'{}' is not a column index", part.trim())))
            })
            .collect::<Result<Vec<usize>>>()?;

        Self::from_order(columns)
    }
}

impl fmt::Display for TransKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Len {} | {:?}", self.columns.len(), self.columns)
    }
}

impl Ord for TransKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.columns
            .len()
            .cmp(&other.columns.len())
            .then_with(|| self.columns.cmp(&other.columns))
    }
}

impl PartialOrd for TransKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Serialize for TransKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
