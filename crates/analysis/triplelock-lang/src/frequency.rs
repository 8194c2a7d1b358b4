//! Word frequency tables
//!
//! One `word<TAB>count` pair per line, most frequent first by convention.
//! Blank lines and lines starting with `#` are skipped. Words are folded to
//! lowercase ASCII letters; entries that fold to the same word are merged.

use std::collections::HashMap;

use triplelock_core::{Error, Result};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrequencyTable {
    entries: Vec<(String, u64)>,
}

impl FrequencyTable {
    pub fn parse(text: &str) -> Result<Self> {
        let mut entries: Vec<(String, u64)> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();

        for (number, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let (word, count) = line
                .split_once(char::is_whitespace)
                .map(|(w, c)| (w, c.trim()))
                .ok_or_else(|| Error::Config(format!("frequency line {}: expected 'word<TAB>count'", number + 1)))?;
            let count: u64 = count.parse().map_err(|_| {
                Error::Config(format!("frequency line {}: '{}' is not a count", number + 1, count))
            })?;

            let word: String = word
                .chars()
                .filter(|c| c.is_ascii_alphabetic())
                .map(|c| c.to_ascii_lowercase())
                .collect();
            if word.is_empty() || count == 0 {
                continue;
            }

            match index.get(&word) {
                Some(&i) => entries[i].1 += count,
                None => {
                    index.insert(word.clone(), entries.len());
                    entries.push((word, count));
                }
            }
        }

        if entries.is_empty() {
            return Err(Error::Config("frequency table has no entries".into()));
        }
        Ok(Self { entries })
    }

    /// Entries in file order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> + '_ {
        self.entries.iter().map(|(w, c)| (w.as_str(), *c))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn total(&self) -> u64 {
        self.entries.iter().map(|(_, c)| c).sum()
    }
}
