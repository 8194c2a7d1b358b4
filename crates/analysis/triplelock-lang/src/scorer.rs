//! Ranking seam between the breakers and the language model

use triplelock_cipher::Caesar;
use triplelock_core::{ScoreDetails, ShiftKey};

use crate::LanguageModel;

/// Anything that can rank candidate plaintexts.
///
/// `log_prob` runs once per searched key and must stay cheap; `details` is
/// only asked for the survivors.
pub trait Scorer: Send + Sync {
    fn log_prob(&self, text: &str) -> f64;

    fn details(&self, text: &str) -> ScoreDetails;
}

impl Scorer for LanguageModel {
    fn log_prob(&self, text: &str) -> f64 {
        LanguageModel::log_prob(self, text)
    }

    fn details(&self, text: &str) -> ScoreDetails {
        self.score(text).details()
    }
}

/// Scores text as if it might still be Caesar shifted: the best score over
/// all 26 shifts.
///
/// Transposition only moves characters, so a text that is transposed and then
/// shifted still ranks correctly once the shift is factored out.
pub struct ShiftInvariant<'a, S: Scorer + ?Sized> {
    inner: &'a S,
}

impl<'a, S: Scorer + ?Sized> ShiftInvariant<'a, S> {
    pub fn new(inner: &'a S) -> Self {
        Self { inner }
    }

    /// Highest-scoring decryption shift; ties go to the smaller shift.
    pub fn best_shift(&self, text: &str) -> (ShiftKey, f64) {
        let mut best = (ShiftKey::default(), f64::NEG_INFINITY);
        for key in ShiftKey::all() {
            let score = self.inner.log_prob(&Caesar::decrypt(text, key));
            if score > best.1 {
                best = (key, score);
            }
        }
        best
    }
}

impl<S: Scorer + ?Sized> Scorer for ShiftInvariant<'_, S> {
    fn log_prob(&self, text: &str) -> f64 {
        self.best_shift(text).1
    }

    fn details(&self, text: &str) -> ScoreDetails {
        let (key, _) = self.best_shift(text);
        let mut details = self.inner.details(&Caesar::decrypt(text, key));
        details.details.insert(0, format!("Scored under Caesar shift {}", key));
        details
    }
}
