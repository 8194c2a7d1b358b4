//! # Triple-Lock Breakers
//!
//! Ciphertext-only attacks, one per layer, plus the pipeline that chains them.
//!
//! | Breaker | Key space | Strategy |
//! |---|---|---|
//! | [`CaesarBreaker`] | 26 shifts | exhaustive, ranked by the language model |
//! | [`TranspositionBreaker`] | `sum(n!)` read orders | parallel exhaustive, bounded key length |
//! | [`RsaFactorizer`] | factors of `n` | trial division, Pollard's rho, Fermat under a budget |
//! | [`TripleLockBreaker`] | all three | RSA, then transposition, then Caesar |
//!
//! Every breaker is pure: no shared mutable state, deterministic ranking.

pub mod caesar;
pub mod factor;
pub mod pipeline;
pub mod transposition;

pub use caesar::CaesarBreaker;
pub use factor::{FactorBudget, Factors, Method, RecoveredKey, RsaAttack, RsaFactorizer};
pub use pipeline::{PipelineResult, Stage, StageResult, StageStatus, TripleLockBreaker, DEFAULT_PATHS};
pub use transposition::{TranspositionBreaker, DEFAULT_MAX_KEY_LEN, DEFAULT_TOP_N};

pub use triplelock_core::{AttackResult, Candidate, Error, Result};

#[cfg(test)]
pub(crate) mod tests {
    fn fold(text: &str) -> String {
        let letters: String = text
            .chars()
            .filter(|c| c.is_ascii_alphabetic() || c.is_whitespace())
            .collect();
        letters
            .split_whitespace()
            .map(|w| w.to_ascii_lowercase())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Passes `text` through after checking it is absent from the training prose.
    pub(crate) fn unseen(text: &str) -> &str {
        assert!(
            !fold(triplelock_lang::ENGLISH_CORPUS).contains(&fold(text)),
            "'{}' is part of the training corpus",
            text
        );
        text
    }
}
