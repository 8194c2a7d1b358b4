//! # Triple-Lock Language Model
//!
//! Decides how English-like a candidate plaintext is.
//!
//! ```text
//! candidate ──▶ normalize ──▶ words ──▶ bigram / unigram / spelled-out ──▶ log10 P(text) ──▶ rank
//!                                                          ▲
//!                                                   char trigrams
//! ```
//!
//! The default model is trained once, on first use, from a prose corpus and a
//! word frequency table compiled into the binary, and is shared read-only by
//! every request.

pub mod frequency;
pub mod model;
pub mod scorer;

pub use frequency::FrequencyTable;
pub use model::{Analysis, LanguageModel, Window, UNKNOWN_WORD_LOG_PROB};
pub use scorer::{Scorer, ShiftInvariant};

use lazy_static::lazy_static;
use std::path::Path;
use std::sync::Arc;

use triplelock_core::{Error, Result};

/// Built-in English training prose
pub const ENGLISH_CORPUS: &str = include_str!("../data/corpus.txt");

/// Built-in English word frequencies
pub const ENGLISH_WORDS: &str = include_str!("../data/words.tsv");

lazy_static! {
    static ref ENGLISH: Arc<LanguageModel> = {
        let table = match FrequencyTable::parse(ENGLISH_WORDS) {
            Ok(table) => Some(table),
            Err(e) => {
                tracing::error!("Built-in word frequencies unusable: {}", e);
                None
            }
        };
        Arc::new(LanguageModel::builtin(ENGLISH_CORPUS, table.as_ref()))
    };
}

/// The shared built-in English model
pub fn english() -> Arc<LanguageModel> {
    Arc::clone(&ENGLISH)
}

fn read(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
}

/// Train from user files where given, built-in data otherwise.
///
/// A custom corpus without a frequency table takes its unigrams from the
/// corpus alone.
pub fn load(corpus_path: Option<&Path>, frequency_path: Option<&Path>) -> Result<Arc<LanguageModel>> {
    if corpus_path.is_none() && frequency_path.is_none() {
        return Ok(english());
    }

    let corpus = match corpus_path {
        Some(path) => read(path)?,
        None => ENGLISH_CORPUS.to_string(),
    };
    let model = match frequency_path {
        Some(path) => LanguageModel::from_sources(&corpus, &FrequencyTable::parse(&read(path)?)?)?,
        None => LanguageModel::from_corpus(&corpus)?,
    };

    tracing::info!(
        "Loaded language model (corpus {}, frequencies {}, vocabulary {})",
        corpus_path.map_or("built-in".into(), |p| p.display().to_string()),
        frequency_path.map_or("none".into(), |p| p.display().to_string()),
        model.vocabulary_size()
    );
    Ok(Arc::new(model))
}
