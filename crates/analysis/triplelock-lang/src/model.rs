//! N-gram language model
//!
//! Text is scored word by word, in log10:
//!
//! - a word that follows a pair seen in the corpus gets `P(w | prev)`;
//! - a word in the unigram table gets its smoothed unigram probability;
//! - any other word is spelled out letter by letter with the character
//!   trigram model, plus a fixed unknown-word cost.
//!
//! Every letter of a candidate is paid for exactly once, so joining or
//! splitting words cannot buy a better score by itself. Text with no spaces is
//! one long unknown word, which makes the trigram model the fallback.
//!
//! Trigrams are trained on the corpus plus, when one is given, every word of
//! the frequency table weighted by its count.

use std::collections::HashMap;
use std::fmt;

use triplelock_core::{Error, Result, ScoreDetails};

use crate::FrequencyTable;

/// A-Z plus word boundary
pub const SYMBOLS: usize = 27;
const SPACE: u8 = 26;

/// Additive smoothing for trigram counts
const TRIGRAM_ALPHA: f64 = 0.1;

/// log10 cost of a word missing from the unigram table, on top of its spelling
pub const UNKNOWN_WORD_LOG_PROB: f64 = -2.0;

/// Mean log10 per symbol mapped onto confidence 0.0 - 1.0
const CONFIDENCE_FLOOR: f64 = -2.0;
const CONFIDENCE_SPAN: f64 = 1.5;

/// Detail lines kept per analysis
const MAX_DETAIL_LINES: usize = 40;

/// Trained statistics. Immutable once built.
#[derive(Debug, Clone)]
pub struct LanguageModel {
    /// `log10 P(c | a b)` indexed by `(a * 27 + b) * 27 + c`
    trigrams: Vec<f64>,
    unigrams: HashMap<String, u64>,
    total_unigrams: u64,
    bigrams: HashMap<String, HashMap<String, u32>>,
    /// Corpus word counts, the denominators of `P(w | prev)`
    contexts: HashMap<String, u32>,
}

impl LanguageModel {
    /// Train on plain English text alone. Unigrams come from the text itself.
    pub fn from_corpus(corpus: &str) -> Result<Self> {
        Ok(Self::train(&checked_symbols(corpus)?, None))
    }

    /// Train on a corpus for context and a frequency table for word counts.
    pub fn from_sources(corpus: &str, frequencies: &FrequencyTable) -> Result<Self> {
        Ok(Self::train(&checked_symbols(corpus)?, Some(frequencies)))
    }

    /// Train on the compiled-in data.
    pub(crate) fn builtin(corpus: &'static str, frequencies: Option<&FrequencyTable>) -> Self {
        Self::train(&training_symbols(corpus), frequencies)
    }

    fn train(symbols: &[u8], frequencies: Option<&FrequencyTable>) -> Self {
        let mut tri_counts = vec![0f64; SYMBOLS * SYMBOLS * SYMBOLS];
        let mut ctx_counts = vec![0f64; SYMBOLS * SYMBOLS];
        let mut count = |w: &[u8], weight: f64| {
            let ctx = w[0] as usize * SYMBOLS + w[1] as usize;
            tri_counts[ctx * SYMBOLS + w[2] as usize] += weight;
            ctx_counts[ctx] += weight;
        };

        for w in symbols.windows(3) {
            count(w, 1.0);
        }

        // The table carries as much trigram mass as the corpus does
        if let Some(table) = frequencies.filter(|t| !t.is_empty()) {
            let mass: f64 = table
                .iter()
                .map(|(word, n)| n as f64 * (word.len() + 1) as f64)
                .sum();
            let weight = symbols.len().saturating_sub(2) as f64 / mass;
            let mut padded = Vec::new();
            for (word, n) in table.iter() {
                spelled(word, &mut padded);
                for w in padded.windows(3) {
                    count(w, n as f64 * weight);
                }
            }
        }

        let denominator_pad = SYMBOLS as f64 * TRIGRAM_ALPHA;
        let trigrams = tri_counts
            .iter()
            .enumerate()
            .map(|(i, &n)| ((n + TRIGRAM_ALPHA) / (ctx_counts[i / SYMBOLS] + denominator_pad)).log10())
            .collect();

        let text: String = symbols.iter().map(|&s| symbol_char(s)).collect();
        let words: Vec<&str> = text.split_whitespace().collect();

        let mut contexts: HashMap<String, u32> = HashMap::new();
        for &word in &words {
            *contexts.entry(word.to_string()).or_insert(0) += 1;
        }

        let mut bigrams: HashMap<String, HashMap<String, u32>> = HashMap::new();
        for pair in words.windows(2) {
            *bigrams
                .entry(pair[0].to_string())
                .or_default()
                .entry(pair[1].to_string())
                .or_insert(0) += 1;
        }

        let unigrams: HashMap<String, u64> = match frequencies {
            Some(table) => table.iter().map(|(w, n)| (w.to_string(), n)).collect(),
            None => contexts.iter().map(|(w, &n)| (w.clone(), n as u64)).collect(),
        };
        let total_unigrams = unigrams.values().sum();

        tracing::debug!(
            "Trained language model: {} corpus symbols, {} corpus words, vocabulary {}",
            symbols.len(),
            words.len(),
            unigrams.len()
        );

        Self {
            trigrams,
            unigrams,
            total_unigrams,
            bigrams,
            contexts,
        }
    }

    /// Distinct words with a unigram count
    pub fn vocabulary_size(&self) -> usize {
        self.unigrams.len()
    }

    /// Sum of all unigram counts
    pub fn total_words(&self) -> u64 {
        self.total_unigrams
    }

    pub fn is_known(&self, word: &str) -> bool {
        self.unigrams.contains_key(word)
    }

    /// Score `text`. Totals are computed eagerly; per-window details are lazy.
    pub fn score(&self, text: &str) -> Analysis<'_> {
        let normalized = normalize(text);
        let log_prob = self.word_sum(&normalized);
        let mut padded = Vec::with_capacity(normalized.len() + 3);
        spelled(&normalized, &mut padded);
        let trigram_log_prob = self.trigram_sum(&padded);
        let segmented = normalized.bytes().any(|b| b == b' ');

        Analysis {
            model: self,
            normalized,
            log_prob,
            trigram_log_prob,
            segmented,
        }
    }

    /// Total log10 probability without building an [`Analysis`].
    pub fn log_prob(&self, text: &str) -> f64 {
        self.word_sum(&normalize(text))
    }

    #[inline]
    fn trigram(&self, a: u8, b: u8, c: u8) -> f64 {
        self.trigrams[(a as usize * SYMBOLS + b as usize) * SYMBOLS + c as usize]
    }

    fn trigram_sum(&self, symbols: &[u8]) -> f64 {
        symbols.windows(3).map(|w| self.trigram(w[0], w[1], w[2])).sum()
    }

    /// Character-model log10 probability of `word` standing alone.
    pub fn spelling_log_prob(&self, word: &str) -> f64 {
        let mut padded = Vec::with_capacity(word.len() + 3);
        spelled(word, &mut padded);
        self.trigram_sum(&padded)
    }

    fn word_sum(&self, normalized: &str) -> f64 {
        let mut prev: Option<&str> = None;
        let mut total = 0.0;
        for word in normalized.split_whitespace() {
            total += self.word_window(prev, word).log_prob();
            prev = Some(word);
        }
        total
    }

    fn word_window<'t>(&self, prev: Option<&'t str>, word: &'t str) -> Window<'t> {
        if let Some(prev) = prev {
            let pair_count = self
                .bigrams
                .get(prev)
                .and_then(|next| next.get(word))
                .copied()
                .unwrap_or(0);
            if pair_count > 0 {
                let prev_count = self.contexts.get(prev).copied().unwrap_or(1).max(1);
                return Window::Bigram {
                    prev,
                    word,
                    log_prob: (pair_count as f64 / prev_count as f64).log10(),
                };
            }
        }

        let Some(&count) = self.unigrams.get(word) else {
            return Window::Unknown {
                word,
                log_prob: UNKNOWN_WORD_LOG_PROB + self.spelling_log_prob(word),
            };
        };

        let denominator = self.total_unigrams as f64 + self.unigrams.len() as f64;
        let log_prob = ((count as f64 + 1.0) / denominator).log10();
        match prev {
            None => Window::Unigram { word, log_prob },
            Some(_) => Window::Backoff { word, log_prob },
        }
    }
}

/// One scoring step
#[derive(Debug, Clone, PartialEq)]
pub enum Window<'t> {
    Unigram { word: &'t str, log_prob: f64 },
    Bigram { prev: &'t str, word: &'t str, log_prob: f64 },
    Backoff { word: &'t str, log_prob: f64 },
    /// Spelled out by the character model
    Unknown { word: &'t str, log_prob: f64 },
    Trigram { context: [char; 2], next: char, log_prob: f64 },
}

impl Window<'_> {
    pub fn log_prob(&self) -> f64 {
        match self {
            Window::Unigram { log_prob, .. }
            | Window::Bigram { log_prob, .. }
            | Window::Backoff { log_prob, .. }
            | Window::Unknown { log_prob, .. }
            | Window::Trigram { log_prob, .. } => *log_prob,
        }
    }
}

impl fmt::Display for Window<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let p = 10f64.powf(self.log_prob());
        match self {
            Window::Unigram { word, .. } => write!(f, "P({})={:.2e}", word, p),
            Window::Bigram { prev, word, .. } => write!(f, "P({}|{})={:.2e}", word, prev, p),
            Window::Backoff { word, .. } => write!(f, "Backoff: P({})={:.2e}", word, p),
            Window::Unknown { word, .. } => write!(f, "Unknown: P({})={:.2e}", word, p),
            Window::Trigram { context, next, .. } => {
                write!(f, "P({}|{}{})={:.2e}", next, context[0], context[1], p)
            }
        }
    }
}

/// Score of one text against a [`LanguageModel`]
#[derive(Debug, Clone)]
pub struct Analysis<'m> {
    model: &'m LanguageModel,
    normalized: String,
    log_prob: f64,
    trigram_log_prob: f64,
    segmented: bool,
}

impl<'m> Analysis<'m> {
    /// Total log10 probability. Higher is more English-like.
    pub fn log_prob(&self) -> f64 {
        self.log_prob
    }

    /// Character trigrams over the whole text, for reference only
    pub fn trigram_log_prob(&self) -> f64 {
        self.trigram_log_prob
    }

    /// Whether the text had spaces separating words
    pub fn segmented(&self) -> bool {
        self.segmented
    }

    /// Letters and word boundaries that took part in scoring
    pub fn symbols(&self) -> usize {
        self.normalized.len()
    }

    pub fn avg_log_prob(&self) -> f64 {
        if self.normalized.is_empty() {
            0.0
        } else {
            self.log_prob / self.normalized.len() as f64
        }
    }

    pub fn confidence(&self) -> f64 {
        if self.normalized.is_empty() {
            return 0.0;
        }
        ((self.avg_log_prob() - CONFIDENCE_FLOOR) / CONFIDENCE_SPAN).clamp(0.0, 1.0)
    }

    /// Word windows for segmented text, character trigrams otherwise.
    pub fn windows(&self) -> Box<dyn Iterator<Item = Window<'_>> + '_> {
        if self.segmented {
            let mut prev = None;
            Box::new(self.normalized.split_whitespace().map(move |word| {
                let window = self.model.word_window(prev, word);
                prev = Some(word);
                window
            }))
        } else {
            Box::new(self.trigram_windows().into_iter())
        }
    }

    /// Trigram windows over the text with its boundaries, `_` marking a space.
    pub fn trigram_windows(&self) -> Vec<Window<'_>> {
        let mut padded = Vec::with_capacity(self.normalized.len() + 3);
        spelled(&self.normalized, &mut padded);
        padded
            .windows(3)
            .map(|w| Window::Trigram {
                context: [display_char(w[0]), display_char(w[1])],
                next: display_char(w[2]),
                log_prob: self.model.trigram(w[0], w[1], w[2]),
            })
            .collect()
    }

    /// Collect into the wire form, keeping the first few window lines.
    pub fn details(&self) -> ScoreDetails {
        let mut lines = Vec::new();
        if !self.segmented {
            lines.push("Fallback to Character Trigrams".to_string());
        }

        let mut windows = self.windows();
        lines.extend(windows.by_ref().take(MAX_DETAIL_LINES).map(|w| w.to_string()));
        let remaining = windows.count();
        if remaining > 0 {
            lines.push(format!("... {} more", remaining));
        }

        if self.segmented {
            lines.push(format!(
                "Char trigrams: log10={:.2} over {} windows",
                self.trigram_log_prob,
                self.normalized.len() + 1
            ));
        }

        ScoreDetails {
            details: lines,
            log_prob: self.log_prob,
            avg_log_prob: self.avg_log_prob(),
            confidence: self.confidence(),
            segmented: self.segmented,
        }
    }
}

/// Lowercase ASCII letters and single spaces for any whitespace; everything
/// else is dropped.
fn normalize(text: &str) -> String {
    text.chars()
        .filter_map(|c| {
            if c.is_ascii_alphabetic() {
                Some(c.to_ascii_lowercase())
            } else if c.is_whitespace() {
                Some(' ')
            } else {
                None
            }
        })
        .collect()
}

/// Training text additionally collapses whitespace runs.
fn training_symbols(corpus: &str) -> Vec<u8> {
    let mut out: Vec<u8> = Vec::with_capacity(corpus.len());
    for b in normalize(corpus).bytes() {
        let s = symbol(b);
        if s == SPACE && out.last() == Some(&SPACE) {
            continue;
        }
        out.push(s);
    }
    out
}

fn checked_symbols(corpus: &str) -> Result<Vec<u8>> {
    let symbols = training_symbols(corpus);
    if symbols.len() < 3 || symbols.iter().all(|&s| s == SPACE) {
        return Err(Error::Config("corpus needs at least three letters of text".into()));
    }
    Ok(symbols)
}

/// `__text_`: two boundaries give the first letter its context.
fn spelled(word: &str, out: &mut Vec<u8>) {
    out.clear();
    out.extend([SPACE, SPACE]);
    out.extend(word.bytes().map(symbol));
    out.push(SPACE);
}

#[inline]
fn symbol(b: u8) -> u8 {
    if b == b' ' {
        SPACE
    } else {
        b - b'a'
    }
}

fn symbol_char(s: u8) -> char {
    if s == SPACE {
        ' '
    } else {
        (b'a' + s) as char
    }
}

fn display_char(s: u8) -> char {
    if s == SPACE {
        '_'
    } else {
        (b'a' + s) as char
    }
}
