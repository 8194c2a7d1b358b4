//! Ranked attack output

use serde::Serialize;
use std::cmp::Ordering;

/// How a plaintext scored against the language model.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ScoreDetails {
    /// Human-readable per-window contributions, e.g. `P(at|attack)=1.00e0`
    pub details: Vec<String>,
    /// Total log10 probability
    pub log_prob: f64,
    /// Mean log10 probability per scored symbol
    pub avg_log_prob: f64,
    /// `avg_log_prob` mapped onto 0.0 - 1.0
    pub confidence: f64,
    /// Whether the text had word boundaries to score
    pub segmented: bool,
}

/// One decryption attempt produced by a breaker.
#[derive(Debug, Clone, Serialize)]
pub struct Candidate<K> {
    pub key: K,
    pub plaintext: String,
    /// Match confidence 0.0 - 1.0, as shown to users
    pub score: f64,
    /// Ranking key: total log10 probability. Higher is more English-like.
    #[serde(skip)]
    pub log_prob: f64,
    pub details: ScoreDetails,
}

impl<K: Ord> Candidate<K> {
    pub fn new(key: K, plaintext: String, log_prob: f64) -> Self {
        Self {
            key,
            plaintext,
            score: 0.0,
            log_prob,
            details: ScoreDetails::default(),
        }
    }

    /// Attach the scoring breakdown; `score` becomes its confidence.
    pub fn with_details(mut self, details: ScoreDetails) -> Self {
        self.score = details.confidence;
        self.details = details;
        self
    }

    /// Best first: log probability descending, then the smallest key.
    pub fn rank_cmp(&self, other: &Self) -> Ordering {
        other
            .log_prob
            .total_cmp(&self.log_prob)
            .then_with(|| self.key.cmp(&other.key))
    }
}

/// Ranked candidates from one attack.
#[derive(Debug, Clone, Serialize)]
pub struct AttackResult<K> {
    pub candidates: Vec<Candidate<K>>,
    /// Keys evaluated during the search
    pub searched: usize,
}

impl<K: Ord> AttackResult<K> {
    pub fn empty() -> Self {
        Self {
            candidates: Vec::new(),
            searched: 0,
        }
    }

    /// Sort candidates into rank order.
    pub fn ranked(mut candidates: Vec<Candidate<K>>, searched: usize) -> Self {
        candidates.sort_by(|a, b| a.rank_cmp(b));
        Self { candidates, searched }
    }

    pub fn best(&self) -> Option<&Candidate<K>> {
        self.candidates.first()
    }

    pub fn top(&self, n: usize) -> &[Candidate<K>] {
        &self.candidates[..n.min(self.candidates.len())]
    }

    pub fn truncate(&mut self, n: usize) {
        self.candidates.truncate(n);
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }
}
