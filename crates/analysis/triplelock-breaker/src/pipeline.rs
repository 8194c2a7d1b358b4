//! Triple-lock attack
//!
//! ```text
//! Start ──▶ RSA ──ok──▶ Transposition ──ok──▶ Caesar ──ok──▶ Done(plaintext)
//!            │              │                   │
//!            └─fail─────────┴──────fail─────────┴────▶ Done(FAILED at stage)
//! ```
//!
//! Stages run strictly in order. The transposition stage still sees
//! Caesar-shifted text, so it ranks read orders with a shift-invariant scorer
//! and hands its best few paths to the Caesar stage; the path whose final
//! plaintext scores highest wins.

use num_bigint::BigUint;
use serde::Serialize;
use std::fmt;
use std::time::Instant;

use crate::{CaesarBreaker, RsaAttack, RsaFactorizer, TranspositionBreaker};
use triplelock_core::{Candidate, Error, ShiftKey, TransKey};
use triplelock_lang::{Scorer, ShiftInvariant};

pub const DEFAULT_PATHS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Rsa,
    Transposition,
    Caesar,
}

impl Stage {
    pub const ALL: [Stage; 3] = [Stage::Rsa, Stage::Transposition, Stage::Caesar];

    pub fn number(self) -> usize {
        match self {
            Stage::Rsa => 1,
            Stage::Transposition => 2,
            Stage::Caesar => 3,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Rsa => write!(f, "RSA"),
            Stage::Transposition => write!(f, "Transposition"),
            Stage::Caesar => write!(f, "Caesar"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    Success,
    Failed,
}

/// Outcome of one stage. `payload` is the recovered text, or the
/// `FAILED: ...` reason.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageResult {
    pub stage: Stage,
    pub status: StageStatus,
    pub payload: String,
    /// Key recovered at this stage, in display form
    pub key: Option<String>,
}

impl StageResult {
    fn success(stage: Stage, payload: String, key: Option<String>) -> Self {
        Self {
            stage,
            status: StageStatus::Success,
            payload,
            key,
        }
    }

    fn failed(stage: Stage, error: &Error) -> Self {
        Self {
            stage,
            status: StageStatus::Failed,
            payload: error.failed(),
            key: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == StageStatus::Success
    }

    /// `payload (Key: ...)` on success, the failure string otherwise.
    pub fn summary(&self) -> String {
        match &self.key {
            Some(key) if self.is_success() => format!("{} (Key: {})", self.payload, key),
            _ => self.payload.clone(),
        }
    }
}

/// Every stage reached, in order, plus the winning candidates.
#[derive(Debug, Clone)]
pub struct PipelineResult {
    pub stages: Vec<StageResult>,
    pub rsa: Option<RsaAttack>,
    pub transposition: Option<Candidate<TransKey>>,
    pub caesar: Option<Candidate<ShiftKey>>,
}

impl PipelineResult {
    fn new() -> Self {
        Self {
            stages: Vec::with_capacity(3),
            rsa: None,
            transposition: None,
            caesar: None,
        }
    }

    pub fn stage(&self, stage: Stage) -> Option<&StageResult> {
        self.stages.iter().find(|s| s.stage == stage)
    }

    /// True only when all three stages succeeded.
    pub fn success(&self) -> bool {
        self.stages.len() == Stage::ALL.len() && self.stages.iter().all(StageResult::is_success)
    }

    pub fn failed_stage(&self) -> Option<Stage> {
        self.stages.iter().find(|s| !s.is_success()).map(|s| s.stage)
    }

    pub fn final_plaintext(&self) -> Option<&str> {
        if self.success() {
            self.caesar.as_ref().map(|c| c.plaintext.as_str())
        } else {
            None
        }
    }
}

pub struct TripleLockBreaker<'s, S: Scorer + ?Sized> {
    scorer: &'s S,
    factorizer: RsaFactorizer,
    max_key_len: usize,
    paths: usize,
}

impl<'s, S: Scorer + ?Sized> TripleLockBreaker<'s, S> {
    pub fn new(scorer: &'s S, factorizer: RsaFactorizer) -> Self {
        Self {
            scorer,
            factorizer,
            max_key_len: crate::transposition::DEFAULT_MAX_KEY_LEN,
            paths: DEFAULT_PATHS,
        }
    }

    pub fn with_max_key_len(mut self, max_key_len: usize) -> Self {
        self.max_key_len = max_key_len;
        self
    }

    /// Transposition candidates carried into the Caesar stage
    pub fn with_paths(mut self, paths: usize) -> Self {
        self.paths = paths.max(1);
        self
    }

    pub fn attack(&self, blocks: &[BigUint], e: &BigUint, n: &BigUint) -> PipelineResult {
        let started = Instant::now();
        let mut result = PipelineResult::new();

        // Stage 1: factor n, strip the RSA layer
        tracing::info!("Triple-lock stage 1: RSA ({}-bit n)", n.bits());
        let rsa = match self.factorizer.attack(e, n, blocks) {
            Ok(rsa) => rsa,
            Err(err) => {
                tracing::warn!("Triple-lock stopped at stage 1: {}", err);
                result.stages.push(StageResult::failed(Stage::Rsa, &err));
                return result;
            }
        };
        let scrambled = rsa.decrypted.clone();
        result.stages.push(StageResult::success(
            Stage::Rsa,
            scrambled.clone(),
            Some(format!("d = {}", rsa.key.d)),
        ));
        result.rsa = Some(rsa);

        // Stage 2: rank read orders, ignoring the Caesar shift still in place
        tracing::info!("Triple-lock stage 2: transposition ({} chars)", scrambled.chars().count());
        let invariant = ShiftInvariant::new(self.scorer);
        let paths = TranspositionBreaker::new(&invariant)
            .with_max_key_len(self.max_key_len)
            .with_top_n(self.paths)
            .attack(&scrambled)
            .and_then(|paths| {
                if paths.is_empty() {
                    Err(Error::NoCandidates("transposition".into()))
                } else {
                    Ok(paths)
                }
            });
        let paths = match paths {
            Ok(paths) => paths,
            Err(err) => {
                tracing::warn!("Triple-lock stopped at stage 2: {}", err);
                result.stages.push(StageResult::failed(Stage::Transposition, &err));
                return result;
            }
        };

        // Stage 3: Caesar on every path, keep the best final plaintext
        tracing::info!("Triple-lock stage 3: Caesar over {} paths", paths.len());
        let caesar = CaesarBreaker::new(self.scorer);
        let top_path = paths.candidates[0].clone();
        let mut best: Option<(Candidate<TransKey>, Candidate<ShiftKey>)> = None;
        for path in paths.candidates {
            let Some(shift) = caesar.attack(&path.plaintext).candidates.into_iter().next() else {
                continue;
            };
            // Strictly better only, so earlier paths win ties
            if best.as_ref().map_or(true, |(_, b)| shift.log_prob > b.log_prob) {
                best = Some((path, shift));
            }
        }

        let Some((path, shift)) = best else {
            let err = Error::NoCandidates("Caesar".into());
            tracing::warn!("Triple-lock stopped at stage 3: {}", err);
            result.stages.push(StageResult::success(
                Stage::Transposition,
                top_path.plaintext.clone(),
                Some(top_path.key.to_string()),
            ));
            result.stages.push(StageResult::failed(Stage::Caesar, &err));
            result.transposition = Some(top_path);
            return result;
        };

        result.stages.push(StageResult::success(
            Stage::Transposition,
            path.plaintext.clone(),
            Some(path.key.to_string()),
        ));
        result.stages.push(StageResult::success(
            Stage::Caesar,
            shift.plaintext.clone(),
            Some(shift.key.to_string()),
        ));
        result.transposition = Some(path);
        result.caesar = Some(shift);

        tracing::info!("Triple-lock broken in {:?}", started.elapsed());
        result
    }
}
