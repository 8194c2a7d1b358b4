//! Application state shared by every request

use std::sync::Arc;
use std::time::Duration;

use triplelock_breaker::{FactorBudget, RsaFactorizer};
use triplelock_config::Config;
use triplelock_core::Result;
use triplelock_lang::LanguageModel;

/// Read-only after startup. Requests never mutate it.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// Ranks candidate plaintexts for every attack
    pub model: Arc<LanguageModel>,
    /// Server start time
    pub started_at: chrono::DateTime<chrono::Utc>,
}

impl AppState {
    pub fn new(config: Config, model: Arc<LanguageModel>) -> Self {
        Self {
            config,
            model,
            started_at: chrono::Utc::now(),
        }
    }

    /// Build state from configuration, training a custom model if one is configured.
    pub fn from_config(config: Config) -> Result<Self> {
        let language = &config.language;
        let model = triplelock_lang::load(language.corpus_path.as_deref(), language.frequency_path.as_deref())?;
        Ok(Self::new(config, model))
    }

    /// Factorizer bounded by the configured budget
    pub fn factorizer(&self) -> RsaFactorizer {
        RsaFactorizer::new(
            FactorBudget::new(
                self.config.rsa.factor_iterations,
                Duration::from_millis(self.config.rsa.factor_time_ms),
            )
            .with_max_bits(self.config.rsa.max_modulus_bits),
        )
    }

    /// Get uptime in seconds
    pub fn uptime_secs(&self) -> i64 {
        (chrono::Utc::now() - self.started_at).num_seconds()
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(Config::default(), triplelock_lang::english())
    }
}
