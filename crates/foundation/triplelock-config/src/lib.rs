//! Configuration
//!
//! YAML file -> defaults -> environment overrides -> validation.
//!
//! Looked up at `$TRIPLELOCK_CONFIG`, then `<config dir>/triplelock/config.yaml`.
//! A missing file is not an error; every field has a default.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use triplelock_core::{Error, Result, MAX_MODULUS_BITS, SEARCH_KEY_LEN_CAP};

pub const CONFIG_ENV: &str = "TRIPLELOCK_CONFIG";
pub const HOST_ENV: &str = "TRIPLELOCK_HOST";
pub const PORT_ENV: &str = "TRIPLELOCK_PORT";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub attack: AttackConfig,
    pub rsa: RsaConfig,
    pub language: LanguageConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 5000,
        }
    }
}

/// Search bounds for the classical breakers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttackConfig {
    /// Longest transposition key tried. Cost grows as `n * n!`.
    pub transposition_max_key_len: usize,
    /// Ranked candidates returned per attack
    pub top_n: usize,
    /// Transposition candidates the triple-lock pipeline follows into the Caesar stage
    pub pipeline_paths: usize,
}

impl Default for AttackConfig {
    fn default() -> Self {
        Self {
            transposition_max_key_len: 7,
            top_n: 10,
            pipeline_paths: 5,
        }
    }
}

/// RSA key sizes and the factoring budget.
///
/// `strong_bits` keys are expected to exhaust the budget; that is the lesson,
/// not a fault.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RsaConfig {
    /// Modulus size for "weak" keys
    pub weak_bits: u64,
    /// Modulus size for "strong" keys
    pub strong_bits: u64,
    /// Factoring iterations before giving up
    pub factor_iterations: u64,
    /// Factoring wall-clock budget
    pub factor_time_ms: u64,
    /// Widest modulus any request may supply
    pub max_modulus_bits: u64,
}

impl Default for RsaConfig {
    fn default() -> Self {
        Self {
            weak_bits: 32,
            strong_bits: 1024,
            factor_iterations: 5_000_000,
            factor_time_ms: 2_000,
            max_modulus_bits: MAX_MODULUS_BITS,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LanguageConfig {
    /// Plain-text English corpus replacing the built-in one
    pub corpus_path: Option<PathBuf>,
    /// `word<TAB>count` table replacing the built-in word frequencies
    pub frequency_path: Option<PathBuf>,
}

impl Config {
    /// Resolve, read, override and validate.
    pub fn load() -> Result<Self> {
        let config = match Self::resolve_path() {
            Some(path) if path.exists() => Self::from_path(&path)?,
            Some(path) => {
                tracing::debug!("No config at {}, using defaults", path.display());
                Self::default()
            }
            None => Self::default(),
        };

        let config = config.with_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        tracing::info!("Loaded config from {}", path.display());
        Self::from_yaml(&raw)
    }

    pub fn from_yaml(raw: &str) -> Result<Self> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(raw).map_err(|e| Error::Config(e.to_string()))
    }

    /// `$TRIPLELOCK_CONFIG`, else the per-user default location.
    pub fn resolve_path() -> Option<PathBuf> {
        std::env::var_os(CONFIG_ENV)
            .map(PathBuf::from)
            .or_else(Self::default_path)
    }

    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("triplelock").join("config.yaml"))
    }

    fn with_env_overrides(self) -> Result<Self> {
        let host = std::env::var(HOST_ENV).ok();
        let port = std::env::var(PORT_ENV).ok();
        self.with_overrides(host.as_deref(), port.as_deref())
    }

    /// Apply host/port overrides given as raw strings.
    pub fn with_overrides(mut self, host: Option<&str>, port: Option<&str>) -> Result<Self> {
        if let Some(host) = host {
            self.server.host = host.to_string();
        }
        if let Some(port) = port {
            self.server.port = port
                .trim()
                .parse()
                .map_err(|_| Error::Config(format!("{} is not a valid port", port)))?;
        }
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        let attack = &self.attack;
        if !(2..=SEARCH_KEY_LEN_CAP).contains(&attack.transposition_max_key_len) {
            return Err(Error::Config(format!(
                "attack.transposition_max_key_len must be within 2..={}, got {}",
                SEARCH_KEY_LEN_CAP, attack.transposition_max_key_len
            )));
        }
        if attack.top_n == 0 {
            return Err(Error::Config("attack.top_n must be at least 1".into()));
        }
        if attack.pipeline_paths == 0 {
            return Err(Error::Config("attack.pipeline_paths must be at least 1".into()));
        }

        let rsa = &self.rsa;
        if !(16..=64).contains(&rsa.weak_bits) {
            return Err(Error::Config(format!(
                "rsa.weak_bits must be within 16..=64, got {}",
                rsa.weak_bits
            )));
        }
        if rsa.strong_bits <= rsa.weak_bits || rsa.strong_bits > 4096 {
            return Err(Error::Config(format!(
                "rsa.strong_bits must be above weak_bits and at most 4096, got {}",
                rsa.strong_bits
            )));
        }
        if rsa.max_modulus_bits < rsa.strong_bits || rsa.max_modulus_bits > 8192 {
            return Err(Error::Config(format!(
                "rsa.max_modulus_bits must be within strong_bits..=8192, got {}",
                rsa.max_modulus_bits
            )));
        }
        if rsa.factor_iterations == 0 || rsa.factor_time_ms == 0 {
            return Err(Error::Config("rsa factoring budget must be non-zero".into()));
        }

        if self.server.port == 0 {
            return Err(Error::Config("server.port must be non-zero".into()));
        }
        Ok(())
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.attack.transposition_max_key_len, 7);
        assert_eq!(config.rsa.weak_bits, 32);
        assert_eq!(config.bind_addr(), "127.0.0.1:5000");
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config = Config::from_yaml(
            "attack:\n  transposition_max_key_len: 5\nrsa:\n  factor_time_ms: 250\n",
        )
        .unwrap();
        assert_eq!(config.attack.transposition_max_key_len, 5);
        assert_eq!(config.attack.top_n, 10);
        assert_eq!(config.rsa.factor_time_ms, 250);
        assert_eq!(config.rsa.strong_bits, 1024);
        assert_eq!(config.server.port, 5000);
    }

    #[test]
    fn test_empty_yaml_is_default() {
        assert_eq!(Config::from_yaml("  \n").unwrap(), Config::default());
    }

    #[test]
    fn test_malformed_yaml() {
        let err = Config::from_yaml("attack: [not, a, map").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_validate_rejects_out_of_range() {
        let mut config = Config::default();
        config.attack.transposition_max_key_len = SEARCH_KEY_LEN_CAP + 1;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.rsa.weak_bits = 2048;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.attack.top_n = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.rsa.max_modulus_bits = config.rsa.strong_bits - 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_language_and_modulus_settings() {
        let config = Config::from_yaml(
            "rsa:\n  max_modulus_bits: 4096\nlanguage:\n  frequency_path: /srv/words.tsv\n",
        )
        .unwrap();
        assert_eq!(config.rsa.max_modulus_bits, 4096);
        assert_eq!(config.language.frequency_path, Some(PathBuf::from("/srv/words.tsv")));
        assert_eq!(config.language.corpus_path, None);
        assert!(config.validate().is_ok());
        assert_eq!(Config::default().rsa.max_modulus_bits, 2048);
    }

    #[test]
    fn test_overrides() {
        let config = Config::default()
            .with_overrides(Some("0.0.0.0"), Some("8080"))
            .unwrap();
        assert_eq!(config.bind_addr(), "0.0.0.0:8080");

        assert!(Config::default().with_overrides(None, Some("http")).is_err());
    }

    #[test]
    fn test_from_path_missing_file() {
        let err = Config::from_path(Path::new("/nonexistent/triplelock.yaml")).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
