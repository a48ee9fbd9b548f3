//! Configuration for the memory layer.
//!
//! Every value is overridable at the call site. A TOML file is optional:
//!
//! ```toml
//! [memory]
//! window_pairs = 20
//! compression_threshold = 1200
//! ```

use crate::{CtxguardError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Pairs retained by the sliding window
pub const DEFAULT_WINDOW_PAIRS: usize = 15;

/// Tool results longer than this (in characters) get compressed
pub const DEFAULT_COMPRESSION_THRESHOLD: usize = 800;

/// Default context window size (tokens)
pub const DEFAULT_CONTEXT_LENGTH: usize = 128_000;

/// Estimate above which history is considered over budget
pub const DEFAULT_TOKEN_BUDGET: usize = 80_000;

/// Estimate above which aggressive compression would be warranted
pub const DEFAULT_AGGRESSIVE_TOKEN_BUDGET: usize = 110_000;

/// Environment variable pointing at the config directory
pub const HOME_ENV: &str = "CTXGUARD_HOME";

/// Knobs for the conversation memory manager
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    /// Number of user-initiated pairs kept in `recent_messages` (K)
    pub window_pairs: usize,
    /// Character length above which a tool result is compressed (L)
    pub compression_threshold: usize,
    /// Context window assumed when the caller does not pass one
    pub context_length: usize,
    pub token_budget: usize,
    pub aggressive_token_budget: usize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            window_pairs: DEFAULT_WINDOW_PAIRS,
            compression_threshold: DEFAULT_COMPRESSION_THRESHOLD,
            context_length: DEFAULT_CONTEXT_LENGTH,
            token_budget: DEFAULT_TOKEN_BUDGET,
            aggressive_token_budget: DEFAULT_AGGRESSIVE_TOKEN_BUDGET,
        }
    }
}

impl MemoryConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_window_pairs(mut self, pairs: usize) -> Self {
        self.window_pairs = pairs;
        self
    }

    pub fn with_compression_threshold(mut self, chars: usize) -> Self {
        self.compression_threshold = chars;
        self
    }

    pub fn with_context_length(mut self, tokens: usize) -> Self {
        self.context_length = tokens;
        self
    }

    pub fn with_token_budgets(mut self, default: usize, aggressive: usize) -> Self {
        self.token_budget = default;
        self.aggressive_token_budget = aggressive;
        self
    }
}

/// Top-level configuration file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CtxguardConfig {
    pub memory: MemoryConfig,
}

impl CtxguardConfig {
    /// Parse configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Load a config file. The file must exist.
    pub async fn load(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path).await?;
        let config = Self::from_toml(&content)?;
        debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Load `config.toml` from the default location, or defaults when absent.
    ///
    /// Resolution:
    ///   1. `$CTXGUARD_HOME/config.toml`
    ///   2. `~/.ctxguard/config.toml`
    pub async fn load_default() -> Result<Self> {
        Self::load_or_default(&default_config_path()?).await
    }

    /// Load `path` if it exists, otherwise fall back to defaults.
    pub async fn load_or_default(path: &Path) -> Result<Self> {
        if !tokio::fs::try_exists(path).await? {
            debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        Self::load(path).await
    }
}

/// Path of the default config file, from the process environment.
pub fn default_config_path() -> Result<PathBuf> {
    config_path_in(std::env::var_os(HOME_ENV).map(PathBuf::from), dirs::home_dir())
}

/// Config file location given `$CTXGUARD_HOME` and the user's home directory.
pub fn config_path_in(ctxguard_home: Option<PathBuf>, user_home: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(home) = ctxguard_home {
        return Ok(home.join("config.toml"));
    }

    let home = user_home
        .ok_or_else(|| CtxguardError::Config("could not find home directory".to_string()))?;
    Ok(home.join(".ctxguard").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = MemoryConfig::default();
        assert_eq!(config.window_pairs, 15);
        assert_eq!(config.compression_threshold, 800);
        assert!(config.token_budget < config.aggressive_token_budget);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = CtxguardConfig::from_toml("[memory]\nwindow_pairs = 4\n").unwrap();
        assert_eq!(config.memory.window_pairs, 4);
        assert_eq!(config.memory.compression_threshold, DEFAULT_COMPRESSION_THRESHOLD);

        let empty = CtxguardConfig::from_toml("").unwrap();
        assert_eq!(empty, CtxguardConfig::default());
    }

    #[test]
    fn test_invalid_toml_is_an_error() {
        let err = CtxguardConfig::from_toml("[memory]\nwindow_pairs = \"many\"\n").unwrap_err();
        assert!(matches!(err, CtxguardError::Toml(_)));
    }

    #[test]
    fn test_config_path_resolution() {
        let path = config_path_in(Some(PathBuf::from("/opt/ctx")), Some(PathBuf::from("/home/me")))
            .unwrap();
        assert_eq!(path, PathBuf::from("/opt/ctx/config.toml"));

        let path = config_path_in(None, Some(PathBuf::from("/home/me"))).unwrap();
        assert_eq!(path, PathBuf::from("/home/me/.ctxguard/config.toml"));

        let err = config_path_in(None, None).unwrap_err();
        assert!(matches!(err, CtxguardError::Config(_)));
    }

    #[test]
    fn test_builders() {
        let config = MemoryConfig::new()
            .with_window_pairs(3)
            .with_compression_threshold(100)
            .with_context_length(32_000)
            .with_token_budgets(10, 20);
        assert_eq!(config.window_pairs, 3);
        assert_eq!(config.compression_threshold, 100);
        assert_eq!(config.context_length, 32_000);
        assert_eq!((config.token_budget, config.aggressive_token_budget), (10, 20));
    }
}
