//! Configuration types and loading.
//!
//! The main entry point is [`PricingConfig`], loaded with [`load_config`]
//! from three layers, later ones winning:
//!
//! 1. built-in defaults
//! 2. `.pricing/config.yaml`, if present
//! 3. `PRICING_*` environment variables (`PRICING_MAX_DEPTH=8`)

use std::path::{Path, PathBuf};

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Yaml};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A layer could not be read or did not match the expected shape.
    #[error("failed to load configuration: {0}")]
    Load(#[from] Box<figment::Error>),

    /// The `.pricing/` directory was not found.
    #[error("no .pricing directory found")]
    PricingDirNotFound,

    /// A configuration value was invalid.
    #[error("invalid configuration value for key '{key}': {reason}")]
    InvalidValue {
        /// The configuration key that had an invalid value.
        key: String,
        /// A description of why the value is invalid.
        reason: String,
    },
}

impl From<figment::Error> for ConfigError {
    fn from(e: figment::Error) -> Self {
        Self::Load(Box::new(e))
    }
}

/// A specialized `Result` type for configuration operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Prefix of environment variables that override file settings.
pub const ENV_PREFIX: &str = "PRICING_";

/// Name of the configuration file inside `.pricing/`.
pub const CONFIG_FILE: &str = "config.yaml";

// ---------------------------------------------------------------------------
// Main config struct
// ---------------------------------------------------------------------------

/// Engine and CLI settings, corresponding to `.pricing/config.yaml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricingConfig {
    /// Definitions file. Relative paths are resolved against the
    /// `.pricing/` directory.
    #[serde(default = "default_definitions")]
    pub definitions: PathBuf,

    /// Bound on nested calculation references.
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,

    /// Decimal places used when printing amounts.
    #[serde(default = "default_precision")]
    pub precision: usize,

    /// `tracing` filter directive, e.g. `pricing_formula=debug`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log: Option<String>,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            definitions: default_definitions(),
            max_depth: default_max_depth(),
            precision: default_precision(),
            log: None,
        }
    }
}

fn default_definitions() -> PathBuf {
    PathBuf::from("definitions.toml")
}

fn default_max_depth() -> usize {
    32
}

fn default_precision() -> usize {
    2
}

impl PricingConfig {
    /// Resolves the definitions path against `base`.
    pub fn definitions_path(&self, base: &Path) -> PathBuf {
        if self.definitions.is_absolute() {
            self.definitions.clone()
        } else {
            base.join(&self.definitions)
        }
    }

    fn check(self) -> Result<Self> {
        if self.max_depth == 0 {
            return Err(ConfigError::InvalidValue {
                key: "max_depth".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(self)
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// The layered configuration sources for a `.pricing/` directory.
pub fn figment(pricing_dir: &Path) -> Figment {
    Figment::from(Serialized::defaults(PricingConfig::default()))
        .merge(Yaml::file(pricing_dir.join(CONFIG_FILE)))
        .merge(Env::prefixed(ENV_PREFIX).only(&["definitions", "max_depth", "precision", "log"]))
}

/// Load configuration for the given `.pricing/` directory.
///
/// A missing directory or file yields the defaults, still subject to
/// environment overrides.
///
/// # Errors
///
/// Returns [`ConfigError::Load`] if a layer has the wrong shape, or
/// [`ConfigError::InvalidValue`] for out-of-range settings.
pub fn load_config(pricing_dir: &Path) -> Result<PricingConfig> {
    let config: PricingConfig = figment(pricing_dir).extract()?;
    config.check()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
