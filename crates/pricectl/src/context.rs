//! Runtime context for command execution.
//!
//! The [`RuntimeContext`] holds what every command handler needs: global
//! flags, the effective configuration and the resolved definitions path.

use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};

use pricing_config::{PricingConfig, find_pricing_dir, load_config};
use pricing_formula::parser::{find_definitions, load_catalog};
use pricing_formula::{Catalog, EngineOptions};

use crate::cli::GlobalArgs;

/// Runtime context passed to every command handler.
///
/// Constructed once in `main` after CLI parsing, before command dispatch.
#[derive(Debug)]
pub struct RuntimeContext {
    /// Whether to produce JSON output.
    pub json: bool,

    /// Verbose output.
    pub verbose: bool,

    /// The discovered `.pricing/` directory, if any.
    pub pricing_dir: Option<PathBuf>,

    /// Effective configuration, with flag overrides applied.
    pub config: PricingConfig,

    /// Definitions file to load.
    pub definitions: PathBuf,
}

impl RuntimeContext {
    /// Build a `RuntimeContext` from parsed global arguments.
    ///
    /// Priority for the definitions file: `--defs` flag > `definitions` in
    /// configuration (relative to `.pricing/`) > `definitions.toml` in the
    /// working directory.
    pub fn from_global_args(global: &GlobalArgs) -> Result<Self> {
        let cwd = env::current_dir().context("cannot determine working directory")?;
        let pricing_dir = find_pricing_dir(&cwd);
        let config_dir = pricing_dir.clone().unwrap_or_else(|| cwd.join(".pricing"));
        let base = pricing_dir.clone().unwrap_or_else(|| cwd.clone());

        let mut config = load_config(&config_dir).context("failed to load configuration")?;
        if let Some(depth) = global.max_depth {
            if depth == 0 {
                bail!("--max-depth must be at least 1");
            }
            config.max_depth = depth;
        }

        let definitions = match global.defs {
            Some(ref name) => find_definitions(name, &cwd)?,
            None => config.definitions_path(&base),
        };

        Ok(Self {
            json: global.json,
            verbose: global.verbose,
            pricing_dir,
            config,
            definitions,
        })
    }

    /// Load, validate and compile the definitions file.
    pub fn catalog(&self) -> Result<Catalog> {
        load_catalog(&self.definitions)
            .with_context(|| format!("failed to load definitions from {}", self.definitions.display()))
    }

    pub fn engine_options(&self) -> EngineOptions {
        EngineOptions {
            max_depth: self.config.max_depth,
        }
    }

    /// Format an amount with the configured precision.
    pub fn amount(&self, value: f64) -> String {
        format!("{:.*}", self.config.precision, value)
    }
}
