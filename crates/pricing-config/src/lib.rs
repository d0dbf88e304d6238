//! Configuration for the pricing engine and its command-line front end.
//!
//! This crate loads `.pricing/config.yaml` layered with `PRICING_*`
//! environment variables, and discovers `.pricing/` directories in the
//! filesystem.

pub mod config;
pub mod pricing_dir;

pub use config::{ConfigError, PricingConfig, Result, load_config};
pub use pricing_dir::{find_pricing_dir, find_pricing_dir_or_error};
