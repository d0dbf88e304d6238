//! Formula evaluation and pricing-rule engine.
//!
//! Conditions and calculations are compiled once into expression trees when
//! a [`Catalog`] is built. An [`Evaluator`] resolves them against one run's
//! variable environment, the pricing [`engine`] applies a strategy's rules in
//! order with a running total, and [`deps`] computes the variables a caller
//! must supply before a run.

pub mod ast;
pub mod catalog;
pub mod compile;
pub mod deps;
pub mod engine;
pub mod eval;
pub mod parser;
pub mod store;
pub mod types;

pub use catalog::{Catalog, Compiled};
pub use deps::{required_variables, required_variables_for};
pub use engine::{EngineOptions, apply, price};
pub use eval::{DEFAULT_MAX_DEPTH, Environment, Evaluator};
pub use store::CatalogStore;
pub use types::{EngineError, EvalError, LoadError, PricingReport, RuleOutcome, RuleResult};
