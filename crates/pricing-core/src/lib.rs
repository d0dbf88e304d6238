//! Core types for the pricing engine.
//!
//! This crate holds the value model, the definition records (variables,
//! conditions, calculations and pricing strategies), token classification
//! and the definition-time validation rules. It performs no I/O.

pub mod definition;
pub mod enums;
pub mod token;
pub mod validation;
pub mod value;

pub use definition::{
    Calculation, Condition, Constraints, Definitions, Pricing, PricingRule, Tokens, Variable,
};
pub use enums::ValueType;
pub use validation::DefinitionError;
pub use value::{Value, ValueError};

/// Name of the condition that always holds without a lookup.
pub const ALWAYS: &str = "always";

/// Name of the built-in variable that exposes the running total.
pub const RUNNING_TOTAL: &str = "running_total";
