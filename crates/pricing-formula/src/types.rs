//! Error types and the pricing report model.

use std::collections::BTreeMap;

use serde::{Serialize, Serializer};

use pricing_core::{DefinitionError, Value};

/// Errors raised while evaluating a single condition or calculation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EvalError {
    #[error("unknown reference: {0}")]
    UnknownReference(String),

    #[error("variable {0} has no value")]
    MissingValue(String),

    #[error("type mismatch: {op} cannot be applied to {found}")]
    TypeMismatch { op: &'static str, found: String },

    #[error("division by zero")]
    DivideByZero,

    #[error("cyclic reference: {}", .chain.join(" -> "))]
    CyclicReference { chain: Vec<String> },

    #[error("calculation nesting exceeds depth limit {limit}")]
    DepthExceeded { limit: usize },

    #[error("condition {name} evaluated to {found}, expected boolean")]
    NotBoolean { name: String, found: String },

    #[error("calculation {name} evaluated to {found}, expected number")]
    NotNumeric { name: String, found: String },
}

impl EvalError {
    /// Creates a [`EvalError::TypeMismatch`] naming the offending operand
    /// kinds.
    pub fn type_mismatch(op: &'static str, operands: &[&Value]) -> Self {
        let kinds: Vec<&str> = operands.iter().map(|v| v.kind()).collect();
        Self::TypeMismatch {
            op,
            found: kinds.join(" and "),
        }
    }
}

/// Errors raised by the engine entry points, before any rule runs.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("unknown pricing strategy: {0}")]
    UnknownPricing(String),

    #[error("invalid input for {name}: {reason}")]
    InvalidInput { name: String, reason: String },
}

/// Errors that can occur while loading definition files.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("parse error: {0}")]
    Parse(String),

    #[error("definitions not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Definition(#[from] DefinitionError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl LoadError {
    /// Returns `true` if the file parsed but its definitions were rejected.
    pub fn is_definition_error(&self) -> bool {
        matches!(self, Self::Definition(_))
    }
}

/// What happened to one rule of a pricing run.
#[derive(Debug, Clone, PartialEq)]
pub enum RuleOutcome {
    /// The condition held and the calculation produced a value.
    Applied(f64),
    /// The condition evaluated to `false`.
    NotMet,
    /// Either the condition or the calculation failed. `condition_met`
    /// tells which: `false` for a condition failure.
    Failed { condition_met: bool, error: EvalError },
}

/// The per-rule record of a pricing run.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleResult {
    pub condition_name: String,
    pub calculation_name: String,
    /// Calculation display name, set when the rule applied.
    pub display_name: String,
    /// Calculation tokens joined by spaces, set when the rule applied.
    pub formula: String,
    pub outcome: RuleOutcome,
}

impl RuleResult {
    pub fn condition_met(&self) -> bool {
        match self.outcome {
            RuleOutcome::Applied(_) => true,
            RuleOutcome::NotMet => false,
            RuleOutcome::Failed { condition_met, .. } => condition_met,
        }
    }

    pub fn value(&self) -> Option<f64> {
        match self.outcome {
            RuleOutcome::Applied(v) => Some(v),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&EvalError> {
        match self.outcome {
            RuleOutcome::Failed { ref error, .. } => Some(error),
            _ => None,
        }
    }
}

/// Flat view of a [`RuleResult`] matching the response contract:
/// `{condition_name, condition_met, calculation_name, display_name, formula,
/// value, error}`.
#[derive(Serialize)]
struct RuleRecord<'a> {
    condition_name: &'a str,
    condition_met: bool,
    calculation_name: &'a str,
    #[serde(skip_serializing_if = "is_blank")]
    display_name: &'a str,
    #[serde(skip_serializing_if = "is_blank")]
    formula: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    value: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

fn is_blank(s: &&str) -> bool {
    s.is_empty()
}

impl Serialize for RuleResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        RuleRecord {
            condition_name: &self.condition_name,
            condition_met: self.condition_met(),
            calculation_name: &self.calculation_name,
            display_name: &self.display_name,
            formula: &self.formula,
            value: self.value(),
            error: self.error().map(ToString::to_string),
        }
        .serialize(serializer)
    }
}

/// The result of applying a pricing strategy.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PricingReport {
    /// Name of the strategy that produced this report.
    #[serde(skip)]
    pub pricing: String,

    /// One record per rule, in rule order.
    pub results: Vec<RuleResult>,

    /// Sum of every applied value.
    pub total: f64,

    /// Applied value per calculation name. A calculation applied by more
    /// than one rule accumulates.
    pub summary: BTreeMap<String, f64>,
}

impl PricingReport {
    /// Returns the records of rules that failed.
    pub fn failures(&self) -> impl Iterator<Item = &RuleResult> {
        self.results.iter().filter(|r| r.error().is_some())
    }
}
