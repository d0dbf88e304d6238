//! Definition-time validation.
//!
//! Variable constraints and defaults are checked here, before any
//! evaluation happens. These errors reject a definition outright; they are
//! never produced while pricing.

use regex::Regex;

use crate::definition::{Constraints, Variable};
use crate::enums::ValueType;
use crate::value::{Value, ValueError};

/// Largest accepted `precision` constraint.
pub const MAX_PRECISION: i64 = 10;

/// Error type for invalid definitions.
#[derive(Debug, thiserror::Error)]
pub enum DefinitionError {
    #[error("variable {variable}: invalid constraint: {reason}")]
    InvalidConstraint { variable: String, reason: String },

    #[error("variable {variable}: invalid default: {reason}")]
    InvalidDefault { variable: String, reason: String },

    #[error("duplicate {kind} name: {name}")]
    DuplicateName { kind: &'static str, name: String },

    #[error("{kind} {name} has an empty expression")]
    EmptyExpression { kind: &'static str, name: String },

    #[error("{kind} name {name:?} is reserved")]
    ReservedName { kind: &'static str, name: String },

    #[error("{kind} {name}: syntax error: {reason}")]
    Syntax {
        kind: &'static str,
        name: String,
        reason: String,
    },
}

impl DefinitionError {
    fn constraint(variable: &Variable, reason: impl Into<String>) -> Self {
        Self::InvalidConstraint {
            variable: variable.name.clone(),
            reason: reason.into(),
        }
    }

    fn bad_default(variable: &Variable, reason: impl Into<String>) -> Self {
        Self::InvalidDefault {
            variable: variable.name.clone(),
            reason: reason.into(),
        }
    }
}

/// Validates a variable's constraints and default value.
///
/// Returns the typed default, if one is declared.
pub fn validate_variable(var: &Variable) -> Result<Option<Value>, DefinitionError> {
    check_constraints(var)?;

    let Some(raw) = var.default_value.as_ref() else {
        return Ok(None);
    };
    let value = var
        .value_type
        .coerce_json(raw)
        .map_err(|e| DefinitionError::bad_default(var, describe(&e)))?;
    check_default(var, &value)?;
    Ok(Some(value))
}

fn check_constraints(var: &Variable) -> Result<(), DefinitionError> {
    let c = &var.constraints;
    match var.value_type {
        ValueType::Number => {
            check_range(var, "min", c.min, "max", c.max)?;
            if let Some(step) = c.step {
                if !(step > 0.0) {
                    return Err(DefinitionError::constraint(
                        var,
                        format!("step must be greater than 0 (got {})", step),
                    ));
                }
            }
            if let Some(precision) = c.precision {
                if !(0..=MAX_PRECISION).contains(&precision) {
                    return Err(DefinitionError::constraint(
                        var,
                        format!(
                            "precision must be between 0 and {} (got {})",
                            MAX_PRECISION, precision
                        ),
                    ));
                }
            }
        }
        ValueType::Text => {
            check_counts(var, "minLength", c.min_length, "maxLength", c.max_length)?;
            if let Some(ref pattern) = c.pattern {
                Regex::new(pattern).map_err(|e| {
                    DefinitionError::constraint(var, format!("pattern does not compile: {}", e))
                })?;
            }
        }
        ValueType::Enum => {
            if c.values.as_ref().is_none_or(|v| v.is_empty()) {
                return Err(DefinitionError::constraint(var, "values must not be empty"));
            }
        }
        ValueType::Array => {
            if let Some(ref item_type) = c.item_type {
                item_type.parse::<ValueType>().map_err(|e| DefinitionError::constraint(var, e))?;
            }
            check_counts(var, "minItems", c.min_items, "maxItems", c.max_items)?;
        }
        ValueType::Char => {
            if let Some(ref allowed) = c.allowed_chars {
                char_class(allowed).map_err(|e| {
                    DefinitionError::constraint(
                        var,
                        format!("allowedChars is not a character class: {}", e),
                    )
                })?;
            }
        }
        ValueType::Point => {
            check_range(var, "minX", c.min_x, "maxX", c.max_x)?;
            check_range(var, "minY", c.min_y, "maxY", c.max_y)?;
        }
        ValueType::Boolean | ValueType::Date | ValueType::Datetime => {}
    }
    Ok(())
}

fn check_default(var: &Variable, value: &Value) -> Result<(), DefinitionError> {
    let c = &var.constraints;
    match (var.value_type, value) {
        (ValueType::Number, Value::Number(n)) => {
            if let Some(min) = c.min {
                if *n < min {
                    return Err(DefinitionError::bad_default(
                        var,
                        format!("{} is below min {}", n, min),
                    ));
                }
            }
            if let Some(max) = c.max {
                if *n > max {
                    return Err(DefinitionError::bad_default(
                        var,
                        format!("{} is above max {}", n, max),
                    ));
                }
            }
        }
        (ValueType::Enum, Value::Enum(s)) => {
            let allowed = c.values.as_deref().unwrap_or_default();
            if !allowed.iter().any(|v| v == s) {
                return Err(DefinitionError::bad_default(
                    var,
                    format!("{:?} is not one of {:?}", s, allowed),
                ));
            }
        }
        (ValueType::Array, Value::Array(items)) => {
            if let Some(ref item_type) = c.item_type {
                // The item type was already checked by `check_constraints`.
                let item_type: ValueType = item_type
                    .parse()
                    .map_err(|e: String| DefinitionError::constraint(var, e))?;
                for item in items {
                    item_matches(item_type, item).map_err(|e| DefinitionError::bad_default(var, e))?;
                }
            }
        }
        (ValueType::Char, Value::Text(s)) => {
            if let Some(ref allowed) = c.allowed_chars {
                let class = char_class(allowed)
                    .map_err(|e| DefinitionError::constraint(var, e.to_string()))?;
                if !class.is_match(s) {
                    return Err(DefinitionError::bad_default(
                        var,
                        format!("{:?} is not in allowedChars", s),
                    ));
                }
            }
        }
        _ => {}
    }
    Ok(())
}

fn item_matches(item_type: ValueType, item: &Value) -> Result<(), String> {
    let ok = match (item_type, item) {
        (ValueType::Number, Value::Number(_))
        | (ValueType::Boolean, Value::Boolean(_))
        | (ValueType::Array, Value::Array(_))
        | (ValueType::Point, Value::Point { .. }) => true,
        (ValueType::Text | ValueType::Enum, Value::Text(_)) => true,
        (ValueType::Char, Value::Text(s)) => s.chars().count() == 1,
        (ValueType::Date | ValueType::Datetime, Value::Text(s)) => {
            item_type.parse_value(s).is_ok()
        }
        _ => false,
    };
    if ok {
        Ok(())
    } else {
        Err(format!("array item {} is not a {}", item, item_type))
    }
}

fn check_range(
    var: &Variable,
    lo_name: &str,
    lo: Option<f64>,
    hi_name: &str,
    hi: Option<f64>,
) -> Result<(), DefinitionError> {
    if let (Some(lo), Some(hi)) = (lo, hi) {
        if lo > hi {
            return Err(DefinitionError::constraint(
                var,
                format!("{} {} is greater than {} {}", lo_name, lo, hi_name, hi),
            ));
        }
    }
    Ok(())
}

fn check_counts(
    var: &Variable,
    lo_name: &str,
    lo: Option<i64>,
    hi_name: &str,
    hi: Option<i64>,
) -> Result<(), DefinitionError> {
    for (name, n) in [(lo_name, lo), (hi_name, hi)] {
        if let Some(n) = n {
            if n < 0 {
                return Err(DefinitionError::constraint(
                    var,
                    format!("{} must not be negative (got {})", name, n),
                ));
            }
        }
    }
    if let (Some(lo), Some(hi)) = (lo, hi) {
        if lo > hi {
            return Err(DefinitionError::constraint(
                var,
                format!("{} {} is greater than {} {}", lo_name, lo, hi_name, hi),
            ));
        }
    }
    Ok(())
}

/// Compiles `allowed` as the body of a single-character class.
fn char_class(allowed: &str) -> Result<Regex, regex::Error> {
    Regex::new(&format!("^[{}]$", allowed))
}

fn describe(e: &ValueError) -> String {
    match e {
        ValueError::Parse { reason, raw, .. } => format!("{:?}: {}", raw, reason),
        ValueError::UnsupportedType { .. } => e.to_string(),
    }
}

/// Returns the names of constraints that are set but ignored for
/// `value_type`.
pub fn unused_constraints(value_type: ValueType, c: &Constraints) -> Vec<&'static str> {
    let mut unused = Vec::new();
    let mut flag = |set: bool, name: &'static str, applies: bool| {
        if set && !applies {
            unused.push(name);
        }
    };
    let number = value_type == ValueType::Number;
    let text = value_type == ValueType::Text;
    let array = value_type == ValueType::Array;
    let point = value_type == ValueType::Point;
    flag(c.min.is_some(), "min", number);
    flag(c.max.is_some(), "max", number);
    flag(c.step.is_some(), "step", number);
    flag(c.precision.is_some(), "precision", number);
    flag(c.min_length.is_some(), "minLength", text);
    flag(c.max_length.is_some(), "maxLength", text);
    flag(c.pattern.is_some(), "pattern", text);
    flag(c.values.is_some(), "values", value_type == ValueType::Enum);
    flag(c.item_type.is_some(), "itemType", array);
    flag(c.min_items.is_some(), "minItems", array);
    flag(c.max_items.is_some(), "maxItems", array);
    flag(c.allowed_chars.is_some(), "allowedChars", value_type == ValueType::Char);
    flag(c.min_x.is_some(), "minX", point);
    flag(c.max_x.is_some(), "maxX", point);
    flag(c.min_y.is_some(), "minY", point);
    flag(c.max_y.is_some(), "maxY", point);
    unused
}
