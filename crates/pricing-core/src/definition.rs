//! Definition records: variables, conditions, calculations and pricing
//! strategies.
//!
//! These are the already-deserialized shapes handed to the engine. They are
//! plain data; validation lives in [`crate::validation`].

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::enums::ValueType;
use crate::token::tokenize;

/// A named, typed input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variable {
    /// Unique name, referenced from expressions.
    pub name: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub display_name: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub category: String,

    /// Declared type; `type` is accepted as an alias.
    #[serde(alias = "type")]
    pub value_type: ValueType,

    /// Raw default, checked against `value_type` when the catalog loads.
    #[serde(default, alias = "default", skip_serializing_if = "Option::is_none")]
    pub default_value: Option<serde_json::Value>,

    /// Type-specific constraints.
    #[serde(default, skip_serializing_if = "Constraints::is_empty")]
    pub constraints: Constraints,

    /// Built-in variables sort before user variables.
    #[serde(default)]
    pub is_system: bool,
}

impl Variable {
    /// Creates a variable with no default and no constraints.
    pub fn new(name: impl Into<String>, value_type: ValueType) -> Self {
        Self {
            name: name.into(),
            display_name: String::new(),
            description: String::new(),
            category: String::new(),
            value_type,
            default_value: None,
            constraints: Constraints::default(),
            is_system: false,
        }
    }

    /// Sets the raw default value.
    pub fn with_default(mut self, default: impl Into<serde_json::Value>) -> Self {
        self.default_value = Some(default.into());
        self
    }

    /// Sets the constraints.
    pub fn with_constraints(mut self, constraints: Constraints) -> Self {
        self.constraints = constraints;
        self
    }

    /// Marks the variable as a system built-in.
    pub fn system(mut self) -> Self {
        self.is_system = true;
        self
    }

    /// Ordering used for every variable listing: system variables first,
    /// then by name.
    pub fn listing_order(a: &Variable, b: &Variable) -> std::cmp::Ordering {
        b.is_system
            .cmp(&a.is_system)
            .then_with(|| a.name.cmp(&b.name))
    }
}

/// Type-specific constraints. Only the fields relevant to the variable's
/// type are consulted; the rest are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Constraints {
    // number
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub precision: Option<i64>,

    // text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,

    // enum
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values: Option<Vec<String>>,

    // array
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_items: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_items: Option<i64>,

    // char
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_chars: Option<String>,

    // point
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_y: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_y: Option<f64>,
}

impl Constraints {
    /// Returns `true` if no constraint is set.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// An ordered token sequence.
///
/// Deserializes from either an array of token strings or a single formula
/// string, which is split with [`tokenize`]. Always serializes as an array.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tokens(pub Vec<String>);

impl Tokens {
    /// Returns the tokens as a slice.
    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    /// Returns `true` if there are no tokens.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Tokens {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join(" "))
    }
}

impl<S: Into<String>> FromIterator<S> for Tokens {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

impl Serialize for Tokens {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Tokens {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            List(Vec<String>),
            Formula(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::List(tokens) => Ok(Self(tokens)),
            Raw::Formula(src) => tokenize(&src)
                .map(Self)
                .map_err(serde::de::Error::custom),
        }
    }
}

/// A named boolean formula gating a calculation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub name: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub display_name: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,

    /// `formula` is accepted as an alias.
    #[serde(alias = "formula")]
    pub tokens: Tokens,
}

impl Condition {
    /// Creates a condition from a token sequence.
    pub fn new<S: Into<String>>(name: impl Into<String>, tokens: impl IntoIterator<Item = S>) -> Self {
        Self {
            name: name.into(),
            display_name: String::new(),
            description: String::new(),
            tokens: tokens.into_iter().collect(),
        }
    }
}

/// A named numeric formula.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Calculation {
    pub name: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub display_name: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,

    /// `formula` is accepted as an alias.
    #[serde(alias = "formula")]
    pub tokens: Tokens,
}

impl Calculation {
    /// Creates a calculation from a token sequence.
    pub fn new<S: Into<String>>(name: impl Into<String>, tokens: impl IntoIterator<Item = S>) -> Self {
        Self {
            name: name.into(),
            display_name: String::new(),
            description: String::new(),
            tokens: tokens.into_iter().collect(),
        }
    }

    /// Sets the display name.
    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = display_name.into();
        self
    }
}

/// One `(condition, calculation)` pair of a pricing strategy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingRule {
    #[serde(alias = "condition")]
    pub condition_name: String,

    #[serde(alias = "calculation")]
    pub calculation_name: String,
}

impl PricingRule {
    pub fn new(condition: impl Into<String>, calculation: impl Into<String>) -> Self {
        Self {
            condition_name: condition.into(),
            calculation_name: calculation.into(),
        }
    }
}

/// An ordered list of rules defining how a price is assembled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pricing {
    pub name: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,

    /// Order determines both evaluation and accumulation order.
    #[serde(default)]
    pub rules: Vec<PricingRule>,
}

impl Pricing {
    pub fn new(name: impl Into<String>, rules: Vec<PricingRule>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            rules,
        }
    }
}

/// A full set of definitions, as stored in a definitions file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Definitions {
    #[serde(default)]
    pub variables: Vec<Variable>,

    #[serde(default)]
    pub conditions: Vec<Condition>,

    #[serde(default)]
    pub calculations: Vec<Calculation>,

    #[serde(default)]
    pub pricings: Vec<Pricing>,
}
