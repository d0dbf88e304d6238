//! Enum types for the pricing engine.
//!
//! `ValueType` is a closed set: an unknown type name is a definition error,
//! not a catch-all variant.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The declared type of a [`Variable`](crate::Variable).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    #[default]
    Number,
    Text,
    Boolean,
    Date,
    Datetime,
    Enum,
    Array,
    Char,
    Point,
}

impl ValueType {
    /// All value types, in declaration order.
    pub const ALL: [ValueType; 9] = [
        Self::Number,
        Self::Text,
        Self::Boolean,
        Self::Date,
        Self::Datetime,
        Self::Enum,
        Self::Array,
        Self::Char,
        Self::Point,
    ];

    /// Returns the string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Number => "number",
            Self::Text => "text",
            Self::Boolean => "boolean",
            Self::Date => "date",
            Self::Datetime => "datetime",
            Self::Enum => "enum",
            Self::Array => "array",
            Self::Char => "char",
            Self::Point => "point",
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ValueType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .find(|t| t.as_str() == s)
            .copied()
            .ok_or_else(|| format!("unknown value type: {}", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_str() {
        for ty in ValueType::ALL {
            assert_eq!(ty.as_str().parse::<ValueType>().unwrap(), ty);
        }
    }

    #[test]
    fn unknown_type_is_rejected() {
        assert!("money".parse::<ValueType>().is_err());
        assert!(serde_json::from_str::<ValueType>("\"money\"").is_err());
    }

    #[test]
    fn serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&ValueType::Datetime).unwrap(),
            "\"datetime\""
        );
    }
}
