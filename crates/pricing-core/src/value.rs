//! The runtime value model.
//!
//! Every value flowing through validation, input coercion and evaluation is
//! a [`Value`]. Numeric coercion is explicit: [`Value::to_float`] accepts
//! numbers, numeric text and booleans and rejects everything else.

use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};
use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::enums::ValueType;

/// `chrono` format of a date value.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// `chrono` format of a datetime value (seconds precision).
pub const DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// A typed value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Number(f64),
    Boolean(bool),
    Text(String),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    Enum(String),
    Array(Vec<Value>),
    Point { x: f64, y: f64 },
}

/// Errors raised while converting or parsing values.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValueError {
    /// The value has no numeric interpretation.
    #[error("cannot convert {kind} to a number")]
    UnsupportedType {
        /// What was offered for conversion.
        kind: String,
    },

    /// A raw value does not match its declared type.
    #[error("invalid {expected} value {raw:?}: {reason}")]
    Parse {
        /// The type the value was parsed as.
        expected: ValueType,
        /// The raw input.
        raw: String,
        /// Why parsing failed.
        reason: String,
    },
}

impl ValueError {
    /// Creates a [`ValueError::UnsupportedType`].
    pub fn unsupported(kind: impl Into<String>) -> Self {
        Self::UnsupportedType { kind: kind.into() }
    }

    /// Creates a [`ValueError::Parse`].
    pub fn parse(expected: ValueType, raw: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Parse {
            expected,
            raw: raw.into(),
            reason: reason.into(),
        }
    }
}

impl Value {
    /// Short name of the value's kind, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Number(_) => "number",
            Self::Boolean(_) => "boolean",
            Self::Text(_) => "text",
            Self::Date(_) => "date",
            Self::DateTime(_) => "datetime",
            Self::Enum(_) => "enum",
            Self::Array(_) => "array",
            Self::Point { .. } => "point",
        }
    }

    /// Numeric coercion.
    ///
    /// Numbers pass through, booleans become `1.0`/`0.0` and text is parsed.
    /// Every other kind is an [`ValueError::UnsupportedType`].
    pub fn to_float(&self) -> Result<f64, ValueError> {
        match self {
            Self::Number(n) => Ok(*n),
            Self::Boolean(b) => Ok(if *b { 1.0 } else { 0.0 }),
            Self::Text(s) => parse_float(s).ok_or_else(|| ValueError::unsupported("non-numeric text")),
            Self::Date(_)
            | Self::DateTime(_)
            | Self::Enum(_)
            | Self::Array(_)
            | Self::Point { .. } => Err(ValueError::unsupported(self.kind())),
        }
    }

    /// Returns the boolean if this is a [`Value::Boolean`].
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Infers a value from an untyped JSON value.
    ///
    /// Used for inputs that name no declared variable. `null` has no value
    /// representation.
    pub fn from_json(json: &serde_json::Value) -> Result<Value, ValueError> {
        match json {
            serde_json::Value::Null => Err(ValueError::unsupported("null")),
            serde_json::Value::Bool(b) => Ok(Self::Boolean(*b)),
            serde_json::Value::Number(n) => n
                .as_f64()
                .map(Self::Number)
                .ok_or_else(|| ValueError::unsupported("out-of-range number")),
            serde_json::Value::String(s) => Ok(Self::Text(s.clone())),
            serde_json::Value::Array(items) => items
                .iter()
                .map(Self::from_json)
                .collect::<Result<Vec<_>, _>>()
                .map(Self::Array),
            serde_json::Value::Object(_) => point_from_json(json),
        }
    }
}

/// Numeric coercion over untyped caller data.
///
/// Integers of every width are widened, numeric strings are parsed and
/// booleans map to `1.0`/`0.0`. `null`, arrays and objects are rejected.
pub fn convert_to_float(json: &serde_json::Value) -> Result<f64, ValueError> {
    match json {
        serde_json::Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| ValueError::unsupported("out-of-range number")),
        serde_json::Value::String(s) => {
            parse_float(s).ok_or_else(|| ValueError::unsupported("non-numeric text"))
        }
        serde_json::Value::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
        serde_json::Value::Null => Err(ValueError::unsupported("null")),
        serde_json::Value::Array(_) => Err(ValueError::unsupported("array")),
        serde_json::Value::Object(_) => Err(ValueError::unsupported("object")),
    }
}

impl ValueType {
    /// Parses a raw string as a value of this type.
    pub fn parse_value(&self, raw: &str) -> Result<Value, ValueError> {
        match self {
            Self::Number => parse_float(raw)
                .map(Value::Number)
                .ok_or_else(|| ValueError::parse(*self, raw, "not a number")),
            Self::Text => Ok(Value::Text(raw.to_string())),
            Self::Boolean => match raw {
                "true" => Ok(Value::Boolean(true)),
                "false" => Ok(Value::Boolean(false)),
                _ => Err(ValueError::parse(*self, raw, "expected \"true\" or \"false\"")),
            },
            Self::Date => parse_date(raw).map(Value::Date),
            Self::Datetime => parse_datetime(raw).map(Value::DateTime),
            Self::Enum => Ok(Value::Enum(raw.to_string())),
            Self::Array => {
                let json: serde_json::Value = serde_json::from_str(raw)
                    .map_err(|e| ValueError::parse(*self, raw, e.to_string()))?;
                if !json.is_array() {
                    return Err(ValueError::parse(*self, raw, "not an array literal"));
                }
                Value::from_json(&json)
            }
            Self::Char => {
                let mut chars = raw.chars();
                match (chars.next(), chars.next()) {
                    (Some(_), None) => Ok(Value::Text(raw.to_string())),
                    _ => Err(ValueError::parse(*self, raw, "expected exactly one character")),
                }
            }
            Self::Point => {
                let trimmed = raw.trim();
                if trimmed.starts_with('{') {
                    let json: serde_json::Value = serde_json::from_str(trimmed)
                        .map_err(|e| ValueError::parse(*self, raw, e.to_string()))?;
                    return point_from_json(&json);
                }
                let parts: Vec<&str> = trimmed.split(',').collect();
                match parts.as_slice() {
                    [x, y] => match (parse_float(x), parse_float(y)) {
                        (Some(x), Some(y)) => Ok(Value::Point { x, y }),
                        _ => Err(ValueError::parse(*self, raw, "coordinates must be numbers")),
                    },
                    _ => Err(ValueError::parse(*self, raw, "expected \"x,y\"")),
                }
            }
        }
    }

    /// Coerces a JSON value to this type.
    ///
    /// Strings are parsed with [`ValueType::parse_value`]; JSON numbers,
    /// booleans, arrays and `{x,y}` objects are accepted where they fit.
    /// Booleans become `1`/`0` for numbers.
    pub fn coerce_json(&self, json: &serde_json::Value) -> Result<Value, ValueError> {
        use serde_json::Value as Json;

        match (self, json) {
            (_, Json::String(s)) => self.parse_value(s),
            (Self::Number, Json::Number(_) | Json::Bool(_)) => convert_to_float(json)
                .map(Value::Number)
                .map_err(|e| ValueError::parse(*self, json.to_string(), e.to_string())),
            (Self::Text, Json::Number(_) | Json::Bool(_)) => Ok(Value::Text(json.to_string())),
            (Self::Boolean, Json::Bool(b)) => Ok(Value::Boolean(*b)),
            (Self::Array, Json::Array(_)) => Value::from_json(json),
            (Self::Point, Json::Object(_)) => point_from_json(json),
            _ => Err(ValueError::parse(
                *self,
                json.to_string(),
                format!("expected {}", self),
            )),
        }
    }
}

/// Parses a finite float, ignoring surrounding whitespace.
pub fn parse_float(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Parses a strict `YYYY-MM-DD` date.
pub fn parse_date(raw: &str) -> Result<NaiveDate, ValueError> {
    if !matches_shape(raw, "dddd-dd-dd") {
        return Err(ValueError::parse(ValueType::Date, raw, "expected YYYY-MM-DD"));
    }
    NaiveDate::parse_from_str(raw, DATE_FORMAT)
        .map_err(|e| ValueError::parse(ValueType::Date, raw, e.to_string()))
}

/// Parses a datetime from its `YYYY-MM-DDTHH:MM:SS` prefix.
///
/// Anything after the first 19 characters (fractional seconds, offsets) is
/// ignored.
pub fn parse_datetime(raw: &str) -> Result<NaiveDateTime, ValueError> {
    let prefix = raw.get(..19).unwrap_or(raw);
    if !matches_shape(prefix, "dddd-dd-ddTdd:dd:dd") {
        return Err(ValueError::parse(
            ValueType::Datetime,
            raw,
            "expected YYYY-MM-DDTHH:MM:SS",
        ));
    }
    NaiveDateTime::parse_from_str(prefix, DATETIME_FORMAT)
        .map_err(|e| ValueError::parse(ValueType::Datetime, raw, e.to_string()))
}

/// Checks `raw` against a shape where `d` stands for an ASCII digit and any
/// other character must match literally.
fn matches_shape(raw: &str, shape: &str) -> bool {
    raw.len() == shape.len()
        && raw
            .bytes()
            .zip(shape.bytes())
            .all(|(c, s)| if s == b'd' { c.is_ascii_digit() } else { c == s })
}

fn point_from_json(json: &serde_json::Value) -> Result<Value, ValueError> {
    let raw = json.to_string();
    let field = |name: &str| {
        json.get(name)
            .ok_or_else(|| ValueError::parse(ValueType::Point, &raw, format!("missing field {}", name)))
            .and_then(|v| {
                convert_to_float(v).map_err(|_| {
                    ValueError::parse(ValueType::Point, &raw, format!("field {} is not a number", name))
                })
            })
    };
    Ok(Value::Point {
        x: field("x")?,
        y: field("y")?,
    })
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{}", n),
            Self::Boolean(b) => write!(f, "{}", b),
            Self::Text(s) | Self::Enum(s) => f.write_str(s),
            Self::Date(d) => write!(f, "{}", d.format(DATE_FORMAT)),
            Self::DateTime(dt) => write!(f, "{}", dt.format(DATETIME_FORMAT)),
            Self::Array(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str("]")
            }
            Self::Point { x, y } => write!(f, "{},{}", x, y),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Number(n) => serializer.serialize_f64(*n),
            Self::Boolean(b) => serializer.serialize_bool(*b),
            Self::Text(s) | Self::Enum(s) => serializer.serialize_str(s),
            Self::Date(_) | Self::DateTime(_) => serializer.collect_str(self),
            Self::Array(items) => serializer.collect_seq(items),
            Self::Point { x, y } => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("x", x)?;
                map.serialize_entry("y", y)?;
                map.end()
            }
        }
    }
}

macro_rules! impl_from_number {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(n: $ty) -> Self {
                    Self::Number(n as f64)
                }
            }
        )+
    };
}

impl_from_number!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize, f32, f64);

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Boolean(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Text(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn to_float_coercions() {
        assert_eq!(Value::from(true).to_float().unwrap(), 1.0);
        assert_eq!(Value::from(false).to_float().unwrap(), 0.0);
        assert_eq!(Value::from("12.5").to_float().unwrap(), 12.5);
        assert_eq!(Value::from(7u16).to_float().unwrap(), 7.0);
        assert_eq!(Value::from(-3i64).to_float().unwrap(), -3.0);
        assert!(Value::from("abc").to_float().is_err());
        assert!(Value::Enum("gold".into()).to_float().is_err());
        assert!(Value::Point { x: 1.0, y: 2.0 }.to_float().is_err());
    }

    #[test]
    fn to_float_rejects_non_finite_text() {
        assert!(Value::from("inf").to_float().is_err());
        assert!(Value::from("NaN").to_float().is_err());
    }

    #[test]
    fn convert_to_float_over_json() {
        assert_eq!(convert_to_float(&json!(true)).unwrap(), 1.0);
        assert_eq!(convert_to_float(&json!(false)).unwrap(), 0.0);
        assert_eq!(convert_to_float(&json!("12.5")).unwrap(), 12.5);
        assert_eq!(convert_to_float(&json!(42)).unwrap(), 42.0);
        assert_eq!(convert_to_float(&json!(u64::MAX)).unwrap(), u64::MAX as f64);
        assert!(matches!(
            convert_to_float(&json!("abc")),
            Err(ValueError::UnsupportedType { .. })
        ));
        assert!(matches!(
            convert_to_float(&json!(null)),
            Err(ValueError::UnsupportedType { .. })
        ));
    }

    #[test]
    fn parse_number_and_boolean() {
        assert_eq!(ValueType::Number.parse_value(" 100 ").unwrap(), Value::Number(100.0));
        assert!(ValueType::Number.parse_value("ten").is_err());
        assert_eq!(ValueType::Boolean.parse_value("true").unwrap(), Value::Boolean(true));
        assert!(ValueType::Boolean.parse_value("yes").is_err());
        assert!(ValueType::Boolean.parse_value("True").is_err());
    }

    #[test]
    fn parse_dates_strictly() {
        let d = ValueType::Date.parse_value("2024-02-29").unwrap();
        assert_eq!(d.to_string(), "2024-02-29");
        assert!(ValueType::Date.parse_value("2024-2-29").is_err());
        assert!(ValueType::Date.parse_value("2023-02-29").is_err());
        assert!(ValueType::Date.parse_value("2024-02-29T10:00:00").is_err());
    }

    #[test]
    fn parse_datetime_uses_prefix() {
        let dt = ValueType::Datetime
            .parse_value("2024-05-01T08:30:00.250Z")
            .unwrap();
        assert_eq!(dt.to_string(), "2024-05-01T08:30:00");
        assert!(ValueType::Datetime.parse_value("2024-05-01 08:30:00").is_err());
        assert!(ValueType::Datetime.parse_value("2024-05-01").is_err());
    }

    #[test]
    fn parse_point_forms() {
        assert_eq!(
            ValueType::Point.parse_value("1.5, -2").unwrap(),
            Value::Point { x: 1.5, y: -2.0 }
        );
        assert_eq!(
            ValueType::Point.parse_value(r#"{"x": 3, "y": 4}"#).unwrap(),
            Value::Point { x: 3.0, y: 4.0 }
        );
        assert!(ValueType::Point.parse_value(r#"{"x": 3}"#).is_err());
        assert!(ValueType::Point.parse_value("1,2,3").is_err());
    }

    #[test]
    fn parse_char_and_array() {
        assert_eq!(ValueType::Char.parse_value("é").unwrap(), Value::Text("é".into()));
        assert!(ValueType::Char.parse_value("ab").is_err());
        assert!(ValueType::Char.parse_value("").is_err());
        assert_eq!(
            ValueType::Array.parse_value("[1, \"a\"]").unwrap(),
            Value::Array(vec![Value::Number(1.0), Value::Text("a".into())])
        );
        assert!(ValueType::Array.parse_value("{}").is_err());
    }

    #[test]
    fn coerce_json_per_type() {
        assert_eq!(ValueType::Number.coerce_json(&json!(3)).unwrap(), Value::Number(3.0));
        assert_eq!(ValueType::Number.coerce_json(&json!("3")).unwrap(), Value::Number(3.0));
        assert_eq!(ValueType::Text.coerce_json(&json!(3)).unwrap(), Value::Text("3".into()));
        assert_eq!(ValueType::Boolean.coerce_json(&json!(false)).unwrap(), Value::Boolean(false));
        assert_eq!(ValueType::Number.coerce_json(&json!(true)).unwrap(), Value::Number(1.0));
        assert_eq!(ValueType::Number.coerce_json(&json!(false)).unwrap(), Value::Number(0.0));
        assert!(ValueType::Number.coerce_json(&json!([1])).is_err());
        assert!(ValueType::Date.coerce_json(&json!(20240101)).is_err());
    }

    #[test]
    fn serializes_naturally() {
        let v = Value::Array(vec![
            Value::Number(1.5),
            Value::Date(NaiveDate::from_ymd_opt(2024, 1, 2).unwrap()),
            Value::Point { x: 1.0, y: 2.0 },
        ]);
        assert_eq!(
            serde_json::to_value(&v).unwrap(),
            json!([1.5, "2024-01-02", {"x": 1.0, "y": 2.0}])
        );
    }
}
