use serde::{Serialize, Serializer};
use std::fmt;

/// A single field of a record.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Text(String),
    Number(f64),
    /// A numeric column held text that does not parse as a number.
    NotANumber,
    /// The row ended before this column.
    Absent,
}

impl Value {
    /// Coerce raw field text the way numeric columns are read.
    ///
    /// Decimal and exponent forms parse; the only spelled-out number is
    /// `Infinity` with an optional sign.
    pub fn parse_number(raw: &str) -> Self {
        let t = raw.trim();
        match t {
            "Infinity" | "+Infinity" => return Value::Number(f64::INFINITY),
            "-Infinity" => return Value::Number(f64::NEG_INFINITY),
            _ => {}
        }
        if t.bytes().any(|b| b.is_ascii_alphabetic() && !matches!(b, b'e' | b'E')) {
            return Value::NotANumber;
        }
        match t.parse::<f64>() {
            Ok(n) if !n.is_nan() => Value::Number(n),
            _ => Value::NotANumber,
        }
    }

    pub fn text(s: impl Into<String>) -> Self {
        Value::Text(s.into())
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Value::Absent)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

/// Absent renders empty, so it joins into keys as an empty segment.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Text(s) => f.write_str(s),
            Value::Number(n) if n.is_infinite() => {
                f.write_str(if *n > 0.0 { "Infinity" } else { "-Infinity" })
            }
            Value::Number(n) => write!(f, "{}", n),
            Value::NotANumber => f.write_str("NaN"),
            Value::Absent => Ok(()),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Text(s) => serializer.serialize_str(s),
            Value::Number(n) => serializer.serialize_f64(*n),
            Value::NotANumber | Value::Absent => serializer.serialize_unit(),
        }
    }
}
