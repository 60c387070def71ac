//! Registry values.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A value held by the registry.
///
/// Equality is structural and drives the conflict check: `Integer(100)` and
/// `Decimal(100)` are different values. Decimals compare numerically, so
/// `100.0` and `100.00` are the same value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum RegistryValue {
    Integer(i64),
    Decimal(Decimal),
    Text(String),
    Bool(bool),
    Structured(serde_json::Value),
}

impl RegistryValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            RegistryValue::Integer(_) => "integer",
            RegistryValue::Decimal(_) => "decimal",
            RegistryValue::Text(_) => "text",
            RegistryValue::Bool(_) => "bool",
            RegistryValue::Structured(_) => "structured",
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            RegistryValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// True for values that carry no information (blank text, JSON null).
    pub fn is_blank(&self) -> bool {
        match self {
            RegistryValue::Text(s) => s.trim().is_empty(),
            RegistryValue::Structured(v) => v.is_null(),
            _ => false,
        }
    }
}

impl std::fmt::Display for RegistryValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RegistryValue::Integer(n) => write!(f, "{n}"),
            RegistryValue::Decimal(d) => write!(f, "{d}"),
            RegistryValue::Text(s) => write!(f, "{s:?}"),
            RegistryValue::Bool(b) => write!(f, "{b}"),
            RegistryValue::Structured(v) => write!(f, "{v}"),
        }
    }
}

impl From<i64> for RegistryValue {
    fn from(n: i64) -> Self {
        RegistryValue::Integer(n)
    }
}

impl From<i32> for RegistryValue {
    fn from(n: i32) -> Self {
        RegistryValue::Integer(i64::from(n))
    }
}

impl From<u32> for RegistryValue {
    fn from(n: u32) -> Self {
        RegistryValue::Integer(i64::from(n))
    }
}

impl From<Decimal> for RegistryValue {
    fn from(d: Decimal) -> Self {
        RegistryValue::Decimal(d)
    }
}

impl From<&str> for RegistryValue {
    fn from(s: &str) -> Self {
        RegistryValue::Text(s.to_string())
    }
}

impl From<String> for RegistryValue {
    fn from(s: String) -> Self {
        RegistryValue::Text(s)
    }
}

impl From<bool> for RegistryValue {
    fn from(b: bool) -> Self {
        RegistryValue::Bool(b)
    }
}

impl From<serde_json::Value> for RegistryValue {
    fn from(v: serde_json::Value) -> Self {
        RegistryValue::Structured(v)
    }
}
