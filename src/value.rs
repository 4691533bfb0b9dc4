//! Values flowing in and out of statements.
//!
//! Payloads and rows are ordered JSON objects: iteration order is insertion
//! order, which is what fixes the column order of generated SQL.

use serde::Serialize;
use serde_json::Value;

use crate::error::{BakeError, BakeResult};

/// Column -> value payload for inserts, updates and conditions.
pub type Fields = serde_json::Map<String, Value>;

/// One fetched record, column -> value, in result-set column order.
pub type ResultRow = serde_json::Map<String, Value>;

/// SQL type a parameter is bound as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindType {
    Integer,
    Null,
    String,
}

impl BindType {
    /// Infer the bind type of a payload value.
    ///
    /// Booleans and integers bind as INTEGER, null as NULL, everything else
    /// (floats included) as STRING.
    pub fn infer(value: &Value) -> Self {
        match value {
            Value::Bool(_) => BindType::Integer,
            Value::Number(n) if n.is_i64() => BindType::Integer,
            Value::Null => BindType::Null,
            _ => BindType::String,
        }
    }
}

/// A value ready to be handed to the driver.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Int(i64),
    String(String),
}

impl SqlValue {
    /// Convert a payload value according to [`BindType::infer`].
    pub fn from_json(value: &Value) -> Self {
        match (BindType::infer(value), value) {
            (BindType::Null, _) => SqlValue::Null,
            (BindType::Integer, Value::Bool(b)) => SqlValue::Int(i64::from(*b)),
            (BindType::Integer, Value::Number(n)) => n
                .as_i64()
                .map(SqlValue::Int)
                .unwrap_or_else(|| SqlValue::String(n.to_string())),
            (_, v) => SqlValue::String(text_of(v)),
        }
    }

    /// Wrap a payload value in `%...%` for LIKE matching.
    pub fn search(value: &Value) -> Self {
        SqlValue::String(format!("%{}%", text_of(value)))
    }

    pub fn bind_type(&self) -> BindType {
        match self {
            SqlValue::Null => BindType::Null,
            SqlValue::Int(_) => BindType::Integer,
            SqlValue::String(_) => BindType::String,
        }
    }
}

/// Textual form of a value as it would be interpolated into a string.
fn text_of(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(b) => i64::from(*b).to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Serialize `value` and require the result to be a mapping.
///
/// `what` names the argument in the error message.
pub fn to_fields<T>(value: &T, what: &str) -> BakeResult<Fields>
where
    T: Serialize + ?Sized,
{
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        other => Err(BakeError::validation(format!(
            "{what} must be a mapping, got {}",
            kind_name(&other)
        ))),
    }
}

fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a sequence",
        Value::Object(_) => "a mapping",
    }
}
