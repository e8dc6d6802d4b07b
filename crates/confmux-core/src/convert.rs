//! Converters: pure type coercions over [`Value`]
//!
//! A converter never looks at the key; wrap it in a
//! [`ConvMapper`](crate::ConvMapper) to place it in a schema.

use std::fmt;
use std::sync::Arc;

use crate::{Error, Result, Value};

/// Shared, thread-safe value coercion.
#[derive(Clone)]
pub struct Converter(Arc<dyn Fn(&Value) -> Result<Value> + Send + Sync>);

impl Converter {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&Value) -> Result<Value> + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    pub fn convert(&self, value: &Value) -> Result<Value> {
        (self.0)(value)
    }
}

impl fmt::Debug for Converter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Converter(..)")
    }
}

/// Coerce to `Int`.
///
/// Accepts integers, decimal strings and a reference to an `Int`.
pub fn to_int(value: &Value) -> Result<Value> {
    match value {
        Value::Int(i) => Ok(Value::Int(*i)),
        Value::Uint(u) => i64::try_from(*u)
            .map(Value::Int)
            .map_err(|_| Error::conversion("int", value)),
        Value::Str(s) => s
            .parse::<i64>()
            .map(Value::Int)
            .map_err(|_| Error::conversion("int", value)),
        Value::Ref(Some(inner)) => match inner.as_ref() {
            Value::Int(i) => Ok(Value::Int(*i)),
            _ => Err(Error::conversion("int", value)),
        },
        _ => Err(Error::conversion("int", value)),
    }
}

/// Coerce to `Str`.
///
/// Accepts strings, integers and a reference to a `Str`. A reference to an
/// integer is rejected.
pub fn to_str(value: &Value) -> Result<Value> {
    match value {
        Value::Str(s) => Ok(Value::Str(s.clone())),
        Value::Int(i) => Ok(Value::Str(i.to_string())),
        Value::Uint(u) => Ok(Value::Str(u.to_string())),
        Value::Ref(Some(inner)) => match inner.as_ref() {
            Value::Str(s) => Ok(Value::Str(s.clone())),
            _ => Err(Error::conversion("string", value)),
        },
        _ => Err(Error::conversion("string", value)),
    }
}

/// Coerce to `Bool`.
///
/// Accepts booleans, a reference to a `Bool`, the integers 0 and 1, and the
/// usual textual spellings (`true/false`, `t/f`, `y/n`, `yes/no`, `on/off`,
/// `1/0`), case-insensitively.
pub fn to_bool(value: &Value) -> Result<Value> {
    match value {
        Value::Bool(b) => Ok(Value::Bool(*b)),
        Value::Int(0) | Value::Uint(0) => Ok(Value::Bool(false)),
        Value::Int(1) | Value::Uint(1) => Ok(Value::Bool(true)),
        Value::Str(s) => match s.to_ascii_lowercase().as_str() {
            "1" | "t" | "true" | "y" | "yes" | "on" => Ok(Value::Bool(true)),
            "0" | "f" | "false" | "n" | "no" | "off" => Ok(Value::Bool(false)),
            _ => Err(Error::conversion("bool", value)),
        },
        Value::Ref(Some(inner)) => match inner.as_ref() {
            Value::Bool(b) => Ok(Value::Bool(*b)),
            _ => Err(Error::conversion("bool", value)),
        },
        _ => Err(Error::conversion("bool", value)),
    }
}

/// Coerce to `Float`.
pub fn to_float(value: &Value) -> Result<Value> {
    match value {
        Value::Float(x) => Ok(Value::Float(*x)),
        Value::Int(i) => Ok(Value::Float(*i as f64)),
        Value::Uint(u) => Ok(Value::Float(*u as f64)),
        Value::Str(s) => s
            .trim()
            .parse::<f64>()
            .map(Value::Float)
            .map_err(|_| Error::conversion("float", value)),
        Value::Ref(Some(inner)) => match inner.as_ref() {
            Value::Float(x) => Ok(Value::Float(*x)),
            _ => Err(Error::conversion("float", value)),
        },
        _ => Err(Error::conversion("float", value)),
    }
}

/// Coerce to a sequence of strings. A plain string is split on commas.
pub fn to_str_seq(value: &Value) -> Result<Value> {
    convert_seq(value, "string sequence", to_str)
}

/// Coerce to a sequence of integers. A plain string is split on commas.
pub fn to_int_seq(value: &Value) -> Result<Value> {
    convert_seq(value, "int sequence", to_int)
}

fn convert_seq(
    value: &Value,
    expected: &'static str,
    element: fn(&Value) -> Result<Value>,
) -> Result<Value> {
    let items = match value {
        Value::Seq(items) => items.iter().map(element).collect::<Result<Vec<_>>>(),
        Value::Str(s) if s.is_empty() => Ok(Vec::new()),
        Value::Str(s) => s
            .split(',')
            .map(|part| element(&Value::Str(part.trim().to_string())))
            .collect::<Result<Vec<_>>>(),
        _ => return Err(Error::conversion(expected, value)),
    };
    items
        .map(Value::Seq)
        .map_err(|_| Error::conversion(expected, value))
}
