//! Value coercion helpers for user callables.
//!
//! Callables receive positional values as [`serde_json::Value`]; these
//! helpers pull typed values out of a pack's positional slice with the
//! crate's standard error shapes, so a callable can stay a one-liner.

use serde_json::Value;

use crate::unit::CallableError;

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Coerce a value to `i64`.
pub fn as_i64(value: &Value) -> Result<i64, CallableError> {
    value.as_i64().ok_or_else(|| CallableError::WrongType {
        expected: "integer",
        got: type_name(value).to_string(),
    })
}

/// Coerce a value to `f64`.
pub fn as_f64(value: &Value) -> Result<f64, CallableError> {
    value.as_f64().ok_or_else(|| CallableError::WrongType {
        expected: "number",
        got: type_name(value).to_string(),
    })
}

/// Coerce a value to `&str`.
pub fn as_str(value: &Value) -> Result<&str, CallableError> {
    value.as_str().ok_or_else(|| CallableError::WrongType {
        expected: "string",
        got: type_name(value).to_string(),
    })
}

/// The first positional as `i64`.
///
/// # Examples
///
/// ```rust
/// use hyperway::utils::values::first_i64;
/// use serde_json::json;
///
/// assert_eq!(first_i64(&[json!(7)]).unwrap(), 7);
/// assert!(first_i64(&[]).is_err());
/// ```
pub fn first_i64(args: &[Value]) -> Result<i64, CallableError> {
    let value = args.first().ok_or(CallableError::MissingArgument {
        what: "positional value",
    })?;
    as_i64(value)
}

/// The first positional as `f64`.
pub fn first_f64(args: &[Value]) -> Result<f64, CallableError> {
    let value = args.first().ok_or(CallableError::MissingArgument {
        what: "positional value",
    })?;
    as_f64(value)
}
