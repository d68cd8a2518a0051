//! Typed access to tool input parameters

use serde_json::Value;

use super::ToolError;

fn invalid(name: &str, message: &str) -> ToolError {
    ToolError::InvalidArgument {
        name: name.to_string(),
        message: message.to_string(),
    }
}

/// Null and absent are the same thing
fn lookup<'a>(input: &'a Value, name: &str) -> Option<&'a Value> {
    input.get(name).filter(|v| !v.is_null())
}

pub fn required_str<'a>(input: &'a Value, name: &str) -> Result<&'a str, ToolError> {
    match lookup(input, name) {
        Some(Value::String(s)) => Ok(s),
        Some(_) => Err(invalid(name, "expected a string")),
        None => Err(ToolError::MissingParameter { name: name.to_string() }),
    }
}

pub fn optional_str<'a>(input: &'a Value, name: &str) -> Result<Option<&'a str>, ToolError> {
    match lookup(input, name) {
        Some(Value::String(s)) => Ok(Some(s)),
        Some(_) => Err(invalid(name, "expected a string")),
        None => Ok(None),
    }
}

pub fn required_i64(input: &Value, name: &str) -> Result<i64, ToolError> {
    match lookup(input, name) {
        Some(v) => v.as_i64().ok_or_else(|| invalid(name, "expected an integer")),
        None => Err(ToolError::MissingParameter { name: name.to_string() }),
    }
}

pub fn optional_positive(input: &Value, name: &str) -> Result<Option<usize>, ToolError> {
    match lookup(input, name) {
        Some(v) => match v.as_u64() {
            Some(n) if n > 0 => Ok(Some(usize::try_from(n).unwrap_or(usize::MAX))),
            _ => Err(invalid(name, "expected a positive integer")),
        },
        None => Ok(None),
    }
}

pub fn optional_bool(input: &Value, name: &str) -> Result<Option<bool>, ToolError> {
    match lookup(input, name) {
        Some(Value::Bool(b)) => Ok(Some(*b)),
        Some(_) => Err(invalid(name, "expected a boolean")),
        None => Ok(None),
    }
}
