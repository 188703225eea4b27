//! Accessors for REST records, which travel as loose JSON objects.

use serde_json::Value;

use ferry_admin::AdminError;

/// Record id as a string. Stores return numeric ids over REST and string gids over GraphQL.
pub fn id_of(record: &Value) -> Option<String> {
    match record.get("id")? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Non-empty `handle`, if present.
pub fn handle_of(record: &Value) -> Option<&str> {
    record
        .get("handle")
        .and_then(Value::as_str)
        .filter(|h| !h.is_empty())
}

/// Display title: `title`, then `name`, then `handle`, then the id.
pub fn title_of(record: &Value) -> String {
    ["title", "name", "handle"]
        .iter()
        .find_map(|key| {
            record
                .get(*key)
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
        })
        .map(str::to_string)
        .or_else(|| id_of(record))
        .unwrap_or_else(|| "(untitled)".to_string())
}

/// The array under a REST collection's root key, e.g. `products`.
pub fn root_list(mut response: Value, root: &str) -> Result<Vec<Value>, AdminError> {
    match response.get_mut(root).map(Value::take) {
        Some(Value::Array(items)) => Ok(items),
        Some(other) => Err(AdminError::InvalidResponse(format!(
            "expected array under '{}', got {}",
            root,
            kind_name(&other)
        ))),
        None => Err(AdminError::InvalidResponse(format!(
            "missing '{}' in response",
            root
        ))),
    }
}

/// The object under a single-resource root key, e.g. `product`.
pub fn root_object(mut response: Value, root: &str) -> Result<Value, AdminError> {
    match response.get_mut(root).map(Value::take) {
        Some(obj @ Value::Object(_)) => Ok(obj),
        Some(other) => Err(AdminError::InvalidResponse(format!(
            "expected object under '{}', got {}",
            root,
            kind_name(&other)
        ))),
        None => Err(AdminError::InvalidResponse(format!(
            "missing '{}' in response",
            root
        ))),
    }
}

fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
