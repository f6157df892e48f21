//! Module state trees

use serde_json::{Map, Value};

/// Top-level state of one module: key -> arbitrary JSON value
pub type State = Map<String, Value>;

/// Build a [`State`] from a JSON object.
///
/// Anything other than an object yields an empty state.
///
/// ```
/// use modstore_core::state;
/// use serde_json::json;
///
/// let s = state::from_value(json!({ "name": null, "list": [] }));
/// assert_eq!(s.len(), 2);
/// assert!(state::from_value(json!(42)).is_empty());
/// ```
pub fn from_value(value: Value) -> State {
    match value {
        Value::Object(map) => map,
        _ => State::new(),
    }
}

/// Read a top-level key, `null` when absent
pub fn read(state: &State, key: &str) -> Value {
    state.get(key).cloned().unwrap_or(Value::Null)
}
