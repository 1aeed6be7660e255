use serde_json::{Map, Value};

/// Recursively remove `null` members and elements.
///
/// Objects and arrays that end up empty are removed as well; a top-level
/// value that strips down to nothing yields `None`.
pub fn strip_nulls(value: &Value) -> Option<Value> {
    match value {
        Value::Null => None,
        Value::Array(items) => {
            let kept: Vec<Value> = items.iter().filter_map(strip_nulls).collect();
            if kept.is_empty() {
                None
            } else {
                Some(Value::Array(kept))
            }
        }
        Value::Object(map) => {
            let mut kept = Map::new();
            for (key, item) in map {
                if let Some(stripped) = strip_nulls(item) {
                    kept.insert(key.clone(), stripped);
                }
            }
            if kept.is_empty() {
                None
            } else {
                Some(Value::Object(kept))
            }
        }
        other => Some(other.clone()),
    }
}
