//! JSON Utilities for CloudFormation Property Bags
//!
//! This module provides:
//! - Path lookups into nested `serde_json` objects
//! - In-place creation of nested objects without disturbing sibling keys
//! - Conversion of serializable property structs into property maps

use serde::Serialize;
use serde_json::{Map, Value};

/// Reason a nested object could not be reached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotAnObject {
    /// Dotted path of the first non-object value on the way down.
    pub path: String,
}

/// Looks up a value by following `path` through nested objects.
///
/// # Returns
/// `None` if any segment is missing or is not an object
pub fn value_at_path<'a>(root: &'a Map<String, Value>, path: &[&str]) -> Option<&'a Value> {
    let (last, parents) = path.split_last()?;
    let mut current = root;
    for key in parents {
        current = current.get(*key)?.as_object()?;
    }
    current.get(*last)
}

/// Walks `path`, creating empty objects for missing segments.
///
/// Existing objects along the path are reused as-is, so unrelated keys
/// survive. A segment holding anything other than an object (or `null`) is
/// reported instead of being overwritten.
pub fn object_at_path_mut<'a>(
    root: &'a mut Map<String, Value>,
    path: &[&str],
) -> Result<&'a mut Map<String, Value>, NotAnObject> {
    let mut current = root;
    for (depth, key) in path.iter().enumerate() {
        let slot = current
            .entry(key.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if slot.is_null() {
            *slot = Value::Object(Map::new());
        }
        current = match slot {
            Value::Object(map) => map,
            _ => {
                return Err(NotAnObject {
                    path: path[..=depth].join("."),
                });
            }
        };
    }
    Ok(current)
}

/// Serializes a property struct into a JSON object map.
///
/// Structs that serialize to anything other than an object yield an empty map.
pub fn to_property_map<T: Serialize>(value: &T) -> Result<Map<String, Value>, serde_json::Error> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        _ => Ok(Map::new()),
    }
}

/// Builds a CloudFormation `{"Ref": id}` intrinsic.
pub fn cfn_ref(logical_id: &str) -> Value {
    let mut map = Map::new();
    map.insert("Ref".to_string(), Value::String(logical_id.to_string()));
    Value::Object(map)
}
