//! Parameter diff engine.
//!
//! Audits what an approval is actually authorizing: given the parameter map
//! captured before a change and the one captured after, classify every key
//! as added, removed or changed. Equality is structural via a canonical
//! key-sorted serialization, so two differently-ordered maps with identical
//! content compare equal.

use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// A single changed entry: the value on both sides.
#[derive(Debug, Clone, PartialEq)]
pub struct Change {
    pub before: Value,
    pub after: Value,
}

/// Result of diffing two parameter maps.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DiffResult {
    pub added: BTreeMap<String, Value>,
    pub removed: BTreeMap<String, Value>,
    pub changed: BTreeMap<String, Change>,
}

impl DiffResult {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.changed.is_empty()
    }

    /// Total number of classified keys.
    pub fn len(&self) -> usize {
        self.added.len() + self.removed.len() + self.changed.len()
    }
}

/// Diff two JSON values interpreted as maps.
///
/// Non-object inputs (null, scalars, arrays) normalize to the empty map and
/// contribute nothing to the diff. Runs in O(|before| + |after|) map
/// operations.
pub fn diff(before: &Value, after: &Value) -> DiffResult {
    let empty = Map::new();
    let before = before.as_object().unwrap_or(&empty);
    let after = after.as_object().unwrap_or(&empty);

    let mut result = DiffResult::default();

    for (key, before_value) in before {
        match after.get(key) {
            None => {
                result.removed.insert(key.clone(), before_value.clone());
            }
            Some(after_value) => {
                if !structurally_equal(before_value, after_value) {
                    result.changed.insert(
                        key.clone(),
                        Change {
                            before: before_value.clone(),
                            after: after_value.clone(),
                        },
                    );
                }
            }
        }
    }

    for (key, after_value) in after {
        if !before.contains_key(key) {
            result.added.insert(key.clone(), after_value.clone());
        }
    }

    result
}

/// Structural equality via canonical serialization: object keys are sorted
/// recursively, array order is significant.
pub fn structurally_equal(a: &Value, b: &Value) -> bool {
    canonical_string(a) == canonical_string(b)
}

/// Deterministic deep serialization of a JSON value.
pub fn canonical_string(value: &Value) -> String {
    serde_json::to_string(&canonicalize(value)).unwrap_or_default()
}

fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let sorted: BTreeMap<&String, Value> =
                map.iter().map(|(k, v)| (k, canonicalize(v))).collect();
            Value::Object(
                sorted
                    .into_iter()
                    .map(|(k, v)| (k.clone(), v))
                    .collect::<Map<String, Value>>(),
            )
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        other => other.clone(),
    }
}
