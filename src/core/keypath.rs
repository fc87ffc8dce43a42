//! Dotted key-path resolution over untyped JSON trees.
//!
//! Server state records and the configuration tree are heterogeneous nested
//! objects; chart bindings and config fields address into them with dotted
//! paths like `publishers.stats.budget.mean` or `SIMULATION.PUBLISHERS.3.MOTIVE`.
//! Numeric segments index into arrays. Resolving through a missing key is a
//! defined miss (`None`), never an error: an entity sample may legitimately be
//! absent at a given step.

use serde_json::Value;

/// Resolve a dotted path against a JSON tree.
///
/// An empty path resolves to the root. Numeric segments index arrays.
pub fn resolve<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    if path.is_empty() {
        return Some(root);
    }
    let mut node = root;
    for seg in path.split('.') {
        node = match node {
            Value::Object(map) => map.get(seg)?,
            Value::Array(items) => items.get(seg.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(node)
}

/// Resolve a dotted path to a scalar `f64`.
///
/// Misses and non-numeric leaves both yield `None`.
pub fn resolve_f64(root: &Value, path: &str) -> Option<f64> {
    resolve(root, path).and_then(Value::as_f64)
}

/// Write `value` at a dotted path, replacing the existing leaf.
///
/// Missing intermediates are not created; paths come from the field catalog and
/// always exist in a loaded configuration. Returns `false` on a miss, leaving
/// the tree untouched.
pub fn set(root: &mut Value, path: &str, value: Value) -> bool {
    let mut node = root;
    let mut segments = path.split('.').peekable();
    while let Some(seg) = segments.next() {
        let last = segments.peek().is_none();
        match node {
            Value::Object(map) => {
                if last {
                    if let Some(slot) = map.get_mut(seg) {
                        *slot = value;
                        return true;
                    }
                    return false;
                }
                match map.get_mut(seg) {
                    Some(next) => node = next,
                    None => return false,
                }
            }
            Value::Array(items) => {
                let Some(idx) = seg.parse::<usize>().ok() else {
                    return false;
                };
                if last {
                    if let Some(slot) = items.get_mut(idx) {
                        *slot = value;
                        return true;
                    }
                    return false;
                }
                match items.get_mut(idx) {
                    Some(next) => node = next,
                    None => return false,
                }
            }
            _ => return false,
        }
    }
    false
}
