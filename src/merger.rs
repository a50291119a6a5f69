//! Merge algorithms for combining initial and persisted state.
//!
//! At store construction the caller's initial state is layered under the
//! state recovered from the medium. This module implements the layering.
//!
//! # Merge Rules
//!
//! - A missing side (or a `null`) contributes nothing
//! - Persisted values take precedence at overlapping top-level keys
//! - Keys present on only one side pass through unchanged
//! - If either side is not an object, persisted wins outright
//!
//! [`deep_merge_state`] is an alternative policy that recurses into nested
//! objects instead of replacing them.

use serde_json::Value;
use std::sync::Arc;

/// A merge policy: `(initial, persisted) -> merged`.
pub type MergeFn = Arc<dyn Fn(Option<&Value>, Option<&Value>) -> Option<Value> + Send + Sync>;

/// Shallow-merge `persisted` over `initial`.
///
/// # Arguments
///
/// * `initial` - State supplied by the caller at construction
/// * `persisted` - State recovered from the medium (takes precedence)
///
/// # Returns
///
/// The combined state, or `None` when both sides are absent.
pub fn merge_state(initial: Option<&Value>, persisted: Option<&Value>) -> Option<Value> {
    match (present(initial), present(persisted)) {
        (None, None) => None,
        (Some(initial), None) => Some(initial.clone()),
        (None, Some(persisted)) => Some(persisted.clone()),
        (Some(Value::Object(base)), Some(Value::Object(overlay))) => {
            let mut result = base.clone();
            for (key, value) in overlay {
                result.insert(key.clone(), value.clone());
            }
            Some(Value::Object(result))
        }
        (Some(_), Some(persisted)) => Some(persisted.clone()),
    }
}

/// Recursively merge `persisted` over `initial`.
///
/// Objects are merged key by key at every depth. Arrays and scalars in
/// `persisted` replace whatever `initial` holds at that point.
pub fn deep_merge_state(initial: Option<&Value>, persisted: Option<&Value>) -> Option<Value> {
    match (present(initial), present(persisted)) {
        (None, None) => None,
        (Some(initial), None) => Some(initial.clone()),
        (None, Some(persisted)) => Some(persisted.clone()),
        (Some(initial), Some(persisted)) => Some(deep_merge(initial, persisted)),
    }
}

fn deep_merge(base: &Value, overlay: &Value) -> Value {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            let mut result = base_map.clone();

            for (key, overlay_value) in overlay_map {
                let merged = match base_map.get(key) {
                    Some(base_value) => deep_merge(base_value, overlay_value),
                    None => overlay_value.clone(),
                };
                result.insert(key.clone(), merged);
            }

            Value::Object(result)
        }

        (_, overlay) => overlay.clone(),
    }
}

fn present(value: Option<&Value>) -> Option<&Value> {
    value.filter(|v| !v.is_null())
}

/// The default [`MergeFn`].
pub fn default_merge() -> MergeFn {
    Arc::new(merge_state)
}
