//! Selection of the persisted portion of state.
//!
//! A [`PathSpec`] names which top-level keys of state take part in
//! persistence. [`create_slicer`] turns it into a [`SliceFn`] that is run
//! on every change notification.
//!
//! # Slicing Rules
//!
//! - `Whole` returns the entire state
//! - `Key` and `Keys` return a fresh object with just those keys
//! - Keys absent from state are omitted, never written as `null`
//! - A non-object state sliced by key yields an empty object

use serde_json::{Map, Value};
use std::sync::Arc;

/// Which top-level state keys are persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum PathSpec {
    /// Persist the whole state.
    #[default]
    Whole,
    /// Persist a single key.
    Key(String),
    /// Persist an ordered list of keys.
    Keys(Vec<String>),
}

impl PathSpec {
    /// The key names selected, or `None` for the whole state.
    pub fn keys(&self) -> Option<Vec<&str>> {
        match self {
            PathSpec::Whole => None,
            PathSpec::Key(key) => Some(vec![key.as_str()]),
            PathSpec::Keys(keys) => Some(keys.iter().map(String::as_str).collect()),
        }
    }

    /// Whether this spec selects the whole state.
    pub fn is_whole(&self) -> bool {
        matches!(self, PathSpec::Whole)
    }
}

impl From<&str> for PathSpec {
    fn from(key: &str) -> Self {
        PathSpec::Key(key.to_string())
    }
}

impl From<String> for PathSpec {
    fn from(key: String) -> Self {
        PathSpec::Key(key)
    }
}

impl From<Vec<String>> for PathSpec {
    fn from(keys: Vec<String>) -> Self {
        PathSpec::Keys(keys)
    }
}

impl From<Vec<&str>> for PathSpec {
    fn from(keys: Vec<&str>) -> Self {
        PathSpec::Keys(keys.into_iter().map(String::from).collect())
    }
}

impl From<&[&str]> for PathSpec {
    fn from(keys: &[&str]) -> Self {
        PathSpec::Keys(keys.iter().map(|k| k.to_string()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for PathSpec {
    fn from(keys: [&str; N]) -> Self {
        PathSpec::Keys(keys.iter().map(|k| k.to_string()).collect())
    }
}

impl<T: Into<PathSpec>> From<Option<T>> for PathSpec {
    fn from(spec: Option<T>) -> Self {
        spec.map(Into::into).unwrap_or_default()
    }
}

/// A pure function from state to the persisted subset.
pub type SliceFn = Arc<dyn Fn(&Value) -> Value + Send + Sync>;

/// Builds a [`SliceFn`] from a path spec. Overridable through config.
pub type SlicerFactory = Arc<dyn Fn(&PathSpec) -> SliceFn + Send + Sync>;

/// Create the default slicer for `paths`.
///
/// The returned function holds no state of its own and clones only the
/// selected values, so it can run on every notification.
pub fn create_slicer(paths: &PathSpec) -> SliceFn {
    match paths.keys() {
        None => Arc::new(|state: &Value| state.clone()),
        Some(keys) => {
            let keys: Vec<String> = keys.into_iter().map(String::from).collect();
            Arc::new(move |state: &Value| pick(state, &keys))
        }
    }
}

fn pick(state: &Value, keys: &[String]) -> Value {
    let mut subset = Map::new();
    if let Value::Object(map) = state {
        for key in keys {
            if let Some(value) = map.get(key) {
                subset.insert(key.clone(), value.clone());
            }
        }
    }
    Value::Object(subset)
}

/// The default [`SlicerFactory`].
pub fn default_slicer_factory() -> SlicerFactory {
    Arc::new(create_slicer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn whole_spec_returns_entire_state() {
        let state = json!({"count": 1, "name": "x", "nested": {"a": [1, 2]}});
        let slice = create_slicer(&PathSpec::Whole);
        assert_eq!(slice(&state), state);
    }

    #[test]
    fn single_key_returns_one_entry() {
        let state = json!({"count": 1, "name": "x"});
        let slice = create_slicer(&"count".into());
        assert_eq!(slice(&state), json!({"count": 1}));
    }

    #[test]
    fn key_list_keeps_only_named_keys() {
        let state = json!({"count": 6, "name": "y", "todos": ["a"]});
        let slice = create_slicer(&["count", "todos"].into());
        assert_eq!(slice(&state), json!({"count": 6, "todos": ["a"]}));
    }

    #[test]
    fn absent_keys_are_omitted() {
        let state = json!({"count": 6});
        let slice = create_slicer(&["count", "missing"].into());
        let subset = slice(&state);
        assert_eq!(subset, json!({"count": 6}));
        assert!(subset.get("missing").is_none());
    }

    #[test]
    fn explicit_null_values_are_kept() {
        let state = json!({"user": null, "count": 0});
        let slice = create_slicer(&"user".into());
        assert_eq!(slice(&state), json!({"user": null}));
    }

    #[test]
    fn non_object_state_sliced_by_key_is_empty() {
        let slice = create_slicer(&"count".into());
        assert_eq!(slice(&json!(42)), json!({}));
        assert_eq!(slice(&Value::Null), json!({}));
    }

    #[test]
    fn empty_key_list_selects_nothing() {
        let slice = create_slicer(&PathSpec::Keys(vec![]));
        assert_eq!(slice(&json!({"a": 1})), json!({}));
    }

    #[test]
    fn slicing_twice_yields_equal_subsets() {
        let state = json!({"count": 3, "name": "z"});
        let slice = create_slicer(&["name"].into());
        assert_eq!(slice(&state), slice(&state));
    }

    #[test]
    fn slicing_does_not_touch_state() {
        let state = json!({"count": 3, "name": "z"});
        let before = state.clone();
        let slice = create_slicer(&"count".into());
        let _ = slice(&state);
        assert_eq!(state, before);
    }

    #[test]
    fn option_none_converts_to_whole() {
        let spec: PathSpec = Option::<&str>::None.into();
        assert!(spec.is_whole());
        let spec: PathSpec = Some("count").into();
        assert_eq!(spec, PathSpec::Key("count".into()));
    }

    #[test]
    fn keys_lists_selected_names() {
        assert_eq!(PathSpec::Whole.keys(), None);
        assert_eq!(PathSpec::from(vec!["a", "b"]).keys(), Some(vec!["a", "b"]));
    }

    #[test]
    fn default_factory_builds_default_slicer() {
        let factory = default_slicer_factory();
        let slice = factory(&PathSpec::from("a"));
        assert_eq!(slice(&json!({"a": 1, "b": 2})), json!({"a": 1}));
    }
}
