//! Enhancer configuration.
//!
//! [`PersistConfig`] is resolved once when the enhancer is built and never
//! changes afterwards. [`PersistSettings`] is the part of it that can live
//! in a YAML or JSON file.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;

use super::options::StorageOptions;
use crate::codec::{default_deserializer, default_serializer, DeserializeFn, SerializeFn};
use crate::error::{PersistError, Result};
use crate::merger::{default_merge, MergeFn};
use crate::slicer::{default_slicer_factory, SlicerFactory};

/// Storage key used when none is configured.
pub const DEFAULT_KEY: &str = "redux";

/// Full enhancer configuration.
///
/// | field | default |
/// |---|---|
/// | `key` | `"redux"` |
/// | `merge` | [`merge_state`](crate::merger::merge_state) |
/// | `slicer` | [`create_slicer`](crate::slicer::create_slicer) |
/// | `serialize` | compact JSON |
/// | `deserialize` | JSON |
/// | `storage_options` | `Path=/` |
#[derive(Clone)]
pub struct PersistConfig {
    pub key: String,
    pub merge: MergeFn,
    pub slicer: SlicerFactory,
    pub serialize: SerializeFn,
    pub deserialize: DeserializeFn,
    pub storage_options: StorageOptions,
}

impl Default for PersistConfig {
    fn default() -> Self {
        Self {
            key: DEFAULT_KEY.to_string(),
            merge: default_merge(),
            slicer: default_slicer_factory(),
            serialize: default_serializer(),
            deserialize: default_deserializer(),
            storage_options: StorageOptions::default(),
        }
    }
}

impl fmt::Debug for PersistConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PersistConfig")
            .field("key", &self.key)
            .field("storage_options", &self.storage_options)
            .finish_non_exhaustive()
    }
}

impl PersistConfig {
    /// Create a config with all defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a config from file settings, keeping default policies.
    pub fn from_settings(settings: PersistSettings) -> Self {
        Self {
            key: settings.key,
            storage_options: settings.storage_options,
            ..Self::default()
        }
    }

    /// Store the blob under `key`.
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    /// Replace the initial/persisted merge policy.
    pub fn with_merge(mut self, merge: MergeFn) -> Self {
        self.merge = merge;
        self
    }

    /// Replace the slicer factory.
    pub fn with_slicer(mut self, slicer: SlicerFactory) -> Self {
        self.slicer = slicer;
        self
    }

    /// Replace the blob encoder.
    pub fn with_serializer(mut self, serialize: SerializeFn) -> Self {
        self.serialize = serialize;
        self
    }

    /// Replace the blob decoder.
    pub fn with_deserializer(mut self, deserialize: DeserializeFn) -> Self {
        self.deserialize = deserialize;
        self
    }

    /// Options passed to every medium write.
    pub fn with_storage_options(mut self, options: StorageOptions) -> Self {
        self.storage_options = options;
        self
    }
}

/// File-loadable persistence settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PersistSettings {
    pub key: String,
    pub storage_options: StorageOptions,
}

impl Default for PersistSettings {
    fn default() -> Self {
        Self {
            key: DEFAULT_KEY.to_string(),
            storage_options: StorageOptions::default(),
        }
    }
}

/// Parse settings from YAML (JSON is accepted too, being a YAML subset).
///
/// # Arguments
///
/// * `content` - The settings text
/// * `source_path` - Path for error reporting
pub fn parse_settings(content: &str, source_path: &Path) -> Result<PersistSettings> {
    if content.trim().is_empty() {
        return Ok(PersistSettings::default());
    }
    serde_yaml::from_str(content).map_err(|e| PersistError::Settings {
        path: source_path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Load settings from a file.
///
/// # Errors
///
/// Returns `Settings` if the file is missing or malformed.
pub fn load_settings(path: &Path) -> Result<PersistSettings> {
    let content = fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            PersistError::Settings {
                path: path.to_path_buf(),
                message: "file not found".to_string(),
            }
        } else {
            PersistError::Io(e)
        }
    })?;

    parse_settings(&content, path)
}
