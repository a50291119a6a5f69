//! Directory-backed medium.
//!
//! Each key is stored in its own file, named by a hash of the key, so
//! state survives process restarts. Files hold a small JSON envelope with
//! the raw value and its expiry.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use super::StorageMedium;
use crate::config::StorageOptions;
use crate::error::{PersistError, Result};

#[derive(Debug, Serialize, Deserialize)]
struct FileEntry {
    key: String,
    value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    expires_at: Option<DateTime<Utc>>,
}

/// Storage for persisted blobs under a root directory.
#[derive(Debug, Clone)]
pub struct FileMedium {
    root: PathBuf,
}

impl FileMedium {
    /// Create a file medium rooted at `root`. The directory is created on first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Get the root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Get the file path used for `key`.
    pub fn entry_path(&self, key: &str) -> PathBuf {
        let hash = Sha256::digest(key.as_bytes());
        self.root.join(format!("{}.json", hex::encode(&hash[..16])))
    }

    fn ensure_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.root)?;
        Ok(())
    }
}

impl StorageMedium for FileMedium {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.entry_path(key);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let entry: FileEntry = serde_json::from_str(&content)?;

        // A hash collision with another key reads as absent
        if entry.key != key {
            return Ok(None);
        }

        if entry.expires_at.is_some_and(|at| at <= Utc::now()) {
            remove_if_present(&path)?;
            return Ok(None);
        }

        Ok(Some(entry.value))
    }

    /// Write using the write-to-temp-then-rename pattern so a crash never
    /// leaves a partially written entry.
    fn set(&self, key: &str, value: &str, options: &StorageOptions) -> Result<()> {
        self.ensure_dir()?;

        let path = self.entry_path(key);
        let entry = FileEntry {
            key: key.to_string(),
            value: value.to_string(),
            expires_at: options.expiry_from(Utc::now())?,
        };
        let content = serde_json::to_string(&entry).map_err(PersistError::Codec)?;

        let temp_path = path.with_extension("json.tmp");
        fs::write(&temp_path, &content)?;
        fs::rename(&temp_path, &path)?;

        Ok(())
    }

    fn remove(&self, key: &str, _options: &StorageOptions) -> Result<()> {
        remove_if_present(&self.entry_path(key))
    }
}

fn remove_if_present(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e.into()),
        _ => Ok(()),
    }
}
