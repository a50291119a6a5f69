//! In-memory medium with failure injection.
//!
//! `MemoryMedium` implements [`StorageMedium`] over a map and records
//! every successful write for later assertion. Reads and writes can be
//! made to fail, and a byte quota can be set to exercise size limits.
//!
//! # Example
//!
//! ```
//! use persist_state::config::StorageOptions;
//! use persist_state::medium::{MemoryMedium, StorageMedium};
//!
//! let medium = MemoryMedium::new();
//! medium.fail_next_writes(1);
//! let opts = StorageOptions::default();
//! assert!(medium.set("k", "v1", &opts).is_err());
//! assert!(medium.set("k", "v2", &opts).is_ok());
//! assert_eq!(medium.writes(), vec![("k".to_string(), "v2".to_string())]);
//! ```

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::StorageMedium;
use crate::config::StorageOptions;
use crate::error::{PersistError, Result};

#[derive(Debug, Default)]
struct MemoryState {
    values: BTreeMap<String, String>,
    writes: Vec<(String, String)>,
    options: Vec<StorageOptions>,
    quota: Option<usize>,
    fail_reads: bool,
    fail_writes: bool,
    failing_writes: usize,
}

impl MemoryState {
    fn used_bytes_without(&self, key: &str) -> usize {
        self.values
            .iter()
            .filter(|(k, _)| k.as_str() != key)
            .map(|(k, v)| k.len() + v.len())
            .sum()
    }
}

/// In-process medium for tests and ephemeral use.
#[derive(Debug, Default)]
pub struct MemoryMedium {
    state: Mutex<MemoryState>,
}

impl MemoryMedium {
    /// Create an empty medium with no quota.
    pub fn new() -> Self {
        Self::default()
    }

    /// Limit the total bytes (keys plus values) the medium will hold.
    pub fn with_quota(self, bytes: usize) -> Self {
        self.lock().quota = Some(bytes);
        self
    }

    /// Seed a value without recording it as a write.
    pub fn with_value(self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.lock().values.insert(key.into(), value.into());
        self
    }

    /// Make every read fail with `MediumUnavailable`.
    pub fn fail_reads(&self, fail: bool) {
        self.lock().fail_reads = fail;
    }

    /// Make every write fail with `MediumUnavailable`.
    pub fn fail_writes(&self, fail: bool) {
        self.lock().fail_writes = fail;
    }

    /// Make only the next `count` writes fail.
    pub fn fail_next_writes(&self, count: usize) {
        self.lock().failing_writes = count;
    }

    /// Successful writes in order.
    pub fn writes(&self) -> Vec<(String, String)> {
        self.lock().writes.clone()
    }

    /// Options passed with each successful write, in order.
    pub fn write_options(&self) -> Vec<StorageOptions> {
        self.lock().options.clone()
    }

    /// Current value for `key`, bypassing failure injection.
    pub fn peek(&self, key: &str) -> Option<String> {
        self.lock().values.get(key).cloned()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl StorageMedium for MemoryMedium {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let state = self.lock();
        if state.fail_reads {
            return Err(PersistError::unavailable("reads disabled"));
        }
        Ok(state.values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str, options: &StorageOptions) -> Result<()> {
        let mut state = self.lock();
        if state.fail_writes {
            return Err(PersistError::unavailable("writes disabled"));
        }
        if state.failing_writes > 0 {
            state.failing_writes -= 1;
            return Err(PersistError::unavailable("write failed"));
        }
        if let Some(limit) = state.quota {
            let size = state.used_bytes_without(key) + key.len() + value.len();
            if size > limit {
                return Err(PersistError::QuotaExceeded {
                    key: key.to_string(),
                    size,
                    limit,
                });
            }
        }

        state.values.insert(key.to_string(), value.to_string());
        state.writes.push((key.to_string(), value.to_string()));
        state.options.push(options.clone());
        Ok(())
    }

    fn remove(&self, key: &str, _options: &StorageOptions) -> Result<()> {
        let mut state = self.lock();
        if state.fail_writes {
            return Err(PersistError::unavailable("writes disabled"));
        }
        state.values.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts() -> StorageOptions {
        StorageOptions::default()
    }

    #[test]
    fn get_missing_key_is_none() {
        let medium = MemoryMedium::new();
        assert_eq!(medium.get("nope").unwrap(), None);
    }

    #[test]
    fn set_then_get() {
        let medium = MemoryMedium::new();
        medium.set("k", "v", &opts()).unwrap();
        assert_eq!(medium.get("k").unwrap().as_deref(), Some("v"));
        assert_eq!(medium.writes().len(), 1);
    }

    #[test]
    fn seeded_values_are_not_writes() {
        let medium = MemoryMedium::new().with_value("k", "v");
        assert_eq!(medium.peek("k").as_deref(), Some("v"));
        assert!(medium.writes().is_empty());
    }

    #[test]
    fn failing_reads_error() {
        let medium = MemoryMedium::new().with_value("k", "v");
        medium.fail_reads(true);
        assert!(matches!(
            medium.get("k"),
            Err(PersistError::MediumUnavailable { .. })
        ));
        medium.fail_reads(false);
        assert!(medium.get("k").is_ok());
    }

    #[test]
    fn failing_writes_leave_value_untouched() {
        let medium = MemoryMedium::new().with_value("k", "old");
        medium.fail_writes(true);
        assert!(medium.set("k", "new", &opts()).is_err());
        assert_eq!(medium.peek("k").as_deref(), Some("old"));
    }

    #[test]
    fn quota_counts_other_entries() {
        let medium = MemoryMedium::new().with_quota(10);
        medium.set("a", "1234", &opts()).unwrap();
        let err = medium.set("b", "123456", &opts()).unwrap_err();
        match err {
            PersistError::QuotaExceeded { size, limit, .. } => {
                assert_eq!(size, 12);
                assert_eq!(limit, 10);
            }
            other => panic!("Expected QuotaExceeded, got {:?}", other),
        }
        // Overwriting an entry frees its previous size
        medium.set("a", "123456789", &opts()).unwrap();
    }

    #[test]
    fn records_write_options() {
        let medium = MemoryMedium::new();
        medium
            .set("k", "v", &opts().with_path("/app"))
            .unwrap();
        assert_eq!(medium.write_options()[0].path.as_deref(), Some("/app"));
    }

    #[test]
    fn remove_deletes_key() {
        let medium = MemoryMedium::new().with_value("k", "v");
        medium.remove("k", &opts()).unwrap();
        medium.remove("k", &opts()).unwrap();
        assert_eq!(medium.get("k").unwrap(), None);
    }
}
