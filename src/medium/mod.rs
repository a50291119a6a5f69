//! Persistence media.
//!
//! This module provides:
//! - [`StorageMedium`] trait for key/value string storage
//! - [`MemoryMedium`] for tests and in-process use
//! - [`CookieJar`] with cookie size and expiry rules
//! - [`FileMedium`] for storage that survives process restarts
//! - [`CoalescingMedium`] to move writes off the notifying thread
//!
//! # Example
//!
//! ```
//! use persist_state::config::StorageOptions;
//! use persist_state::medium::{MemoryMedium, StorageMedium};
//!
//! let medium = MemoryMedium::new();
//! medium.set("redux", r#"{"count":1}"#, &StorageOptions::default()).unwrap();
//! assert_eq!(medium.get("redux").unwrap().as_deref(), Some(r#"{"count":1}"#));
//! ```

pub mod coalescing;
pub mod cookie;
pub mod file;
pub mod memory;

pub use coalescing::CoalescingMedium;
pub use cookie::{CookieJar, MAX_COOKIE_BYTES};
pub use file::FileMedium;
pub use memory::MemoryMedium;

use crate::config::StorageOptions;
use crate::error::Result;

/// Trait for key/value persistence media.
///
/// Both operations are synchronous from the caller's point of view and
/// each key is read and written atomically. Implementations use interior
/// mutability so one medium can be shared behind an `Arc`.
pub trait StorageMedium: Send + Sync {
    /// Read the raw value for `key`, `None` if absent.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write `value` under `key`.
    fn set(&self, key: &str, value: &str, options: &StorageOptions) -> Result<()>;

    /// Remove `key`. Removing an absent key is not an error.
    fn remove(&self, key: &str, options: &StorageOptions) -> Result<()>;
}

impl<M: StorageMedium + ?Sized> StorageMedium for std::sync::Arc<M> {
    fn get(&self, key: &str) -> Result<Option<String>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str, options: &StorageOptions) -> Result<()> {
        (**self).set(key, value, options)
    }

    fn remove(&self, key: &str, options: &StorageOptions) -> Result<()> {
        (**self).remove(key, options)
    }
}
