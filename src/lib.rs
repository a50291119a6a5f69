//! Persist State - keep a slice of application state across restarts.
//!
//! A store enhancer that reads a persisted blob once when the store is
//! built, merges it over the initial state, and writes the selected part
//! of state back to a key/value medium after every change. The medium is
//! modelled on a browser cookie store: small string values under a key,
//! with size limits and lifetimes.
//!
//! # Modules
//!
//! - [`codec`] - Blob encoding and decoding
//! - [`config`] - Enhancer configuration and medium write options
//! - [`enhancer`] - The persistence enhancer
//! - [`error`] - Error types and result aliases
//! - [`medium`] - Storage media (memory, cookie jar, files, background writer)
//! - [`merger`] - Combining initial and persisted state
//! - [`slicer`] - Selecting the persisted subset of state
//! - [`store`] - The store contract and a reference store
//!
//! # Example
//!
//! ```
//! use persist_state::{persist_state, PersistConfig};
//! use persist_state::medium::CookieJar;
//! use persist_state::store::{create_store, Store};
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! let jar = Arc::new(CookieJar::from_cookie_header("redux=%7B%22count%22%3A5%7D"));
//!
//! let store = create_store(
//!     Arc::new(|state, _action| state.cloned().unwrap_or_else(|| json!({}))),
//!     Some(json!({"count": 0, "name": "x"})),
//!     Some(persist_state(["count"], PersistConfig::default(), jar.clone())),
//! );
//!
//! assert_eq!(store.get_state(), json!({"count": 5, "name": "x"}));
//! ```

pub mod codec;
pub mod config;
pub mod enhancer;
pub mod error;
pub mod medium;
pub mod merger;
pub mod slicer;
pub mod store;

pub use config::{PersistConfig, StorageOptions};
pub use enhancer::{clear_persisted, persist_state, recover_state, PersistContext};
pub use error::{PersistError, Result};
pub use merger::{deep_merge_state, merge_state};
pub use slicer::{create_slicer, PathSpec};
pub use store::{Store, StoreArg};
