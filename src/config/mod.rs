//! Configuration for the persistence enhancer.
//!
//! - Enhancer options and defaults in [`settings`]
//! - Medium write options in [`options`]
//!
//! # Example
//!
//! ```
//! use persist_state::config::{PersistConfig, StorageOptions};
//!
//! let config = PersistConfig::new()
//!     .with_key("todos")
//!     .with_storage_options(StorageOptions::default().with_max_age(86_400));
//! assert_eq!(config.key, "todos");
//! assert_eq!(config.storage_options.path.as_deref(), Some("/"));
//! ```

pub mod options;
pub mod settings;

pub use options::{SameSite, StorageOptions};
pub use settings::{
    load_settings, parse_settings, PersistConfig, PersistSettings, DEFAULT_KEY,
};
