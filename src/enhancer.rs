//! The persistence enhancer.
//!
//! [`persist_state`] wraps a store creator so that:
//!
//! 1. the persisted blob is read once and decoded,
//! 2. it is merged over the caller's initial state,
//! 3. the store is built from the merged state,
//! 4. every later change re-slices the state and writes it back.
//!
//! Reading and writing are best-effort and isolated from each other. A
//! failure on either side is logged as a warning and never reaches the
//! code constructing or dispatching to the store.

use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::codec::{DeserializeFn, SerializeFn};
use crate::config::{PersistConfig, StorageOptions};
use crate::error::{PersistError, Result};
use crate::medium::StorageMedium;
use crate::slicer::{PathSpec, SliceFn};
use crate::store::{CreateStore, Enhancer, Reducer, StateReader, Store};

/// Everything the change subscriber needs, owned in one place.
///
/// The store is reached through a [`StateReader`], so a context held by
/// the store's own listener list does not keep it alive.
pub struct PersistContext {
    state: StateReader,
    slice: SliceFn,
    medium: Arc<dyn StorageMedium>,
    key: String,
    serialize: SerializeFn,
    storage_options: StorageOptions,
}

impl PersistContext {
    pub fn new(
        store: &impl Store,
        slice: SliceFn,
        medium: Arc<dyn StorageMedium>,
        config: &PersistConfig,
    ) -> Self {
        Self {
            state: store.state_reader(),
            slice,
            medium,
            key: config.key.clone(),
            serialize: Arc::clone(&config.serialize),
            storage_options: config.storage_options.clone(),
        }
    }

    /// Slice the current state, encode it and write it to the medium.
    ///
    /// Does nothing once the store is gone.
    pub fn persist(&self) -> Result<()> {
        let Some(state) = (self.state)() else {
            return Ok(());
        };
        let subset = (self.slice)(&state);
        let raw =
            (self.serialize)(&subset).map_err(|e| PersistError::persistence(&self.key, e))?;
        self.medium
            .set(&self.key, &raw, &self.storage_options)
            .map_err(|e| PersistError::persistence(&self.key, e))?;
        debug!("Persisted {} bytes under '{}'", raw.len(), self.key);
        Ok(())
    }

    /// Change-notification entry point. Never fails.
    pub fn on_change(&self) {
        if let Err(e) = self.persist() {
            warn!("Unable to persist state: {}", e);
        }
    }
}

/// Read and decode the blob stored under `key`.
///
/// An absent key or an empty value is `Ok(None)`. Read and decode faults
/// come back as [`PersistError::Recovery`].
pub fn recover_state(
    medium: &dyn StorageMedium,
    key: &str,
    deserialize: &DeserializeFn,
) -> Result<Option<Value>> {
    let raw = medium
        .get(key)
        .map_err(|e| PersistError::recovery(key, e))?;

    match raw {
        Some(raw) if !raw.is_empty() => {
            let value = deserialize(&raw).map_err(|e| PersistError::recovery(key, e))?;
            debug!("Recovered {} bytes from '{}'", raw.len(), key);
            Ok(Some(value))
        }
        _ => Ok(None),
    }
}

/// Remove the persisted blob for `config.key`.
pub fn clear_persisted(medium: &dyn StorageMedium, config: &PersistConfig) -> Result<()> {
    medium.remove(&config.key, &config.storage_options)
}

/// Build an enhancer that persists `paths` of state to `medium`.
///
/// # Arguments
///
/// * `paths` - Which top-level keys to persist; [`PathSpec::Whole`] for all
/// * `config` - Key, policies and write options, fixed from here on
/// * `medium` - Where the blob lives
///
/// # Example
///
/// ```
/// use persist_state::config::PersistConfig;
/// use persist_state::enhancer::persist_state;
/// use persist_state::medium::MemoryMedium;
/// use persist_state::store::{create_store, BasicStore, Store};
/// use serde_json::json;
/// use std::sync::Arc;
///
/// let medium = Arc::new(MemoryMedium::new().with_value("redux", r#"{"count":5}"#));
/// let enhancer = persist_state::<BasicStore>("count", PersistConfig::default(), medium.clone());
///
/// let store = create_store(
///     Arc::new(|state, action| {
///         let mut state = state.cloned().unwrap_or_else(|| json!({"count": 0}));
///         if action["type"] == "inc" {
///             state["count"] = json!(state["count"].as_i64().unwrap_or(0) + 1);
///         }
///         state
///     }),
///     Some(json!({"count": 0, "name": "x"})),
///     Some(enhancer),
/// );
///
/// assert_eq!(store.get_state(), json!({"count": 5, "name": "x"}));
/// store.dispatch(json!({"type": "inc"}));
/// assert_eq!(medium.peek("redux").as_deref(), Some(r#"{"count":6}"#));
/// ```
pub fn persist_state<S>(
    paths: impl Into<PathSpec>,
    config: PersistConfig,
    medium: Arc<dyn StorageMedium>,
) -> Enhancer<S>
where
    S: Store + 'static,
{
    let paths = paths.into();

    Enhancer::new(move |next: CreateStore<S>| -> CreateStore<S> {
        Box::new(
            move |reducer: Reducer, initial_state: Option<Value>, enhancer: Option<Enhancer<S>>| {
                let persisted =
                    match recover_state(medium.as_ref(), &config.key, &config.deserialize) {
                        Ok(persisted) => persisted,
                        Err(e) => {
                            warn!("Failed to retrieve initial state: {}", e);
                            None
                        }
                    };

                let initial_state = (config.merge)(initial_state.as_ref(), persisted.as_ref());
                let store = next(reducer, initial_state, enhancer);

                let slice = (config.slicer)(&paths);
                let context = PersistContext::new(&store, slice, medium, &config);
                // The subscription lives as long as the store, so its handle is dropped
                let _unsubscribe = store.subscribe(Arc::new(move || context.on_change()));

                store
            },
        )
    })
}
