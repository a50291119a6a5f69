//! The store contract the enhancer is applied to.
//!
//! This module provides:
//! - [`Store`] trait for reading state and subscribing to changes
//! - [`StateReader`], a weak view of a store's state
//! - [`CreateStore`] and [`Enhancer`], the construction pipeline
//! - [`StoreArg`] and [`normalize_args`] for the overloaded second argument
//! - [`BasicStore`], a small reference container
//!
//! # Example
//!
//! ```
//! use persist_state::store::{create_store, Store};
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! let store = create_store(
//!     Arc::new(|state, _action| state.cloned().unwrap_or_else(|| json!({"count": 0}))),
//!     None,
//!     None,
//! );
//! assert_eq!(store.get_state(), json!({"count": 0}));
//! ```

pub mod basic;

pub use basic::{create_store, create_store_with, BasicStore, INIT_ACTION};

use serde_json::Value;
use std::sync::Arc;

/// Actions are structured values, conventionally `{"type": ...}`.
pub type Action = Value;

/// `(current state, action) -> next state`.
///
/// The current state is `None` only for the first reduction when no
/// initial state was supplied.
pub type Reducer = Arc<dyn Fn(Option<&Value>, &Action) -> Value + Send + Sync>;

/// Called with no arguments after every committed state transition.
pub type Listener = Arc<dyn Fn() + Send + Sync>;

/// Removes the listener it was returned for.
pub type Unsubscribe = Box<dyn FnOnce() + Send>;

/// Reads a store's state without keeping the store alive.
///
/// Returns `None` once the store has been dropped.
pub type StateReader = Arc<dyn Fn() -> Option<Value> + Send + Sync>;

/// Trait for state containers.
///
/// This is all the enhancer needs from a store.
pub trait Store {
    /// Snapshot of the current state.
    fn get_state(&self) -> Value;

    /// Register a change listener.
    fn subscribe(&self, listener: Listener) -> Unsubscribe;

    /// A non-owning reader of this store's state.
    ///
    /// Listeners the store itself holds use this in place of a store handle.
    fn state_reader(&self) -> StateReader;
}

/// Builds a store from a reducer, optional initial state and optional enhancer.
pub type CreateStore<S> = Box<dyn FnOnce(Reducer, Option<Value>, Option<Enhancer<S>>) -> S>;

/// Wraps a store creator to add behaviour around construction.
pub struct Enhancer<S>(Box<dyn FnOnce(CreateStore<S>) -> CreateStore<S>>);

impl<S> Enhancer<S> {
    pub fn new(wrap: impl FnOnce(CreateStore<S>) -> CreateStore<S> + 'static) -> Self {
        Self(Box::new(wrap))
    }

    /// Wrap `next`, returning the enhanced creator.
    pub fn apply(self, next: CreateStore<S>) -> CreateStore<S> {
        (self.0)(next)
    }
}

impl<S> std::fmt::Debug for Enhancer<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Enhancer")
    }
}

/// The value passed in the second construction position.
pub enum StoreArg<S> {
    /// Initial state.
    Preloaded(Value),
    /// An enhancer given in place of the initial state.
    Enhancer(Enhancer<S>),
}

impl<S> From<Value> for StoreArg<S> {
    fn from(value: Value) -> Self {
        StoreArg::Preloaded(value)
    }
}

/// Resolve the overloaded construction arguments.
///
/// An enhancer in the second position moves to the enhancer slot and the
/// initial state becomes absent. If an enhancer is given in both positions
/// they are composed, the second-position one outermost.
pub fn normalize_args<S: 'static>(
    second: Option<StoreArg<S>>,
    third: Option<Enhancer<S>>,
) -> (Option<Value>, Option<Enhancer<S>>) {
    match (second, third) {
        (None, enhancer) => (None, enhancer),
        (Some(StoreArg::Preloaded(state)), enhancer) => (Some(state), enhancer),
        (Some(StoreArg::Enhancer(enhancer)), None) => (None, Some(enhancer)),
        (Some(StoreArg::Enhancer(outer)), Some(inner)) => (None, Some(compose(vec![outer, inner]))),
    }
}

/// Compose enhancers right to left, so the first one is outermost.
pub fn compose<S: 'static>(enhancers: Vec<Enhancer<S>>) -> Enhancer<S> {
    Enhancer::new(move |create: CreateStore<S>| -> CreateStore<S> {
        enhancers
            .into_iter()
            .rev()
            .fold(create, |next, enhancer| enhancer.apply(next))
    })
}
