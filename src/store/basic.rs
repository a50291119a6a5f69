//! Reference store implementation.
//!
//! `BasicStore` is a reducer-driven container with change listeners. It
//! is what the crate's tests and examples run the enhancer against, but
//! the enhancer itself only depends on the [`Store`] trait.

use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, PoisonError, Weak};
use std::thread::{self, ThreadId};

use super::{
    normalize_args, Action, CreateStore, Enhancer, Listener, Reducer, StateReader, Store, StoreArg,
    Unsubscribe,
};

/// Type of the action reduced once at construction.
pub const INIT_ACTION: &str = "@@persist-state/INIT";

struct Inner {
    reducer: Reducer,
    state: Mutex<Value>,
    listeners: Mutex<Vec<(u64, Listener)>>,
    next_id: AtomicU64,
    notify: NotifyGate,
}

/// Lets one thread at a time run listeners. The holding thread may re-enter.
#[derive(Default)]
struct NotifyGate {
    holder: Mutex<Option<(ThreadId, usize)>>,
    released: Condvar,
}

impl NotifyGate {
    fn enter(&self) -> NotifyGuard<'_> {
        let me = thread::current().id();
        let mut holder = self.holder.lock().unwrap_or_else(PoisonError::into_inner);
        loop {
            match *holder {
                Some((owner, ref mut depth)) if owner == me => {
                    *depth += 1;
                    break;
                }
                None => {
                    *holder = Some((me, 1));
                    break;
                }
                Some(_) => {}
            }
            holder = self
                .released
                .wait(holder)
                .unwrap_or_else(PoisonError::into_inner);
        }
        NotifyGuard { gate: self }
    }
}

struct NotifyGuard<'a> {
    gate: &'a NotifyGate,
}

impl Drop for NotifyGuard<'_> {
    fn drop(&mut self) {
        let mut holder = self
            .gate
            .holder
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let released = match holder.as_mut() {
            Some((_, depth)) => {
                *depth -= 1;
                *depth == 0
            }
            None => false,
        };
        if released {
            *holder = None;
            self.gate.released.notify_one();
        }
    }
}

/// A cloneable handle to a reducer-driven state container.
#[derive(Clone)]
pub struct BasicStore {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for BasicStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BasicStore")
            .field("state", &self.get_state())
            .field("listeners", &self.listener_count())
            .finish()
    }
}

impl BasicStore {
    fn new(reducer: Reducer, preloaded: Option<Value>) -> Self {
        let state = reducer(preloaded.as_ref(), &json!({ "type": INIT_ACTION }));
        Self {
            inner: Arc::new(Inner {
                reducer,
                state: Mutex::new(state),
                listeners: Mutex::new(Vec::new()),
                next_id: AtomicU64::new(0),
                notify: NotifyGate::default(),
            }),
        }
    }

    /// Reduce `action` into the state, then notify every listener.
    ///
    /// Listeners run after the state lock is released, so they may read
    /// the store or dispatch again. Notifications from concurrent
    /// dispatches run one at a time, each after its own state commit, so
    /// the last listener to run always sees the latest state. Returns the
    /// new state.
    pub fn dispatch(&self, action: Action) -> Value {
        let next = {
            let mut state = self
                .inner
                .state
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            let next = (self.inner.reducer)(Some(&*state), &action);
            *state = next.clone();
            next
        };

        let _notifying = self.inner.notify.enter();
        let listeners: Vec<Listener> = self
            .inner
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();

        for listener in listeners {
            listener();
        }

        next
    }

    /// Number of registered listeners.
    pub fn listener_count(&self) -> usize {
        self.inner
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl Inner {
    fn snapshot(&self) -> Value {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Store for BasicStore {
    fn get_state(&self) -> Value {
        self.inner.snapshot()
    }

    fn state_reader(&self) -> StateReader {
        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        Arc::new(move || weak.upgrade().map(|inner| inner.snapshot()))
    }

    fn subscribe(&self, listener: Listener) -> Unsubscribe {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, listener));

        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        Box::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner
                    .listeners
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .retain(|(existing, _)| *existing != id);
            }
        })
    }
}

/// Create a [`BasicStore`].
///
/// With an enhancer, construction is delegated to
/// `enhancer.apply(create_store)(reducer, preloaded, None)`.
pub fn create_store(
    reducer: Reducer,
    preloaded: Option<Value>,
    enhancer: Option<Enhancer<BasicStore>>,
) -> BasicStore {
    match enhancer {
        Some(enhancer) => {
            let base: CreateStore<BasicStore> = Box::new(create_store);
            enhancer.apply(base)(reducer, preloaded, None)
        }
        None => BasicStore::new(reducer, preloaded),
    }
}

/// Create a [`BasicStore`] where the second argument may be state or an enhancer.
pub fn create_store_with(
    reducer: Reducer,
    second: Option<StoreArg<BasicStore>>,
    enhancer: Option<Enhancer<BasicStore>>,
) -> BasicStore {
    let (preloaded, enhancer) = normalize_args(second, enhancer);
    create_store(reducer, preloaded, enhancer)
}
