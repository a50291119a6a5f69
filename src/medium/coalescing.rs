//! Background writer for slow media.
//!
//! `CoalescingMedium` accepts writes immediately and performs them on a
//! single worker thread. At most one write is in flight. A write to a key
//! that already has a queued, unwritten value replaces it, so the medium
//! only ever sees a key's values in notification order and the last one
//! always lands.
//!
//! Reads see queued values before they reach the wrapped medium.

use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

use tracing::{debug, warn};

use super::StorageMedium;
use crate::config::StorageOptions;
use crate::error::Result;

#[derive(Debug, Clone)]
enum PendingOp {
    Set(String, StorageOptions),
    Remove(StorageOptions),
}

#[derive(Debug, Default)]
struct Queue {
    pending: VecDeque<(String, PendingOp)>,
    in_flight: Option<(String, PendingOp)>,
    stopping: bool,
}

impl Queue {
    fn latest(&self, key: &str) -> Option<&PendingOp> {
        self.pending
            .iter()
            .find(|(k, _)| k == key)
            .or_else(|| self.in_flight.as_ref().filter(|(k, _)| k == key))
            .map(|(_, op)| op)
    }
}

struct Shared {
    inner: Arc<dyn StorageMedium>,
    queue: Mutex<Queue>,
    wake: Condvar,
    idle: Condvar,
    superseded: AtomicU64,
    failed: AtomicU64,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Queue> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn enqueue(&self, key: &str, op: PendingOp) {
        let mut queue = self.lock();
        match queue.pending.iter_mut().find(|(k, _)| k == key) {
            Some(slot) => {
                slot.1 = op;
                self.superseded.fetch_add(1, Ordering::Relaxed);
            }
            None => queue.pending.push_back((key.to_string(), op)),
        }
        self.wake.notify_one();
    }

    fn run(&self) {
        loop {
            let (key, op) = {
                let mut queue = self.lock();
                while queue.pending.is_empty() && !queue.stopping {
                    queue = self.wake.wait(queue).unwrap_or_else(PoisonError::into_inner);
                }
                let Some(item) = queue.pending.pop_front() else {
                    break;
                };
                queue.in_flight = Some(item.clone());
                item
            };

            // A panicking medium counts as a failed write and the worker carries on
            let result = panic::catch_unwind(AssertUnwindSafe(|| match &op {
                PendingOp::Set(value, options) => self.inner.set(&key, value, options),
                PendingOp::Remove(options) => self.inner.remove(&key, options),
            }));
            match result {
                Ok(Ok(())) => debug!("Background write for '{}' completed", key),
                Ok(Err(e)) => {
                    self.failed.fetch_add(1, Ordering::Relaxed);
                    warn!("Background write for '{}' failed: {}", key, e);
                }
                Err(_) => {
                    self.failed.fetch_add(1, Ordering::Relaxed);
                    warn!("Background write for '{}' panicked", key);
                }
            }

            self.lock().in_flight = None;
            self.idle.notify_all();
        }
        self.idle.notify_all();
    }
}

/// Wraps a medium so writes happen on a background thread.
pub struct CoalescingMedium {
    shared: Arc<Shared>,
    worker: Option<JoinHandle<()>>,
}

impl CoalescingMedium {
    /// Start the worker thread for `inner`.
    pub fn new(inner: Arc<dyn StorageMedium>) -> Result<Self> {
        let shared = Arc::new(Shared {
            inner,
            queue: Mutex::new(Queue::default()),
            wake: Condvar::new(),
            idle: Condvar::new(),
            superseded: AtomicU64::new(0),
            failed: AtomicU64::new(0),
        });

        let worker_shared = Arc::clone(&shared);
        let worker = thread::Builder::new()
            .name("persist-writer".to_string())
            .spawn(move || worker_shared.run())?;

        Ok(Self {
            shared,
            worker: Some(worker),
        })
    }

    /// Block until every queued write has been attempted.
    pub fn flush(&self) {
        let mut queue = self.shared.lock();
        while !queue.pending.is_empty() || queue.in_flight.is_some() {
            queue = self
                .shared
                .idle
                .wait(queue)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Writes dropped because a newer value for the same key replaced them.
    pub fn superseded_writes(&self) -> u64 {
        self.shared.superseded.load(Ordering::Relaxed)
    }

    /// Background writes that the wrapped medium rejected.
    pub fn failed_writes(&self) -> u64 {
        self.shared.failed.load(Ordering::Relaxed)
    }
}

impl std::fmt::Debug for CoalescingMedium {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoalescingMedium")
            .field("queue", &*self.shared.lock())
            .finish_non_exhaustive()
    }
}

impl StorageMedium for CoalescingMedium {
    fn get(&self, key: &str) -> Result<Option<String>> {
        {
            let queue = self.shared.lock();
            match queue.latest(key) {
                Some(PendingOp::Set(value, _)) => return Ok(Some(value.clone())),
                Some(PendingOp::Remove(_)) => return Ok(None),
                None => {}
            }
        }
        self.shared.inner.get(key)
    }

    fn set(&self, key: &str, value: &str, options: &StorageOptions) -> Result<()> {
        self.shared
            .enqueue(key, PendingOp::Set(value.to_string(), options.clone()));
        Ok(())
    }

    fn remove(&self, key: &str, options: &StorageOptions) -> Result<()> {
        self.shared.enqueue(key, PendingOp::Remove(options.clone()));
        Ok(())
    }
}

impl Drop for CoalescingMedium {
    fn drop(&mut self) {
        self.shared.lock().stopping = true;
        self.shared.wake.notify_all();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("Background writer exited abnormally; queued writes may be lost");
            }
        }
    }
}
