//! # Observer Registries
//!
//! Ordered callback registries for connect, disconnect, and data events.
//!
//! Callbacks are level-triggered registrations, not one-shot promises:
//! every registered observer is invoked synchronously on each occurrence,
//! in registration order. Removal is by the `CallbackId` returned at
//! registration time.

use std::sync::{Arc, Mutex};

/// Handle returned by [`CallbackRegistry::add`], used for removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CallbackId(u64);

/// An ordered, thread-safe list of callbacks.
///
/// Invocation order is registration order and is preserved across removals,
/// which keeps observer delivery deterministic for testing.
pub struct CallbackRegistry<T: ?Sized> {
    entries: Mutex<Vec<(CallbackId, Arc<T>)>>,
    next_id: Mutex<u64>,
}

impl<T: ?Sized> CallbackRegistry<T> {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
            next_id: Mutex::new(0),
        }
    }

    /// Register a callback; returns the id used to remove it later.
    pub fn add(&self, callback: Arc<T>) -> CallbackId {
        let id = {
            let mut next = self.next_id.lock().unwrap_or_else(|e| e.into_inner());
            let id = CallbackId(*next);
            *next += 1;
            id
        };
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((id, callback));
        id
    }

    /// Remove a previously registered callback. Unknown ids are ignored.
    pub fn remove(&self, id: CallbackId) {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .retain(|(entry_id, _)| *entry_id != id);
    }

    /// Snapshot the current callbacks in registration order.
    ///
    /// Invocation happens on the snapshot, outside the registry lock, so an
    /// observer may re-enter the service (for example to send a reply)
    /// without deadlocking.
    pub fn snapshot(&self) -> Vec<Arc<T>> {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .map(|(_, cb)| Arc::clone(cb))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: ?Sized> Default for CallbackRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}
