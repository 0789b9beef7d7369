//! Listener registry and packet dispatch.
//!
//! Dispatch walks a snapshot of the registry taken when it starts, so
//! listeners may be added or removed from any thread, including from inside
//! a listener callback. A removed entry is deactivated before it leaves the
//! registry and is skipped by any dispatch still holding it.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use tracing::error;

use crate::core::Listener;
use crate::packet::Packet;

/// Handle returned by registration, usable for removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "listener-{}", self.0)
    }
}

struct Registered {
    id: ListenerId,
    listener: Arc<dyn Listener>,
    active: AtomicBool,
}

impl Registered {
    fn deactivate(&self) {
        self.active.store(false, Ordering::Release);
    }

    fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }
}

/// Ordered set of listeners.
#[derive(Default)]
pub struct ListenerRegistry {
    entries: RwLock<Vec<Arc<Registered>>>,
    next_id: AtomicU64,
}

impl ListenerRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener. Dispatch order is registration order.
    pub fn add(&self, listener: Arc<dyn Listener>) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let entry = Arc::new(Registered {
            id,
            listener,
            active: AtomicBool::new(true),
        });
        self.write().push(entry);
        id
    }

    /// Remove every registration of `listener` (matched by `Arc` identity).
    ///
    /// Returns `true` if anything was removed.
    pub fn remove<L: Listener + ?Sized>(&self, listener: &Arc<L>) -> bool {
        let target = Arc::as_ptr(listener);
        self.remove_where(|entry| std::ptr::addr_eq(Arc::as_ptr(&entry.listener), target))
    }

    /// Remove the registration identified by `id`.
    pub fn remove_id(&self, id: ListenerId) -> bool {
        self.remove_where(|entry| entry.id == id)
    }

    /// Number of registered listeners.
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Check if no listeners are registered.
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Deliver `packet` to every registered listener, in registration order.
    ///
    /// Messages go to [`Listener::on_message`], bundles to
    /// [`Listener::on_bundle`]. A panicking listener is logged and skipped.
    /// Returns the number of listeners invoked.
    pub fn dispatch(&self, packet: &Packet) -> usize {
        let snapshot = self.read().clone();
        let mut invoked = 0;

        for entry in snapshot {
            if !entry.is_active() {
                continue;
            }
            invoked += 1;

            let listener = entry.listener.as_ref();
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| match packet {
                Packet::Message(message) => listener.on_message(message),
                Packet::Bundle(bundle) => listener.on_bundle(bundle),
            }));
            if outcome.is_err() {
                error!(listener = %entry.id, "listener panicked during dispatch");
            }
        }
        invoked
    }

    fn remove_where(&self, mut matches: impl FnMut(&Registered) -> bool) -> bool {
        let mut entries = self.write();
        let before = entries.len();
        entries.retain(|entry| {
            if matches(entry) {
                entry.deactivate();
                false
            } else {
                true
            }
        });
        entries.len() != before
    }

    // Listeners never run under the lock, so a poisoned lock still holds a
    // consistent vector.
    fn read(&self) -> std::sync::RwLockReadGuard<'_, Vec<Arc<Registered>>> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Vec<Arc<Registered>>> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ids: Vec<ListenerId> = self.read().iter().map(|entry| entry.id).collect();
        f.debug_struct("ListenerRegistry")
            .field("listeners", &ids)
            .finish()
    }
}
