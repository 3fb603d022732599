//! Signal Implementation
//!
//! A Signal is a standalone reactive slot. It holds a single value and
//! tracks which computations read it.
//!
//! # How Signals Work
//!
//! 1. When a signal is read within a computation, that computation is
//!    subscribed to the signal.
//!
//! 2. When the signal's value changes, all subscribers are notified.
//!    Writes of a value equal to the current one notify nobody.
//!
//! 3. Object values are kept in two flavors: as written (for change
//!    detection) and observed (handed to readers). A signal holding an
//!    object therefore gives its readers property-level tracking on
//!    top of whole-slot replacement.
//!
//! # Thread Safety
//!
//! Values are cloned out under a RwLock, and no lock is held while
//! subscribers run.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use super::graph::Dep;
use super::store::reactive;
use crate::value::Value;

/// Counter for generating unique signal IDs.
static SIGNAL_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Generate a new unique signal ID.
fn next_signal_id() -> u64 {
    SIGNAL_ID_COUNTER.fetch_add(1, Ordering::Relaxed)
}

/// Shared state behind a [`Signal`] handle.
struct SignalInner {
    id: u64,

    /// The value as last written, used for change detection.
    raw: RwLock<Value>,

    /// The value as handed to readers: objects come back observed.
    observed: RwLock<Value>,

    /// Readers subscribe here.
    dep: Arc<Dep>,
}

/// A reactive slot holding a single value.
///
/// Handles are cheap to clone and share the same slot. Two signals are
/// equal only when they are the same slot, never by value.
///
/// # Example
///
/// ```rust,ignore
/// let count = Signal::new(0);
///
/// // Read the value
/// let value = count.get();
///
/// // Update the value (notifies subscribers)
/// count.set(5);
/// ```
pub struct Signal {
    inner: Arc<SignalInner>,
}

impl Signal {
    /// Create a new signal with the given initial value.
    pub fn new(value: impl Into<Value>) -> Self {
        let value = value.into();
        Self {
            inner: Arc::new(SignalInner {
                id: next_signal_id(),
                observed: RwLock::new(reactive(value.clone())),
                raw: RwLock::new(value),
                dep: Arc::new(Dep::new()),
            }),
        }
    }

    /// Get the signal's unique ID.
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    /// Get the current value.
    ///
    /// If called within a computation, this also subscribes the
    /// computation to the signal. Object values come back observed.
    pub fn get(&self) -> Value {
        Dep::track(&self.inner.dep);
        self.inner
            .observed
            .read()
            .expect("signal value lock poisoned")
            .clone()
    }

    /// Get the current value without tracking dependencies.
    ///
    /// Use this when you need to read the value without establishing
    /// a reactive dependency.
    pub fn get_untracked(&self) -> Value {
        self.inner
            .observed
            .read()
            .expect("signal value lock poisoned")
            .clone()
    }

    /// Set a new value and notify subscribers.
    ///
    /// Comparison is against the value as previously written, so
    /// storing an equal value is silent.
    pub fn set(&self, value: impl Into<Value>) {
        let value = value.into();

        let changed = {
            let mut raw = self.inner.raw.write().expect("signal value lock poisoned");
            if *raw == value {
                false
            } else {
                *self
                    .inner
                    .observed
                    .write()
                    .expect("signal value lock poisoned") = reactive(value.clone());
                *raw = value;
                true
            }
        };

        // Locks are released before anyone is notified.
        if changed {
            self.inner.dep.trigger();
        }
    }

    /// Update the value using a function of the current one.
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&Value) -> Value,
    {
        let next = {
            let raw = self.inner.raw.read().expect("signal value lock poisoned");
            f(&raw)
        };
        self.set(next);
    }

    /// Get the number of subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.inner.dep.subscriber_count()
    }
}

impl Clone for Signal {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl PartialEq for Signal {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

impl Eq for Signal {}

impl fmt::Debug for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signal")
            .field("id", &self.inner.id)
            .field("value", &self.get_untracked())
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
