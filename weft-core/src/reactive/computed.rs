//! Computed Slot Implementation
//!
//! A computed slot is a cached derived value that re-evaluates only
//! when something it read has changed, and only when somebody asks.
//!
//! # How Computed Slots Work
//!
//! 1. The getter does not run at construction. The slot starts dirty.
//!
//! 2. On read, a dirty slot runs its getter inside an internal effect,
//!    caches the result, and comes back clean. A clean slot returns
//!    the cache without touching the getter.
//!
//! 3. The internal effect carries a scheduler instead of re-running:
//!    when a source changes, the slot merely flips back to dirty and
//!    notifies its own readers. The recompute happens on the next
//!    read, if one ever comes.
//!
//! 4. Readers subscribe to the slot itself, not to its sources, so a
//!    chain of computed slots propagates staleness outward one level
//!    at a time without recomputing anything eagerly.
//!
//! # Why This Matters
//!
//! This lazy approach avoids unnecessary recomputation:
//!
//! - A source changes
//! - 10 computed slots depend on it
//! - Only the slots actually read afterwards recompute
//! - Slots that are never read stay dirty (no wasted work)
//!
//! # Thread Safety
//!
//! The dirty flag is an atomic swapped at each decision point, so two
//! racing readers agree on which of them recomputes. The getter runs
//! with no slot locks held.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use tracing::warn;

use super::effect::{Effect, EffectId};
use super::graph::Dep;
use crate::value::Value;

type Setter = Box<dyn Fn(Value) + Send + Sync>;

/// Shared state behind a [`Computed`] handle.
struct ComputedInner {
    /// True when the cache may be stale. Starts true.
    dirty: Arc<AtomicBool>,
    /// Last getter result. Null until the first read.
    value: RwLock<Value>,
    /// Forwarding target for writes, when the slot is writable.
    setter: Option<Setter>,
    /// Runs the getter with tracking; its scheduler marks us dirty.
    effect: Effect,
    /// Readers of this slot subscribe here.
    dep: Arc<Dep>,
}

impl Drop for ComputedInner {
    fn drop(&mut self) {
        // Detach the internal effect so source writes stop scheduling
        // a slot that no longer exists.
        self.effect.stop();
    }
}

/// A lazily computed, cached, trackable value.
///
/// # Example
///
/// ```rust,ignore
/// let first = Signal::new("ada");
/// let last = Signal::new("lovelace");
///
/// let full = Computed::new(move || {
///     Value::from(format!("{} {}", first.get(), last.get()))
/// });
///
/// full.get(); // runs the getter
/// full.get(); // cached, getter not run again
/// ```
pub struct Computed {
    inner: Arc<ComputedInner>,
}

impl Computed {
    /// Create a read-only computed slot.
    ///
    /// The getter is not run immediately. It runs on first read.
    pub fn new<G>(getter: G) -> Self
    where
        G: Fn() -> Value + Send + Sync + 'static,
    {
        Self::build(getter, None)
    }

    /// Create a writable computed slot.
    ///
    /// Writes go to `setter`, which typically updates the sources the
    /// getter reads; the cache refreshes through the normal staleness
    /// path once those sources change.
    pub fn writable<G, S>(getter: G, setter: S) -> Self
    where
        G: Fn() -> Value + Send + Sync + 'static,
        S: Fn(Value) + Send + Sync + 'static,
    {
        Self::build(getter, Some(Box::new(setter)))
    }

    fn build<G>(getter: G, setter: Option<Setter>) -> Self
    where
        G: Fn() -> Value + Send + Sync + 'static,
    {
        let dirty = Arc::new(AtomicBool::new(true));
        let dep = Arc::new(Dep::new());

        // On a source change: flip to dirty and, only on the clean to
        // dirty edge, tell our readers. Further changes while already
        // dirty stay quiet until the next read.
        let scheduler = {
            let dirty = Arc::clone(&dirty);
            let dep = Arc::clone(&dep);
            move || {
                if !dirty.swap(true, Ordering::SeqCst) {
                    dep.trigger();
                }
            }
        };

        let effect = Effect::lazy_with_scheduler(getter, scheduler);

        Self {
            inner: Arc::new(ComputedInner {
                dirty,
                value: RwLock::new(Value::Null),
                setter,
                effect,
                dep,
            }),
        }
    }

    /// Read the slot's value, recomputing first if it is stale.
    ///
    /// Inside a computation this also subscribes the reader to the
    /// slot, so later source changes propagate outward.
    pub fn get(&self) -> Value {
        Dep::track(&self.inner.dep);

        if self.inner.dirty.swap(false, Ordering::SeqCst) {
            let value = self.inner.effect.run();
            *self
                .inner
                .value
                .write()
                .expect("computed value lock poisoned") = value;
        }

        self.inner
            .value
            .read()
            .expect("computed value lock poisoned")
            .clone()
    }

    /// Write through to the setter.
    ///
    /// Slots created without one ignore the write.
    pub fn set(&self, value: impl Into<Value>) {
        match &self.inner.setter {
            Some(setter) => setter(value.into()),
            None => warn!(slot = self.id().raw(), "write to a read-only computed slot ignored"),
        }
    }

    /// Whether the next read will recompute.
    pub fn is_dirty(&self) -> bool {
        self.inner.dirty.load(Ordering::SeqCst)
    }

    /// Get the slot's unique ID (shared with its internal effect).
    pub fn id(&self) -> EffectId {
        self.inner.effect.id()
    }

    /// Number of computations currently subscribed to this slot.
    pub fn subscriber_count(&self) -> usize {
        self.inner.dep.subscriber_count()
    }
}

impl Clone for Computed {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl PartialEq for Computed {
    fn eq(&self, other: &Self) -> bool {
        self.inner.effect.id() == other.inner.effect.id()
    }
}

impl Eq for Computed {}

impl fmt::Debug for Computed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Computed")
            .field("id", &self.id())
            .field("dirty", &self.is_dirty())
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::effect::effect;
    use crate::reactive::store::{object, reactive, ObjRef};
    use std::sync::atomic::{AtomicI32, Ordering};

    fn observed(value: Value) -> ObjRef {
        match reactive(value) {
            Value::Obj(handle) => handle,
            other => panic!("expected an object, got {other:?}"),
        }
    }

    #[test]
    fn computed_is_lazy() {
        let call_count = Arc::new(AtomicI32::new(0));
        let call_count_clone = call_count.clone();

        let computed = Computed::new(move || {
            call_count_clone.fetch_add(1, Ordering::SeqCst);
            Value::from(42)
        });

        // Not computed yet
        assert!(computed.is_dirty());
        assert_eq!(call_count.load(Ordering::SeqCst), 0);

        // First read triggers computation
        assert_eq!(computed.get(), Value::from(42));
        assert_eq!(call_count.load(Ordering::SeqCst), 1);
        assert!(!computed.is_dirty());
    }

    #[test]
    fn computed_caches_value_when_clean() {
        let call_count = Arc::new(AtomicI32::new(0));
        let call_count_clone = call_count.clone();

        let computed = Computed::new(move || {
            call_count_clone.fetch_add(1, Ordering::SeqCst);
            Value::from(42)
        });

        assert_eq!(computed.get(), Value::from(42));
        assert_eq!(computed.get(), Value::from(42));
        assert_eq!(computed.get(), Value::from(42));
        assert_eq!(call_count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn computed_recomputes_after_a_source_change() {
        let state = observed(object([("n", 1)]));
        let call_count = Arc::new(AtomicI32::new(0));

        let call_count_clone = call_count.clone();
        let doubled = Computed::new(move || {
            call_count_clone.fetch_add(1, Ordering::SeqCst);
            match state.get("n").as_int() {
                Some(n) => Value::from(n * 2),
                None => Value::Null,
            }
        });

        assert_eq!(doubled.get(), Value::from(2));
        assert_eq!(call_count.load(Ordering::SeqCst), 1);

        state.set("n", 5);
        assert!(doubled.is_dirty());

        assert_eq!(doubled.get(), Value::from(10));
        assert_eq!(doubled.get(), Value::from(10));

        // Exactly one recompute for the whole change-then-read cycle.
        assert_eq!(call_count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn source_changes_without_reads_do_no_work() {
        let state = observed(object([("n", 1)]));
        let call_count = Arc::new(AtomicI32::new(0));

        let call_count_clone = call_count.clone();
        let derived = Computed::new(move || {
            call_count_clone.fetch_add(1, Ordering::SeqCst);
            state.get("n")
        });
        derived.get();

        state.set("n", 2);
        state.set("n", 3);
        state.set("n", 4);

        // Still just the initial computation; the slot is merely dirty.
        assert_eq!(call_count.load(Ordering::SeqCst), 1);
        assert!(derived.is_dirty());
    }

    #[test]
    fn equal_source_writes_keep_the_cache_clean() {
        let state = observed(object([("n", 1)]));
        let derived = Computed::new(move || state.get("n"));
        derived.get();

        state.set("n", 1);
        assert!(!derived.is_dirty());
    }

    #[test]
    fn readers_subscribe_to_the_slot() {
        let state = observed(object([("n", 1)]));
        let doubled = Computed::new(move || match state.get("n").as_int() {
            Some(n) => Value::from(n * 2),
            None => Value::Null,
        });

        let runs = Arc::new(AtomicI32::new(0));
        let seen = Arc::new(RwLock::new(Value::Null));

        let runs_clone = runs.clone();
        let seen_clone = seen.clone();
        let doubled_clone = doubled.clone();
        let _effect = effect(move || {
            *seen_clone.write().unwrap() = doubled_clone.get();
            runs_clone.fetch_add(1, Ordering::SeqCst);
        });

        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert_eq!(*seen.read().unwrap(), Value::from(2));
        assert_eq!(doubled.subscriber_count(), 1);

        state.set("n", 3);
        assert_eq!(runs.load(Ordering::SeqCst), 2);
        assert_eq!(*seen.read().unwrap(), Value::from(6));
    }

    #[test]
    fn chains_propagate_one_level_at_a_time() {
        let state = observed(object([("n", 1)]));
        let first_calls = Arc::new(AtomicI32::new(0));
        let second_calls = Arc::new(AtomicI32::new(0));

        let first_calls_clone = first_calls.clone();
        let doubled = Computed::new(move || {
            first_calls_clone.fetch_add(1, Ordering::SeqCst);
            match state.get("n").as_int() {
                Some(n) => Value::from(n * 2),
                None => Value::Null,
            }
        });

        let second_calls_clone = second_calls.clone();
        let doubled_clone = doubled.clone();
        let plus_one = Computed::new(move || {
            second_calls_clone.fetch_add(1, Ordering::SeqCst);
            match doubled_clone.get().as_int() {
                Some(n) => Value::from(n + 1),
                None => Value::Null,
            }
        });

        assert_eq!(plus_one.get(), Value::from(3));

        state.set("n", 10);

        // Both stale, neither recomputed yet.
        assert!(doubled.is_dirty());
        assert!(plus_one.is_dirty());
        assert_eq!(first_calls.load(Ordering::SeqCst), 1);
        assert_eq!(second_calls.load(Ordering::SeqCst), 1);

        assert_eq!(plus_one.get(), Value::from(21));
        assert_eq!(first_calls.load(Ordering::SeqCst), 2);
        assert_eq!(second_calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn writable_computed_forwards_writes() {
        let state = observed(object([("n", 1)]));
        let mirror = Computed::writable(
            move || state.get("n"),
            move |value| state.set("n", value),
        );

        assert_eq!(mirror.get(), Value::from(1));

        mirror.set(10);
        assert_eq!(state.get_untracked("n"), Value::from(10));

        // The setter's write dirtied the slot through its source.
        assert_eq!(mirror.get(), Value::from(10));
    }

    #[test]
    fn read_only_writes_are_ignored() {
        let fixed = Computed::new(|| Value::from(1));
        fixed.get();

        fixed.set(99);
        assert_eq!(fixed.get(), Value::from(1));
    }

    #[test]
    fn computed_clone_shares_state() {
        let call_count = Arc::new(AtomicI32::new(0));
        let call_count_clone = call_count.clone();

        let computed1 = Computed::new(move || {
            call_count_clone.fetch_add(1, Ordering::SeqCst);
            Value::from(42)
        });
        let computed2 = computed1.clone();

        assert_eq!(computed1, computed2);
        assert_eq!(computed1.id(), computed2.id());

        computed1.get();
        assert!(!computed2.is_dirty());
        assert_eq!(computed2.get(), Value::from(42));
        assert_eq!(call_count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn dropping_the_last_handle_detaches_from_sources() {
        let state = observed(object([("n", 1)]));

        let derived = Computed::new(move || state.get("n"));
        derived.get();
        assert_eq!(state.subscriber_count("n"), 1);

        // With every handle gone the internal effect is stopped and
        // unsubscribed, so the source forgets the slot entirely.
        drop(derived);
        assert_eq!(state.subscriber_count("n"), 0);
    }
}
