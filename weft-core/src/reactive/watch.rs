//! Watch Observers
//!
//! A watch observer pairs a tracked source with a callback that runs
//! on change, receiving the new value, the previous value, and a hook
//! for registering cleanup.
//!
//! # How It Works
//!
//! 1. The source (a deep traversal of a reactive object, or a caller
//!    supplied getter) runs once inside a lazy effect to seed the old
//!    value and collect dependencies. The callback does not run for
//!    this seed pass.
//!
//! 2. A change invokes the effect's scheduler, the job: it runs any
//!    cleanup left behind by the previous callback, re-runs the source
//!    for the new value, invokes the callback, and stores the new
//!    value for the next round.
//!
//! 3. The job holds the effect weakly while the dependency sets hold
//!    it strongly, so an observer lives exactly as long as it is
//!    subscribed to something.
//!
//! # Cleanup
//!
//! The callback may register a closure through [`OnCleanup`]. It runs
//! before the next callback invocation, letting the previous round
//! cancel whatever it started. Registration is per round: the closure
//! is consumed before each run, and registering twice in one round
//! keeps only the later closure.

use std::collections::HashSet;
use std::sync::{Arc, RwLock};

use tracing::warn;

use super::effect::{Effect, WeakEffect};
use super::store::{is_reactive, ObjectId};
use crate::value::Value;

type CleanupFn = Box<dyn FnOnce() + Send + Sync>;

/// Registers cleanup for the current callback round.
#[derive(Clone)]
pub struct OnCleanup {
    slot: Arc<RwLock<Option<CleanupFn>>>,
}

impl OnCleanup {
    fn new() -> Self {
        Self {
            slot: Arc::new(RwLock::new(None)),
        }
    }

    /// Register a closure to run before the next callback invocation.
    pub fn register(&self, f: impl FnOnce() + Send + Sync + 'static) {
        *self.slot.write().expect("cleanup slot poisoned") = Some(Box::new(f));
    }

    fn take(&self) -> Option<CleanupFn> {
        self.slot.write().expect("cleanup slot poisoned").take()
    }
}

/// Observe a reactive object deeply.
///
/// Every property reachable from `source` is read, and therefore
/// tracked, up front; a change anywhere in the structure invokes
/// `callback`. For a deep watch the source handle is passed as both
/// the new and the old value, since the structure mutates in place.
///
/// A source that is not a reactive object cannot notify anyone, so it
/// is rejected with a warning and no observer is created. Use
/// [`watch_getter`] to derive a watchable value from arbitrary state.
pub fn watch<C>(source: &Value, callback: C)
where
    C: Fn(&Value, &Value, &OnCleanup) + Send + Sync + 'static,
{
    if !is_reactive(source) {
        warn!(
            kind = source.kind(),
            "watch source is not a reactive object; observer not created"
        );
        return;
    }

    let source = source.clone();
    install(move || traverse(&source), callback);
}

/// Observe a getter.
///
/// The getter is tracked like an effect body; whatever it returns is
/// what the callback sees as the new and old values.
pub fn watch_getter<G, C>(getter: G, callback: C)
where
    G: Fn() -> Value + Send + Sync + 'static,
    C: Fn(&Value, &Value, &OnCleanup) + Send + Sync + 'static,
{
    install(getter, callback);
}

fn install<G, C>(getter: G, callback: C)
where
    G: Fn() -> Value + Send + Sync + 'static,
    C: Fn(&Value, &Value, &OnCleanup) + Send + Sync + 'static,
{
    let handle: Arc<RwLock<Option<WeakEffect>>> = Arc::new(RwLock::new(None));
    let old_value = Arc::new(RwLock::new(Value::Null));
    let cleanup = OnCleanup::new();

    let job = {
        let handle = Arc::clone(&handle);
        let old_value = Arc::clone(&old_value);
        let cleanup = cleanup.clone();
        move || {
            // The effect can be gone if everything it observed was
            // disposed between trigger and job.
            let effect = {
                let slot = handle.read().expect("watch handle poisoned");
                slot.as_ref().and_then(WeakEffect::upgrade)
            };
            let Some(effect) = effect else { return };

            if let Some(run_cleanup) = cleanup.take() {
                run_cleanup();
            }

            let new_value = effect.run();
            let previous = old_value
                .read()
                .expect("watch old value poisoned")
                .clone();
            callback(&new_value, &previous, &cleanup);
            *old_value.write().expect("watch old value poisoned") = new_value;
        }
    };

    let effect = Effect::lazy_with_scheduler(getter, job);
    *handle.write().expect("watch handle poisoned") = Some(effect.downgrade());

    // Seed run: collects dependencies and the initial old value. No
    // callback for this one.
    *old_value.write().expect("watch old value poisoned") = effect.run();
}

/// Read every property reachable from `value`, depth first.
///
/// Objects already seen are skipped, so cyclic structures terminate.
/// The return value is the source itself; the walk exists so that
/// every reachable property has been read through an observed handle.
fn traverse(value: &Value) -> Value {
    fn visit(value: &Value, seen: &mut HashSet<ObjectId>) {
        let Value::Obj(obj) = value else { return };
        if !seen.insert(obj.id()) {
            return;
        }
        for key in obj.keys() {
            visit(&obj.get(key), seen);
        }
    }

    let mut seen = HashSet::new();
    visit(value, &mut seen);
    value.clone()
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
