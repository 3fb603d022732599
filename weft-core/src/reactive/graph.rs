//! Dependency Graph
//!
//! The graph records which effects read which reactive sources. Every
//! source (an object property, a signal, a computed slot) owns one
//! dependency set; the set holds the effects to notify when that source
//! changes.
//!
//! # How It Works
//!
//! 1. When an effect runs, reads of observed state call [`Dep::track`],
//!    inserting the effect into the source's set and handing the effect
//!    a weak back-reference for later cleanup.
//!
//! 2. When a source changes, [`Dep::trigger`] snapshots the set and
//!    notifies each subscriber. The computation that performed the
//!    write is skipped so self-updating effects terminate.
//!
//! 3. Object properties get their sets lazily, on first tracked read,
//!    from a process-wide map keyed by object and property.
//!
//! # Ownership
//!
//! Sets own their subscribers: an effect with at least one subscription
//! stays alive even when no user handle remains. The reverse direction
//! is weak, so dropping a set (when its object is disposed) never keeps
//! an effect alive and never dangles.
//!
//! # Thread Safety
//!
//! The set snapshot is taken under a read lock that is released before
//! any subscriber runs. Effects are therefore free to read and write
//! reactive state, and so re-enter this module, while being notified.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, OnceLock, RwLock};

use tracing::trace;

use super::context::{is_tracking, ReactiveContext};
use super::effect::Effect;
use super::store::ObjectId;
use crate::value::PropKey;

/// A set of effects subscribed to one reactive source.
pub(crate) struct Dep {
    subscribers: RwLock<HashSet<Effect>>,
}

impl Dep {
    pub(crate) fn new() -> Self {
        Self {
            subscribers: RwLock::new(HashSet::new()),
        }
    }

    /// Subscribe the currently running effect, if tracking is on.
    ///
    /// Takes the `Arc` so the effect can store a weak back-reference.
    /// Inserting is idempotent per effect; the back-reference is
    /// recorded only on first insertion.
    pub(crate) fn track(this: &Arc<Dep>) {
        if !is_tracking() {
            return;
        }
        let Some(current) = ReactiveContext::current() else {
            return;
        };

        let inserted = this
            .subscribers
            .write()
            .expect("subscribers lock poisoned")
            .insert(current.clone());

        if inserted {
            current.push_subscription(Arc::downgrade(this));
        }
    }

    /// Notify every subscriber except the computation that caused the
    /// write.
    ///
    /// The set is snapshotted and its lock released before any
    /// notification runs, so subscribers may freely subscribe,
    /// unsubscribe, or trigger further changes.
    pub(crate) fn trigger(&self) {
        let subscribers: Vec<Effect> = {
            let subs = self.subscribers.read().expect("subscribers lock poisoned");
            subs.iter().cloned().collect()
        };
        if subscribers.is_empty() {
            return;
        }

        let active = ReactiveContext::current();
        for effect in subscribers {
            // An effect that writes one of its own dependencies must
            // not notify itself, or it would re-run forever.
            if active.as_ref().is_some_and(|running| *running == effect) {
                continue;
            }
            effect.notify();
        }
    }

    /// Drop one effect's subscription.
    pub(crate) fn remove(&self, effect: &Effect) {
        self.subscribers
            .write()
            .expect("subscribers lock poisoned")
            .remove(effect);
    }

    /// Number of currently subscribed effects.
    pub(crate) fn subscriber_count(&self) -> usize {
        self.subscribers
            .read()
            .expect("subscribers lock poisoned")
            .len()
    }
}

// Dependency sets for object properties, keyed by object then property.
// Sets are created lazily on first tracked read and removed wholesale
// when the object is disposed.
static PROPERTY_DEPS: OnceLock<RwLock<HashMap<ObjectId, HashMap<PropKey, Arc<Dep>>>>> =
    OnceLock::new();

fn get_property_deps() -> &'static RwLock<HashMap<ObjectId, HashMap<PropKey, Arc<Dep>>>> {
    PROPERTY_DEPS.get_or_init(|| RwLock::new(HashMap::new()))
}

/// Subscribe the running effect to reads of `(target, key)`.
///
/// Called automatically when an observed property is read within a
/// reactive context. Does nothing when tracking is off, so untracked
/// reads never allocate a set.
pub(crate) fn track(target: ObjectId, key: &PropKey) {
    if !is_tracking() {
        return;
    }

    let dep = {
        let mut deps = get_property_deps()
            .write()
            .expect("property deps lock poisoned");
        deps.entry(target)
            .or_default()
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Dep::new()))
            .clone()
    };

    Dep::track(&dep);
    trace!(object = target.raw(), key = %key, "tracked property read");
}

/// Notify subscribers of `(target, key)` that the property changed.
pub(crate) fn trigger(target: ObjectId, key: &PropKey) {
    let dep = {
        let deps = get_property_deps()
            .read()
            .expect("property deps lock poisoned");
        deps.get(&target).and_then(|props| props.get(key)).cloned()
    };

    if let Some(dep) = dep {
        trace!(
            object = target.raw(),
            key = %key,
            subscribers = dep.subscriber_count(),
            "property changed"
        );
        dep.trigger();
    }
}

/// Number of effects subscribed to `(target, key)`.
pub(crate) fn subscriber_count(target: ObjectId, key: &PropKey) -> usize {
    let deps = get_property_deps()
        .read()
        .expect("property deps lock poisoned");
    deps.get(&target)
        .and_then(|props| props.get(key))
        .map_or(0, |dep| dep.subscriber_count())
}

/// Drop every dependency set belonging to a disposed object.
///
/// Effects subscribed through those sets lose their subscriptions; the
/// weak back-references they hold simply fail to upgrade on their next
/// cleanup.
pub(crate) fn drop_object(target: ObjectId) {
    get_property_deps()
        .write()
        .expect("property deps lock poisoned")
        .remove(&target);
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
