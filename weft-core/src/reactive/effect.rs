//! Effect Implementation
//!
//! An Effect is a computation that re-runs whenever the reactive state
//! it read during its last run changes.
//!
//! # How Effects Work
//!
//! 1. When created eagerly, the effect runs its body immediately to
//!    establish initial dependencies.
//!
//! 2. While the body runs, every observed property or slot it reads
//!    subscribes this effect. The dependency sets hold the effect;
//!    the effect keeps weak back-references to each set.
//!
//! 3. Before re-running, the effect drops all of its subscriptions and
//!    tracks fresh ones during execution. Dependencies therefore always
//!    reflect the most recent run, which matters when the body branches.
//!
//! 4. When a dependency changes, the effect is notified: it runs its
//!    scheduler if one was attached, otherwise it re-runs synchronously.
//!
//! # Schedulers
//!
//! A scheduler decouples "something changed" from "recompute now".
//! Computed slots use one to merely mark themselves stale, and watch
//! observers use one to diff old and new values before invoking their
//! callback. An effect with a scheduler never re-runs on its own.
//!
//! # Stopping
//!
//! [`Effect::stop`] detaches the effect from the dependency graph for
//! good. A stopped effect can still be run by hand; it computes its
//! value without tracking anything.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, RwLock, Weak};

use smallvec::SmallVec;

use super::context::ReactiveContext;
use super::graph::Dep;
use crate::value::Value;

/// Unique identifier for an effect.
///
/// Each effect (including the internal effects behind computed slots
/// and watch observers) gets a unique ID when created. This ID is used
/// to deduplicate subscriptions and to recognize self-notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EffectId(u64);

impl EffectId {
    /// Generate a new unique effect ID.
    ///
    /// Uses an atomic counter to ensure uniqueness across threads.
    fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// The underlying integer, for diagnostics.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

type Body = Box<dyn Fn() -> Value + Send + Sync>;
type Scheduler = Box<dyn Fn() + Send + Sync>;

/// Shared state behind an [`Effect`] handle.
pub(crate) struct EffectInner {
    id: EffectId,
    body: Body,
    scheduler: Option<Scheduler>,
    /// Cleared by [`Effect::stop`]; never set again.
    active: AtomicBool,
    /// Number of times the body has run.
    run_count: AtomicUsize,
    /// Weak back-references to every dependency set currently holding
    /// this effect. Consumed wholesale on cleanup.
    subscriptions: RwLock<SmallVec<[Weak<Dep>; 4]>>,
}

/// A computation that re-runs when its dependencies change.
///
/// Handles are cheap to clone and all refer to the same underlying
/// effect. Dependency sets keep an effect alive by holding a handle,
/// so an effect with at least one subscription survives even after the
/// handle returned at creation is dropped.
///
/// # Example
///
/// ```rust,ignore
/// let state = reactive(object([("count", 0)]));
/// let Value::Obj(state) = state else { unreachable!() };
///
/// let effect = effect(move || {
///     println!("count is {:?}", state.get("count"));
/// });
///
/// state.set("count", 5); // prints: count is Int(5)
/// ```
pub struct Effect {
    inner: Arc<EffectInner>,
}

impl Effect {
    /// Create a new effect and run it immediately to establish
    /// dependencies.
    pub fn new<F>(body: F) -> Self
    where
        F: Fn() -> Value + Send + Sync + 'static,
    {
        let effect = Self::lazy(body);
        effect.run();
        effect
    }

    /// Create a new effect with a scheduler and run it immediately.
    ///
    /// The body runs now; later dependency changes invoke `scheduler`
    /// instead of re-running the body.
    pub fn with_scheduler<F, S>(body: F, scheduler: S) -> Self
    where
        F: Fn() -> Value + Send + Sync + 'static,
        S: Fn() + Send + Sync + 'static,
    {
        let effect = Self::lazy_with_scheduler(body, scheduler);
        effect.run();
        effect
    }

    /// Create a new effect without running it.
    ///
    /// It subscribes to nothing until [`Effect::run`] is called.
    pub fn lazy<F>(body: F) -> Self
    where
        F: Fn() -> Value + Send + Sync + 'static,
    {
        Self::build(Box::new(body), None)
    }

    /// Create a new unrun effect with a scheduler.
    pub fn lazy_with_scheduler<F, S>(body: F, scheduler: S) -> Self
    where
        F: Fn() -> Value + Send + Sync + 'static,
        S: Fn() + Send + Sync + 'static,
    {
        Self::build(Box::new(body), Some(Box::new(scheduler)))
    }

    fn build(body: Body, scheduler: Option<Scheduler>) -> Self {
        Self {
            inner: Arc::new(EffectInner {
                id: EffectId::new(),
                body,
                scheduler,
                active: AtomicBool::new(true),
                run_count: AtomicUsize::new(0),
                subscriptions: RwLock::new(SmallVec::new()),
            }),
        }
    }

    /// Get the effect's unique ID.
    pub fn id(&self) -> EffectId {
        self.inner.id
    }

    /// Execute the body and return its value.
    ///
    /// An active effect runs inside a reactive context: its old
    /// subscriptions are dropped first, then reads during the body
    /// subscribe it afresh. A stopped effect just computes the value
    /// without touching the dependency graph.
    pub fn run(&self) -> Value {
        if !self.inner.active.load(Ordering::SeqCst) {
            let value = (self.inner.body)();
            self.inner.run_count.fetch_add(1, Ordering::Relaxed);
            return value;
        }

        let _ctx = ReactiveContext::enter(self.clone());

        // Drop stale subscriptions so branches the body no longer reads
        // stop retriggering it.
        self.clear_subscriptions();

        let value = (self.inner.body)();
        self.inner.run_count.fetch_add(1, Ordering::Relaxed);
        value
    }

    /// Notify the effect that one of its dependencies changed.
    ///
    /// Runs the scheduler when one was attached, otherwise re-runs the
    /// body synchronously.
    pub fn notify(&self) {
        match &self.inner.scheduler {
            Some(scheduler) => scheduler(),
            None => {
                self.run();
            }
        }
    }

    /// Permanently detach the effect from the dependency graph.
    ///
    /// Every subscription is dropped and no future write will notify
    /// this effect. Stopping twice is a no-op. [`Effect::run`] still
    /// works on a stopped effect; it just no longer tracks.
    pub fn stop(&self) {
        if self.inner.active.swap(false, Ordering::SeqCst) {
            self.clear_subscriptions();
        }
    }

    /// Check whether the effect is still wired into the graph.
    pub fn is_active(&self) -> bool {
        self.inner.active.load(Ordering::SeqCst)
    }

    /// Get the number of times the body has run.
    pub fn run_count(&self) -> usize {
        self.inner.run_count.load(Ordering::Relaxed)
    }

    /// Get the number of dependency sets this effect is subscribed to.
    pub fn dependency_count(&self) -> usize {
        self.inner
            .subscriptions
            .read()
            .expect("subscriptions lock poisoned")
            .iter()
            .filter(|weak| weak.strong_count() > 0)
            .count()
    }

    /// Record a back-reference to a dependency set that just subscribed
    /// this effect. Called from the tracking side only.
    pub(crate) fn push_subscription(&self, dep: Weak<Dep>) {
        self.inner
            .subscriptions
            .write()
            .expect("subscriptions lock poisoned")
            .push(dep);
    }

    /// Downgrade to a weak handle that does not keep the effect alive.
    pub(crate) fn downgrade(&self) -> WeakEffect {
        WeakEffect {
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Remove this effect from every dependency set it is in.
    ///
    /// The back-reference list is taken in one move so the subscriptions
    /// lock is not held while the sets are being edited.
    fn clear_subscriptions(&self) {
        let stale = {
            let mut subs = self
                .inner
                .subscriptions
                .write()
                .expect("subscriptions lock poisoned");
            std::mem::take(&mut *subs)
        };

        for dep in stale.into_iter().filter_map(|weak| weak.upgrade()) {
            dep.remove(self);
        }
    }
}

impl Clone for Effect {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl PartialEq for Effect {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

impl Eq for Effect {}

impl Hash for Effect {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.id.hash(state);
    }
}

impl fmt::Debug for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Effect")
            .field("id", &self.inner.id)
            .field("run_count", &self.run_count())
            .field("dependency_count", &self.dependency_count())
            .field("active", &self.is_active())
            .finish()
    }
}

/// A non-owning handle to an effect.
///
/// Watch observers hand one of these to their scheduler so the job can
/// re-run the source getter without keeping the effect alive forever.
#[derive(Clone)]
pub(crate) struct WeakEffect {
    inner: Weak<EffectInner>,
}

impl WeakEffect {
    pub(crate) fn upgrade(&self) -> Option<Effect> {
        self.inner.upgrade().map(|inner| Effect { inner })
    }
}

/// Create an eager effect from a unit closure.
///
/// The closure runs once immediately and again whenever any observed
/// state it read changes. The returned handle can re-run or stop it.
pub fn effect<F>(f: F) -> Effect
where
    F: Fn() + Send + Sync + 'static,
{
    Effect::new(move || {
        f();
        Value::Null
    })
}

/// Like [`effect`], but dependency changes invoke `scheduler` instead
/// of re-running the closure.
pub fn effect_with_scheduler<F, S>(f: F, scheduler: S) -> Effect
where
    F: Fn() + Send + Sync + 'static,
    S: Fn() + Send + Sync + 'static,
{
    Effect::with_scheduler(
        move || {
            f();
            Value::Null
        },
        scheduler,
    )
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
