//! Reactive Primitives
//!
//! This module implements the core reactive system: observed objects,
//! effects, computed slots, signals, and watch observers. These
//! primitives form the foundation of Weft's fine-grained reactivity.
//!
//! # Concepts
//!
//! ## Observed Objects
//!
//! An object is a keyed collection of values held in a central store
//! and addressed through lightweight [`ObjRef`] handles. Reading a
//! property through an observed handle inside a tracking context
//! registers that context as a dependent of the exact (object, key)
//! pair; writing a changed value through any observed handle notifies
//! the dependents of that pair and nobody else.
//!
//! ## Effects
//!
//! An [`Effect`] is a side-effecting computation that re-runs whenever
//! something it read changes. Its dependency set is rebuilt from
//! scratch on every run, so branches that stopped being read stop
//! re-running it.
//!
//! ## Computed Slots
//!
//! A [`Computed`] is a derived value that caches its result. It
//! re-evaluates lazily, on the first read after a dependency changed,
//! and notifies its own readers at most once per transition from fresh
//! to stale.
//!
//! ## Signals
//!
//! A [`Signal`] is a standalone mutable cell for a single value. It is
//! the reactive wrapper for primitives, which have no object identity
//! of their own to observe.
//!
//! ## Watch Observers
//!
//! [`watch`] and [`watch_getter`] pair a tracked source with a
//! callback that receives the new and previous values, plus a hook for
//! cleanup between runs.
//!
//! # Implementation Notes
//!
//! The reactive system uses a thread-local tracking context to detect
//! dependencies automatically. When a property is read, we check for
//! an active tracking context and, if one exists, register the
//! dependency.
//!
//! This approach (sometimes called "automatic dependency tracking" or
//! "transparent reactivity") is used by SolidJS, Vue 3, and Leptos.

mod context;
mod graph;
mod effect;
mod store;
mod signal;
mod computed;
mod refs;
mod watch;

pub use context::{is_tracking, untracked};
pub use effect::{effect, effect_with_scheduler, Effect, EffectId};
pub use store::{is_reactive, list, object, object_count, reactive, ObjRef, ObjectId, Shape};
pub use signal::Signal;
pub use computed::Computed;
pub use refs::{proxy_refs, to_refs, FieldRef, ProxyRefs};
pub use watch::{watch, watch_getter, OnCleanup};
