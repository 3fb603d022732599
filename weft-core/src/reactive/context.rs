//! Reactive Context
//!
//! The reactive context tracks which computation is currently running.
//! This enables automatic dependency tracking: when an observed property
//! or slot is read, we can register the current computation as a
//! dependent.
//!
//! # Implementation
//!
//! We use a thread-local stack to track the currently executing
//! computation. When entering a reactive context (running an effect, a
//! computed getter, or a watch source), we push the effect onto the
//! stack. When the computation completes, we pop it.
//!
//! This design supports nested reactive contexts (e.g., an effect that
//! reads a computed slot, whose getter is itself an effect).
//!
//! Tracking can be paused with [`untracked`]. Pausing does not hide the
//! running computation from [`ReactiveContext::current`]; it only stops
//! new subscriptions from being recorded. Entering a context resets the
//! pause for the duration of that run, so an effect re-run started from
//! inside an `untracked` block still collects its dependencies.

use std::cell::{Cell, RefCell};

use super::effect::Effect;

/// The reactive context stack.
///
/// Each thread has its own stack to track which computation is running.
/// This thread-local approach avoids the need for synchronization in the
/// common case of single-threaded reactivity.
thread_local! {
    static CONTEXT_STACK: RefCell<Vec<Effect>> = RefCell::new(Vec::new());
}

/// Nesting depth of `untracked` blocks on this thread.
///
/// A depth instead of a flag so that nested `untracked` calls compose:
/// tracking resumes only when the outermost block exits.
thread_local! {
    static PAUSE_DEPTH: Cell<u32> = Cell::new(0);
}

/// Guard that pops the context when dropped.
///
/// This ensures the context stack is properly maintained even if
/// the computation panics.
pub(crate) struct ReactiveContext {
    effect_id: u64,
    prior_pause: u32,
}

impl ReactiveContext {
    /// Enter a new reactive context for the given effect.
    ///
    /// While this context is active, any observed reads will register
    /// the effect as a dependent. Any `untracked` pause in force on this
    /// thread is suspended until the returned guard is dropped.
    ///
    /// The context is automatically exited when the returned guard is dropped.
    pub(crate) fn enter(effect: Effect) -> Self {
        let effect_id = effect.id().raw();
        CONTEXT_STACK.with(|stack| {
            stack.borrow_mut().push(effect);
        });
        let prior_pause = PAUSE_DEPTH.with(|depth| depth.replace(0));

        Self {
            effect_id,
            prior_pause,
        }
    }

    /// Check if there is an active reactive context.
    pub(crate) fn is_active() -> bool {
        CONTEXT_STACK.with(|stack| !stack.borrow().is_empty())
    }

    /// Get the currently running effect, if any.
    ///
    /// This ignores any `untracked` pause: the computation is still
    /// running, it just isn't collecting subscriptions. Notification
    /// paths use this to avoid re-running the computation that caused
    /// the write.
    pub(crate) fn current() -> Option<Effect> {
        CONTEXT_STACK.with(|stack| stack.borrow().last().cloned())
    }
}

impl Drop for ReactiveContext {
    fn drop(&mut self) {
        PAUSE_DEPTH.with(|depth| depth.set(self.prior_pause));
        CONTEXT_STACK.with(|stack| {
            let popped = stack.borrow_mut().pop();

            // Verify we're popping the right context.
            // This helps catch bugs where contexts are mismatched.
            if let Some(effect) = popped {
                debug_assert_eq!(
                    effect.id().raw(),
                    self.effect_id,
                    "ReactiveContext mismatch: expected {:?}, got {:?}",
                    self.effect_id,
                    effect.id().raw()
                );
            }
        });
    }
}

/// Restores the pause depth when dropped, so a panicking closure inside
/// [`untracked`] does not leave tracking disabled.
struct PauseGuard;

impl PauseGuard {
    fn enter() -> Self {
        PAUSE_DEPTH.with(|depth| depth.set(depth.get() + 1));
        Self
    }
}

impl Drop for PauseGuard {
    fn drop(&mut self) {
        PAUSE_DEPTH.with(|depth| depth.set(depth.get().saturating_sub(1)));
    }
}

/// Check whether reads on this thread are currently being tracked.
///
/// True when a computation is running and tracking has not been paused
/// by [`untracked`]. Reads made while this is false do not subscribe
/// the running computation to anything.
pub fn is_tracking() -> bool {
    ReactiveContext::is_active() && PAUSE_DEPTH.with(|depth| depth.get()) == 0
}

/// Run a closure with dependency tracking paused.
///
/// Observed reads inside the closure return current values but do not
/// subscribe the running computation. Nested calls are fine; tracking
/// resumes when the outermost call returns.
pub fn untracked<R>(f: impl FnOnce() -> R) -> R {
    let _pause = PauseGuard::enter();
    f()
}
