//! The single thread-local context bundling every piece of ambient state:
//! which effect is currently tracking, whether tracking is enabled, which
//! scope is currently active, and how deep the scheduler pause stack is.
//!
//! Bundling these into one struct (rather than several independent
//! thread-locals) means acquiring and restoring ambient state is always a
//! single scoped operation, matching the teacher's `Root`/`untrack`/
//! `tracked_scope` pattern rather than juggling several stacks by hand.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

use crate::effect::EffectCore;
use crate::scope::ScopeCore;

pub(crate) struct Context {
    pub(crate) active_effect: RefCell<Option<Rc<EffectCore>>>,
    pub(crate) should_track: Cell<bool>,
    tracking_stack: RefCell<Vec<bool>>,
    pub(crate) active_scope: RefCell<Option<Rc<ScopeCore>>>,
    pause_schedule_depth: Cell<u32>,
    pub(crate) scheduler_queue: RefCell<VecDeque<Rc<EffectCore>>>,
}

impl Context {
    fn new() -> Self {
        Context {
            active_effect: RefCell::new(None),
            should_track: Cell::new(true),
            tracking_stack: RefCell::new(Vec::new()),
            active_scope: RefCell::new(None),
            pause_schedule_depth: Cell::new(0),
            scheduler_queue: RefCell::new(VecDeque::new()),
        }
    }
}

thread_local! {
    static CONTEXT: Context = Context::new();
}

pub(crate) fn with_context<R>(f: impl FnOnce(&Context) -> R) -> R {
    CONTEXT.with(f)
}

/// Pushes the current tracking flag and disables tracking.
pub fn pause_tracking() {
    with_context(|ctx| {
        ctx.tracking_stack.borrow_mut().push(ctx.should_track.get());
        ctx.should_track.set(false);
    });
}

/// Pushes the current tracking flag and enables tracking.
pub fn enable_tracking() {
    with_context(|ctx| {
        ctx.tracking_stack.borrow_mut().push(ctx.should_track.get());
        ctx.should_track.set(true);
    });
}

/// Pops the tracking-flag stack, restoring whatever was pushed by the
/// matching `pause_tracking`/`enable_tracking`. An unmatched call (stack
/// already empty) is not an error: it resets to the default of "tracking
/// enabled", per the crate's silent-no-op error policy.
pub fn reset_tracking() {
    with_context(|ctx| {
        let restored = ctx.tracking_stack.borrow_mut().pop().unwrap_or(true);
        ctx.should_track.set(restored);
    });
}

/// Increments the scheduler pause depth; while non-zero, effects that would
/// otherwise run immediately are queued instead.
pub fn pause_scheduling() {
    with_context(|ctx| ctx.pause_schedule_depth.set(ctx.pause_schedule_depth.get() + 1));
}

/// Decrements the scheduler pause depth, draining the FIFO queue once it
/// reaches zero. An unmatched call is treated as already-zero rather than
/// underflowing or panicking.
pub fn reset_scheduling() {
    let reached_zero = with_context(|ctx| {
        let depth = ctx.pause_schedule_depth.get().saturating_sub(1);
        ctx.pause_schedule_depth.set(depth);
        depth == 0
    });
    if reached_zero {
        drain_scheduler();
    }
}

pub(crate) fn is_scheduling_paused() -> bool {
    with_context(|ctx| ctx.pause_schedule_depth.get() > 0)
}

pub(crate) fn enqueue_scheduled(effect: Rc<EffectCore>) {
    with_context(|ctx| ctx.scheduler_queue.borrow_mut().push_back(effect));
}

fn drain_scheduler() {
    loop {
        let next = with_context(|ctx| ctx.scheduler_queue.borrow_mut().pop_front());
        let Some(effect) = next else { break };
        effect.run_if_still_dirty();
    }
}

/// Runs `f` with writes batched: dependent effects with a scheduler are
/// queued and only drained once `f` returns, so each runs at most once even
/// if several of its dependencies changed inside `f`.
pub fn batch<R>(f: impl FnOnce() -> R) -> R {
    pause_scheduling();
    let result = f();
    reset_scheduling();
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracking_stack_restores_previous_value() {
        assert!(with_context(|c| c.should_track.get()));
        pause_tracking();
        assert!(!with_context(|c| c.should_track.get()));
        enable_tracking();
        assert!(with_context(|c| c.should_track.get()));
        reset_tracking();
        assert!(!with_context(|c| c.should_track.get()));
        reset_tracking();
        assert!(with_context(|c| c.should_track.get()));
    }

    #[test]
    fn reset_tracking_on_empty_stack_defaults_to_enabled() {
        reset_tracking();
        assert!(with_context(|c| c.should_track.get()));
    }
}
