//! Effects: functions that re-run whenever a signal or derivation they read
//! changes, plus the lazy "is this subscriber actually dirty" resolution
//! that derivations hang off the same machinery.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::context::{enqueue_scheduled, is_scheduling_paused, with_context};
use crate::dep::Dep;
use crate::dirty::DirtyLevel;
use crate::scope::{current_scope, Scope};
use crate::utils::{reactive_trace, DebugEvent};

/// Stable identity for an effect, used as an `IndexMap` key inside `Dep`.
/// Two `EffectKey`s compare equal iff they were derived from the same
/// `Rc<EffectCore>` allocation.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct EffectKey(*const ());

pub(crate) enum ReactionKind {
    /// A plain effect: runs immediately when announced, unless a scheduler
    /// is supplied, in which case it is queued instead.
    Effect { scheduler: Option<Box<dyn Fn()>> },
    /// The effect backing a derivation: announcing it never runs user code
    /// directly; it only re-triggers the derivation's own `Dep` at
    /// `MaybeDirty`, letting pull-based reads resolve the real value lazily.
    Derivation { own_dep: Rc<Dep> },
}

pub(crate) struct EffectCore {
    run_fn: RefCell<Box<dyn FnMut()>>,
    kind: ReactionKind,
    deps: RefCell<Vec<Rc<Dep>>>,
    deps_len: Cell<usize>,
    track_id: Cell<u64>,
    runnings: Cell<u32>,
    should_schedule: Cell<bool>,
    dirty_level: Cell<DirtyLevel>,
    active: Cell<bool>,
    allow_recurse: Cell<bool>,
    on_stop: RefCell<Option<Box<dyn FnOnce()>>>,
    on_track: RefCell<Option<Box<dyn Fn(DebugEvent)>>>,
    on_trigger: RefCell<Option<Box<dyn Fn(DebugEvent)>>>,
}

impl EffectCore {
    /// Builds the effect backing a derivation: `run_fn` is the
    /// derivation's own recompute closure, and announcing this effect only
    /// ever re-triggers `own_dep` at `MaybeDirty` rather than running
    /// anything eagerly.
    pub(crate) fn new_derivation(run_fn: Box<dyn FnMut()>, own_dep: Rc<Dep>) -> Rc<EffectCore> {
        Rc::new(EffectCore {
            run_fn: RefCell::new(run_fn),
            kind: ReactionKind::Derivation { own_dep },
            deps: RefCell::new(Vec::new()),
            deps_len: Cell::new(0),
            track_id: Cell::new(0),
            runnings: Cell::new(0),
            should_schedule: Cell::new(false),
            dirty_level: Cell::new(DirtyLevel::Dirty),
            active: Cell::new(true),
            allow_recurse: Cell::new(false),
            on_stop: RefCell::new(None),
            on_track: RefCell::new(None),
            on_trigger: RefCell::new(None),
        })
    }

    pub(crate) fn key(self: &Rc<Self>) -> EffectKey {
        EffectKey(Rc::as_ptr(self) as *const ())
    }

    pub(crate) fn track_id(&self) -> u64 {
        self.track_id.get()
    }

    pub(crate) fn dirty_level(&self) -> DirtyLevel {
        self.dirty_level.get()
    }

    pub(crate) fn deps(&self) -> Vec<Rc<Dep>> {
        self.deps.borrow().clone()
    }

    pub(crate) fn record_dependency(self: &Rc<Self>, dep: &Rc<Dep>) {
        let idx = self.deps_len.get();
        let mut deps = self.deps.borrow_mut();
        if idx < deps.len() {
            let previous = std::mem::replace(&mut deps[idx], dep.clone());
            if !Rc::ptr_eq(&previous, dep) {
                previous.remove(self.key());
            }
        } else {
            deps.push(dep.clone());
        }
        self.deps_len.set(idx + 1);
    }

    pub(crate) fn notify_on_track(&self, event: DebugEvent) {
        if let Some(cb) = self.on_track.borrow().as_ref() {
            cb(event);
        }
    }

    /// Raises this effect's dirty level to at least `level`. If that is a
    /// transition away from `Clean`, announces the effect (runs it
    /// immediately, queues its scheduler, or re-triggers the owning
    /// derivation's own `Dep`), unless re-entrancy rules suppress
    /// announcing for now.
    pub(crate) fn raise_dirty_level(self: &Rc<Self>, level: DirtyLevel, event: impl FnOnce() -> DebugEvent) {
        if self.dirty_level.get() >= level {
            return;
        }
        let was_clean = self.dirty_level.get() == DirtyLevel::Clean;
        self.dirty_level.set(level);
        if !was_clean {
            return;
        }
        if let Some(cb) = self.on_trigger.borrow().as_ref() {
            cb(event());
        }
        let may_announce = self.runnings.get() == 0 || self.allow_recurse.get();
        if may_announce {
            self.should_schedule.set(true);
            self.announce();
        }
    }

    fn announce(self: &Rc<Self>) {
        match &self.kind {
            ReactionKind::Derivation { own_dep } => {
                crate::dep::trigger(own_dep, DirtyLevel::MaybeDirty);
            }
            ReactionKind::Effect { scheduler: Some(scheduler) } => {
                if is_scheduling_paused() {
                    enqueue_scheduled(self.clone());
                } else {
                    scheduler();
                }
            }
            ReactionKind::Effect { scheduler: None } => {
                self.run_if_still_dirty();
            }
        }
    }

    /// Called when popped off the scheduler FIFO, or right after an
    /// immediate announce: re-checks dirtiness (it may have resolved to
    /// clean in the meantime, e.g. a derivation settling back on its old
    /// value) before actually running.
    pub(crate) fn run_if_still_dirty(self: &Rc<Self>) {
        self.should_schedule.set(false);
        if self.active.get() && is_dirty(self) {
            self.run();
        }
    }

    pub(crate) fn run(self: &Rc<Self>) {
        self.dirty_level.set(DirtyLevel::Clean);
        if !self.active.get() {
            (self.run_fn.borrow_mut())();
            return;
        }
        self.runnings.set(self.runnings.get() + 1);
        self.track_id.set(self.track_id.get() + 1);
        self.deps_len.set(0);

        let prev_track = with_context(|ctx| ctx.should_track.get());
        let prev_effect = with_context(|ctx| ctx.active_effect.replace(Some(self.clone())));
        with_context(|ctx| ctx.should_track.set(true));

        (self.run_fn.borrow_mut())();

        with_context(|ctx| {
            *ctx.active_effect.borrow_mut() = prev_effect;
            ctx.should_track.set(prev_track);
        });

        let stale_start = self.deps_len.get();
        let stale: Vec<Rc<Dep>> = self.deps.borrow_mut().drain(stale_start..).collect();
        for dep in stale {
            dep.remove(self.key());
        }

        self.runnings.set(self.runnings.get() - 1);
    }

    pub(crate) fn stop(self: &Rc<Self>) {
        if !self.active.get() {
            return;
        }
        self.active.set(false);
        let key = self.key();
        for dep in self.deps.borrow_mut().drain(..) {
            dep.remove(key);
        }
        self.deps_len.set(0);
        if let Some(cb) = self.on_stop.borrow_mut().take() {
            cb();
        }
    }
}

/// Returns the effect currently running (i.e. whatever `track`/`trigger`
/// should attribute reads/writes to), if any.
pub(crate) fn current_effect() -> Option<Rc<EffectCore>> {
    with_context(|ctx| ctx.active_effect.borrow().clone())
}

pub(crate) fn should_track() -> bool {
    with_context(|ctx| ctx.should_track.get())
}

/// Resolves a `MaybeDirty` effect by asking each dependency that is itself
/// owned by a derivation to make sure it is up to date; if any of those
/// recomputations raises this effect to `Dirty`, we can stop early.
/// Settles back to `Clean` if nothing upstream actually changed.
pub(crate) fn is_dirty(effect: &Rc<EffectCore>) -> bool {
    match effect.dirty_level.get() {
        DirtyLevel::Dirty => true,
        DirtyLevel::Clean => false,
        DirtyLevel::MaybeDirty => {
            for dep in effect.deps().iter() {
                if let Some(owner) = dep.owner() {
                    owner.ensure_updated();
                    if effect.dirty_level.get() == DirtyLevel::Dirty {
                        break;
                    }
                }
            }
            if effect.dirty_level.get() != DirtyLevel::Dirty {
                effect.dirty_level.set(DirtyLevel::Clean);
            }
            effect.dirty_level.get() == DirtyLevel::Dirty
        }
    }
}

/// Options accepted by [`effect`].
pub struct EffectOptions {
    /// When `true`, the effect is constructed but not run; the caller must
    /// call [`EffectRunner::run`] themselves to kick it off.
    pub lazy: bool,
    /// When present, announcing this effect enqueues `scheduler` on the
    /// global FIFO (or calls it straight away if scheduling isn't paused)
    /// instead of running the effect's body directly.
    pub scheduler: Option<Box<dyn Fn()>>,
    /// Scope to attach to; defaults to the ambient active scope.
    pub scope: Option<Scope>,
    /// Allows this effect to re-announce itself while already running.
    pub allow_recurse: bool,
    pub on_stop: Option<Box<dyn FnOnce()>>,
    pub on_track: Option<Box<dyn Fn(DebugEvent)>>,
    pub on_trigger: Option<Box<dyn Fn(DebugEvent)>>,
}

impl Default for EffectOptions {
    fn default() -> Self {
        EffectOptions {
            lazy: false,
            scheduler: None,
            scope: None,
            allow_recurse: false,
            on_stop: None,
            on_track: None,
            on_trigger: None,
        }
    }
}

/// A handle to a running (or stopped) effect. Dropping this handle does not
/// stop the effect — ownership lives in its scope — call [`stop`] for that.
#[derive(Clone)]
pub struct EffectRunner {
    pub(crate) core: Rc<EffectCore>,
}

impl EffectRunner {
    /// Forces an immediate (re-)run, bypassing dirty-level checks.
    pub fn run(&self) {
        self.core.run();
    }
}

/// Creates an effect that re-runs whenever a dependency it reads changes.
/// Unless `opts.lazy` is set, it runs once immediately to discover its
/// initial dependency set.
#[cfg_attr(debug_assertions, track_caller)]
pub fn effect(f: impl FnMut() + 'static, opts: EffectOptions) -> EffectRunner {
    let kind = ReactionKind::Effect { scheduler: opts.scheduler };
    let core = Rc::new(EffectCore {
        run_fn: RefCell::new(Box::new(f)),
        kind,
        deps: RefCell::new(Vec::new()),
        deps_len: Cell::new(0),
        track_id: Cell::new(0),
        runnings: Cell::new(0),
        should_schedule: Cell::new(false),
        dirty_level: Cell::new(DirtyLevel::Clean),
        active: Cell::new(true),
        allow_recurse: Cell::new(opts.allow_recurse),
        on_stop: RefCell::new(opts.on_stop),
        on_track: RefCell::new(opts.on_track),
        on_trigger: RefCell::new(opts.on_trigger),
    });

    let scope = opts.scope.or_else(current_scope);
    if let Some(scope) = &scope {
        scope.adopt_effect(core.clone());
    }

    reactive_trace!(target: "reactive_core", "effect created");
    if !opts.lazy {
        core.run();
    }
    EffectRunner { core }
}

/// Stops `runner`'s effect: it is detached from every dependency and will
/// never run again. Idempotent.
pub fn stop(runner: &EffectRunner) {
    runner.core.stop();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dep::{track, trigger};
    use std::cell::Cell as StdCell;

    #[test]
    fn effect_runs_once_immediately() {
        let count = Rc::new(StdCell::new(0));
        let count2 = count.clone();
        let _runner = effect(move || count2.set(count2.get() + 1), EffectOptions::default());
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn effect_reruns_on_trigger() {
        let dep = Dep::new();
        let count = Rc::new(StdCell::new(0));
        let count2 = count.clone();
        let dep2 = dep.clone();
        let _runner = effect(
            move || {
                track(&dep2);
                count2.set(count2.get() + 1);
            },
            EffectOptions::default(),
        );
        assert_eq!(count.get(), 1);
        trigger(&dep, DirtyLevel::Dirty);
        assert_eq!(count.get(), 2);
    }

    #[test]
    fn lazy_effect_does_not_run_until_invoked() {
        let count = Rc::new(StdCell::new(0));
        let count2 = count.clone();
        let runner = effect(
            move || count2.set(count2.get() + 1),
            EffectOptions { lazy: true, ..Default::default() },
        );
        assert_eq!(count.get(), 0);
        runner.run();
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn stopped_effect_does_not_rerun() {
        let dep = Dep::new();
        let count = Rc::new(StdCell::new(0));
        let count2 = count.clone();
        let dep2 = dep.clone();
        let runner = effect(
            move || {
                track(&dep2);
                count2.set(count2.get() + 1);
            },
            EffectOptions::default(),
        );
        stop(&runner);
        trigger(&dep, DirtyLevel::Dirty);
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn scheduler_is_used_instead_of_immediate_run() {
        let dep = Dep::new();
        let scheduled = Rc::new(StdCell::new(0));
        let scheduled2 = scheduled.clone();
        let ran = Rc::new(StdCell::new(0));
        let ran2 = ran.clone();
        let dep2 = dep.clone();
        let _runner = effect(
            move || {
                track(&dep2);
                ran2.set(ran2.get() + 1);
            },
            EffectOptions {
                scheduler: Some(Box::new(move || scheduled2.set(scheduled2.get() + 1))),
                ..Default::default()
            },
        );
        assert_eq!(ran.get(), 1); // initial run always happens directly
        trigger(&dep, DirtyLevel::Dirty);
        assert_eq!(scheduled.get(), 1);
        assert_eq!(ran.get(), 1); // scheduler fired instead of an immediate re-run
    }
}
