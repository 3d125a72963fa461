//! Scopes: hierarchical ownership containers for effects, derivations and
//! cleanup callbacks, with O(1) detachment from their parent.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use crate::context::with_context;
use crate::effect::EffectCore;
use crate::utils::reactive_warn;

pub(crate) struct ScopeCore {
    active: Cell<bool>,
    effects: RefCell<Vec<Rc<EffectCore>>>,
    children: RefCell<Vec<Rc<ScopeCore>>>,
    cleanups: RefCell<Vec<Box<dyn FnOnce()>>>,
    parent: RefCell<Option<Weak<ScopeCore>>>,
    index_in_parent: Cell<Option<usize>>,
}

impl ScopeCore {
    fn adopt_child(self: &Rc<Self>, child: &Rc<ScopeCore>) {
        let mut children = self.children.borrow_mut();
        child.index_in_parent.set(Some(children.len()));
        *child.parent.borrow_mut() = Some(Rc::downgrade(self));
        children.push(child.clone());
    }

    /// Removes this scope from its parent's child list in O(1) via
    /// swap-remove, patching up the displaced sibling's recorded index.
    fn detach_from_parent(self: &Rc<Self>) {
        let Some(parent) = self.parent.borrow_mut().take().and_then(|w| w.upgrade()) else {
            return;
        };
        let Some(idx) = self.index_in_parent.take() else { return };
        let mut children = parent.children.borrow_mut();
        if idx >= children.len() {
            return;
        }
        children.swap_remove(idx);
        if idx < children.len() {
            children[idx].index_in_parent.set(Some(idx));
        }
    }

    pub(crate) fn adopt_effect(self: &Rc<Self>, effect: Rc<EffectCore>) {
        self.effects.borrow_mut().push(effect);
    }

    pub(crate) fn push_cleanup(self: &Rc<Self>, cleanup: Box<dyn FnOnce()>) {
        self.cleanups.borrow_mut().push(cleanup);
    }

    fn stop_inner(self: &Rc<Self>, detach: bool) {
        if !self.active.get() {
            return;
        }
        self.active.set(false);

        for effect in self.effects.borrow_mut().drain(..) {
            effect.stop();
        }
        for child in self.children.borrow_mut().drain(..) {
            child.stop_inner(false);
        }
        for cleanup in self.cleanups.borrow_mut().drain(..) {
            crate::context::pause_tracking();
            cleanup();
            crate::context::reset_tracking();
        }

        if detach {
            self.detach_from_parent();
        }
    }
}

/// A reactive ownership scope: runs a closure with itself installed as the
/// ambient active scope, so that every effect/derivation/child-scope
/// created inside is attached to it and torn down together when it stops.
#[derive(Clone)]
pub struct Scope {
    pub(crate) core: Rc<ScopeCore>,
}

impl Scope {
    fn new_raw() -> Rc<ScopeCore> {
        Rc::new(ScopeCore {
            active: Cell::new(true),
            effects: RefCell::new(Vec::new()),
            children: RefCell::new(Vec::new()),
            cleanups: RefCell::new(Vec::new()),
            parent: RefCell::new(None),
            index_in_parent: Cell::new(None),
        })
    }

    /// Creates a new scope. Unless `detached`, it is attached as a child of
    /// the ambient active scope (if any) and is torn down automatically
    /// when that parent stops.
    pub fn new(detached: bool) -> Scope {
        let core = Self::new_raw();
        if !detached {
            if let Some(parent) = current_scope() {
                parent.core.adopt_child(&core);
            }
        }
        Scope { core }
    }

    pub(crate) fn adopt_effect(&self, effect: Rc<EffectCore>) {
        self.core.adopt_effect(effect);
    }

    /// Runs `f` with this scope installed as the ambient active scope.
    /// Returns `None` without calling `f` if the scope has already been
    /// stopped.
    pub fn run<R>(&self, f: impl FnOnce() -> R) -> Option<R> {
        if !self.core.active.get() {
            reactive_warn!(target: "reactive_core", "scope.run called on a stopped scope");
            return None;
        }
        let prev = with_context(|ctx| ctx.active_scope.replace(Some(self.core.clone())));
        let result = f();
        with_context(|ctx| *ctx.active_scope.borrow_mut() = prev);
        Some(result)
    }

    /// Tears the scope down: stops every effect and child scope it owns,
    /// runs every registered cleanup (untracked), then detaches itself from
    /// its parent in O(1). Idempotent.
    pub fn stop(&self) {
        self.core.stop_inner(true);
    }

    pub fn is_active(&self) -> bool {
        self.core.active.get()
    }
}

/// Returns the currently active scope, if any.
pub fn current_scope() -> Option<Scope> {
    with_context(|ctx| ctx.active_scope.borrow().clone()).map(|core| Scope { core })
}

/// Registers `f` to run when the ambient active scope stops. Emits a
/// dev-mode warning and drops `f` if there is no active scope.
pub fn on_scope_dispose(f: impl FnOnce() + 'static) {
    match current_scope() {
        Some(scope) => scope.core.push_cleanup(Box::new(f)),
        None => reactive_warn!(target: "reactive_core", "on_scope_dispose called outside any scope"),
    }
}

/// A top-level, always-detached scope, analogous to the teacher's
/// `create_root`/`RootHandle`: a convenience for embedding hosts and tests
/// that want one disposable owner for a whole reactive subgraph.
pub struct RootHandle {
    scope: Scope,
}

impl RootHandle {
    pub fn dispose(&self) {
        self.scope.stop();
    }

    pub fn scope(&self) -> Scope {
        self.scope.clone()
    }
}

/// Runs `f` inside a brand new detached scope and returns a handle that can
/// later dispose of everything `f` created.
pub fn reactive_root<R>(f: impl FnOnce() -> R) -> (R, RootHandle) {
    let scope = Scope::new(true);
    let result = scope.run(f).expect("freshly created scope cannot be stopped yet");
    (result, RootHandle { scope })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dep::{track, trigger};
    use crate::dirty::DirtyLevel;
    use crate::effect::{effect, EffectOptions};
    use std::cell::Cell as StdCell;

    #[test]
    fn stopping_scope_stops_its_effects() {
        let dep = crate::dep::Dep::new();
        let count = Rc::new(StdCell::new(0));
        let (_, root) = reactive_root(|| {
            let count2 = count.clone();
            let dep2 = dep.clone();
            effect(
                move || {
                    track(&dep2);
                    count2.set(count2.get() + 1);
                },
                EffectOptions::default(),
            );
        });
        assert_eq!(count.get(), 1);
        trigger(&dep, DirtyLevel::Dirty);
        assert_eq!(count.get(), 2);
        root.dispose();
        trigger(&dep, DirtyLevel::Dirty);
        assert_eq!(count.get(), 2);
    }

    #[test]
    fn detached_child_scope_survives_parent_stop() {
        let (_, parent) = reactive_root(|| {});
        let child_ran = Rc::new(StdCell::new(false));
        let child_ran2 = child_ran.clone();
        let child = parent.scope().run(|| {
            let detached = Scope::new(true);
            detached.run(|| {
                on_scope_dispose(move || child_ran2.set(true));
            });
            detached
        }).unwrap();
        parent.dispose();
        assert!(!child_ran.get());
        child.stop();
        assert!(child_ran.get());
    }

    #[test]
    fn cleanup_runs_on_scope_stop() {
        let ran = Rc::new(StdCell::new(false));
        let ran2 = ran.clone();
        let (_, root) = reactive_root(|| {
            on_scope_dispose(move || ran2.set(true));
        });
        assert!(!ran.get());
        root.dispose();
        assert!(ran.get());
        root.dispose(); // idempotent
    }
}
