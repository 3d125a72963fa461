//! Derivations: lazily recomputed, memoized readers over other reactive
//! state. A derivation owns an [`EffectCore`] that recomputes its value,
//! but that effect never runs eagerly on its own — it only ever announces
//! a `MaybeDirty` on the derivation's own `Dep`, leaving the actual
//! recomputation to whichever reader next pulls the value.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::dep::{track, trigger, DerivationLike};
use crate::dirty::DirtyLevel;
use crate::effect::{is_dirty, EffectCore};
use crate::utils::is_same_value;

struct DerivationState<T> {
    value: RefCell<Option<T>>,
    changed_last_run: Cell<bool>,
}

/// Glue object shared between the `EffectCore`'s closure (via a weak
/// handle, to avoid an ownership cycle) and the `Dep`'s `owner` backref
/// (via a strong `Rc<dyn DerivationLike>`), so that resolving a
/// `MaybeDirty` subscriber can ask this derivation to bring itself up to
/// date without knowing its value type.
struct DerivationRuntime<T> {
    effect: Rc<EffectCore>,
    state: Rc<DerivationState<T>>,
    own_dep: Rc<crate::dep::Dep>,
}

impl<T> DerivationLike for DerivationRuntime<T> {
    fn ensure_updated(&self) {
        if is_dirty(&self.effect) {
            self.effect.run();
            if self.state.changed_last_run.get() {
                trigger(&self.own_dep, DirtyLevel::Dirty);
            }
        }
    }
}

/// A lazily-computed, memoized, reactive value. Cloning a `Derived` clones
/// the handle, not the computation: all clones share one cache and one
/// `Dep`.
pub struct Derived<T: 'static> {
    runtime: Rc<DerivationRuntime<T>>,
    setter: Option<Rc<RefCell<dyn FnMut(T)>>>,
}

impl<T: 'static> Clone for Derived<T> {
    fn clone(&self) -> Self {
        Derived { runtime: self.runtime.clone(), setter: self.setter.clone() }
    }
}

impl<T: PartialEq + Clone + 'static> Derived<T> {
    fn new(
        mut getter: impl FnMut() -> T + 'static,
        setter: Option<Rc<RefCell<dyn FnMut(T)>>>,
    ) -> Self {
        let state = Rc::new(DerivationState { value: RefCell::new(None), changed_last_run: Cell::new(false) });
        let own_dep = crate::dep::Dep::new();

        let state_for_run = state.clone();
        let run_fn = move || {
            let new_value = getter();
            let changed = match state_for_run.value.borrow().as_ref() {
                None => true,
                Some(old) => !is_same_value(old, &new_value),
            };
            *state_for_run.value.borrow_mut() = Some(new_value);
            state_for_run.changed_last_run.set(changed);
        };

        let effect = EffectCore::new_derivation(Box::new(run_fn), own_dep.clone());
        own_dep.set_owner(Rc::new(DerivationRuntime {
            effect: effect.clone(),
            state: state.clone(),
            own_dep: own_dep.clone(),
        }) as Rc<dyn DerivationLike>);

        let runtime = Rc::new(DerivationRuntime { effect, state, own_dep });
        Derived { runtime, setter }
    }


    /// Reads the memoized value, recomputing first if it might be stale.
    /// Recording a dependency on *this* derivation happens unconditionally;
    /// if recomputation didn't fully resolve dirtiness (shouldn't normally
    /// happen, but mirrors the spec's defensive re-propagation), a further
    /// `MaybeDirty` is re-emitted so a caller higher up the chain notices.
    pub fn get(&self) -> T {
        self.runtime.ensure_updated();
        track(&self.runtime.own_dep);
        if self.runtime.effect.dirty_level() >= DirtyLevel::MaybeDirty {
            trigger(&self.runtime.own_dep, DirtyLevel::MaybeDirty);
        }
        self.runtime
            .state
            .value
            .borrow()
            .clone()
            .expect("derivation value not computed after ensure_updated")
    }

    /// Writes through the setter supplied to [`derived_writable`]. Emits a
    /// dev-mode warning and performs no write on a read-only derivation.
    pub fn set(&self, value: T) {
        match &self.setter {
            Some(setter) => (setter.borrow_mut())(value),
            None => crate::utils::reactive_warn!(
                target: "reactive_core",
                "attempted to write to a read-only derivation"
            ),
        }
    }

    pub fn is_readonly(&self) -> bool {
        self.setter.is_none()
    }
}

/// Creates a read-only derivation from `getter`.
#[cfg_attr(debug_assertions, track_caller)]
pub fn derived<T: PartialEq + Clone + 'static>(getter: impl FnMut() -> T + 'static) -> Derived<T> {
    Derived::new(getter, None)
}

/// Creates a writable derivation from a getter/setter pair. `setter` is
/// only ever invoked through [`Derived::set`]; it is the caller's
/// responsibility to have it write into whatever reactive state `getter`
/// reads back out of, the same contract Vue's writable `computed` has.
pub fn derived_writable<T: PartialEq + Clone + 'static>(
    getter: impl FnMut() -> T + 'static,
    setter: impl FnMut(T) + 'static,
) -> Derived<T> {
    Derived::new(getter, Some(Rc::new(RefCell::new(setter))))
}

/// Temporarily disables dependency tracking while running `f`, restoring
/// the previous tracking state afterward. Reads inside `f` will not
/// subscribe the currently running effect/derivation to anything.
pub fn untrack<R>(f: impl FnOnce() -> R) -> R {
    crate::context::pause_tracking();
    let result = f();
    crate::context::reset_tracking();
    result
}
