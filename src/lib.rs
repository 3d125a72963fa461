//! A fine-grained, pull-based reactivity engine.
//!
//! Signals hold values; derivations lazily recompute from other reactive
//! state and memoize the result; effects re-run side effects when the
//! state they read changes; scopes own the effects/derivations/cleanups
//! created while they are active so they can be torn down together.
//! [`proxy`] extends signals to whole aggregates (maps, sequences, sets) so
//! individual keys/indices/members can be tracked independently rather than
//! the aggregate as one opaque blob.
//!
//! The whole graph is single-threaded: every ambient piece of state
//! (currently running effect, whether tracking is enabled, the active
//! scope, the scheduler's pause depth) lives in one thread-local context,
//! and the graph itself is built from `Rc`/`RefCell`, not locks.
//!
//! ```
//! # use reactive_core::*;
//! let (_, root) = reactive_root(|| {
//!     let count = signal(0);
//!     let doubled = {
//!         let count = count.clone();
//!         derived(move || count.get() * 2)
//!     };
//!     assert_eq!(doubled.get(), 0);
//!     count.set(21);
//!     assert_eq!(doubled.get(), 42);
//! });
//! root.dispose();
//! ```

mod context;
mod dep;
mod derived;
mod dirty;
mod effect;
mod proxy;
mod scope;
mod signal;
mod utils;

pub use context::{batch, enable_tracking, pause_scheduling, pause_tracking, reset_scheduling, reset_tracking};
pub use derived::{derived, derived_writable, untrack, Derived};
pub use dirty::DirtyLevel;
pub use effect::{effect, stop, EffectOptions, EffectRunner};
pub use proxy::{
    is_proxy, is_reactive, is_readonly, is_shallow, mark_raw, project, project_all, reactive,
    readonly, readonly_map, readonly_set, readonly_vec, reactive_map, reactive_set, reactive_vec,
    shallow_reactive, shallow_reactive_map, shallow_reactive_vec, shallow_readonly,
    shallow_readonly_map, shallow_readonly_vec, IntoReactive, ReactiveHandle, ReactiveMap,
    ReactiveSet, ReactiveVec, ToRaw,
};
pub use scope::{current_scope, on_scope_dispose, reactive_root, RootHandle, Scope};
pub use signal::{
    custom_signal, from_getter, is_signal, shallow_signal, signal, to_value, trigger_signal,
    unwrap, GetterSignal, ReadSignal, Signal,
};
pub use utils::{DebugEvent, DebugEventKind};

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::collections::HashMap;
    use std::rc::Rc;

    /// Spec scenario: a derivation must not run its getter until first
    /// read, and must cache after that.
    #[test]
    fn scenario_lazy_compute() {
        let (_, root) = reactive_root(|| {
            let runs = Rc::new(Cell::new(0));
            let runs2 = runs.clone();
            let s = signal(1);
            let s2 = s.clone();
            let d = derived(move || {
                runs2.set(runs2.get() + 1);
                s2.get() * 2
            });
            assert_eq!(runs.get(), 0);
            assert_eq!(d.get(), 2);
            assert_eq!(runs.get(), 1);
            assert_eq!(d.get(), 2);
            assert_eq!(runs.get(), 1);
        });
        root.dispose();
    }

    /// Spec scenario: an effect's dependency list is rebuilt fresh every
    /// run, in read order, and stale deps from a prior run are dropped.
    #[test]
    fn scenario_dep_order_is_rebuilt_each_run() {
        let (_, root) = reactive_root(|| {
            let cond = signal(true);
            let a = signal(1);
            let b = signal(2);
            let runs = Rc::new(Cell::new(0));

            let cond2 = cond.clone();
            let a2 = a.clone();
            let b2 = b.clone();
            let runs2 = runs.clone();
            let _runner = effect(
                move || {
                    runs2.set(runs2.get() + 1);
                    if cond2.get() {
                        a2.track();
                    } else {
                        b2.track();
                    }
                },
                EffectOptions::default(),
            );
            assert_eq!(runs.get(), 1);
            a.set(10);
            assert_eq!(runs.get(), 2); // `a` was tracked
            b.set(20);
            assert_eq!(runs.get(), 2); // `b` was not tracked yet

            cond.set(false);
            assert_eq!(runs.get(), 3);
            a.set(11);
            assert_eq!(runs.get(), 3); // `a` no longer tracked
            b.set(21);
            assert_eq!(runs.get(), 4); // `b` now tracked
        });
        root.dispose();
    }

    /// Spec scenario: a derivation that reads and writes the same signal
    /// converges instead of looping forever.
    #[test]
    fn scenario_self_invalidating_chain_converges() {
        let (_, root) = reactive_root(|| {
            let s = signal(0);
            let s2 = s.clone();
            let runs = Rc::new(Cell::new(0));
            let runs2 = runs.clone();
            let _runner = effect(
                move || {
                    let current = s2.get();
                    runs2.set(runs2.get() + 1);
                    // Writing the same value straight back must not
                    // re-trigger: the deep equality check at the signal
                    // boundary is what keeps this from looping forever.
                    s2.set(current);
                },
                EffectOptions::default(),
            );
            assert_eq!(runs.get(), 1);
            s.set(1);
            assert_eq!(runs.get(), 2);
        });
        root.dispose();
    }

    /// Spec scenario: stopping a scope tears down every effect it owns.
    #[test]
    fn scenario_scope_teardown_stops_effects() {
        let s = signal(0);
        let runs = Rc::new(Cell::new(0));
        let (_, root) = reactive_root(|| {
            let s2 = s.clone();
            let runs2 = runs.clone();
            effect(
                move || {
                    s2.track();
                    runs2.set(runs2.get() + 1);
                },
                EffectOptions::default(),
            );
        });
        assert_eq!(runs.get(), 1);
        s.set(1);
        assert_eq!(runs.get(), 2);
        root.dispose();
        s.set(2);
        assert_eq!(runs.get(), 2);
    }

    /// Spec scenario: a detached child scope survives its parent's
    /// teardown and must be stopped independently.
    #[test]
    fn scenario_detached_child_scope_survives_parent() {
        let s = signal(0);
        let child_runs = Rc::new(Cell::new(0));
        let (child, parent) = reactive_root(|| {
            let detached = Scope::new(true);
            let s2 = s.clone();
            let child_runs2 = child_runs.clone();
            detached
                .run(|| {
                    effect(
                        move || {
                            s2.track();
                            child_runs2.set(child_runs2.get() + 1);
                        },
                        EffectOptions::default(),
                    );
                })
                .unwrap();
            detached
        });
        assert_eq!(child_runs.get(), 1);
        parent.dispose();
        s.set(1);
        assert_eq!(child_runs.get(), 2); // detached child is unaffected
        child.stop();
        s.set(2);
        assert_eq!(child_runs.get(), 2);
    }

    /// Spec scenario: a length-altering mutation on a reactive aggregate
    /// re-runs readers who iterated the whole collection, not just readers
    /// of one key.
    #[test]
    fn scenario_length_altering_mutation_reruns_iteration_readers() {
        let map = reactive_map(HashMap::<&'static str, i32>::new());
        let key_runs = Rc::new(Cell::new(0));
        let iter_runs = Rc::new(Cell::new(0));

        let map_key = map.clone();
        let key_runs2 = key_runs.clone();
        let _key_runner = effect(
            move || {
                map_key.get(&"a");
                key_runs2.set(key_runs2.get() + 1);
            },
            EffectOptions::default(),
        );

        let map_iter = map.clone();
        let iter_runs2 = iter_runs.clone();
        let _iter_runner = effect(
            move || {
                let _ = map_iter.len();
                iter_runs2.set(iter_runs2.get() + 1);
            },
            EffectOptions::default(),
        );

        assert_eq!(key_runs.get(), 1);
        assert_eq!(iter_runs.get(), 1);

        map.insert("b", 1); // unrelated key added: only iteration readers care
        assert_eq!(key_runs.get(), 1);
        assert_eq!(iter_runs.get(), 2);

        map.insert("a", 1); // this key: only that key's reader cares
        assert_eq!(key_runs.get(), 2);
        assert_eq!(iter_runs.get(), 2);
    }
}
