//! `Dep`: the ordered subscriber table attached to every signal cell,
//! derivation, and proxy-layer key.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use indexmap::IndexMap;

use crate::dirty::DirtyLevel;
use crate::effect::{current_effect, should_track, EffectCore, EffectKey};
use crate::utils::{reactive_trace, DebugEvent};

/// Implemented by derivations so that a `Dep` can ask its owning derivation
/// to resolve its own staleness without `Dep` needing to know the
/// derivation's value type.
pub(crate) trait DerivationLike {
    fn ensure_updated(&self);
}

struct Subscriber {
    effect: Weak<EffectCore>,
    /// The subscriber's `track_id` at the moment it subscribed. If the
    /// effect has since moved on to a new run without re-subscribing here,
    /// this entry is stale and is skipped (and eventually swept) rather
    /// than acted upon.
    epoch: u64,
}

/// An ordered set of effects (and derivations, which are effects
/// internally) that depend on one reactive value.
pub(crate) struct Dep {
    subscribers: RefCell<IndexMap<EffectKey, Subscriber>>,
    cleanup: RefCell<Option<Box<dyn FnMut()>>>,
    /// Set only for a derivation's own `Dep`; lets [`is_dirty`] resolve a
    /// `MaybeDirty` subscriber by asking the derivation to recompute.
    owner: RefCell<Option<Rc<dyn DerivationLike>>>,
    name: RefCell<Option<String>>,
}

impl Dep {
    pub fn new() -> Rc<Self> {
        Rc::new(Dep {
            subscribers: RefCell::new(IndexMap::new()),
            cleanup: RefCell::new(None),
            owner: RefCell::new(None),
            name: RefCell::new(None),
        })
    }

    pub fn with_cleanup(cleanup: impl FnMut() + 'static) -> Rc<Self> {
        let dep = Self::new();
        *dep.cleanup.borrow_mut() = Some(Box::new(cleanup));
        dep
    }

    pub fn set_owner(&self, owner: Rc<dyn DerivationLike>) {
        *self.owner.borrow_mut() = Some(owner);
    }

    pub fn set_name(&self, name: impl Into<String>) {
        *self.name.borrow_mut() = Some(name.into());
    }

    fn label(&self) -> String {
        self.name.borrow().clone().unwrap_or_else(|| "<anonymous>".into())
    }

    pub fn owner(&self) -> Option<Rc<dyn DerivationLike>> {
        self.owner.borrow().clone()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.borrow().is_empty()
    }

    /// Removes one subscriber by key, running the cleanup callback (if any)
    /// once the last subscriber is gone.
    pub fn remove(&self, key: EffectKey) {
        let became_empty = {
            let mut subs = self.subscribers.borrow_mut();
            subs.shift_remove(&key);
            subs.is_empty()
        };
        if became_empty {
            if let Some(cb) = self.cleanup.borrow_mut().as_mut() {
                cb();
            }
        }
    }

    fn contains_current_epoch(&self, key: EffectKey, epoch: u64) -> bool {
        self.subscribers
            .borrow()
            .get(&key)
            .map(|s| s.epoch == epoch)
            .unwrap_or(false)
    }

    fn insert(&self, key: EffectKey, effect: &Rc<EffectCore>, epoch: u64) {
        self.subscribers.borrow_mut().insert(
            key,
            Subscriber {
                effect: Rc::downgrade(effect),
                epoch,
            },
        );
    }

    /// Subscribers in insertion order, skipping entries whose weak handle
    /// has died or whose epoch is stale.
    fn live_subscribers(&self) -> Vec<Rc<EffectCore>> {
        self.subscribers
            .borrow()
            .iter()
            .filter_map(|(_, sub)| sub.effect.upgrade())
            .collect()
    }
}

/// Records the currently running effect (if any) as a subscriber of `dep`.
///
/// Reading the same dep twice within one run of the same effect is a no-op
/// the second time: the effect's `track_id` epoch is already present.
pub(crate) fn track(dep: &Rc<Dep>) {
    if !should_track() {
        return;
    }
    let Some(effect) = current_effect() else {
        return;
    };
    let key = effect.key();
    let epoch = effect.track_id();
    if dep.contains_current_epoch(key, epoch) {
        return;
    }
    dep.insert(key, &effect, epoch);
    effect.record_dependency(dep);
    reactive_trace!(target: "reactive_core", dep = %dep.label(), "track");
    effect.notify_on_track(DebugEvent {
        target: dep.label(),
        kind: crate::utils::DebugEventKind::Get,
    });
}

/// Raises every live subscriber of `dep` to at least `new_level`, announcing
/// (running or scheduling) each subscriber whose level actually transitions
/// away from `Clean`. See [`crate::effect`] for what "announcing" means for
/// a given effect.
pub(crate) fn trigger(dep: &Rc<Dep>, new_level: DirtyLevel) {
    reactive_trace!(target: "reactive_core", dep = %dep.label(), ?new_level, "trigger");
    for effect in dep.live_subscribers() {
        effect.raise_dirty_level(new_level, || DebugEvent {
            target: dep.label(),
            kind: crate::utils::DebugEventKind::Set,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effect::{effect, EffectOptions};
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn dep_dedupes_repeated_track_within_one_run() {
        let dep = Dep::new();
        let runs = Rc::new(Cell::new(0));
        let runs2 = runs.clone();
        let dep2 = dep.clone();
        let _runner = effect(
            move || {
                runs2.set(runs2.get() + 1);
                track(&dep2);
                track(&dep2);
            },
            EffectOptions::default(),
        );
        assert_eq!(dep.subscribers.borrow().len(), 1);
        trigger(&dep, DirtyLevel::Dirty);
        assert_eq!(runs.get(), 2);
    }

    #[test]
    fn dep_cleanup_runs_once_last_subscriber_drops() {
        let cleaned = Rc::new(Cell::new(false));
        let cleaned2 = cleaned.clone();
        let dep = Dep::with_cleanup(move || cleaned2.set(true));
        let dep2 = dep.clone();
        let runner = effect(move || track(&dep2), EffectOptions::default());
        assert!(!cleaned.get());
        crate::effect::stop(&runner);
        assert!(cleaned.get());
    }
}
