//! The proxy layer: reactive wrappers over aggregate types (maps,
//! sequences, sets).
//!
//! JavaScript's `Proxy` traps let Vue intercept arbitrary property access on
//! any object with one generic implementation. Rust has no analogous
//! dynamic interception mechanism, so per the design notes this is
//! expressed instead as a small, statically-typed variant set: one wrapper
//! type per aggregate shape (`ReactiveMap`/`ReactiveVec`/`ReactiveSet`),
//! each crossed with `{mutable, readonly} × {deep, shallow}` through a
//! per-handle `readonly` flag and a per-core `shallow` flag.

use std::cell::RefCell;
use std::collections::HashMap;
use std::hash::Hash;
use std::rc::Rc;

use crate::dep::{track, trigger, Dep};
use crate::dirty::DirtyLevel;
use crate::utils::is_same_value;

fn warn_readonly_write() {
    crate::utils::reactive_warn!(target: "reactive_core", "write attempted on a readonly reactive value");
}

// ---------------------------------------------------------------- ReactiveMap

struct MapCore<K, V> {
    data: RefCell<HashMap<K, V>>,
    key_deps: RefCell<HashMap<K, Rc<Dep>>>,
    iterate_dep: Rc<Dep>,
    shallow: bool,
}

impl<K: Hash + Eq + Clone, V> MapCore<K, V> {
    fn dep_for(&self, key: &K) -> Rc<Dep> {
        if let Some(dep) = self.key_deps.borrow().get(key) {
            return dep.clone();
        }
        let dep = Dep::new();
        self.key_deps.borrow_mut().insert(key.clone(), dep.clone());
        dep
    }
}

/// A reactive hash map. See the module docs for the `{mutable,readonly} ×
/// {deep,shallow}` variant scheme.
pub struct ReactiveMap<K, V> {
    core: Rc<MapCore<K, V>>,
    readonly: bool,
}

impl<K, V> Clone for ReactiveMap<K, V> {
    fn clone(&self) -> Self {
        ReactiveMap { core: self.core.clone(), readonly: self.readonly }
    }
}

impl<K: Hash + Eq + Clone + 'static, V: PartialEq + Clone + 'static> ReactiveMap<K, V> {
    fn from_data(data: HashMap<K, V>, shallow: bool, readonly: bool) -> Self {
        ReactiveMap {
            core: Rc::new(MapCore {
                data: RefCell::new(data),
                key_deps: RefCell::new(HashMap::new()),
                iterate_dep: Dep::new(),
                shallow,
            }),
            readonly,
        }
    }

    /// Reads the value for `key`, tracking a dependency specific to that
    /// key (not the whole map).
    pub fn get(&self, key: &K) -> Option<V> {
        track(&self.core.dep_for(key));
        self.core.data.borrow().get(key).cloned()
    }

    /// True if `key` is present, tracking the same per-key dependency
    /// [`ReactiveMap::get`] does.
    pub fn has(&self, key: &K) -> bool {
        track(&self.core.dep_for(key));
        self.core.data.borrow().contains_key(key)
    }

    /// Number of entries, tracking the iterate-dep (changes whenever keys
    /// are added or removed, but not on an in-place value update).
    pub fn len(&self) -> usize {
        track(&self.core.iterate_dep);
        self.core.data.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// A snapshot of the current keys, tracking the iterate-dep.
    pub fn keys(&self) -> Vec<K> {
        track(&self.core.iterate_dep);
        self.core.data.borrow().keys().cloned().collect()
    }

    /// Inserts or overwrites `key`. A brand new key triggers both that
    /// key's dep (`Add`) and the iterate-dep (membership changed); an
    /// overwrite whose value actually differs (always, if this map is
    /// shallow) triggers both that key's dep and the iterate-dep too (`Set`
    /// on a keyed container fans out to `ITERATE_KEY` the same as `Add`/
    /// `Delete`, since an iteration reader may render the changed value).
    pub fn insert(&self, key: K, value: V) {
        if self.readonly {
            warn_readonly_write();
            return;
        }
        let key_dep = self.core.dep_for(&key);
        let changed = {
            let mut data = self.core.data.borrow_mut();
            match data.get(&key) {
                None => {
                    data.insert(key.clone(), value);
                    true
                }
                Some(old) => {
                    let changed = self.core.shallow || !is_same_value(old, &value);
                    data.insert(key.clone(), value);
                    changed
                }
            }
        };
        if changed {
            trigger(&key_dep, DirtyLevel::Dirty);
            trigger(&self.core.iterate_dep, DirtyLevel::Dirty);
        }
    }

    /// Removes `key` if present, triggering both that key's dep and the
    /// iterate-dep.
    pub fn remove(&self, key: &K) -> Option<V> {
        if self.readonly {
            warn_readonly_write();
            return self.get(key);
        }
        let removed = self.core.data.borrow_mut().remove(key);
        if removed.is_some() {
            if let Some(dep) = self.core.key_deps.borrow().get(key) {
                trigger(dep, DirtyLevel::Dirty);
            }
            trigger(&self.core.iterate_dep, DirtyLevel::Dirty);
        }
        removed
    }

    /// Empties the map, triggering every existing key's dep plus the
    /// iterate-dep.
    pub fn clear(&self) {
        if self.readonly {
            warn_readonly_write();
            return;
        }
        let had_entries = !self.core.data.borrow().is_empty();
        self.core.data.borrow_mut().clear();
        if had_entries {
            for dep in self.core.key_deps.borrow().values() {
                trigger(dep, DirtyLevel::Dirty);
            }
            trigger(&self.core.iterate_dep, DirtyLevel::Dirty);
        }
    }
}

/// Creates a deep, mutable reactive map from an initial value.
pub fn reactive_map<K: Hash + Eq + Clone + 'static, V: PartialEq + Clone + 'static>(
    data: HashMap<K, V>,
) -> ReactiveMap<K, V> {
    ReactiveMap::from_data(data, false, false)
}

/// Creates a shallow, mutable reactive map: writes always trigger
/// subscribers without an equality check.
pub fn shallow_reactive_map<K: Hash + Eq + Clone + 'static, V: PartialEq + Clone + 'static>(
    data: HashMap<K, V>,
) -> ReactiveMap<K, V> {
    ReactiveMap::from_data(data, true, false)
}

/// Wraps `source` in a read-only view sharing the same underlying dep
/// tables: writes through this handle warn and no-op, but changes made
/// through `source` (or another writable handle to the same map) are still
/// observed.
pub fn readonly_map<K, V>(source: &ReactiveMap<K, V>) -> ReactiveMap<K, V> {
    ReactiveMap { core: source.core.clone(), readonly: true }
}

/// Creates a readonly view directly from plain data (no writable handle
/// ever exists).
pub fn shallow_readonly_map<K: Hash + Eq + Clone + 'static, V: PartialEq + Clone + 'static>(
    data: HashMap<K, V>,
) -> ReactiveMap<K, V> {
    ReactiveMap::from_data(data, true, true)
}

// ---------------------------------------------------------------- ReactiveVec

struct VecCore<T> {
    data: RefCell<Vec<T>>,
    index_deps: RefCell<HashMap<usize, Rc<Dep>>>,
    length_dep: Rc<Dep>,
    shallow: bool,
}

impl<T> VecCore<T> {
    fn dep_for(&self, index: usize) -> Rc<Dep> {
        if let Some(dep) = self.index_deps.borrow().get(&index) {
            return dep.clone();
        }
        let dep = Dep::new();
        self.index_deps.borrow_mut().insert(index, dep.clone());
        dep
    }
}

/// A reactive, growable sequence. Index reads/writes track/trigger a dep
/// specific to that index; any operation that changes the length
/// (`push`/`pop`/`insert`/`remove`) also triggers the shared length-dep, so
/// readers who iterated the whole sequence (rather than one index) still
/// re-run.
pub struct ReactiveVec<T> {
    core: Rc<VecCore<T>>,
    readonly: bool,
}

impl<T> Clone for ReactiveVec<T> {
    fn clone(&self) -> Self {
        ReactiveVec { core: self.core.clone(), readonly: self.readonly }
    }
}

impl<T: PartialEq + Clone + 'static> ReactiveVec<T> {
    fn from_data(data: Vec<T>, shallow: bool, readonly: bool) -> Self {
        ReactiveVec {
            core: Rc::new(VecCore {
                data: RefCell::new(data),
                index_deps: RefCell::new(HashMap::new()),
                length_dep: Dep::new(),
                shallow,
            }),
            readonly,
        }
    }

    pub fn get(&self, index: usize) -> Option<T> {
        track(&self.core.dep_for(index));
        self.core.data.borrow().get(index).cloned()
    }

    pub fn len(&self) -> usize {
        track(&self.core.length_dep);
        self.core.data.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// A snapshot of the whole sequence, tracking the length-dep. Does not
    /// track individual indices, matching the fan-out rule that a
    /// length-altering mutation (not a single `set`) is what iteration
    /// subscribers care about.
    pub fn to_vec(&self) -> Vec<T> {
        track(&self.core.length_dep);
        self.core.data.borrow().clone()
    }

    /// Overwrites the element at `index`. Triggers only that index's dep,
    /// and only if the value changed (unless shallow). Does not affect
    /// length, so the length-dep is untouched.
    pub fn set(&self, index: usize, value: T) {
        if self.readonly {
            warn_readonly_write();
            return;
        }
        let dep = self.core.dep_for(index);
        let changed = {
            let mut data = self.core.data.borrow_mut();
            match data.get(index) {
                None => false,
                Some(old) => {
                    let differs = self.core.shallow || !is_same_value(old, &value);
                    data[index] = value;
                    differs
                }
            }
        };
        if changed {
            trigger(&dep, DirtyLevel::Dirty);
        }
    }

    /// Appends an element, triggering the length-dep (and implicitly a
    /// fresh dep for the new index, which starts with no subscribers).
    pub fn push(&self, value: T) {
        if self.readonly {
            warn_readonly_write();
            return;
        }
        self.core.data.borrow_mut().push(value);
        trigger(&self.core.length_dep, DirtyLevel::Dirty);
    }

    /// Removes and returns the last element, if any, triggering the
    /// length-dep and that index's own dep.
    pub fn pop(&self) -> Option<T> {
        if self.readonly {
            warn_readonly_write();
            return self.core.data.borrow().last().cloned();
        }
        let popped = self.core.data.borrow_mut().pop();
        if popped.is_some() {
            let index = self.core.data.borrow().len();
            if let Some(dep) = self.core.index_deps.borrow().get(&index) {
                trigger(dep, DirtyLevel::Dirty);
            }
            trigger(&self.core.length_dep, DirtyLevel::Dirty);
        }
        popped
    }

    /// Removes the element at `index`, shifting every later element down
    /// one slot. Because every index from `index` onward now refers to a
    /// different value, this triggers each of their deps plus the
    /// length-dep, rather than trying to track which individual shifted
    /// index "really" changed.
    pub fn remove(&self, index: usize) -> T {
        if self.readonly {
            warn_readonly_write();
            return self.core.data.borrow()[index].clone();
        }
        let removed = self.core.data.borrow_mut().remove(index);
        let len_after = self.core.data.borrow().len();
        for i in index..=len_after {
            if let Some(dep) = self.core.index_deps.borrow().get(&i) {
                trigger(dep, DirtyLevel::Dirty);
            }
        }
        trigger(&self.core.length_dep, DirtyLevel::Dirty);
        removed
    }
}

pub fn reactive_vec<T: PartialEq + Clone + 'static>(data: Vec<T>) -> ReactiveVec<T> {
    ReactiveVec::from_data(data, false, false)
}

pub fn shallow_reactive_vec<T: PartialEq + Clone + 'static>(data: Vec<T>) -> ReactiveVec<T> {
    ReactiveVec::from_data(data, true, false)
}

pub fn readonly_vec<T>(source: &ReactiveVec<T>) -> ReactiveVec<T> {
    ReactiveVec { core: source.core.clone(), readonly: true }
}

pub fn shallow_readonly_vec<T: PartialEq + Clone + 'static>(data: Vec<T>) -> ReactiveVec<T> {
    ReactiveVec::from_data(data, true, true)
}

// ---------------------------------------------------------------- ReactiveSet

struct SetCore<T> {
    data: RefCell<std::collections::HashSet<T>>,
    member_deps: RefCell<HashMap<T, Rc<Dep>>>,
    iterate_dep: Rc<Dep>,
}

impl<T: Hash + Eq + Clone> SetCore<T> {
    fn dep_for(&self, value: &T) -> Rc<Dep> {
        if let Some(dep) = self.member_deps.borrow().get(value) {
            return dep.clone();
        }
        let dep = Dep::new();
        self.member_deps.borrow_mut().insert(value.clone(), dep.clone());
        dep
    }
}

/// A reactive hash set. `shallow` has no observable effect here (set
/// membership is already a same-value check by construction) but the flag
/// is kept for symmetry with the map/vec variants and the spec's naming.
pub struct ReactiveSet<T> {
    core: Rc<SetCore<T>>,
    readonly: bool,
}

impl<T> Clone for ReactiveSet<T> {
    fn clone(&self) -> Self {
        ReactiveSet { core: self.core.clone(), readonly: self.readonly }
    }
}

impl<T: Hash + Eq + Clone + 'static> ReactiveSet<T> {
    fn from_data(data: std::collections::HashSet<T>, readonly: bool) -> Self {
        ReactiveSet {
            core: Rc::new(SetCore {
                data: RefCell::new(data),
                member_deps: RefCell::new(HashMap::new()),
                iterate_dep: Dep::new(),
            }),
            readonly,
        }
    }

    pub fn has(&self, value: &T) -> bool {
        track(&self.core.dep_for(value));
        self.core.data.borrow().contains(value)
    }

    pub fn len(&self) -> usize {
        track(&self.core.iterate_dep);
        self.core.data.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn values(&self) -> Vec<T> {
        track(&self.core.iterate_dep);
        self.core.data.borrow().iter().cloned().collect()
    }

    /// Adds `value`. A no-op (no trigger) if already present, matching
    /// `HashSet::insert`'s own "did this change anything" semantics.
    pub fn add(&self, value: T) {
        if self.readonly {
            warn_readonly_write();
            return;
        }
        let inserted = self.core.data.borrow_mut().insert(value.clone());
        if inserted {
            trigger(&self.core.dep_for(&value), DirtyLevel::Dirty);
            trigger(&self.core.iterate_dep, DirtyLevel::Dirty);
        }
    }

    pub fn delete(&self, value: &T) -> bool {
        if self.readonly {
            warn_readonly_write();
            return self.core.data.borrow().contains(value);
        }
        let removed = self.core.data.borrow_mut().remove(value);
        if removed {
            if let Some(dep) = self.core.member_deps.borrow().get(value) {
                trigger(dep, DirtyLevel::Dirty);
            }
            trigger(&self.core.iterate_dep, DirtyLevel::Dirty);
        }
        removed
    }

    pub fn clear(&self) {
        if self.readonly {
            warn_readonly_write();
            return;
        }
        let had_entries = !self.core.data.borrow().is_empty();
        self.core.data.borrow_mut().clear();
        if had_entries {
            for dep in self.core.member_deps.borrow().values() {
                trigger(dep, DirtyLevel::Dirty);
            }
            trigger(&self.core.iterate_dep, DirtyLevel::Dirty);
        }
    }
}

pub fn reactive_set<T: Hash + Eq + Clone + 'static>(
    data: std::collections::HashSet<T>,
) -> ReactiveSet<T> {
    ReactiveSet::from_data(data, false)
}

pub fn readonly_set<T>(source: &ReactiveSet<T>) -> ReactiveSet<T> {
    ReactiveSet { core: source.core.clone(), readonly: true }
}

// --------------------------------------------------------- shared introspection

/// Implemented by every proxy-layer wrapper so `is_reactive`/`is_readonly`/
/// `is_shallow`/`is_proxy` can be written generically, matching the spec's
/// external interface. `mark_raw` has no distinct representation to guard
/// here since plain values never pass through one of these wrappers unless
/// the caller explicitly opts in — so it is a free function that is simply
/// the identity, documented below.
pub trait ReactiveHandle {
    fn is_readonly(&self) -> bool;
    fn is_shallow(&self) -> bool;
}

impl<K, V> ReactiveHandle for ReactiveMap<K, V> {
    fn is_readonly(&self) -> bool {
        self.readonly
    }
    fn is_shallow(&self) -> bool {
        self.core.shallow
    }
}

impl<T> ReactiveHandle for ReactiveVec<T> {
    fn is_readonly(&self) -> bool {
        self.readonly
    }
    fn is_shallow(&self) -> bool {
        self.core.shallow
    }
}

impl<T> ReactiveHandle for ReactiveSet<T> {
    fn is_readonly(&self) -> bool {
        self.readonly
    }
    fn is_shallow(&self) -> bool {
        false
    }
}

pub fn is_reactive(handle: &impl ReactiveHandle) -> bool {
    !handle.is_readonly()
}

pub fn is_readonly(handle: &impl ReactiveHandle) -> bool {
    handle.is_readonly()
}

pub fn is_shallow(handle: &impl ReactiveHandle) -> bool {
    handle.is_shallow()
}

pub fn is_proxy(_handle: &impl ReactiveHandle) -> bool {
    true
}

/// Returns `value` unchanged. Every one of this crate's proxy-layer types
/// is constructed explicitly (there is no implicit "is this an object"
/// auto-wrap the way Vue's `ref`/`reactive` have, since Rust has no runtime
/// type reflection to make that call) — so there is nothing for `mark_raw`
/// to opt a value *out* of; it exists purely for call-site parity with
/// code ported from the spec's originating system.
pub fn mark_raw<T>(value: T) -> T {
    value
}

/// Creates a deep, mutable reactive view from a plain `HashMap`/`Vec`/
/// `HashSet`. Dispatches on `T` via the [`IntoReactive`] trait below.
pub fn reactive<T: IntoReactive>(value: T) -> T::Handle {
    value.into_reactive(false, false)
}

pub fn shallow_reactive<T: IntoReactive>(value: T) -> T::Handle {
    value.into_reactive(true, false)
}

pub fn shallow_readonly<T: IntoReactive>(value: T) -> T::Handle {
    value.into_reactive(true, true)
}

/// Wraps an existing reactive handle in a readonly view sharing the same
/// underlying dep tables, dispatching on the handle's concrete type.
/// Mirrors Vue's `readonly()` applied to an already-reactive target.
pub trait AsReadonly {
    fn as_readonly(&self) -> Self;
}

impl<K, V> AsReadonly for ReactiveMap<K, V> {
    fn as_readonly(&self) -> Self {
        readonly_map(self)
    }
}

impl<T> AsReadonly for ReactiveVec<T> {
    fn as_readonly(&self) -> Self {
        readonly_vec(self)
    }
}

impl<T> AsReadonly for ReactiveSet<T> {
    fn as_readonly(&self) -> Self {
        readonly_set(self)
    }
}

pub fn readonly<T: AsReadonly>(handle: &T) -> T {
    handle.as_readonly()
}

/// Unwraps a proxy-layer handle back to a plain value, snapshotting its
/// current contents without tracking a dependency. Mirrors `toRaw`.
pub trait ToRaw {
    type Raw;
    fn to_raw(&self) -> Self::Raw;
}

impl<K: Hash + Eq + Clone + 'static, V: Clone + 'static> ToRaw for ReactiveMap<K, V> {
    type Raw = HashMap<K, V>;
    fn to_raw(&self) -> HashMap<K, V> {
        self.core.data.borrow().clone()
    }
}

impl<T: Clone + 'static> ToRaw for ReactiveVec<T> {
    type Raw = Vec<T>;
    fn to_raw(&self) -> Vec<T> {
        self.core.data.borrow().clone()
    }
}

impl<T: Hash + Eq + Clone + 'static> ToRaw for ReactiveSet<T> {
    type Raw = std::collections::HashSet<T>;
    fn to_raw(&self) -> std::collections::HashSet<T> {
        self.core.data.borrow().clone()
    }
}

/// Lets [`reactive`]/[`shallow_reactive`]/[`shallow_readonly`] dispatch on
/// the shape of a plain aggregate the way Vue's single `reactive()` trap
/// dispatches at runtime on `Map`/`Array`/`Set`/plain object.
pub trait IntoReactive {
    type Handle;
    fn into_reactive(self, shallow: bool, readonly: bool) -> Self::Handle;
}

impl<K: Hash + Eq + Clone + 'static, V: PartialEq + Clone + 'static> IntoReactive for HashMap<K, V> {
    type Handle = ReactiveMap<K, V>;
    fn into_reactive(self, shallow: bool, readonly: bool) -> ReactiveMap<K, V> {
        ReactiveMap::from_data(self, shallow, readonly)
    }
}

impl<T: PartialEq + Clone + 'static> IntoReactive for Vec<T> {
    type Handle = ReactiveVec<T>;
    fn into_reactive(self, shallow: bool, readonly: bool) -> ReactiveVec<T> {
        ReactiveVec::from_data(self, shallow, readonly)
    }
}

impl<T: Hash + Eq + Clone + 'static> IntoReactive for std::collections::HashSet<T> {
    type Handle = ReactiveSet<T>;
    fn into_reactive(self, _shallow: bool, readonly: bool) -> ReactiveSet<T> {
        ReactiveSet::from_data(self, readonly)
    }
}

// ------------------------------------------------------------- project(_all)

/// Projects one key of a reactive map out into its own signal-shaped
/// read/write handle, so a single field can be passed around without
/// carrying the whole map along. Mirrors the spec's `project`
/// (`objectPropertyRef`/`toRef`).
pub fn project<K: Hash + Eq + Clone + 'static, V: PartialEq + Clone + 'static>(
    map: &ReactiveMap<K, V>,
    key: K,
) -> (impl Fn() -> Option<V>, impl Fn(V)) {
    let map_for_get = map.clone();
    let key_for_get = key.clone();
    let map_for_set = map.clone();
    (
        move || map_for_get.get(&key_for_get),
        move |value| map_for_set.insert(key.clone(), value),
    )
}

/// Projects every current key of a reactive map into its own bound
/// getter/setter pair (reusing [`project`] per key), mirroring the spec's
/// `project_all` (`toRefs`). Each projection reads from and writes through
/// to the same map `project` would, so it stays two-way-bound rather than
/// freezing a snapshot. Keys added to the map later are not retroactively
/// included, matching `toRefs`'s own snapshot-of-keys-at-call-time contract.
pub fn project_all<K: Hash + Eq + Clone + 'static, V: PartialEq + Clone + 'static>(
    map: &ReactiveMap<K, V>,
) -> Vec<(K, (impl Fn() -> Option<V>, impl Fn(V)))> {
    map.keys()
        .into_iter()
        .map(|k| {
            let projection = project(map, k.clone());
            (k, projection)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effect::{effect, EffectOptions};
    use std::cell::Cell as StdCell;

    #[test]
    fn map_key_read_only_reruns_on_that_keys_write() {
        let mut initial = HashMap::new();
        initial.insert("a", 1);
        initial.insert("b", 2);
        let map = reactive_map(initial);
        let runs = Rc::new(StdCell::new(0));
        let runs2 = runs.clone();
        let map2 = map.clone();
        let _runner = effect(
            move || {
                map2.get(&"a");
                runs2.set(runs2.get() + 1);
            },
            EffectOptions::default(),
        );
        assert_eq!(runs.get(), 1);
        map.insert("b", 20); // different key, should not rerun
        assert_eq!(runs.get(), 1);
        map.insert("a", 10);
        assert_eq!(runs.get(), 2);
    }

    #[test]
    fn iterating_map_reruns_on_length_altering_mutation() {
        let map = reactive_map(HashMap::new());
        let runs = Rc::new(StdCell::new(0));
        let runs2 = runs.clone();
        let map2 = map.clone();
        let _runner = effect(
            move || {
                let _ = map2.len();
                runs2.set(runs2.get() + 1);
            },
            EffectOptions::default(),
        );
        assert_eq!(runs.get(), 1);
        map.insert("x", 1);
        assert_eq!(runs.get(), 2);
        map.insert("x", 1); // overwrite with the same value: no change, no trigger
        assert_eq!(runs.get(), 2);
        map.insert("x", 2); // overwrite with a different value still fans out to iterate_dep
        assert_eq!(runs.get(), 3);
        map.remove(&"x");
        assert_eq!(runs.get(), 4);
    }

    #[test]
    fn readonly_map_write_is_a_silent_no_op() {
        let map = reactive_map(HashMap::from([("a", 1)]));
        let view = readonly_map(&map);
        view.insert("a", 2);
        assert_eq!(view.get(&"a"), Some(1));
        assert!(is_readonly(&view));
        assert!(!is_readonly(&map));
    }

    #[test]
    fn vec_push_reruns_length_reader_but_not_unrelated_index_reader() {
        let vec = reactive_vec(vec![1, 2, 3]);
        let len_runs = Rc::new(StdCell::new(0));
        let len_runs2 = len_runs.clone();
        let vec2 = vec.clone();
        let _len_runner = effect(
            move || {
                let _ = vec2.len();
                len_runs2.set(len_runs2.get() + 1);
            },
            EffectOptions::default(),
        );
        let idx_runs = Rc::new(StdCell::new(0));
        let idx_runs2 = idx_runs.clone();
        let vec3 = vec.clone();
        let _idx_runner = effect(
            move || {
                vec3.get(0);
                idx_runs2.set(idx_runs2.get() + 1);
            },
            EffectOptions::default(),
        );

        assert_eq!(len_runs.get(), 1);
        assert_eq!(idx_runs.get(), 1);
        vec.push(4);
        assert_eq!(len_runs.get(), 2);
        assert_eq!(idx_runs.get(), 1); // index 0 untouched by a push
    }

    #[test]
    fn set_add_dedupes_and_triggers_membership() {
        let set = reactive_set(std::collections::HashSet::from([1, 2]));
        let runs = Rc::new(StdCell::new(0));
        let runs2 = runs.clone();
        let set2 = set.clone();
        let _runner = effect(
            move || {
                set2.has(&3);
                runs2.set(runs2.get() + 1);
            },
            EffectOptions::default(),
        );
        assert_eq!(runs.get(), 1);
        set.add(1); // already present, no-op
        assert_eq!(runs.get(), 1);
        set.add(3);
        assert_eq!(runs.get(), 2);
    }

    #[test]
    fn project_reads_and_writes_through_to_the_map() {
        let map = reactive_map(HashMap::from([("count", 1)]));
        let (get_count, set_count) = project(&map, "count");
        assert_eq!(get_count(), Some(1));
        set_count(5);
        assert_eq!(map.get(&"count"), Some(5));
    }

    #[test]
    fn project_all_projections_stay_bound_to_the_map() {
        let map = reactive_map(HashMap::from([("a", 1), ("b", 2)]));
        let mut projections = project_all(&map);
        assert_eq!(projections.len(), 2);
        projections.sort_by_key(|(k, _)| *k);
        let (_, (_, set_a)) = projections.remove(0);
        let (_, (get_b, _)) = projections.remove(0);

        // writing through a projection reaches the map...
        set_a(10);
        assert_eq!(map.get(&"a"), Some(10));

        // ...and a later map write is visible through the projection's getter.
        map.insert("b", 20);
        assert_eq!(get_b(), Some(20));
    }
}
