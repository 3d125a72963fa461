//! Signal cells: the base reactive primitive wrapping a single value.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::dep::{track, trigger, Dep};
use crate::dirty::DirtyLevel;
use crate::utils::is_same_value;

struct SignalCore<T> {
    value: RefCell<T>,
    dep: Rc<Dep>,
    /// Shallow signals skip the "does the new value actually differ"
    /// comparison and always trigger, matching `shallow_signal`'s contract
    /// of never looking inside the value it holds.
    shallow: bool,
}

/// A read-only view of a [`Signal`]. Every `Signal<T>` derefs to one of
/// these; kept as a separate type so APIs that should not be able to write
/// (e.g. a value handed out from a derivation) can say so in their
/// signature.
pub struct ReadSignal<T: 'static> {
    core: Rc<SignalCore<T>>,
}

impl<T: 'static> Clone for ReadSignal<T> {
    fn clone(&self) -> Self {
        ReadSignal { core: self.core.clone() }
    }
}

impl<T: PartialEq + 'static> ReadSignal<T> {
    /// Records a dependency on this signal without reading its value.
    pub fn track(&self) {
        track(&self.core.dep);
    }

    /// Reads the value, recording a dependency on the currently running
    /// effect or derivation, if any.
    pub fn get(&self) -> T
    where
        T: Clone,
    {
        self.track();
        self.get_untracked()
    }

    /// Reads the value without recording a dependency.
    pub fn get_untracked(&self) -> T
    where
        T: Clone,
    {
        self.core.value.borrow().clone()
    }

    /// Runs `f` against a borrow of the value, recording a dependency.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.track();
        f(&self.core.value.borrow())
    }

    /// Runs `f` against a borrow of the value without recording a
    /// dependency.
    pub fn with_untracked<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.core.value.borrow())
    }
}

/// A writable reactive cell. Reading inside an effect or derivation
/// subscribes it to future writes; writing triggers every subscriber whose
/// dependency set includes this signal.
pub struct Signal<T: 'static>(ReadSignal<T>);

impl<T: 'static> Clone for Signal<T> {
    fn clone(&self) -> Self {
        Signal(self.0.clone())
    }
}

impl<T: 'static> std::ops::Deref for Signal<T> {
    type Target = ReadSignal<T>;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<T: PartialEq + 'static> Signal<T> {
    fn new(value: T, shallow: bool) -> Self {
        Signal(ReadSignal {
            core: Rc::new(SignalCore {
                value: RefCell::new(value),
                dep: Dep::new(),
                shallow,
            }),
        })
    }

    /// Splits into a read-only handle and a setter closure, mirroring the
    /// teacher's `Signal::split`.
    pub fn split(&self) -> (ReadSignal<T>, impl Fn(T) + Clone)
    where
        T: Clone,
    {
        let read = self.0.clone();
        let write = self.clone();
        (read, move |v| write.set(v))
    }

    /// Overwrites the value and triggers subscribers if it actually
    /// changed (shallow signals always trigger).
    pub fn set(&self, value: T) {
        let changed = {
            let mut cell = self.0.core.value.borrow_mut();
            let differs = self.0.core.shallow || !is_same_value(&*cell, &value);
            *cell = value;
            differs
        };
        if changed {
            trigger(&self.0.core.dep, DirtyLevel::Dirty);
        }
    }

    /// Like [`Signal::set`] but never triggers subscribers, even if the
    /// value differs. Used to update state without re-running readers, the
    /// same escape hatch the teacher's `set_silent` provides.
    pub fn set_silent(&self, value: T) {
        *self.0.core.value.borrow_mut() = value;
    }

    /// Updates the value in place via `f`, triggering subscribers if it
    /// changed.
    pub fn update(&self, f: impl FnOnce(&mut T))
    where
        T: Clone,
    {
        let mut v = self.get_untracked();
        f(&mut v);
        self.set(v);
    }

    /// Forces a trigger of every subscriber without changing the stored
    /// value. Mirrors Vue's `triggerRef`: useful after a silent mutation
    /// (e.g. through [`Signal::set_silent`] or in-place interior mutation)
    /// that the equality check would otherwise miss.
    pub fn force_trigger(&self) {
        trigger(&self.0.core.dep, DirtyLevel::Dirty);
    }
}

impl<T: fmt::Debug> fmt::Debug for SignalCore<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signal").field("value", &self.value.borrow()).finish()
    }
}

#[cfg(feature = "serde")]
impl<T: serde::Serialize + PartialEq + Clone + 'static> serde::Serialize for Signal<T> {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.get_untracked().serialize(serializer)
    }
}

#[cfg(feature = "serde")]
impl<'de, T: serde::Deserialize<'de> + PartialEq + 'static> serde::Deserialize<'de> for Signal<T> {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        T::deserialize(deserializer).map(signal)
    }
}

/// Creates a deep signal: on write, the new value is compared against the
/// old one (NaN-aware) and subscribers only trigger if it actually
/// differs.
#[cfg_attr(debug_assertions, track_caller)]
pub fn signal<T: PartialEq + 'static>(value: T) -> Signal<T> {
    Signal::new(value, false)
}

/// Creates a shallow signal: writes always trigger subscribers regardless
/// of whether the new value compares equal to the old one. Useful when `T`
/// is expensive or meaningless to compare, or is itself a reactive
/// aggregate whose *identity* change (a whole new map/vec) should always
/// be observed even though its contents might coincidentally match.
pub fn shallow_signal<T: PartialEq + 'static>(value: T) -> Signal<T> {
    Signal::new(value, true)
}

/// Builds a signal-like read/write pair backed by a caller-supplied getter
/// and setter rather than a `SignalCore`'s own storage, for wrapping some
/// other piece of state (e.g. a field behind an FFI boundary) in reactivity.
/// The returned getter calls `get` and tracks a dependency on its own `Dep`;
/// the returned setter calls `set` and then triggers that same `Dep`,
/// unconditionally (there is no value on hand to compare against, since
/// storage is owned by the caller, not this cell). Mirrors the spec's
/// `custom_signal`/`customRef`.
pub fn custom_signal<T: 'static>(
    get: impl Fn() -> T + 'static,
    set: impl Fn(T) + 'static,
) -> (impl Fn() -> T, impl Fn(T)) {
    let dep = Dep::new();
    let dep_for_get = dep.clone();
    let getter = move || {
        track(&dep_for_get);
        get()
    };
    let setter = move |value: T| {
        set(value);
        trigger(&dep, DirtyLevel::Dirty);
    };
    (getter, setter)
}

/// True if `get`/`track`/`set` on this value would participate in the
/// reactivity graph. Always `true` for anything constructed via
/// [`signal`]/[`shallow_signal`]; provided for parity with the spec's
/// external interface.
pub fn is_signal<T: 'static>(_value: &ReadSignal<T>) -> bool {
    true
}

/// Forces a trigger of `signal`'s subscribers without changing its value.
/// Free-function form of [`Signal::force_trigger`], matching the spec's
/// `trigger_signal`.
pub fn trigger_signal<T: PartialEq + 'static>(signal: &Signal<T>) {
    signal.force_trigger();
}

/// A read-only value backed by a plain getter rather than its own storage:
/// every read just calls the getter again. Unlike [`derived`], this never
/// caches and has no `Dep` of its own — tracking happens transitively
/// through whatever reactive state the getter itself reads. Mirrors the
/// spec's `getter_ref`/`from_getter`.
pub struct GetterSignal<T> {
    getter: Rc<dyn Fn() -> T>,
}

impl<T> Clone for GetterSignal<T> {
    fn clone(&self) -> Self {
        GetterSignal { getter: self.getter.clone() }
    }
}

impl<T> GetterSignal<T> {
    pub fn get(&self) -> T {
        (self.getter)()
    }
}

/// Wraps a plain getter function as a read-only signal-shaped value.
pub fn from_getter<T: 'static>(getter: impl Fn() -> T + 'static) -> GetterSignal<T> {
    GetterSignal { getter: Rc::new(getter) }
}

/// Normalizes a signal-like value down to a plain value, the way Vue's
/// `unref`/`toValue` do. Rust's static typing means the three shapes Vue
/// dispatches on at runtime (plain value / ref / getter) are three
/// distinct, statically known types here; this covers the `ReadSignal`
/// case, the one actually ambiguous at a call site that's generic over
/// "something that might be reactive".
pub fn to_value<T: Clone + PartialEq + 'static>(signal: &ReadSignal<T>) -> T {
    signal.get()
}

/// Alias for [`to_value`] matching the spec's `unwrap` naming (Vue's
/// `unref`).
pub fn unwrap<T: Clone + PartialEq + 'static>(signal: &ReadSignal<T>) -> T {
    signal.get()
}
