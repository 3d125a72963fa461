//! The three-valued staleness marker that drives dirty propagation.

/// How stale a reactive node's cached output might be.
///
/// Ordered so that `Clean < MaybeDirty < Dirty`; within one trigger pass a
/// subscriber's level may only rise, and it is reset to `Clean` at the start
/// of each run. See the module-level docs on [`crate::effect`] for how the
/// level is resolved lazily for derivations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DirtyLevel {
    /// The cached value (if any) is known to still be valid.
    Clean = 0,
    /// An upstream dependency changed, but whether *this* node's output
    /// actually changes is not yet known. Only derivations receive this
    /// level directly; plain signals always trigger at [`DirtyLevel::Dirty`].
    MaybeDirty = 1,
    /// The node (or one of its transitive dependencies, once resolved) is
    /// known to have a different value than last observed.
    Dirty = 2,
}

impl Default for DirtyLevel {
    fn default() -> Self {
        DirtyLevel::Clean
    }
}
