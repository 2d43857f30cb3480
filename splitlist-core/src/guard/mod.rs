//! Guard trait for memory reclamation strategies.
//!
//! The split-list coordinator and its ordered list never free a node that
//! another thread may still be reading. Both delegate that decision to a
//! single `Guard` type, chosen once through the ordered list's associated
//! type:
//!
//! ```text
//! SplitListSet<T, L: OrderedList<T>>
//!     │
//!     └── L::Guard
//!           ├── HarrisList<T, EpochGuard>      (production)
//!           └── HarrisList<T, DeferredGuard>   (testing)
//! ```
//!
//! Because the coordinator never names a guard of its own, pairing it with
//! a list that reclaims nodes differently cannot be expressed.
//!
//! # Example
//!
//! ```rust,ignore
//! use splitlist_core::{HarrisList, SplitListSet};
//! use splitlist_crossbeam::EpochGuard;
//!
//! let set: SplitListSet<u64, HarrisList<u64, EpochGuard>> = SplitListSet::new();
//! set.insert(42);
//! ```

mod deferred_guard;

use std::ops::Deref;

pub use deferred_guard::{DeferredGuard, DeferredRef};

/// A memory reclamation guard that protects concurrent access to nodes.
///
/// - **EpochGuard**: Low overhead, batched reclamation (crossbeam-epoch)
/// - **DeferredGuard**: Simple, defers all destruction until guard drops (testing)
///
/// # Safety Contract
///
/// Implementations must ensure:
/// 1. Nodes passed to `defer_destroy` are not freed until it's safe
/// 2. `GuardedRef` keeps the referenced data valid for its lifetime
///
/// Guards are stored in collections and must be `Send + Sync`. The stored
/// guard only schedules destruction; thread pinning happens per operation.
///
pub trait Guard: Sized + Default + Send + Sync {
    /// A reference protected by a guard of this type (the guarded handle
    /// returned by `get` and `extract`).
    ///
    type GuardedRef<'a, T: 'a>: Deref<Target = T>;

    /// An active guard that protects reads for its lifetime.
    ///
    /// For epoch-based guards this holds a pinned `crossbeam_epoch::Guard`.
    /// For deferred guards it is `()`: the collection's stored guard already
    /// keeps every removed node alive.
    ///
    type ReadGuard: Sized;

    /// Pin an active read guard for the duration of one operation.
    ///
    fn pin() -> Self::ReadGuard;

    /// Schedule a node for deferred destruction.
    ///
    /// # Safety
    ///
    /// - `node` must be a valid pointer previously allocated by the collection
    /// - `node` must be unlinked from the collection (not reachable by traversal)
    /// - `dealloc` must be the correct deallocation function for `node`
    /// - a node must be scheduled at most once
    ///
    unsafe fn defer_destroy<N>(&self, node: *mut N, dealloc: unsafe fn(*mut N));

    /// Create a guarded reference from a raw pointer.
    ///
    /// # Safety
    ///
    /// - `ptr` must point to valid data protected by some guard
    /// - The data must remain valid for lifetime `'a`
    ///
    unsafe fn make_ref<'a, T: 'a>(ptr: *const T) -> Self::GuardedRef<'a, T>;

    /// Flush deferred reclamation.
    ///
    /// Called once by the owning container when it is dropped. The default
    /// does nothing.
    ///
    fn force_dispose(&self) {}
}
