//! Epoch-based guard using crossbeam-epoch.
//!
//! `EpochGuard` is stateless: retired list nodes and sentinels are handed
//! to the global epoch collector, and every operation on the set pins the
//! calling thread for its duration.
//!
//! ```text
//! SplitListSet<u64, HarrisList<u64, EpochGuard>>
//!     │
//!     └── nodes snipped by any thread are freed once every
//!         thread pinned at snip time has unpinned
//! ```

use crossbeam_epoch::{self as epoch, Guard as CrossbeamGuard};
use splitlist_core::guard::Guard;
use std::ops::Deref;

/// Epoch-based memory reclamation guard.
///
/// Zero-sized, so a set that stores it stays `Send + Sync`. Destruction is
/// batched by the global collector; [`Guard::force_dispose`] flushes the
/// calling thread's local bag when the owning set is dropped.
#[derive(Clone, Copy, Default, Debug)]
pub struct EpochGuard;

impl EpochGuard {
    pub fn new() -> Self {
        EpochGuard
    }
}

/// A reference kept alive by a pinned epoch.
///
/// Returned by `get` and `extract`. The item it points to cannot be
/// reclaimed until this handle is dropped, even if it has been removed from
/// the set in the meantime.
pub struct EpochRef<'a, T> {
    _guard: CrossbeamGuard,
    reference: &'a T,
}

impl<'a, T> EpochRef<'a, T> {
    /// # Safety
    ///
    /// `reference` must stay valid while `guard` is pinned.
    pub(crate) unsafe fn new(guard: CrossbeamGuard, reference: &'a T) -> Self {
        EpochRef {
            _guard: guard,
            reference,
        }
    }

    pub fn get(&self) -> &T {
        self.reference
    }
}

impl<T> Deref for EpochRef<'_, T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        self.reference
    }
}

impl<T: std::fmt::Display> std::fmt::Display for EpochRef<'_, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.reference)
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for EpochRef<'_, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "EpochRef({:?})", self.reference)
    }
}

// Not `Send`: the pinned guard must be dropped on the thread that pinned it.
unsafe impl<T: Sync> Sync for EpochRef<'_, T> {}

impl Guard for EpochGuard {
    type GuardedRef<'a, T: 'a> = EpochRef<'a, T>;

    type ReadGuard = CrossbeamGuard;

    fn pin() -> Self::ReadGuard {
        epoch::pin()
    }

    unsafe fn defer_destroy<N>(&self, node: *mut N, dealloc: unsafe fn(*mut N)) {
        // The caller is already pinned for the operation that unlinked the
        // node; this nested pin only reaches the thread-local bag.
        let guard = epoch::pin();
        let node = node as usize;
        unsafe {
            guard.defer_unchecked(move || {
                dealloc(node as *mut N);
            });
        }
    }

    unsafe fn make_ref<'a, T: 'a>(ptr: *const T) -> Self::GuardedRef<'a, T> {
        let guard = epoch::pin();
        unsafe { EpochRef::new(guard, &*ptr) }
    }

    fn force_dispose(&self) {
        epoch::pin().flush();
    }
}
