use std::cell::UnsafeCell;
use std::ptr::{self, NonNull};
use std::sync::atomic::{AtomicPtr, AtomicUsize, Ordering};

use super::bucket_table::{BucketTable, SentinelPool};
use crate::data_structures::ordered::SplitNode;

#[cfg(feature = "logging")]
use log::trace;

/// Fixed bucket table with a preallocated sentinel arena.
///
/// Holds exactly one sentinel per bucket slot. Sentinels are handed out by
/// bumping a cursor, and sentinels that lose a race go back through the
/// pool. While every remaining sentinel is held by a thread still racing
/// for its bucket, `alloc_sentinel` has nothing to give and returns `None`.
///
pub struct StaticBucketTable<N> {
    slots: Box<[AtomicPtr<N>]>,
    arena: Box<[UnsafeCell<N>]>,
    cursor: AtomicUsize,
    load_factor: usize,
    pool: SentinelPool<N>,
}

// Arena cells are only written while handed out to a single thread.
unsafe impl<N: Send + Sync> Sync for StaticBucketTable<N> {}

/// Slot count for `item_count` items: the next power of two at or above
/// `item_count / load_factor`, within `2..=max_buckets`.
pub(crate) fn static_capacity(item_count: usize, load_factor: usize, max_buckets: usize) -> usize {
    let bucket_count = item_count / load_factor.max(1);
    let max_buckets = max_buckets.max(2);
    bucket_count
        .checked_next_power_of_two()
        .unwrap_or(max_buckets)
        .clamp(2, max_buckets)
}

impl<N: SplitNode> StaticBucketTable<N> {
    fn from_arena(&self, split_key: usize) -> Option<NonNull<N>> {
        let index = self
            .cursor
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |next| {
                (next < self.arena.len()).then_some(next + 1)
            })
            .ok()?;

        let cell = &self.arena[index];
        // The cursor gave this cell to us alone.
        unsafe { (*cell.get()).reset_dummy(split_key) };
        NonNull::new(cell.get())
    }

    /// Sentinels never handed out from the arena.
    pub fn untouched(&self) -> usize {
        self.arena
            .len()
            .saturating_sub(self.cursor.load(Ordering::Relaxed))
    }
}

impl<N: SplitNode> BucketTable<N> for StaticBucketTable<N> {
    fn with_capacity(item_count: usize, load_factor: usize, max_buckets: usize) -> Self {
        let capacity = static_capacity(item_count, load_factor, max_buckets);

        StaticBucketTable {
            slots: (0..capacity).map(|_| AtomicPtr::new(ptr::null_mut())).collect(),
            arena: (0..capacity).map(|_| UnsafeCell::new(N::dummy(0))).collect(),
            cursor: AtomicUsize::new(0),
            load_factor: load_factor.max(1),
            pool: SentinelPool::new(),
        }
    }

    fn bucket(&self, index: usize) -> Option<NonNull<N>> {
        debug_assert!(index < self.slots.len(), "bucket {index} beyond capacity");
        let slot = self.slots.get(index)?;
        NonNull::new(slot.load(Ordering::Acquire))
    }

    fn publish(&self, index: usize, sentinel: NonNull<N>) {
        let Some(slot) = self.slots.get(index) else {
            unreachable!("bucket {index} beyond capacity {}", self.slots.len());
        };
        debug_assert!(
            slot.load(Ordering::Relaxed).is_null(),
            "bucket {index} published twice"
        );
        slot.store(sentinel.as_ptr(), Ordering::Release);
    }

    fn alloc_sentinel(&self, split_key: usize) -> Option<NonNull<N>> {
        let sentinel = self
            .pool
            .take(split_key)
            .or_else(|| self.from_arena(split_key));

        #[cfg(feature = "logging")]
        if sentinel.is_none() {
            trace!("sentinel arena exhausted (capacity {})", self.slots.len());
        }

        sentinel
    }

    unsafe fn free_sentinel(&self, sentinel: NonNull<N>) {
        self.pool.park(sentinel);
    }

    fn capacity(&self) -> usize {
        self.slots.len()
    }

    fn load_factor(&self) -> usize {
        self.load_factor
    }
}
