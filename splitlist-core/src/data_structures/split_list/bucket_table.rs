//! Bucket index to sentinel mapping.
//!
//! A table owns every sentinel it hands out, published or not, and frees
//! them all when dropped. Publishing is a plain store: the race for a bucket
//! is decided earlier, by linking the sentinel into the ordered list.

use std::ptr::NonNull;

use crossbeam::queue::SegQueue;

#[cfg(debug_assertions)]
use std::collections::HashSet;
#[cfg(debug_assertions)]
use std::sync::Mutex;

use crate::data_structures::ordered::SplitNode;

pub trait BucketTable<N: SplitNode>: Send + Sync {
    /// Size the table for about `item_count` items at `load_factor` items per
    /// bucket, never exceeding `max_buckets` buckets.
    fn with_capacity(item_count: usize, load_factor: usize, max_buckets: usize) -> Self
    where
        Self: Sized;

    /// The published sentinel of `index`, if any.
    fn bucket(&self, index: usize) -> Option<NonNull<N>>;

    /// Make `sentinel` visible as the head of `index`.
    ///
    /// The caller must have linked `sentinel` into the list first. Each index
    /// is published at most once.
    fn publish(&self, index: usize, sentinel: NonNull<N>);

    /// An unlinked sentinel keyed `split_key`, or `None` if the table is out
    /// of sentinels for now.
    fn alloc_sentinel(&self, split_key: usize) -> Option<NonNull<N>>;

    /// Take back a sentinel that lost the race to be linked.
    ///
    /// # Safety
    /// `sentinel` must come from `alloc_sentinel` of this table and must never
    /// have been linked.
    unsafe fn free_sentinel(&self, sentinel: NonNull<N>);

    /// Number of bucket slots; the logical bucket count never exceeds it.
    fn capacity(&self) -> usize;

    fn load_factor(&self) -> usize;
}

// Pointers inside the queue are plain addresses of sentinels owned by the
// table; only the table dereferences them.
struct Parked<N>(NonNull<N>);

unsafe impl<N: Send> Send for Parked<N> {}

/// Lock-free pool of sentinels that lost an initialization race.
///
/// Debug builds track parked addresses: a sentinel may not be parked twice,
/// and a sentinel handed out must have been parked.
pub(crate) struct SentinelPool<N> {
    free: SegQueue<Parked<N>>,
    #[cfg(debug_assertions)]
    parked: Mutex<HashSet<usize>>,
}

impl<N: SplitNode> SentinelPool<N> {
    pub(crate) fn new() -> Self {
        SentinelPool {
            free: SegQueue::new(),
            #[cfg(debug_assertions)]
            parked: Mutex::new(HashSet::new()),
        }
    }

    pub(crate) fn park(&self, sentinel: NonNull<N>) {
        #[cfg(debug_assertions)]
        {
            let addr = sentinel.as_ptr() as usize;
            let mut parked = self.parked.lock().unwrap_or_else(|e| e.into_inner());
            assert!(parked.insert(addr), "sentinel {addr:#x} parked twice");
        }
        self.free.push(Parked(sentinel));
    }

    /// A parked sentinel re-keyed to `split_key`.
    pub(crate) fn take(&self, split_key: usize) -> Option<NonNull<N>> {
        let Parked(mut sentinel) = self.free.pop()?;

        #[cfg(debug_assertions)]
        {
            let addr = sentinel.as_ptr() as usize;
            let mut parked = self.parked.lock().unwrap_or_else(|e| e.into_inner());
            assert!(parked.remove(&addr), "sentinel {addr:#x} taken while busy");
        }

        // Unlinked and now exclusively ours.
        unsafe { sentinel.as_mut().reset_dummy(split_key) };
        Some(sentinel)
    }
}

impl<N> SentinelPool<N> {
    pub(crate) fn len(&self) -> usize {
        self.free.len()
    }

    /// Empty the pool, yielding every parked sentinel.
    pub(crate) fn drain(&mut self) -> impl Iterator<Item = NonNull<N>> + '_ {
        std::iter::from_fn(move || self.free.pop().map(|Parked(sentinel)| sentinel))
    }
}
