use std::borrow::Borrow;
use std::cmp::Ordering;
use std::collections::hash_map::RandomState;
use std::fmt;
use std::hash::{BuildHasher, Hash};
use std::ptr::NonNull;
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};

use crossbeam::utils::{Backoff, CachePadded};

#[cfg(feature = "logging")]
use log::{debug, trace};

use super::bucket_table::BucketTable;
use super::expandable_table::DEFAULT_ITEM_COUNT;
use super::item_counter::{AssertCounting, ItemCounter};
use super::iter::Iter;
use super::policy::{DefaultPolicy, SplitListPolicy};
use super::split_order::{self, SplitOrder};
use super::stat::{SplitListStat, SplitListStats};
use crate::data_structures::ordered::{OrderedList, SplitNode};
use crate::guard::Guard;

/// Guarded handle returned by `get` and `extract`.
pub type GuardedRef<'a, T, L> = <<L as OrderedList<T>>::Guard as Guard>::GuardedRef<'a, T>;

/// Lock-free hash set after Shalev and Shavit's split-ordered lists.
///
/// All items live in one ordered list `L`, sorted by their bit-reversed
/// hash. The bucket table only stores shortcuts into that list: bucket `b`
/// points at a sentinel node placed where `b`'s items begin. Doubling the
/// bucket count never moves an item; new buckets are created on first use
/// by linking one more sentinel into the list, splitting the parent's run.
///
/// The reclamation strategy is the one of `L` (`L::Guard`), so the set and
/// its list always agree on it.
///
/// ```
/// use splitlist_core::{DeferredGuard, HarrisList, SplitListSet};
///
/// let set: SplitListSet<u64, HarrisList<u64, DeferredGuard>> = SplitListSet::new();
///
/// assert!(set.insert(7));
/// assert!(!set.insert(7));
/// assert!(set.contains(&7));
/// assert!(set.erase(&7));
/// assert!(set.is_empty());
/// ```
///
/// The resize policy needs a real item count; a policy with
/// `EmptyItemCounter` is rejected when the set is instantiated:
///
/// ```compile_fail
/// use std::collections::hash_map::RandomState;
/// use splitlist_core::{
///     DeferredGuard, DisabledStat, EmptyItemCounter, ExpandableBucketTable, HarrisList,
///     NativeSplitOrder, SplitListPolicy, SplitListSet, SplitNode,
/// };
///
/// struct Uncounted;
///
/// impl SplitListPolicy for Uncounted {
///     type Table<N: SplitNode> = ExpandableBucketTable<N>;
///     type ItemCounter = EmptyItemCounter;
///     type Stat = DisabledStat;
///     type Order = NativeSplitOrder;
/// }
///
/// let set = SplitListSet::<u64, HarrisList<u64, DeferredGuard>, RandomState, Uncounted>::
///     with_capacity_and_hasher(16, 1, RandomState::new());
/// ```
///
pub struct SplitListSet<T, L, S = RandomState, P = DefaultPolicy>
where
    T: Ord,
    L: OrderedList<T>,
    P: SplitListPolicy,
{
    list: L,
    buckets: P::Table<L::Node>,
    bucket_count_log2: CachePadded<AtomicUsize>,
    max_item_count: CachePadded<AtomicUsize>,
    item_counter: P::ItemCounter,
    stat: P::Stat,
    hash_builder: S,
}

impl<T, L> SplitListSet<T, L>
where
    T: Hash + Ord,
    L: OrderedList<T>,
{
    /// An empty set sized for the default item estimate at load factor 1.
    pub fn new() -> Self {
        Self::with_capacity_and_hasher(DEFAULT_ITEM_COUNT, 1, RandomState::new())
    }

    /// An empty set sized for about `item_count` items at `load_factor`
    /// items per bucket. A load factor of 0 is taken as 1.
    pub fn with_capacity(item_count: usize, load_factor: usize) -> Self {
        Self::with_capacity_and_hasher(item_count, load_factor, RandomState::new())
    }
}

impl<T, L, S> SplitListSet<T, L, S>
where
    T: Hash + Ord,
    L: OrderedList<T>,
    S: BuildHasher,
{
    pub fn with_hasher(hash_builder: S) -> Self {
        Self::with_capacity_and_hasher(DEFAULT_ITEM_COUNT, 1, hash_builder)
    }
}

impl<T, L, S, P> SplitListSet<T, L, S, P>
where
    T: Hash + Ord,
    L: OrderedList<T>,
    S: BuildHasher,
    P: SplitListPolicy,
{
    pub fn with_capacity_and_hasher(item_count: usize, load_factor: usize, hash_builder: S) -> Self {
        let () = AssertCounting::<P::ItemCounter>::OK;

        let load_factor = load_factor.max(1);
        let set = SplitListSet {
            list: L::default(),
            buckets: <P::Table<L::Node> as BucketTable<L::Node>>::with_capacity(
                item_count,
                load_factor,
                P::Order::max_buckets(),
            ),
            bucket_count_log2: CachePadded::new(AtomicUsize::new(1)),
            max_item_count: CachePadded::new(AtomicUsize::new(2 * load_factor)),
            item_counter: P::ItemCounter::default(),
            stat: P::Stat::default(),
            hash_builder,
        };
        set.init_root();
        set
    }

    fn init_root(&self) {
        let root = match self.buckets.alloc_sentinel(P::Order::dummy_key(0)) {
            Some(root) => root,
            None => unreachable!("a fresh bucket table always has a sentinel for bucket 0"),
        };
        self.stat.on_sentinel_allocated();

        let _pin = L::Guard::pin();
        let linked = unsafe { self.list.insert_aux_node(root) };
        debug_assert!(linked, "bucket 0 linked into a non-empty list");
        self.buckets.publish(0, root);
    }

    #[inline]
    fn hash_of<Q: Hash + ?Sized>(&self, key: &Q) -> usize {
        self.hash_builder.hash_one(key) as usize
    }

    // ========================================================================
    // Bucket resolution
    // ========================================================================

    /// Sentinel of the bucket `hash` currently maps to. Caller holds a pin.
    fn get_bucket(&self, hash: usize) -> NonNull<L::Node> {
        let log2 = self.bucket_count_log2.load(AtomicOrdering::Acquire);
        let bucket = split_order::bucket_no(hash, log2);
        match self.buckets.bucket(bucket) {
            Some(sentinel) => sentinel,
            None => self.init_bucket(bucket),
        }
    }

    // Parents first: a bucket's sentinel is linked searching from its
    // parent's sentinel, so the parent must exist. Depth is bounded by the
    // number of set bits in `bucket`.
    fn init_bucket(&self, bucket: usize) -> NonNull<L::Node> {
        debug_assert!(bucket != 0, "bucket 0 is created with the set");

        let parent_no = split_order::parent_bucket(bucket);
        let parent = match self.buckets.bucket(parent_no) {
            Some(parent) => parent,
            None => {
                self.stat.on_recursive_init_bucket();
                self.init_bucket(parent_no)
            }
        };

        let backoff = Backoff::new();
        let sentinel = loop {
            if let Some(published) = self.buckets.bucket(bucket) {
                return published;
            }
            match self.buckets.alloc_sentinel(P::Order::dummy_key(bucket)) {
                Some(sentinel) => break sentinel,
                None => {
                    #[cfg(feature = "logging")]
                    trace!("no sentinel for bucket {bucket}; backing off");
                    self.stat.on_sentinel_exhausted();
                    backoff.snooze();
                }
            }
        };
        self.stat.on_sentinel_allocated();

        if unsafe { self.list.insert_aux_node_at(parent, sentinel) } {
            self.buckets.publish(bucket, sentinel);
            self.stat.on_new_bucket();
            return sentinel;
        }

        // Another thread linked this bucket's sentinel and is about to
        // publish it.
        unsafe { self.buckets.free_sentinel(sentinel) };
        self.stat.on_sentinel_freed();
        self.stat.on_init_contention();
        #[cfg(feature = "logging")]
        trace!("lost the race for bucket {bucket}");

        self.wait_for_bucket(bucket)
    }

    fn wait_for_bucket(&self, bucket: usize) -> NonNull<L::Node> {
        let backoff = Backoff::new();
        loop {
            if let Some(sentinel) = self.buckets.bucket(bucket) {
                return sentinel;
            }
            self.stat.on_busy_wait();
            backoff.snooze();
        }
    }

    /// Sentinel address of the bucket `key` currently maps to.
    pub(crate) fn bucket_of<Q: Hash + ?Sized>(&self, key: &Q) -> usize {
        let _pin = L::Guard::pin();
        self.get_bucket(self.hash_of(key)).as_ptr() as usize
    }

    // ========================================================================
    // Resize policy
    // ========================================================================

    fn inc_item_count(&self) {
        self.item_counter.inc();

        let count = self.item_counter.get();
        let max = self.max_item_count.load(AtomicOrdering::Acquire);
        if count <= max {
            return;
        }

        let log2 = self.bucket_count_log2.load(AtomicOrdering::Acquire);
        let bucket_count = 1usize << log2;
        let load_factor = self.buckets.load_factor();

        if bucket_count < self.buckets.capacity() {
            // `max` was read before another thread doubled the table.
            if max < bucket_count.saturating_mul(load_factor) {
                return;
            }

            let doubled = bucket_count << 1;
            let _ = self.max_item_count.compare_exchange(
                max,
                doubled.saturating_mul(load_factor),
                AtomicOrdering::AcqRel,
                AtomicOrdering::Relaxed,
            );
            if self
                .bucket_count_log2
                .compare_exchange(log2, log2 + 1, AtomicOrdering::AcqRel, AtomicOrdering::Relaxed)
                .is_ok()
            {
                #[cfg(feature = "logging")]
                debug!("split list grew to {doubled} buckets at {count} items");
            }
        } else if self.max_item_count.swap(usize::MAX, AtomicOrdering::AcqRel) != usize::MAX {
            #[cfg(feature = "logging")]
            debug!("split list reached its bucket capacity of {bucket_count}");
        }
    }

    fn dec_item_count(&self) {
        self.item_counter.dec();
    }

    // ========================================================================
    // Insertion
    // ========================================================================

    /// Insert `item`. Returns `false` if an equal item is already present.
    pub fn insert(&self, item: T) -> bool {
        self.insert_with(item, |_| {})
    }

    /// Insert `item`, calling `on_inserted` with the stored item once it is
    /// linked and before any counter update.
    ///
    /// The item is already visible to other threads when `on_inserted` runs;
    /// anything it initializes must be synchronized by the item itself.
    pub fn insert_with<F>(&self, item: T, on_inserted: F) -> bool
    where
        F: FnOnce(&T),
    {
        let _pin = L::Guard::pin();
        let hash = self.hash_of(&item);
        let sentinel = self.get_bucket(hash);

        match unsafe {
            self.list
                .insert_at(sentinel, P::Order::regular_key(hash), item, on_inserted)
        } {
            Ok(()) => {
                self.inc_item_count();
                self.stat.on_insert_success();
                true
            }
            Err(_duplicate) => {
                self.stat.on_insert_failed();
                false
            }
        }
    }

    /// Insert `item`, or apply `f` to the equal item already stored.
    ///
    /// `f(is_new, stored, argument)`: on insert both references are the new
    /// item; otherwise `stored` is the existing item and `argument` is `item`,
    /// which is dropped afterwards. Without `allow_insert` a missing item is
    /// left missing and `f` is not called.
    ///
    /// Returns `(operation_ok, was_new)`.
    pub fn update<F>(&self, item: T, f: F, allow_insert: bool) -> (bool, bool)
    where
        F: FnOnce(bool, &T, &T),
    {
        let _pin = L::Guard::pin();
        let hash = self.hash_of(&item);
        let sentinel = self.get_bucket(hash);

        let result = unsafe {
            self.list
                .update_at(sentinel, P::Order::regular_key(hash), item, f, allow_insert)
        };
        match result {
            (true, true) => {
                self.inc_item_count();
                self.stat.on_update_new();
            }
            (true, false) => self.stat.on_update_existing(),
            _ => {}
        }
        result
    }

    /// Insert `item`, or atomically replace the equal item with it.
    ///
    /// Readers see either the old or the new item, never neither. Returns
    /// `(operation_ok, was_new)`.
    pub fn upsert(&self, item: T, allow_insert: bool) -> (bool, bool) {
        let _pin = L::Guard::pin();
        let hash = self.hash_of(&item);
        let sentinel = self.get_bucket(hash);

        let result = unsafe {
            self.list
                .upsert_at(sentinel, P::Order::regular_key(hash), item, allow_insert)
        };
        match result {
            (true, true) => {
                self.inc_item_count();
                self.stat.on_update_new();
            }
            (true, false) => self.stat.on_update_existing(),
            _ => {}
        }
        result
    }

    // ========================================================================
    // Removal
    // ========================================================================

    /// Remove `item` itself: only the stored item at this address counts, an
    /// equal copy does not.
    pub fn unlink(&self, item: &T) -> bool {
        let _pin = L::Guard::pin();
        let hash = self.hash_of(item);
        let sentinel = self.get_bucket(hash);

        if unsafe { self.list.unlink_at(sentinel, P::Order::regular_key(hash), item) } {
            self.dec_item_count();
            self.stat.on_erase_success();
            true
        } else {
            self.stat.on_erase_failed();
            false
        }
    }

    pub fn erase<Q>(&self, key: &Q) -> bool
    where
        T: Borrow<Q>,
        Q: Hash + Ord + ?Sized,
    {
        self.erase_with_and(key, |item: &T, key: &Q| item.borrow().cmp(key), |_| {})
    }

    /// Remove the item equal to `key`, calling `on_erased` on it.
    pub fn erase_and<Q, F>(&self, key: &Q, on_erased: F) -> bool
    where
        T: Borrow<Q>,
        Q: Hash + Ord + ?Sized,
        F: FnOnce(&T),
    {
        self.erase_with_and(key, |item: &T, key: &Q| item.borrow().cmp(key), on_erased)
    }

    /// Remove by `key` using `cmp` instead of `T: Ord`.
    ///
    /// `cmp` must order items exactly as `T: Ord` does, and `key` must hash
    /// like the item it designates.
    pub fn erase_with<Q, C>(&self, key: &Q, cmp: C) -> bool
    where
        Q: Hash + ?Sized,
        C: Fn(&T, &Q) -> Ordering,
    {
        self.erase_with_and(key, cmp, |_| {})
    }

    pub fn erase_with_and<Q, C, F>(&self, key: &Q, cmp: C, on_erased: F) -> bool
    where
        Q: Hash + ?Sized,
        C: Fn(&T, &Q) -> Ordering,
        F: FnOnce(&T),
    {
        let _pin = L::Guard::pin();
        let hash = self.hash_of(key);
        let sentinel = self.get_bucket(hash);

        let erased = unsafe {
            self.list.erase_at(
                sentinel,
                P::Order::regular_key(hash),
                |item: &T| cmp(item, key),
                on_erased,
            )
        };
        if erased {
            self.dec_item_count();
            self.stat.on_erase_success();
        } else {
            self.stat.on_erase_failed();
        }
        erased
    }

    /// Remove the item equal to `key` and return it behind a guard; it is
    /// reclaimed once the handle is dropped.
    pub fn extract<Q>(&self, key: &Q) -> Option<GuardedRef<'_, T, L>>
    where
        T: Borrow<Q>,
        Q: Hash + Ord + ?Sized,
    {
        self.extract_with(key, |item: &T, key: &Q| item.borrow().cmp(key))
    }

    pub fn extract_with<Q, C>(&self, key: &Q, cmp: C) -> Option<GuardedRef<'_, T, L>>
    where
        Q: Hash + ?Sized,
        C: Fn(&T, &Q) -> Ordering,
    {
        let _pin = L::Guard::pin();
        let hash = self.hash_of(key);
        let sentinel = self.get_bucket(hash);

        let extracted = unsafe {
            self.list
                .extract_at(sentinel, P::Order::regular_key(hash), |item: &T| cmp(item, key))
        };
        if extracted.is_some() {
            self.dec_item_count();
            self.stat.on_extract_success();
        } else {
            self.stat.on_extract_failed();
        }
        extracted
    }

    // ========================================================================
    // Lookup
    // ========================================================================

    /// Call `on_found` on the item equal to `key`.
    pub fn find<Q, F>(&self, key: &Q, on_found: F) -> bool
    where
        T: Borrow<Q>,
        Q: Hash + Ord + ?Sized,
        F: FnOnce(&T),
    {
        self.find_with(key, |item: &T, key: &Q| item.borrow().cmp(key), on_found)
    }

    pub fn find_with<Q, C, F>(&self, key: &Q, cmp: C, on_found: F) -> bool
    where
        Q: Hash + ?Sized,
        C: Fn(&T, &Q) -> Ordering,
        F: FnOnce(&T),
    {
        let _pin = L::Guard::pin();
        let hash = self.hash_of(key);
        let sentinel = self.get_bucket(hash);

        let found = unsafe {
            self.list.find_at(
                sentinel,
                P::Order::regular_key(hash),
                |item: &T| cmp(item, key),
                on_found,
            )
        };
        if found {
            self.stat.on_find_success();
        } else {
            self.stat.on_find_failed();
        }
        found
    }

    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        T: Borrow<Q>,
        Q: Hash + Ord + ?Sized,
    {
        self.find(key, |_| {})
    }

    pub fn contains_with<Q, C>(&self, key: &Q, cmp: C) -> bool
    where
        Q: Hash + ?Sized,
        C: Fn(&T, &Q) -> Ordering,
    {
        self.find_with(key, cmp, |_| {})
    }

    /// Guarded handle to the item equal to `key`. The item stays valid while
    /// the handle lives, even if it is removed meanwhile.
    pub fn get<Q>(&self, key: &Q) -> Option<GuardedRef<'_, T, L>>
    where
        T: Borrow<Q>,
        Q: Hash + Ord + ?Sized,
    {
        self.get_with(key, |item: &T, key: &Q| item.borrow().cmp(key))
    }

    pub fn get_with<Q, C>(&self, key: &Q, cmp: C) -> Option<GuardedRef<'_, T, L>>
    where
        Q: Hash + ?Sized,
        C: Fn(&T, &Q) -> Ordering,
    {
        let _pin = L::Guard::pin();
        let hash = self.hash_of(key);
        let sentinel = self.get_bucket(hash);

        let found = unsafe {
            self.list
                .get_at(sentinel, P::Order::regular_key(hash), |item: &T| cmp(item, key))
        };
        if found.is_some() {
            self.stat.on_find_success();
        } else {
            self.stat.on_find_failed();
        }
        found
    }

    // ========================================================================
    // Whole-set operations
    // ========================================================================

    /// Unlink every item. Not atomic: items inserted concurrently may
    /// survive.
    pub fn clear(&self) {
        self.clear_and(|_| {});
    }

    /// [`clear`](Self::clear), calling `on_unlinked` once for each item this
    /// call removed.
    pub fn clear_and<F>(&self, mut on_unlinked: F)
    where
        F: FnMut(&T),
    {
        let _pin = L::Guard::pin();
        let mut curr = unsafe { self.list.next_node(None) };

        while let Some(node) = curr {
            // Still readable after unlinking: we stay pinned.
            if let Some(item) = unsafe { node.as_ref() }.item() {
                if self.unlink(item) {
                    on_unlinked(item);
                }
            }
            curr = unsafe { self.list.next_node(Some(node)) };
        }
    }

    /// Clones of the items, in split order. Not a snapshot; meant for
    /// debugging and tests.
    pub fn iter(&self) -> Iter<'_, T, L>
    where
        T: Clone,
    {
        Iter::new(&self.list)
    }
}

// ============================================================================
// Observability
// ============================================================================

impl<T, L, S, P> SplitListSet<T, L, S, P>
where
    T: Ord,
    L: OrderedList<T>,
    P: SplitListPolicy,
{
    /// Approximate number of items; exact when no operation is in flight.
    pub fn size(&self) -> usize {
        self.item_counter.get()
    }

    pub fn len(&self) -> usize {
        self.size()
    }

    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// Current logical bucket count. Never decreases.
    pub fn bucket_count(&self) -> usize {
        1usize << self.bucket_count_log2.load(AtomicOrdering::Acquire)
    }

    /// Item count above which the next insert doubles the bucket count.
    /// Never decreases; `usize::MAX` once the table is at capacity.
    pub fn max_item_count(&self) -> usize {
        self.max_item_count.load(AtomicOrdering::Acquire)
    }

    pub fn bucket_table_capacity(&self) -> usize {
        self.buckets.capacity()
    }

    pub fn load_factor(&self) -> usize {
        self.buckets.load_factor()
    }

    pub fn statistics(&self) -> SplitListStats {
        self.stat.snapshot()
    }

    pub fn hasher(&self) -> &S {
        &self.hash_builder
    }
}

impl<T, L, S, P> Default for SplitListSet<T, L, S, P>
where
    T: Hash + Ord,
    L: OrderedList<T>,
    S: BuildHasher + Default,
    P: SplitListPolicy,
{
    fn default() -> Self {
        Self::with_capacity_and_hasher(DEFAULT_ITEM_COUNT, 1, S::default())
    }
}

impl<T, L, S, P> fmt::Debug for SplitListSet<T, L, S, P>
where
    T: Ord,
    L: OrderedList<T>,
    P: SplitListPolicy,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SplitListSet")
            .field("size", &self.size())
            .field("bucket_count", &self.bucket_count())
            .field("max_item_count", &self.max_item_count())
            .field("capacity", &self.bucket_table_capacity())
            .finish()
    }
}

impl<T, L, S, P> Drop for SplitListSet<T, L, S, P>
where
    T: Ord,
    L: OrderedList<T>,
    P: SplitListPolicy,
{
    fn drop(&mut self) {
        // Items go now; sentinels go with the bucket table.
        self.list.destroy(|node| !node.is_dummy());
        self.list.guard().force_dispose();
    }
}
