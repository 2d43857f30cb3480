use std::marker::PhantomData;
use std::ptr::{self, NonNull};
use std::sync::atomic::{AtomicPtr, Ordering};

use super::bucket_table::{BucketTable, SentinelPool};
use crate::data_structures::ordered::SplitNode;

/// Item estimate used when the caller gives none.
pub const DEFAULT_ITEM_COUNT: usize = 512 * 1024;

/// Segmented bucket table.
///
/// A fixed directory of segment pointers; each segment is a run of bucket
/// slots allocated with a CAS the first time one of its buckets is
/// published. Only the directory is paid for up front, so the table can be
/// sized for far more buckets than a set usually needs.
///
/// Sentinels are heap allocated on demand and never run out.
///
pub struct ExpandableBucketTable<N> {
    segments: Box<[AtomicPtr<AtomicPtr<N>>]>,
    segment_shift: u32,
    segment_mask: usize,
    load_factor: usize,
    pool: SentinelPool<N>,
    _owns: PhantomData<Box<N>>,
}

/// `(segment_count, segment_size)` for `item_count` items.
///
/// Both are powers of two and `segment_count * segment_size` is the bucket
/// capacity.
pub(crate) fn segment_metrics(item_count: usize, load_factor: usize, max_buckets: usize) -> (usize, usize) {
    let load_factor = load_factor.max(1);
    let bucket_count = item_count / load_factor;

    let (segment_count, mut segment_size) = if bucket_count <= 2 {
        (1, 2)
    } else if bucket_count <= 1024 {
        (1, bucket_count.next_power_of_two())
    } else {
        let bits = match bucket_count.checked_next_power_of_two() {
            Some(pow) => pow.trailing_zeros(),
            None => usize::BITS - 1,
        };
        let segment_count = 1usize << (bits / 2);
        let mut segment_size = segment_count;
        if bits & 1 == 1 {
            segment_size <<= 1;
        }
        if segment_count
            .saturating_mul(segment_size)
            .saturating_mul(load_factor)
            < item_count
        {
            segment_size <<= 1;
        }
        (segment_count, segment_size)
    };

    // Never more slots than the split order can key.
    let max_buckets = max_buckets.max(2);
    segment_size = segment_size.min(max_buckets);
    let segment_count = segment_count.min(max_buckets / segment_size).max(1);
    (segment_count, segment_size)
}

impl<N: SplitNode> ExpandableBucketTable<N> {
    fn segment_size(&self) -> usize {
        self.segment_mask + 1
    }

    fn alloc_segment(size: usize) -> *mut AtomicPtr<N> {
        let slots: Box<[AtomicPtr<N>]> = (0..size).map(|_| AtomicPtr::new(ptr::null_mut())).collect();
        Box::into_raw(slots) as *mut AtomicPtr<N>
    }

    /// # Safety
    /// `segment` must come from `alloc_segment(size)` and be unreachable.
    unsafe fn free_segment(segment: *mut AtomicPtr<N>, size: usize) {
        unsafe { drop(Box::from_raw(ptr::slice_from_raw_parts_mut(segment, size))) };
    }

    /// Slot of `index`, allocating its segment if `create` is set.
    fn slot(&self, index: usize, create: bool) -> Option<&AtomicPtr<N>> {
        let segment_no = index >> self.segment_shift;
        debug_assert!(
            segment_no < self.segments.len(),
            "bucket {index} beyond capacity {}",
            self.capacity()
        );
        let directory = self.segments.get(segment_no)?;

        let mut segment = directory.load(Ordering::Acquire);
        if segment.is_null() {
            if !create {
                return None;
            }
            let fresh = Self::alloc_segment(self.segment_size());
            segment = match directory.compare_exchange(
                ptr::null_mut(),
                fresh,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => fresh,
                Err(current) => {
                    unsafe { Self::free_segment(fresh, self.segment_size()) };
                    current
                }
            };
        }

        // Segments are never freed while the table lives.
        Some(unsafe { &*segment.add(index & self.segment_mask) })
    }

    /// Number of segments allocated so far.
    pub fn allocated_segments(&self) -> usize {
        self.segments
            .iter()
            .filter(|segment| !segment.load(Ordering::Relaxed).is_null())
            .count()
    }
}

impl<N: SplitNode> BucketTable<N> for ExpandableBucketTable<N> {
    fn with_capacity(item_count: usize, load_factor: usize, max_buckets: usize) -> Self {
        let (segment_count, segment_size) = segment_metrics(item_count, load_factor, max_buckets);

        ExpandableBucketTable {
            segments: (0..segment_count)
                .map(|_| AtomicPtr::new(ptr::null_mut()))
                .collect(),
            segment_shift: segment_size.trailing_zeros(),
            segment_mask: segment_size - 1,
            load_factor: load_factor.max(1),
            pool: SentinelPool::new(),
            _owns: PhantomData,
        }
    }

    fn bucket(&self, index: usize) -> Option<NonNull<N>> {
        let slot = self.slot(index, false)?;
        NonNull::new(slot.load(Ordering::Acquire))
    }

    fn publish(&self, index: usize, sentinel: NonNull<N>) {
        let Some(slot) = self.slot(index, true) else {
            unreachable!("bucket {index} beyond capacity {}", self.capacity());
        };
        debug_assert!(
            slot.load(Ordering::Relaxed).is_null(),
            "bucket {index} published twice"
        );
        slot.store(sentinel.as_ptr(), Ordering::Release);
    }

    fn alloc_sentinel(&self, split_key: usize) -> Option<NonNull<N>> {
        self.pool
            .take(split_key)
            .or_else(|| Some(NonNull::from(Box::leak(Box::new(N::dummy(split_key))))))
    }

    unsafe fn free_sentinel(&self, sentinel: NonNull<N>) {
        self.pool.park(sentinel);
    }

    fn capacity(&self) -> usize {
        self.segments.len() * self.segment_size()
    }

    fn load_factor(&self) -> usize {
        self.load_factor
    }
}

impl<N> Drop for ExpandableBucketTable<N> {
    fn drop(&mut self) {
        let segment_size = self.segment_mask + 1;

        for directory in self.segments.iter_mut() {
            let segment = *directory.get_mut();
            if segment.is_null() {
                continue;
            }
            let slots = unsafe { &mut *ptr::slice_from_raw_parts_mut(segment, segment_size) };
            for slot in slots.iter_mut() {
                let sentinel = *slot.get_mut();
                if !sentinel.is_null() {
                    unsafe { drop(Box::from_raw(sentinel)) };
                }
            }
            unsafe { drop(Box::from_raw(slots as *mut [AtomicPtr<N>])) };
        }

        for sentinel in self.pool.drain() {
            unsafe { drop(Box::from_raw(sentinel.as_ptr())) };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_structures::ordered::HarrisNode;
    use std::sync::Arc;
    use std::thread;

    type Table = ExpandableBucketTable<HarrisNode<u64>>;

    const NO_LIMIT: usize = 1usize << (usize::BITS - 1);

    #[test]
    fn test_segment_metrics() {
        assert_eq!(segment_metrics(0, 1, NO_LIMIT), (1, 2));
        assert_eq!(segment_metrics(2, 1, NO_LIMIT), (1, 2));
        assert_eq!(segment_metrics(3, 1, NO_LIMIT), (1, 4));
        assert_eq!(segment_metrics(1000, 1, NO_LIMIT), (1, 1024));
        assert_eq!(segment_metrics(1000, 4, NO_LIMIT), (1, 256));

        // 2048 buckets: 2^11 splits into 32 segments of 64.
        assert_eq!(segment_metrics(2048, 1, NO_LIMIT), (32, 64));
        // 4096 buckets: 2^12 splits evenly.
        assert_eq!(segment_metrics(4096, 1, NO_LIMIT), (64, 64));
        assert_eq!(segment_metrics(DEFAULT_ITEM_COUNT, 1, NO_LIMIT), (512, 1024));
    }

    #[test]
    fn test_segment_metrics_covers_estimate() {
        for item_count in [1025, 3000, 5000, 70_000, 1_000_000] {
            for load_factor in [1, 2, 3] {
                let (count, size) = segment_metrics(item_count, load_factor, NO_LIMIT);
                assert!(count.is_power_of_two() && size.is_power_of_two());
                assert!(count * size * load_factor >= item_count / load_factor);
            }
        }
    }

    #[test]
    fn test_segment_metrics_respects_max_buckets() {
        assert_eq!(segment_metrics(1_000_000, 1, 128), (1, 128));
        let (count, size) = segment_metrics(1_000_000, 1, 4096);
        assert!(count * size <= 4096);
    }

    #[test]
    fn test_lazy_segments() {
        let table = Table::with_capacity(4096, 1, NO_LIMIT);
        assert_eq!(table.capacity(), 4096);
        assert_eq!(table.allocated_segments(), 0);
        assert!(table.bucket(100).is_none());

        let sentinel = table.alloc_sentinel(0).unwrap();
        table.publish(100, sentinel);
        assert_eq!(table.bucket(100), Some(sentinel));
        assert!(table.bucket(101).is_none());
        assert_eq!(table.allocated_segments(), 1);
    }

    #[test]
    #[should_panic(expected = "beyond capacity")]
    fn test_publish_beyond_capacity_panics() {
        let table = Table::with_capacity(4, 1, NO_LIMIT);
        let sentinel = table.alloc_sentinel(0).unwrap();
        table.publish(table.capacity(), sentinel);
    }

    #[test]
    fn test_free_sentinel_is_reused() {
        let table = Table::with_capacity(16, 1, NO_LIMIT);
        let first = table.alloc_sentinel(4).unwrap();
        unsafe { table.free_sentinel(first) };

        let second = table.alloc_sentinel(6).unwrap();
        assert_eq!(first, second);
        assert_eq!(unsafe { second.as_ref().split_key() }, 6);
        unsafe { table.free_sentinel(second) };
    }

    #[test]
    fn test_concurrent_segment_allocation() {
        let table = Arc::new(Table::with_capacity(1 << 16, 1, NO_LIMIT));

        let handles: Vec<_> = (0..8usize)
            .map(|t| {
                let table = Arc::clone(&table);
                thread::spawn(move || {
                    for i in (t..4096).step_by(8) {
                        let sentinel = table.alloc_sentinel(i).unwrap();
                        table.publish(i, sentinel);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        for i in 0..4096 {
            let sentinel = table.bucket(i).unwrap();
            assert_eq!(unsafe { sentinel.as_ref().split_key() }, i);
        }
    }
}
