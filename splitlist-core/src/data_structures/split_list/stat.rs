use std::sync::atomic::{AtomicU64, Ordering};

/// Event sink for a split-ordered set.
///
/// Every hook defaults to doing nothing, so [`DisabledStat`] compiles away.
pub trait SplitListStat: Default + Send + Sync {
    fn on_insert_success(&self) {}

    fn on_insert_failed(&self) {}

    fn on_update_new(&self) {}

    fn on_update_existing(&self) {}

    fn on_erase_success(&self) {}

    fn on_erase_failed(&self) {}

    fn on_extract_success(&self) {}

    fn on_extract_failed(&self) {}

    fn on_find_success(&self) {}

    fn on_find_failed(&self) {}

    fn on_sentinel_allocated(&self) {}

    fn on_sentinel_freed(&self) {}

    fn on_sentinel_exhausted(&self) {}

    fn on_new_bucket(&self) {}

    fn on_recursive_init_bucket(&self) {}

    fn on_init_contention(&self) {}

    fn on_busy_wait(&self) {}

    fn snapshot(&self) -> SplitListStats {
        SplitListStats::default()
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledStat;

impl SplitListStat for DisabledStat {}

/// Point-in-time copy of a [`DefaultStat`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SplitListStats {
    insert_success: u64,
    insert_failed: u64,
    update_new: u64,
    update_existing: u64,
    erase_success: u64,
    erase_failed: u64,
    extract_success: u64,
    extract_failed: u64,
    find_success: u64,
    find_failed: u64,
    sentinel_allocated: u64,
    sentinel_freed: u64,
    sentinel_exhausted: u64,
    new_bucket: u64,
    recursive_init_bucket: u64,
    init_contention: u64,
    busy_wait: u64,
}

impl SplitListStats {
    pub fn insert_success(&self) -> u64 {
        self.insert_success
    }

    pub fn insert_failed(&self) -> u64 {
        self.insert_failed
    }

    pub fn update_new(&self) -> u64 {
        self.update_new
    }

    pub fn update_existing(&self) -> u64 {
        self.update_existing
    }

    pub fn erase_success(&self) -> u64 {
        self.erase_success
    }

    pub fn erase_failed(&self) -> u64 {
        self.erase_failed
    }

    pub fn extract_success(&self) -> u64 {
        self.extract_success
    }

    pub fn extract_failed(&self) -> u64 {
        self.extract_failed
    }

    pub fn find_success(&self) -> u64 {
        self.find_success
    }

    pub fn find_failed(&self) -> u64 {
        self.find_failed
    }

    pub fn sentinel_allocated(&self) -> u64 {
        self.sentinel_allocated
    }

    /// Sentinels returned to the pool after losing a race.
    pub fn sentinel_freed(&self) -> u64 {
        self.sentinel_freed
    }

    /// Times a bucket table had no sentinel to give.
    pub fn sentinel_exhausted(&self) -> u64 {
        self.sentinel_exhausted
    }

    /// Buckets whose initialization was started.
    pub fn new_bucket(&self) -> u64 {
        self.new_bucket
    }

    /// Parent buckets initialized on the way to a child.
    pub fn recursive_init_bucket(&self) -> u64 {
        self.recursive_init_bucket
    }

    /// Bucket initializations lost to another thread.
    pub fn init_contention(&self) -> u64 {
        self.init_contention
    }

    pub fn busy_wait(&self) -> u64 {
        self.busy_wait
    }
}

/// Relaxed atomic counters for every event.
#[derive(Default)]
pub struct DefaultStat {
    insert_success: AtomicU64,
    insert_failed: AtomicU64,
    update_new: AtomicU64,
    update_existing: AtomicU64,
    erase_success: AtomicU64,
    erase_failed: AtomicU64,
    extract_success: AtomicU64,
    extract_failed: AtomicU64,
    find_success: AtomicU64,
    find_failed: AtomicU64,
    sentinel_allocated: AtomicU64,
    sentinel_freed: AtomicU64,
    sentinel_exhausted: AtomicU64,
    new_bucket: AtomicU64,
    recursive_init_bucket: AtomicU64,
    init_contention: AtomicU64,
    busy_wait: AtomicU64,
}

#[inline]
fn bump(counter: &AtomicU64) {
    counter.fetch_add(1, Ordering::Relaxed);
}

impl SplitListStat for DefaultStat {
    fn on_insert_success(&self) {
        bump(&self.insert_success);
    }

    fn on_insert_failed(&self) {
        bump(&self.insert_failed);
    }

    fn on_update_new(&self) {
        bump(&self.update_new);
    }

    fn on_update_existing(&self) {
        bump(&self.update_existing);
    }

    fn on_erase_success(&self) {
        bump(&self.erase_success);
    }

    fn on_erase_failed(&self) {
        bump(&self.erase_failed);
    }

    fn on_extract_success(&self) {
        bump(&self.extract_success);
    }

    fn on_extract_failed(&self) {
        bump(&self.extract_failed);
    }

    fn on_find_success(&self) {
        bump(&self.find_success);
    }

    fn on_find_failed(&self) {
        bump(&self.find_failed);
    }

    fn on_sentinel_allocated(&self) {
        bump(&self.sentinel_allocated);
    }

    fn on_sentinel_freed(&self) {
        bump(&self.sentinel_freed);
    }

    fn on_sentinel_exhausted(&self) {
        bump(&self.sentinel_exhausted);
    }

    fn on_new_bucket(&self) {
        bump(&self.new_bucket);
    }

    fn on_recursive_init_bucket(&self) {
        bump(&self.recursive_init_bucket);
    }

    fn on_init_contention(&self) {
        bump(&self.init_contention);
    }

    fn on_busy_wait(&self) {
        bump(&self.busy_wait);
    }

    fn snapshot(&self) -> SplitListStats {
        let load = |counter: &AtomicU64| counter.load(Ordering::Relaxed);
        SplitListStats {
            insert_success: load(&self.insert_success),
            insert_failed: load(&self.insert_failed),
            update_new: load(&self.update_new),
            update_existing: load(&self.update_existing),
            erase_success: load(&self.erase_success),
            erase_failed: load(&self.erase_failed),
            extract_success: load(&self.extract_success),
            extract_failed: load(&self.extract_failed),
            find_success: load(&self.find_success),
            find_failed: load(&self.find_failed),
            sentinel_allocated: load(&self.sentinel_allocated),
            sentinel_freed: load(&self.sentinel_freed),
            sentinel_exhausted: load(&self.sentinel_exhausted),
            new_bucket: load(&self.new_bucket),
            recursive_init_bucket: load(&self.recursive_init_bucket),
            init_contention: load(&self.init_contention),
            busy_wait: load(&self.busy_wait),
        }
    }
}
