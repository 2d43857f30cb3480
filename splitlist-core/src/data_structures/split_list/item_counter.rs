use std::marker::PhantomData;
use std::sync::atomic::{AtomicIsize, Ordering};

use crossbeam::utils::CachePadded;

/// Approximate count of items in a set.
///
/// The resize policy compares this count against the growth threshold, so a
/// split-ordered set only accepts counters with `COUNTS == true`.
///
pub trait ItemCounter: Default + Send + Sync {
    /// Whether the counter actually counts.
    const COUNTS: bool;

    fn inc(&self);

    fn dec(&self);

    fn get(&self) -> usize;

    fn reset(&self);
}

/// Relaxed atomic counter on its own cache line.
///
/// An erase may be counted before the insert it undoes; the count is kept
/// signed internally and never reported below zero.
#[derive(Default)]
pub struct AtomicItemCounter {
    count: CachePadded<AtomicIsize>,
}

impl ItemCounter for AtomicItemCounter {
    const COUNTS: bool = true;

    #[inline]
    fn inc(&self) {
        self.count.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    fn dec(&self) {
        self.count.fetch_sub(1, Ordering::Relaxed);
    }

    #[inline]
    fn get(&self) -> usize {
        self.count.load(Ordering::Relaxed).max(0) as usize
    }

    fn reset(&self) {
        self.count.store(0, Ordering::Relaxed);
    }
}

/// A counter that does not count. Rejected by `SplitListSet` at compile time.
#[derive(Debug, Default, Clone, Copy)]
pub struct EmptyItemCounter;

impl ItemCounter for EmptyItemCounter {
    const COUNTS: bool = false;

    fn inc(&self) {}

    fn dec(&self) {}

    fn get(&self) -> usize {
        0
    }

    fn reset(&self) {}
}

pub(crate) struct AssertCounting<C>(PhantomData<C>);

impl<C: ItemCounter> AssertCounting<C> {
    pub(crate) const OK: () = assert!(
        C::COUNTS,
        "SplitListSet requires a counting ItemCounter; the resize policy reads it"
    );
}
