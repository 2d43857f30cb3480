//! Compile-time configuration of a split-ordered set.

use super::bucket_table::BucketTable;
use super::expandable_table::ExpandableBucketTable;
use super::item_counter::{AtomicItemCounter, ItemCounter};
use super::split_order::{NativeSplitOrder, SplitOrder};
use super::stat::{DefaultStat, DisabledStat, SplitListStat};
use super::static_table::StaticBucketTable;
use crate::data_structures::ordered::SplitNode;

/// Bundles the pieces of a set that are fixed by type.
pub trait SplitListPolicy: 'static {
    type Table<N: SplitNode>: BucketTable<N>;
    type ItemCounter: ItemCounter;
    type Stat: SplitListStat;
    type Order: SplitOrder;
}

/// Expandable table, atomic counter, no statistics, full-word order.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultPolicy;

impl SplitListPolicy for DefaultPolicy {
    type Table<N: SplitNode> = ExpandableBucketTable<N>;
    type ItemCounter = AtomicItemCounter;
    type Stat = DisabledStat;
    type Order = NativeSplitOrder;
}

/// Fixed-size table with a preallocated sentinel arena.
#[derive(Debug, Default, Clone, Copy)]
pub struct StaticPolicy;

impl SplitListPolicy for StaticPolicy {
    type Table<N: SplitNode> = StaticBucketTable<N>;
    type ItemCounter = AtomicItemCounter;
    type Stat = DisabledStat;
    type Order = NativeSplitOrder;
}

/// [`DefaultPolicy`] with event counters.
#[derive(Debug, Default, Clone, Copy)]
pub struct StatPolicy;

impl SplitListPolicy for StatPolicy {
    type Table<N: SplitNode> = ExpandableBucketTable<N>;
    type ItemCounter = AtomicItemCounter;
    type Stat = DefaultStat;
    type Order = NativeSplitOrder;
}
