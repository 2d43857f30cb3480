//! Data structures for concurrent collections.
//!
//! # Organization
//!
//! - [`ordered`] - The lock-free ordered list and the anchored contract it
//!   offers to the split-ordered set
//! - [`split_list`] - Split-ordered hash set, bucket tables, configuration
//! - [`internal`] - Internal implementation details (pub(crate))

pub(crate) mod internal;
pub mod ordered;
pub mod split_list;

pub use ordered::{HarrisList, HarrisNode, OrderedList, SplitNode};
pub use split_list::{
    AtomicItemCounter, BucketTable, DefaultPolicy, DefaultStat, DisabledStat, EmptyItemCounter,
    ExpandableBucketTable, GuardedRef, ItemCounter, Iter, NarrowSplitOrder, NativeSplitOrder,
    SplitListBuilder, SplitListPolicy, SplitListSet, SplitListStat, SplitListStats, SplitOrder,
    StatPolicy, StaticBucketTable, StaticPolicy,
};

// MarkedPtr stays pub(crate) - truly internal implementation detail
pub(crate) use internal::MarkedPtr;
