//! Lock-free split-ordered hash set.
//!
//! [`SplitListSet`] keeps every item in a single lock-free ordered list
//! sorted by bit-reversed hash, and a bucket table of shortcuts into that
//! list. The table grows by doubling its logical bucket count; items are
//! never moved or rehashed.
//!
//! The ordered list ([`HarrisList`]) and the memory reclamation strategy
//! ([`Guard`]) are type parameters. This crate ships [`DeferredGuard`] for
//! tests; `splitlist-crossbeam` provides the epoch-based guard for
//! production use.

pub mod common_tests;
pub mod data_structures;
pub mod error;
pub mod guard;

pub use data_structures::{
    AtomicItemCounter, BucketTable, DefaultPolicy, DefaultStat, DisabledStat, EmptyItemCounter,
    ExpandableBucketTable, GuardedRef, HarrisList, HarrisNode, ItemCounter, Iter,
    NarrowSplitOrder, NativeSplitOrder, OrderedList, SplitListBuilder, SplitListPolicy,
    SplitListSet, SplitListStat, SplitListStats, SplitNode, SplitOrder, StatPolicy,
    StaticBucketTable, StaticPolicy,
};
pub use error::ConfigError;

// Re-export guard types for convenience
pub use guard::{DeferredGuard, DeferredRef, Guard};
