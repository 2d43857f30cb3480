//! Split-ordered hash set.
//!
//! - [`split_order`] - hash to split-order key derivation
//! - [`BucketTable`] with [`ExpandableBucketTable`] and [`StaticBucketTable`]
//! - [`SplitListSet`] - the coordinator: bucket resolution, resize policy
//!   and the set operations, delegated to an [`OrderedList`][ordered]
//! - [`SplitListPolicy`], [`SplitListBuilder`] - configuration
//!
//! [ordered]: crate::data_structures::ordered::OrderedList

mod bucket_table;
mod builder;
mod expandable_table;
mod item_counter;
mod iter;
mod policy;
pub mod split_order;
mod split_list_set;
mod stat;
mod static_table;

pub use bucket_table::BucketTable;
pub use builder::SplitListBuilder;
pub use expandable_table::{DEFAULT_ITEM_COUNT, ExpandableBucketTable};
pub use item_counter::{AtomicItemCounter, EmptyItemCounter, ItemCounter};
pub use iter::Iter;
pub use policy::{DefaultPolicy, SplitListPolicy, StatPolicy, StaticPolicy};
pub use split_list_set::{GuardedRef, SplitListSet};
pub use split_order::{NarrowSplitOrder, NativeSplitOrder, SplitOrder};
pub use stat::{DefaultStat, DisabledStat, SplitListStat, SplitListStats};
pub use static_table::StaticBucketTable;
