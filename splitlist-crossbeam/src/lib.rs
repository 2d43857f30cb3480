//! Epoch-based reclamation for `splitlist-core` sets.
//!
//! This crate provides [`EpochGuard`], an implementation of the `Guard`
//! trait backed by crossbeam-epoch, and [`EpochSplitListSet`], the set type
//! most callers want.
//!
//! # Usage
//!
//! ```
//! use splitlist_crossbeam::EpochSplitListSet;
//!
//! let set: EpochSplitListSet<u64> = EpochSplitListSet::new();
//! assert!(set.insert(42));
//! assert!(set.contains(&42));
//!
//! let handle = set.get(&42).unwrap();
//! assert!(set.erase(&42));
//! assert_eq!(*handle, 42);
//! ```

pub mod epoch_guard;

use std::collections::hash_map::RandomState;

use splitlist_core::{DefaultPolicy, HarrisList, SplitListSet};

pub use epoch_guard::{EpochGuard, EpochRef};

/// Harris list whose retired nodes go to the global epoch collector.
pub type EpochHarrisList<T> = HarrisList<T, EpochGuard>;

/// Split-ordered set with epoch-based reclamation.
pub type EpochSplitListSet<T, S = RandomState, P = DefaultPolicy> =
    SplitListSet<T, EpochHarrisList<T>, S, P>;
