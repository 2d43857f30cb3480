//! Generic test suites shared by every guard and policy combination.
//!
//! Each function builds its own set of type
//! `SplitListSet<u64, L, RandomState, P>` and panics on failure, so crates
//! providing another guard can run the same checks from their `tests/`.


use std::collections::hash_map::RandomState;

use crate::data_structures::{OrderedList, SplitListPolicy, SplitListSet};

pub type TestSet<L, P> = SplitListSet<u64, L, RandomState, P>;

pub(crate) fn new_set<L, P>(item_count: usize, load_factor: usize) -> TestSet<L, P>
where
    L: OrderedList<u64>,
    P: SplitListPolicy,
{
    SplitListSet::with_capacity_and_hasher(item_count, load_factor, RandomState::new())
}
