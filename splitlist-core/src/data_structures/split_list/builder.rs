use std::collections::hash_map::RandomState;
use std::hash::{BuildHasher, Hash};
use std::marker::PhantomData;

use super::expandable_table::DEFAULT_ITEM_COUNT;
use super::policy::{DefaultPolicy, SplitListPolicy};
use super::split_list_set::SplitListSet;
use super::split_order::SplitOrder;
use crate::data_structures::ordered::OrderedList;
use crate::error::{ConfigError, MAX_LOAD_FACTOR};

/// Builds a [`SplitListSet`] with validated sizing.
///
/// # Examples
///
/// ```rust
/// use splitlist_core::{DeferredGuard, HarrisList, SplitListBuilder, StatPolicy};
///
/// let set = SplitListBuilder::<u64, HarrisList<u64, DeferredGuard>>::new()
///     // About 10,000 items,
///     .item_count(10_000)
///     // four per bucket on average.
///     .load_factor(4)
///     .policy::<StatPolicy>()
///     .build()
///     .expect("valid configuration");
///
/// set.insert(1);
/// assert_eq!(set.statistics().insert_success(), 1);
/// ```
///
pub struct SplitListBuilder<T, L, S = RandomState, P = DefaultPolicy> {
    item_count: usize,
    load_factor: usize,
    hash_builder: S,
    set_type: PhantomData<fn() -> (T, L, P)>,
}

impl<T, L> SplitListBuilder<T, L>
where
    T: Hash + Ord,
    L: OrderedList<T>,
{
    pub fn new() -> Self {
        Self {
            item_count: DEFAULT_ITEM_COUNT,
            load_factor: 1,
            hash_builder: RandomState::new(),
            set_type: PhantomData,
        }
    }
}

impl<T, L> Default for SplitListBuilder<T, L>
where
    T: Hash + Ord,
    L: OrderedList<T>,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T, L, S, P> SplitListBuilder<T, L, S, P>
where
    T: Hash + Ord,
    L: OrderedList<T>,
    S: BuildHasher,
    P: SplitListPolicy,
{
    /// Expected number of items; sizes the bucket table.
    pub fn item_count(self, item_count: usize) -> Self {
        Self { item_count, ..self }
    }

    /// Average number of items per bucket. 0 is taken as 1.
    pub fn load_factor(self, load_factor: usize) -> Self {
        Self {
            load_factor,
            ..self
        }
    }

    pub fn hasher<S2: BuildHasher>(self, hash_builder: S2) -> SplitListBuilder<T, L, S2, P> {
        SplitListBuilder {
            item_count: self.item_count,
            load_factor: self.load_factor,
            hash_builder,
            set_type: PhantomData,
        }
    }

    pub fn policy<P2: SplitListPolicy>(self) -> SplitListBuilder<T, L, S, P2> {
        SplitListBuilder {
            item_count: self.item_count,
            load_factor: self.load_factor,
            hash_builder: self.hash_builder,
            set_type: PhantomData,
        }
    }

    pub fn build(self) -> Result<SplitListSet<T, L, S, P>, ConfigError> {
        let load_factor = self.load_factor.max(1);
        if load_factor > MAX_LOAD_FACTOR {
            return Err(ConfigError::LoadFactorTooLarge(load_factor));
        }

        let max_buckets = P::Order::max_buckets();
        let fits = (self.item_count / load_factor)
            .checked_next_power_of_two()
            .is_some_and(|buckets| buckets <= max_buckets);
        if !fits {
            return Err(ConfigError::CapacityOverflow {
                item_count: self.item_count,
                load_factor,
                max_buckets,
            });
        }

        Ok(SplitListSet::with_capacity_and_hasher(
            self.item_count,
            load_factor,
            self.hash_builder,
        ))
    }
}
