//! The ordered list underneath a split-ordered set.
//!
//! A split-ordered set keeps every item and every bucket sentinel in one
//! list sorted by split-order key. The set never walks that list from the
//! head: each operation starts at the sentinel of the item's bucket (the
//! *anchor*) and only scans that bucket's run. [`OrderedList`] is the narrow
//! set of anchored operations a list must offer for that; nothing else in
//! the list is visible to the coordinator.
//!
//! # Ordering
//!
//! Nodes are ordered by `split_key` first. Sentinel keys always have the
//! marker bit clear and item keys have it set, so a sentinel and an item
//! never share a key. Items sharing a key (hash collisions) are ordered by
//! `T: Ord`; every comparator handed to an anchored operation must induce
//! that same order.

pub mod harris_list;

use std::cmp::Ordering;
use std::ptr::NonNull;

use crate::guard::Guard;

pub use harris_list::{HarrisList, HarrisNode};

/// Node capabilities the bucket table and the coordinator rely on.
///
/// Nodes are shared by every thread working on the set.
///
pub trait SplitNode: Sized + Send + Sync {
    type Item;

    /// A fresh, unlinked sentinel carrying `split_key`.
    fn dummy(split_key: usize) -> Self;

    fn split_key(&self) -> usize;

    /// Re-key an unlinked sentinel taken from a pool.
    fn reset_dummy(&mut self, split_key: usize);

    /// The stored item, `None` for sentinels.
    fn item(&self) -> Option<&Self::Item>;

    fn is_dummy(&self) -> bool {
        self.item().is_none()
    }
}

/// Anchored operations a split-ordered set requires from its ordered list.
///
/// Every `anchor` must be a sentinel that was linked by `insert_aux_node` or
/// `insert_aux_node_at` of this same list and that is still linked. Sentinels
/// are never removed, so an anchor stays valid for the list's lifetime.
///
/// Every operation except `destroy` must run while the caller holds
/// `Self::Guard::pin()`. `cmp` compares a stored item against the search key
/// and must agree with `T: Ord`.
///
pub trait OrderedList<T: Ord>: Default + Send + Sync {
    type Guard: Guard;
    type Node: SplitNode<Item = T>;

    /// The shared guard nodes are retired to.
    fn guard(&self) -> &Self::Guard;

    /// Link a sentinel searching from the list head.
    ///
    /// Used once, for bucket 0, while the list is still empty.
    ///
    /// # Safety
    /// `node` must be an unlinked sentinel that outlives the list.
    unsafe fn insert_aux_node(&self, node: NonNull<Self::Node>) -> bool;

    /// Link a sentinel searching from `anchor` (the parent bucket).
    ///
    /// Returns `false` if a sentinel with the same key is already linked; the
    /// caller still owns `node` in that case.
    ///
    /// # Safety
    /// See the trait docs; `node` must be an unlinked sentinel that outlives
    /// the list.
    unsafe fn insert_aux_node_at(&self, anchor: NonNull<Self::Node>, node: NonNull<Self::Node>)
    -> bool;

    /// Link `item` under `split_key`; `on_inserted` runs only on success.
    ///
    /// Gives `item` back if an equal item is already present.
    ///
    /// # Safety
    /// See the trait docs.
    unsafe fn insert_at<F>(
        &self,
        anchor: NonNull<Self::Node>,
        split_key: usize,
        item: T,
        on_inserted: F,
    ) -> Result<(), T>
    where
        F: FnOnce(&T);

    /// Insert-or-update.
    ///
    /// `f(is_new, stored, argument)` runs on the stored item: with
    /// `is_new == true` both references point at the freshly linked item,
    /// otherwise `stored` is the existing item and `argument` is `item`,
    /// which is dropped afterwards. Returns `(operation_ok, was_new)`.
    ///
    /// # Safety
    /// See the trait docs.
    unsafe fn update_at<F>(
        &self,
        anchor: NonNull<Self::Node>,
        split_key: usize,
        item: T,
        f: F,
        allow_insert: bool,
    ) -> (bool, bool)
    where
        F: FnOnce(bool, &T, &T);

    /// Insert-or-replace: an equal item is atomically superseded by `item`.
    ///
    /// Returns `(operation_ok, was_new)`.
    ///
    /// # Safety
    /// See the trait docs.
    unsafe fn upsert_at(
        &self,
        anchor: NonNull<Self::Node>,
        split_key: usize,
        item: T,
        allow_insert: bool,
    ) -> (bool, bool);

    /// Remove the node holding exactly `item` (compared by address).
    ///
    /// # Safety
    /// See the trait docs.
    unsafe fn unlink_at(&self, anchor: NonNull<Self::Node>, split_key: usize, item: &T) -> bool;

    /// Remove the item matching `cmp`, calling `on_erased` on it.
    ///
    /// # Safety
    /// See the trait docs.
    unsafe fn erase_at<C, F>(
        &self,
        anchor: NonNull<Self::Node>,
        split_key: usize,
        cmp: C,
        on_erased: F,
    ) -> bool
    where
        C: Fn(&T) -> Ordering,
        F: FnOnce(&T);

    /// Remove the item matching `cmp` and hand it back behind a guard.
    ///
    /// # Safety
    /// See the trait docs.
    unsafe fn extract_at<C>(
        &self,
        anchor: NonNull<Self::Node>,
        split_key: usize,
        cmp: C,
    ) -> Option<<Self::Guard as Guard>::GuardedRef<'_, T>>
    where
        C: Fn(&T) -> Ordering;

    /// Call `on_found` on the item matching `cmp`.
    ///
    /// # Safety
    /// See the trait docs.
    unsafe fn find_at<C, F>(
        &self,
        anchor: NonNull<Self::Node>,
        split_key: usize,
        cmp: C,
        on_found: F,
    ) -> bool
    where
        C: Fn(&T) -> Ordering,
        F: FnOnce(&T);

    /// Guarded handle to the item matching `cmp`.
    ///
    /// # Safety
    /// See the trait docs.
    unsafe fn get_at<C>(
        &self,
        anchor: NonNull<Self::Node>,
        split_key: usize,
        cmp: C,
    ) -> Option<<Self::Guard as Guard>::GuardedRef<'_, T>>
    where
        C: Fn(&T) -> Ordering;

    /// The first live node after `node`, or after the head for `None`.
    /// Sentinels are included.
    ///
    /// # Safety
    /// `node`, if given, must have been returned by this method under the
    /// currently held pin.
    unsafe fn next_node(&self, node: Option<NonNull<Self::Node>>) -> Option<NonNull<Self::Node>>;

    /// Free every reachable node for which `predicate` holds and detach the
    /// whole chain from the head. Nodes the predicate rejects are left to
    /// their owner.
    ///
    fn destroy<P>(&mut self, predicate: P)
    where
        P: FnMut(&Self::Node) -> bool;
}
