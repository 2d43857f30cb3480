use std::cmp::Ordering;
use std::marker::PhantomData;
use std::ptr::{self, NonNull};
use std::sync::atomic::{AtomicPtr, Ordering as AtomicOrdering};

use crate::data_structures::MarkedPtr;
use crate::data_structures::ordered::{OrderedList, SplitNode};
use crate::guard::Guard;

type NodePtr<T> = *mut HarrisNode<T>;

///
/// Lock-free ordered list after Harris' 'A Pragmatic Implementation of Non-Blocking
/// Linked-Lists', with Michael's rule that the thread whose CAS physically unlinks a
/// node is the one that retires it.
///
/// Every operation is anchored: it starts at a bucket sentinel handed in by the
/// split-ordered set instead of at the head, and it never looks behind that sentinel.
/// Sentinels are never marked, so an anchor is always a valid place to restart from.
///
// =============================================================================
// LIST SHAPE
// =============================================================================
//
// ┌──────┐   ┌──────┐   ┌──────┐   ┌──────┐   ┌──────┐   ┌──────┐
// │ HEAD │──►│  S0  │──►│ 0x81 │──►│  S4  │──►│ 0x21 │──►│ NULL │
// │      │   │(0x00)│   │ item │   │(0x20)│   │ item │   │      │
// └──────┘   └──────┘   └──────┘   └──────┘   └──────┘   └──────┘
//
// Sx = sentinel of bucket x, labelled with its split key. HEAD is never
// compared; bucket 0's sentinel is the first real node.
//
// =============================================================================
// ERASE (two phases)
// =============================================================================
//
// 1. Logical:  CAS curr.next   succ -> succ|DELETED
//
//          pred ──────► curr ──╳───► succ
//
// 2. Physical: CAS pred.next   curr -> succ
//
//          pred ─────────────────────► succ
//
// If step 2 fails, the eraser re-runs `locate` from the anchor, which snips
// every marked node on its way. Whoever wins a snip CAS retires that node;
// there is exactly one such winner per node.
//
// =============================================================================
// UPSERT (replace in place)
// =============================================================================
//
// 1. new.next = succ
// 2. CAS curr.next   succ -> new|REPLACED        (linearization point)
//
//          pred ──────► curr ──╳───► new ──────► succ
//
// 3. CAS pred.next   curr -> new   (or snipped later by any traversal)
//
// A reader that meets a REPLACED link simply continues into `new`, so the
// key is never absent.
//
pub struct HarrisNode<T> {
    split_key: usize,
    item: Option<T>,
    next: AtomicPtr<HarrisNode<T>>,
}

impl<T> HarrisNode<T> {
    fn new(split_key: usize, item: T) -> Self {
        HarrisNode {
            split_key,
            item: Some(item),
            next: AtomicPtr::new(ptr::null_mut()),
        }
    }

    fn head() -> Self {
        HarrisNode {
            split_key: 0,
            item: None,
            next: AtomicPtr::new(ptr::null_mut()),
        }
    }

    // =========================================================================
    // Next pointer accessors
    // =========================================================================

    #[inline]
    fn get_next(&self) -> NodePtr<T> {
        self.next.load(AtomicOrdering::Acquire)
    }

    #[inline]
    fn set_next(&self, ptr: NodePtr<T>) {
        self.next.store(ptr, AtomicOrdering::Release)
    }

    #[inline]
    fn cas_next(&self, expected: NodePtr<T>, new: NodePtr<T>) -> Result<NodePtr<T>, NodePtr<T>> {
        self.next.compare_exchange(
            expected,
            new,
            AtomicOrdering::AcqRel,
            AtomicOrdering::Acquire,
        )
    }

    /// Order of this node relative to a search target.
    #[inline]
    fn compare<C>(&self, split_key: usize, cmp: &C) -> Ordering
    where
        C: Fn(&T) -> Ordering,
    {
        self.split_key
            .cmp(&split_key)
            .then_with(|| match &self.item {
                Some(item) => cmp(item),
                None => Ordering::Less,
            })
    }

    /// # Safety
    /// `ptr` must come from `Box::into_raw` and must not be reachable anymore.
    unsafe fn dealloc_ptr(ptr: NodePtr<T>) {
        unsafe { drop(Box::from_raw(ptr)) };
    }

    /// Reclaim a node that was never published and give its item back.
    ///
    /// # Safety
    /// `ptr` must be a regular node from `Box::into_raw` that no other thread saw.
    unsafe fn into_item(ptr: NodePtr<T>) -> T {
        let node = unsafe { Box::from_raw(ptr) };
        match node.item {
            Some(item) => item,
            None => unreachable!("regular node without an item"),
        }
    }
}

impl<T: Send + Sync> SplitNode for HarrisNode<T> {
    type Item = T;

    fn dummy(split_key: usize) -> Self {
        HarrisNode {
            split_key,
            item: None,
            next: AtomicPtr::new(ptr::null_mut()),
        }
    }

    fn split_key(&self) -> usize {
        self.split_key
    }

    fn reset_dummy(&mut self, split_key: usize) {
        debug_assert!(self.item.is_none(), "only sentinels are pooled");
        self.split_key = split_key;
        *self.next.get_mut() = ptr::null_mut();
    }

    fn item(&self) -> Option<&T> {
        self.item.as_ref()
    }
}

/// Where a search stopped: `curr` is the first live node not ordered
/// before the target, `pred` its live predecessor.
///
struct Location<T> {
    pred: NodePtr<T>,
    curr: NodePtr<T>,
    found: bool,
}

/// Result of trying to logically delete a located node.
enum Marking {
    Marked,
    /// Someone else erased it first.
    Gone,
    /// An upsert superseded it; the replacement carries an equal key.
    Superseded,
}

pub struct HarrisList<T, G: Guard> {
    head: NonNull<HarrisNode<T>>,
    /// Shared guard instance removed nodes are retired to.
    guard: G,
    _owns: PhantomData<Box<HarrisNode<T>>>,
}

// The list hands out `&T` to any thread and drops items on whichever thread
// retires them.
unsafe impl<T: Send + Sync, G: Guard> Send for HarrisList<T, G> {}
unsafe impl<T: Send + Sync, G: Guard> Sync for HarrisList<T, G> {}

impl<T, G> HarrisList<T, G>
where
    T: Ord,
    G: Guard,
{
    pub fn new() -> Self {
        let head = Box::new(HarrisNode::head());
        HarrisList {
            // Box::into_raw never returns null.
            head: unsafe { NonNull::new_unchecked(Box::into_raw(head)) },
            guard: G::default(),
            _owns: PhantomData,
        }
    }

    unsafe fn retire(&self, node: NodePtr<T>) {
        unsafe { self.guard.defer_destroy(node, HarrisNode::dealloc_ptr) };
    }

    // Core operation: find with cleanup.
    //
    // Walks from `anchor`, snipping marked nodes, until the first live node
    // that does not order before the target. A failed snip means `pred`
    // changed under us; restart from the anchor, which is never marked.
    //
    unsafe fn locate<P>(&self, anchor: NodePtr<T>, probe: &P) -> Location<T>
    where
        P: Fn(&HarrisNode<T>) -> Ordering,
    {
        'retry: loop {
            let mut pred = anchor;
            let mut curr = MarkedPtr::unmask(unsafe { (*pred).get_next() });

            loop {
                if curr.is_null() {
                    return Location {
                        pred,
                        curr,
                        found: false,
                    };
                }

                let next = MarkedPtr::new(unsafe { (*curr).get_next() });

                if next.is_any_marked() {
                    // For a REPLACED node the successor is its replacement.
                    if unsafe { (*pred).cas_next(curr, next.as_ptr()) }.is_err() {
                        continue 'retry;
                    }
                    unsafe { self.retire(curr) };
                    curr = next.as_ptr();
                    continue;
                }

                match probe(unsafe { &*curr }) {
                    Ordering::Less => {
                        pred = curr;
                        curr = next.as_ptr();
                    }
                    ord => {
                        return Location {
                            pred,
                            curr,
                            found: ord == Ordering::Equal,
                        };
                    }
                }
            }
        }
    }

    /// Link `new` at its position. On a duplicate, returns the node already
    /// holding the key.
    unsafe fn link<P>(&self, anchor: NodePtr<T>, new: NodePtr<T>, probe: &P) -> Result<(), NodePtr<T>>
    where
        P: Fn(&HarrisNode<T>) -> Ordering,
    {
        loop {
            let loc = unsafe { self.locate(anchor, probe) };
            if loc.found {
                return Err(loc.curr);
            }

            unsafe {
                (*new).set_next(loc.curr);
                if (*loc.pred).cas_next(loc.curr, new).is_ok() {
                    return Ok(());
                }
            }
        }
    }

    /// Logically delete `loc.curr`, then make sure it is physically gone.
    unsafe fn mark_and_unlink<P>(&self, anchor: NodePtr<T>, loc: &Location<T>, probe: &P) -> Marking
    where
        P: Fn(&HarrisNode<T>) -> Ordering,
    {
        let curr = loc.curr;
        let succ = loop {
            let next = MarkedPtr::new(unsafe { (*curr).get_next() });
            if next.is_deleted() {
                return Marking::Gone;
            }
            if next.is_replaced() {
                return Marking::Superseded;
            }
            if unsafe { (*curr).cas_next(next.as_raw(), next.deleted().as_raw()) }.is_ok() {
                break next.as_ptr();
            }
        };

        if unsafe { (*loc.pred).cas_next(curr, succ) }.is_ok() {
            unsafe { self.retire(curr) };
        } else {
            // Someone changed pred; a fresh walk snips curr for us.
            unsafe { self.locate(anchor, probe) };
        }
        Marking::Marked
    }

    fn item_probe<C>(split_key: usize, cmp: C) -> impl Fn(&HarrisNode<T>) -> Ordering
    where
        C: Fn(&T) -> Ordering,
    {
        move |node| node.compare(split_key, &cmp)
    }

    /// Locate and delete, retrying while the target is superseded.
    unsafe fn remove_matching<C>(&self, anchor: NodePtr<T>, split_key: usize, cmp: C) -> Option<NodePtr<T>>
    where
        C: Fn(&T) -> Ordering,
    {
        let probe = Self::item_probe(split_key, cmp);
        loop {
            let loc = unsafe { self.locate(anchor, &probe) };
            if !loc.found {
                return None;
            }
            match unsafe { self.mark_and_unlink(anchor, &loc, &probe) } {
                Marking::Marked => return Some(loc.curr),
                Marking::Gone | Marking::Superseded => continue,
            }
        }
    }
}

impl<T, G> HarrisList<T, G>
where
    T: Ord + Send + Sync,
    G: Guard,
{
    /// Number of live items. Walks the whole list; for tests and debugging.
    pub fn count_items(&self) -> usize {
        let _guard = G::pin();
        let mut count = 0;
        let mut curr = unsafe { self.next_node(None) };
        while let Some(node) = curr {
            if unsafe { !node.as_ref().is_dummy() } {
                count += 1;
            }
            curr = unsafe { self.next_node(Some(node)) };
        }
        count
    }
}

// ============================================================================
// Anchored contract
// ============================================================================

impl<T, G> OrderedList<T> for HarrisList<T, G>
where
    T: Ord + Send + Sync,
    G: Guard,
{
    type Guard = G;
    type Node = HarrisNode<T>;

    fn guard(&self) -> &G {
        &self.guard
    }

    unsafe fn insert_aux_node(&self, node: NonNull<Self::Node>) -> bool {
        unsafe { self.insert_aux_node_at(self.head, node) }
    }

    unsafe fn insert_aux_node_at(&self, anchor: NonNull<Self::Node>, node: NonNull<Self::Node>) -> bool {
        let split_key = unsafe { node.as_ref().split_key };
        // `link` starts comparing after the anchor. The head is not a
        // sentinel and shares key 0 with bucket 0.
        if anchor != self.head && unsafe { anchor.as_ref().split_key } == split_key {
            return false;
        }
        let probe = |n: &HarrisNode<T>| n.split_key.cmp(&split_key);
        unsafe { self.link(anchor.as_ptr(), node.as_ptr(), &probe) }.is_ok()
    }

    unsafe fn insert_at<F>(
        &self,
        anchor: NonNull<Self::Node>,
        split_key: usize,
        item: T,
        on_inserted: F,
    ) -> Result<(), T>
    where
        F: FnOnce(&T),
    {
        let new = Box::into_raw(Box::new(HarrisNode::new(split_key, item)));

        let linked = {
            // The node is private until linked; its item is a stable search key.
            let key = match unsafe { &(*new).item } {
                Some(key) => key,
                None => unreachable!(),
            };
            let probe = Self::item_probe(split_key, |stored: &T| stored.cmp(key));
            let linked = unsafe { self.link(anchor.as_ptr(), new, &probe) }.is_ok();
            if linked {
                on_inserted(key);
            }
            linked
        };

        if linked {
            Ok(())
        } else {
            Err(unsafe { HarrisNode::into_item(new) })
        }
    }

    unsafe fn update_at<F>(
        &self,
        anchor: NonNull<Self::Node>,
        split_key: usize,
        item: T,
        f: F,
        allow_insert: bool,
    ) -> (bool, bool)
    where
        F: FnOnce(bool, &T, &T),
    {
        let new = Box::into_raw(Box::new(HarrisNode::new(split_key, item)));

        let outcome = {
            let key = match unsafe { &(*new).item } {
                Some(key) => key,
                None => unreachable!(),
            };
            let probe = Self::item_probe(split_key, |stored: &T| stored.cmp(key));

            loop {
                let loc = unsafe { self.locate(anchor.as_ptr(), &probe) };
                if loc.found {
                    if let Some(stored) = unsafe { &(*loc.curr).item } {
                        f(false, stored, key);
                    }
                    break (true, false);
                }
                if !allow_insert {
                    break (false, false);
                }

                unsafe {
                    (*new).set_next(loc.curr);
                    if (*loc.pred).cas_next(loc.curr, new).is_ok() {
                        f(true, key, key);
                        break (true, true);
                    }
                }
            }
        };

        if !outcome.1 {
            unsafe { HarrisNode::dealloc_ptr(new) };
        }
        outcome
    }

    unsafe fn upsert_at(
        &self,
        anchor: NonNull<Self::Node>,
        split_key: usize,
        item: T,
        allow_insert: bool,
    ) -> (bool, bool) {
        let new = Box::into_raw(Box::new(HarrisNode::new(split_key, item)));

        let outcome = {
            let key = match unsafe { &(*new).item } {
                Some(key) => key,
                None => unreachable!(),
            };
            let probe = Self::item_probe(split_key, |stored: &T| stored.cmp(key));

            loop {
                let loc = unsafe { self.locate(anchor.as_ptr(), &probe) };

                if !loc.found {
                    if !allow_insert {
                        break (false, false);
                    }
                    unsafe {
                        (*new).set_next(loc.curr);
                        if (*loc.pred).cas_next(loc.curr, new).is_ok() {
                            break (true, true);
                        }
                    }
                    continue;
                }

                let curr = loc.curr;
                let next = MarkedPtr::new(unsafe { (*curr).get_next() });
                if next.is_any_marked() {
                    continue;
                }

                unsafe { (*new).set_next(next.as_ptr()) };
                let replaced = MarkedPtr::replaced_by(new);
                if unsafe { (*curr).cas_next(next.as_raw(), replaced.as_raw()) }.is_err() {
                    continue;
                }

                if unsafe { (*loc.pred).cas_next(curr, new) }.is_ok() {
                    unsafe { self.retire(curr) };
                } else {
                    unsafe { self.locate(anchor.as_ptr(), &probe) };
                }
                break (true, false);
            }
        };

        if !outcome.0 {
            unsafe { HarrisNode::dealloc_ptr(new) };
        }
        outcome
    }

    unsafe fn unlink_at(&self, anchor: NonNull<Self::Node>, split_key: usize, item: &T) -> bool {
        let probe = Self::item_probe(split_key, |stored: &T| stored.cmp(item));
        let loc = unsafe { self.locate(anchor.as_ptr(), &probe) };
        if !loc.found {
            return false;
        }

        let same_object = unsafe { &(*loc.curr).item }
            .as_ref()
            .is_some_and(|stored| ptr::eq(stored, item));
        if !same_object {
            return false;
        }

        matches!(
            unsafe { self.mark_and_unlink(anchor.as_ptr(), &loc, &probe) },
            Marking::Marked
        )
    }

    unsafe fn erase_at<C, F>(
        &self,
        anchor: NonNull<Self::Node>,
        split_key: usize,
        cmp: C,
        on_erased: F,
    ) -> bool
    where
        C: Fn(&T) -> Ordering,
        F: FnOnce(&T),
    {
        match unsafe { self.remove_matching(anchor.as_ptr(), split_key, cmp) } {
            Some(node) => {
                // Still pinned: the node may be retired but is not freed yet.
                if let Some(item) = unsafe { &(*node).item } {
                    on_erased(item);
                }
                true
            }
            None => false,
        }
    }

    unsafe fn extract_at<C>(
        &self,
        anchor: NonNull<Self::Node>,
        split_key: usize,
        cmp: C,
    ) -> Option<<Self::Guard as Guard>::GuardedRef<'_, T>>
    where
        C: Fn(&T) -> Ordering,
    {
        let node = unsafe { self.remove_matching(anchor.as_ptr(), split_key, cmp) }?;
        let item = unsafe { (*node).item.as_ref() }?;
        Some(unsafe { G::make_ref(item as *const T) })
    }

    unsafe fn find_at<C, F>(
        &self,
        anchor: NonNull<Self::Node>,
        split_key: usize,
        cmp: C,
        on_found: F,
    ) -> bool
    where
        C: Fn(&T) -> Ordering,
        F: FnOnce(&T),
    {
        let probe = Self::item_probe(split_key, cmp);
        let loc = unsafe { self.locate(anchor.as_ptr(), &probe) };
        if !loc.found {
            return false;
        }
        match unsafe { &(*loc.curr).item } {
            Some(item) => {
                on_found(item);
                true
            }
            None => false,
        }
    }

    unsafe fn get_at<C>(
        &self,
        anchor: NonNull<Self::Node>,
        split_key: usize,
        cmp: C,
    ) -> Option<<Self::Guard as Guard>::GuardedRef<'_, T>>
    where
        C: Fn(&T) -> Ordering,
    {
        let probe = Self::item_probe(split_key, cmp);
        let loc = unsafe { self.locate(anchor.as_ptr(), &probe) };
        if !loc.found {
            return None;
        }
        let item = unsafe { (*loc.curr).item.as_ref() }?;
        Some(unsafe { G::make_ref(item as *const T) })
    }

    unsafe fn next_node(&self, node: Option<NonNull<Self::Node>>) -> Option<NonNull<Self::Node>> {
        let start = node.unwrap_or(self.head);
        let mut curr = MarkedPtr::unmask(unsafe { start.as_ref().get_next() });

        while !curr.is_null() {
            let next = MarkedPtr::new(unsafe { (*curr).get_next() });
            if !next.is_any_marked() {
                return NonNull::new(curr);
            }
            curr = next.as_ptr();
        }
        None
    }

    fn destroy<P>(&mut self, mut predicate: P)
    where
        P: FnMut(&Self::Node) -> bool,
    {
        let head = unsafe { self.head.as_ref() };
        let mut curr = MarkedPtr::unmask(head.get_next());
        head.set_next(ptr::null_mut());

        while !curr.is_null() {
            let next = MarkedPtr::unmask(unsafe { (*curr).get_next() });
            if predicate(unsafe { &*curr }) {
                unsafe { HarrisNode::dealloc_ptr(curr) };
            }
            curr = next;
        }
    }
}

impl<T, G> Default for HarrisList<T, G>
where
    T: Ord,
    G: Guard,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T, G: Guard> Drop for HarrisList<T, G> {
    fn drop(&mut self) {
        // Sentinels belong to whoever linked them; only items are ours.
        let head = self.head.as_ptr();
        let mut curr = MarkedPtr::unmask(unsafe { (*head).get_next() });

        while !curr.is_null() {
            unsafe {
                let next = MarkedPtr::new((*curr).get_next());
                if next.is_deleted() {
                    panic!(
                        "INVARIANT VIOLATION: Found DELETE-marked node at drop time!\n\
                         DELETE-marked nodes should have been physically unlinked before drop."
                    );
                }
                if (*curr).item.is_some() {
                    HarrisNode::dealloc_ptr(curr);
                }
                curr = next.as_ptr();
            }
        }

        unsafe { HarrisNode::dealloc_ptr(head) };
    }
}

// ============================================================================
// Tests - list level, anchored at a single hand-made sentinel
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::guard::DeferredGuard;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
    use std::thread;

    type TestList = HarrisList<u64, DeferredGuard>;

    /// Odd keys sort after the sentinel keyed 0 and keep items in value order.
    fn key_of(value: u64) -> usize {
        ((value as usize) << 1) | 1
    }

    struct Anchored {
        list: TestList,
        anchor: NonNull<HarrisNode<u64>>,
    }

    // The anchor is only touched through the list's own synchronization.
    unsafe impl Send for Anchored {}
    unsafe impl Sync for Anchored {}

    impl Anchored {
        fn new() -> Self {
            let list = TestList::new();
            let anchor = NonNull::from(Box::leak(Box::new(HarrisNode::dummy(0))));
            assert!(unsafe { list.insert_aux_node(anchor) });
            Anchored { list, anchor }
        }

        fn insert(&self, value: u64) -> bool {
            unsafe { self.list.insert_at(self.anchor, key_of(value), value, |_| {}) }.is_ok()
        }

        fn contains(&self, value: u64) -> bool {
            unsafe {
                self.list
                    .find_at(self.anchor, key_of(value), |s: &u64| s.cmp(&value), |_| {})
            }
        }

        fn erase(&self, value: u64) -> bool {
            unsafe {
                self.list
                    .erase_at(self.anchor, key_of(value), |s: &u64| s.cmp(&value), |_| {})
            }
        }

        fn values(&self) -> Vec<u64> {
            let mut values = Vec::new();
            let mut curr = unsafe { self.list.next_node(None) };
            while let Some(node) = curr {
                if let Some(item) = unsafe { node.as_ref().item() } {
                    values.push(*item);
                }
                curr = unsafe { self.list.next_node(Some(node)) };
            }
            values
        }
    }

    impl Drop for Anchored {
        fn drop(&mut self) {
            self.list.destroy(|node| !node.is_dummy());
            unsafe { drop(Box::from_raw(self.anchor.as_ptr())) };
        }
    }

    #[test]
    fn test_insert_find_erase() {
        let list = Anchored::new();

        for value in [5, 3, 9, 1] {
            assert!(list.insert(value));
        }
        assert!(!list.insert(5));
        assert_eq!(list.values(), vec![1, 3, 5, 9]);

        assert!(list.contains(3));
        assert!(!list.contains(4));

        assert!(list.erase(3));
        assert!(!list.erase(3));
        assert!(!list.contains(3));
        assert_eq!(list.list.count_items(), 3);
    }

    #[test]
    fn test_duplicate_insert_returns_item() {
        let list = Anchored::new();
        assert!(list.insert(7));

        let rejected = unsafe { list.list.insert_at(list.anchor, key_of(7), 7, |_| {}) };
        assert_eq!(rejected, Err(7));
    }

    #[test]
    fn test_aux_node_duplicate_rejected() {
        let list = Anchored::new();
        let twin = Box::into_raw(Box::new(HarrisNode::<u64>::dummy(0)));

        let linked = unsafe { list.list.insert_aux_node_at(list.anchor, NonNull::new_unchecked(twin)) };
        assert!(!linked);
        unsafe { drop(Box::from_raw(twin)) };

        // Same key as a sentinel further down the list.
        let split = NonNull::from(Box::leak(Box::new(HarrisNode::<u64>::dummy(8))));
        assert!(unsafe { list.list.insert_aux_node_at(list.anchor, split) });
        let twin = Box::into_raw(Box::new(HarrisNode::<u64>::dummy(8)));
        let linked = unsafe { list.list.insert_aux_node_at(list.anchor, NonNull::new_unchecked(twin)) };
        assert!(!linked);
        unsafe { drop(Box::from_raw(twin)) };
    }

    #[test]
    fn test_sentinels_split_a_run() {
        let list = Anchored::new();
        for value in 0..8 {
            assert!(list.insert(value));
        }

        // A sentinel between items 3 and 4 (split key 8 sorts between 7 and 9).
        let split = NonNull::from(Box::leak(Box::new(HarrisNode::<u64>::dummy(8))));
        assert!(unsafe { list.list.insert_aux_node_at(list.anchor, split) });

        // Searching from the new sentinel only sees what lies behind it.
        let found_high =
            unsafe { list.list.find_at(split, key_of(6), |s: &u64| s.cmp(&6), |_| {}) };
        let found_low =
            unsafe { list.list.find_at(split, key_of(2), |s: &u64| s.cmp(&2), |_| {}) };
        assert!(found_high);
        assert!(!found_low);
        assert_eq!(list.values(), (0..8).collect::<Vec<_>>());

        drop(list);
        unsafe { drop(Box::from_raw(split.as_ptr())) };
    }

    #[test]
    fn test_update_at() {
        let list = Anchored::new();
        let calls = AtomicUsize::new(0);

        let (ok, new) = unsafe {
            list.list.update_at(
                list.anchor,
                key_of(4),
                4,
                |is_new, stored, arg| {
                    assert!(is_new);
                    assert!(ptr::eq(stored, arg));
                    calls.fetch_add(1, AtomicOrdering::Relaxed);
                },
                true,
            )
        };
        assert!(ok && new);

        let (ok, new) = unsafe {
            list.list.update_at(
                list.anchor,
                key_of(4),
                4,
                |is_new, stored, arg| {
                    assert!(!is_new);
                    assert!(!ptr::eq(stored, arg));
                    calls.fetch_add(1, AtomicOrdering::Relaxed);
                },
                true,
            )
        };
        assert!(ok && !new);

        let (ok, new) =
            unsafe { list.list.update_at(list.anchor, key_of(5), 5, |_, _, _| {}, false) };
        assert!(!ok && !new);
        assert_eq!(calls.load(AtomicOrdering::Relaxed), 2);
        assert_eq!(list.values(), vec![4]);
    }

    #[test]
    fn test_upsert_replaces_node() {
        let list = Anchored::new();
        assert!(list.insert(10));
        assert!(list.insert(20));

        let before = unsafe {
            list.list
                .get_at(list.anchor, key_of(10), |s: &u64| s.cmp(&10))
                .map(|r| &*r as *const u64)
        };

        assert_eq!(unsafe { list.list.upsert_at(list.anchor, key_of(10), 10, true) }, (true, false));
        assert_eq!(unsafe { list.list.upsert_at(list.anchor, key_of(15), 15, false) }, (false, false));
        assert_eq!(unsafe { list.list.upsert_at(list.anchor, key_of(15), 15, true) }, (true, true));

        let after = unsafe {
            list.list
                .get_at(list.anchor, key_of(10), |s: &u64| s.cmp(&10))
                .map(|r| &*r as *const u64)
        };
        assert_ne!(before, after);
        assert_eq!(list.values(), vec![10, 15, 20]);
    }

    #[test]
    fn test_unlink_by_identity() {
        let list = Anchored::new();
        assert!(list.insert(3));

        let stranger = 3u64;
        assert!(!unsafe { list.list.unlink_at(list.anchor, key_of(3), &stranger) });

        let stored = unsafe { list.list.get_at(list.anchor, key_of(3), |s: &u64| s.cmp(&3)) }
            .map(|r| &*r as *const u64);
        let stored = stored.map(|p| unsafe { &*p });
        assert!(stored.is_some_and(|item| unsafe { list.list.unlink_at(list.anchor, key_of(3), item) }));
        assert!(!list.contains(3));
    }

    #[test]
    fn test_extract_keeps_value_alive() {
        let list = Anchored::new();
        assert!(list.insert(42));

        let extracted = unsafe { list.list.extract_at(list.anchor, key_of(42), |s: &u64| s.cmp(&42)) };
        assert_eq!(extracted.as_deref(), Some(&42));
        assert!(!list.contains(42));
        assert!(unsafe { list.list.extract_at(list.anchor, key_of(42), |s: &u64| s.cmp(&42)) }.is_none());
    }

    #[test]
    fn test_concurrent_insert_erase() {
        let list = Arc::new(Anchored::new());
        let num_threads = 8;
        let per_thread = 500u64;

        let handles: Vec<_> = (0..num_threads)
            .map(|t| {
                let list = Arc::clone(&list);
                thread::spawn(move || {
                    for i in 0..per_thread {
                        let value = t * per_thread + i;
                        assert!(list.insert(value));
                        if i % 2 == 0 {
                            assert!(list.erase(value));
                        }
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        let values = list.values();
        assert_eq!(values.len(), (num_threads * per_thread / 2) as usize);
        assert!(values.windows(2).all(|w| w[0] < w[1]));
        assert!(values.iter().all(|v| v % 2 == 1));
    }

    #[test]
    fn test_concurrent_upsert_with_erase() {
        let list = Arc::new(Anchored::new());
        for value in 0..100 {
            list.insert(value);
        }

        let upserter = {
            let list = Arc::clone(&list);
            thread::spawn(move || {
                for _ in 0..50 {
                    for value in (0..100).step_by(2) {
                        unsafe { list.list.upsert_at(list.anchor, key_of(value), value, false) };
                    }
                }
            })
        };
        let eraser = {
            let list = Arc::clone(&list);
            thread::spawn(move || {
                for value in (1..100).step_by(2) {
                    assert!(list.erase(value));
                }
            })
        };

        upserter.join().unwrap();
        eraser.join().unwrap();

        assert_eq!(list.values(), (0..100).step_by(2).collect::<Vec<_>>());
    }
}
