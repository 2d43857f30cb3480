use std::marker::PhantomData;
use std::ptr::NonNull;

use crate::data_structures::ordered::{OrderedList, SplitNode};
use crate::guard::Guard;

/// Iterator over clones of a set's items, in split order.
///
/// Holds one pin for its whole life, so every node it has reached stays
/// readable. Items inserted or removed meanwhile may or may not be seen.
pub struct Iter<'a, T, L>
where
    T: Ord,
    L: OrderedList<T>,
{
    _guard: <L::Guard as Guard>::ReadGuard,
    list: &'a L,
    current: Option<NonNull<L::Node>>,
    started: bool,
    _phantom: PhantomData<T>,
}

impl<'a, T, L> Iter<'a, T, L>
where
    T: Ord,
    L: OrderedList<T>,
{
    pub(crate) fn new(list: &'a L) -> Self {
        Self {
            _guard: L::Guard::pin(),
            list,
            current: None,
            started: false,
            _phantom: PhantomData,
        }
    }
}

impl<T, L> Iterator for Iter<'_, T, L>
where
    T: Ord + Clone,
    L: OrderedList<T>,
{
    type Item = T;

    fn next(&mut self) -> Option<T> {
        loop {
            if self.started && self.current.is_none() {
                return None;
            }
            self.started = true;

            // Nodes reached under `_guard` are not reclaimed before it drops.
            self.current = unsafe { self.list.next_node(self.current) };
            let node = self.current?;
            if let Some(item) = unsafe { node.as_ref() }.item() {
                return Some(item.clone());
            }
        }
    }
}
