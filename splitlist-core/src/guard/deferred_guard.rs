//! Deferred guard implementation for testing.
//!
//! `DeferredGuard` keeps every retired node alive until the guard is dropped
//! (or until the owning container calls `force_dispose` on its way out).

use std::collections::HashSet;
use std::ops::Deref;
use std::sync::Mutex;

use super::Guard;

/// A simple guard that defers all node destruction until the guard is dropped.
///
/// Destruction timing is predictable, which is what the test suites want.
/// Memory accumulates for the lifetime of the container, so this is not a
/// production strategy.
///
pub struct DeferredGuard {
    deferred: Mutex<Vec<DeferredNode>>,
    #[cfg(debug_assertions)]
    seen: Mutex<HashSet<usize>>,
}

struct DeferredNode {
    ptr: *mut (),
    dealloc: unsafe fn(*mut ()),
}

// Safety: the pointer is only dereferenced by `dealloc`, under the Mutex or
// from `Drop` with exclusive access.
unsafe impl Send for DeferredNode {}

impl DeferredGuard {
    pub fn new() -> Self {
        DeferredGuard {
            deferred: Mutex::new(Vec::new()),
            #[cfg(debug_assertions)]
            seen: Mutex::new(HashSet::new()),
        }
    }

    /// Number of nodes waiting for destruction.
    pub fn pending(&self) -> usize {
        self.deferred.lock().map(|nodes| nodes.len()).unwrap_or(0)
    }

    fn dispose_all(nodes: &mut Vec<DeferredNode>) {
        // Duplicates would mean a node was unlinked twice; catch it before
        // freeing anything.
        let mut addresses: HashSet<usize> = HashSet::with_capacity(nodes.len());
        let duplicates = nodes
            .iter()
            .filter(|node| !addresses.insert(node.ptr as usize))
            .count();
        if duplicates > 0 {
            panic!("Found {} duplicate pointer(s) in deferred list", duplicates);
        }

        for node in nodes.drain(..) {
            unsafe {
                (node.dealloc)(node.ptr);
            }
        }
    }
}

impl Default for DeferredGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for DeferredGuard {
    fn drop(&mut self) {
        let nodes = match self.deferred.get_mut() {
            Ok(nodes) => nodes,
            Err(poisoned) => poisoned.into_inner(),
        };
        Self::dispose_all(nodes);
    }
}

/// A plain reference wrapper for DeferredGuard.
///
/// Since DeferredGuard defers all destruction until drop, the reference is
/// valid for as long as the container that handed it out.
///
pub struct DeferredRef<'a, T> {
    data: &'a T,
}

impl<'a, T> DeferredRef<'a, T> {
    pub fn new(data: &'a T) -> Self {
        DeferredRef { data }
    }
}

impl<T> Deref for DeferredRef<'_, T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        self.data
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for DeferredRef<'_, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "DeferredRef({:?})", self.data)
    }
}

impl Guard for DeferredGuard {
    type GuardedRef<'a, T: 'a> = DeferredRef<'a, T>;

    type ReadGuard = ();

    fn pin() -> Self::ReadGuard {}

    unsafe fn defer_destroy<N>(&self, node: *mut N, dealloc: unsafe fn(*mut N)) {
        #[cfg(debug_assertions)]
        {
            let addr = node as usize;
            let mut seen = self.seen.lock().unwrap_or_else(|e| e.into_inner());
            if !seen.insert(addr) {
                panic!("DUPLICATE defer_destroy at {:#x}", addr);
            }
        }

        let node = DeferredNode {
            ptr: node as *mut (),
            dealloc: unsafe {
                std::mem::transmute::<unsafe fn(*mut N), unsafe fn(*mut ())>(dealloc)
            },
        };
        self.deferred
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(node);
    }

    unsafe fn make_ref<'a, T: 'a>(ptr: *const T) -> Self::GuardedRef<'a, T> {
        DeferredRef::new(unsafe { &*ptr })
    }

    fn force_dispose(&self) {
        let mut nodes = self.deferred.lock().unwrap_or_else(|e| e.into_inner());
        Self::dispose_all(&mut nodes);

        // Freed addresses may be handed out again by the allocator.
        #[cfg(debug_assertions)]
        self.seen.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }
}
