//! Internal implementation details.

pub mod marked_ptr;

pub(crate) use marked_ptr::MarkedPtr;
