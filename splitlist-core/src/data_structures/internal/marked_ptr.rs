// Link pointers of the ordered list carry two tag bits in their low bits.
// Nodes are at least word aligned, so both bits are always free.
//
//   0b00: live link
//   0b01: DELETED  - the node owning this link is logically erased
//   0b10: REPLACED - the node owning this link was superseded by an upsert;
//                    the link points at the replacement node
//
// A link never carries both bits: a replaced node is never erased and an
// erased node is never replaced.
//
const DELETED: usize = 0b01;
const REPLACED: usize = 0b10;
const TAG_MASK: usize = DELETED | REPLACED;

/// A possibly tagged copy of a `next` link.
pub(crate) struct MarkedPtr<T> {
    raw: *mut T,
}

impl<T> Clone for MarkedPtr<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for MarkedPtr<T> {}

impl<T> MarkedPtr<T> {
    #[inline]
    pub(crate) fn new(raw: *mut T) -> Self {
        MarkedPtr { raw }
    }

    /// Strip tag bits from a raw link.
    #[inline]
    pub(crate) fn unmask(raw: *mut T) -> *mut T {
        (raw as usize & !TAG_MASK) as *mut T
    }

    /// The dereferenceable pointer.
    #[inline]
    pub(crate) fn as_ptr(&self) -> *mut T {
        Self::unmask(self.raw)
    }

    /// The link exactly as stored, tags included (for CAS).
    #[inline]
    pub(crate) fn as_raw(&self) -> *mut T {
        self.raw
    }

    #[inline]
    pub(crate) fn is_deleted(&self) -> bool {
        self.raw as usize & DELETED != 0
    }

    #[inline]
    pub(crate) fn is_replaced(&self) -> bool {
        self.raw as usize & REPLACED != 0
    }

    #[inline]
    pub(crate) fn is_any_marked(&self) -> bool {
        self.raw as usize & TAG_MASK != 0
    }

    /// Same target, tagged as deleted.
    #[inline]
    pub(crate) fn deleted(&self) -> Self {
        MarkedPtr::new((self.as_ptr() as usize | DELETED) as *mut T)
    }

    /// Link to `replacement`, tagged as replaced.
    #[inline]
    pub(crate) fn replaced_by(replacement: *mut T) -> Self {
        MarkedPtr::new((Self::unmask(replacement) as usize | REPLACED) as *mut T)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tags_round_trip() {
        let value = Box::into_raw(Box::new(7u64));
        let link = MarkedPtr::new(value);
        assert!(!link.is_any_marked());

        let deleted = link.deleted();
        assert!(deleted.is_deleted());
        assert!(!deleted.is_replaced());
        assert_eq!(deleted.as_ptr(), value);
        assert_ne!(deleted.as_raw(), value);

        let replaced = MarkedPtr::replaced_by(value);
        assert!(replaced.is_replaced());
        assert!(!replaced.is_deleted());
        assert_eq!(MarkedPtr::unmask(replaced.as_raw()), value);

        unsafe { drop(Box::from_raw(value)) };
    }
}
