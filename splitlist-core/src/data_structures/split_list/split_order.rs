//! Split-order key derivation.
//!
//! A hash `h` lands in bucket `h & (2^L - 1)`. Reversing the bits of `h`
//! moves exactly those low bits to the top of the key, so sorting by the
//! reversed value keeps every bucket's items contiguous, and doubling the
//! bucket count splits each run in two without moving anything.
//!
//! The lowest bit of the reversed value is the marker: set for items,
//! clear for bucket sentinels. It is the image of the hash's highest bit,
//! which is why a split order addresses at most `2^(HASH_BITS - 1)` buckets.
//!
//! ```text
//! bucket 0 sentinel   0000..0000   (dummy_key(0))
//! item h = ..0100      0010..0001   (regular_key)
//! bucket 2 sentinel   0100..0000   (dummy_key(2))
//! item h = ..0010      0100..0001
//! bucket 1 sentinel   1000..0000   (dummy_key(1))
//! ```

/// Key derivation for one hash width.
///
pub trait SplitOrder: Send + Sync + 'static {
    /// Number of hash bits taking part in the order.
    const HASH_BITS: u32;

    /// Bit that tells item keys from sentinel keys.
    const MARKER: usize = 1;

    /// Reverse the low `HASH_BITS` bits of `hash`.
    fn reverse(hash: usize) -> usize;

    /// Key of an item with hash `hash`. Always has the marker set.
    #[inline]
    fn regular_key(hash: usize) -> usize {
        Self::reverse(hash) | Self::MARKER
    }

    /// Key of the sentinel of `bucket`. Never has the marker set.
    #[inline]
    fn dummy_key(bucket: usize) -> usize {
        Self::reverse(bucket) & !Self::MARKER
    }

    /// Largest bucket count whose sentinel keys are all distinct.
    #[inline]
    fn max_buckets() -> usize {
        1usize << (Self::HASH_BITS - 1)
    }
}

/// Reversal over the full machine word.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeSplitOrder;

impl SplitOrder for NativeSplitOrder {
    const HASH_BITS: u32 = usize::BITS;

    #[inline]
    fn reverse(hash: usize) -> usize {
        hash.reverse_bits()
    }
}

/// Reversal inside the low `BITS` bits only; higher hash bits are ignored.
///
/// Useful for hashers that only fill part of the word, or to keep keys small
/// enough to read in a debugger.
#[derive(Debug, Clone, Copy, Default)]
pub struct NarrowSplitOrder<const BITS: u32>;

impl<const BITS: u32> NarrowSplitOrder<BITS> {
    const VALID: () = assert!(
        BITS >= 2 && BITS <= usize::BITS,
        "NarrowSplitOrder needs between 2 and usize::BITS bits"
    );

    const MASK: usize = if BITS == usize::BITS {
        usize::MAX
    } else {
        (1usize << BITS) - 1
    };
}

impl<const BITS: u32> SplitOrder for NarrowSplitOrder<BITS> {
    const HASH_BITS: u32 = {
        let () = Self::VALID;
        BITS
    };

    #[inline]
    fn reverse(hash: usize) -> usize {
        (hash & Self::MASK).reverse_bits() >> (usize::BITS - BITS)
    }
}

/// Bucket of `hash` when the table has `2^log2` buckets.
#[inline]
pub fn bucket_no(hash: usize, log2: usize) -> usize {
    hash & ((1usize << log2) - 1)
}

/// `bucket` with its highest set bit cleared. Bucket 0 has no parent.
#[inline]
pub fn parent_bucket(bucket: usize) -> usize {
    debug_assert!(bucket != 0, "bucket 0 has no parent");
    let top = usize::BITS - 1 - bucket.leading_zeros();
    bucket & !(1usize << top)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_marker_separates_kinds() {
        for bucket in 0..1024usize {
            let dummy = NativeSplitOrder::dummy_key(bucket);
            assert_eq!(dummy & NativeSplitOrder::MARKER, 0);
            assert_eq!(NativeSplitOrder::regular_key(bucket) & NativeSplitOrder::MARKER, 1);
            // An item whose hash is the bucket index sorts right after that sentinel.
            assert_eq!(NativeSplitOrder::regular_key(bucket), dummy | 1);
        }
    }

    #[test]
    fn test_bucket_runs_are_contiguous() {
        let log2 = 3;
        let mut keys: Vec<(usize, bool, usize)> = (0..(1usize << log2))
            .map(|b| (NativeSplitOrder::dummy_key(b), true, b))
            .chain((0..500usize).map(|h| {
                (NativeSplitOrder::regular_key(h), false, bucket_no(h, log2))
            }))
            .collect();
        keys.sort();

        // Every item belongs to the bucket of the last sentinel before it.
        let mut current = None;
        for (_, is_dummy, bucket) in keys {
            if is_dummy {
                current = Some(bucket);
            } else {
                assert_eq!(current, Some(bucket));
            }
        }
    }

    #[test]
    fn test_child_sorts_after_parent() {
        for bucket in 1..4096usize {
            let parent = parent_bucket(bucket);
            assert!(parent < bucket);
            assert!(NativeSplitOrder::dummy_key(parent) < NativeSplitOrder::dummy_key(bucket));
        }
    }

    #[test]
    fn test_parent_bucket() {
        assert_eq!(parent_bucket(1), 0);
        assert_eq!(parent_bucket(2), 0);
        assert_eq!(parent_bucket(3), 1);
        assert_eq!(parent_bucket(6), 2);
        assert_eq!(parent_bucket(13), 5);
        assert_eq!(parent_bucket(usize::MAX), usize::MAX >> 1);
    }

    #[test]
    fn test_bucket_no() {
        assert_eq!(bucket_no(0b1011_0110, 1), 0);
        assert_eq!(bucket_no(0b1011_0110, 3), 0b110);
        assert_eq!(bucket_no(usize::MAX, 5), 31);
    }

    #[test]
    fn test_narrow_order() {
        type Order = NarrowSplitOrder<8>;
        assert_eq!(Order::max_buckets(), 128);
        assert_eq!(Order::reverse(0b0000_0001), 0b1000_0000);
        assert_eq!(Order::reverse(0b1100_0000), 0b0000_0011);
        // Bits above the width do not take part.
        assert_eq!(Order::reverse(0x1_0000_0001), 0b1000_0000);

        assert_eq!(Order::dummy_key(1), 0b1000_0000);
        assert_eq!(Order::regular_key(1), 0b1000_0001);
        assert!(Order::dummy_key(3) < Order::regular_key(3));
    }

    #[test]
    fn test_native_max_buckets() {
        assert_eq!(NativeSplitOrder::max_buckets(), 1usize << (usize::BITS - 1));
        assert_eq!(NarrowSplitOrder::<{ usize::BITS }>::reverse(1), NativeSplitOrder::reverse(1));
    }
}
