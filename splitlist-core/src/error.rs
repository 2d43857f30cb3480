/// Largest load factor a builder accepts.
pub const MAX_LOAD_FACTOR: usize = 64;

/// The error type for rejected [`SplitListBuilder`][builder] settings.
///
/// Nothing else in this crate fails with an error: absent keys and duplicate
/// inserts are ordinary `bool` / `Option` results.
///
/// [builder]: crate::SplitListBuilder
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Buckets longer than this on average defeat the point of hashing.
    #[error("load factor {0} exceeds the maximum of {max}", max = MAX_LOAD_FACTOR)]
    LoadFactorTooLarge(usize),

    /// The item estimate needs more buckets than the split order can key.
    #[error(
        "{item_count} items at load factor {load_factor} need more than \
    {max_buckets} buckets"
    )]
    CapacityOverflow {
        item_count: usize,
        load_factor: usize,
        max_buckets: usize,
    },
}
