use rstest::rstest;
use serial_test::serial;
use splitlist_core::common_tests::split_list_stress_tests::*;
use splitlist_core::{DefaultPolicy, DeferredGuard, HarrisList, SplitListPolicy, StaticPolicy};

type DeferredList = HarrisList<u64, DeferredGuard>;

// Trait for type-level parametrization
trait TestPolicy {
    type Policy: SplitListPolicy;
}

// Marker types for each bucket table
struct UseExpandable;
struct UseStatic;

impl TestPolicy for UseExpandable {
    type Policy = DefaultPolicy;
}

impl TestPolicy for UseStatic {
    type Policy = StaticPolicy;
}

#[rstest]
#[serial(stress_tests)]
#[case::expandable(UseExpandable)]
#[case::static_table(UseStatic)]
fn stress_at_most_one_winner<T: TestPolicy>(#[case] _type: T) {
    test_at_most_one_winner::<DeferredList, T::Policy>();
}

#[rstest]
#[serial(stress_tests)]
#[case::expandable(UseExpandable)]
#[case::static_table(UseStatic)]
fn stress_concurrent_erase_same_key<T: TestPolicy>(#[case] _type: T) {
    test_concurrent_erase_same_key::<DeferredList, T::Policy>();
}

#[rstest]
#[serial(stress_tests)]
#[case::expandable(UseExpandable)]
#[case::static_table(UseStatic)]
fn stress_count_accuracy<T: TestPolicy>(#[case] _type: T) {
    test_concurrent_count_accuracy::<DeferredList, T::Policy>();
}

#[rstest]
#[serial(stress_tests)]
#[case::expandable(UseExpandable)]
#[case::static_table(UseStatic)]
fn stress_concurrent_growth<T: TestPolicy>(#[case] _type: T) {
    let _ = env_logger::builder().is_test(true).try_init();
    test_concurrent_growth::<DeferredList, T::Policy>();
}

#[rstest]
#[serial(stress_tests)]
#[case::expandable(UseExpandable)]
#[case::static_table(UseStatic)]
fn stress_monotonic_growth<T: TestPolicy>(#[case] _type: T) {
    test_monotonic_growth_under_load::<DeferredList, T::Policy>();
}

#[rstest]
#[serial(stress_tests)]
#[case::expandable(UseExpandable)]
#[case::static_table(UseStatic)]
fn stress_upsert_visibility<T: TestPolicy>(#[case] _type: T) {
    test_upsert_keeps_key_visible::<DeferredList, T::Policy>();
}

#[rstest]
#[serial(stress_tests)]
#[case::expandable(UseExpandable)]
#[case::static_table(UseStatic)]
fn stress_find_during_modifications<T: TestPolicy>(#[case] _type: T) {
    test_find_during_modifications::<DeferredList, T::Policy>();
}

#[rstest]
#[serial(stress_tests)]
#[case::expandable(UseExpandable)]
#[case::static_table(UseStatic)]
fn stress_clear_during_inserts<T: TestPolicy>(#[case] _type: T) {
    test_clear_during_inserts::<DeferredList, T::Policy>();
}
