use std::error::Error;

mod common;
mod scenarios;
#[cfg(feature = "mp")]
mod mp_roundtrip;

#[test]
fn diamond_dependency_propagates_to_all_consumers() -> Result<(), Box<dyn Error>> {
    scenarios::diamond()
}

#[test]
fn a_failed_producer_fails_its_consumers() -> Result<(), Box<dyn Error>> {
    scenarios::propagated_failure()
}

#[test]
fn fetch_blocks_until_the_producer_actually_finishes() -> Result<(), Box<dyn Error>> {
    scenarios::timing()
}

#[test]
fn a_linear_chain_blocks_end_to_end() -> Result<(), Box<dyn Error>> {
    scenarios::chain_blocking()
}

#[test]
fn duplicate_capability_is_rejected_at_bootstrap() -> Result<(), Box<dyn Error>> {
    scenarios::duplicate_capability()
}

#[test]
fn an_empty_configuration_is_a_trivial_success() -> Result<(), Box<dyn Error>> {
    scenarios::zero_real_components_is_a_trivial_success()
}

#[test]
fn a_numeric_pipeline_sums_through_nested_adders() -> Result<(), Box<dyn Error>> {
    scenarios::numeric_pipeline_sums_through_adders()
}

#[test]
fn an_adder_fed_a_non_numeric_addend_fails() -> Result<(), Box<dyn Error>> {
    scenarios::adder_rejects_a_non_numeric_addend()
}

#[test]
#[cfg(feature = "mp")]
fn multi_process_round_trip() -> Result<(), Box<dyn Error>> {
    mp_roundtrip::multi_process_round_trip()
}
