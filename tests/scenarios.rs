use crate::common::{adder, config_of, dummy, dummy_with_delay, number_source};
use modelcoupler::orchestrator::run_single_process;
use std::error::Error;
use std::time::Instant;

pub(crate) fn diamond() -> Result<(), Box<dyn Error>> {
    let config = config_of(vec![
        dummy("A", "a", &[]),
        dummy("B", "b", &[]),
        dummy("C", "c", &["a", "b"]),
        dummy("D", "d", &["c"]),
    ]);
    let report = run_single_process(&config)?;
    assert!(report.success(), "expected all four components to succeed");
    assert_eq!(report.total, 4);
    Ok(())
}

pub(crate) fn propagated_failure() -> Result<(), Box<dyn Error>> {
    let mut producer = dummy("A", "a", &[]);
    producer
        .params
        .insert("fail".into(), modelcoupler::component::ParamValue::Scalar("true".into()));
    let config = config_of(vec![producer, dummy("B", "b", &["a"])]);

    let report = run_single_process(&config)?;
    assert!(!report.success());
    assert_eq!(report.failed.len(), 2, "both producer and consumer must end up FAILURE");
    Ok(())
}

pub(crate) fn timing() -> Result<(), Box<dyn Error>> {
    let config = config_of(vec![
        dummy_with_delay("Z", "z", &[], &[], 1000),
        dummy_with_delay("X", "x", &["z"], &[1000], 0),
        dummy_with_delay("Y", "y", &["z"], &[0], 0),
    ]);
    let start = Instant::now();
    let report = run_single_process(&config)?;
    let elapsed = start.elapsed();
    assert!(report.success());
    // Z finishes at ~1s; X delays 1s before fetching, then blocks for Z's
    // remaining ~0s, landing at ~2s. Y fetches immediately and blocks until
    // Z is done, also landing at ~1s. The whole run is bounded by X.
    assert!(elapsed.as_millis() >= 1900, "run finished suspiciously early: {:?}", elapsed);
    assert!(elapsed.as_millis() < 3500, "run took suspiciously long: {:?}", elapsed);
    Ok(())
}

pub(crate) fn chain_blocking() -> Result<(), Box<dyn Error>> {
    const K: usize = 5;
    const LINK_DELAY_MS: u64 = 100;

    let mut sections = Vec::with_capacity(K);
    for i in 0..K {
        let name = format!("N{}", i);
        let produces = format!("n{}", i);
        let depends_on: Vec<String> = if i + 1 < K {
            vec![format!("n{}", i + 1)]
        } else {
            Vec::new()
        };
        let deps: Vec<&str> = depends_on.iter().map(String::as_str).collect();
        sections.push(dummy_with_delay(&name, &produces, &deps, &[], LINK_DELAY_MS));
    }
    let config = config_of(sections);

    let start = Instant::now();
    let report = run_single_process(&config)?;
    let elapsed = start.elapsed();
    assert!(report.success());

    let expected_ms = LINK_DELAY_MS as u128 * K as u128;
    assert!(
        elapsed.as_millis() >= expected_ms,
        "chain finished too fast: {:?} (expected >= {}ms)",
        elapsed,
        expected_ms
    );
    assert!(
        elapsed.as_millis() < expected_ms + 2000,
        "chain took too long: {:?} (expected ~{}ms)",
        elapsed,
        expected_ms
    );
    Ok(())
}

pub(crate) fn duplicate_capability() -> Result<(), Box<dyn Error>> {
    let config = config_of(vec![dummy("A", "same", &[]), dummy("B", "same", &[])]);
    let err = run_single_process(&config).expect_err("duplicate capability must be rejected");
    assert!(matches!(
        err.kind(),
        modelcoupler::errors::ErrorKind::ConfigError(_)
    ));
    Ok(())
}

pub(crate) fn zero_real_components_is_a_trivial_success() -> Result<(), Box<dyn Error>> {
    let config = config_of(vec![]);
    let report = run_single_process(&config)?;
    assert!(report.success());
    assert_eq!(report.total, 0);
    Ok(())
}

pub(crate) fn numeric_pipeline_sums_through_adders() -> Result<(), Box<dyn Error>> {
    let config = config_of(vec![
        number_source("Two", "two", 2.0),
        number_source("Three", "three", 3.0),
        adder("PartialSum", "partial", &["two", "three"]),
        number_source("Four", "four", 4.0),
        adder("Total", "total", &["partial", "four"]),
    ]);
    let report = run_single_process(&config)?;
    assert!(report.success(), "numeric pipeline must complete without failure");
    assert_eq!(report.total, 5);
    Ok(())
}

pub(crate) fn adder_rejects_a_non_numeric_addend() -> Result<(), Box<dyn Error>> {
    let config = config_of(vec![
        dummy("Text", "text", &[]),
        adder("Sum", "sum", &["text"]),
    ]);
    let report = run_single_process(&config)?;
    assert!(!report.success());
    assert!(report.failed.contains(&"Sum".to_string()));
    Ok(())
}
