mod support;

use anyhow::Result;
use support::{driver_with, driver_with_config, pad_tracer, reshape_tracer};
use tracejit::{
    CacheConfig, CallSiteId, Position, SiteState, TranslateError, TranslateOutcome, Value,
};

fn tensor_3_4_5() -> Value {
    Value::tensor(vec![3, 4, 5])
}

#[test]
fn compile_error_propagates_and_leaves_site_unchanged() -> Result<()> {
    let (driver, backend, _registry) = driver_with(reshape_tracer());
    let site = CallSiteId::new("failing_backend");

    backend.set_failing(true);
    let error = driver
        .translate(&site, &[tensor_3_4_5(), Value::Int(1)])
        .expect_err("backend failure must surface");
    assert!(matches!(error, TranslateError::Compile { .. }));

    let stats = driver.site_stats(&site).expect("site exists");
    assert_eq!(stats.state, SiteState::Cold);
    assert_eq!(stats.entries, 0);
    assert_eq!(stats.translate_count, 0);

    // The site recovers as soon as the backend does.
    backend.set_failing(false);
    let translation = driver.translate(&site, &[tensor_3_4_5(), Value::Int(1)])?;
    assert_eq!(translation.outcome, TranslateOutcome::Concrete);
    assert_eq!(driver.site_stats(&site).expect("site exists").entries, 1);
    Ok(())
}

#[test]
fn failed_compile_does_not_feed_the_failure_history() -> Result<()> {
    let (driver, backend, _registry) = driver_with(reshape_tracer());
    let site = CallSiteId::new("failed_miss_history");

    driver.translate(&site, &[tensor_3_4_5(), Value::Int(1)])?;
    backend.set_failing(true);
    let _ = driver
        .translate(&site, &[tensor_3_4_5(), Value::Int(2)])
        .expect_err("backend failure");
    backend.set_failing(false);

    // The failed miss left no record, so this is still the first distinct
    // value after n=1 and generalizes as usual.
    let translation = driver.translate(&site, &[tensor_3_4_5(), Value::Int(2)])?;
    assert_eq!(translation.outcome, TranslateOutcome::Generalized);
    Ok(())
}

#[test]
fn failed_compile_leaves_no_breakgraph_marker() -> Result<()> {
    let (driver, backend, registry) = driver_with(pad_tracer());
    let site = CallSiteId::new("failed_blocked_miss");

    driver.translate(&site, &[tensor_3_4_5(), Value::Int(1)])?;
    backend.set_failing(true);
    let _ = driver
        .translate(&site, &[tensor_3_4_5(), Value::Int(2)])
        .expect_err("backend failure");

    // The miss would have pinned the pad width, but the compile failed,
    // so the site carries no trace of it.
    let call_site = registry.get(&site).expect("site exists");
    assert!(!call_site.is_breakgraph_marked(Position::arg(1)));
    assert_eq!(call_site.entry_count(), 1);

    // Replaying the miss after recovery re-derives the same decision.
    backend.set_failing(false);
    let translation = driver.translate(&site, &[tensor_3_4_5(), Value::Int(2)])?;
    assert_eq!(translation.outcome, TranslateOutcome::Blocked);
    assert!(call_site.is_breakgraph_marked(Position::arg(1)));
    Ok(())
}

#[test]
fn disabling_dynamic_dims_compiles_every_distinct_value() -> Result<()> {
    let config = CacheConfig {
        allow_dynamic_dims: false,
        ..CacheConfig::default()
    };
    let (driver, backend, _registry) = driver_with_config(reshape_tracer(), config);
    let site = CallSiteId::new("static_only");

    for n in 1..5 {
        let translation = driver.translate(&site, &[tensor_3_4_5(), Value::Int(n)])?;
        assert_eq!(translation.outcome, TranslateOutcome::Concrete);
    }
    assert_eq!(backend.compile_count(), 4);
    assert_eq!(
        driver.site_stats(&site).expect("site exists").state,
        SiteState::Specialized
    );
    Ok(())
}

#[test]
fn registry_clear_isolates_runs() -> Result<()> {
    let (driver, backend, registry) = driver_with(reshape_tracer());
    let site = CallSiteId::new("cleared");

    driver.translate(&site, &[tensor_3_4_5(), Value::Int(1)])?;
    assert_eq!(registry.len(), 1);

    registry.clear();
    assert!(registry.is_empty());
    assert!(driver.site_stats(&site).is_none());

    // A fresh run starts cold again.
    let translation = driver.translate(&site, &[tensor_3_4_5(), Value::Int(1)])?;
    assert_eq!(translation.outcome, TranslateOutcome::Concrete);
    assert_eq!(backend.compile_count(), 2);
    Ok(())
}

#[test]
fn call_site_bound_is_reported_not_enforced() -> Result<()> {
    let config = CacheConfig {
        max_call_sites: 1,
        ..CacheConfig::default()
    };
    let (driver, _backend, registry) = driver_with_config(reshape_tracer(), config);

    driver.translate(&CallSiteId::new("site_a"), &[tensor_3_4_5(), Value::Int(1)])?;
    driver.translate(&CallSiteId::new("site_b"), &[tensor_3_4_5(), Value::Int(1)])?;

    assert_eq!(registry.len(), 2);
    assert!(registry.site_overflow() >= 1);
    Ok(())
}

#[test]
fn report_json_lists_every_site() -> Result<()> {
    let (driver, _backend, registry) = driver_with(reshape_tracer());
    driver.translate(&CallSiteId::new("alpha"), &[tensor_3_4_5(), Value::Int(1)])?;
    driver.translate(&CallSiteId::new("beta"), &[tensor_3_4_5(), Value::Int(1)])?;

    let report = registry.report_json()?;
    let parsed: serde_json::Value = serde_json::from_str(&report)?;
    let sites = parsed.as_array().expect("array of site stats");
    assert_eq!(sites.len(), 2);
    assert_eq!(sites[0]["site"], "alpha");
    assert_eq!(sites[0]["translate_count"], 1);
    assert_eq!(sites[1]["site"], "beta");
    Ok(())
}

#[test]
fn global_registry_is_shared_and_clearable() {
    let registry = tracejit::global();
    registry.clear();
    assert!(registry.is_empty());
    let site = registry.site(&CallSiteId::new("global_site"));
    assert_eq!(site.state(), SiteState::Cold);
    assert_eq!(registry.len(), 1);
    registry.clear();
}
