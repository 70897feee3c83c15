use std::path::Path;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use gridprobe_harness::bootstrap::{Bootstrap, BootstrapReport, REQUIRED_FUNCTIONS};
use gridprobe_harness::modules::{probe_module, register_orchestrator};
use gridprobe_harness::orchestrator::{Implementation, Orchestrator};
use gridprobe_harness::sim::SimHost;
use gridprobe_host::{CallContext, FunctionSpec, HostCall, ThreadSample, Value};
use gridprobe_probes::ProbeSet;
use gridprobe_registry::RegistrationTable;

struct Fixture {
    host: SimHost,
    table: Arc<RegistrationTable>,
    orchestrator: Arc<Orchestrator>,
    bootstrap: Bootstrap,
    report: BootstrapReport,
}

/// Full fixture: both probe modules installed, orchestrator registered,
/// bootstrap run. Probes use zero delay so timing loops stay fast.
fn setup() -> Fixture {
    setup_with(&["probes_alpha.xmod", "probes_beta.xmod"])
}

fn setup_with(siblings: &[&str]) -> Fixture {
    let host = SimHost::new();
    let table = Arc::new(RegistrationTable::new());
    let probes = ProbeSet::with_delay(Duration::ZERO);

    for file_name in siblings {
        let implementation = if file_name.contains("alpha") {
            Implementation::Alpha
        } else {
            Implementation::Beta
        };
        host.install_module(
            Path::new("pack").join(file_name),
            probe_module(implementation, probes.clone(), Arc::clone(&table)),
        );
    }

    let orchestrator = register_orchestrator(&host, Arc::clone(&table));
    let mut bootstrap = Bootstrap::new("pack/harness.xmod", Arc::clone(&table));
    let report = bootstrap.run(&host);

    Fixture {
        host,
        table,
        orchestrator,
        bootstrap,
        report,
    }
}

fn parse_nested(text: &str) -> (u64, u64) {
    let (outer, inner) = text.split_once("; ").unwrap_or_else(|| panic!("bad report: {text}"));
    let outer = outer
        .strip_prefix("OuterThread:")
        .unwrap_or_else(|| panic!("bad outer: {text}"))
        .parse()
        .unwrap();
    let inner = inner
        .strip_prefix("InnerThread:")
        .unwrap_or_else(|| panic!("bad inner: {text}"))
        .parse()
        .unwrap();
    (outer, inner)
}

fn parse_compare(text: &str) -> (f64, f64) {
    let (alpha, beta) = text
        .split_once("; beta: ")
        .unwrap_or_else(|| panic!("bad report: {text}"));
    let alpha = alpha
        .strip_prefix("alpha: ")
        .unwrap_or_else(|| panic!("bad report: {text}"))
        .parse()
        .unwrap();
    (alpha, beta.parse().unwrap())
}

#[test]
fn bootstrap_resolves_all_required_names() {
    let f = setup();

    assert!(f.report.is_clean(), "warnings: {:?}", f.report.warnings);
    assert_eq!(f.report.loaded.len(), 2);
    assert_eq!(f.report.resolved, REQUIRED_FUNCTIONS.len());
    assert_eq!(
        f.report.log_line(),
        "[bootstrap] 2 module(s) loaded  10 name(s) resolved  warnings=0"
    );

    for name in REQUIRED_FUNCTIONS {
        assert!(f.table.try_get(name).is_some(), "{name} not cached");
    }
}

#[test]
fn nested_call_internal_shares_thread_with_direct_invoke() {
    let f = setup();
    let ctx = CallContext::new(ThreadSample::capture(), &f.host);

    let report = f.orchestrator.nested_call(&ctx, false);
    let (outer, inner) = parse_nested(&report);

    // The simulated host runs the inner call on the dispatching thread.
    assert_eq!(outer, inner);
    assert_eq!(outer, ctx.thread.thread_id);
}

#[test]
fn nested_call_external_matches_direct_inner_call() {
    let f = setup();
    let ctx = CallContext::new(ThreadSample::capture(), &f.host);

    let nested = f.orchestrator.nested_call(&ctx, true);
    let (_, nested_inner) = parse_nested(&nested);

    let handle = f.table.try_get("alpha_inner_thread_info").unwrap();
    let direct = f.host.invoke(handle, &[]).unwrap();
    let direct_inner: u64 = direct
        .to_string()
        .strip_prefix("InnerThread:")
        .unwrap()
        .parse()
        .unwrap();

    assert_eq!(nested_inner, direct_inner);
}

#[test]
fn nested_call_end_to_end_through_host() {
    let f = setup();
    let handle = f.host.resolve_name("ts_nested_thread_info").unwrap();

    let result = f.host.invoke(handle, &[Value::Bool(true)]).unwrap();
    let (outer, inner) = parse_nested(&result.to_string());
    assert_eq!(outer, inner);

    // Omitted argument defaults to the same-module inner probe.
    let result = f.host.invoke(handle, &[]).unwrap();
    parse_nested(&result.to_string());
}

#[test]
fn compare_implementations_agrees_within_tolerance() {
    let f = setup();
    let ctx = CallContext::new(ThreadSample::capture(), &f.host);

    let report = f.orchestrator.compare_implementations(&ctx, 5.0);
    let (alpha, beta) = parse_compare(&report);

    assert!((alpha - beta).abs() < 1e-9, "{report}");

    let expected = 25.0 + 5.0_f64.sin() + ctx.thread.thread_id as f64;
    assert!((alpha - expected).abs() < 1e-9, "{report}");
}

#[test]
fn performance_loop_clamps_iterations() {
    let f = setup();
    let ctx = CallContext::new(ThreadSample::capture(), &f.host);

    for (requested, expected) in [(1, 1), (10, 10), (1000, 1000), (5000, 1000)] {
        let sample = f
            .orchestrator
            .performance_loop(&ctx, 5.0, requested, Implementation::Alpha);
        assert_eq!(sample.iterations, expected, "requested {requested}");
        assert!(sample.elapsed_ms >= 0.0);
    }

    let sample = f
        .orchestrator
        .performance_loop(&ctx, 5.0, 5000, Implementation::Beta);
    assert!(sample.log_line().starts_with("iterations=1000 "));
}

#[test]
fn performance_loop_reports_final_iteration_result() {
    let f = setup();
    let ctx = CallContext::new(ThreadSample::capture(), &f.host);

    let sample = f
        .orchestrator
        .performance_loop(&ctx, 5.0, 10, Implementation::Alpha);

    // Last iteration dispatched input 5 + 9 on this same thread.
    let handle = f.table.try_get("alpha_thread_calc").unwrap();
    let direct = f.host.invoke(handle, &[Value::Number(14.0)]).unwrap();

    let last = match sample.last_result {
        Value::Number(n) => n,
        other => panic!("expected number, got {other:?}"),
    };
    let direct = match direct {
        Value::Number(n) => n,
        other => panic!("expected number, got {other:?}"),
    };
    assert!((last - direct).abs() < 1e-9);
}

#[test]
fn compare_performance_reports_both_loops() {
    let f = setup();
    let ctx = CallContext::new(ThreadSample::capture(), &f.host);

    let report = f.orchestrator.compare_performance(&ctx, 5.0, 2000);
    assert!(report.starts_with("alpha: "), "{report}");
    assert!(report.contains("; beta: "), "{report}");
    assert!(report.contains("ms"), "{report}");
}

#[test]
fn unresolvable_name_becomes_error_text() {
    let f = setup();

    let result = f
        .orchestrator
        .dispatcher()
        .invoke_registered(&f.host, "no_such_probe", &[]);

    match result {
        Value::Text(text) => assert!(text.starts_with("Error:"), "{text}"),
        other => panic!("expected text, got {other:?}"),
    }
}

#[test]
fn invoke_by_name_populates_table_at_outermost_site() {
    let f = setup();

    assert!(f.table.try_get("alpha_power_sum").is_none());
    let result = f.orchestrator.dispatcher().invoke_by_name(
        &f.host,
        "alpha_power_sum",
        &[Value::Number(2.0), Value::Number(5.0)],
    );

    assert!(result.to_string().starts_with("Advanced: Thread "));
    assert!(f.table.try_get("alpha_power_sum").is_some());
}

#[test]
fn steady_state_dispatch_never_returns_to_host_for_names() {
    let f = setup();
    let ctx = CallContext::new(ThreadSample::capture(), &f.host);
    let before = f.host.resolve_count();

    f.orchestrator.nested_call(&ctx, true);
    f.orchestrator.compare_implementations(&ctx, 3.0);
    f.orchestrator
        .performance_loop(&ctx, 3.0, 10, Implementation::Alpha);
    f.orchestrator
        .aggregate_multi_call(&ctx, 3.0, Implementation::Beta);

    assert_eq!(f.host.resolve_count(), before);
}

#[test]
fn aggregate_multi_call_reports_every_slot() {
    let f = setup();
    let ctx = CallContext::new(ThreadSample::capture(), &f.host);

    let report = f
        .orchestrator
        .aggregate_multi_call(&ctx, 4.0, Implementation::Alpha);

    assert!(report.starts_with(&format!("Thread: {}", ctx.thread.thread_id)));
    assert!(report.contains(", Calc: "), "{report}");
    assert!(report.contains(", Doubled: "), "{report}");
    assert!(report.contains(", Info: Thread: "), "{report}");
}

#[test]
fn aggregate_folds_failures_per_slot_and_continues() {
    let f = setup();
    let ctx = CallContext::new(ThreadSample::capture(), &f.host);

    // Unloading beta leaves stale handles in the table; every beta dispatch
    // must fail cleanly in its own slot while the batch still completes.
    f.host
        .unload_module(Path::new("pack/probes_beta.xmod"))
        .unwrap();

    let report = f
        .orchestrator
        .aggregate_multi_call(&ctx, 4.0, Implementation::Beta);

    assert!(report.starts_with("Thread: "), "{report}");
    assert_eq!(report.matches("Error:").count(), 3, "{report}");
}

#[test]
fn nested_add_caller_dispatches_through_registry() {
    let f = setup();
    let handle = f.host.resolve_name("alpha_add_caller").unwrap();

    let result = f
        .host
        .invoke(handle, &[Value::Number(2.0), Value::Number(3.0)])
        .unwrap();
    assert_eq!(result, Value::Number(5.0));
}

#[test]
fn thread_vector_returns_clamped_column() {
    let f = setup();
    let handle = f.host.resolve_name("alpha_thread_vector").unwrap();

    let result = f.host.invoke(handle, &[Value::Number(5.0)]).unwrap();
    match result {
        Value::Array(rows) => {
            assert_eq!(rows.len(), 5);
            assert!(rows.iter().all(|r| r.len() == 1));
        }
        other => panic!("expected array, got {other:?}"),
    }

    let result = f.host.invoke(handle, &[Value::Number(10_000.0)]).unwrap();
    match result {
        Value::Array(rows) => assert_eq!(rows.len(), 100),
        other => panic!("expected array, got {other:?}"),
    }
}

#[test]
fn concurrent_invocations_land_on_distinct_threads() {
    let f = setup();
    let handle = f.table.try_get("alpha_thread_report").unwrap();

    let results = f
        .host
        .invoke_concurrent((0..4).map(|_| (handle, vec![])).collect());

    let mut ids = Vec::new();
    for result in results {
        let text = result.unwrap().to_string();
        let id: u64 = text
            .strip_prefix("Thread: ")
            .and_then(|rest| rest.split(',').next())
            .unwrap()
            .parse()
            .unwrap();
        ids.push(id);
    }
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), 4, "expected four distinct worker threads");
}

#[test]
fn non_thread_safe_function_is_serialized() {
    let f = setup();

    let in_flight = Arc::new(AtomicI64::new(0));
    let max_in_flight = Arc::new(AtomicI64::new(0));
    let handle = {
        let in_flight = Arc::clone(&in_flight);
        let max_in_flight = Arc::clone(&max_in_flight);
        f.host.register_fn(
            FunctionSpec::new("fragile", "not thread safe", false),
            move |_ctx, _args| {
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                max_in_flight.fetch_max(now, Ordering::SeqCst);
                std::thread::sleep(Duration::from_millis(5));
                in_flight.fetch_sub(1, Ordering::SeqCst);
                Ok(Value::Number(0.0))
            },
        )
    };

    let results = f
        .host
        .invoke_concurrent((0..4).map(|_| (handle, vec![])).collect());
    assert!(results.iter().all(|r| r.is_ok()));
    assert_eq!(max_in_flight.load(Ordering::SeqCst), 1);
}

#[test]
fn missing_sibling_warns_and_remaining_modules_still_work() {
    let f = setup_with(&["probes_alpha.xmod"]);
    let ctx = CallContext::new(ThreadSample::capture(), &f.host);

    assert_eq!(f.report.loaded.len(), 1);
    assert_eq!(f.report.warnings.len(), 1);
    assert!(f.report.warnings[0].message.contains("module not found"));
    assert!(f
        .report
        .unresolved
        .iter()
        .all(|name| name.starts_with("beta_")));

    // Alpha-side dispatch is unaffected.
    let report = f.orchestrator.nested_call(&ctx, true);
    parse_nested(&report);

    // Beta-side dispatch fails loudly, not silently.
    let result = f
        .orchestrator
        .dispatcher()
        .invoke_registered(&f.host, "beta_thread_calc", &[Value::Number(1.0)]);
    assert!(result.to_string().starts_with("Error:"), "{result}");
}

#[test]
fn shutdown_unloads_loaded_siblings() {
    let mut f = setup();

    let warnings = f.bootstrap.shutdown(&f.host);
    assert!(warnings.is_empty());
    assert!(f.host.resolve_name("alpha_thread_calc").is_err());

    // Best-effort and idempotent.
    assert!(f.bootstrap.shutdown(&f.host).is_empty());
}
