use chronoscript::config::RuntimeConfig;
use chronoscript::diagnostics::Severity;
use chronoscript::interpreter::Value;
use chronoscript::runtime::{run_chs_test, run_str};

#[test]
fn rewind_flow_script() {
    run_chs_test("tests/scripts/rewind_flow.chs");
}

#[test]
fn branch_merge_script() {
    run_chs_test("tests/scripts/branch_merge.chs");
}

#[test]
fn loops_script() {
    run_chs_test("tests/scripts/loops.chs");
}

#[test]
fn weave_script() {
    run_chs_test("tests/scripts/weave.chs");
}

#[test]
fn rewind_without_aethel_fails() {
    let mut config = RuntimeConfig::default();
    config.ledger.initial_aethel = 4.0;
    let report = run_str(
        "DECLARE CONF x : INT = 1; REWIND_FLOW() { x = 2; } x;",
        "rewind.chs",
        config,
    );
    assert!(report.has_errors());
    assert!(report.diagnostics[0].message.contains("Insufficient aethel"));
    assert_eq!(report.error.map(|e| e.code_str()), Some("E005"));
}

#[test]
fn merge_without_branches_still_runs_body() {
    let report = run_str(
        "DECLARE CONF x : INT = 1; MERGE_TIMELINES() { x = 5; } x;",
        "merge.chs",
        RuntimeConfig::default(),
    );
    assert!(!report.has_errors(), "{:?}", report.diagnostics);
    assert_eq!(report.value, Some(Value::int(5)));
}

#[test]
fn temporal_ops_reject_bad_arguments() {
    for text in [
        "REWIND_FLOW(1) { }",
        "MERGE_TIMELINES(1) { }",
        "WHILE_EVENT() { }",
        "FOR_CHRONON(1, 2, 3) { }",
        "BRANCH_TIMELINE(-1) { }",
    ] {
        let report = run_str(text, "args.chs", RuntimeConfig::default());
        assert!(report.has_errors(), "{text}");
        assert_eq!(
            report.error.as_ref().map(|e| e.code_str()),
            Some("E004"),
            "{text}"
        );
    }
}

#[test]
fn for_chronon_over_the_limit_is_rejected_up_front() {
    let mut config = RuntimeConfig::default();
    config.interpreter.max_loop_iterations = 10;
    let report = run_str(
        "DECLARE CONF n : INT = 0; FOR_CHRONON(11) { n += 1; } n;",
        "limit.chs",
        config,
    );
    assert!(report.diagnostics[0].message.contains("iteration limit of 10"));
}

#[test]
fn repeated_snapshots_cross_the_high_water_mark() {
    let mut config = RuntimeConfig::default();
    config.ledger.paradox_high_water = 2;
    let report = run_str("BRANCH_TIMELINE(3) { }", "paradox.chs", config);
    let warnings: Vec<_> = report
        .diagnostics
        .iter()
        .filter(|d| d.severity == Severity::Warning)
        .collect();
    assert_eq!(warnings.len(), 1);
    assert!(!report.has_errors());
}
