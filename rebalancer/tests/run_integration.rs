// Allow our dollar.cents digit grouping convention (e.g., 100_00 = $100.00)
#![allow(clippy::inconsistent_digit_grouping)]

//! Integration tests for the run orchestrator against a mock broker.

use std::path::Path;

use allotment::{AlwaysRebalance, BuyOnly, Side};
use allotment_broker::mock::MockBroker;
use allotment_rebalancer::audit::AuditLog;
use allotment_rebalancer::error::Error;
use allotment_rebalancer::run::{self, RunOptions};
use allotment_rebalancer::weighting::WeightingDocument;

fn broker() -> MockBroker {
    MockBroker::builder()
        .with_account("111", 10_000_00, 0)
        .with_position("111", "TICKER_A", 10_000_00, 100)
        .with_account("222", 1_000_00, 1_000_00)
        .with_quote("TICKER_A", 100_00, 101_00)
        .with_quote("TICKER_B", 50_00, 51_00)
        .build()
}

fn events(path: &Path) -> Vec<String> {
    std::fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(|l| {
            let v: serde_json::Value = serde_json::from_str(l).unwrap();
            v["event"].as_str().unwrap().to_string()
        })
        .collect()
}

const SPLIT: &str = r#"[
    { "portfolio": [ { "50": "TICKER_A" }, { "50": "TICKER_B" } ], "accounts": "111" }
]"#;

// ============================================================================
// Happy path
// ============================================================================

#[test]
fn plans_and_writes_output() {
    let dir = tempfile::tempdir().unwrap();
    let audit_path = dir.path().join("audit.jsonl");
    let output = dir.path().join("out").join("plan.json");
    let doc = WeightingDocument::from_json(SPLIT).unwrap();
    let mut audit = AuditLog::open(&audit_path).unwrap();

    let opts = RunOptions {
        output: Some(output.clone()),
        weighting_file: "weighting.json".into(),
        ..RunOptions::default()
    };
    let report = run::run(&broker(), &doc, &AlwaysRebalance::default(), &mut audit, &opts).unwrap();

    assert!(report.outcome().is_ok());
    assert_eq!(report.plans.len(), 1);
    let orders = &report.plans[0].orders;
    assert_eq!(orders[0].side(), Side::Sell);
    assert_eq!(orders[0].shares(), 50);
    assert_eq!(orders[1].side(), Side::Buy);
    assert_eq!(orders[1].shares(), 98);
    assert_eq!(report.written_to.as_deref(), Some(output.as_path()));

    let plan: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&output).unwrap()).unwrap();
    assert_eq!(plan["strategy"], "always-rebalance");
    assert_eq!(plan["accounts"][0]["account"], "111");
    assert_eq!(plan["accounts"][0]["orders"][1]["ticker"], "TICKER_B");
    assert_eq!(plan["accounts"][0]["summary"]["cash_remaining_cents"], 2_00);

    assert_eq!(
        events(&audit_path),
        vec![
            "run_started",
            "targets_resolved",
            "snapshot_fetched",
            "plan_computed",
            "plan_written",
            "run_completed"
        ]
    );
}

#[test]
fn dry_run_never_writes() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("plan.json");
    let doc = WeightingDocument::from_json(SPLIT).unwrap();
    let mut audit = AuditLog::open(&dir.path().join("audit.jsonl")).unwrap();

    let opts = RunOptions {
        dry_run: true,
        output: Some(output.clone()),
        ..RunOptions::default()
    };
    let report = run::run(&broker(), &doc, &AlwaysRebalance::default(), &mut audit, &opts).unwrap();
    assert_eq!(report.plans.len(), 1);
    assert!(report.written_to.is_none());
    assert!(!output.exists());
}

#[test]
fn buy_only_strategy_keeps_holdings() {
    let dir = tempfile::tempdir().unwrap();
    let doc = WeightingDocument::from_json(
        r#"[{ "portfolio": [ { "50": "TICKER_A" }, { "50": "TICKER_B" } ], "accounts": "111, 222" }]"#,
    )
    .unwrap();
    let mut audit = AuditLog::open(&dir.path().join("audit.jsonl")).unwrap();

    let report = run::run(&broker(), &doc, &BuyOnly::default(), &mut audit, &RunOptions::default())
        .unwrap();
    assert_eq!(report.plans.len(), 2);
    // 111 has no cash: B wanted but nothing affordable
    assert!(report.plans[0].orders.iter().all(|o| o.is_buy()));
    assert_eq!(report.plans[0].orders[0].shares(), 0);
    // 222 is all cash: A ($500 / $101 = 4) first, then B ($500 / $51 = 9)
    let orders: Vec<(&str, u64)> = report.plans[1]
        .orders
        .iter()
        .map(|o| (o.ticker().as_str(), o.shares()))
        .collect();
    assert_eq!(orders, vec![("TICKER_A", 4), ("TICKER_B", 9)]);
}

// ============================================================================
// Failures
// ============================================================================

#[test]
fn unbalanced_entry_is_skipped_and_run_continues() {
    let dir = tempfile::tempdir().unwrap();
    let audit_path = dir.path().join("audit.jsonl");
    let doc = WeightingDocument::from_json(
        r#"[
            { "portfolio": [ { "60": "TICKER_A" }, { "60": "TICKER_B" } ], "accounts": "111" },
            { "portfolio": [ { "100": "TICKER_B" } ], "accounts": "222" }
        ]"#,
    )
    .unwrap();
    let mut audit = AuditLog::open(&audit_path).unwrap();

    let report = run::run(&broker(), &doc, &AlwaysRebalance::default(), &mut audit, &RunOptions::default())
        .unwrap();

    assert_eq!(report.skipped_entries, vec![0]);
    assert_eq!(report.plans.len(), 1);
    assert_eq!(report.plans[0].account, "222");
    let err = report.outcome().unwrap_err();
    assert!(matches!(err, Error::EntriesSkipped(1)));
    assert_eq!(err.exit_code(), 2);
    assert!(events(&audit_path).contains(&"entry_skipped".to_string()));
}

#[test]
fn unknown_account_reported_not_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let doc = WeightingDocument::from_json(
        r#"[{ "portfolio": [ { "100": "TICKER_B" } ], "accounts": "999, 222" }]"#,
    )
    .unwrap();
    let mut audit = AuditLog::open(&dir.path().join("audit.jsonl")).unwrap();

    let report = run::run(&broker(), &doc, &AlwaysRebalance::default(), &mut audit, &RunOptions::default())
        .unwrap();
    assert_eq!(report.failed_accounts.len(), 1);
    assert_eq!(report.failed_accounts[0].0, "999");
    assert_eq!(report.plans.len(), 1);
    let err = report.outcome().unwrap_err();
    assert!(matches!(err, Error::AccountsFailed(1)));
    assert_eq!(err.exit_code(), 1);
}

#[test]
fn missing_quote_aborts_only_that_account() {
    let dir = tempfile::tempdir().unwrap();
    let doc = WeightingDocument::from_json(
        r#"[{ "portfolio": [ { "100": "TICKER_C" } ], "accounts": "111" }]"#,
    )
    .unwrap();
    let mut audit = AuditLog::open(&dir.path().join("audit.jsonl")).unwrap();

    let report = run::run(&broker(), &doc, &AlwaysRebalance::default(), &mut audit, &RunOptions::default())
        .unwrap();
    assert!(report.plans.is_empty());
    assert!(report.failed_accounts[0].1.contains("TICKER_C"));
}

#[test]
fn handle_resolved_once_per_account() {
    let dir = tempfile::tempdir().unwrap();
    let doc = WeightingDocument::from_json(
        r#"[
            { "portfolio": [ { "100": "TICKER_A" } ], "accounts": "111" },
            { "portfolio": [ { "100": "TICKER_B" } ], "accounts": "111" }
        ]"#,
    )
    .unwrap();
    let broker = broker();
    let mut audit = AuditLog::open(&dir.path().join("audit.jsonl")).unwrap();

    let report = run::run(&broker, &doc, &AlwaysRebalance::default(), &mut audit, &RunOptions::default())
        .unwrap();
    assert_eq!(report.plans.len(), 2);
    assert_eq!(broker.resolved_accounts(), vec!["111"]);
}

#[test]
fn show_targets_flags_bad_entries() {
    let doc = WeightingDocument::from_json(
        r#"[
            { "portfolio": [ { "100": "VTI" } ], "accounts": "1" },
            { "portfolio": [ { "90": "VTI" } ], "accounts": "2" }
        ]"#,
    )
    .unwrap();
    assert!(matches!(run::show_targets(&doc), Err(Error::EntriesSkipped(1))));
}

#[test]
fn drift_reports_every_account() {
    let doc = WeightingDocument::from_json(
        r#"[{ "portfolio": [ { "100": "TICKER_A" } ], "accounts": "111, 222" }]"#,
    )
    .unwrap();
    assert!(run::run_drift(&broker(), &doc).is_ok());

    let doc = WeightingDocument::from_json(
        r#"[{ "portfolio": [ { "100": "TICKER_A" } ], "accounts": "999" }]"#,
    )
    .unwrap();
    assert!(matches!(run::run_drift(&broker(), &doc), Err(Error::AccountsFailed(1))));
}

#[test]
fn drift_continues_past_unknown_account() {
    let doc = WeightingDocument::from_json(
        r#"[{ "portfolio": [ { "100": "TICKER_A" } ], "accounts": "999, 111, 998, 222" }]"#,
    )
    .unwrap();
    let broker = broker();
    let err = run::run_drift(&broker, &doc).unwrap_err();
    assert!(matches!(err, Error::AccountsFailed(2)));
    assert_eq!(err.exit_code(), 1);
    assert_eq!(broker.resolved_accounts(), vec!["999", "111", "998", "222"]);
}
