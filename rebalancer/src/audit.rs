//! JSONL audit trail logging.
//!
//! Each rebalancer run appends events to an audit.jsonl file,
//! one JSON object per line.

use std::fs::{self, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

use allotment::{Money, PlanSummary, Portfolio, TargetAllocation, TradeInstruction};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::Result;

/// An audit event written to the JSONL trail.
#[derive(Debug, Clone, Serialize)]
pub struct AuditEvent {
    pub event: &'static str,
    pub ts: DateTime<Utc>,
    #[serde(flatten)]
    pub data: serde_json::Value,
}

/// Append-only audit logger.
pub struct AuditLog {
    writer: BufWriter<std::fs::File>,
}

impl AuditLog {
    /// Open (or create) the audit log file for appending.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new().create(true).append(true).open(path)?;

        Ok(Self {
            writer: BufWriter::new(file),
        })
    }

    /// Log an event with arbitrary JSON data.
    pub fn log(&mut self, event: &'static str, data: serde_json::Value) -> Result<()> {
        let entry = AuditEvent {
            event,
            ts: Utc::now(),
            data,
        };
        let json = serde_json::to_string(&entry)?;
        writeln!(self.writer, "{json}")?;
        self.writer.flush()?;
        Ok(())
    }

    /// Log a simple event with no additional data.
    pub fn log_simple(&mut self, event: &'static str) -> Result<()> {
        self.log(event, serde_json::json!({}))
    }
}

fn dollars(cents: i64) -> String {
    Money(cents).to_string()
}

pub fn log_run_started(
    audit: &mut AuditLog,
    weighting_file: &str,
    strategy: &str,
    dry_run: bool,
) -> Result<()> {
    audit.log(
        "run_started",
        serde_json::json!({
            "weighting_file": weighting_file,
            "strategy": strategy,
            "dry_run": dry_run,
        }),
    )
}

pub fn log_targets_resolved(
    audit: &mut AuditLog,
    entry: usize,
    accounts: &[String],
    targets: &TargetAllocation,
) -> Result<()> {
    let table: Vec<_> = targets
        .iter()
        .map(|(ticker, pct)| serde_json::json!({ "ticker": ticker.as_str(), "pct": pct }))
        .collect();
    audit.log(
        "targets_resolved",
        serde_json::json!({
            "entry": entry,
            "accounts": accounts,
            "targets": table,
        }),
    )
}

pub fn log_entry_skipped(audit: &mut AuditLog, entry: usize, reason: &str) -> Result<()> {
    audit.log(
        "entry_skipped",
        serde_json::json!({
            "entry": entry,
            "reason": reason,
        }),
    )
}

pub fn log_snapshot_fetched(audit: &mut AuditLog, account: &str, portfolio: &Portfolio) -> Result<()> {
    let positions: Vec<_> = portfolio
        .positions()
        .iter()
        .map(|p| {
            serde_json::json!({
                "ticker": p.ticker().as_str(),
                "shares": p.shares(),
                "value": dollars(p.market_value_cents()),
                "pct": p.percent(),
            })
        })
        .collect();
    audit.log(
        "snapshot_fetched",
        serde_json::json!({
            "account": account,
            "total": dollars(portfolio.total_cents()),
            "cash": dollars(portfolio.cash_cents()),
            "positions": positions,
        }),
    )
}

pub fn log_plan_computed(
    audit: &mut AuditLog,
    account: &str,
    strategy: &str,
    orders: &[TradeInstruction],
    summary: &PlanSummary,
) -> Result<()> {
    let order_data: Vec<_> = orders
        .iter()
        .map(|o| {
            serde_json::json!({
                "side": o.side().to_string(),
                "ticker": o.ticker().as_str(),
                "shares": o.shares(),
                "price": dollars(o.price_cents()),
            })
        })
        .collect();
    audit.log(
        "plan_computed",
        serde_json::json!({
            "account": account,
            "strategy": strategy,
            "orders": order_data,
            "sell_proceeds": dollars(summary.sell_proceeds_cents),
            "buy_cost": dollars(summary.buy_cost_cents),
            "cash_remaining": dollars(summary.cash_remaining_cents),
        }),
    )
}

pub fn log_account_failed(audit: &mut AuditLog, account: &str, error: &str) -> Result<()> {
    audit.log(
        "account_failed",
        serde_json::json!({
            "account": account,
            "error": error,
        }),
    )
}

pub fn log_plan_written(audit: &mut AuditLog, path: &Path, accounts: usize) -> Result<()> {
    audit.log(
        "plan_written",
        serde_json::json!({
            "path": path.display().to_string(),
            "accounts": accounts,
        }),
    )
}

pub fn log_run_completed(
    audit: &mut AuditLog,
    planned: usize,
    skipped_entries: usize,
    failed_accounts: usize,
) -> Result<()> {
    audit.log(
        "run_completed",
        serde_json::json!({
            "planned": planned,
            "skipped_entries": skipped_entries,
            "failed_accounts": failed_accounts,
        }),
    )
}
