//! Run orchestrator: resolve → snapshot → plan → confirm → write.
//!
//! This is the main workflow that ties together all components. Nothing here
//! places orders; an approved plan is written as JSON for whatever executes it.

use std::path::{Path, PathBuf};

use allotment::{
    Money, PlanSummary, Portfolio, PriceOracle, Strategy, TargetAllocation, TradeInstruction,
};
use allotment_broker::{AccountHandle, AccountProvider};
use chrono::{DateTime, Utc};
use log::{error, info, warn};
use rustc_hash::FxHashMap;
use serde::Serialize;

use crate::audit::{self, AuditLog};
use crate::drift;
use crate::error::{Error, Result};
use crate::weighting::WeightingDocument;

/// Options for a rebalance run.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Print plans only; never write the plan file.
    pub dry_run: bool,
    /// Ask before writing the plan file.
    pub confirm: bool,
    /// Where to write the approved plan.
    pub output: Option<PathBuf>,
    pub weighting_file: String,
}

/// The plan computed for one account.
#[derive(Debug, Clone, Serialize)]
pub struct AccountPlan {
    pub account: String,
    pub entry: usize,
    pub orders: Vec<TradeInstruction>,
    pub summary: PlanSummary,
}

/// What a run produced.
#[derive(Debug, Default)]
pub struct RunReport {
    pub plans: Vec<AccountPlan>,
    /// Indices of weighting entries that failed to resolve.
    pub skipped_entries: Vec<usize>,
    /// Accounts whose snapshot or quotes could not be fetched, with the reason.
    pub failed_accounts: Vec<(String, String)>,
    pub written_to: Option<PathBuf>,
}

impl RunReport {
    /// Collapse into the process outcome: skipped entries take precedence
    /// over failed accounts.
    pub fn outcome(&self) -> Result<()> {
        if !self.skipped_entries.is_empty() {
            return Err(Error::EntriesSkipped(self.skipped_entries.len()));
        }
        if !self.failed_accounts.is_empty() {
            return Err(Error::AccountsFailed(self.failed_accounts.len()));
        }
        Ok(())
    }
}

#[derive(Serialize)]
struct PlanFile<'a> {
    generated_at: DateTime<Utc>,
    strategy: &'static str,
    accounts: &'a [AccountPlan],
}

/// Account handles resolved so far in this run.
#[derive(Default)]
struct Handles(FxHashMap<String, AccountHandle>);

impl Handles {
    fn get<P: AccountProvider>(&mut self, provider: &P, account: &str) -> Result<AccountHandle> {
        if let Some(handle) = self.0.get(account) {
            return Ok(handle.clone());
        }
        let handle = provider.resolve_account_handle(account)?;
        self.0.insert(account.to_string(), handle.clone());
        Ok(handle)
    }
}

/// Execute a full rebalance run over every entry of `doc`.
///
/// A weighting entry that fails to resolve is skipped with no instructions;
/// an account whose snapshot or quotes fail is reported and the run moves on.
pub fn run<B>(
    broker: &B,
    doc: &WeightingDocument,
    strategy: &dyn Strategy,
    audit: &mut AuditLog,
    opts: &RunOptions,
) -> Result<RunReport>
where
    B: AccountProvider + PriceOracle,
{
    audit::log_run_started(audit, &opts.weighting_file, strategy.name(), opts.dry_run)?;
    info!(
        "Planning {} entries with {} strategy",
        doc.entries.len(),
        strategy.name()
    );

    let mut report = RunReport::default();
    let mut handles = Handles::default();

    for (i, entry) in doc.entries.iter().enumerate() {
        let targets = match entry.resolve() {
            Ok(t) => t,
            Err(e) => {
                error!("Entry {i} ({}): {e}; skipping", entry.accounts.join(", "));
                println!("Skipping accounts {}: {e}\n", entry.accounts.join(", "));
                audit::log_entry_skipped(audit, i, &e.to_string())?;
                report.skipped_entries.push(i);
                continue;
            }
        };
        audit::log_targets_resolved(audit, i, &entry.accounts, &targets)?;
        display_targets(&entry.accounts, &targets);

        for account in &entry.accounts {
            match plan_account(broker, &mut handles, account, &targets, strategy, audit) {
                Ok((orders, summary)) => report.plans.push(AccountPlan {
                    account: account.clone(),
                    entry: i,
                    orders,
                    summary,
                }),
                Err(Error::Io(e)) => return Err(Error::Io(e)),
                Err(e) => {
                    error!("Account {account}: {e}");
                    println!("Account {account}: {e}\n");
                    audit::log_account_failed(audit, account, &e.to_string())?;
                    report.failed_accounts.push((account.clone(), e.to_string()));
                }
            }
        }
    }

    if opts.dry_run {
        println!("[DRY RUN] No plan written.");
    } else if let Some(path) = opts.output.as_ref().filter(|_| !report.plans.is_empty()) {
        if opts.confirm && !confirm_write(path)? {
            audit.log("user_confirmed", serde_json::json!({ "approved": false }))?;
            return Err(Error::Aborted("plan not written".into()));
        }
        write_plan(path, strategy.name(), &report.plans)?;
        audit::log_plan_written(audit, path, report.plans.len())?;
        println!(
            "Plan for {} account(s) written to {}",
            report.plans.len(),
            path.display()
        );
        report.written_to = Some(path.clone());
    }

    audit::log_run_completed(
        audit,
        report.plans.len(),
        report.skipped_entries.len(),
        report.failed_accounts.len(),
    )?;
    Ok(report)
}

fn plan_account<B>(
    broker: &B,
    handles: &mut Handles,
    account: &str,
    targets: &TargetAllocation,
    strategy: &dyn Strategy,
    audit: &mut AuditLog,
) -> Result<(Vec<TradeInstruction>, PlanSummary)>
where
    B: AccountProvider + PriceOracle,
{
    let portfolio = fetch_portfolio(broker, handles, account)?;
    audit::log_snapshot_fetched(audit, account, &portfolio)?;

    println!("For account {account}, the current asset allocation is:");
    println!("{portfolio}");
    print!("{}", drift::drift(&portfolio, targets));

    let orders = strategy.plan(&portfolio, targets, broker)?;
    let summary = PlanSummary::new(&orders, portfolio.cash_cents());
    audit::log_plan_computed(audit, account, strategy.name(), &orders, &summary)?;

    if orders.is_empty() {
        println!("\nNo rebalancing needed for {account}.\n");
    } else {
        display_plan(&orders, &summary);
    }
    if summary.cash_remaining_cents < 0 {
        warn!("{account}: plan leaves {} cash", Money(summary.cash_remaining_cents));
    }
    Ok((orders, summary))
}

/// Print each entry's resolved table without touching any account.
///
/// Returns [`Error::EntriesSkipped`] if any entry failed to resolve.
pub fn show_targets(doc: &WeightingDocument) -> Result<()> {
    let mut skipped = 0;
    for (i, entry) in doc.entries.iter().enumerate() {
        match entry.resolve() {
            Ok(targets) => display_targets(&entry.accounts, &targets),
            Err(e) => {
                error!("Entry {i}: {e}");
                println!("Accounts {}: {e}\n", entry.accounts.join(", "));
                skipped += 1;
            }
        }
    }
    if skipped > 0 {
        return Err(Error::EntriesSkipped(skipped));
    }
    Ok(())
}

/// Print the drift report for every account of every resolvable entry.
///
/// An account whose handle or snapshot cannot be fetched is reported and
/// skipped. Skipped entries take precedence over failed accounts in the result.
pub fn run_drift<P: AccountProvider>(provider: &P, doc: &WeightingDocument) -> Result<()> {
    let mut handles = Handles::default();
    let mut skipped = 0;
    let mut failed = 0;
    for (i, entry) in doc.entries.iter().enumerate() {
        let targets = match entry.resolve() {
            Ok(t) => t,
            Err(e) => {
                error!("Entry {i}: {e}");
                skipped += 1;
                continue;
            }
        };
        for account in &entry.accounts {
            let portfolio = match fetch_portfolio(provider, &mut handles, account) {
                Ok(p) => p,
                Err(e) => {
                    error!("Account {account}: {e}");
                    println!("Account {account}: {e}\n");
                    failed += 1;
                    continue;
                }
            };
            println!(
                "Account {account}: {} total, {} cash",
                Money(portfolio.total_cents()),
                Money(portfolio.cash_cents())
            );
            println!("{}", drift::drift(&portfolio, &targets));
        }
    }
    if skipped > 0 {
        return Err(Error::EntriesSkipped(skipped));
    }
    if failed > 0 {
        return Err(Error::AccountsFailed(failed));
    }
    Ok(())
}

// === Helpers ===

fn fetch_portfolio<P: AccountProvider>(
    provider: &P,
    handles: &mut Handles,
    account: &str,
) -> Result<Portfolio> {
    let handle = handles.get(provider, account)?;
    Ok(Portfolio::from_snapshot(provider.snapshot(&handle)?))
}

fn confirm_write(path: &Path) -> Result<bool> {
    dialoguer::Confirm::new()
        .with_prompt(format!("Write plan to {}?", path.display()))
        .default(false)
        .interact()
        .map_err(|e| Error::Aborted(format!("confirmation prompt failed: {e}")))
}

/// Write the plan file atomically: temp file next to it, then rename.
fn write_plan(path: &Path, strategy: &'static str, plans: &[AccountPlan]) -> Result<()> {
    let file = PlanFile {
        generated_at: Utc::now(),
        strategy,
        accounts: plans,
    };
    let json = serde_json::to_string_pretty(&file)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, json)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}

fn display_targets(accounts: &[String], targets: &TargetAllocation) {
    println!(
        "For accounts {}, the target asset allocation is:",
        accounts.join(", ")
    );
    for (ticker, pct) in targets.iter() {
        println!("    {ticker}: {pct}");
    }
    println!();
}

fn display_plan(orders: &[TradeInstruction], summary: &PlanSummary) {
    println!("\nREBALANCE ORDERS:");
    println!(
        "  {:>3}  {:6} {:8} {:>8} {:>10} {:>12}",
        "#", "Side", "Ticker", "Shares", "Price", "Notional"
    );
    for (i, order) in orders.iter().enumerate() {
        let notional = i64::try_from(order.notional_cents()).unwrap_or(i64::MAX);
        println!(
            "  {:>3}  {:6} {:8} {:>8} {:>10} {:>12}",
            i + 1,
            order.side(),
            order.ticker(),
            order.shares(),
            Money(order.price_cents()),
            Money(notional),
        );
    }
    println!("\n{summary}\n");
}
