//! CLI entry point for the allotment rebalancer.

use std::path::PathBuf;
use std::process;

use allotment::RoundingPolicy;
use allotment_broker::snapshot_file::SnapshotFileBroker;
use clap::{Parser, Subcommand};
use log::info;

use allotment_rebalancer::audit::AuditLog;
use allotment_rebalancer::config::Config;
use allotment_rebalancer::error::{Error, Result};
use allotment_rebalancer::run::{self, RunOptions};
use allotment_rebalancer::weighting::WeightingDocument;

#[derive(Parser)]
#[command(name = "rebalancer")]
#[command(about = "Rebalance brokerage accounts toward a nested percentage allocation")]
#[command(version)]
struct Cli {
    /// Path to config.toml
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Resolve targets, fetch accounts, and plan trades
    Run {
        /// Path to weighting.json
        weighting: PathBuf,

        /// Show plans without writing them
        #[arg(long)]
        dry_run: bool,

        /// Skip confirmation prompt (for cron)
        #[arg(long)]
        no_confirm: bool,

        /// Sell positions to rebalance (recommended only for tax-advantaged accounts)
        #[arg(long, conflicts_with = "no_sell")]
        sell: bool,

        /// Only buy with available cash
        #[arg(long)]
        no_sell: bool,

        /// Only adjust positions off by at least this many percentage points
        #[arg(long)]
        percentage_limit: Option<f64>,

        /// Share rounding: floor, nearest or ceil
        #[arg(long)]
        rounding: Option<RoundingPolicy>,

        /// Write the approved plan to this JSON file
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Print the resolved target table of every entry
    Targets {
        /// Path to weighting.json
        weighting: PathBuf,
    },

    /// Compare each account's holdings against its targets
    Drift {
        /// Path to weighting.json
        weighting: PathBuf,
    },
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_secs()
        .init();

    let cli = Cli::parse();

    if let Err(e) = dispatch(cli) {
        match &e {
            Error::Aborted(msg) => println!("Aborted: {msg}"),
            _ => eprintln!("Error: {e}"),
        }
        process::exit(e.exit_code());
    }
}

fn dispatch(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Targets { weighting } => {
            let doc = WeightingDocument::load(&weighting)?;
            run::show_targets(&doc)
        }
        Command::Drift { weighting } => {
            let config = Config::load(&cli.config)?;
            let doc = WeightingDocument::load(&weighting)?;
            let broker = SnapshotFileBroker::load(&config.snapshot_path())?;
            run::run_drift(&broker, &doc)
        }
        Command::Run {
            weighting,
            dry_run,
            no_confirm,
            sell,
            no_sell,
            percentage_limit,
            rounding,
            output,
        } => {
            let mut config = Config::load(&cli.config)?;
            if sell {
                config.planner.allow_sells = true;
            }
            if no_sell {
                config.planner.allow_sells = false;
            }
            if let Some(limit) = percentage_limit {
                config.planner.drift_threshold_pct = limit;
            }
            if let Some(rounding) = rounding {
                config.planner.rounding = rounding;
            }
            config.validate()?;

            let doc = WeightingDocument::load(&weighting)?;
            let broker = SnapshotFileBroker::load(&config.snapshot_path())?;
            let mut audit = AuditLog::open(&config.audit_path())?;
            let strategy = config.strategy();
            let opts = RunOptions {
                dry_run,
                confirm: !no_confirm,
                output,
                weighting_file: weighting.display().to_string(),
            };

            let report = run::run(&broker, &doc, strategy.as_ref(), &mut audit, &opts)?;
            info!(
                "{} planned, {} entries skipped, {} accounts failed. Audit logged to {}",
                report.plans.len(),
                report.skipped_entries.len(),
                report.failed_accounts.len(),
                config.audit_path().display()
            );
            report.outcome()
        }
    }
}
