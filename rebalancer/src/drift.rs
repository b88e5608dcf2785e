//! Drift report: how far an account's holdings are from the target table.

use allotment::{Portfolio, TargetAllocation};
use serde::Serialize;

/// Per-ticker comparison of current against target percentages.
#[derive(Debug, Clone, Serialize)]
pub struct DriftReport {
    pub entries: Vec<DriftEntry>,
    /// Root mean square of the per-ticker drift, in percentage points.
    pub tracking_error_pct: f64,
}

/// One ticker's drift entry.
#[derive(Debug, Clone, Serialize)]
pub struct DriftEntry {
    pub ticker: String,
    pub target_pct: f64,
    pub current_pct: f64,
    /// `current_pct - target_pct`: positive means overweight.
    pub drift_pct: f64,
    pub market_value_cents: i64,
    pub shares: u64,
}

/// Compare current holdings against targets.
///
/// Targeted tickers come first in table order, then held tickers absent from
/// the table in holding order.
pub fn drift(portfolio: &Portfolio, targets: &TargetAllocation) -> DriftReport {
    let mut entries = Vec::with_capacity(targets.len() + portfolio.len());

    for (ticker, target) in targets.iter() {
        let held = portfolio.get(ticker.as_str());
        entries.push(entry(
            ticker.as_str(),
            f64::from(target),
            held.map(|p| p.percent()).unwrap_or(0.0),
            held.map(|p| p.market_value_cents()).unwrap_or(0),
            held.map(|p| p.shares()).unwrap_or(0),
        ));
    }
    for position in portfolio.positions() {
        if targets.contains(position.ticker().as_str()) {
            continue;
        }
        entries.push(entry(
            position.ticker().as_str(),
            0.0,
            position.percent(),
            position.market_value_cents(),
            position.shares(),
        ));
    }

    let sum_sq: f64 = entries.iter().map(|e| e.drift_pct * e.drift_pct).sum();
    let tracking_error_pct = (sum_sq / entries.len().max(1) as f64).sqrt();

    DriftReport {
        entries,
        tracking_error_pct,
    }
}

fn entry(
    ticker: &str,
    target_pct: f64,
    current_pct: f64,
    market_value_cents: i64,
    shares: u64,
) -> DriftEntry {
    DriftEntry {
        ticker: ticker.to_string(),
        target_pct,
        current_pct,
        drift_pct: current_pct - target_pct,
        market_value_cents,
        shares,
    }
}

impl DriftReport {
    /// Largest absolute drift, if any ticker is listed.
    pub fn max_drift(&self) -> Option<&DriftEntry> {
        self.entries
            .iter()
            .max_by(|a, b| a.drift_pct.abs().total_cmp(&b.drift_pct.abs()))
    }
}

impl std::fmt::Display for DriftReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "DRIFT:")?;
        writeln!(
            f,
            "  {:8} {:>10} {:>10} {:>10} {:>14} {:>8}",
            "Ticker", "Target%", "Current%", "Drift%", "Value", "Shares"
        )?;
        for e in &self.entries {
            writeln!(
                f,
                "  {:8} {:>9.2}% {:>9.2}% {:>+9.2}% {:>14} {:>8}",
                e.ticker,
                e.target_pct,
                e.current_pct,
                e.drift_pct,
                allotment::Money(e.market_value_cents),
                e.shares,
            )?;
        }
        writeln!(f, "\n  Tracking error: {:.3}%", self.tracking_error_pct)?;
        Ok(())
    }
}
