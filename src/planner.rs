//! Rebalance planner: current holdings + target table → ordered trades.
//!
//! Planning runs in two passes:
//!
//! 1. Every held position is classified against its target. Positions absent
//!    from the target table are sold in full; overweight positions are sold
//!    down; underweight ones (and targeted tickers not held at all) become
//!    candidate buys. Sale proceeds are credited to a running cash balance
//!    seeded with the account's cash.
//! 2. Candidate buys are walked from the most expensive unit price to the
//!    cheapest. Each is emitted as-is if cash covers it, otherwise cut down
//!    to what the remaining cash affords.
//!
//! The output lists all sells (in holding order) followed by all buys (in
//! descending price order). Dollar amounts become share counts through a
//! [`RoundingPolicy`]; the default floors, under-trading rather than
//! over-trading.
//!
//! All arithmetic is exact: amounts are carried in hundredths of a cent so the
//! percent comparisons and share divisions never touch floating point.

use std::cmp::{Ordering, Reverse};
use std::fmt;
use std::str::FromStr;

use log::debug;

use crate::allocation::TargetAllocation;
use crate::instruction::TradeInstruction;
use crate::portfolio::{Portfolio, Position};
use crate::quote::{PriceOracle, QuoteError};
use crate::types::{Money, Percent, Shares};

/// How a dollar amount is turned into a whole-share count.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "lowercase")
)]
pub enum RoundingPolicy {
    /// Stop before the next share would overshoot. Leaves positions slightly
    /// over/underweight but never trades past the target.
    #[default]
    Floor,
    /// Round to the nearest whole share.
    Nearest,
    /// Trade until the target is crossed. Sells are still capped at the held
    /// share count and buys at available cash.
    Ceil,
}

impl RoundingPolicy {
    /// Shares of unit size `unit` covering `amount`. Both in the same units;
    /// `amount >= 0`, `unit > 0`.
    fn shares(self, amount: i128, unit: i128) -> Shares {
        let n = match self {
            RoundingPolicy::Floor => amount / unit,
            RoundingPolicy::Nearest => (2 * amount + unit) / (2 * unit),
            RoundingPolicy::Ceil => (amount + unit - 1) / unit,
        };
        Shares::try_from(n.max(0)).unwrap_or(Shares::MAX)
    }
}

impl fmt::Display for RoundingPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RoundingPolicy::Floor => "floor",
            RoundingPolicy::Nearest => "nearest",
            RoundingPolicy::Ceil => "ceil",
        };
        f.pad(s)
    }
}

/// Unrecognized rounding policy name.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("unknown rounding policy '{0}' (expected floor, nearest or ceil)")]
pub struct ParseRoundingError(pub String);

impl FromStr for RoundingPolicy {
    type Err = ParseRoundingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "floor" => Ok(RoundingPolicy::Floor),
            "nearest" => Ok(RoundingPolicy::Nearest),
            "ceil" => Ok(RoundingPolicy::Ceil),
            _ => Err(ParseRoundingError(s.to_string())),
        }
    }
}

/// Knobs shared by every strategy.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlanOptions {
    pub rounding: RoundingPolicy,
    /// Leave a ticker alone while `|current% - target%|` is below this.
    /// `0.0` trades every deviation.
    pub drift_threshold_pct: f64,
}

impl Default for PlanOptions {
    fn default() -> Self {
        Self {
            rounding: RoundingPolicy::Floor,
            drift_threshold_pct: 0.0,
        }
    }
}

impl PlanOptions {
    fn within_threshold(&self, current_pct: f64, target: Percent) -> bool {
        (current_pct - f64::from(target)).abs() < self.drift_threshold_pct
    }
}

/// A rebalancing policy.
pub trait Strategy {
    /// Short name for logs and reports.
    fn name(&self) -> &'static str;

    /// Ordered trade list moving `portfolio` toward `targets`.
    ///
    /// Any quote failure aborts the whole plan.
    fn plan(
        &self,
        portfolio: &Portfolio,
        targets: &TargetAllocation,
        prices: &dyn PriceOracle,
    ) -> Result<Vec<TradeInstruction>, QuoteError>;
}

/// Buy and sell anything needed to reach the target allocation.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct AlwaysRebalance {
    pub options: PlanOptions,
}

impl AlwaysRebalance {
    pub fn new(options: PlanOptions) -> Self {
        Self { options }
    }
}

impl Strategy for AlwaysRebalance {
    fn name(&self) -> &'static str {
        "always-rebalance"
    }

    fn plan(
        &self,
        portfolio: &Portfolio,
        targets: &TargetAllocation,
        prices: &dyn PriceOracle,
    ) -> Result<Vec<TradeInstruction>, QuoteError> {
        let ledger = classify(portfolio, targets, prices, &self.options, true)?;
        Ok(allocate(ledger))
    }
}

/// Never sell; deploy cash on hand into underweight positions only.
///
/// For taxable accounts, where selling realizes gains.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BuyOnly {
    pub options: PlanOptions,
}

impl BuyOnly {
    pub fn new(options: PlanOptions) -> Self {
        Self { options }
    }
}

impl Strategy for BuyOnly {
    fn name(&self) -> &'static str {
        "buy-only"
    }

    fn plan(
        &self,
        portfolio: &Portfolio,
        targets: &TargetAllocation,
        prices: &dyn PriceOracle,
    ) -> Result<Vec<TradeInstruction>, QuoteError> {
        let ledger = classify(portfolio, targets, prices, &self.options, false)?;
        Ok(allocate(ledger))
    }
}

/// Plan with [`AlwaysRebalance`] and default options.
///
/// ```
/// use allotment::allocation::TargetAllocation;
/// use allotment::planner::plan;
/// use allotment::portfolio::{AccountSnapshot, HeldPosition, Portfolio};
/// use allotment::quote::QuoteTable;
///
/// let portfolio = Portfolio::from_snapshot(AccountSnapshot {
///     total_liquidation_cents: 1_000_000,
///     positions: vec![HeldPosition::new("A", 1_000_000, 100)],
///     cash_available_cents: 0,
/// });
/// let targets: TargetAllocation = [("A", 50), ("B", 50)].into_iter().collect();
/// let quotes = QuoteTable::new()
///     .with("A", 10_000, 10_100).unwrap()
///     .with("B", 5_000, 5_100).unwrap();
///
/// let orders = plan(&portfolio, &targets, &quotes).unwrap();
/// assert_eq!(orders[0].to_string(), "SELL 50 A @ $100.00");
/// assert_eq!(orders[1].to_string(), "BUY 98 B @ $51.00");
/// ```
pub fn plan(
    portfolio: &Portfolio,
    targets: &TargetAllocation,
    prices: &dyn PriceOracle,
) -> Result<Vec<TradeInstruction>, QuoteError> {
    AlwaysRebalance::default().plan(portfolio, targets, prices)
}

/// Plan several independent accounts against one target table in parallel.
///
/// Results are returned in the same order as `portfolios`.
#[cfg(feature = "parallel")]
pub fn plan_accounts<S>(
    strategy: &S,
    portfolios: &[Portfolio],
    targets: &TargetAllocation,
    prices: &(dyn PriceOracle + Sync),
) -> Vec<Result<Vec<TradeInstruction>, QuoteError>>
where
    S: Strategy + Sync + ?Sized,
{
    use rayon::prelude::*;

    portfolios
        .par_iter()
        .map(|portfolio| strategy.plan(portfolio, targets, prices))
        .collect()
}

/// Pass-1 output: sells already decided, buys still wanted, cash after sells.
struct Ledger {
    cash_cents: i128,
    sells: Vec<TradeInstruction>,
    candidates: Vec<TradeInstruction>,
}

impl Ledger {
    fn sell(&mut self, order: TradeInstruction) {
        self.cash_cents += order.notional_cents();
        self.sells.push(order);
    }
}

/// Hundredths of a cent: `value_cents * 100` compares directly against
/// `total_cents * target_percent`.
fn scaled(cents: i64) -> i128 {
    i128::from(cents) * 100
}

fn classify(
    portfolio: &Portfolio,
    targets: &TargetAllocation,
    prices: &dyn PriceOracle,
    options: &PlanOptions,
    sells_allowed: bool,
) -> Result<Ledger, QuoteError> {
    let total = i128::from(portfolio.total_cents());
    let mut ledger = Ledger {
        cash_cents: i128::from(portfolio.cash_cents()),
        sells: Vec::new(),
        candidates: Vec::new(),
    };

    for position in portfolio.positions() {
        let ticker = position.ticker();
        let quote = prices.quote(ticker)?;
        let target = targets.get(ticker.as_str());

        if options.within_threshold(position.percent(), target.unwrap_or(0)) {
            debug!("{ticker}: within drift threshold, skipping");
            continue;
        }

        let Some(target) = target else {
            if sells_allowed {
                debug!("{ticker}: not in target allocation, selling all");
                ledger.sell(TradeInstruction::sell(
                    ticker.clone(),
                    position.shares(),
                    quote.bid_cents(),
                ));
            }
            continue;
        };

        let held = scaled(position.market_value_cents());
        let desired = total * i128::from(target);
        match held.cmp(&desired) {
            Ordering::Greater if sells_allowed => {
                let shares = sell_shares(position, held - desired, quote.bid_cents(), options);
                debug!("{ticker}: overweight, selling {shares}");
                ledger.sell(TradeInstruction::sell(ticker.clone(), shares, quote.bid_cents()));
            }
            Ordering::Less => {
                let shares = options
                    .rounding
                    .shares(desired - held, scaled(quote.ask_cents()));
                debug!("{ticker}: underweight, wants {shares}");
                ledger
                    .candidates
                    .push(TradeInstruction::buy(ticker.clone(), shares, quote.ask_cents()));
            }
            _ => {}
        }
    }

    // Targeted but not held: current percent is zero.
    for (ticker, target) in targets.iter() {
        if target == 0 || portfolio.holds(ticker.as_str()) {
            continue;
        }
        let quote = prices.quote(ticker)?;
        if options.within_threshold(0.0, target) {
            debug!("{ticker}: within drift threshold, skipping");
            continue;
        }
        let desired = total * i128::from(target);
        if desired <= 0 {
            continue;
        }
        let shares = options.rounding.shares(desired, scaled(quote.ask_cents()));
        debug!("{ticker}: not held, wants {shares}");
        ledger
            .candidates
            .push(TradeInstruction::buy(ticker.clone(), shares, quote.ask_cents()));
    }

    Ok(ledger)
}

fn sell_shares(position: &Position, surplus: i128, bid_cents: i64, options: &PlanOptions) -> Shares {
    options
        .rounding
        .shares(surplus, scaled(bid_cents))
        .min(position.shares())
}

fn allocate(ledger: Ledger) -> Vec<TradeInstruction> {
    let Ledger {
        mut cash_cents,
        sells,
        mut candidates,
    } = ledger;

    // Most expensive first: rounding losses on cheap shares hurt least at the end.
    candidates.sort_by_key(|c| Reverse(c.price_cents()));

    let mut orders = sells;
    orders.reserve(candidates.len());
    for candidate in candidates {
        let buy = if candidate.notional_cents() <= cash_cents {
            candidate
        } else {
            let price = i128::from(candidate.price_cents());
            let affordable = Shares::try_from(cash_cents.max(0) / price).unwrap_or(0);
            debug!(
                "{}: wanted {} but cash only covers {affordable}",
                candidate.ticker(),
                candidate.shares()
            );
            candidate.with_shares(affordable)
        };
        cash_cents -= buy.notional_cents();
        orders.push(buy);
    }
    orders
}

/// Totals for a computed plan.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct PlanSummary {
    pub sells: usize,
    pub buys: usize,
    pub sell_proceeds_cents: i64,
    pub buy_cost_cents: i64,
    pub cash_remaining_cents: i64,
}

impl PlanSummary {
    /// Summarize `orders` for an account starting with `cash_cents`.
    pub fn new(orders: &[TradeInstruction], cash_cents: i64) -> Self {
        let (sells, buys): (Vec<_>, Vec<_>) = orders.iter().partition(|o| o.is_sell());
        let proceeds: i128 = sells.iter().map(|o| o.notional_cents()).sum();
        let cost: i128 = buys.iter().map(|o| o.notional_cents()).sum();
        Self {
            sells: sells.len(),
            buys: buys.len(),
            sell_proceeds_cents: clamp_cents(proceeds),
            buy_cost_cents: clamp_cents(cost),
            cash_remaining_cents: clamp_cents(i128::from(cash_cents) + proceeds - cost),
        }
    }
}

fn clamp_cents(value: i128) -> i64 {
    i64::try_from(value).unwrap_or(if value < 0 { i64::MIN } else { i64::MAX })
}

impl fmt::Display for PlanSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} sells ({}), {} buys ({}), {} cash left",
            self.sells,
            Money(self.sell_proceeds_cents),
            self.buys,
            Money(self.buy_cost_cents),
            Money(self.cash_remaining_cents),
        )
    }
}
