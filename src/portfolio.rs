//! Account snapshot and the read-only portfolio view built from it.
//!
//! A [`Portfolio`] is rebuilt wholesale from each [`AccountSnapshot`]; it is
//! never patched in place. Every position's percent is derived from the
//! account's total liquidation value at construction time.

use std::fmt;

use rustc_hash::FxHashMap;

use crate::types::{CASH_TICKER, Money, Shares, Ticker};

/// One holding as reported by the account snapshot provider.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HeldPosition {
    pub ticker: Ticker,
    pub market_value_cents: i64,
    pub shares: Shares,
}

impl HeldPosition {
    pub fn new(ticker: impl Into<Ticker>, market_value_cents: i64, shares: Shares) -> Self {
        Self {
            ticker: ticker.into(),
            market_value_cents,
            shares,
        }
    }
}

/// Raw account state handed over by the account snapshot provider.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AccountSnapshot {
    pub total_liquidation_cents: i64,
    pub positions: Vec<HeldPosition>,
    pub cash_available_cents: i64,
}

/// A holding of one ticker with its share of the account.
///
/// `percent == market_value / account_total * 100`, computed once on
/// construction. Fields are read-only.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Position {
    ticker: Ticker,
    market_value_cents: i64,
    shares: Shares,
    percent: f64,
}

impl Position {
    pub fn new(
        ticker: Ticker,
        market_value_cents: i64,
        shares: Shares,
        account_total_cents: i64,
    ) -> Self {
        Self {
            ticker,
            market_value_cents,
            shares,
            percent: percent_of(market_value_cents, account_total_cents),
        }
    }

    /// Synthetic cash position: one "share" per whole dollar.
    ///
    /// Shares are whole, so leftover cents are truncated from the share
    /// count. The market value keeps them, and sizing only reads that.
    pub fn cash(cash_cents: i64, account_total_cents: i64) -> Self {
        let shares = Shares::try_from(cash_cents.max(0) / 100).unwrap_or(0);
        Self::new(
            Ticker::from(CASH_TICKER),
            cash_cents,
            shares,
            account_total_cents,
        )
    }

    #[inline]
    pub fn ticker(&self) -> &Ticker {
        &self.ticker
    }

    #[inline]
    pub fn market_value_cents(&self) -> i64 {
        self.market_value_cents
    }

    #[inline]
    pub fn shares(&self) -> Shares {
        self.shares
    }

    /// Percent of total account value (0.0 when the account total is not positive).
    #[inline]
    pub fn percent(&self) -> f64 {
        self.percent
    }
}

fn percent_of(value_cents: i64, total_cents: i64) -> f64 {
    if total_cents > 0 {
        value_cents as f64 / total_cents as f64 * 100.0
    } else {
        0.0
    }
}

/// Current holdings of one account, plus cash and total liquidation value.
#[derive(Clone, Debug)]
pub struct Portfolio {
    total_cents: i64,
    positions: Vec<Position>,
    index: FxHashMap<Ticker, usize>,
    cash: Position,
}

impl Portfolio {
    /// Build a portfolio from a snapshot, keeping the provider's position order.
    ///
    /// A ticker reported twice keeps its first position in the order and the
    /// last reported values.
    pub fn from_snapshot(snapshot: AccountSnapshot) -> Self {
        let total = snapshot.total_liquidation_cents;
        let mut positions: Vec<Position> = Vec::with_capacity(snapshot.positions.len());
        let mut index = FxHashMap::default();

        for held in snapshot.positions {
            let position = Position::new(
                held.ticker.clone(),
                held.market_value_cents,
                held.shares,
                total,
            );
            match index.get(&held.ticker) {
                Some(&i) => positions[i] = position,
                None => {
                    index.insert(held.ticker, positions.len());
                    positions.push(position);
                }
            }
        }

        Self {
            total_cents: total,
            positions,
            index,
            cash: Position::cash(snapshot.cash_available_cents, total),
        }
    }

    /// Total liquidation value of the account (cents).
    #[inline]
    pub fn total_cents(&self) -> i64 {
        self.total_cents
    }

    /// Cash available for trading (cents).
    #[inline]
    pub fn cash_cents(&self) -> i64 {
        self.cash.market_value_cents
    }

    /// The synthetic cash position. Its share count is whole dollars
    /// (cents truncated); use [`Portfolio::cash_cents`] for the exact amount.
    #[inline]
    pub fn cash(&self) -> &Position {
        &self.cash
    }

    /// Held positions in snapshot order (cash excluded).
    pub fn positions(&self) -> &[Position] {
        &self.positions
    }

    pub fn get(&self, ticker: &str) -> Option<&Position> {
        self.index.get(ticker).map(|&i| &self.positions[i])
    }

    pub fn holds(&self, ticker: &str) -> bool {
        self.index.contains_key(ticker)
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

impl fmt::Display for Portfolio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for p in &self.positions {
            writeln!(
                f,
                "    {:8} {:>8} sh  {:>14}  {:>6.2}%",
                p.ticker,
                p.shares,
                Money(p.market_value_cents),
                p.percent
            )?;
        }
        write!(
            f,
            "    {:8} {:>8}     {:>14}  {:>6.2}%",
            self.cash.ticker,
            "",
            Money(self.cash.market_value_cents),
            self.cash.percent
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> AccountSnapshot {
        AccountSnapshot {
            total_liquidation_cents: 10_000_00,
            positions: vec![
                HeldPosition::new("VTI", 6_000_00, 24),
                HeldPosition::new("BND", 3_000_00, 40),
            ],
            cash_available_cents: 1_000_00,
        }
    }

    #[test]
    fn percent_is_derived_from_total() {
        let p = Portfolio::from_snapshot(snapshot());
        assert_eq!(p.len(), 2);
        assert_eq!(p.get("VTI").unwrap().percent(), 60.0);
        assert_eq!(p.get("BND").unwrap().percent(), 30.0);
        assert_eq!(p.cash().percent(), 10.0);
    }

    #[test]
    fn cash_has_one_share_per_dollar() {
        let p = Portfolio::from_snapshot(snapshot());
        assert_eq!(p.cash().ticker().as_str(), CASH_TICKER);
        assert_eq!(p.cash().shares(), 1_000);
        assert_eq!(p.cash_cents(), 1_000_00);
    }

    #[test]
    fn cash_shares_truncate_cents_but_value_keeps_them() {
        let p = Portfolio::from_snapshot(AccountSnapshot {
            total_liquidation_cents: 1_000_50,
            positions: vec![],
            cash_available_cents: 1_000_50,
        });
        assert_eq!(p.cash().shares(), 1_000);
        assert_eq!(p.cash().market_value_cents(), 1_000_50);
        assert_eq!(p.cash_cents(), 1_000_50);
        assert_eq!(p.cash().percent(), 100.0);
    }

    #[test]
    fn keeps_snapshot_order() {
        let p = Portfolio::from_snapshot(snapshot());
        let order: Vec<&str> = p.positions().iter().map(|x| x.ticker().as_str()).collect();
        assert_eq!(order, vec!["VTI", "BND"]);
    }

    #[test]
    fn duplicate_ticker_keeps_last_values() {
        let mut s = snapshot();
        s.positions.push(HeldPosition::new("VTI", 5_000_00, 20));
        let p = Portfolio::from_snapshot(s);
        assert_eq!(p.len(), 2);
        assert_eq!(p.positions()[0].shares(), 20);
        assert_eq!(p.positions()[0].market_value_cents(), 5_000_00);
    }

    #[test]
    fn zero_total_gives_zero_percent() {
        let p = Portfolio::from_snapshot(AccountSnapshot {
            total_liquidation_cents: 0,
            positions: vec![HeldPosition::new("VTI", 0, 0)],
            cash_available_cents: 0,
        });
        assert_eq!(p.get("VTI").unwrap().percent(), 0.0);
        assert_eq!(p.cash().percent(), 0.0);
    }

    #[test]
    fn display_lists_cash_last() {
        let text = Portfolio::from_snapshot(snapshot()).to_string();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].contains("VTI"));
        assert!(lines[2].contains("CASH"));
        assert!(lines[2].contains("$1000.00"));
    }
}
