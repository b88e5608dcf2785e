//! Trade instructions produced by the planner.

use std::fmt;

use crate::types::{Money, Shares, Ticker};

/// Direction of a trade instruction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Side {
    Buy,
    Sell,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Side::Buy => "BUY",
            Side::Sell => "SELL",
        };
        f.pad(s)
    }
}

/// An immutable buy or sell of whole shares at the unit price the decision
/// was based on (ask for buys, bid for sells).
///
/// Changing the share count yields a new instruction, see
/// [`TradeInstruction::with_shares`].
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct TradeInstruction {
    side: Side,
    ticker: Ticker,
    shares: Shares,
    price_cents: i64,
}

impl TradeInstruction {
    pub fn buy(ticker: Ticker, shares: Shares, ask_cents: i64) -> Self {
        Self {
            side: Side::Buy,
            ticker,
            shares,
            price_cents: ask_cents,
        }
    }

    pub fn sell(ticker: Ticker, shares: Shares, bid_cents: i64) -> Self {
        Self {
            side: Side::Sell,
            ticker,
            shares,
            price_cents: bid_cents,
        }
    }

    /// Same instruction with a different share count.
    #[must_use]
    pub fn with_shares(&self, shares: Shares) -> Self {
        Self {
            shares,
            ..self.clone()
        }
    }

    #[inline]
    pub fn side(&self) -> Side {
        self.side
    }

    #[inline]
    pub fn ticker(&self) -> &Ticker {
        &self.ticker
    }

    #[inline]
    pub fn shares(&self) -> Shares {
        self.shares
    }

    #[inline]
    pub fn price_cents(&self) -> i64 {
        self.price_cents
    }

    #[inline]
    pub fn is_buy(&self) -> bool {
        self.side == Side::Buy
    }

    #[inline]
    pub fn is_sell(&self) -> bool {
        self.side == Side::Sell
    }

    /// `shares * price`, in cents.
    pub fn notional_cents(&self) -> i128 {
        i128::from(self.shares) * i128::from(self.price_cents)
    }
}

impl fmt::Display for TradeInstruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} @ {}",
            self.side,
            self.shares,
            self.ticker,
            Money(self.price_cents)
        )
    }
}
