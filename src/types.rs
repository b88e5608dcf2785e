//! Core types: Ticker, Money, Percent, Shares

use std::borrow::Borrow;
use std::fmt;

/// Ticker used for the synthetic cash position.
pub const CASH_TICKER: &str = "CASH";

/// Whole-number percentage of total account value.
pub type Percent = u32;

/// Whole-share count. Brokers in scope do not trade fractional shares.
pub type Shares = u64;

/// Instrument identifier as reported by the broker (e.g. `"VTI"`).
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(transparent)
)]
pub struct Ticker(String);

impl Ticker {
    pub fn new(ticker: impl Into<String>) -> Self {
        Self(ticker.into())
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Ticker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

impl From<&str> for Ticker {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for Ticker {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl Borrow<str> for Ticker {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for Ticker {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Amount in cents, displayed as dollars.
///
/// `Money(10050)` is $100.50. All sizing arithmetic stays in integer cents;
/// this wrapper only exists for formatting.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Money(pub i64);

impl Money {
    pub const ZERO: Money = Money(0);
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dollars = self.0 / 100;
        let cents = (self.0 % 100).abs();
        let text = if self.0 < 0 {
            format!("-${}.{:02}", dollars.abs(), cents)
        } else {
            format!("${}.{:02}", dollars, cents)
        };
        f.pad(&text)
    }
}
