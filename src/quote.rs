//! Bid/ask quotes and the price oracle seam.

use rustc_hash::FxHashMap;

use crate::types::Ticker;

/// Errors a price oracle reports for a single ticker.
///
/// The planner never substitutes a price: these propagate unchanged and
/// abort the whole plan.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum QuoteError {
    #[error("unknown ticker: {0}")]
    UnknownTicker(Ticker),

    #[error("quote unavailable for {ticker}: {reason}")]
    Unavailable { ticker: Ticker, reason: String },
}

/// A bid/ask pair in cents, valid for one planning pass.
///
/// Both sides are strictly positive; [`Quote::new`] is the only constructor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Quote {
    bid_cents: i64,
    ask_cents: i64,
}

impl Quote {
    /// Build a quote, rejecting a zero or negative side.
    pub fn new(ticker: &Ticker, bid_cents: i64, ask_cents: i64) -> Result<Self, QuoteError> {
        if bid_cents <= 0 || ask_cents <= 0 {
            return Err(QuoteError::Unavailable {
                ticker: ticker.clone(),
                reason: format!("non-positive bid/ask ({bid_cents}/{ask_cents} cents)"),
            });
        }
        Ok(Self {
            bid_cents,
            ask_cents,
        })
    }

    #[inline]
    pub fn bid_cents(&self) -> i64 {
        self.bid_cents
    }

    #[inline]
    pub fn ask_cents(&self) -> i64 {
        self.ask_cents
    }
}

/// Source of live quotes.
pub trait PriceOracle {
    /// Current bid/ask for `ticker`.
    fn quote(&self, ticker: &Ticker) -> Result<Quote, QuoteError>;
}

/// Fixed in-memory quote table.
///
/// Useful for replaying a captured snapshot and for tests.
#[derive(Clone, Debug, Default)]
pub struct QuoteTable {
    quotes: FxHashMap<Ticker, Quote>,
}

impl QuoteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the quote for `ticker`.
    pub fn insert(&mut self, ticker: impl Into<Ticker>, quote: Quote) {
        self.quotes.insert(ticker.into(), quote);
    }

    /// Builder-style insert that validates the bid/ask pair.
    pub fn with(
        mut self,
        ticker: impl Into<Ticker>,
        bid_cents: i64,
        ask_cents: i64,
    ) -> Result<Self, QuoteError> {
        let ticker = ticker.into();
        let quote = Quote::new(&ticker, bid_cents, ask_cents)?;
        self.quotes.insert(ticker, quote);
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.quotes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quotes.is_empty()
    }
}

impl PriceOracle for QuoteTable {
    fn quote(&self, ticker: &Ticker) -> Result<Quote, QuoteError> {
        self.quotes
            .get(ticker)
            .copied()
            .ok_or_else(|| QuoteError::UnknownTicker(ticker.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_positive_sides() {
        let t = Ticker::new("VTI");
        assert!(Quote::new(&t, 0, 101).is_err());
        assert!(Quote::new(&t, 100, 0).is_err());
        assert!(Quote::new(&t, -1, 101).is_err());
        assert!(Quote::new(&t, 100, 101).is_ok());
    }

    #[test]
    fn table_lookup() {
        let table = QuoteTable::new().with("VTI", 250_00, 250_05).unwrap();
        let q = table.quote(&Ticker::new("VTI")).unwrap();
        assert_eq!(q.bid_cents(), 250_00);
        assert_eq!(q.ask_cents(), 250_05);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn table_unknown_ticker() {
        let table = QuoteTable::new();
        let err = table.quote(&Ticker::new("NOPE")).unwrap_err();
        assert_eq!(err, QuoteError::UnknownTicker(Ticker::new("NOPE")));
        assert_eq!(err.to_string(), "unknown ticker: NOPE");
    }
}
