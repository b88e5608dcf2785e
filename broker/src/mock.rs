//! Mock broker for testing: implements [`AccountProvider`] and [`PriceOracle`]
//! with scripted accounts and quotes.
//!
//! ```
//! use allotment_broker::mock::MockBroker;
//! use allotment_broker::AccountProvider;
//!
//! let broker = MockBroker::builder()
//!     .with_account("12345678", 10_000_00, 0)
//!     .with_position("12345678", "VTI", 10_000_00, 40)
//!     .with_quote("VTI", 249_90, 250_10)
//!     .build();
//!
//! let handle = broker.resolve_account_handle("12345678").unwrap();
//! let snapshot = broker.snapshot(&handle).unwrap();
//! assert_eq!(snapshot.positions.len(), 1);
//! ```

use std::sync::Mutex;

use allotment::{AccountSnapshot, HeldPosition, PriceOracle, Quote, QuoteError, Ticker};

use crate::error::BrokerError;
use crate::{AccountHandle, AccountProvider};

/// Prefix the mock puts in front of account numbers to form handles.
pub const HANDLE_PREFIX: &str = "mock-";

#[derive(Clone, Debug)]
struct MockAccount {
    number: String,
    total_cents: i64,
    cash_cents: i64,
    positions: Vec<HeldPosition>,
}

/// Builder for `MockBroker`.
pub struct MockBrokerBuilder {
    accounts: Vec<MockAccount>,
    quotes: Vec<(Ticker, i64, i64)>,
    unreachable: bool,
}

impl MockBrokerBuilder {
    /// Add an account. Calling again with the same number replaces its totals
    /// but keeps its positions.
    pub fn with_account(mut self, number: &str, total_cents: i64, cash_cents: i64) -> Self {
        match self.accounts.iter_mut().find(|a| a.number == number) {
            Some(account) => {
                account.total_cents = total_cents;
                account.cash_cents = cash_cents;
            }
            None => self.accounts.push(MockAccount {
                number: number.to_string(),
                total_cents,
                cash_cents,
                positions: Vec::new(),
            }),
        }
        self
    }

    /// Add a holding to an account, creating an empty account if needed.
    pub fn with_position(
        mut self,
        number: &str,
        ticker: &str,
        market_value_cents: i64,
        shares: u64,
    ) -> Self {
        if !self.accounts.iter().any(|a| a.number == number) {
            self = self.with_account(number, 0, 0);
        }
        if let Some(account) = self.accounts.iter_mut().find(|a| a.number == number) {
            account
                .positions
                .push(HeldPosition::new(ticker, market_value_cents, shares));
        }
        self
    }

    /// Script a quote. Zero or negative sides are stored as-is and surface as
    /// [`QuoteError::Unavailable`] when asked for.
    pub fn with_quote(mut self, ticker: &str, bid_cents: i64, ask_cents: i64) -> Self {
        self.quotes.push((Ticker::new(ticker), bid_cents, ask_cents));
        self
    }

    /// Every call fails with [`BrokerError::Unreachable`].
    pub fn unreachable(mut self) -> Self {
        self.unreachable = true;
        self
    }

    pub fn build(self) -> MockBroker {
        MockBroker {
            accounts: self.accounts,
            quotes: self.quotes,
            unreachable: self.unreachable,
            resolved: Mutex::new(Vec::new()),
            quoted: Mutex::new(Vec::new()),
        }
    }
}

/// A mock broker that records lookups and returns scripted responses.
pub struct MockBroker {
    accounts: Vec<MockAccount>,
    quotes: Vec<(Ticker, i64, i64)>,
    unreachable: bool,
    resolved: Mutex<Vec<String>>,
    quoted: Mutex<Vec<Ticker>>,
}

impl MockBroker {
    pub fn builder() -> MockBrokerBuilder {
        MockBrokerBuilder {
            accounts: Vec::new(),
            quotes: Vec::new(),
            unreachable: false,
        }
    }

    /// Account numbers passed to `resolve_account_handle`, in call order.
    pub fn resolved_accounts(&self) -> Vec<String> {
        self.resolved.lock().map(|r| r.clone()).unwrap_or_default()
    }

    /// Tickers passed to `quote`, in call order.
    pub fn quoted_tickers(&self) -> Vec<Ticker> {
        self.quoted.lock().map(|q| q.clone()).unwrap_or_default()
    }

    fn check_reachable(&self) -> Result<(), BrokerError> {
        if self.unreachable {
            return Err(BrokerError::Unreachable("mock: provider offline".into()));
        }
        Ok(())
    }
}

impl AccountProvider for MockBroker {
    fn resolve_account_handle(&self, account_number: &str) -> Result<AccountHandle, BrokerError> {
        self.check_reachable()?;
        if let Ok(mut resolved) = self.resolved.lock() {
            resolved.push(account_number.to_string());
        }
        self.accounts
            .iter()
            .find(|a| a.number == account_number)
            .map(|a| AccountHandle::new(format!("{HANDLE_PREFIX}{}", a.number)))
            .ok_or_else(|| BrokerError::UnknownAccount(account_number.to_string()))
    }

    fn snapshot(&self, handle: &AccountHandle) -> Result<AccountSnapshot, BrokerError> {
        self.check_reachable()?;
        let number = handle
            .as_str()
            .strip_prefix(HANDLE_PREFIX)
            .ok_or_else(|| BrokerError::UnknownAccount(handle.to_string()))?;
        let account = self
            .accounts
            .iter()
            .find(|a| a.number == number)
            .ok_or_else(|| BrokerError::UnknownAccount(number.to_string()))?;
        Ok(AccountSnapshot {
            total_liquidation_cents: account.total_cents,
            positions: account.positions.clone(),
            cash_available_cents: account.cash_cents,
        })
    }
}

impl PriceOracle for MockBroker {
    fn quote(&self, ticker: &Ticker) -> Result<Quote, QuoteError> {
        if self.unreachable {
            return Err(QuoteError::Unavailable {
                ticker: ticker.clone(),
                reason: "mock: provider offline".into(),
            });
        }
        if let Ok(mut quoted) = self.quoted.lock() {
            quoted.push(ticker.clone());
        }
        let (_, bid, ask) = self
            .quotes
            .iter()
            .find(|(t, _, _)| t == ticker)
            .ok_or_else(|| QuoteError::UnknownTicker(ticker.clone()))?;
        Quote::new(ticker, *bid, *ask)
    }
}
