//! Accounts and quotes read from a JSON snapshot file.
//!
//! The file is what an export from the brokerage looks like after it has been
//! converted to integer cents:
//!
//! ```json
//! {
//!   "accounts": [
//!     {
//!       "number": "12345678",
//!       "handle": "9F2A01",
//!       "total_liquidation_cents": 10000000,
//!       "cash_available_cents": 50000,
//!       "positions": [
//!         { "ticker": "VTI", "market_value_cents": 6000000, "shares": 240 }
//!       ]
//!     }
//!   ],
//!   "quotes": [
//!     { "ticker": "VTI", "bid_cents": 24990, "ask_cents": 25010 }
//!   ]
//! }
//! ```
//!
//! `handle` is optional and defaults to the account number.

use std::path::Path;

use allotment::{AccountSnapshot, HeldPosition, PriceOracle, Quote, QuoteError, Ticker};
use log::{debug, info};
use rustc_hash::FxHashMap;
use serde::Deserialize;

use crate::error::BrokerError;
use crate::{AccountHandle, AccountProvider};

#[derive(Debug, Deserialize)]
struct SnapshotDocument {
    #[serde(default)]
    accounts: Vec<AccountEntry>,
    #[serde(default)]
    quotes: Vec<QuoteEntry>,
}

#[derive(Debug, Deserialize)]
struct AccountEntry {
    number: String,
    #[serde(default)]
    handle: Option<String>,
    total_liquidation_cents: i64,
    cash_available_cents: i64,
    #[serde(default)]
    positions: Vec<HeldPosition>,
}

#[derive(Debug, Deserialize)]
struct QuoteEntry {
    ticker: Ticker,
    bid_cents: i64,
    ask_cents: i64,
}

/// Read-only broker backed by a snapshot file loaded once at startup.
#[derive(Debug)]
pub struct SnapshotFileBroker {
    handles: FxHashMap<String, AccountHandle>,
    snapshots: FxHashMap<AccountHandle, AccountSnapshot>,
    quotes: FxHashMap<Ticker, (i64, i64)>,
}

impl SnapshotFileBroker {
    /// Load and validate a snapshot file.
    pub fn load(path: &Path) -> Result<Self, BrokerError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            BrokerError::Unreachable(format!("cannot read {}: {e}", path.display()))
        })?;
        let broker = Self::from_json(&content)?;
        info!(
            "Loaded snapshot {}: {} accounts, {} quotes",
            path.display(),
            broker.snapshots.len(),
            broker.quotes.len()
        );
        Ok(broker)
    }

    /// Parse a snapshot document.
    pub fn from_json(s: &str) -> Result<Self, BrokerError> {
        let doc: SnapshotDocument = serde_json::from_str(s)?;

        let mut handles = FxHashMap::default();
        let mut snapshots = FxHashMap::default();
        for entry in doc.accounts {
            let number = entry.number.trim().to_string();
            if number.is_empty() {
                return Err(BrokerError::Snapshot("account with empty number".into()));
            }
            if entry.total_liquidation_cents < 0 {
                return Err(BrokerError::Snapshot(format!(
                    "account {number}: negative total liquidation value"
                )));
            }
            if handles.contains_key(&number) {
                return Err(BrokerError::Snapshot(format!("duplicate account number {number}")));
            }
            let handle = AccountHandle::new(entry.handle.unwrap_or_else(|| number.clone()));
            if snapshots.contains_key(&handle) {
                return Err(BrokerError::Snapshot(format!("duplicate account handle {handle}")));
            }
            debug!("account {number} -> {handle}: {} positions", entry.positions.len());
            snapshots.insert(
                handle.clone(),
                AccountSnapshot {
                    total_liquidation_cents: entry.total_liquidation_cents,
                    positions: entry.positions,
                    cash_available_cents: entry.cash_available_cents,
                },
            );
            handles.insert(number, handle);
        }

        let quotes = doc
            .quotes
            .into_iter()
            .map(|q| (q.ticker, (q.bid_cents, q.ask_cents)))
            .collect();

        Ok(Self {
            handles,
            snapshots,
            quotes,
        })
    }

    /// Account numbers in the file.
    pub fn account_numbers(&self) -> impl Iterator<Item = &str> {
        self.handles.keys().map(String::as_str)
    }
}

impl AccountProvider for SnapshotFileBroker {
    fn resolve_account_handle(&self, account_number: &str) -> Result<AccountHandle, BrokerError> {
        self.handles
            .get(account_number.trim())
            .cloned()
            .ok_or_else(|| BrokerError::UnknownAccount(account_number.to_string()))
    }

    fn snapshot(&self, handle: &AccountHandle) -> Result<AccountSnapshot, BrokerError> {
        self.snapshots
            .get(handle)
            .cloned()
            .ok_or_else(|| BrokerError::UnknownAccount(handle.to_string()))
    }
}

impl PriceOracle for SnapshotFileBroker {
    fn quote(&self, ticker: &Ticker) -> Result<Quote, QuoteError> {
        let (bid, ask) = self
            .quotes
            .get(ticker)
            .ok_or_else(|| QuoteError::UnknownTicker(ticker.clone()))?;
        Quote::new(ticker, *bid, *ask)
    }
}
