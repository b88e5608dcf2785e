//! Account snapshot and quote providers for allotment.
//!
//! The planner in [`allotment`] only sees an [`AccountSnapshot`] and a
//! [`PriceOracle`]. This crate defines where those come from:
//!
//! - [`AccountProvider`]: account number → handle → snapshot
//! - [`snapshot_file::SnapshotFileBroker`]: accounts and quotes from a JSON file
//! - [`mock::MockBroker`]: scriptable provider for tests

pub mod error;
pub mod mock;
pub mod snapshot_file;

pub use error::BrokerError;

use std::fmt;

use allotment::{AccountSnapshot, PriceOracle};

/// Provider-specific account identifier, obtained once per run from the
/// public account number.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct AccountHandle(String);

impl AccountHandle {
    pub fn new(handle: impl Into<String>) -> Self {
        Self(handle.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A source of account state.
///
/// Resolution and fetching are separate steps; callers cache the handle for
/// the duration of a run instead of the provider memoizing it.
pub trait AccountProvider {
    /// Map a public account number to the provider's handle.
    ///
    /// Fails with [`BrokerError::UnknownAccount`] for numbers the provider
    /// does not know, [`BrokerError::Unreachable`] when it cannot be asked.
    fn resolve_account_handle(&self, account_number: &str) -> Result<AccountHandle, BrokerError>;

    /// Current holdings, cash and total liquidation value.
    fn snapshot(&self, handle: &AccountHandle) -> Result<AccountSnapshot, BrokerError>;
}

/// Both halves of a brokerage: account state and quotes.
pub trait Broker: AccountProvider + PriceOracle {}

impl<T: AccountProvider + PriceOracle> Broker for T {}
