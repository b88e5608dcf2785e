// Allow our dollar.cents digit grouping convention (e.g., 100_00 = $100.00)
#![allow(clippy::inconsistent_digit_grouping)]

//! # allotment
//!
//! Turn a nested, percentage-weighted asset allocation into whole-share trades.
//!
//! ## Features
//!
//! - **Hierarchical weights**: groups split their share among children, at any depth
//! - **Strict validation**: every sibling group must add up to exactly 100
//! - **Whole-share planning**: sells first, then cash-bounded buys
//! - **Exact arithmetic**: integer cents, no floating-point drift in sizing
//!
//! ## Quick Start
//!
//! ```
//! use allotment::allocation::{resolve, Weight};
//! use allotment::planner::plan;
//! use allotment::portfolio::{AccountSnapshot, HeldPosition, Portfolio};
//! use allotment::quote::QuoteTable;
//!
//! // 60% stocks (half US, half international), 40% bonds
//! let tree = vec![
//!     Weight::group(60, vec![Weight::leaf(50, "VTI"), Weight::leaf(50, "VXUS")]),
//!     Weight::leaf(40, "BND"),
//! ];
//! let targets = resolve(&tree).unwrap();
//! assert_eq!(targets.to_string(), "{BND: 40, VTI: 30, VXUS: 30}");
//!
//! // $10,000 account, all cash
//! let portfolio = Portfolio::from_snapshot(AccountSnapshot {
//!     total_liquidation_cents: 10_000_00,
//!     positions: vec![],
//!     cash_available_cents: 10_000_00,
//! });
//! let quotes = QuoteTable::new()
//!     .with("VTI", 300_00, 300_10).unwrap()
//!     .with("VXUS", 60_00, 60_05).unwrap()
//!     .with("BND", 72_00, 72_02).unwrap();
//!
//! let orders = plan(&portfolio, &targets, &quotes).unwrap();
//! assert_eq!(orders.len(), 3);
//! assert!(orders.iter().all(|o| o.is_buy()));
//! // Most expensive first
//! assert_eq!(orders[0].ticker().as_str(), "VTI");
//! assert_eq!(orders[0].shares(), 9);
//! ```
//!
//! ## Prices and money
//!
//! All amounts are `i64` cents. [`Money`] only formats them:
//!
//! ```
//! use allotment::Money;
//!
//! assert_eq!(format!("{}", Money(100_50)), "$100.50");
//! ```

pub mod allocation;
pub mod instruction;
pub mod planner;
pub mod portfolio;
pub mod quote;
mod types;

// Re-export public API
pub use allocation::{TargetAllocation, Weight, WeightingError, WeightingNode, resolve};
pub use instruction::{Side, TradeInstruction};
pub use planner::{
    AlwaysRebalance, BuyOnly, PlanOptions, PlanSummary, RoundingPolicy, Strategy, plan,
};
#[cfg(feature = "parallel")]
pub use planner::plan_accounts;
pub use portfolio::{AccountSnapshot, HeldPosition, Portfolio, Position};
pub use quote::{PriceOracle, Quote, QuoteError, QuoteTable};
pub use types::{CASH_TICKER, Money, Percent, Shares, Ticker};
