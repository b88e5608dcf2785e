//! allotment-rebalancer: plan trades that move brokerage accounts toward a
//! nested percentage allocation.
//!
//! Reads weighting entries from a JSON file, fetches account snapshots and
//! quotes from a broker, resolves each entry into a target table, and plans
//! whole-share trades with an audit trail. Approved plans are written as JSON
//! for an external executor.

pub mod audit;
pub mod config;
pub mod drift;
pub mod error;
pub mod run;
pub mod weighting;
