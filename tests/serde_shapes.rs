// Allow our dollar.cents digit grouping convention (e.g., 100_00 = $100.00)
#![allow(clippy::inconsistent_digit_grouping)]
#![cfg(feature = "serde")]

//! Wire shapes of the types a plan file is made of.

use allotment::{PlanSummary, RoundingPolicy, Side, Ticker, TradeInstruction};

#[test]
fn instruction_serializes_flat() {
    let order = TradeInstruction::buy(Ticker::new("VTI"), 12, 250_00);
    let v = serde_json::to_value(&order).unwrap();
    assert_eq!(v["side"], "Buy");
    assert_eq!(v["ticker"], "VTI");
    assert_eq!(v["shares"], 12);
    assert_eq!(v["price_cents"], 250_00);
}

#[test]
fn summary_fields() {
    let orders = vec![
        TradeInstruction::sell(Ticker::new("A"), 50, 100_00),
        TradeInstruction::buy(Ticker::new("B"), 98, 51_00),
    ];
    let v = serde_json::to_value(PlanSummary::new(&orders, 0)).unwrap();
    assert_eq!(v["sells"], 1);
    assert_eq!(v["buys"], 1);
    assert_eq!(v["sell_proceeds_cents"], 5_000_00);
    assert_eq!(v["buy_cost_cents"], 4_998_00);
    assert_eq!(v["cash_remaining_cents"], 2_00);
}

#[test]
fn rounding_policy_is_lowercase() {
    let policy: RoundingPolicy = serde_json::from_str("\"nearest\"").unwrap();
    assert_eq!(policy, RoundingPolicy::Nearest);
    assert_eq!(serde_json::to_string(&RoundingPolicy::Floor).unwrap(), "\"floor\"");
    let side: Side = serde_json::from_str("\"Sell\"").unwrap();
    assert_eq!(side, Side::Sell);
}
