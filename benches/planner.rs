// Allow our dollar.cents digit grouping convention (e.g., 100_00 = $100.00)
#![allow(clippy::inconsistent_digit_grouping)]

//! Resolver and planner benchmarks.

use allotment::{
    AccountSnapshot, HeldPosition, Portfolio, QuoteTable, TargetAllocation, Ticker, Weight, plan,
    resolve,
};
use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};

/// Simple deterministic PRNG (xorshift32)
struct XorShift(u32);

impl XorShift {
    fn next(&mut self) -> u32 {
        self.0 ^= self.0 << 13;
        self.0 ^= self.0 >> 17;
        self.0 ^= self.0 << 5;
        self.0
    }
}

/// A balanced tree with `fanout` children per group, `depth` levels deep.
///
/// Each group gives its last child whatever remains of 100.
fn generate_tree(fanout: usize, depth: usize, next: &mut usize) -> Vec<Weight> {
    let even = 100 / fanout as u32;
    (0..fanout)
        .map(|i| {
            let pct = if i + 1 == fanout {
                100 - even * (fanout as u32 - 1)
            } else {
                even
            };
            if depth <= 1 {
                *next += 1;
                Weight::leaf(pct, format!("S{:04}", *next - 1))
            } else {
                Weight::group(pct, generate_tree(fanout, depth - 1, next))
            }
        })
        .collect()
}

/// `n_stocks` equally weighted targets, about half held with random drift.
fn generate_account(n_stocks: usize) -> (Portfolio, TargetAllocation, QuoteTable) {
    let mut rng = XorShift(42);
    let mut positions = Vec::new();
    let mut targets = TargetAllocation::new();
    let mut quotes = QuoteTable::new();
    let weight = (100 / n_stocks).max(1) as u32;
    let cash = 50_000_00i64;

    for i in 0..n_stocks {
        let ticker = Ticker::new(format!("S{i:04}"));
        let bid = 10_00 + i64::from(rng.next() % 500_00);
        quotes = quotes
            .with(ticker.clone(), bid, bid + 5)
            .expect("positive quote");
        targets.insert(ticker.clone(), weight);
        if rng.next() % 2 == 0 {
            let shares = u64::from(rng.next() % 1_000);
            positions.push(HeldPosition::new(ticker, bid * shares as i64, shares));
        }
    }

    let total = positions.iter().map(|p| p.market_value_cents).sum::<i64>() + cash;
    let portfolio = Portfolio::from_snapshot(AccountSnapshot {
        total_liquidation_cents: total,
        positions,
        cash_available_cents: cash,
    });
    (portfolio, targets, quotes)
}

fn bench_resolve(c: &mut Criterion) {
    let mut group = c.benchmark_group("allocation/resolve");

    for (fanout, depth) in [(4, 2), (4, 4), (10, 3)] {
        let mut next = 0;
        let tree = generate_tree(fanout, depth, &mut next);
        group.bench_with_input(
            BenchmarkId::new("leaves", next),
            &tree,
            |b, tree| b.iter(|| black_box(resolve(tree))),
        );
    }

    group.finish();
}

fn bench_plan(c: &mut Criterion) {
    let mut group = c.benchmark_group("planner/plan");

    for n in [10, 100, 1_000] {
        let (portfolio, targets, quotes) = generate_account(n);
        group.bench_with_input(BenchmarkId::new("stocks", n), &n, |b, _| {
            b.iter(|| black_box(plan(&portfolio, &targets, &quotes)))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_resolve, bench_plan);
criterion_main!(benches);
