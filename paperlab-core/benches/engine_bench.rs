//! Criterion benchmarks for the hot paths.
//!
//! 1. Full bar-loop backtest over synthetic minute bars
//! 2. Deterministic fill draw
//! 3. Calendar open check

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use chrono::{NaiveDate, NaiveTime};
use paperlab_core::calendar::{self, Schedule, Session};
use paperlab_core::domain::{Bar, Direction, Signal};
use paperlab_core::engine::{ExecutionLoop, NullSink, RunParams};
use paperlab_core::execution::{
    evaluate_fill, CostModelConfig, CostProfile, ExecutionSimulator, SimulatorConfig,
};
use paperlab_core::risk::{RiskConfig, RiskManager};
use paperlab_core::strategy::Strategy;

fn make_bars(n: usize) -> Vec<Bar> {
    let base = NaiveDate::from_ymd_opt(2026, 3, 2)
        .unwrap()
        .and_hms_opt(9, 1, 0)
        .unwrap();
    (0..n)
        .map(|i| {
            let close = 3000.0 + (i as f64 * 0.11).sin() * 40.0;
            Bar {
                timestamp: base + chrono::Duration::minutes(i as i64),
                open: close - 1.0,
                high: close + 5.0,
                low: close - 5.0,
                close,
            }
        })
        .collect()
}

fn schedule() -> Schedule {
    Schedule {
        sessions: vec![Session::new(
            NaiveTime::from_hms_opt(0, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(23, 59, 0).unwrap(),
        )],
        weekdays: (1..=7).collect(),
        ..Schedule::default()
    }
}

struct SwingStrategy;

impl Strategy for SwingStrategy {
    fn signal(&mut self, closes: &[f64], _step: usize) -> Signal {
        if closes.len() < 2 {
            return Signal::Flat;
        }
        let last = closes[closes.len() - 1];
        let prev = closes[closes.len() - 2];
        if last > prev {
            Signal::Long
        } else if last < prev {
            Signal::Short
        } else {
            Signal::Flat
        }
    }
}

fn bench_backtest(c: &mut Criterion) {
    let mut group = c.benchmark_group("backtest");
    for n in [1_000usize, 10_000] {
        let bars = make_bars(n);
        group.bench_with_input(BenchmarkId::new("run", n), &bars, |b, bars| {
            b.iter(|| {
                let mut engine = ExecutionLoop::new(
                    RunParams::new("M2609", 1_000_000.0),
                    schedule(),
                    SwingStrategy,
                    RiskManager::new(RiskConfig {
                        atr_period: 14,
                        take_profit_multiplier: Some(2.0),
                        ..RiskConfig::default()
                    }),
                    ExecutionSimulator::new(
                        SimulatorConfig {
                            contract_multiplier: 10.0,
                            commission_per_contract: 1.5,
                            commission_min: 5.0,
                        },
                        CostModelConfig::frictionless(),
                    ),
                );
                black_box(engine.run(bars, &mut NullSink))
            })
        });
    }
    group.finish();
}

fn bench_fill_draw(c: &mut Criterion) {
    let profile = CostProfile {
        name: "bench".into(),
        window: None,
        slippage: 1.0,
        commission_multiplier: 1.0,
        fill_ratio_min: 0.5,
        fill_ratio_max: 1.0,
        reject_probability: 0.05,
    };
    let when = NaiveDate::from_ymd_opt(2026, 3, 2)
        .unwrap()
        .and_hms_opt(9, 31, 0)
        .unwrap();
    c.bench_function("fill_draw", |b| {
        b.iter(|| {
            black_box(evaluate_fill(
                black_box("M2609"),
                Direction::Long,
                black_box(3.0),
                when,
                &profile,
            ))
        })
    });
}

fn bench_calendar(c: &mut Criterion) {
    let schedule = schedule();
    let when = NaiveDate::from_ymd_opt(2026, 3, 2)
        .unwrap()
        .and_hms_opt(10, 0, 0)
        .unwrap();
    c.bench_function("calendar_is_open", |b| {
        b.iter(|| black_box(calendar::is_open(black_box(when), &schedule)))
    });
}

criterion_group!(benches, bench_backtest, bench_fill_draw, bench_calendar);
criterion_main!(benches);
