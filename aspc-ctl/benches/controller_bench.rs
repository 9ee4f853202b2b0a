//! Controller Tick Performance Benchmark
//!
//! A junction ticks once per second, so the budget is generous; these
//! numbers show how many junctions one core can drive.
//!
//! **Goal:** a full tick (arbitration + countdown + snapshot) well under 10 µs
//! **Target:** >100k ticks/second

use aspc_common::events::{Direction, OverrideKind};
use chrono::{DateTime, Duration, Utc};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use aspc_ctl::signal::{
    resolve, select, Approaches, ControllerTuning, Override, OverridePayload, PhaseController,
    ServiceCounts, VehicleClass, VehicleCounts,
};

fn t0() -> DateTime<Utc> {
    Utc::now()
}

fn loaded_controller(now: DateTime<Utc>) -> PhaseController {
    let mut ctl = PhaseController::new("J001", ControllerTuning::default(), now);
    for (i, direction) in Direction::ALL.into_iter().enumerate() {
        let counts = VehicleCounts::new()
            .with(VehicleClass::Car, 10 + i as i64 * 5)
            .with(VehicleClass::TwoWheeler, 20)
            .with(VehicleClass::Bus, i as i64);
        ctl.apply_demand(direction, counts, now);
    }
    ctl
}

fn bench_tick(c: &mut Criterion) {
    let mut group = c.benchmark_group("controller_tick");

    group.bench_function("normal_mode", |b| {
        let start = t0();
        let mut ctl = loaded_controller(start);
        let mut second = 0i64;
        b.iter(|| {
            second += 1;
            black_box(ctl.tick(start + Duration::seconds(second), &[]));
        });
    });

    group.bench_function("with_pending_commands", |b| {
        let start = t0();
        let mut ctl = loaded_controller(start);
        let pending = vec![
            Override::new("J001", OverrideKind::ExtendGreen, OverridePayload::default(), start),
            Override::new("J001", OverrideKind::Optimize, OverridePayload::default(), start),
        ];
        let mut second = 0i64;
        b.iter(|| {
            // Stay inside the TTL so the commands keep being arbitrated
            second = (second % 100) + 1;
            black_box(ctl.tick(start + Duration::seconds(second), black_box(&pending)));
        });
    });

    group.finish();
}

fn bench_select(c: &mut Criterion) {
    let tuning = ControllerTuning::default();
    let mut approaches = Approaches::new();
    approaches.set_pcu(Direction::North, 42.0, tuning.queue_meters_per_pcu);
    approaches.set_pcu(Direction::South, 17.5, tuning.queue_meters_per_pcu);
    approaches.set_pcu(Direction::East, 33.0, tuning.queue_meters_per_pcu);
    approaches.set_pcu(Direction::West, 8.0, tuning.queue_meters_per_pcu);
    let mut served = ServiceCounts::new();
    served.record(Direction::East);

    c.bench_function("select_next_phase", |b| {
        b.iter(|| {
            black_box(select(
                black_box(&approaches),
                Some(Direction::North),
                &served,
                &tuning,
            ))
        });
    });
}

fn bench_resolve(c: &mut Criterion) {
    let mut group = c.benchmark_group("resolve_overrides");
    let now = t0();
    let kinds = [
        OverrideKind::Optimize,
        OverrideKind::ExtendGreen,
        OverrideKind::FlashYellow,
        OverrideKind::ForceRed,
        OverrideKind::EmergencyCorridor,
        OverrideKind::Reset,
    ];

    for count in [1usize, 6, 24] {
        let pending: Vec<Override> = (0..count)
            .map(|i| {
                Override::new(
                    "J001",
                    kinds[i % kinds.len()],
                    OverridePayload::default(),
                    now - Duration::seconds(i as i64),
                )
            })
            .collect();

        group.bench_with_input(BenchmarkId::from_parameter(count), &pending, |b, pending| {
            b.iter(|| black_box(resolve(black_box(pending), now, 120)));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_tick, bench_select, bench_resolve);
criterion_main!(benches);
