use criterion::{black_box, criterion_group, criterion_main, Criterion, BenchmarkId};

use slotguard_core::conflict::ConflictEngine;
use slotguard_core::normalize::normalize_slot;
use slotguard_core::segment::{segments_of, Segment};
use slotguard_core::types::*;

// ─── Helpers ────────────────────────────────────────────────────────────────

/// One-hour slots spread across the week, all ending by 22:00.
fn make_slots(count: u64) -> Vec<WeeklySlot> {
    (0..count)
        .map(|i| {
            let day = Weekday::ALL[(i % 7) as usize];
            let hour = (i / 7) % 22;
            let spec = normalize_slot(
                day.name(),
                &format!("{:02}:00", hour),
                &format!("{:02}:00", hour + 1),
            )
            .unwrap();
            WeeklySlot {
                id: i + 1,
                course_id: 1,
                day_of_week: spec.day_of_week,
                start_time: spec.start_time,
                end_time: spec.end_time,
            }
        })
        .collect()
}

// ─── Benchmarks ─────────────────────────────────────────────────────────────

fn bench_normalize_and_split(c: &mut Criterion) {
    c.bench_function("normalize_overnight_slot", |b| {
        b.iter(|| {
            let spec = normalize_slot(black_box("Saturday"), black_box("22:30"), black_box("01:15:30")).unwrap();
            segments_of(&spec).unwrap()
        })
    });
}

fn bench_check_pair(c: &mut Criterion) {
    let a = Segment::new(Weekday::Tuesday, 600, 720);
    let b2 = Segment::new(Weekday::Tuesday, 660, 780);
    c.bench_function("conflict_check_pair", |b| {
        b.iter(|| ConflictEngine::check_pair(black_box(&a), black_box(&b2)))
    });
}

fn bench_check_with_varying_slots(c: &mut Criterion) {
    let mut group = c.benchmark_group("conflict_check_slots");

    // Clear of every slot, so the whole list is scanned
    let candidate = normalize_slot("Sunday", "22:30", "23:30").unwrap();

    for count in [10, 100, 1000] {
        let existing = make_slots(count);
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, _| {
            b.iter(|| ConflictEngine::check(black_box(&candidate), black_box(&existing), None))
        });
    }

    group.finish();
}

fn bench_find_clashes(c: &mut Criterion) {
    let mut group = c.benchmark_group("conflict_find_clashes");

    for count in [10, 50, 200] {
        let specs: Vec<SlotSpec> = make_slots(count).iter().map(WeeklySlot::spec).collect();
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, _| {
            b.iter(|| ConflictEngine::find_clashes(black_box(&specs)))
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_normalize_and_split,
    bench_check_pair,
    bench_check_with_varying_slots,
    bench_find_clashes,
);
criterion_main!(benches);
