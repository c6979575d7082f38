use criterion::{black_box, criterion_group, criterion_main, Criterion, BenchmarkId};

use slotguard_core::client::SchedulingClient;
use slotguard_core::config::SchedulingConfig;
use slotguard_core::infrastructure::{LeaseStore, ScheduleStore};
use slotguard_core::infrastructure_in_memory::{InMemoryLeaseStore, InMemoryScheduleStore};
use slotguard_core::types::*;

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .unwrap()
}

fn bench_lease_acquire_release(c: &mut Criterion) {
    let rt = runtime();
    let store = InMemoryLeaseStore::new();
    let resource = ResourceRef::course_schedule(1);

    c.bench_function("lease_acquire_release_cycle", |b| {
        b.iter(|| {
            rt.block_on(async {
                let result = store.try_acquire(&resource, "bench", 5000, 1000).await.unwrap();
                if let LeaseResult::Success { lease } = &result {
                    store.release(lease).await.unwrap();
                }
            })
        })
    });
}

fn bench_add_slots(c: &mut Criterion) {
    let rt = runtime();
    let mut group = c.benchmark_group("timetable_add_slots");

    for count in [10, 50, 100] {
        group.bench_with_input(BenchmarkId::new("slots", count), &count, |b, &count| {
            b.iter(|| {
                rt.block_on(async {
                    let store = InMemoryScheduleStore::new();
                    store
                        .register_course(Course {
                            id: 1,
                            code: "CS101".to_string(),
                            college_id: 1,
                        })
                        .await
                        .unwrap();
                    let client =
                        SchedulingClient::new(store, InMemoryLeaseStore::new(), SchedulingConfig::default());

                    // Each slot lands on a fresh quarter hour, so every add passes the check
                    for i in 0..count {
                        let day = Weekday::ALL[i % 7];
                        let minute = (i / 7) * 15;
                        let start = format!("{:02}:{:02}", minute / 60, minute % 60);
                        let end = format!("{:02}:{:02}", (minute + 15) / 60, (minute + 15) % 60);
                        client.add_slot(1, day.name(), &start, &end).await.unwrap();
                    }
                    black_box(client)
                })
            })
        });
    }

    group.finish();
}

fn bench_eviction(c: &mut Criterion) {
    let rt = runtime();

    c.bench_function("evict_1000_expired", |b| {
        b.iter(|| {
            rt.block_on(async {
                let store = InMemoryLeaseStore::new();
                for i in 0..1000 {
                    let resource = ResourceRef::course_schedule(i);
                    store.try_acquire(&resource, "bench", 100, 1000).await.unwrap();
                }

                // Evict all (now > expires_at)
                black_box(store.evict_expired(99999).await.unwrap())
            })
        })
    });
}

criterion_group!(benches, bench_lease_acquire_release, bench_add_slots, bench_eviction);
criterion_main!(benches);
