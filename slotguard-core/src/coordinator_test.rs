#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;

    use crate::config::LeaseConfig;
    use crate::coordinator::LockCoordinator;
    use crate::error::ScheduleError;
    use crate::infrastructure_in_memory::InMemoryLeaseStore;
    use crate::types::ResourceRef;

    fn quick(retry_count: u32) -> LeaseConfig {
        LeaseConfig {
            ttl_ms: 5000,
            retry_count,
            retry_delay_ms: 5,
            retry_jitter_ms: 5,
        }
    }

    #[tokio::test]
    async fn acquire_then_contend() {
        let store = InMemoryLeaseStore::new();
        let a = LockCoordinator::new(store.clone(), quick(0));
        let b = LockCoordinator::new(store, quick(2));
        let course = ResourceRef::course_schedule(1);

        let lease = a.acquire(&course, Duration::from_secs(5)).await.unwrap();
        assert_eq!(lease.resource.key(), "course-schedule:1");
        assert_eq!(lease.holder, a.holder());

        let err = b.acquire(&course, Duration::from_secs(5)).await.unwrap_err();
        assert!(matches!(
            err,
            ScheduleError::LockUnavailable { ref resource, attempts: 3 } if resource == "course-schedule:1"
        ));

        // A different course is independent
        assert!(b.acquire(&ResourceRef::course_schedule(2), Duration::from_secs(5)).await.is_ok());

        assert!(a.release(&lease).await.unwrap());
        assert!(b.acquire(&course, Duration::from_secs(5)).await.is_ok());
    }

    #[tokio::test]
    async fn lease_is_released_after_failed_action() {
        let store = InMemoryLeaseStore::new();
        let coordinator = LockCoordinator::new(store, quick(0));
        let course = ResourceRef::course_schedule(7);

        let result: Result<(), _> = coordinator
            .with_exclusive_lease(&course, Duration::from_secs(5), || async {
                Err(ScheduleError::invalid("boom"))
            })
            .await;
        assert!(matches!(result, Err(ScheduleError::InvalidInput(_))));
        assert!(coordinator.active_leases().await.unwrap().is_empty());

        let value = coordinator
            .with_exclusive_lease(&course, Duration::from_secs(5), || async { Ok(42) })
            .await
            .unwrap();
        assert_eq!(value, 42);
        assert!(coordinator.active_leases().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn abandoned_lease_expires_and_is_taken_over() {
        let store = InMemoryLeaseStore::new();
        let crashed = LockCoordinator::new(store.clone(), quick(0));
        let survivor = LockCoordinator::new(store, quick(20));
        let course = ResourceRef::course_schedule(3);

        // Never released
        let stale = crashed.acquire(&course, Duration::from_millis(30)).await.unwrap();

        let fresh = survivor.acquire(&course, Duration::from_secs(5)).await.unwrap();
        assert_ne!(fresh.id, stale.id);

        // The stale token can no longer release the survivor's lease
        assert!(!crashed.release(&stale).await.unwrap());
        assert_eq!(survivor.active_leases().await.unwrap(), vec![fresh]);
    }

    #[tokio::test]
    async fn critical_sections_never_interleave() {
        let store = InMemoryLeaseStore::new();
        let course = ResourceRef::course_schedule(11);
        let inside = Arc::new(AtomicBool::new(false));
        let completed = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..4 {
            let coordinator = LockCoordinator::new(store.clone(), quick(200));
            let course = course.clone();
            let inside = inside.clone();
            let completed = completed.clone();
            handles.push(tokio::spawn(async move {
                coordinator
                    .with_exclusive_lease(&course, Duration::from_secs(5), || async {
                        assert!(!inside.swap(true, Ordering::SeqCst), "two holders at once");
                        tokio::time::sleep(Duration::from_millis(10)).await;
                        inside.store(false, Ordering::SeqCst);
                        completed.fetch_add(1, Ordering::SeqCst);
                        Ok(())
                    })
                    .await
            }));
        }

        for handle in handles {
            handle.await.unwrap().unwrap();
        }
        assert_eq!(completed.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn evict_drops_only_expired() {
        let store = InMemoryLeaseStore::new();
        let coordinator = LockCoordinator::new(store, quick(0));

        coordinator
            .acquire(&ResourceRef::course_schedule(1), Duration::from_millis(1))
            .await
            .unwrap();
        coordinator
            .acquire(&ResourceRef::student_schedule(1), Duration::from_secs(60))
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(coordinator.evict_expired().await.unwrap(), 1);

        let active = coordinator.active_leases().await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].resource.key(), "student-schedule:1");
    }
}
