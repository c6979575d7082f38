//! Lease-based mutual exclusion for read-check-write sequences.
//!
//! The lease is the only proof of ownership: it lives in the [`LeaseStore`],
//! not in process memory, so callers in different processes that share a
//! store exclude each other. Waiters are not queued; whoever retries first
//! after a release wins.

use std::future::Future;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use rand::Rng;

use crate::config::LeaseConfig;
use crate::error::{Result, ScheduleError};
use crate::infrastructure::LeaseStore;
use crate::types::{Lease, LeaseResult, ResourceRef};

pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

pub struct LockCoordinator<L> {
    store: L,
    config: LeaseConfig,
    /// Identifies this instance in lease records
    holder: String,
}

impl<L: LeaseStore> LockCoordinator<L> {
    pub fn new(store: L, config: LeaseConfig) -> Self {
        Self {
            store,
            config,
            holder: format!("slotguard-{}", nanoid::nanoid!(10)),
        }
    }

    pub fn holder(&self) -> &str {
        &self.holder
    }

    pub fn config(&self) -> &LeaseConfig {
        &self.config
    }

    pub fn store(&self) -> &L {
        &self.store
    }

    /// Acquire a lease, retrying up to `retry_count` times with jittered
    /// backoff. Fails with `LockUnavailable` once the budget is spent.
    pub async fn acquire(&self, resource: &ResourceRef, ttl: Duration) -> Result<Lease> {
        let attempts = self.config.retry_count.saturating_add(1);
        let ttl_ms = ttl.as_millis() as u64;

        for attempt in 1..=attempts {
            match self
                .store
                .try_acquire(resource, &self.holder, ttl_ms, now_ms())
                .await?
            {
                LeaseResult::Success { lease } => {
                    tracing::debug!(resource = %resource, lease_id = %lease.id, attempt, "Lease acquired");
                    return Ok(lease);
                }
                LeaseResult::Failure {
                    existing_lease,
                    wait_time,
                } => {
                    tracing::debug!(
                        resource = %resource,
                        attempt,
                        held_by = existing_lease.as_ref().map(|l| l.holder.as_str()),
                        wait_time,
                        "Lease contended"
                    );
                    if attempt < attempts {
                        tokio::time::sleep(self.backoff()).await;
                    }
                }
            }
        }

        tracing::warn!(resource = %resource, attempts, "Lease unavailable");
        Err(ScheduleError::LockUnavailable {
            resource: resource.key(),
            attempts,
        })
    }

    /// Release a held lease. False means it had already expired and may now
    /// belong to someone else.
    pub async fn release(&self, lease: &Lease) -> Result<bool> {
        self.store.release(lease).await
    }

    /// Runs `action` while holding an exclusive lease on `resource`.
    ///
    /// The lease is released once `action` finishes, whether it succeeded
    /// or not. If the returned future is dropped mid-action the lease is
    /// left to expire after `ttl`.
    pub async fn with_exclusive_lease<T, F, Fut>(
        &self,
        resource: &ResourceRef,
        ttl: Duration,
        action: F,
    ) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let lease = self.acquire(resource, ttl).await?;
        let outcome = action().await;

        match self.release(&lease).await {
            Ok(true) => tracing::debug!(resource = %resource, lease_id = %lease.id, "Lease released"),
            Ok(false) => tracing::warn!(
                resource = %resource,
                lease_id = %lease.id,
                ttl_ms = lease.ttl,
                "Lease expired before release"
            ),
            Err(e) => tracing::warn!(resource = %resource, error = %e, "Failed to release lease"),
        }

        outcome
    }

    /// Drop expired leases. Returns the number evicted.
    pub async fn evict_expired(&self) -> Result<usize> {
        self.store.evict_expired(now_ms()).await
    }

    pub async fn active_leases(&self) -> Result<Vec<Lease>> {
        self.store.active_leases(now_ms()).await
    }

    fn backoff(&self) -> Duration {
        let jitter = if self.config.retry_jitter_ms > 0 {
            rand::thread_rng().gen_range(0..=self.config.retry_jitter_ms)
        } else {
            0
        };
        Duration::from_millis(self.config.retry_delay_ms + jitter)
    }
}
