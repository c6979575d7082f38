use serde::{Deserialize, Serialize};

use super::ResourceRef;

/// A time-bound exclusive lock on a resource.
///
/// The `id` is an opaque token; only the holder of a lease with a matching
/// token can release it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lease {
    /// Unique lease token
    pub id: String,
    /// Instance that acquired the lease (diagnostics only)
    pub holder: String,
    /// The leased resource
    pub resource: ResourceRef,
    /// When the lease was acquired (epoch ms)
    pub acquired_at: u64,
    /// Time-to-live in milliseconds
    pub ttl: u64,
    /// When the lease will expire (acquired_at + ttl)
    pub expires_at: u64,
}

impl Lease {
    pub fn new(id: String, holder: String, resource: ResourceRef, ttl: u64, now: u64) -> Self {
        Self {
            id,
            holder,
            resource,
            acquired_at: now,
            ttl,
            expires_at: now.saturating_add(ttl),
        }
    }

    /// A lease is abandoned once its TTL has fully elapsed.
    pub fn is_expired(&self, now: u64) -> bool {
        self.expires_at <= now
    }

    /// Milliseconds until expiry, zero once expired.
    pub fn remaining_ms(&self, now: u64) -> u64 {
        self.expires_at.saturating_sub(now)
    }
}

/// Result of attempting to acquire a lease
#[derive(Debug, Clone)]
pub enum LeaseResult {
    Success {
        lease: Lease,
    },
    Failure {
        /// The live lease currently blocking the resource, when known
        existing_lease: Option<Lease>,
        /// Time until the blocking lease expires
        wait_time: Option<u64>,
    },
}
