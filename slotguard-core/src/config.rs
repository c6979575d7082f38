use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Lease timing and retry budget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LeaseConfig {
    /// Lease time-to-live. Must exceed the slowest read-check-write.
    pub ttl_ms: u64,
    /// Retries after the first failed attempt
    pub retry_count: u32,
    /// Base pause between attempts
    pub retry_delay_ms: u64,
    /// Upper bound of the random extra pause added to each retry
    pub retry_jitter_ms: u64,
}

impl Default for LeaseConfig {
    fn default() -> Self {
        Self {
            ttl_ms: 5000,
            retry_count: 10,
            retry_delay_ms: 100,
            retry_jitter_ms: 100,
        }
    }
}

impl LeaseConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_millis(self.ttl_ms)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulingConfig {
    pub lease: LeaseConfig,
    /// Pause between reading a course's slots and checking them, inside the
    /// lease. Zero in production; tests raise it to widen the race window.
    pub critical_section_delay_ms: u64,
    /// Also serialize enrollments per student under a lease.
    pub lock_student_enrollments: bool,
}

impl SchedulingConfig {
    pub fn critical_section_delay(&self) -> Duration {
        Duration::from_millis(self.critical_section_delay_ms)
    }
}
