//! # slotguard-core
//!
//! Conflict detection and lease-guarded scheduling for weekly course
//! timetables. Provides day/time normalization, midnight-aware interval
//! segmentation, half-open overlap checks, and a lease coordinator that
//! serializes read-check-write sequences per course.

pub mod client;
pub mod config;
pub mod conflict;
pub mod coordinator;
pub mod error;
pub mod infrastructure;
#[path = "infrastructure_in_memory.rs"]
pub mod infrastructure_in_memory;
#[cfg(feature = "sqlite")]
#[path = "infrastructure_sqlite.rs"]
pub mod infrastructure_sqlite;
pub mod normalize;
pub mod segment;
pub mod types;
pub mod validator;

pub use error::{Result, ScheduleError};

#[cfg(test)]
mod normalize_test;
#[cfg(test)]
mod coordinator_test;
