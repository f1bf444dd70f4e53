//! Optimistic concurrency primitives.

use serde::{Deserialize, Serialize};

/// Optimistic concurrency expectation for a stored record.
///
/// Version stamps are plain `u64` counters: 0 means "never persisted", and
/// every durable write bumps the stamp by one. `Exact(0)` therefore doubles
/// as "the record must not exist yet".
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExpectedVersion {
    /// Skip version checking (useful for idempotent backfills, migrations, etc.).
    Any,
    /// Require the record to be at an exact version.
    Exact(u64),
}

impl ExpectedVersion {
    pub fn matches(self, actual: u64) -> bool {
        match self {
            ExpectedVersion::Any => true,
            ExpectedVersion::Exact(v) => v == actual,
        }
    }
}
