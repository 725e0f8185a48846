//! Desk-wide counters reported to operators.

use serde::{Deserialize, Serialize};

/// Point-in-time statistics, computed on read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeskStats {
    /// Orders currently held by the store, any status.
    pub total: usize,
    pub completed: usize,
    /// Lifetime count of cancelled orders (cancelled orders are purged, so
    /// this comes from a persisted tally).
    pub cancelled: u64,
    /// Orders waiting for an operator decision (`UNDER_REVIEW`).
    pub pending: usize,
    /// Orders that are not terminal.
    pub active: usize,
    pub banned: usize,
}

impl std::fmt::Display for DeskStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "total={} completed={} cancelled={} pending={} active={} banned={}",
            self.total, self.completed, self.cancelled, self.pending, self.active, self.banned
        )
    }
}
