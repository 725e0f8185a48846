//! The desk's tables, held together so they can be checkpointed as a unit.

use chrono::{DateTime, Utc};

use orderdesk_types::{DeskStats, Result};

use crate::{BanRegistry, ClaimTable, OrderStore, Snapshot};

/// Orders, bans and claims.
///
/// Cloning a `DeskState` is the checkpoint used to roll back a mutation
/// whose snapshot could not be written.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeskState {
    pub orders: OrderStore,
    pub bans: BanRegistry,
    pub claims: ClaimTable,
}

impl DeskState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Durable part of the state. Claims are left out.
    #[must_use]
    pub fn to_snapshot(&self, taken_at: DateTime<Utc>) -> Snapshot {
        Snapshot {
            taken_at,
            orders: self.orders.to_sorted_vec(),
            banned: self.bans.list(),
            cancelled_total: self.orders.cancelled_total(),
        }
    }

    /// Rebuild from a decoded snapshot. The claim table starts empty.
    pub fn from_snapshot(snapshot: Snapshot) -> Result<Self> {
        Ok(Self {
            orders: OrderStore::from_parts(snapshot.orders, snapshot.cancelled_total)?,
            bans: snapshot.banned.into_iter().collect(),
            claims: ClaimTable::new(),
        })
    }

    #[must_use]
    pub fn stats(&self) -> DeskStats {
        DeskStats {
            banned: self.bans.len(),
            ..self.orders.stats()
        }
    }
}
