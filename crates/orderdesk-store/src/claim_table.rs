//! Admin claim table.
//!
//! Maps each operator to the one order they are resolving, with a reverse
//! index so a claim on an order can be found (and released) by owner.
//! Both directions are kept in lockstep: an operator holds at most one claim
//! and an order is held by at most one operator.
//!
//! The table does not know order statuses. The lifecycle engine checks the
//! `UNDER_REVIEW` precondition and calls [`ClaimTable::claim`] inside the
//! same critical section, which is what makes acceptance an atomic
//! check-and-set.

use std::collections::HashMap;

use orderdesk_types::{AdminClaim, DeskError, Result, UserId};

/// Session-scoped `operator → owner` claims. Never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClaimTable {
    by_operator: HashMap<UserId, UserId>,
    by_owner: HashMap<UserId, UserId>,
}

impl ClaimTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `operator` is resolving the order of `owner`.
    ///
    /// Claiming the same pair again is a no-op.
    ///
    /// # Errors
    /// - `OperatorBusy` if the operator already holds a different claim
    /// - `AlreadyClaimed` if another operator holds this order
    pub fn claim(&mut self, operator: UserId, owner: UserId) -> Result<AdminClaim> {
        if let Some(&holding) = self.by_operator.get(&operator) {
            if holding == owner {
                return Ok(AdminClaim { operator, owner });
            }
            return Err(DeskError::OperatorBusy { operator, holding });
        }
        if let Some(&holder) = self.by_owner.get(&owner) {
            return Err(DeskError::AlreadyClaimed { owner, holder });
        }
        self.by_operator.insert(operator, owner);
        self.by_owner.insert(owner, operator);
        Ok(AdminClaim { operator, owner })
    }

    /// Drop the operator's claim, returning it if there was one.
    pub fn release(&mut self, operator: UserId) -> Option<AdminClaim> {
        let owner = self.by_operator.remove(&operator)?;
        self.by_owner.remove(&owner);
        Some(AdminClaim { operator, owner })
    }

    /// Drop whatever claim points at `owner`'s order.
    pub fn release_owner(&mut self, owner: UserId) -> Option<AdminClaim> {
        let operator = self.by_owner.remove(&owner)?;
        self.by_operator.remove(&operator);
        Some(AdminClaim { operator, owner })
    }

    /// The owner whose order `operator` is resolving.
    #[must_use]
    pub fn owner_for(&self, operator: UserId) -> Option<UserId> {
        self.by_operator.get(&operator).copied()
    }

    /// The operator currently resolving `owner`'s order.
    #[must_use]
    pub fn holder_of(&self, owner: UserId) -> Option<UserId> {
        self.by_owner.get(&owner).copied()
    }

    /// All claims, sorted by operator.
    #[must_use]
    pub fn claims(&self) -> Vec<AdminClaim> {
        let mut claims: Vec<AdminClaim> = self
            .by_operator
            .iter()
            .map(|(&operator, &owner)| AdminClaim { operator, owner })
            .collect();
        claims.sort_by_key(|c| c.operator);
        claims
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.by_operator.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_operator.is_empty()
    }
}
