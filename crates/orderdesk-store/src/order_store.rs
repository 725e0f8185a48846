//! Order store holding one order per owner.
//!
//! The store is keyed by [`Order::owner`], which is what makes "at most one
//! order per user" structural rather than checked. It also keeps the
//! lifetime tally of cancellations, because cancelled orders are purged and
//! would otherwise vanish from the statistics.

use std::collections::HashMap;

use orderdesk_types::{DeskError, DeskStats, Order, OrderStatus, Result, UserId};

/// Durable mapping `owner → order`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderStore {
    orders: HashMap<UserId, Order>,
    cancelled_total: u64,
}

impl OrderStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a store from persisted parts.
    ///
    /// # Errors
    /// Returns [`DeskError::CorruptSnapshot`] if two orders share an owner.
    pub fn from_parts(orders: Vec<Order>, cancelled_total: u64) -> Result<Self> {
        let mut map = HashMap::with_capacity(orders.len());
        for order in orders {
            let owner = order.owner;
            if map.insert(owner, order).is_some() {
                return Err(DeskError::CorruptSnapshot {
                    reason: format!("duplicate order for owner {owner}"),
                });
            }
        }
        Ok(Self {
            orders: map,
            cancelled_total,
        })
    }

    #[must_use]
    pub fn get(&self, owner: UserId) -> Option<&Order> {
        self.orders.get(&owner)
    }

    #[must_use]
    pub fn contains(&self, owner: UserId) -> bool {
        self.orders.contains_key(&owner)
    }

    /// Insert a brand-new order.
    ///
    /// # Errors
    /// - `OrderActive` if the owner still has a live order
    /// - `Internal` if a terminal order was not purged first
    pub fn insert(&mut self, order: Order) -> Result<()> {
        if let Some(existing) = self.orders.get(&order.owner) {
            if existing.status.is_live() {
                return Err(DeskError::OrderActive {
                    owner: order.owner,
                    status: existing.status,
                });
            }
            return Err(DeskError::Internal(format!(
                "terminal order of {} must be purged before a new one is stored",
                order.owner
            )));
        }
        self.orders.insert(order.owner, order);
        Ok(())
    }

    /// Replace the stored order of `owner`, returning the previous record.
    ///
    /// # Errors
    /// - `OwnerMismatch` if `order` belongs to someone else
    /// - `NoOrder` if `owner` has no order
    pub fn replace(&mut self, owner: UserId, order: Order) -> Result<Order> {
        if order.owner != owner {
            return Err(DeskError::OwnerMismatch {
                expected: owner,
                found: order.owner,
            });
        }
        let slot = self.orders.get_mut(&owner).ok_or(DeskError::NoOrder(owner))?;
        Ok(std::mem::replace(slot, order))
    }

    /// Remove the owner's order if, and only if, it is terminal.
    pub fn purge_terminal(&mut self, owner: UserId) -> Option<Order> {
        if self.orders.get(&owner)?.status.is_terminal() {
            self.orders.remove(&owner)
        } else {
            None
        }
    }

    /// Cancel and purge a live order, counting it in the lifetime tally.
    ///
    /// Returns the order as it looked at the moment of cancellation.
    ///
    /// # Errors
    /// - `NoOrder` if the owner has no order
    /// - `AlreadyTerminal` if the order already finished
    pub fn cancel(&mut self, owner: UserId) -> Result<Order> {
        let status = self.orders.get(&owner).ok_or(DeskError::NoOrder(owner))?.status;
        if !status.can_transition_to(OrderStatus::Cancelled) {
            return Err(DeskError::AlreadyTerminal(status));
        }
        let mut order = self.orders.remove(&owner).ok_or(DeskError::NoOrder(owner))?;
        order.status = OrderStatus::Cancelled;
        self.cancelled_total += 1;
        Ok(order)
    }

    /// Orders waiting for an operator, oldest first, at most `limit`.
    #[must_use]
    pub fn pending(&self, limit: usize) -> Vec<Order> {
        let mut pending: Vec<&Order> = self
            .orders
            .values()
            .filter(|o| o.status == OrderStatus::UnderReview)
            .collect();
        pending.sort_by_key(|o| (o.created_at, o.owner));
        pending.into_iter().take(limit).cloned().collect()
    }

    /// All orders sorted by owner (stable snapshot order).
    #[must_use]
    pub fn to_sorted_vec(&self) -> Vec<Order> {
        let mut orders: Vec<Order> = self.orders.values().cloned().collect();
        orders.sort_by_key(|o| o.owner);
        orders
    }

    #[must_use]
    pub fn cancelled_total(&self) -> u64 {
        self.cancelled_total
    }

    /// Counters over the stored orders. `banned` is left at zero for the
    /// caller to fill in.
    #[must_use]
    pub fn stats(&self) -> DeskStats {
        let count = |status: OrderStatus| self.orders.values().filter(|o| o.status == status).count();
        DeskStats {
            total: self.orders.len(),
            completed: count(OrderStatus::Completed),
            cancelled: self.cancelled_total,
            pending: count(OrderStatus::UnderReview),
            active: self.orders.values().filter(|o| o.status.is_live()).count(),
            banned: 0,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Order> {
        self.orders.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.orders.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }
}
