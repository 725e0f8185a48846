//! Order model and its status graph.
//!
//! ## State Machine
//!
//! ```text
//!   ┌─────┐ network ┌──────────────────┐ proof ┌─────────────┐ code  ┌───────────┐
//!   │ NEW ├────────▶│ AWAITING_PAYMENT ├──────▶│ UNDER_REVIEW├──────▶│ COMPLETED │
//!   └──┬──┘         └────────┬─────────┘       └──┬───────┬──┘       └───────────┘
//!      │                     │                    │       │ reject   ┌──────────┐
//!      │                     │                    │       └─────────▶│ REJECTED │
//!      │ cancel / ban        │                    │                  └──────────┘
//!      ▼                     ▼                    ▼
//!   ┌───────────────────────────────────────────────┐
//!   │                   CANCELLED                   │
//!   └───────────────────────────────────────────────┘
//! ```
//!
//! `COMPLETED`, `REJECTED` and `CANCELLED` are terminal. An operator accepting
//! an order does not move it: acceptance is a claim, recorded outside the
//! order, and the order stays `UNDER_REVIEW` until the code is delivered.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{NetworkCode, Product, ProofRef, UserId};

/// Lifecycle status of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub enum OrderStatus {
    New,
    AwaitingPayment,
    UnderReview,
    Rejected,
    Completed,
    Cancelled,
}

impl OrderStatus {
    /// No further transitions are possible from a terminal status.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Rejected | Self::Completed | Self::Cancelled)
    }

    /// A live order blocks its owner from starting another one.
    #[must_use]
    pub fn is_live(self) -> bool {
        !self.is_terminal()
    }

    /// Whether the status graph has an edge `self → target`.
    ///
    /// `New → New` is the product re-selection edge; every other edge moves
    /// strictly forward.
    #[must_use]
    pub fn can_transition_to(self, target: Self) -> bool {
        matches!(
            (self, target),
            (Self::New, Self::New | Self::AwaitingPayment)
                | (Self::AwaitingPayment, Self::UnderReview)
                | (Self::UnderReview, Self::Rejected | Self::Completed)
                | (
                    Self::New | Self::AwaitingPayment | Self::UnderReview,
                    Self::Cancelled
                )
        )
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::New => write!(f, "NEW"),
            Self::AwaitingPayment => write!(f, "AWAITING_PAYMENT"),
            Self::UnderReview => write!(f, "UNDER_REVIEW"),
            Self::Rejected => write!(f, "REJECTED"),
            Self::Completed => write!(f, "COMPLETED"),
            Self::Cancelled => write!(f, "CANCELLED"),
        }
    }
}

/// A buyer's single order. The store is keyed by [`Order::owner`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub owner: UserId,
    /// Label captured when the order was created (username or first name).
    pub display_name: String,
    pub product: Product,
    pub network: Option<NetworkCode>,
    /// Price copied from the product when it was selected.
    pub amount: Decimal,
    pub status: OrderStatus,
    /// Write-once payment proof handle.
    pub proof_ref: Option<ProofRef>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// When the order entered `AwaitingPayment`.
    #[serde(default)]
    pub payment_requested_at: Option<DateTime<Utc>>,
}

impl Order {
    /// A fresh `New` order for `product`.
    #[must_use]
    pub fn new(
        owner: UserId,
        display_name: impl Into<String>,
        product: Product,
        now: DateTime<Utc>,
    ) -> Self {
        let amount = product.price;
        Self {
            owner,
            display_name: display_name.into(),
            product,
            network: None,
            amount,
            status: OrderStatus::New,
            proof_ref: None,
            created_at: now,
            updated_at: now,
            payment_requested_at: None,
        }
    }

    /// Time elapsed since creation. Negative skews clamp to zero.
    #[must_use]
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        (now - self.created_at).max(Duration::zero())
    }

    /// Whether the order has outlived `ttl`. Reporting only; nothing expires
    /// an order automatically.
    #[must_use]
    pub fn is_stale(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        self.age(now) > ttl
    }

    #[must_use]
    pub fn has_proof(&self) -> bool {
        self.proof_ref.is_some()
    }

    /// One-line summary for operator listings, e.g. `1 Week ($30) via TRC20`.
    #[must_use]
    pub fn description(&self) -> String {
        match &self.network {
            Some(network) => format!("{} (${}) via {network}", self.product.name, self.amount),
            None => format!("{} (${})", self.product.name, self.amount),
        }
    }

    /// Checks the field-level invariants a persisted order must satisfy.
    ///
    /// Returns a description of the first violation found.
    pub fn check_consistency(&self) -> std::result::Result<(), String> {
        let needs_network = !matches!(self.status, OrderStatus::New | OrderStatus::Cancelled);
        if needs_network && self.network.is_none() {
            return Err(format!("order {} is {} without a network", self.owner, self.status));
        }
        let needs_proof = matches!(
            self.status,
            OrderStatus::UnderReview | OrderStatus::Rejected | OrderStatus::Completed
        );
        if needs_proof && !self.has_proof() {
            return Err(format!("order {} is {} without a proof", self.owner, self.status));
        }
        if self.amount.is_sign_negative() {
            return Err(format!("order {} has negative amount {}", self.owner, self.amount));
        }
        Ok(())
    }
}

/// Test helpers.
#[cfg(any(test, feature = "test-helpers"))]
impl Order {
    /// An order for the `week` tier already advanced to `status`, with the
    /// network and proof fields that status requires.
    pub fn dummy(owner: UserId, status: OrderStatus) -> Self {
        let now = Utc::now();
        let mut order = Self::new(
            owner,
            format!("user{owner}"),
            Product::new("week", "1 Week", Decimal::new(30, 0), "7 days"),
            now,
        );
        order.status = status;
        if status != OrderStatus::New {
            order.network = Some(NetworkCode::new("TRC20"));
            order.payment_requested_at = Some(now);
        }
        if matches!(
            status,
            OrderStatus::UnderReview | OrderStatus::Rejected | OrderStatus::Completed
        ) {
            order.proof_ref = Some(ProofRef::new(format!("proof-{owner}")));
        }
        order
    }
}
