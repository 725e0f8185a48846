//! Operator claims and per-user pending input.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::UserId;

/// Exclusive right held by one operator to resolve one order.
///
/// Claims are session-scoped: they are never persisted, and after a restart
/// an operator re-accepts the order to claim it again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AdminClaim {
    pub operator: UserId,
    pub owner: UserId,
}

impl std::fmt::Display for AdminClaim {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "claim:{}→{}", self.operator, self.owner)
    }
}

/// What the next free-form message from a user means.
///
/// Exactly one interpretation exists per user at dispatch time, so a photo
/// can never be mistaken for a ban target or a fulfillment code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PendingInput {
    /// A buyer asked to upload a payment proof at `requested_at`.
    PaymentProof { requested_at: DateTime<Utc> },
    /// An operator holds a claim and the next text is the code for `owner`.
    FulfillmentCode { owner: UserId },
    /// An operator is about to type a user id to ban.
    BanTarget,
    /// An operator is about to type a user id to unban.
    UnbanTarget,
}
