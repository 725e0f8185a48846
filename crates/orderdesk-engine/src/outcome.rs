//! Results returned by engine operations that do more than update one order.

use orderdesk_types::{Order, PendingInput, UserId};

/// A completed order and the code to hand to its owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fulfillment {
    pub order: Order,
    /// Sanitized code, exactly as it must be delivered.
    pub code: String,
}

/// A cancelled (and purged) order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cancellation {
    /// The order as it was when cancelled, status `CANCELLED`.
    pub order: Order,
    /// Operators whose claim on the order was dropped; the transport tells
    /// them the order is gone.
    pub released_operators: Vec<UserId>,
}

/// Result of banning a user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BanOutcome {
    pub user: UserId,
    /// The live order force-cancelled by the ban, if there was one.
    pub cancelled: Option<Cancellation>,
}

/// Free-form inputs an operator can ask the desk to expect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorPrompt {
    /// Next text is a user id to ban.
    Ban,
    /// Next text is a user id to unban.
    Unban,
}

impl From<OperatorPrompt> for PendingInput {
    fn from(prompt: OperatorPrompt) -> Self {
        match prompt {
            OperatorPrompt::Ban => Self::BanTarget,
            OperatorPrompt::Unban => Self::UnbanTarget,
        }
    }
}
