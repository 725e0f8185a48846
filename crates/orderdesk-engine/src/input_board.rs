//! Input board: what the next free-form message from a user means.
//!
//! Holds at most one [`PendingInput`] per user. Entries are session-scoped
//! and never persisted. Fulfillment-code expectations are not stored here;
//! the engine derives them from the claim table.

use std::collections::HashMap;

use orderdesk_types::{PendingInput, UserId};
use parking_lot::Mutex;

#[derive(Debug, Default)]
pub struct InputBoard {
    inputs: Mutex<HashMap<UserId, PendingInput>>,
}

impl InputBoard {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `input` for `user`, replacing any earlier expectation.
    pub fn set(&self, user: UserId, input: PendingInput) -> Option<PendingInput> {
        self.inputs.lock().insert(user, input)
    }

    #[must_use]
    pub fn get(&self, user: UserId) -> Option<PendingInput> {
        self.inputs.lock().get(&user).copied()
    }

    pub fn clear(&self, user: UserId) -> Option<PendingInput> {
        self.inputs.lock().remove(&user)
    }

    /// Drop the user's proof-upload request, leaving other inputs alone.
    pub fn clear_proof_request(&self, user: UserId) {
        let mut inputs = self.inputs.lock();
        if matches!(inputs.get(&user), Some(PendingInput::PaymentProof { .. })) {
            inputs.remove(&user);
        }
    }

    pub fn clear_all(&self) {
        self.inputs.lock().clear();
    }
}
