//! # orderdesk-engine
//!
//! The order lifecycle engine for **OrderDesk**: every state transition a
//! buyer or operator can trigger, serialized per owner and written through
//! to durable storage before it is acknowledged.
//!
//! ```text
//!   NEW ──selectNetwork──► AWAITING_PAYMENT ──submitProof──► UNDER_REVIEW
//!    │                          │                               │   │
//!    │                          │                     adminReject   adminDeliverCode
//!    │                          │                               ▼   ▼
//!    └────────cancel / ban──────┴──────────────────► CANCELLED  REJECTED  COMPLETED
//! ```
//!
//! - [`LifecycleEngine`]: the public surface
//! - [`OwnerLocks`]: per-owner async serialization
//! - [`InputBoard`]: how a user's next free-form message is interpreted
//! - [`sanitize_code`]: fulfillment code cleanup

pub mod engine;
pub mod input_board;
pub mod locks;
pub mod outcome;
pub mod sanitize;

pub use engine::LifecycleEngine;
pub use input_board::InputBoard;
pub use locks::{OwnerGuard, OwnerLocks};
pub use outcome::{BanOutcome, Cancellation, Fulfillment, OperatorPrompt};
pub use sanitize::sanitize_code;
