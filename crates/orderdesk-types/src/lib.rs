//! # orderdesk-types
//!
//! Shared types, errors, and configuration for **OrderDesk**.
//!
//! This crate is the leaf dependency of the workspace; every other crate
//! depends on it. It defines:
//!
//! - **Identifiers**: [`UserId`], [`ProductCode`], [`NetworkCode`], [`ProofRef`]
//! - **Catalog**: [`Product`], [`Catalog`]
//! - **Order model**: [`Order`], [`OrderStatus`]
//! - **Operator model**: [`AdminClaim`], [`PendingInput`]
//! - **Reporting**: [`DeskStats`]
//! - **Configuration**: [`DeskConfig`]
//! - **Errors**: [`DeskError`] with `OD_ERR_` prefix codes, [`ErrorClass`]
//! - **Constants**: system-wide limits and defaults

pub mod claim;
pub mod config;
pub mod constants;
pub mod error;
pub mod ids;
pub mod order;
pub mod product;
pub mod stats;

// Re-export all primary types at crate root for ergonomic imports:
//   use orderdesk_types::{Order, OrderStatus, UserId, ...};

pub use claim::*;
pub use config::*;
pub use error::*;
pub use ids::*;
pub use order::*;
pub use product::*;
pub use stats::*;

// Constants are accessed via `orderdesk_types::constants::FOO`
// (not re-exported to avoid name collisions).
