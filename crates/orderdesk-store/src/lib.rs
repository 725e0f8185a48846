//! # orderdesk-store
//!
//! Durable and session state for **OrderDesk**.
//!
//! - [`OrderStore`]: one order per owner, plus the lifetime cancellation tally
//! - [`BanRegistry`]: users forbidden from ordering
//! - [`ClaimTable`]: which operator is resolving which order (not persisted)
//! - [`DeskState`]: the three tables together, cloned as a rollback checkpoint
//! - [`Snapshot`]: checksummed JSON envelope of the durable tables
//! - [`SnapshotSink`], [`FileSink`]: byte storage for snapshots
//! - [`WriterLock`]: one writer process per snapshot file
//! - [`PersistenceGateway`]: encode/write and read/verify/decode
//!
//! Nothing in this crate takes an in-memory lock. Serialization of mutations
//! belongs to the lifecycle engine.

pub mod ban_registry;
pub mod claim_table;
pub mod gateway;
pub mod order_store;
pub mod sink;
pub mod snapshot;
pub mod state;

pub use ban_registry::BanRegistry;
pub use claim_table::ClaimTable;
pub use gateway::PersistenceGateway;
pub use order_store::OrderStore;
#[cfg(any(test, feature = "test-helpers"))]
pub use sink::MemorySink;
pub use sink::{FileSink, SnapshotSink, WriterLock};
pub use snapshot::Snapshot;
pub use state::DeskState;
