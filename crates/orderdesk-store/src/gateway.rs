//! Persistence gateway, the only path between [`DeskState`] and storage.

use chrono::{DateTime, Utc};

use orderdesk_types::{DeskError, Result};

use crate::{DeskState, Snapshot, SnapshotSink};

/// Encodes state into snapshots and pushes them through a [`SnapshotSink`].
pub struct PersistenceGateway {
    sink: Box<dyn SnapshotSink>,
}

impl std::fmt::Debug for PersistenceGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistenceGateway")
            .field("sink", &self.sink.describe())
            .finish()
    }
}

impl PersistenceGateway {
    pub fn new(sink: impl SnapshotSink + 'static) -> Self {
        Self {
            sink: Box::new(sink),
        }
    }

    /// Write the durable part of `state`.
    ///
    /// # Errors
    /// [`DeskError::Persistence`] if encoding or the sink write fails. The
    /// caller is expected to roll the in-memory state back.
    pub fn flush(&self, state: &DeskState, now: DateTime<Utc>) -> Result<()> {
        let blob = self.encode(state, now)?;
        self.write(&blob)
    }

    /// Encode the durable part of `state` without touching the sink.
    ///
    /// # Errors
    /// [`DeskError::Persistence`] if the snapshot cannot be serialized.
    pub fn encode(&self, state: &DeskState, now: DateTime<Utc>) -> Result<Vec<u8>> {
        state
            .to_snapshot(now)
            .encode()
            .map_err(|e| DeskError::Persistence(format!("encode failed: {e}")))
    }

    /// Push an encoded snapshot to the sink. Blocks until the sink reports
    /// the bytes durable.
    ///
    /// # Errors
    /// [`DeskError::Persistence`] if the sink write fails.
    pub fn write(&self, blob: &[u8]) -> Result<()> {
        self.sink.write(blob).map_err(|e| {
            tracing::error!(sink = %self.sink.describe(), error = %e, "Snapshot write failed");
            DeskError::Persistence(format!("write to {} failed: {e}", self.sink.describe()))
        })?;
        tracing::debug!(sink = %self.sink.describe(), bytes = blob.len(), "Snapshot written");
        Ok(())
    }

    /// Load the stored state. `Ok(None)` means nothing has been written yet.
    ///
    /// # Errors
    /// - [`DeskError::Persistence`] if the sink cannot be read
    /// - [`DeskError::CorruptSnapshot`] if the stored bytes do not verify
    pub fn load(&self) -> Result<Option<DeskState>> {
        let Some(blob) = self.sink.read().map_err(|e| {
            DeskError::Persistence(format!("read from {} failed: {e}", self.sink.describe()))
        })?
        else {
            tracing::info!(sink = %self.sink.describe(), "No snapshot found, starting empty");
            return Ok(None);
        };

        let snapshot = Snapshot::decode(&blob).inspect_err(|e| {
            tracing::warn!(sink = %self.sink.describe(), error = %e, "Snapshot rejected");
        })?;
        let taken_at = snapshot.taken_at;
        let state = DeskState::from_snapshot(snapshot)?;
        tracing::info!(
            sink = %self.sink.describe(),
            %taken_at,
            orders = state.orders.len(),
            banned = state.bans.len(),
            "Snapshot restored"
        );
        Ok(Some(state))
    }

    #[must_use]
    pub fn describe(&self) -> String {
        self.sink.describe()
    }
}
