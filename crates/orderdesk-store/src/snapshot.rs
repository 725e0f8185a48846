//! Snapshot codec.
//!
//! The durable state (orders, bans, cancellation tally) is written as one
//! self-describing JSON envelope:
//!
//! ```text
//! {
//!   "format":   "orderdesk-snapshot",
//!   "version":  1,
//!   "checksum": "<sha256 hex of payload>",
//!   "payload":  "<JSON of Snapshot, as a string>"
//! }
//! ```
//!
//! The payload is kept as an opaque string so the checksum covers the exact
//! bytes that were written, independent of how a reader re-serializes them.
//! Claims and pending inputs are session-scoped and never appear here.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use orderdesk_types::constants::{SNAPSHOT_FORMAT, SNAPSHOT_VERSION};
use orderdesk_types::{DeskError, Order, Result, UserId};

/// Point-in-time image of the durable tables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub taken_at: DateTime<Utc>,
    /// Sorted by owner.
    pub orders: Vec<Order>,
    /// Sorted ascending.
    pub banned: Vec<UserId>,
    #[serde(default)]
    pub cancelled_total: u64,
}

#[derive(Debug, Serialize, Deserialize)]
struct Envelope {
    format: String,
    version: u32,
    checksum: String,
    payload: String,
}

impl Snapshot {
    /// Serialize into the checksummed envelope.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let payload = serde_json::to_string(self)?;
        let envelope = Envelope {
            format: SNAPSHOT_FORMAT.to_string(),
            version: SNAPSHOT_VERSION,
            checksum: sha256_hex(payload.as_bytes()),
            payload,
        };
        Ok(serde_json::to_vec_pretty(&envelope)?)
    }

    /// Parse and verify an envelope, then check every order's invariants.
    ///
    /// # Errors
    /// [`DeskError::CorruptSnapshot`] for anything short of a valid snapshot:
    /// malformed JSON, foreign format, unsupported version, checksum mismatch,
    /// duplicate owners, or an order violating its field invariants.
    pub fn decode(blob: &[u8]) -> Result<Self> {
        let envelope: Envelope = serde_json::from_slice(blob).map_err(|e| corrupt(format!("envelope: {e}")))?;
        if envelope.format != SNAPSHOT_FORMAT {
            return Err(corrupt(format!("unexpected format {:?}", envelope.format)));
        }
        if envelope.version != SNAPSHOT_VERSION {
            return Err(corrupt(format!(
                "unsupported version {} (expected {SNAPSHOT_VERSION})",
                envelope.version
            )));
        }
        let actual = sha256_hex(envelope.payload.as_bytes());
        if actual != envelope.checksum {
            return Err(corrupt(format!(
                "checksum mismatch: recorded {}, computed {actual}",
                envelope.checksum
            )));
        }
        let snapshot: Self =
            serde_json::from_str(&envelope.payload).map_err(|e| corrupt(format!("payload: {e}")))?;
        snapshot.validate()?;
        Ok(snapshot)
    }

    fn validate(&self) -> Result<()> {
        let mut owners = std::collections::HashSet::with_capacity(self.orders.len());
        for order in &self.orders {
            if !owners.insert(order.owner) {
                return Err(corrupt(format!("duplicate order for owner {}", order.owner)));
            }
            order.check_consistency().map_err(corrupt)?;
        }
        Ok(())
    }
}

fn corrupt(reason: String) -> DeskError {
    DeskError::CorruptSnapshot { reason }
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use orderdesk_types::OrderStatus;

    fn sample() -> Snapshot {
        Snapshot {
            taken_at: Utc::now(),
            orders: vec![
                Order::dummy(UserId(1), OrderStatus::UnderReview),
                Order::dummy(UserId(2), OrderStatus::Completed),
            ],
            banned: vec![UserId(5)],
            cancelled_total: 3,
        }
    }

    #[test]
    fn encode_decode_preserves_state() {
        let snap = sample();
        let blob = snap.encode().unwrap();
        assert_eq!(Snapshot::decode(&blob).unwrap(), snap);
    }

    #[test]
    fn envelope_is_self_describing() {
        let blob = sample().encode().unwrap();
        let value: serde_json::Value = serde_json::from_slice(&blob).unwrap();
        assert_eq!(value["format"], "orderdesk-snapshot");
        assert_eq!(value["version"], 1);
        assert_eq!(value["checksum"].as_str().unwrap().len(), 64);
    }

    #[test]
    fn tampered_payload_detected() {
        let blob = sample().encode().unwrap();
        let mut value: serde_json::Value = serde_json::from_slice(&blob).unwrap();
        let payload = value["payload"].as_str().unwrap().replace("\"cancelled_total\":3", "\"cancelled_total\":4");
        value["payload"] = serde_json::Value::String(payload);
        let tampered = serde_json::to_vec(&value).unwrap();

        let err = Snapshot::decode(&tampered).unwrap_err();
        assert!(matches!(err, DeskError::CorruptSnapshot { ref reason } if reason.contains("checksum")));
    }

    #[test]
    fn foreign_format_rejected() {
        let blob = br#"{"format":"something-else","version":1,"checksum":"","payload":"{}"}"#;
        assert!(matches!(
            Snapshot::decode(blob),
            Err(DeskError::CorruptSnapshot { .. })
        ));
    }

    #[test]
    fn future_version_rejected() {
        let blob = sample().encode().unwrap();
        let mut value: serde_json::Value = serde_json::from_slice(&blob).unwrap();
        value["version"] = serde_json::json!(2);
        let err = Snapshot::decode(&serde_json::to_vec(&value).unwrap()).unwrap_err();
        assert!(err.to_string().contains("unsupported version"));
    }

    #[test]
    fn garbage_rejected() {
        assert!(matches!(
            Snapshot::decode(b"not json at all"),
            Err(DeskError::CorruptSnapshot { .. })
        ));
    }

    #[test]
    fn duplicate_owner_rejected() {
        let mut snap = sample();
        snap.orders.push(Order::dummy(UserId(1), OrderStatus::New));
        let err = Snapshot::decode(&snap.encode().unwrap()).unwrap_err();
        assert!(err.to_string().contains("duplicate order"));
    }

    #[test]
    fn inconsistent_order_rejected() {
        let mut snap = sample();
        snap.orders[0].proof_ref = None;
        let err = Snapshot::decode(&snap.encode().unwrap()).unwrap_err();
        assert!(err.to_string().contains("without a proof"));
    }
}
