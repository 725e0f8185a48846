//! Desk configuration.
//!
//! Loaded from a JSON file; every field has a default so a minimal file only
//! needs to name the operators.
//!
//! ```json
//! { "operators": [7853409680], "snapshot_path": "/var/lib/orderdesk/snapshot.json" }
//! ```

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::{constants, Catalog, DeskError, NetworkCode, Result, UserId};

/// Configuration for one desk instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeskConfig {
    /// Accounts allowed to review orders. They can never be banned.
    pub operators: BTreeSet<UserId>,
    /// Accepted payment rails.
    pub networks: Vec<NetworkCode>,
    /// Products on sale.
    pub products: Catalog,
    /// Where the durable snapshot lives.
    pub snapshot_path: PathBuf,
    /// Seconds a buyer has to send the proof once the upload was requested.
    pub proof_window_secs: u64,
    /// Age in seconds after which open orders are reported as stale.
    pub order_ttl_secs: u64,
    /// Minimum fulfillment code length after sanitization.
    pub min_code_len: usize,
}

impl Default for DeskConfig {
    fn default() -> Self {
        Self {
            operators: BTreeSet::new(),
            networks: constants::DEFAULT_NETWORKS
                .iter()
                .map(NetworkCode::new)
                .collect(),
            products: Catalog::standard(),
            snapshot_path: PathBuf::from(constants::DEFAULT_SNAPSHOT_PATH),
            proof_window_secs: constants::DEFAULT_PROOF_WINDOW_SECS,
            order_ttl_secs: constants::DEFAULT_ORDER_TTL_SECS,
            min_code_len: constants::DEFAULT_MIN_CODE_LEN,
        }
    }
}

impl DeskConfig {
    /// Parse and validate a JSON document.
    pub fn from_json_str(raw: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(raw)
            .map_err(|e| DeskError::Configuration(format!("invalid config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate the config file at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            DeskError::Configuration(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_json_str(&raw)
    }

    /// Reject configurations the engine cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.networks.is_empty() {
            return Err(DeskError::Configuration("no payment networks configured".into()));
        }
        if self.products.is_empty() {
            return Err(DeskError::Configuration("product catalog is empty".into()));
        }
        let mut seen = BTreeSet::new();
        for product in self.products.iter() {
            if !seen.insert(product.code.clone()) {
                return Err(DeskError::Configuration(format!(
                    "duplicate product code {}",
                    product.code
                )));
            }
            if product.price.is_sign_negative() {
                return Err(DeskError::Configuration(format!(
                    "product {} has a negative price",
                    product.code
                )));
            }
        }
        if self.min_code_len == 0 || self.min_code_len > constants::MAX_CODE_LEN {
            return Err(DeskError::Configuration(format!(
                "min_code_len must be within 1..={}",
                constants::MAX_CODE_LEN
            )));
        }
        if self.proof_window_secs == 0 {
            return Err(DeskError::Configuration("proof_window_secs must be > 0".into()));
        }
        for (field, secs) in [
            ("proof_window_secs", self.proof_window_secs),
            ("order_ttl_secs", self.order_ttl_secs),
        ] {
            if secs > constants::MAX_DURATION_SECS {
                return Err(DeskError::Configuration(format!(
                    "{field} must be at most {}",
                    constants::MAX_DURATION_SECS
                )));
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn is_operator(&self, user: UserId) -> bool {
        self.operators.contains(&user)
    }

    /// Canonical network code if `raw` names an accepted rail.
    #[must_use]
    pub fn accepted_network(&self, raw: &str) -> Option<NetworkCode> {
        let code = NetworkCode::new(raw);
        self.networks.contains(&code).then_some(code)
    }

    #[must_use]
    pub fn proof_window(&self) -> Duration {
        clamped_seconds(self.proof_window_secs)
    }

    #[must_use]
    pub fn order_ttl(&self) -> Duration {
        clamped_seconds(self.order_ttl_secs)
    }
}

/// `secs` as a [`Duration`], saturating at [`constants::MAX_DURATION_SECS`].
fn clamped_seconds(secs: u64) -> Duration {
    let secs = i64::try_from(secs.min(constants::MAX_DURATION_SECS)).unwrap_or(i64::MAX);
    Duration::try_seconds(secs).unwrap_or(Duration::MAX)
}

/// Test helpers.
#[cfg(any(test, feature = "test-helpers"))]
impl DeskConfig {
    /// Default config with the given operators.
    pub fn with_operators(operators: impl IntoIterator<Item = i64>) -> Self {
        Self {
            operators: operators.into_iter().map(UserId).collect(),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let cfg = DeskConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.proof_window_secs, 300);
        assert_eq!(cfg.min_code_len, 4);
        assert_eq!(cfg.products.len(), 4);
    }

    #[test]
    fn minimal_json_fills_defaults() {
        let cfg = DeskConfig::from_json_str(r#"{ "operators": [99, 100] }"#).unwrap();
        assert!(cfg.is_operator(UserId(99)));
        assert!(!cfg.is_operator(UserId(1)));
        assert_eq!(cfg.networks.len(), 2);
    }

    #[test]
    fn accepted_network_is_case_insensitive() {
        let cfg = DeskConfig::default();
        assert_eq!(cfg.accepted_network("trc20"), Some(NetworkCode::new("TRC20")));
        assert_eq!(cfg.accepted_network("ERC20"), None);
    }

    #[test]
    fn empty_networks_rejected() {
        let err = DeskConfig::from_json_str(r#"{ "networks": [] }"#).unwrap_err();
        assert!(matches!(err, DeskError::Configuration(_)));
    }

    #[test]
    fn zero_code_length_rejected() {
        let cfg = DeskConfig {
            min_code_len: 0,
            ..DeskConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn oversized_durations_rejected() {
        let window = DeskConfig {
            proof_window_secs: 10_000_000_000_000_000,
            ..DeskConfig::default()
        };
        let err = window.validate().unwrap_err();
        assert!(err.to_string().contains("proof_window_secs"));

        let ttl = DeskConfig {
            order_ttl_secs: u64::MAX,
            ..DeskConfig::default()
        };
        let err = ttl.validate().unwrap_err();
        assert!(err.to_string().contains("order_ttl_secs"));
    }

    #[test]
    fn largest_durations_are_usable() {
        let cfg = DeskConfig {
            proof_window_secs: constants::MAX_DURATION_SECS,
            order_ttl_secs: constants::MAX_DURATION_SECS,
            ..DeskConfig::default()
        };
        assert!(cfg.validate().is_ok());
        assert!(cfg.proof_window() > Duration::days(365 * 100));
        assert_eq!(cfg.order_ttl(), cfg.proof_window());

        // Unvalidated values saturate instead of panicking.
        let raw = DeskConfig {
            proof_window_secs: u64::MAX,
            ..DeskConfig::default()
        };
        assert_eq!(raw.proof_window(), cfg.proof_window());
    }

    #[test]
    fn malformed_json_rejected() {
        let err = DeskConfig::from_json_str("{ operators: ").unwrap_err();
        assert!(err.to_string().starts_with("OD_ERR_902"));
    }

    #[test]
    fn serde_roundtrip() {
        let cfg = DeskConfig::with_operators([99]);
        let json = serde_json::to_string(&cfg).unwrap();
        let back = DeskConfig::from_json_str(&json).unwrap();
        assert_eq!(cfg, back);
    }
}
