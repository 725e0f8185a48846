//! Error types for OrderDesk.
//!
//! All errors use the `OD_ERR_` prefix convention for easy grepping in logs.
//! Error codes are grouped by subsystem:
//! - 1xx: Order / lifecycle errors
//! - 2xx: Operator claim errors
//! - 3xx: Ban registry errors
//! - 4xx: Persistence errors
//! - 9xx: General / internal errors

use thiserror::Error;

use crate::{OrderStatus, UserId};

/// How a caller should treat an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    /// The request does not fit the current state; nothing was mutated.
    Validation,
    /// Someone else holds the resource, or the request was already applied.
    Conflict,
    /// The order or claim does not exist.
    NotFound,
    /// The durable write failed; the operation was rolled back.
    Persistence,
    Internal,
}

/// Central error enum for all OrderDesk operations.
#[derive(Debug, Error)]
pub enum DeskError {
    // =================================================================
    // Order / Lifecycle Errors (1xx)
    // =================================================================
    /// The user has no order in the store.
    #[error("OD_ERR_100: No order for user {0}")]
    NoOrder(UserId),

    /// The user already has a live order and must finish or cancel it first.
    #[error("OD_ERR_101: User {owner} already has an active order ({status})")]
    OrderActive { owner: UserId, status: OrderStatus },

    /// The event is not legal from the order's current status.
    #[error("OD_ERR_102: Cannot {event} an order that is {actual}")]
    WrongState {
        event: &'static str,
        actual: OrderStatus,
    },

    /// The stored order does not belong to the requested owner.
    #[error("OD_ERR_103: Order owner mismatch: expected {expected}, found {found}")]
    OwnerMismatch { expected: UserId, found: UserId },

    /// A payment proof was already recorded; proofs are write-once.
    #[error("OD_ERR_104: Payment proof already submitted for user {0}")]
    AlreadySubmitted(UserId),

    /// The proof arrived after the submission window closed.
    #[error("OD_ERR_105: Proof submission window expired ({elapsed_secs}s > {window_secs}s)")]
    Expired { elapsed_secs: i64, window_secs: u64 },

    /// The proof reference is blank.
    #[error("OD_ERR_106: Invalid payment proof reference")]
    InvalidProof,

    #[error("OD_ERR_107: Unknown product: {0}")]
    UnknownProduct(String),

    #[error("OD_ERR_108: Unknown payment network: {0}")]
    UnknownNetwork(String),

    /// Cancelling an order that already finished.
    #[error("OD_ERR_109: Order already {0}")]
    AlreadyTerminal(OrderStatus),

    /// The fulfillment code is shorter than the configured minimum.
    #[error("OD_ERR_110: Code too short: {len} < {min} characters")]
    CodeTooShort { len: usize, min: usize },

    // =================================================================
    // Claim Errors (2xx)
    // =================================================================
    /// The operator has not accepted any order.
    #[error("OD_ERR_200: Operator {0} holds no claim")]
    NoClaim(UserId),

    /// Another operator already claimed this order.
    #[error("OD_ERR_201: Order of user {owner} already claimed by operator {holder}")]
    AlreadyClaimed { owner: UserId, holder: UserId },

    /// The operator is resolving a different order.
    #[error("OD_ERR_202: Operator {operator} is already resolving the order of user {holding}")]
    OperatorBusy { operator: UserId, holding: UserId },

    /// The caller is not a configured operator.
    #[error("OD_ERR_203: User {0} is not an operator")]
    NotOperator(UserId),

    // =================================================================
    // Ban Errors (3xx)
    // =================================================================
    #[error("OD_ERR_300: User {0} is banned")]
    Banned(UserId),

    #[error("OD_ERR_301: User {0} is already banned")]
    AlreadyBanned(UserId),

    #[error("OD_ERR_302: User {0} is not banned")]
    NotBanned(UserId),

    /// Operators cannot be placed in the ban registry.
    #[error("OD_ERR_303: Cannot ban operator {0}")]
    OperatorProtected(UserId),

    // =================================================================
    // Persistence Errors (4xx)
    // =================================================================
    /// Writing the snapshot to the durable medium failed.
    #[error("OD_ERR_400: Persistence failed: {0}")]
    Persistence(String),

    /// A snapshot blob failed verification and was rejected as a whole.
    #[error("OD_ERR_401: Corrupt snapshot: {reason}")]
    CorruptSnapshot { reason: String },

    // =================================================================
    // General / Internal (9xx)
    // =================================================================
    #[error("OD_ERR_900: Internal error: {0}")]
    Internal(String),

    #[error("OD_ERR_901: Serialization error: {0}")]
    Serialization(String),

    #[error("OD_ERR_902: Configuration error: {0}")]
    Configuration(String),

    #[error("OD_ERR_903: I/O error: {0}")]
    Io(String),
}

impl DeskError {
    /// Classify this error for the caller.
    #[must_use]
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::WrongState { .. }
            | Self::OwnerMismatch { .. }
            | Self::Expired { .. }
            | Self::InvalidProof
            | Self::UnknownProduct(_)
            | Self::UnknownNetwork(_)
            | Self::AlreadyTerminal(_)
            | Self::CodeTooShort { .. }
            | Self::NotOperator(_)
            | Self::OperatorProtected(_)
            | Self::Configuration(_) => ErrorClass::Validation,
            Self::OrderActive { .. }
            | Self::AlreadySubmitted(_)
            | Self::AlreadyClaimed { .. }
            | Self::OperatorBusy { .. }
            | Self::Banned(_)
            | Self::AlreadyBanned(_)
            | Self::NotBanned(_) => ErrorClass::Conflict,
            Self::NoOrder(_) | Self::NoClaim(_) => ErrorClass::NotFound,
            Self::Persistence(_) | Self::CorruptSnapshot { .. } | Self::Io(_) => {
                ErrorClass::Persistence
            }
            Self::Internal(_) | Self::Serialization(_) => ErrorClass::Internal,
        }
    }
}

/// Crate-wide `Result` alias.
pub type Result<T> = std::result::Result<T, DeskError>;

// Conversion from std::io::Error
impl From<std::io::Error> for DeskError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for DeskError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_contains_prefix() {
        let err = DeskError::NoOrder(UserId(7));
        let msg = format!("{err}");
        assert!(msg.starts_with("OD_ERR_100"), "Got: {msg}");
        assert!(msg.contains('7'));
    }

    #[test]
    fn wrong_state_display() {
        let err = DeskError::WrongState {
            event: "submit proof for",
            actual: OrderStatus::New,
        };
        let msg = format!("{err}");
        assert!(msg.contains("OD_ERR_102"));
        assert!(msg.contains("NEW"));
    }

    #[test]
    fn all_errors_have_od_err_prefix() {
        let errors: Vec<Box<dyn std::error::Error>> = vec![
            Box::new(DeskError::InvalidProof),
            Box::new(DeskError::NoClaim(UserId(1))),
            Box::new(DeskError::Banned(UserId(2))),
            Box::new(DeskError::Persistence("disk full".into())),
            Box::new(DeskError::CodeTooShort { len: 2, min: 4 }),
            Box::new(DeskError::Internal("test".into())),
        ];
        for err in errors {
            let msg = format!("{err}");
            assert!(msg.starts_with("OD_ERR_"), "Error missing OD_ERR_ prefix: {msg}");
        }
    }

    #[test]
    fn not_found_is_distinct_from_wrong_state() {
        assert_eq!(DeskError::NoOrder(UserId(1)).class(), ErrorClass::NotFound);
        assert_eq!(DeskError::NoClaim(UserId(1)).class(), ErrorClass::NotFound);
        let wrong = DeskError::WrongState {
            event: "cancel",
            actual: OrderStatus::Completed,
        };
        assert_eq!(wrong.class(), ErrorClass::Validation);
    }

    #[test]
    fn conflicts_and_persistence_classes() {
        let claimed = DeskError::AlreadyClaimed {
            owner: UserId(1),
            holder: UserId(99),
        };
        assert_eq!(claimed.class(), ErrorClass::Conflict);
        assert_eq!(DeskError::AlreadyBanned(UserId(3)).class(), ErrorClass::Conflict);
        assert_eq!(
            DeskError::Persistence("x".into()).class(),
            ErrorClass::Persistence
        );
    }

    #[test]
    fn io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only");
        let err: DeskError = io.into();
        assert!(matches!(err, DeskError::Io(ref m) if m.contains("read-only")));
    }
}
