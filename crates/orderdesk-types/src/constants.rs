//! System-wide constants for OrderDesk.

/// How long a buyer has to send the proof after asking to upload it (seconds).
pub const DEFAULT_PROOF_WINDOW_SECS: u64 = 300;

/// Age after which an open order is reported as stale (seconds).
pub const DEFAULT_ORDER_TTL_SECS: u64 = 3600;

/// Largest accepted proof window or order TTL (seconds). Longer spans do not
/// fit a `chrono::Duration`.
pub const MAX_DURATION_SECS: u64 = 9_223_372_036_854_775;

/// Minimum length of a fulfillment code after sanitization.
pub const DEFAULT_MIN_CODE_LEN: usize = 4;

/// Fulfillment codes are truncated to this many characters.
pub const MAX_CODE_LEN: usize = 1000;

/// Characters stripped from fulfillment codes before delivery.
pub const CODE_FORBIDDEN_CHARS: &[char] = &['<', '>', '{', '}', '`'];

/// Default number of orders shown by a pending-orders listing.
pub const DEFAULT_PENDING_LIMIT: usize = 10;

/// Default snapshot file name.
pub const DEFAULT_SNAPSHOT_PATH: &str = "orderdesk_snapshot.json";

/// Payment rails accepted out of the box.
pub const DEFAULT_NETWORKS: &[&str] = &["TRC20", "BEP20"];

/// Snapshot envelope format tag.
pub const SNAPSHOT_FORMAT: &str = "orderdesk-snapshot";

/// Current snapshot schema version.
pub const SNAPSHOT_VERSION: u32 = 1;

/// Version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
