//! Fulfillment code cleanup.

use orderdesk_types::constants::{CODE_FORBIDDEN_CHARS, MAX_CODE_LEN};

/// Strip markup characters, trim surrounding whitespace and cap the length.
///
/// The result is what gets delivered to the buyer; the minimum-length check
/// is applied to it afterwards.
#[must_use]
pub fn sanitize_code(raw: &str) -> String {
    let stripped: String = raw
        .chars()
        .filter(|c| !CODE_FORBIDDEN_CHARS.contains(c))
        .collect();
    stripped.trim().chars().take(MAX_CODE_LEN).collect()
}
