use std::time::{SystemTime, UNIX_EPOCH};

use uuid::Uuid;

/// Returns current unix epoch milliseconds.
pub fn now_ms() -> i64 {
    let dur = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    dur.as_millis() as i64
}

/// Generates a new random token (UUID v4).
pub fn new_token() -> String {
    Uuid::new_v4().to_string()
}

/// Replaces typographic double quotes (U+201C, U+201D) with a plain `"`.
///
/// Test-bed report renderers choke on these characters, so every piece of
/// backend text placed in a report goes through here.
pub fn normalize_quotes(input: &str) -> String {
    input.replace(['\u{201c}', '\u{201d}'], "\"")
}
