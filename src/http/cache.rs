//! HTTP cache control module
//!
//! Validators for conditional requests. Files served here can change
//! between requests, so responses are never cacheable; validators only let a
//! browser skip re-downloading a file it already holds.

use std::time::{SystemTime, UNIX_EPOCH};

/// `Cache-Control` value sent on every file response
pub const NO_CACHE: &str = "no-cache, no-store, must-revalidate";

/// `Expires` value sent on every file response
pub const EXPIRES_NOW: &str = "0";

fn unix_secs(time: SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

/// Weak `ETag` derived from file size and modification time
///
/// # Returns
/// Quoted weak `ETag` string, e.g., `W/"400-65f1c2a0"`
pub fn generate_etag(size: u64, modified: SystemTime) -> String {
    format!("W/\"{size:x}-{:x}\"", unix_secs(modified))
}

/// Format a modification time as an HTTP date for `Last-Modified`
pub fn last_modified(modified: SystemTime) -> String {
    httpdate::fmt_http_date(modified)
}

/// Check if client's `If-None-Match` header matches the server's `ETag`
///
/// Supports:
/// - Single `ETag`: `"abc123"`
/// - Multiple `ETags`: `"abc123", "def456"`
/// - Wildcard: `*`
///
/// Comparison is weak: a `W/` prefix on either side is ignored.
pub fn check_etag_match(if_none_match: Option<&str>, etag: &str) -> bool {
    let bare = |tag: &str| tag.trim().trim_start_matches("W/").to_string();
    let etag = bare(etag);
    if_none_match.is_some_and(|client_etag| {
        client_etag
            .split(',')
            .any(|e| e.trim() == "*" || bare(e) == etag)
    })
}

/// Check whether a file modified at `modified` is unchanged since the
/// client's `If-Modified-Since` date
///
/// HTTP dates carry whole seconds, so the modification time is truncated
/// before comparing. Unparseable dates never match.
pub fn check_not_modified_since(if_modified_since: Option<&str>, modified: SystemTime) -> bool {
    if_modified_since
        .and_then(|value| httpdate::parse_http_date(value.trim()).ok())
        .is_some_and(|since| unix_secs(modified) <= unix_secs(since))
}

/// Decide whether a conditional request can be answered with 304
///
/// `If-None-Match` takes precedence over `If-Modified-Since` when both are sent.
pub fn is_cache_hit(
    if_none_match: Option<&str>,
    if_modified_since: Option<&str>,
    etag: &str,
    modified: SystemTime,
) -> bool {
    if if_none_match.is_some() {
        return check_etag_match(if_none_match, etag);
    }
    check_not_modified_since(if_modified_since, modified)
}
