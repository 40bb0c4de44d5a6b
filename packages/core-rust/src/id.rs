//! Request identifier resolution and generation.
//!
//! # Format
//!
//! Generated identifiers look like `req_1718000000000_k3j9x0a2b`: the
//! `req_` prefix, the Unix time in milliseconds, and a random lowercase
//! alphanumeric suffix. They are meant for grepping logs, not for security.

use std::time::{SystemTime, UNIX_EPOCH};

use http::HeaderMap;
use rand::distr::Alphanumeric;
use rand::Rng;

/// Default inbound correlation header.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Prefix of every generated identifier.
pub const GENERATED_ID_PREFIX: &str = "req_";

/// Length of the random suffix.
pub const SUFFIX_LEN: usize = 9;

/// Generates an identifier stamped with the current wall-clock time.
#[must_use]
pub fn generate_request_id() -> String {
    #[allow(clippy::cast_possible_truncation)]
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_millis() as u64);
    generate_request_id_at(millis)
}

/// Generates an identifier for the given millisecond timestamp.
///
/// Two calls with the same `millis` differ by their random suffix.
#[must_use]
pub fn generate_request_id_at(millis: u64) -> String {
    let suffix: String = rand::rng()
        .sample_iter(&Alphanumeric)
        .take(SUFFIX_LEN)
        .map(|b| char::from(b).to_ascii_lowercase())
        .collect();
    format!("{GENERATED_ID_PREFIX}{millis}_{suffix}")
}

/// Returns the inbound correlation id carried in `header`, if usable.
///
/// The value is adopted verbatim when present, valid UTF-8, and non-empty.
/// No further validation is applied.
#[must_use]
pub fn inbound_request_id(headers: &HeaderMap, header: &str) -> Option<String> {
    headers
        .get(header)
        .and_then(|v| std::str::from_utf8(v.as_bytes()).ok())
        .filter(|v| !v.is_empty())
        .map(str::to_owned)
}

/// Adopts the inbound correlation id or generates a fresh one.
#[must_use]
pub fn resolve_request_id(headers: &HeaderMap, header: &str) -> String {
    inbound_request_id(headers, header).unwrap_or_else(generate_request_id)
}
