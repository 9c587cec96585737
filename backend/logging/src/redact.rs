//! Log Redaction
//!
//! Scrubs API keys, bearer tokens and inline image payloads from strings
//! before they are logged or shown. Provider error bodies can echo both.

use regex::Regex;
use std::sync::LazyLock;

static QUERY_KEY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([?&]key=)[^&\s]+").expect("valid key param pattern"));
static GOOGLE_KEY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"AIza[0-9A-Za-z\-_]{20,}").expect("valid google key pattern"));
static BEARER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Bearer\s+[a-zA-Z0-9\-\._~+/]+=*").expect("valid bearer pattern")
});
static DATA_URI_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(data:[\w.+\-]+/[\w.+\-]+;base64,)[A-Za-z0-9+/=]{64,}")
        .expect("valid data uri pattern")
});

/// Redacts sensitive patterns in a string.
pub fn redact_sensitive_data(input: &str) -> String {
    let redacted = QUERY_KEY_RE.replace_all(input, "${1}[REDACTED]");
    let redacted = GOOGLE_KEY_RE.replace_all(&redacted, "[REDACTED_KEY]");
    let redacted = BEARER_RE.replace_all(&redacted, "[REDACTED_TOKEN]");
    let redacted = DATA_URI_RE.replace_all(&redacted, "${1}[...]");
    redacted.into_owned()
}
