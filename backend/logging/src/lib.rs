//! Structured logging for PlateLens.
//!
//! Console output (text or NDJSON), an optional daily-rolling NDJSON file, and
//! a redaction helper for strings that may carry credentials or image payloads.

pub mod logger;
pub mod redact;

pub use logger::{LogOptions, init_logger};
pub use redact::redact_sensitive_data;
