//! Config redaction: a safe-to-print view with secrets masked.

use anyhow::{Context, Result};
use serde_json::Value;

use crate::schema::PlateLensConfig;

const SENSITIVE_KEYS: &[&str] = &["apiKey", "api_key", "token", "secret", "password"];

const MASK: &str = "***";

/// Mask every sensitive string field in a JSON value tree.
///
/// Long secrets keep a four-character prefix so two keys can be told apart.
pub fn redact(value: &Value) -> Value {
    redact_recursive(value, "")
}

/// Serialize `config` and redact it.
pub fn redacted_config(config: &PlateLensConfig) -> Result<Value> {
    let value = serde_json::to_value(config).context("Failed to serialize config for display")?;
    Ok(redact(&value))
}

fn is_sensitive_key(key: &str) -> bool {
    SENSITIVE_KEYS.iter().any(|k| k.eq_ignore_ascii_case(key))
}

fn mask(secret: &str) -> String {
    if secret.chars().count() > 8 {
        let prefix: String = secret.chars().take(4).collect();
        format!("{prefix}{MASK}")
    } else {
        MASK.to_string()
    }
}

fn redact_recursive(value: &Value, key: &str) -> Value {
    match value {
        Value::String(s) if !s.is_empty() && is_sensitive_key(key) => Value::String(mask(s)),
        Value::Array(items) => Value::Array(items.iter().map(|v| redact_recursive(v, key)).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), redact_recursive(v, k)))
                .collect(),
        ),
        other => other.clone(),
    }
}
