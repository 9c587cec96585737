//! Environment handling for config values.
//!
//! `${VAR_NAME}` in any string value is replaced at load time; `$${VAR_NAME}`
//! escapes to a literal `${VAR_NAME}`. Only `[A-Z_][A-Z0-9_]*` names match.
//! Selected variables also override config fields directly.

use std::collections::HashMap;

use anyhow::Result;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde_json::Value;
use tracing::{debug, warn};

use crate::schema::{LoggingConfig, PlateLensConfig, ProviderConfig, ProviderKind, ServerConfig};

/// Matches `${NAME}` and the escaped form `$${NAME}`.
static ENV_VAR_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$?\$\{([A-Z_][A-Z0-9_]*)\}").expect("valid env var pattern"));

/// Error returned for missing env vars.
#[derive(Debug, thiserror::Error)]
#[error("Missing env var \"{var_name}\" referenced at config path: {config_path}")]
pub struct MissingEnvVarError {
    pub var_name: String,
    pub config_path: String,
}

/// Substitute `${VAR}` references using the process environment.
pub fn resolve_env_vars(value: &Value) -> Result<Value> {
    resolve_env_vars_with(value, &std::env::vars().collect())
}

/// Substitute `${VAR}` references using a provided map.
pub fn resolve_env_vars_with(value: &Value, env: &HashMap<String, String>) -> Result<Value> {
    Ok(substitute_value(value, env, "")?)
}

fn substitute_value(
    value: &Value,
    env: &HashMap<String, String>,
    path: &str,
) -> Result<Value, MissingEnvVarError> {
    match value {
        Value::String(s) => substitute_string(s, env, path).map(Value::String),
        Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(i, v)| substitute_value(v, env, &format!("{path}[{i}]")))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        Value::Object(map) => {
            let mut out = serde_json::Map::with_capacity(map.len());
            for (key, child) in map {
                let child_path = if path.is_empty() {
                    key.clone()
                } else {
                    format!("{path}.{key}")
                };
                out.insert(key.clone(), substitute_value(child, env, &child_path)?);
            }
            Ok(Value::Object(out))
        }
        other => Ok(other.clone()),
    }
}

fn substitute_string(
    s: &str,
    env: &HashMap<String, String>,
    path: &str,
) -> Result<String, MissingEnvVarError> {
    if !s.contains("${") {
        return Ok(s.to_string());
    }

    let mut missing = None;
    let replaced = ENV_VAR_PATTERN.replace_all(s, |caps: &Captures| {
        let whole = &caps[0];
        if let Some(literal) = whole.strip_prefix('$').filter(|rest| rest.starts_with("${")) {
            return literal.to_string();
        }
        let name = &caps[1];
        match env.get(name).filter(|v| !v.is_empty()) {
            Some(val) => val.clone(),
            None => {
                missing.get_or_insert_with(|| MissingEnvVarError {
                    var_name: name.to_string(),
                    config_path: path.to_string(),
                });
                String::new()
            }
        }
    });

    match missing {
        Some(err) => Err(err),
        None => Ok(replaced.into_owned()),
    }
}

/// Apply overrides from the process environment.
pub fn apply_env_overrides(config: PlateLensConfig) -> PlateLensConfig {
    apply_env_overrides_with(config, &std::env::vars().collect())
}

/// Apply overrides from a provided map.
///
/// - `GEMINI_API_KEY` fills the API key when the file leaves it unset
/// - `PLATELENS_PROVIDER` (`gemini` | `mock`)
/// - `PLATELENS_BIND`, `PLATELENS_PORT`
/// - `PLATELENS_LOG_DIR`
pub fn apply_env_overrides_with(
    mut config: PlateLensConfig,
    env: &HashMap<String, String>,
) -> PlateLensConfig {
    let get = |name: &str| env.get(name).map(|v| v.trim()).filter(|v| !v.is_empty());

    if let Some(key) = get("GEMINI_API_KEY") {
        let provider = config.provider.get_or_insert_with(ProviderConfig::default);
        if provider.api_key.as_deref().map_or(true, |k| k.trim().is_empty()) {
            debug!("Using GEMINI_API_KEY from environment");
            provider.api_key = Some(key.to_string());
        }
    }

    if let Some(kind) = get("PLATELENS_PROVIDER") {
        match kind.to_ascii_lowercase().as_str() {
            "gemini" => set_provider_kind(&mut config, ProviderKind::Gemini),
            "mock" => set_provider_kind(&mut config, ProviderKind::Mock),
            other => warn!(value = %other, "Ignoring unknown PLATELENS_PROVIDER"),
        }
    }

    if let Some(bind) = get("PLATELENS_BIND") {
        config.server.get_or_insert_with(ServerConfig::default).bind = Some(bind.to_string());
    }

    if let Some(port) = get("PLATELENS_PORT") {
        match port.parse::<u16>() {
            Ok(port) => {
                config.server.get_or_insert_with(ServerConfig::default).port = Some(port);
            }
            Err(_) => warn!(value = %port, "Ignoring invalid PLATELENS_PORT"),
        }
    }

    if let Some(dir) = get("PLATELENS_LOG_DIR") {
        config.logging.get_or_insert_with(LoggingConfig::default).dir = Some(dir.to_string());
    }

    config
}

fn set_provider_kind(config: &mut PlateLensConfig, kind: ProviderKind) {
    config.provider.get_or_insert_with(ProviderConfig::default).kind = Some(kind);
}
