//! `platelens-config`: runtime configuration for PlateLens.
//!
//! Provides:
//! - Typed YAML schema (provider, models, server, logging)
//! - Atomic read/write of `~/.platelens/config.yaml`
//! - `${ENV_VAR}` substitution and environment overrides
//! - Defaults, validation and a redacted view for display

pub mod defaults;
pub mod env;
pub mod io;
pub mod redact;
pub mod schema;
pub mod validation;

pub use defaults::{apply_all_defaults, initial_config};
pub use env::{
    apply_env_overrides, apply_env_overrides_with, resolve_env_vars, resolve_env_vars_with,
    MissingEnvVarError,
};
pub use io::{config_dir, config_file_path, load_config, write_config};
pub use redact::{redact, redacted_config};
pub use schema::{
    LoggingConfig, ModelsConfig, PlateLensConfig, ProviderConfig, ProviderKind, ServerConfig,
};
pub use validation::{validate, ConfigValidationError, ValidationReport};

use std::collections::HashMap;
use std::path::Path;

use anyhow::{bail, Context, Result};

/// Load a config file and make it ready for use: env substitution, env
/// overrides, defaults and validation. Validation errors are fatal; warnings
/// are logged.
pub async fn load_and_prepare(path: &Path) -> Result<PlateLensConfig> {
    load_and_prepare_with(path, &std::env::vars().collect()).await
}

/// [`load_and_prepare`] against an explicit environment.
pub async fn load_and_prepare_with(
    path: &Path,
    env: &HashMap<String, String>,
) -> Result<PlateLensConfig> {
    let raw_config = load_config(path).await?;

    let value = serde_json::to_value(&raw_config)
        .context("Failed to serialize config for processing")?;
    let value = resolve_env_vars_with(&value, env).context("Failed to resolve env vars in config")?;
    let config: PlateLensConfig =
        serde_json::from_value(value).context("Failed to deserialize config after processing")?;

    let config = apply_all_defaults(apply_env_overrides_with(config, env));

    let report = validate(&config);
    for warning in &report.warnings {
        tracing::warn!(path = %warning.path, message = %warning.message, "Config warning");
    }
    for error in &report.errors {
        tracing::error!(path = %error.path, message = %error.message, "Config error");
    }
    if let Some(first) = report.errors.first() {
        bail!("Invalid config at {}: {first}", path.display());
    }

    Ok(config)
}
