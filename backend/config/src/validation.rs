//! Config validation with field paths in every message.

use thiserror::Error;

use crate::schema::{PlateLensConfig, ProviderKind};

/// A config validation error with field path and message.
#[derive(Debug, Error)]
#[error("Config validation error at '{path}': {message}")]
pub struct ConfigValidationError {
    pub path: String,
    pub message: String,
}

/// Errors and warnings found in one pass.
#[derive(Debug, Default)]
pub struct ValidationReport {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn error(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }

    fn warn(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }
}

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error", "off"];

/// Validate the config and return every error and warning.
pub fn validate(config: &PlateLensConfig) -> ValidationReport {
    let mut report = ValidationReport::default();
    validate_provider(config, &mut report);
    validate_models(config, &mut report);
    validate_server(config, &mut report);
    validate_logging(config, &mut report);
    report
}

fn validate_provider(config: &PlateLensConfig, report: &mut ValidationReport) {
    if config.provider_kind() == ProviderKind::Gemini && config.api_key().is_none() {
        report.warn(
            "provider.apiKey",
            "No Gemini API key configured; set GEMINI_API_KEY or use the mock provider",
        );
    }
    if let Some(url) = config.base_url() {
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            report.error("provider.baseUrl", "Must be an http:// or https:// URL");
        }
    }
    if config.request_timeout_secs() == Some(0) {
        report.error("provider.requestTimeoutSecs", "Must be > 0 when set");
    }
}

fn validate_models(config: &PlateLensConfig, report: &mut ValidationReport) {
    let Some(models) = &config.models else { return };
    let fields = [
        ("detect", &models.detect),
        ("enhance", &models.enhance),
        ("extract", &models.extract),
        ("validate", &models.validate),
    ];
    for (name, value) in fields {
        if value.as_deref().is_some_and(|m| m.trim().is_empty()) {
            report.error(format!("models.{name}"), "Model name cannot be empty");
        }
    }
}

fn validate_server(config: &PlateLensConfig, report: &mut ValidationReport) {
    let Some(server) = &config.server else { return };
    if server.port == Some(0) {
        report.error("server.port", "Port must be between 1 and 65535");
    }
    if server.bind.as_deref().is_some_and(|b| b.trim().is_empty()) {
        report.error("server.bind", "Bind address cannot be empty");
    }
    if server.max_upload_bytes == Some(0) {
        report.error("server.maxUploadBytes", "Must be > 0");
    }
}

fn validate_logging(config: &PlateLensConfig, report: &mut ValidationReport) {
    let Some(level) = config.logging.as_ref().and_then(|l| l.level.as_deref()) else {
        return;
    };
    // Full filter directives (`platelens=debug,reqwest=warn`) are passed through untouched.
    if !level.contains('=') && !LOG_LEVELS.contains(&level.to_ascii_lowercase().as_str()) {
        report.warn("logging.level", format!("Unknown log level '{level}'; using info"));
    }
}
