//! Config defaults: fills unset fields of a freshly loaded config.

use crate::schema::{
    LoggingConfig, ModelsConfig, PlateLensConfig, ProviderConfig, ProviderKind, ServerConfig,
};

/// Model for the image-producing stages (detect, enhance).
pub const DEFAULT_IMAGE_MODEL: &str = "gemini-2.0-flash-exp";

/// Model for the text-only stages (extract, validate).
pub const DEFAULT_TEXT_MODEL: &str = "gemini-2.0-flash";

pub const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1";

pub const DEFAULT_PORT: u16 = 8787;

/// 20 MiB covers a phone photo once base64-encoded.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Apply all defaults to a freshly loaded config.
pub fn apply_all_defaults(config: PlateLensConfig) -> PlateLensConfig {
    let config = apply_provider_defaults(config);
    let config = apply_model_defaults(config);
    let config = apply_server_defaults(config);
    apply_logging_defaults(config)
}

/// The config written by `platelens config --init`: every default spelled
/// out, with the API key left to `GEMINI_API_KEY`.
pub fn initial_config() -> PlateLensConfig {
    apply_all_defaults(PlateLensConfig::default())
}

fn apply_provider_defaults(mut config: PlateLensConfig) -> PlateLensConfig {
    let provider = config.provider.get_or_insert_with(ProviderConfig::default);
    provider.kind.get_or_insert(ProviderKind::Gemini);
    config
}

fn apply_model_defaults(mut config: PlateLensConfig) -> PlateLensConfig {
    let models = config.models.get_or_insert_with(ModelsConfig::default);
    models
        .detect
        .get_or_insert_with(|| DEFAULT_IMAGE_MODEL.to_string());
    models
        .enhance
        .get_or_insert_with(|| DEFAULT_IMAGE_MODEL.to_string());
    models
        .extract
        .get_or_insert_with(|| DEFAULT_TEXT_MODEL.to_string());
    models
        .validate
        .get_or_insert_with(|| DEFAULT_TEXT_MODEL.to_string());
    config
}

fn apply_server_defaults(mut config: PlateLensConfig) -> PlateLensConfig {
    let server = config.server.get_or_insert_with(ServerConfig::default);
    server
        .bind
        .get_or_insert_with(|| DEFAULT_BIND_ADDRESS.to_string());
    server.port.get_or_insert(DEFAULT_PORT);
    server.max_upload_bytes.get_or_insert(DEFAULT_MAX_UPLOAD_BYTES);
    config
}

fn apply_logging_defaults(mut config: PlateLensConfig) -> PlateLensConfig {
    let logging = config.logging.get_or_insert_with(LoggingConfig::default);
    logging
        .level
        .get_or_insert_with(|| DEFAULT_LOG_LEVEL.to_string());
    logging.json.get_or_insert(false);
    config
}
