//! PlateLens runtime configuration schema.
//!
//! Every field is optional on disk; `defaults::apply_all_defaults` fills the
//! gaps and the accessor methods below read the filled-in values.

use serde::{Deserialize, Serialize};

use crate::defaults::{
    DEFAULT_BIND_ADDRESS, DEFAULT_IMAGE_MODEL, DEFAULT_LOG_LEVEL, DEFAULT_MAX_UPLOAD_BYTES,
    DEFAULT_PORT, DEFAULT_TEXT_MODEL,
};

/// Root configuration (`~/.platelens/config.yaml`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlateLensConfig {
    /// Which vision backend answers the four stage calls
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<ProviderConfig>,

    /// Model name per stage
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub models: Option<ModelsConfig>,

    /// HTTP server settings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server: Option<ServerConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logging: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    Gemini,
    /// Scripted offline model, useful for demos and smoke tests.
    Mock,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<ProviderKind>,

    /// Gemini API key; usually `${GEMINI_API_KEY}`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Override for the Gemini endpoint root
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// Per-request HTTP timeout. Unset means no timeout.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelsConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detect: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enhance: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extract: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validate: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    /// Largest accepted request body
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_upload_bytes: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    /// Directory for daily-rolling log files; no file output when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<String>,
    /// Emit NDJSON on the console instead of human-readable lines
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub json: Option<bool>,
}

impl PlateLensConfig {
    pub fn provider_kind(&self) -> ProviderKind {
        self.provider
            .as_ref()
            .and_then(|p| p.kind)
            .unwrap_or_default()
    }

    pub fn api_key(&self) -> Option<&str> {
        self.provider
            .as_ref()
            .and_then(|p| p.api_key.as_deref())
            .filter(|k| !k.trim().is_empty())
    }

    pub fn base_url(&self) -> Option<&str> {
        self.provider.as_ref().and_then(|p| p.base_url.as_deref())
    }

    pub fn request_timeout_secs(&self) -> Option<u64> {
        self.provider.as_ref().and_then(|p| p.request_timeout_secs)
    }

    /// Model names in stage order: detect, enhance, extract, validate.
    pub fn model_names(&self) -> [String; 4] {
        let models = self.models.clone().unwrap_or_default();
        [
            models.detect.unwrap_or_else(|| DEFAULT_IMAGE_MODEL.to_string()),
            models.enhance.unwrap_or_else(|| DEFAULT_IMAGE_MODEL.to_string()),
            models.extract.unwrap_or_else(|| DEFAULT_TEXT_MODEL.to_string()),
            models.validate.unwrap_or_else(|| DEFAULT_TEXT_MODEL.to_string()),
        ]
    }

    pub fn bind(&self) -> &str {
        self.server
            .as_ref()
            .and_then(|s| s.bind.as_deref())
            .unwrap_or(DEFAULT_BIND_ADDRESS)
    }

    pub fn port(&self) -> u16 {
        self.server
            .as_ref()
            .and_then(|s| s.port)
            .unwrap_or(DEFAULT_PORT)
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.server
            .as_ref()
            .and_then(|s| s.max_upload_bytes)
            .unwrap_or(DEFAULT_MAX_UPLOAD_BYTES)
    }

    pub fn log_level(&self) -> &str {
        self.logging
            .as_ref()
            .and_then(|l| l.level.as_deref())
            .unwrap_or(DEFAULT_LOG_LEVEL)
    }

    pub fn log_dir(&self) -> Option<&str> {
        self.logging.as_ref().and_then(|l| l.dir.as_deref())
    }

    pub fn log_json(&self) -> bool {
        self.logging.as_ref().and_then(|l| l.json).unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_camel_case_yaml() {
        let yaml = r#"
provider:
  kind: mock
  requestTimeoutSecs: 30
models:
  extract: gemini-1.5-pro
server:
  port: 9090
  maxUploadBytes: 1024
logging:
  json: true
"#;
        let config: PlateLensConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.provider_kind(), ProviderKind::Mock);
        assert_eq!(config.request_timeout_secs(), Some(30));
        assert_eq!(config.port(), 9090);
        assert_eq!(config.max_upload_bytes(), 1024);
        assert!(config.log_json());
        let [detect, _, extract, validate] = config.model_names();
        assert_eq!(detect, DEFAULT_IMAGE_MODEL);
        assert_eq!(extract, "gemini-1.5-pro");
        assert_eq!(validate, DEFAULT_TEXT_MODEL);
    }

    #[test]
    fn blank_api_key_counts_as_missing() {
        let config = PlateLensConfig {
            provider: Some(ProviderConfig {
                api_key: Some("  ".into()),
                ..Default::default()
            }),
            ..Default::default()
        };
        assert_eq!(config.api_key(), None);
    }

    #[test]
    fn empty_config_serializes_to_empty_map() {
        let yaml = serde_yaml::to_string(&PlateLensConfig::default()).unwrap();
        assert_eq!(yaml.trim(), "{}");
    }
}
