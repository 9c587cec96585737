//! Wiring from the loaded config to the runtime pieces.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Result};
use tracing::info;

use platelens_config::{PlateLensConfig, ProviderKind};
use platelens_logging::LogOptions;
use platelens_pipeline::Pipeline;
use platelens_understanding::{GeminiProvider, MockVisionModel, ModelSelection, PlateAnalyzer};

/// Config file to load: the `--config` flag, else the default location.
pub fn resolve_config_path(flag: Option<PathBuf>) -> PathBuf {
    flag.unwrap_or_else(|| platelens_config::config_file_path(&platelens_config::config_dir()))
}

pub fn log_options(config: &PlateLensConfig) -> LogOptions {
    LogOptions {
        level: config.log_level().to_string(),
        dir: config.log_dir().map(PathBuf::from),
        json: config.log_json(),
    }
}

pub fn model_selection(config: &PlateLensConfig) -> ModelSelection {
    let [detect, enhance, extract, validate] = config.model_names();
    ModelSelection {
        detect,
        enhance,
        extract,
        validate,
    }
}

/// Build the analyzer for the configured provider. `force_mock` wins over the config.
pub fn build_analyzer(config: &PlateLensConfig, force_mock: bool) -> Result<PlateAnalyzer> {
    let kind = if force_mock {
        ProviderKind::Mock
    } else {
        config.provider_kind()
    };

    let analyzer = match kind {
        ProviderKind::Mock => {
            info!("Using mock vision model");
            PlateAnalyzer::new(Arc::new(MockVisionModel::new()))
        }
        ProviderKind::Gemini => {
            let Some(api_key) = config.api_key() else {
                bail!("No Gemini API key configured. Set GEMINI_API_KEY or provider.apiKey, or pass --mock");
            };
            let mut provider = GeminiProvider::new(api_key);
            if let Some(url) = config.base_url() {
                provider = provider.with_base_url(url);
            }
            if let Some(secs) = config.request_timeout_secs() {
                provider = provider.with_timeout(Duration::from_secs(secs))?;
            }
            info!(base_url = config.base_url().unwrap_or("default"), "Registered Gemini provider");
            PlateAnalyzer::new(Arc::new(provider))
        }
    };

    Ok(analyzer.with_models(model_selection(config)))
}

pub fn build_pipeline(config: &PlateLensConfig, force_mock: bool) -> Result<Arc<Pipeline>> {
    Ok(Arc::new(Pipeline::new(build_analyzer(config, force_mock)?)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use platelens_config::{apply_all_defaults, ModelsConfig, ProviderConfig};

    #[test]
    fn gemini_without_key_is_an_error() {
        let config = apply_all_defaults(PlateLensConfig::default());
        let Err(err) = build_analyzer(&config, false) else {
            panic!("expected missing-key error");
        };
        assert!(err.to_string().contains("GEMINI_API_KEY"));
    }

    #[test]
    fn mock_flag_overrides_provider() {
        let config = apply_all_defaults(PlateLensConfig::default());
        let analyzer = build_analyzer(&config, true).unwrap();
        assert_eq!(analyzer.provider_name(), "mock");
    }

    #[test]
    fn gemini_with_key_uses_configured_models() {
        let config = apply_all_defaults(PlateLensConfig {
            provider: Some(ProviderConfig {
                api_key: Some("AIzaTestKey".into()),
                request_timeout_secs: Some(5),
                ..Default::default()
            }),
            models: Some(ModelsConfig {
                extract: Some("gemini-1.5-pro".into()),
                ..Default::default()
            }),
            ..Default::default()
        });
        let analyzer = build_analyzer(&config, false).unwrap();
        assert_eq!(analyzer.provider_name(), "gemini");
        assert_eq!(analyzer.models().extract, "gemini-1.5-pro");
        assert_eq!(analyzer.models().detect, platelens_understanding::DEFAULT_IMAGE_MODEL);
    }

    #[test]
    fn explicit_config_path_wins() {
        let path = resolve_config_path(Some(PathBuf::from("/tmp/custom.yaml")));
        assert_eq!(path, PathBuf::from("/tmp/custom.yaml"));
    }
}
