use std::sync::Arc;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use platelens_core::{
    DetectionResult, EnhancementResult, ExtractionResult, ImageRef, ValidationResult, VisionModel,
};

use crate::stages;

/// Default model for the image-producing capabilities.
pub const DEFAULT_IMAGE_MODEL: &str = "gemini-2.0-flash-exp";
/// Default model for the text-only capabilities.
pub const DEFAULT_TEXT_MODEL: &str = "gemini-2.0-flash";

/// Which model name each capability is sent to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ModelSelection {
    pub detect: String,
    pub enhance: String,
    pub extract: String,
    pub validate: String,
}

impl Default for ModelSelection {
    fn default() -> Self {
        Self {
            detect: DEFAULT_IMAGE_MODEL.to_string(),
            enhance: DEFAULT_IMAGE_MODEL.to_string(),
            extract: DEFAULT_TEXT_MODEL.to_string(),
            validate: DEFAULT_TEXT_MODEL.to_string(),
        }
    }
}

/// The four plate stage operations bound to one model provider.
#[derive(Clone)]
pub struct PlateAnalyzer {
    model: Arc<dyn VisionModel>,
    models: ModelSelection,
}

impl PlateAnalyzer {
    pub fn new(model: Arc<dyn VisionModel>) -> Self {
        Self {
            model,
            models: ModelSelection::default(),
        }
    }

    pub fn with_models(mut self, models: ModelSelection) -> Self {
        self.models = models;
        self
    }

    pub fn provider_name(&self) -> &str {
        self.model.name()
    }

    pub fn models(&self) -> &ModelSelection {
        &self.models
    }

    pub async fn detect(&self, photo: &ImageRef) -> Result<DetectionResult> {
        stages::detect_plate(self.model.as_ref(), &self.models.detect, photo).await
    }

    pub async fn enhance(&self, plate: &ImageRef, is_blurry: bool) -> EnhancementResult {
        stages::enhance_plate(self.model.as_ref(), &self.models.enhance, plate, is_blurry).await
    }

    pub async fn extract(&self, plate: &ImageRef) -> Result<ExtractionResult> {
        stages::extract_text(self.model.as_ref(), &self.models.extract, plate).await
    }

    pub async fn validate(&self, plate_text: &str) -> Result<ValidationResult> {
        stages::validate_format(self.model.as_ref(), &self.models.validate, plate_text).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::MockVisionModel;
    use platelens_core::Capability;

    #[tokio::test]
    async fn routes_capabilities_to_selected_models() {
        let mock = Arc::new(MockVisionModel::new());
        let analyzer = PlateAnalyzer::new(mock.clone()).with_models(ModelSelection {
            detect: "det".into(),
            enhance: "enh".into(),
            extract: "ext".into(),
            validate: "val".into(),
        });
        let photo = ImageRef::new("image/jpeg", vec![1]);

        analyzer.detect(&photo).await.unwrap();
        analyzer.enhance(&photo, true).await;
        analyzer.extract(&photo).await.unwrap();
        analyzer.validate("MH12AB1234").await.unwrap();

        let models: Vec<_> = mock
            .calls()
            .into_iter()
            .map(|c| (c.capability, c.model))
            .collect();
        assert_eq!(
            models,
            vec![
                (Capability::DetectPlate, "det".to_string()),
                (Capability::EnhancePlate, "enh".to_string()),
                (Capability::ExtractText, "ext".to_string()),
                (Capability::ValidateFormat, "val".to_string()),
            ]
        );
    }

    #[test]
    fn partial_selection_keeps_defaults() {
        let models: ModelSelection =
            serde_json::from_value(serde_json::json!({ "extract": "gemini-1.5-pro" })).unwrap();
        assert_eq!(models.extract, "gemini-1.5-pro");
        assert_eq!(models.detect, DEFAULT_IMAGE_MODEL);
    }
}
