use std::fmt;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::image::ImageRef;

/// The four model capabilities the pipeline invokes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    DetectPlate,
    EnhancePlate,
    ExtractText,
    ValidateFormat,
}

impl Capability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DetectPlate => "detect_plate",
            Self::EnhancePlate => "enhance_plate",
            Self::ExtractText => "extract_text",
            Self::ValidateFormat => "validate_format",
        }
    }

    /// Modality the capability must be configured with.
    pub fn modality(&self) -> ResponseModality {
        match self {
            Self::DetectPlate | Self::EnhancePlate => ResponseModality::TextAndImage,
            Self::ExtractText | Self::ValidateFormat => ResponseModality::Text,
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Declared response modality of a model call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseModality {
    Text,
    TextAndImage,
}

/// Request to a multimodal model provider.
#[derive(Debug, Clone)]
pub struct ModelRequest {
    pub capability: Capability,
    pub model: String,
    pub instruction: String,
    pub images: Vec<ImageRef>,
    pub modality: ResponseModality,
    /// JSON schema for structured (JSON) text output.
    pub response_schema: Option<serde_json::Value>,
}

impl ModelRequest {
    pub fn new(capability: Capability, model: impl Into<String>, instruction: impl Into<String>) -> Self {
        Self {
            capability,
            model: model.into(),
            instruction: instruction.into(),
            images: Vec::new(),
            modality: capability.modality(),
            response_schema: None,
        }
    }

    pub fn with_image(mut self, image: ImageRef) -> Self {
        self.images.push(image);
        self
    }

    pub fn with_schema(mut self, schema: serde_json::Value) -> Self {
        self.response_schema = Some(schema);
        self
    }
}

/// Response from a multimodal model provider.
#[derive(Debug, Clone, Default)]
pub struct ModelResponse {
    pub text: Option<String>,
    pub image: Option<ImageRef>,
    pub provider: String,
    pub model: String,
    pub latency_ms: u64,
}

/// A generative model that can accept images and answer with text and/or an image.
#[async_trait]
pub trait VisionModel: Send + Sync {
    /// Provider name (e.g., "gemini", "mock").
    fn name(&self) -> &str;

    /// Invoke the model. Transport and provider failures are errors; an answer
    /// without the hoped-for image is not.
    async fn generate(&self, request: &ModelRequest) -> Result<ModelResponse>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_capabilities_ask_for_images() {
        assert_eq!(Capability::DetectPlate.modality(), ResponseModality::TextAndImage);
        assert_eq!(Capability::EnhancePlate.modality(), ResponseModality::TextAndImage);
        assert_eq!(Capability::ExtractText.modality(), ResponseModality::Text);
        assert_eq!(Capability::ValidateFormat.modality(), ResponseModality::Text);
    }

    #[test]
    fn request_builder_defaults_modality() {
        let req = ModelRequest::new(Capability::ExtractText, "gemini-2.0-flash", "read it")
            .with_image(ImageRef::new("image/png", vec![1]));
        assert_eq!(req.modality, ResponseModality::Text);
        assert_eq!(req.images.len(), 1);
        assert!(req.response_schema.is_none());
    }
}
