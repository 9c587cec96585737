use serde::{Deserialize, Serialize};

use crate::image::ImageRef;

/// Message used when there is nothing to validate.
pub const NO_TEXT_TO_VALIDATE: &str = "No text extracted to validate.";

/// Output of the detector stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionResult {
    /// Cropped plate region, or the original photo when no crop was produced.
    pub plate_image: ImageRef,
    /// Only meaningful when `plate_image` differs from the input photo.
    pub is_blurry: bool,
}

impl DetectionResult {
    /// Detection fell back to the original photo. Never an enhancement candidate.
    pub fn fallback(original: &ImageRef) -> Self {
        Self {
            plate_image: original.clone(),
            is_blurry: false,
        }
    }

    /// Whether this result should be routed into enhancement.
    pub fn needs_enhancement(&self, original: &ImageRef) -> bool {
        self.is_blurry && self.plate_image != *original
    }
}

/// Output of the enhancer stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnhancementResult {
    pub processed_image: ImageRef,
}

impl EnhancementResult {
    pub fn passthrough(image: &ImageRef) -> Self {
        Self {
            processed_image: image.clone(),
        }
    }
}

/// Output of the extractor stage. Empty text is a valid result.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionResult {
    pub text: String,
}

impl ExtractionResult {
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// Output of the validator stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub is_valid: bool,
    pub message: String,
}

impl ValidationResult {
    /// Result the driver synthesizes locally for blank extracted text.
    pub fn nothing_to_validate() -> Self {
        Self {
            is_valid: false,
            message: NO_TEXT_TO_VALIDATE.to_string(),
        }
    }
}
