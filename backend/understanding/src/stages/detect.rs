//! Plate detection: crop the plate out of a vehicle photo and judge its blurriness.

use anyhow::{Context, Result};
use tracing::{info, warn};

use platelens_core::{Capability, DetectionResult, ImageRef, ModelRequest, VisionModel};

use crate::parse::parse_blurriness;
use crate::prompts::DETECT_PROMPT;

/// Detect and crop the license plate in `photo`.
///
/// Falls back to the original photo (never blurry) when the model returns no
/// usable crop.
pub async fn detect_plate(
    model: &dyn VisionModel,
    model_name: &str,
    photo: &ImageRef,
) -> Result<DetectionResult> {
    info!("[Detector] Locating plate via {} {}", model.name(), model_name);
    let request = ModelRequest::new(Capability::DetectPlate, model_name, DETECT_PROMPT)
        .with_image(photo.clone());
    let response = model
        .generate(&request)
        .await
        .context("plate detection request failed")?;

    let plate_image = match response.image {
        Some(image) if !image.is_empty() => image,
        _ => {
            warn!("Detection model returned no cropped image; falling back to original photo");
            photo.clone()
        }
    };

    let mut is_blurry = match parse_blurriness(response.text.as_deref()) {
        Some(flag) => flag,
        None => {
            warn!(
                text = ?response.text,
                "Unexpected blurriness answer; defaulting to not blurry"
            );
            false
        }
    };

    // The original photo is never an enhancement candidate.
    if is_blurry && plate_image == *photo {
        warn!("Model reported blurry but no crop was produced; overriding to not blurry");
        is_blurry = false;
    }

    info!(cropped = plate_image != *photo, is_blurry, "[Detector] Done");
    Ok(DetectionResult {
        plate_image,
        is_blurry,
    })
}
