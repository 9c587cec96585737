//! Conditional plate enhancement.

use tracing::{info, warn};

use platelens_core::{Capability, EnhancementResult, ImageRef, ModelRequest, VisionModel};

use crate::prompts::ENHANCE_PROMPT;

/// Sharpen `plate` for OCR when `is_blurry` is set.
///
/// The flag is taken as given. A `false` flag returns the input untouched
/// without calling the model. Enhancement is best effort: a failed call or a
/// reply without an image yields the unenhanced input.
pub async fn enhance_plate(
    model: &dyn VisionModel,
    model_name: &str,
    plate: &ImageRef,
    is_blurry: bool,
) -> EnhancementResult {
    if !is_blurry {
        return EnhancementResult::passthrough(plate);
    }

    info!("[Enhancer] Sharpening plate via {} {}", model.name(), model_name);
    let request = ModelRequest::new(Capability::EnhancePlate, model_name, ENHANCE_PROMPT)
        .with_image(plate.clone());

    match model.generate(&request).await {
        Ok(response) => match response.image {
            Some(image) if !image.is_empty() => EnhancementResult {
                processed_image: image,
            },
            _ => {
                warn!("Enhancement returned no image; using the unenhanced plate");
                EnhancementResult::passthrough(plate)
            }
        },
        Err(e) => {
            warn!(error = %e, "Enhancement failed; using the unenhanced plate");
            EnhancementResult::passthrough(plate)
        }
    }
}
