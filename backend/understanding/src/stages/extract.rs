//! Plate OCR.

use anyhow::{anyhow, bail, Context, Result};
use serde::Deserialize;
use tracing::info;

use platelens_core::{Capability, ExtractionResult, ImageRef, ModelRequest, VisionModel};

use crate::parse::extract_json_from_response;
use crate::prompts::{extraction_schema, EXTRACT_PROMPT};

pub const NO_PLATE_IMAGE: &str =
    "No valid plate image to extract text from after processing stage.";

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExtractionReply {
    extracted_text: String,
}

/// Transcribe the text on `plate` verbatim. An empty transcription is valid;
/// an empty image is not and never reaches the model.
pub async fn extract_text(
    model: &dyn VisionModel,
    model_name: &str,
    plate: &ImageRef,
) -> Result<ExtractionResult> {
    if plate.is_empty() {
        bail!(NO_PLATE_IMAGE);
    }
    info!("[Extractor] Reading plate via {} {}", model.name(), model_name);
    let request = ModelRequest::new(Capability::ExtractText, model_name, EXTRACT_PROMPT)
        .with_image(plate.clone())
        .with_schema(extraction_schema());
    let response = model
        .generate(&request)
        .await
        .context("text extraction request failed")?;

    let raw = response
        .text
        .ok_or_else(|| anyhow!("extraction model returned no text"))?;
    let reply: ExtractionReply = serde_json::from_str(&extract_json_from_response(&raw))
        .with_context(|| format!("unexpected extraction response: {raw}"))?;

    info!(chars = reply.extracted_text.chars().count(), "[Extractor] Done");
    Ok(ExtractionResult {
        text: reply.extracted_text,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::{MockReply, MockVisionModel};
    use serde_json::json;

    fn plate() -> ImageRef {
        ImageRef::new("image/png", vec![5])
    }

    #[tokio::test]
    async fn empty_plate_image_is_refused_without_a_model_call() {
        let mock = MockVisionModel::new();
        let err = extract_text(&mock, "m", &ImageRef::new("image/png", Vec::new()))
            .await
            .unwrap_err();
        assert_eq!(format!("{err:#}"), NO_PLATE_IMAGE);
        assert!(mock.calls().is_empty());
    }

    #[tokio::test]
    async fn text_is_not_normalized() {
        let mock = MockVisionModel::new().on(
            Capability::ExtractText,
            MockReply::json(json!({ "extractedText": " mh 12 ab 1234 " })),
        );
        let result = extract_text(&mock, "m", &plate()).await.unwrap();
        assert_eq!(result.text, " mh 12 ab 1234 ");
        assert!(mock.calls()[0].response_schema.is_some());
    }

    #[tokio::test]
    async fn empty_text_is_valid() {
        let mock = MockVisionModel::new().on(
            Capability::ExtractText,
            MockReply::json(json!({ "extractedText": "" })),
        );
        let result = extract_text(&mock, "m", &plate()).await.unwrap();
        assert_eq!(result.text, "");
    }

    #[tokio::test]
    async fn fenced_json_is_accepted() {
        let mock = MockVisionModel::new().on(
            Capability::ExtractText,
            MockReply::text("```json\n{\"extractedText\": \"TN22CQ1111\"}\n```"),
        );
        let result = extract_text(&mock, "m", &plate()).await.unwrap();
        assert_eq!(result.text, "TN22CQ1111");
    }

    #[tokio::test]
    async fn unusable_reply_is_an_error() {
        let mock = MockVisionModel::new()
            .on(Capability::ExtractText, MockReply::text("no json here"));
        assert!(extract_text(&mock, "m", &plate()).await.is_err());

        let mock = MockVisionModel::new().on(Capability::ExtractText, MockReply::empty());
        assert!(extract_text(&mock, "m", &plate()).await.is_err());
    }
}
