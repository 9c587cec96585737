//! Plate format validation against the Indian registration scheme.

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use tracing::info;

use platelens_core::{Capability, ModelRequest, ValidationResult, VisionModel};

use crate::parse::extract_json_from_response;
use crate::prompts::{build_validation_prompt, validation_schema};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ValidationReply {
    is_valid_format: bool,
    validation_message: String,
}

/// Judge `plate_text` against the regional format rubric.
///
/// Blank text is not special-cased here; callers short-circuit it.
pub async fn validate_format(
    model: &dyn VisionModel,
    model_name: &str,
    plate_text: &str,
) -> Result<ValidationResult> {
    info!("[Validator] Checking format via {} {}", model.name(), model_name);
    let request = ModelRequest::new(
        Capability::ValidateFormat,
        model_name,
        build_validation_prompt(plate_text),
    )
    .with_schema(validation_schema());
    let response = model
        .generate(&request)
        .await
        .context("format validation request failed")?;

    let raw = response
        .text
        .ok_or_else(|| anyhow!("validation model returned no text"))?;
    let reply: ValidationReply = serde_json::from_str(&extract_json_from_response(&raw))
        .with_context(|| format!("unexpected validation response: {raw}"))?;

    info!(is_valid = reply.is_valid_format, "[Validator] Done");
    Ok(ValidationResult {
        is_valid: reply.is_valid_format,
        message: reply.validation_message,
    })
}
