use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use platelens_core::{ImageRef, ModelRequest, ModelResponse, ResponseModality, VisionModel};

pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Google Gemini `generateContent` provider.
pub struct GeminiProvider {
    client: Client,
    api_key: String,
    base_url: String,
}

impl GeminiProvider {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Bound every HTTP request. The pipeline itself has no timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self> {
        self.client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build Gemini HTTP client")?;
        Ok(self)
    }

    fn endpoint(&self, model: &str) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.base_url, model)
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    inline_data: Option<InlineData>,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Serialize, Default)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    response_modalities: Option<Vec<&'static str>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_schema: Option<serde_json::Value>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<Content>,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

fn build_request(request: &ModelRequest) -> GenerateContentRequest {
    let mut parts: Vec<Part> = request
        .images
        .iter()
        .map(|image| Part {
            text: None,
            inline_data: Some(InlineData {
                mime_type: image.mime_type().to_string(),
                data: image.to_base64(),
            }),
        })
        .collect();
    parts.push(Part {
        text: Some(request.instruction.clone()),
        inline_data: None,
    });

    let generation_config = match request.modality {
        ResponseModality::TextAndImage => Some(GenerationConfig {
            response_modalities: Some(vec!["TEXT", "IMAGE"]),
            ..Default::default()
        }),
        // JSON mode cannot be combined with image output, so only text calls get a schema.
        ResponseModality::Text => request.response_schema.as_ref().map(|schema| GenerationConfig {
            response_mime_type: Some("application/json"),
            response_schema: Some(schema.clone()),
            ..Default::default()
        }),
    };

    GenerateContentRequest {
        contents: vec![Content {
            role: Some("user".to_string()),
            parts,
        }],
        generation_config,
    }
}

/// Collapse the first candidate into text plus the first inline image.
fn parse_response(body: GenerateContentResponse) -> Result<(Option<String>, Option<ImageRef>)> {
    let Some(candidate) = body.candidates.into_iter().next() else {
        if let Some(reason) = body.prompt_feedback.and_then(|f| f.block_reason) {
            bail!("Gemini blocked the prompt: {reason}");
        }
        bail!("Gemini returned no candidates");
    };

    let mut texts = Vec::new();
    let mut image = None;
    for part in candidate.content.unwrap_or_default().parts {
        if let Some(text) = part.text {
            texts.push(text);
        }
        if image.is_none() {
            if let Some(inline) = part.inline_data {
                image = Some(
                    ImageRef::from_base64(inline.mime_type, &inline.data)
                        .context("Gemini returned undecodable inline image data")?,
                );
            }
        }
    }

    if texts.is_empty() && image.is_none() {
        if let Some(reason) = candidate.finish_reason {
            debug!(finish_reason = %reason, "Gemini candidate has no content");
        }
    }

    let text = if texts.is_empty() { None } else { Some(texts.concat()) };
    Ok((text, image))
}

#[async_trait]
impl VisionModel for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn generate(&self, request: &ModelRequest) -> Result<ModelResponse> {
        let start = Instant::now();
        let body = build_request(request);

        info!(
            capability = %request.capability,
            model = %request.model,
            images = request.images.len(),
            "[Gemini] generateContent"
        );

        let response = self
            .client
            .post(self.endpoint(&request.model))
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .context("Gemini HTTP request failed")?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            bail!("Gemini returned {}: {}", status, error_body);
        }

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .context("Failed to parse Gemini response")?;
        let (text, image) = parse_response(parsed)?;

        let latency_ms = start.elapsed().as_millis() as u64;
        debug!(
            capability = %request.capability,
            latency_ms,
            has_text = text.is_some(),
            has_image = image.is_some(),
            "[Gemini] response received"
        );

        Ok(ModelResponse {
            text,
            image,
            provider: "gemini".to_string(),
            model: request.model.clone(),
            latency_ms,
        })
    }
}
