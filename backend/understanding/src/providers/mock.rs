use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use platelens_core::{Capability, ImageRef, ModelRequest, ModelResponse, VisionModel};

/// One canned answer of the mock model.
#[derive(Debug, Clone)]
pub enum MockReply {
    Respond {
        text: Option<String>,
        image: Option<ImageRef>,
    },
    Fail(String),
}

impl MockReply {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Respond {
            text: Some(text.into()),
            image: None,
        }
    }

    pub fn image(image: ImageRef) -> Self {
        Self::Respond {
            text: None,
            image: Some(image),
        }
    }

    pub fn text_and_image(text: impl Into<String>, image: ImageRef) -> Self {
        Self::Respond {
            text: Some(text.into()),
            image: Some(image),
        }
    }

    pub fn json(value: serde_json::Value) -> Self {
        Self::text(value.to_string())
    }

    pub fn empty() -> Self {
        Self::Respond {
            text: None,
            image: None,
        }
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self::Fail(message.into())
    }
}

/// A mock vision model with scripted per-capability replies and a call log.
///
/// Scripted replies are consumed in order; once a capability's script is
/// exhausted the built-in default for that capability is returned.
pub struct MockVisionModel {
    name: String,
    scripts: Mutex<HashMap<Capability, VecDeque<MockReply>>>,
    calls: Mutex<Vec<ModelRequest>>,
}

impl MockVisionModel {
    pub fn new() -> Self {
        Self {
            name: "mock".to_string(),
            scripts: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Queue a reply for `capability`.
    pub fn on(self, capability: Capability, reply: MockReply) -> Self {
        lock(&self.scripts)
            .entry(capability)
            .or_default()
            .push_back(reply);
        self
    }

    /// Every request seen so far, in order.
    pub fn calls(&self) -> Vec<ModelRequest> {
        lock(&self.calls).clone()
    }

    pub fn calls_for(&self, capability: Capability) -> usize {
        lock(&self.calls)
            .iter()
            .filter(|r| r.capability == capability)
            .count()
    }

    fn default_reply(capability: Capability) -> MockReply {
        match capability {
            Capability::DetectPlate => MockReply::text("BLURRY: FALSE"),
            Capability::EnhancePlate => MockReply::empty(),
            Capability::ExtractText => {
                MockReply::json(serde_json::json!({ "extractedText": "MH12AB1234" }))
            }
            Capability::ValidateFormat => MockReply::json(serde_json::json!({
                "isValidFormat": true,
                "validationMessage": "Mock validation: format accepted."
            })),
        }
    }
}

impl Default for MockVisionModel {
    fn default() -> Self {
        Self::new()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl VisionModel for MockVisionModel {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate(&self, request: &ModelRequest) -> Result<ModelResponse> {
        lock(&self.calls).push(request.clone());

        let reply = lock(&self.scripts)
            .get_mut(&request.capability)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| Self::default_reply(request.capability));

        match reply {
            MockReply::Respond { text, image } => Ok(ModelResponse {
                text,
                image,
                provider: self.name.clone(),
                model: request.model.clone(),
                latency_ms: 0,
            }),
            MockReply::Fail(message) => Err(anyhow!(message)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn scripted_replies_then_defaults() {
        let mock = MockVisionModel::new()
            .on(Capability::ExtractText, MockReply::text("first"))
            .on(Capability::ExtractText, MockReply::fail("second fails"));
        let req = ModelRequest::new(Capability::ExtractText, "m", "read");

        let first = mock.generate(&req).await.unwrap();
        assert_eq!(first.text.as_deref(), Some("first"));
        assert!(mock.generate(&req).await.is_err());
        let third = mock.generate(&req).await.unwrap();
        assert!(third.text.unwrap().contains("MH12AB1234"));

        assert_eq!(mock.calls_for(Capability::ExtractText), 3);
        assert_eq!(mock.calls_for(Capability::DetectPlate), 0);
    }
}
