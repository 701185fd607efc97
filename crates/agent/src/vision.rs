use std::sync::Arc;

use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, warn};

use crate::llm::{LlmClient, LlmError, LlmPart, LlmRequest};

const SCAN_INSTRUCTION: &str = "Identify the distinct physical items visible in this photo of a storage container's contents. \
Use short, capitalized names (for example \"Tennis Racket\"), list each kind of item once, \
and return an empty list if no items can be identified.";

/// A captured camera frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScanImage {
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl ScanImage {
    pub fn jpeg(bytes: Vec<u8>) -> Self {
        Self { mime_type: "image/jpeg".to_string(), bytes }
    }
}

#[derive(Debug, Error)]
pub enum AnalyzeError {
    #[error("image is empty")]
    EmptyImage,
    #[error(transparent)]
    Llm(#[from] LlmError),
    #[error("item reply does not match the items schema: {0}")]
    Decode(#[from] serde_json::Error),
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ItemsReply {
    items: Vec<String>,
}

#[derive(Clone)]
pub struct ImageInterpreter {
    llm: Arc<dyn LlmClient>,
}

impl ImageInterpreter {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }

    /// Labels found in the image; empty on any failure.
    pub async fn analyze(&self, image: &ScanImage) -> Vec<String> {
        match self.try_analyze(image).await {
            Ok(items) => items,
            Err(error) => {
                warn!(
                    event_name = "agent.vision.fallback_empty",
                    error = %error,
                    "image analysis failed; treating as no items"
                );
                Vec::new()
            }
        }
    }

    pub async fn try_analyze(&self, image: &ScanImage) -> Result<Vec<String>, AnalyzeError> {
        if image.bytes.is_empty() {
            return Err(AnalyzeError::EmptyImage);
        }

        let request = LlmRequest {
            system_instruction: None,
            parts: vec![
                LlmPart::InlineImage {
                    mime_type: image.mime_type.clone(),
                    data: image.bytes.clone(),
                },
                LlmPart::Text(SCAN_INSTRUCTION.to_string()),
            ],
            response_schema: items_response_schema(),
        };

        let reply = self.llm.generate(&request).await?;
        let parsed = serde_json::from_str::<ItemsReply>(&reply)?;
        let items = parsed
            .items
            .into_iter()
            .map(|item| item.trim().to_string())
            .filter(|item| !item.is_empty())
            .collect::<Vec<_>>();

        debug!(event_name = "agent.vision.analyzed", item_count = items.len(), "image analyzed");
        Ok(items)
    }
}

pub fn items_response_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "items": { "type": "ARRAY", "items": { "type": "STRING" } },
        },
        "required": ["items"],
    })
}
