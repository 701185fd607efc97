//! Gemini REST client.
//!
//! Calls `models/{model}:generateContent` directly with a JSON response schema
//! so replies come back as bare JSON text.

use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use stowaway_core::config::LlmConfig;
use tracing::debug;

use crate::llm::{LlmClient, LlmError, LlmPart, LlmRequest};

#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    api_key: SecretString,
    base_url: String,
    model: String,
}

impl GeminiClient {
    pub fn from_config(config: &LlmConfig) -> Result<Self, LlmError> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| LlmError::Configuration("llm.api_key is not set".to_string()))?;

        let mut builder = Client::builder();
        if let Some(timeout_secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(timeout_secs));
        }
        let client = builder
            .build()
            .map_err(|err| LlmError::Configuration(format!("http client setup failed: {err}")))?;

        Ok(Self {
            client,
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!("{}/{}:generateContent", self.base_url, self.model)
    }
}

#[async_trait]
impl LlmClient for GeminiClient {
    async fn generate(&self, request: &LlmRequest) -> Result<String, LlmError> {
        let body = GenerateContentRequest::from_request(request);
        debug!(
            event_name = "llm.gemini.request",
            model = %self.model,
            part_count = request.parts.len(),
            "sending generateContent request"
        );

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", self.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|err| LlmError::Transport(err.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body_text = response
                .text()
                .await
                .unwrap_or_else(|_| "failed to read Gemini error body".to_string());
            return Err(map_http_error(status, &body_text));
        }

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .map_err(|err| LlmError::Decode(format!("unexpected Gemini response shape: {err}")))?;

        extract_text_response(parsed)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

impl GenerateContentRequest {
    fn from_request(request: &LlmRequest) -> Self {
        let system_instruction = request
            .system_instruction
            .as_ref()
            .map(|text| Content { role: None, parts: vec![Part::Text { text: text.clone() }] });

        let parts = request
            .parts
            .iter()
            .map(|part| match part {
                LlmPart::Text(text) => Part::Text { text: text.clone() },
                LlmPart::InlineImage { mime_type, data } => Part::InlineData {
                    inline_data: InlineDataPayload {
                        mime_type: mime_type.clone(),
                        data: BASE64_STANDARD.encode(data),
                    },
                },
            })
            .collect();

        Self {
            system_instruction,
            contents: vec![Content { role: Some("user".to_string()), parts }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json".to_string(),
                response_schema: request.response_schema.clone(),
            },
        }
    }
}

#[derive(Debug, Serialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Part {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineDataPayload,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineDataPayload {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: String,
    response_schema: Value,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    candidates: Option<Vec<Candidate>>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<ContentResponse>,
}

#[derive(Debug, Deserialize)]
struct ContentResponse {
    #[serde(default)]
    parts: Vec<PartResponse>,
}

#[derive(Debug, Deserialize)]
struct PartResponse {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorWrapper {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
    status: Option<String>,
}

fn extract_text_response(response: GenerateContentResponse) -> Result<String, LlmError> {
    response
        .candidates
        .and_then(|candidates| candidates.into_iter().next())
        .and_then(|candidate| candidate.content)
        .map(|content| {
            content.parts.into_iter().filter_map(|part| part.text).collect::<Vec<_>>().join("")
        })
        .filter(|text| !text.trim().is_empty())
        .ok_or(LlmError::EmptyResponse)
}

fn map_http_error(status: StatusCode, body: &str) -> LlmError {
    let message = serde_json::from_str::<ErrorWrapper>(body)
        .map(|wrapper| {
            let status_text = wrapper.error.status.unwrap_or_default();
            let msg = wrapper.error.message.unwrap_or_else(|| body.to_string());
            if status_text.is_empty() {
                msg
            } else {
                format!("{status_text}: {msg}")
            }
        })
        .unwrap_or_else(|_| body.to_string());

    LlmError::Status { status: status.as_u16(), message }
}

#[cfg(test)]
mod tests {
    use reqwest::StatusCode;
    use serde_json::json;
    use stowaway_core::config::AppConfig;

    use super::{
        extract_text_response, map_http_error, GeminiClient, GenerateContentRequest,
        GenerateContentResponse,
    };
    use crate::llm::{LlmError, LlmPart, LlmRequest};

    #[test]
    fn request_body_carries_schema_instruction_and_inline_image() {
        let request = LlmRequest {
            system_instruction: Some("identify items".to_string()),
            parts: vec![
                LlmPart::Text("what is this?".to_string()),
                LlmPart::InlineImage { mime_type: "image/jpeg".to_string(), data: vec![1, 2, 3] },
            ],
            response_schema: json!({ "type": "OBJECT" }),
        };

        let body = serde_json::to_value(GenerateContentRequest::from_request(&request))
            .expect("serialize");

        assert_eq!(body["systemInstruction"]["parts"][0]["text"], "identify items");
        assert!(body["systemInstruction"].get("role").is_none());
        assert_eq!(body["contents"][0]["role"], "user");
        assert_eq!(body["contents"][0]["parts"][0]["text"], "what is this?");
        assert_eq!(body["contents"][0]["parts"][1]["inlineData"]["mimeType"], "image/jpeg");
        assert_eq!(body["contents"][0]["parts"][1]["inlineData"]["data"], "AQID");
        assert_eq!(body["generationConfig"]["responseMimeType"], "application/json");
        assert_eq!(body["generationConfig"]["responseSchema"]["type"], "OBJECT");
    }

    #[test]
    fn response_text_parts_are_joined() {
        let response: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{ "content": { "parts": [{ "text": "{\"items\":" }, { "text": "[]}" }] } }]
        }))
        .expect("deserialize");

        assert_eq!(extract_text_response(response).expect("text"), "{\"items\":[]}");
    }

    #[test]
    fn missing_candidates_is_empty_response() {
        let response: GenerateContentResponse =
            serde_json::from_value(json!({ "candidates": [] })).expect("deserialize");

        assert!(matches!(extract_text_response(response), Err(LlmError::EmptyResponse)));
    }

    #[test]
    fn http_error_uses_api_status_and_message() {
        let error = map_http_error(
            StatusCode::FORBIDDEN,
            r#"{"error":{"code":403,"message":"API key not valid","status":"PERMISSION_DENIED"}}"#,
        );

        match error {
            LlmError::Status { status, message } => {
                assert_eq!(status, 403);
                assert_eq!(message, "PERMISSION_DENIED: API key not valid");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn client_requires_api_key() {
        let config = AppConfig::default();

        assert!(matches!(
            GeminiClient::from_config(&config.llm),
            Err(LlmError::Configuration(_))
        ));
    }

    #[test]
    fn endpoint_joins_base_url_and_model() {
        let mut config = AppConfig::default().llm;
        config.api_key = Some("key".to_string().into());
        config.base_url = "http://localhost:8089/models/".to_string();

        let client = GeminiClient::from_config(&config).expect("client");

        assert_eq!(
            client.endpoint(),
            "http://localhost:8089/models/gemini-2.5-flash:generateContent"
        );
        assert_eq!(client.model(), "gemini-2.5-flash");
    }
}
