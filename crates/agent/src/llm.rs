use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// One piece of user content sent to the model.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LlmPart {
    Text(String),
    InlineImage { mime_type: String, data: Vec<u8> },
}

/// A single schema-constrained generation request.
#[derive(Clone, Debug, PartialEq)]
pub struct LlmRequest {
    pub system_instruction: Option<String>,
    pub parts: Vec<LlmPart>,
    /// JSON schema the reply must follow; the reply is JSON text.
    pub response_schema: Value,
}

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("llm client is not configured: {0}")]
    Configuration(String),
    #[error("llm request failed: {0}")]
    Transport(String),
    #[error("llm api returned {status}: {message}")]
    Status { status: u16, message: String },
    #[error("llm response could not be decoded: {0}")]
    Decode(String),
    #[error("llm response contained no text")]
    EmptyResponse,
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Returns the raw text of the model's reply.
    async fn generate(&self, request: &LlmRequest) -> Result<String, LlmError>;
}
