//! Assistant runtime: LLM-backed interpretation and the conversation loop.
//!
//! - `intent` turns a typed or spoken command into a structured `Action`
//! - `vision` lists the items visible in a captured image
//! - `controller` runs turns against the session's container store and transcript
//! - `gemini` is the production `LlmClient`; `speech` is the output sink seam
//!
//! The model only translates. Every state change is applied by the
//! deterministic executor in `stowaway-core`.

pub mod controller;
pub mod gemini;
pub mod intent;
pub mod llm;
pub mod speech;
pub mod vision;

#[cfg(test)]
mod testing;

pub use controller::{ConversationController, ScanTicket, SessionSnapshot, TurnError, TurnOutcome};
pub use gemini::GeminiClient;
pub use intent::{IntentInterpreter, InterpretError};
pub use llm::{LlmClient, LlmError, LlmPart, LlmRequest};
pub use speech::{NoopSpeechOutput, SpeechOutput};
pub use vision::{AnalyzeError, ImageInterpreter, ScanImage};
