//! Command interpretation: natural language in, `Action` out.
//!
//! The model sees the current time, the existing container numbers and, when a
//! camera scan is awaiting confirmation, the scanned items it must choose from.
//! Any failure degrades to `Action::Unknown`.

use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{json, Value};
use stowaway_core::action::{Action, ActionDecodeError, ACTION_NAMES};
use stowaway_core::domain::container::{Container, PendingScan};
use thiserror::Error;
use tracing::{debug, warn};

use crate::llm::{LlmClient, LlmError, LlmPart, LlmRequest};

#[derive(Debug, Error)]
pub enum InterpretError {
    #[error(transparent)]
    Llm(#[from] LlmError),
    #[error("action reply is not valid JSON: {0}")]
    MalformedJson(#[source] serde_json::Error),
    #[error("action reply does not match the action schema: {0}")]
    Schema(#[source] serde_json::Error),
}

impl From<ActionDecodeError> for InterpretError {
    fn from(error: ActionDecodeError) -> Self {
        match error {
            ActionDecodeError::MalformedJson(source) => Self::MalformedJson(source),
            ActionDecodeError::Schema(source) => Self::Schema(source),
        }
    }
}

#[derive(Clone)]
pub struct IntentInterpreter {
    llm: Arc<dyn LlmClient>,
}

impl IntentInterpreter {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }

    /// Interprets `command`, collapsing every failure to `Action::Unknown`.
    pub async fn interpret(
        &self,
        command: &str,
        containers: &[Container],
        pending_scan: Option<&PendingScan>,
    ) -> Action {
        match self.try_interpret(command, containers, pending_scan).await {
            Ok(action) => action,
            Err(error) => {
                warn!(
                    event_name = "agent.intent.fallback_unknown",
                    error = %error,
                    "command interpretation failed; treating as unknown"
                );
                Action::Unknown
            }
        }
    }

    pub async fn try_interpret(
        &self,
        command: &str,
        containers: &[Container],
        pending_scan: Option<&PendingScan>,
    ) -> Result<Action, InterpretError> {
        let request = build_request(command, containers, pending_scan, Utc::now());
        let reply = self.llm.generate(&request).await?;
        let action = Action::from_json(&reply)?;
        debug!(
            event_name = "agent.intent.interpreted",
            action = action.name(),
            container = action.container().map(|id| id.0),
            pending_scan = pending_scan.is_some(),
            "command interpreted"
        );
        Ok(action)
    }
}

pub fn build_request(
    command: &str,
    containers: &[Container],
    pending_scan: Option<&PendingScan>,
    now: DateTime<Utc>,
) -> LlmRequest {
    LlmRequest {
        system_instruction: Some(build_instruction(containers, pending_scan, now)),
        parts: vec![LlmPart::Text(command.to_string())],
        response_schema: action_response_schema(),
    }
}

pub fn build_instruction(
    containers: &[Container],
    pending_scan: Option<&PendingScan>,
    now: DateTime<Utc>,
) -> String {
    let ids = containers.iter().map(|container| container.id.to_string()).collect::<Vec<_>>();
    let max_id = containers.iter().map(|container| container.id).max();

    let mut lines = vec![
        "You manage a user's numbered storage containers and the items inside them.".to_string(),
        format!("Current time: {}.", now.to_rfc3339_opts(SecondsFormat::Secs, true)),
    ];
    match max_id {
        Some(max_id) => {
            lines.push(format!("Existing container numbers: {}.", ids.join(", ")));
            lines.push(format!(
                "The highest container number is {max_id}; a new container would be number {}.",
                max_id.0 + 1
            ));
        }
        None => {
            lines.push(
                "There are no containers yet; a new container would be number 1.".to_string(),
            );
        }
    }

    lines.push(
        "Translate the user's command into exactly one action and reply with JSON only:"
            .to_string(),
    );
    lines.push(
        "- UPDATE_ITEMS: add and/or remove items. Set containerNumber, itemsToAdd, itemsToRemove."
            .to_string(),
    );
    lines.push("- LIST_ITEMS: show one container's items. Set containerNumber.".to_string());
    lines.push("- LIST_ALL_CONTAINERS: show every container.".to_string());
    lines.push("- CLEAR_CONTAINER: empty a container. Set containerNumber.".to_string());
    lines.push("- CREATE_CONTAINER: make a new container, optionally with items.".to_string());
    lines.push("- DELETE_CONTAINER: remove a container. Set containerNumber.".to_string());
    lines.push("- UNKNOWN: the command is not about containers or is unclear.".to_string());
    lines.push(
        "Spoken numbers such as \"one\" or \"number two\" refer to container numbers.".to_string(),
    );

    if let Some(scan) = pending_scan {
        let id = scan.container_id;
        lines.push(String::new());
        lines.push(format!(
            "The user just scanned container {id} with the camera. Items identified: {}.",
            scan.items.join(", ")
        ));
        lines.push(format!(
            "Treat the command as a selection among those items and reply with UPDATE_ITEMS for containerNumber {id}, \
             putting only the selected items, spelled exactly as listed, in itemsToAdd."
        ));
        lines.push(
            "If the user says \"add all\" (or similar), select every listed item.".to_string(),
        );
        lines.push(
            "If the user declines (\"none\", \"cancel\", \"nevermind\"), reply with UPDATE_ITEMS and an empty itemsToAdd."
                .to_string(),
        );
    }

    lines.join("\n")
}

/// Response schema matching the `Action` wire form.
pub fn action_response_schema() -> Value {
    let string_array = json!({ "type": "ARRAY", "items": { "type": "STRING" } });
    json!({
        "type": "OBJECT",
        "properties": {
            "action": { "type": "STRING", "enum": ACTION_NAMES },
            "containerNumber": { "type": "INTEGER" },
            "items": string_array,
            "itemsToAdd": string_array,
            "itemsToRemove": string_array,
        },
        "required": ["action"],
    })
}
