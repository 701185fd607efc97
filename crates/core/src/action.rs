//! Structured intents produced by command interpretation.
//!
//! The wire form is the JSON object the LLM is constrained to emit:
//! `{ action, containerNumber?, items?, itemsToAdd?, itemsToRemove? }`.
//! Decoding is strict about shape: unknown action names, unknown fields and
//! wrong types are rejected. `containerNumber` is only read by the variants that
//! address a container, and a zero there decodes as "no container given".

use serde::Deserialize;
use thiserror::Error;

use crate::domain::container::ContainerId;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Action {
    UpdateItems {
        container: Option<ContainerId>,
        items_to_add: Vec<String>,
        items_to_remove: Vec<String>,
    },
    ListItems {
        container: Option<ContainerId>,
    },
    ListAllContainers,
    ClearContainer {
        container: Option<ContainerId>,
    },
    CreateContainer {
        items: Vec<String>,
    },
    DeleteContainer {
        container: Option<ContainerId>,
    },
    Unknown,
}

/// Action names accepted on the wire, in schema order.
pub const ACTION_NAMES: [&str; 7] = [
    "UPDATE_ITEMS",
    "LIST_ITEMS",
    "LIST_ALL_CONTAINERS",
    "CLEAR_CONTAINER",
    "CREATE_CONTAINER",
    "DELETE_CONTAINER",
    "UNKNOWN",
];

#[derive(Debug, Error)]
pub enum ActionDecodeError {
    #[error("action reply is not valid JSON: {0}")]
    MalformedJson(#[source] serde_json::Error),
    #[error("action reply does not match the action schema: {0}")]
    Schema(#[source] serde_json::Error),
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Self::UpdateItems { .. } => "UPDATE_ITEMS",
            Self::ListItems { .. } => "LIST_ITEMS",
            Self::ListAllContainers => "LIST_ALL_CONTAINERS",
            Self::ClearContainer { .. } => "CLEAR_CONTAINER",
            Self::CreateContainer { .. } => "CREATE_CONTAINER",
            Self::DeleteContainer { .. } => "DELETE_CONTAINER",
            Self::Unknown => "UNKNOWN",
        }
    }

    pub fn container(&self) -> Option<ContainerId> {
        match self {
            Self::UpdateItems { container, .. }
            | Self::ListItems { container }
            | Self::ClearContainer { container }
            | Self::DeleteContainer { container } => *container,
            Self::ListAllContainers | Self::CreateContainer { .. } | Self::Unknown => None,
        }
    }

    pub fn from_json(raw: &str) -> Result<Self, ActionDecodeError> {
        let value = serde_json::from_str::<serde_json::Value>(raw)
            .map_err(ActionDecodeError::MalformedJson)?;
        let payload =
            serde_json::from_value::<ActionPayload>(value).map_err(ActionDecodeError::Schema)?;
        Ok(Self::from(payload))
    }
}

#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
enum ActionKind {
    UpdateItems,
    ListItems,
    ListAllContainers,
    ClearContainer,
    CreateContainer,
    DeleteContainer,
    Unknown,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct ActionPayload {
    action: ActionKind,
    container_number: Option<u32>,
    items: Option<Vec<String>>,
    items_to_add: Option<Vec<String>>,
    items_to_remove: Option<Vec<String>>,
}

impl From<ActionPayload> for Action {
    fn from(payload: ActionPayload) -> Self {
        let container = payload.container_number.filter(|number| *number > 0).map(ContainerId);

        match payload.action {
            ActionKind::UpdateItems => Self::UpdateItems {
                container,
                items_to_add: payload.items_to_add.unwrap_or_default(),
                items_to_remove: payload.items_to_remove.unwrap_or_default(),
            },
            ActionKind::ListItems => Self::ListItems { container },
            ActionKind::ListAllContainers => Self::ListAllContainers,
            ActionKind::ClearContainer => Self::ClearContainer { container },
            ActionKind::CreateContainer => {
                Self::CreateContainer { items: payload.items.unwrap_or_default() }
            }
            ActionKind::DeleteContainer => Self::DeleteContainer { container },
            ActionKind::Unknown => Self::Unknown,
        }
    }
}
