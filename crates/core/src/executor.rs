use tracing::debug;

use crate::action::Action;
use crate::domain::container::ContainerId;
use crate::store::ContainerStore;

pub const UNKNOWN_RESPONSE: &str =
    "Sorry, I didn't understand that. Try something like \"add skis to container 1\".";
pub const NO_CONTAINERS_RESPONSE: &str = "You don't have any containers yet.";
pub const MISSING_CONTAINER_RESPONSE: &str = "Please specify which container you mean.";

/// Applies actions to the container store and renders the reply text.
///
/// No action fails: missing or unknown containers become ordinary replies.
#[derive(Clone, Debug, Default)]
pub struct ActionExecutor;

impl ActionExecutor {
    pub fn new() -> Self {
        Self
    }

    pub fn execute(&self, store: &mut ContainerStore, action: Action) -> String {
        debug!(
            event_name = "executor.action.apply",
            action = action.name(),
            container = action.container().map(|id| id.0),
            "applying action"
        );

        match action {
            Action::UpdateItems { container, items_to_add, items_to_remove } => {
                let Some(id) = container else {
                    return MISSING_CONTAINER_RESPONSE.to_string();
                };
                if store.update(id, &items_to_add, &items_to_remove).is_none() {
                    return not_found(id);
                }
                describe_update(id, &items_to_add, &items_to_remove)
            }
            Action::ListItems { container } => {
                let Some(id) = container else {
                    return MISSING_CONTAINER_RESPONSE.to_string();
                };
                match store.find(id) {
                    Some(found) if found.is_empty() => {
                        format!("Container #{id} has no items. It's empty.")
                    }
                    Some(found) => format!("Container #{id} contains: {}.", found.item_list()),
                    None => not_found(id),
                }
            }
            Action::ListAllContainers => list_all(store),
            Action::ClearContainer { container } => {
                let Some(id) = container else {
                    return MISSING_CONTAINER_RESPONSE.to_string();
                };
                if store.clear(id) {
                    format!("Container #{id} has been cleared.")
                } else {
                    not_found(id)
                }
            }
            Action::CreateContainer { items } => {
                let id = store.create(items);
                match store.find(id) {
                    Some(created) if !created.is_empty() => {
                        format!("Created container #{id} with {}.", created.item_list())
                    }
                    _ => format!("Created container #{id}."),
                }
            }
            Action::DeleteContainer { container } => {
                let Some(id) = container else {
                    return MISSING_CONTAINER_RESPONSE.to_string();
                };
                if store.delete(id) {
                    format!("Container #{id} has been deleted.")
                } else {
                    not_found(id)
                }
            }
            Action::Unknown => UNKNOWN_RESPONSE.to_string(),
        }
    }
}

fn not_found(id: ContainerId) -> String {
    format!("Sorry, I couldn't find container #{id}.")
}

fn describe_update(id: ContainerId, added: &[String], removed: &[String]) -> String {
    match (added.is_empty(), removed.is_empty()) {
        (true, true) => format!("No changes were made to container #{id}."),
        (false, true) => format!("Added {} to container #{id}.", added.join(", ")),
        (true, false) => format!("Removed {} from container #{id}.", removed.join(", ")),
        (false, false) => format!(
            "Added {} to container #{id} and removed {}.",
            added.join(", "),
            removed.join(", ")
        ),
    }
}

fn list_all(store: &ContainerStore) -> String {
    if store.is_empty() {
        return NO_CONTAINERS_RESPONSE.to_string();
    }

    let mut lines = vec!["Here are your containers:".to_string()];
    for container in store.containers() {
        let contents =
            if container.is_empty() { "(empty)".to_string() } else { container.item_list() };
        lines.push(format!("Container #{}: {contents}", container.id));
    }
    lines.join("\n")
}
