use std::fmt;

use serde::{Deserialize, Serialize};

/// Positive, monotonically assigned container number.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContainerId(pub u32);

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Container {
    pub id: ContainerId,
    pub items: Vec<String>,
}

impl Container {
    pub fn new(id: ContainerId, items: Vec<String>) -> Self {
        Self { id, items: dedup_exact(items) }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Items joined for display, e.g. `Skis, Poles`.
    pub fn item_list(&self) -> String {
        self.items.join(", ")
    }
}

/// Items awaiting the user's selection after a camera scan.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingScan {
    pub container_id: ContainerId,
    pub items: Vec<String>,
}

/// Removes exact duplicates, keeping the first occurrence of each label.
pub(crate) fn dedup_exact(items: Vec<String>) -> Vec<String> {
    let mut unique: Vec<String> = Vec::with_capacity(items.len());
    for item in items {
        if !unique.contains(&item) {
            unique.push(item);
        }
    }
    unique
}
