//! In-memory container store.
//!
//! Every operation is synchronous and total: "not found" is reported through
//! `Option`/`bool` results, never through errors or panics.

use crate::domain::container::{dedup_exact, Container, ContainerId};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ContainerStore {
    containers: Vec<Container>,
}

impl ContainerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a store whose containers are numbered 1..=n in seed order.
    pub fn seeded<I>(seed: I) -> Self
    where
        I: IntoIterator<Item = Vec<String>>,
    {
        let mut store = Self::new();
        for items in seed {
            store.create(items);
        }
        store
    }

    /// Appends a new container and returns its id (`max + 1`, or 1 when empty).
    pub fn create(&mut self, items: Vec<String>) -> ContainerId {
        let id = ContainerId(self.max_id().map(|id| id.0 + 1).unwrap_or(1));
        self.containers.push(Container::new(id, items));
        id
    }

    pub fn find(&self, id: ContainerId) -> Option<&Container> {
        self.containers.iter().find(|container| container.id == id)
    }

    /// Removes every item that case-insensitively contains a removal term,
    /// then appends `to_add` and de-duplicates by exact match.
    pub fn update(
        &mut self,
        id: ContainerId,
        to_add: &[String],
        to_remove: &[String],
    ) -> Option<Container> {
        let container = self.containers.iter_mut().find(|container| container.id == id)?;

        let removal_terms =
            to_remove.iter().map(|term| term.to_lowercase()).collect::<Vec<_>>();
        let mut items = std::mem::take(&mut container.items);
        if !removal_terms.is_empty() {
            items.retain(|item| {
                let lowered = item.to_lowercase();
                !removal_terms.iter().any(|term| lowered.contains(term.as_str()))
            });
        }
        items.extend(to_add.iter().cloned());
        container.items = dedup_exact(items);

        Some(container.clone())
    }

    pub fn clear(&mut self, id: ContainerId) -> bool {
        match self.containers.iter_mut().find(|container| container.id == id) {
            Some(container) => {
                container.items.clear();
                true
            }
            None => false,
        }
    }

    pub fn delete(&mut self, id: ContainerId) -> bool {
        let before = self.containers.len();
        self.containers.retain(|container| container.id != id);
        self.containers.len() != before
    }

    pub fn ids(&self) -> Vec<ContainerId> {
        self.containers.iter().map(|container| container.id).collect()
    }

    pub fn max_id(&self) -> Option<ContainerId> {
        self.containers.iter().map(|container| container.id).max()
    }

    pub fn containers(&self) -> &[Container] {
        &self.containers
    }

    pub fn snapshot(&self) -> Vec<Container> {
        self.containers.clone()
    }

    pub fn len(&self) -> usize {
        self.containers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.containers.is_empty()
    }
}
