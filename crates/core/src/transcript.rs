use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sender {
    User,
    Ai,
    System,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub sender: Sender,
    pub text: String,
    pub is_loading: bool,
}

impl Message {
    fn new(sender: Sender, text: impl Into<String>, is_loading: bool) -> Self {
        Self { id: Uuid::new_v4().to_string(), sender, text: text.into(), is_loading }
    }
}

/// Append-only chat history.
///
/// A loading placeholder is resolved in place, keeping its id and position,
/// so a turn never shows both the placeholder and its answer.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Transcript {
    messages: Vec<Message>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a finished message and returns its id.
    pub fn push(&mut self, sender: Sender, text: impl Into<String>) -> String {
        let message = Message::new(sender, text, false);
        let id = message.id.clone();
        self.messages.push(message);
        id
    }

    pub fn push_loading(&mut self) -> String {
        let message = Message::new(Sender::Ai, "", true);
        let id = message.id.clone();
        self.messages.push(message);
        id
    }

    /// Replaces a loading placeholder; returns false if `id` is not a pending placeholder.
    pub fn resolve(&mut self, id: &str, sender: Sender, text: impl Into<String>) -> bool {
        let Some(message) =
            self.messages.iter_mut().find(|message| message.id == id && message.is_loading)
        else {
            return false;
        };
        message.sender = sender;
        message.text = text.into();
        message.is_loading = false;
        true
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
