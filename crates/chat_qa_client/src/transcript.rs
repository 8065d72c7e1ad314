//! Chat history replayed to the model as context on every turn.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        };
        f.write_str(s)
    }
}

/// One chat message. Assistant content is stored raw, reasoning markers
/// included; splitting happens only when it is displayed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }
}

/// Append-only message list whose first entry is always the system prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transcript {
    messages: Vec<Message>,
}

impl Transcript {
    pub fn new(system_prompt: impl Into<String>) -> Self {
        Self {
            messages: vec![Message::new(Role::System, system_prompt)],
        }
    }

    pub fn push_user(&mut self, content: impl Into<String>) -> &Message {
        self.push(Message::new(Role::User, content))
    }

    pub fn push_assistant(&mut self, content: impl Into<String>) -> &Message {
        self.push(Message::new(Role::Assistant, content))
    }

    fn push(&mut self, message: Message) -> &Message {
        self.messages.push(message);
        &self.messages[self.messages.len() - 1]
    }

    /// Every message, system prompt first, in the order sent to the model.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Messages shown to the user: everything after the system prompt.
    pub fn rendered(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter().skip(1)
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// True when only the system prompt is present.
    pub fn is_empty(&self) -> bool {
        self.messages.len() <= 1
    }
}
