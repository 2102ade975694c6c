//! The core models for a session's conversation history.
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub enum Role {
    #[serde(rename = "system")]
    System,
    #[serde(rename = "assistant")]
    Assistant,
    #[serde(rename = "user")]
    User,
}

/// Where a message is in its lifecycle. Optimistic inserts start as
/// `Pending` and are reconciled by an explicit transition.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MessageState {
    Pending,
    Streaming,
    Final,
    Failed,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Message {
    pub role: Role,
    pub content: String,
    pub state: MessageState,
}

impl Message {
    pub fn new(role: Role, content: &str) -> Self {
        Self {
            role,
            content: content.to_string(),
            state: MessageState::Final,
        }
    }

    pub fn pending(role: Role, content: &str) -> Self {
        Self {
            role,
            content: content.to_string(),
            state: MessageState::Pending,
        }
    }

    pub fn failure(content: &str) -> Self {
        Self {
            role: Role::System,
            content: content.to_string(),
            state: MessageState::Failed,
        }
    }

    /// An assistant message still being filled by a stream
    pub fn is_in_flight(&self) -> bool {
        self.role == Role::Assistant
            && matches!(self.state, MessageState::Pending | MessageState::Streaming)
    }
}

/// The ordered messages of one session. Every replacement bumps the
/// epoch so a writer holding an older epoch can tell its transcript
/// is gone.
#[derive(Clone, Debug, Default)]
pub struct Transcript {
    session_id: Option<String>,
    epoch: u64,
    messages: Vec<Message>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
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

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Swap in the history of another session (or none)
    pub fn replace(&mut self, session_id: Option<&str>, messages: Vec<Message>) {
        self.session_id = session_id.map(str::to_string);
        self.epoch += 1;
        self.messages = messages;
    }

    pub fn push(&mut self, msg: Message) {
        self.messages.push(msg)
    }

    pub fn in_flight(&self) -> Option<&Message> {
        self.messages.last().filter(|m| m.is_in_flight())
    }

    pub fn has_in_flight(&self) -> bool {
        self.in_flight().is_some()
    }

    /// Overwrite the in-flight message's content with the latest
    /// cumulative fragment. Returns false if the write belongs to an
    /// earlier epoch or there is nothing in flight.
    pub fn apply_fragment(&mut self, epoch: u64, text: &str) -> bool {
        if epoch != self.epoch {
            return false;
        }
        match self.messages.last_mut() {
            Some(msg) if msg.is_in_flight() => {
                msg.content.clear();
                msg.content.push_str(text);
                msg.state = MessageState::Streaming;
                true
            }
            _ => false,
        }
    }

    /// Mark the in-flight message final, keeping its content
    pub fn finalize(&mut self, epoch: u64) -> bool {
        if epoch != self.epoch {
            return false;
        }
        match self.messages.last_mut() {
            Some(msg) if msg.is_in_flight() => {
                msg.state = MessageState::Final;
                true
            }
            _ => false,
        }
    }

    /// Stop filling the in-flight message. Partial content is kept as
    /// the final answer, an empty placeholder is removed.
    pub fn abandon(&mut self, epoch: u64) -> bool {
        if epoch != self.epoch || !self.has_in_flight() {
            return false;
        }
        if self.messages.last().is_some_and(|m| m.content.is_empty()) {
            self.messages.pop();
            true
        } else {
            self.finalize(epoch)
        }
    }

    /// Discard the in-flight message and put a failure notice in its
    /// place.
    pub fn fail(&mut self, epoch: u64, description: &str) -> bool {
        if epoch != self.epoch {
            return false;
        }
        match self.messages.last_mut() {
            Some(msg) if msg.is_in_flight() => {
                *msg = Message::failure(description);
                true
            }
            _ => false,
        }
    }

    /// Reconcile optimistically inserted user messages
    pub fn confirm_pending_user(&mut self, epoch: u64) {
        if epoch != self.epoch {
            return;
        }
        for msg in self
            .messages
            .iter_mut()
            .filter(|m| m.role == Role::User && m.state == MessageState::Pending)
        {
            msg.state = MessageState::Final;
        }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Message> {
        self.messages.iter()
    }
}
