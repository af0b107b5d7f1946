//! In-memory conversation log and the sink trait the pipeline writes through.

use tracing::warn;

use vidpack_shared::{Message, MessageId, Role};

// ---------------------------------------------------------------------------
// MessageSink
// ---------------------------------------------------------------------------

/// Destination for the entries produced by a pipeline run.
///
/// The pipeline keeps the id returned by [`MessageSink::push`] for the
/// assistant entry and addresses every later update to that id.
pub trait MessageSink: Send {
    /// Append a new entry and return its id.
    fn push(&mut self, role: Role, content: &str) -> MessageId;
    /// Replace the content of an entry.
    fn update(&mut self, id: MessageId, content: &str);
    /// Replace the content of an entry with an error message and flag it.
    fn fail(&mut self, id: MessageId, error: &str);
    /// Called when the run enters a new phase.
    fn phase(&mut self, _name: &str) {}
}

// ---------------------------------------------------------------------------
// Conversation
// ---------------------------------------------------------------------------

/// Change notification delivered to a conversation listener.
#[derive(Debug, Clone, Copy)]
pub enum ConversationEvent<'a> {
    Phase(&'a str),
    Added(&'a Message),
    Updated(&'a Message),
}

type Listener = Box<dyn FnMut(ConversationEvent<'_>) + Send>;

/// Ordered list of conversation entries.
#[derive(Default)]
pub struct Conversation {
    messages: Vec<Message>,
    listener: Option<Listener>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback invoked after every change.
    pub fn with_listener<F>(mut self, listener: F) -> Self
    where
        F: FnMut(ConversationEvent<'_>) + Send + 'static,
    {
        self.listener = Some(Box::new(listener));
        self
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn get(&self, id: MessageId) -> Option<&Message> {
        self.messages.iter().find(|m| m.id == id)
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    fn edit(&mut self, id: MessageId, content: &str, error: bool) {
        let Some(message) = self.messages.iter_mut().find(|m| m.id == id) else {
            warn!(%id, "update for unknown conversation entry");
            return;
        };
        message.content.clear();
        message.content.push_str(content);
        message.error = error;

        if let Some(listener) = self.listener.as_mut() {
            listener(ConversationEvent::Updated(message));
        }
    }
}

impl std::fmt::Debug for Conversation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Conversation")
            .field("messages", &self.messages)
            .field("listener", &self.listener.is_some())
            .finish()
    }
}

impl MessageSink for Conversation {
    fn push(&mut self, role: Role, content: &str) -> MessageId {
        let message = Message::new(role, content);
        let id = message.id;
        self.messages.push(message);

        if let (Some(listener), Some(message)) = (self.listener.as_mut(), self.messages.last()) {
            listener(ConversationEvent::Added(message));
        }
        id
    }

    fn update(&mut self, id: MessageId, content: &str) {
        self.edit(id, content, false);
    }

    fn fail(&mut self, id: MessageId, error: &str) {
        self.edit(id, error, true);
    }

    fn phase(&mut self, name: &str) {
        if let Some(listener) = self.listener.as_mut() {
            listener(ConversationEvent::Phase(name));
        }
    }
}
