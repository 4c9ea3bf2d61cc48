use chrono::Utc;
use uuid::Uuid;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Sender {
    User,
    Assistant,
    SystemNotice,
}

/// One entry in the conversation transcript. Created once, never mutated.
#[derive(Clone, Debug)]
pub struct DisplayMessage {
    pub id: Uuid,
    pub text: String,
    pub sender: Sender,
    pub timestamp_ms: i64,
}

impl DisplayMessage {
    pub fn new(sender: Sender, text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            text: text.into(),
            sender,
            timestamp_ms: Utc::now().timestamp_millis(),
        }
    }
}

/// Append-only conversation log. Insertion order is display order; entries
/// are never reordered, edited, or removed.
#[derive(Default)]
pub struct Transcript {
    messages: Vec<DisplayMessage>,
}

impl Transcript {
    pub fn append(&mut self, message: DisplayMessage) {
        self.messages.push(message);
    }

    pub fn push(&mut self, sender: Sender, text: impl Into<String>) {
        self.append(DisplayMessage::new(sender, text));
    }

    pub fn all(&self) -> &[DisplayMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
