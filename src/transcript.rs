//! # Transcript
//!
//! Ordered chat history. The store owns every mutation and announces each one
//! on a broadcast channel so a renderer can follow the newest entry.

use tokio::sync::broadcast;
use tracing::error;

use crate::models::Message;

const EVENT_CAPACITY: usize = 64;

/// Change notification published after every transcript mutation. Appends
/// and replacements carry the entry as it was when published.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranscriptEvent {
    Appended { newest: usize, entry: Message },
    ReplacedLast { newest: usize, entry: Message },
    DroppedLast { newest: usize },
}

impl TranscriptEvent {
    /// Index of the entry a renderer should scroll to
    pub fn scroll_target(&self) -> usize {
        match self {
            TranscriptEvent::Appended { newest, .. }
            | TranscriptEvent::ReplacedLast { newest, .. }
            | TranscriptEvent::DroppedLast { newest } => *newest,
        }
    }

    /// The entry that landed at [`Self::scroll_target`], if any
    pub fn entry(&self) -> Option<&Message> {
        match self {
            TranscriptEvent::Appended { entry, .. } | TranscriptEvent::ReplacedLast { entry, .. } => {
                Some(entry)
            }
            TranscriptEvent::DroppedLast { .. } => None,
        }
    }
}

#[derive(Debug)]
pub struct Transcript {
    messages: Vec<Message>,
    events: broadcast::Sender<TranscriptEvent>,
}

impl Transcript {
    /// A transcript holding only the welcome message
    pub fn new() -> Self {
        Self::with_seed(Message::welcome())
    }

    pub fn with_seed(seed: Message) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            messages: vec![seed],
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TranscriptEvent> {
        self.events.subscribe()
    }

    pub fn append(&mut self, message: Message) {
        self.messages.push(message.clone());
        self.publish(TranscriptEvent::Appended {
            newest: self.messages.len() - 1,
            entry: message,
        });
    }

    /// Swap the newest entry for `message`, returning the old one
    pub fn replace_last(&mut self, message: Message) -> Option<Message> {
        let Some(last) = self.messages.last_mut() else {
            error!("replace_last called on an empty transcript");
            return None;
        };
        let previous = std::mem::replace(last, message.clone());
        self.publish(TranscriptEvent::ReplacedLast {
            newest: self.messages.len() - 1,
            entry: message,
        });
        Some(previous)
    }

    pub fn drop_last(&mut self) -> Option<Message> {
        let Some(dropped) = self.messages.pop() else {
            error!("drop_last called on an empty transcript");
            return None;
        };
        self.publish(TranscriptEvent::DroppedLast {
            newest: self.messages.len().saturating_sub(1),
        });
        Some(dropped)
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn snapshot(&self) -> Vec<Message> {
        self.messages.clone()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Everything after the seed welcome message
    pub fn conversation_payload(&self) -> Vec<Message> {
        self.messages.iter().skip(1).cloned().collect()
    }

    fn publish(&self, event: TranscriptEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }
}

impl Default for Transcript {
    fn default() -> Self {
        Self::new()
    }
}
