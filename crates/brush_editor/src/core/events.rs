//! Change notification for documents and sessions.
//!
//! Subscribers get a `crossbeam_channel` receiver and may live on any
//! thread. Handlers only observe; the map is never handed out through an
//! event.

use std::path::PathBuf;

use brush_map::ObjectId;
use crossbeam_channel::{unbounded, Receiver, Sender};

/// Something that happened to a document.
#[derive(Debug, Clone, PartialEq)]
pub enum DocumentEvent {
    /// A top-level operation was performed and recorded.
    Performed { name: String, changed: Vec<ObjectId> },
    Undone { name: String, changed: Vec<ObjectId> },
    Redone { name: String, changed: Vec<ObjectId> },
    Saved { path: PathBuf },
    Autosaved { path: PathBuf },
}

impl DocumentEvent {
    /// Objects touched by the event, for renderers that redraw incrementally.
    pub fn changed(&self) -> &[ObjectId] {
        match self {
            DocumentEvent::Performed { changed, .. }
            | DocumentEvent::Undone { changed, .. }
            | DocumentEvent::Redone { changed, .. } => changed,
            DocumentEvent::Saved { .. } | DocumentEvent::Autosaved { .. } => &[],
        }
    }
}

/// Identifier of a document within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DocumentId(pub u32);

impl std::fmt::Display for DocumentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Document({})", self.0)
    }
}

/// Something that happened to the set of open documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    Opened(DocumentId),
    Activated(DocumentId),
    Closed(DocumentId),
}

/// Fan-out of events to every live subscriber.
#[derive(Debug)]
pub struct EventBus<E> {
    subscribers: Vec<Sender<E>>,
}

impl<E> Default for EventBus<E> {
    fn default() -> Self {
        Self {
            subscribers: Vec::new(),
        }
    }
}

impl<E: Clone> EventBus<E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self) -> Receiver<E> {
        let (tx, rx) = unbounded();
        self.subscribers.push(tx);
        rx
    }

    /// Send `event` to all subscribers, dropping the ones that hung up.
    pub fn publish(&mut self, event: E) {
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}
