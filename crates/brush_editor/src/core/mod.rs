//! Core editor types and state management.
//!
//! This module contains [`MapDocument`], its undo history, and the
//! [`EditorSession`] that owns every open document.

pub mod autosave;
mod document;
mod events;
mod history;
mod preferences;
mod selection;
mod session;

pub use autosave::{AutosaveError, AutosaveFile, AutosaveOutcome, SkipReason, TIMESTAMP_FORMAT};
pub use document::MapDocument;
pub use events::{DocumentEvent, DocumentId, EventBus, SessionEvent};
pub use history::{HistoryEntry, HistoryError, HistoryManager, HistoryResult};
pub use preferences::{AutosaveSettings, EditorPreferences, PreferencesError};
pub use selection::{selection_operation, Selection, SelectionMode};
pub use session::{EditorSession, RecentFiles};
