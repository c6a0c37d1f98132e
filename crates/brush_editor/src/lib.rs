//! Brushwork level editor
//!
//! The document layer of a brush-based level editor: open maps, reversible
//! edits and autosave.
//!
//! ## Features
//!
//! - **Operations**: Reversible structural, selection, transform and
//!   attached-data edits, composable into transactions
//! - **Undo/Redo**: Bounded, position-based history with checkpoints for
//!   "modified" tracking
//! - **Commands**: Named menu/hotkey actions that submit operations
//! - **Change Notification**: Per-document event channels carrying the IDs
//!   of changed objects
//! - **Providers**: JSON map files and TOML game data
//! - **Autosave**: Timestamped copies with retention
//!
//! ## Architecture
//!
//! The editor follows an operation-based architecture:
//!
//! ```text
//! Command → Operation → MapDocument::perform → HistoryManager
//!                                            ↘ DocumentEvent
//! ```
//!
//! All modifications go through [`MapDocument::perform`] for undo/redo
//! support.

pub mod commands;
pub mod core;
pub mod error;
pub mod operations;
pub mod provider;

// Re-export commonly used types
pub use core::{
    DocumentEvent,
    DocumentId,
    EditorPreferences,
    EditorSession,
    HistoryManager,
    MapDocument,
    Selection,
    SelectionMode,
};

pub use commands::{Command, CommandRegistry};

pub use error::{EditorError, EditorResult};

pub use operations::{Operation, OperationError, OperationResult, Transaction};

pub use provider::{GameData, GameDataProvider, JsonMapProvider, MapProvider, TomlGameDataProvider};

pub use brush_map;

/// Editor version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Editor name
pub const NAME: &str = "Brushwork";
