//! User-facing commands.
//!
//! Menu items and hotkeys go through a [`Command`]; every map change a
//! command makes is submitted to [`MapDocument::perform`](crate::core::MapDocument::perform)
//! so it lands in the undo history.

mod command;
mod edit_commands;

pub use command::{Command, CommandRegistry};
pub use edit_commands::{DeleteSelected, GroupSelected, RedoCommand, SelectAll, SelectNone, UndoCommand};

/// A registry holding every built-in command.
pub fn default_registry() -> CommandRegistry {
    let mut registry = CommandRegistry::new();
    registry.register(Box::new(SelectNone));
    registry.register(Box::new(SelectAll));
    registry.register(Box::new(DeleteSelected));
    registry.register(Box::new(GroupSelected));
    registry.register(Box::new(UndoCommand));
    registry.register(Box::new(RedoCommand));
    registry
}
