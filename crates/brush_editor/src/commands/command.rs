//! Command trait and registry.

use std::collections::BTreeMap;

use crate::core::MapDocument;
use crate::error::{EditorError, EditorResult};

/// A user-facing action bound to a menu item or hotkey.
///
/// Commands do not mutate the map themselves. They build an
/// [`Operation`](crate::operations::Operation) and hand it to
/// [`MapDocument::perform`] under [`Command::name`], which becomes the
/// history entry name.
///
/// # Example
///
/// ```ignore
/// struct SelectEverything;
///
/// impl Command for SelectEverything {
///     fn id(&self) -> &'static str { "edit.select_everything" }
///     fn name(&self) -> &str { "Select Everything" }
///
///     fn invoke(&self, document: &mut MapDocument) -> EditorResult<()> {
///         let ids = document.all_objects();
///         document.perform(self.name(), Select::new(ids))
///     }
/// }
/// ```
pub trait Command: Send + Sync {
    /// Stable identifier used for lookups and key bindings.
    fn id(&self) -> &'static str;

    /// Human-readable name, used verbatim as the history entry name.
    fn name(&self) -> &str;

    /// One-line description for menus and tooltips.
    fn details(&self) -> &str {
        ""
    }

    /// Default key binding, if any.
    fn default_hotkey(&self) -> Option<&'static str> {
        None
    }

    /// Whether the command applies to `document` right now.
    fn is_enabled(&self, _document: &MapDocument) -> bool {
        true
    }

    fn invoke(&self, document: &mut MapDocument) -> EditorResult<()>;
}

/// Registry of commands, keyed by [`Command::id`].
#[derive(Default)]
pub struct CommandRegistry {
    commands: BTreeMap<&'static str, Box<dyn Command>>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a command, replacing any previous one with the same ID.
    pub fn register(&mut self, command: Box<dyn Command>) {
        let id = command.id();
        if self.commands.insert(id, command).is_some() {
            log::warn!("Command {} registered twice, keeping the last one", id);
        }
    }

    pub fn get(&self, id: &str) -> Option<&dyn Command> {
        self.commands.get(id).map(|c| c.as_ref())
    }

    pub fn ids(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.commands.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Invoke a command by ID. Disabled commands are a no-op.
    pub fn invoke(&self, id: &str, document: &mut MapDocument) -> EditorResult<()> {
        let command = self
            .get(id)
            .ok_or_else(|| EditorError::UnknownCommand(id.to_string()))?;
        if !command.is_enabled(document) {
            log::debug!("{} is disabled for {}", command.name(), document.name());
            return Ok(());
        }
        log::debug!("Invoking {}", id);
        command.invoke(document)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::EditorPreferences;

    struct Noop;

    impl Command for Noop {
        fn id(&self) -> &'static str {
            "test.noop"
        }

        fn name(&self) -> &str {
            "No Operation"
        }

        fn is_enabled(&self, document: &MapDocument) -> bool {
            document.path().is_some()
        }

        fn invoke(&self, _document: &mut MapDocument) -> EditorResult<()> {
            panic!("disabled commands must not run");
        }
    }

    #[test]
    fn test_unknown_command() {
        let registry = CommandRegistry::new();
        let mut doc = MapDocument::new(&EditorPreferences::default());
        let err = registry.invoke("test.missing", &mut doc).unwrap_err();
        assert!(matches!(err, EditorError::UnknownCommand(id) if id == "test.missing"));
    }

    #[test]
    fn test_disabled_command_is_skipped() {
        let mut registry = CommandRegistry::new();
        registry.register(Box::new(Noop));
        let mut doc = MapDocument::new(&EditorPreferences::default());

        registry.invoke("test.noop", &mut doc).unwrap();
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("test.noop").map(|c| c.name()), Some("No Operation"));
    }
}
