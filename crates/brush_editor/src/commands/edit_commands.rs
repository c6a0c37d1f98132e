//! Edit menu commands.

use brush_map::{MapObject, ObjectId, ObjectKind, ObjectSnapshot, Variant};

use super::Command;
use crate::core::MapDocument;
use crate::error::EditorResult;
use crate::operations::{topmost, Attach, Deselect, Detach, Reparent, Select, Transaction};

/// Selected objects other than the root.
fn selected_objects(document: &MapDocument) -> Vec<ObjectId> {
    let root = document.map().root();
    document
        .selection()
        .ids()
        .iter()
        .copied()
        .filter(|&id| id != root)
        .collect()
}

/// Clear the selection.
pub struct SelectNone;

impl Command for SelectNone {
    fn id(&self) -> &'static str {
        "edit.select_none"
    }

    fn name(&self) -> &str {
        "Select None"
    }

    fn details(&self) -> &str {
        "Clear selection"
    }

    fn default_hotkey(&self) -> Option<&'static str> {
        Some("Shift+Q")
    }

    fn invoke(&self, document: &mut MapDocument) -> EditorResult<()> {
        let all = document.all_objects();
        document.perform(self.name(), Deselect::new(all))
    }
}

/// Select every object in the map.
pub struct SelectAll;

impl Command for SelectAll {
    fn id(&self) -> &'static str {
        "edit.select_all"
    }

    fn name(&self) -> &str {
        "Select All"
    }

    fn details(&self) -> &str {
        "Select all objects"
    }

    fn default_hotkey(&self) -> Option<&'static str> {
        Some("Ctrl+A")
    }

    fn invoke(&self, document: &mut MapDocument) -> EditorResult<()> {
        let root = document.map().root();
        let all: Vec<ObjectId> = document.all_objects().into_iter().filter(|&id| id != root).collect();
        document.perform(self.name(), Select::new(all))
    }
}

/// Delete the selected objects and everything under them.
pub struct DeleteSelected;

impl Command for DeleteSelected {
    fn id(&self) -> &'static str {
        "edit.delete"
    }

    fn name(&self) -> &str {
        "Delete"
    }

    fn details(&self) -> &str {
        "Delete selected objects"
    }

    fn default_hotkey(&self) -> Option<&'static str> {
        Some("Del")
    }

    fn is_enabled(&self, document: &MapDocument) -> bool {
        !selected_objects(document).is_empty()
    }

    fn invoke(&self, document: &mut MapDocument) -> EditorResult<()> {
        let selected = selected_objects(document);
        document.perform(self.name(), Detach::new(selected))
    }
}

/// Move the selected objects into a new group.
///
/// The group is created under the objects' shared parent, or under the
/// root when they do not share one, and ends up as the only selected object.
pub struct GroupSelected;

impl Command for GroupSelected {
    fn id(&self) -> &'static str {
        "edit.group"
    }

    fn name(&self) -> &str {
        "Group"
    }

    fn details(&self) -> &str {
        "Group selected objects"
    }

    fn default_hotkey(&self) -> Option<&'static str> {
        Some("Ctrl+G")
    }

    fn is_enabled(&self, document: &MapDocument) -> bool {
        !selected_objects(document).is_empty()
    }

    fn invoke(&self, document: &mut MapDocument) -> EditorResult<()> {
        let selected = selected_objects(document);
        let map = document.map();
        // Nested selections move with their selected ancestor.
        let grouped = topmost(map, &selected)?;
        let mut parents = grouped.iter().filter_map(|&id| map.get(id).and_then(MapObject::parent));
        let parent = match parents.next() {
            Some(first) if parents.all(|p| p == first) => first,
            _ => map.root(),
        };
        let parent = match map.get(parent).map(MapObject::kind) {
            Some(ObjectKind::Group) | Some(ObjectKind::Root) => parent,
            _ => map.root(),
        };

        let group = document.next_id();
        let operation = Transaction::new("Group")
            .with(Attach::new(parent, [ObjectSnapshot::leaf(MapObject::new(group, Variant::Group))]))
            .with(Reparent::new(group, grouped))
            .with(Deselect::new(selected.iter().copied()))
            .with(Select::new([group]));
        document.perform(self.name(), operation)
    }
}

/// Undo the last history entry.
pub struct UndoCommand;

impl Command for UndoCommand {
    fn id(&self) -> &'static str {
        "edit.undo"
    }

    fn name(&self) -> &str {
        "Undo"
    }

    fn default_hotkey(&self) -> Option<&'static str> {
        Some("Ctrl+Z")
    }

    fn is_enabled(&self, document: &MapDocument) -> bool {
        document.history().can_undo()
    }

    fn invoke(&self, document: &mut MapDocument) -> EditorResult<()> {
        document.undo().map(drop)
    }
}

/// Redo the last undone history entry.
pub struct RedoCommand;

impl Command for RedoCommand {
    fn id(&self) -> &'static str {
        "edit.redo"
    }

    fn name(&self) -> &str {
        "Redo"
    }

    fn default_hotkey(&self) -> Option<&'static str> {
        Some("Ctrl+Y")
    }

    fn is_enabled(&self, document: &MapDocument) -> bool {
        document.history().can_redo()
    }

    fn invoke(&self, document: &mut MapDocument) -> EditorResult<()> {
        document.redo().map(drop)
    }
}
