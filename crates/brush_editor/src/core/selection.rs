//! Selection view and selection modes.
//!
//! The selection is not stored separately: an object is selected when it
//! carries the `Selected` marker. [`Selection`] is a snapshot of the marked
//! objects in tree order, and [`selection_operation`] turns a click with
//! modifiers into an undoable operation:
//! - Click: Replace selection
//! - Shift+Click: Add to selection
//! - Ctrl+Click: Remove from selection
//! - Ctrl+Shift+Click: Toggle selection

use std::collections::HashSet;

use brush_map::{Aabb, MapObject, MapTree, ObjectId};

use crate::operations::{Deselect, Select, Transaction};

/// Selection mode based on modifier keys.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum SelectionMode {
    /// Replace current selection (normal click)
    #[default]
    Replace,
    /// Add to current selection (Shift+click)
    Add,
    /// Remove from current selection (Ctrl+click)
    Remove,
    /// Toggle selection state (Ctrl+Shift+click)
    Toggle,
}

impl SelectionMode {
    /// Determine selection mode from modifier keys.
    pub fn from_modifiers(shift: bool, ctrl: bool) -> Self {
        match (shift, ctrl) {
            (true, true) => Self::Toggle,
            (true, false) => Self::Add,
            (false, true) => Self::Remove,
            (false, false) => Self::Replace,
        }
    }
}

/// The selected objects of a map, in depth-first tree order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Selection {
    ids: Vec<ObjectId>,
}

impl Selection {
    pub fn from_map(map: &MapTree) -> Self {
        Self {
            ids: map.find(MapObject::is_selected).map(MapObject::id).collect(),
        }
    }

    pub fn ids(&self) -> &[ObjectId] {
        &self.ids
    }

    pub fn count(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn contains(&self, id: ObjectId) -> bool {
        self.ids.contains(&id)
    }

    /// Combined bounds of the selected subtrees.
    pub fn bounds(&self, map: &MapTree) -> Option<Aabb> {
        self.ids
            .iter()
            .filter_map(|&id| map.bounds(id))
            .reduce(Aabb::union)
    }
}

/// Build the operation that applies `mode` with `ids` to the current
/// selection of `map`.
pub fn selection_operation(map: &MapTree, ids: &[ObjectId], mode: SelectionMode) -> Transaction {
    let current = Selection::from_map(map);
    let targets: HashSet<ObjectId> = ids.iter().copied().collect();

    match mode {
        SelectionMode::Replace => {
            let drop: Vec<ObjectId> = current
                .ids()
                .iter()
                .copied()
                .filter(|id| !targets.contains(id))
                .collect();
            Transaction::new("Select")
                .with(Deselect::new(drop))
                .with(Select::new(ids.iter().copied()))
        }
        SelectionMode::Add => Transaction::new("Select").with(Select::new(ids.iter().copied())),
        SelectionMode::Remove => Transaction::new("Deselect").with(Deselect::new(ids.iter().copied())),
        SelectionMode::Toggle => {
            let (on, off): (Vec<ObjectId>, Vec<ObjectId>) =
                ids.iter().copied().partition(|&id| current.contains(id));
            Transaction::new("Toggle Selection")
                .with(Deselect::new(on))
                .with(Select::new(off))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operations::Operation;
    use brush_map::{Selected, Variant};

    fn three_solids() -> (MapTree, [ObjectId; 3]) {
        let mut map = MapTree::new();
        let root = map.root();
        let mut ids = [ObjectId::from_raw(0); 3];
        for slot in &mut ids {
            let solid = map.new_object(Variant::Solid);
            *slot = map.insert(root, solid, None).unwrap();
        }
        map.get_mut(ids[0]).unwrap().data_mut().insert(Selected);
        (map, ids)
    }

    fn apply(map: &mut MapTree, ids: &[ObjectId], mode: SelectionMode) -> Selection {
        let mut op = selection_operation(map, ids, mode);
        op.perform(map).unwrap();
        Selection::from_map(map)
    }

    #[test]
    fn test_from_modifiers() {
        assert_eq!(SelectionMode::from_modifiers(false, false), SelectionMode::Replace);
        assert_eq!(SelectionMode::from_modifiers(true, false), SelectionMode::Add);
        assert_eq!(SelectionMode::from_modifiers(false, true), SelectionMode::Remove);
        assert_eq!(SelectionMode::from_modifiers(true, true), SelectionMode::Toggle);
    }

    #[test]
    fn test_selection_replace() {
        let (mut map, [a, b, _]) = three_solids();
        let sel = apply(&mut map, &[b], SelectionMode::Replace);

        assert_eq!(sel.count(), 1);
        assert!(sel.contains(b));
        assert!(!sel.contains(a));
    }

    #[test]
    fn test_selection_add() {
        let (mut map, [a, b, _]) = three_solids();
        let sel = apply(&mut map, &[b], SelectionMode::Add);
        assert_eq!(sel.ids(), &[a, b]);
    }

    #[test]
    fn test_selection_toggle() {
        let (mut map, [a, b, _]) = three_solids();
        let sel = apply(&mut map, &[a, b], SelectionMode::Toggle);
        assert_eq!(sel.ids(), &[b]);
    }

    #[test]
    fn test_selection_remove_and_undo() {
        let (mut map, [a, _, _]) = three_solids();
        let before = map.clone();
        let mut op = selection_operation(&map, &[a], SelectionMode::Remove);
        op.perform(&mut map).unwrap();
        assert!(Selection::from_map(&map).is_empty());

        op.reverse(&mut map).unwrap();
        assert_eq!(map, before);
    }
}
