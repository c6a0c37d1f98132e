//! Selection operations.
//!
//! Selection is stored on the objects themselves as the [`Selected`]
//! marker, so selecting is an ordinary undoable edit.

use brush_map::{AttachedData, MapTree, ObjectId, Selected};

use super::{require_objects, Operation, OperationResult, OperationState};

struct SelectionFlags {
    ids: Vec<ObjectId>,
    selected: bool,
    prior: Vec<(ObjectId, bool)>,
    state: OperationState,
}

impl SelectionFlags {
    fn new(ids: impl IntoIterator<Item = ObjectId>, selected: bool) -> Self {
        Self {
            ids: ids.into_iter().collect(),
            selected,
            prior: Vec::new(),
            state: OperationState::Unapplied,
        }
    }

    fn perform(&mut self, map: &mut MapTree) -> OperationResult {
        self.state.require(OperationState::Unapplied)?;
        let ids = require_objects(map, &self.ids)?;

        self.prior = ids
            .iter()
            .filter_map(|&id| map.get(id).map(|o| (id, o.is_selected())))
            .collect();
        for &(id, was) in &self.prior {
            if was != self.selected {
                set_flag(map, id, self.selected);
            }
        }
        self.state = OperationState::Applied;
        Ok(())
    }

    fn reverse(&mut self, map: &mut MapTree) -> OperationResult {
        self.state.require(OperationState::Applied)?;
        let ids: Vec<ObjectId> = self.prior.iter().map(|(id, _)| *id).collect();
        require_objects(map, &ids)?;

        for (id, was) in std::mem::take(&mut self.prior).into_iter().rev() {
            if was != self.selected {
                set_flag(map, id, was);
            }
        }
        self.state = OperationState::Unapplied;
        Ok(())
    }
}

fn set_flag(map: &mut MapTree, id: ObjectId, selected: bool) {
    if let Some(object) = map.get_mut(id) {
        if selected {
            object.data_mut().insert(Selected);
        } else {
            object.data_mut().remove_kind(Selected::KIND);
        }
        map.object_changed(id);
    }
}

macro_rules! selection_operation {
    ($(#[$meta:meta])* $name:ident, $selected:expr, $description:literal) => {
        $(#[$meta])*
        pub struct $name(SelectionFlags);

        impl $name {
            pub fn new(ids: impl IntoIterator<Item = ObjectId>) -> Self {
                Self(SelectionFlags::new(ids, $selected))
            }

            pub fn ids(&self) -> &[ObjectId] {
                &self.0.ids
            }
        }

        impl Operation for $name {
            fn description(&self) -> &str {
                $description
            }

            fn state(&self) -> OperationState {
                self.0.state
            }

            fn perform(&mut self, map: &mut MapTree) -> OperationResult {
                self.0.perform(map)
            }

            fn reverse(&mut self, map: &mut MapTree) -> OperationResult {
                self.0.reverse(map)
            }
        }
    };
}

selection_operation!(
    /// Mark objects as selected; reversing restores each object's prior flag.
    Select,
    true,
    "Select"
);

selection_operation!(
    /// Clear the selection flag of objects; reversing restores each
    /// object's prior flag.
    Deselect,
    false,
    "Deselect"
);

#[cfg(test)]
mod tests {
    use super::*;
    use brush_map::{MapObject, Variant};

    #[test]
    fn test_select_then_reverse_restores_flags() {
        let mut map = MapTree::new();
        let root = map.root();
        let a = map.new_object(Variant::Solid).with_data(Selected);
        let a = map.insert(root, a, None).unwrap();
        let b = map.new_object(Variant::Solid);
        let b = map.insert(root, b, None).unwrap();

        let mut op = Select::new([a, b, b]);
        op.perform(&mut map).unwrap();
        assert!(map.find_all().skip(1).all(MapObject::is_selected));

        op.reverse(&mut map).unwrap();
        assert!(map.get(a).unwrap().is_selected());
        assert!(!map.get(b).unwrap().is_selected());
    }

    #[test]
    fn test_deselect_unknown_object_fails() {
        let mut map = MapTree::new();
        let mut op = Deselect::new([ObjectId::from_raw(42)]);
        assert!(op.perform(&mut map).is_err());
        assert_eq!(op.state(), OperationState::Unapplied);
    }
}
