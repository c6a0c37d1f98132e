//! Structural operations: create, delete and move objects.

use std::collections::HashSet;

use brush_map::{MapTree, ObjectId, ObjectKind, ObjectSnapshot, StructuralViolation, Subtree};

use super::{require_objects, topmost, Operation, OperationError, OperationResult, OperationState};

/// Insert new objects under a parent.
///
/// Reversing moves the exact objects back out of the map and keeps them, so
/// a redo reinserts the same instances.
pub struct Attach {
    parent: ObjectId,
    index: Option<usize>,
    ids: Vec<ObjectId>,
    pending: Vec<Subtree>,
    state: OperationState,
}

impl Attach {
    /// Attach `objects` (with their own, fresh IDs) to the end of `parent`.
    ///
    /// Every ID in the snapshots must come from the document's generator:
    /// [`MapTree::next_id`], [`MapTree::duplicate`] or
    /// [`MapTree::reissue_ids`] for anything copied earlier. A deleted
    /// object's ID is accepted, which would let redo history address the
    /// wrong object.
    pub fn new(parent: ObjectId, objects: impl IntoIterator<Item = ObjectSnapshot>) -> Self {
        let pending: Vec<Subtree> = objects.into_iter().map(Subtree::from).collect();
        Self {
            parent,
            index: None,
            ids: pending.iter().map(Subtree::root_id).collect(),
            pending,
            state: OperationState::Unapplied,
        }
    }

    /// Insert starting at `index` instead of appending.
    pub fn at(mut self, index: usize) -> Self {
        self.index = Some(index);
        self
    }

    /// IDs of the top-level objects this operation inserts.
    pub fn ids(&self) -> &[ObjectId] {
        &self.ids
    }

    fn validate(&self, map: &MapTree) -> OperationResult {
        map.object(self.parent)?;
        let mut seen = HashSet::new();
        for object in self.pending.iter().flat_map(Subtree::objects) {
            if object.kind() == ObjectKind::Root {
                return Err(StructuralViolation::RootMutation.into_op());
            }
            if map.contains(object.id()) || !seen.insert(object.id()) {
                return Err(StructuralViolation::DuplicateId(object.id()).into_op());
            }
        }
        Ok(())
    }
}

impl Operation for Attach {
    fn description(&self) -> &str {
        "Attach"
    }

    fn state(&self) -> OperationState {
        self.state
    }

    fn perform(&mut self, map: &mut MapTree) -> OperationResult {
        self.state.require(OperationState::Unapplied)?;
        self.validate(map)?;

        for (offset, subtree) in std::mem::take(&mut self.pending).into_iter().enumerate() {
            map.restore_subtree(self.parent, self.index.map(|i| i + offset), subtree)?;
        }
        self.state = OperationState::Applied;
        Ok(())
    }

    fn reverse(&mut self, map: &mut MapTree) -> OperationResult {
        self.state.require(OperationState::Applied)?;
        require_objects(map, &self.ids)?;

        let mut taken = Vec::with_capacity(self.ids.len());
        for &id in self.ids.iter().rev() {
            taken.push(map.take_subtree(id)?);
        }
        taken.reverse();
        self.pending = taken;
        self.state = OperationState::Unapplied;
        Ok(())
    }
}

/// Remove objects (and their descendants) from the map.
///
/// The removed objects are held by the operation; reversing puts them back
/// at their recorded parent and position.
pub struct Detach {
    ids: Vec<ObjectId>,
    removed: Vec<(ObjectId, usize, Subtree)>,
    state: OperationState,
}

impl Detach {
    pub fn new(ids: impl IntoIterator<Item = ObjectId>) -> Self {
        Self {
            ids: ids.into_iter().collect(),
            removed: Vec::new(),
            state: OperationState::Unapplied,
        }
    }

    pub fn ids(&self) -> &[ObjectId] {
        &self.ids
    }
}

impl Operation for Detach {
    fn description(&self) -> &str {
        "Delete"
    }

    fn state(&self) -> OperationState {
        self.state
    }

    fn perform(&mut self, map: &mut MapTree) -> OperationResult {
        self.state.require(OperationState::Unapplied)?;
        let ids = topmost(map, &self.ids)?;
        for &id in &ids {
            if id == map.root() {
                return Err(StructuralViolation::RootMutation.into_op());
            }
            if map.index_in_parent(id).is_none() {
                return Err(OperationError::NotAttached(id));
            }
        }

        for id in ids {
            let (parent, index) = map.detach(id)?.ok_or(OperationError::NotAttached(id))?;
            let subtree = map.take_subtree(id)?;
            self.removed.push((parent, index, subtree));
        }
        self.state = OperationState::Applied;
        Ok(())
    }

    fn reverse(&mut self, map: &mut MapTree) -> OperationResult {
        self.state.require(OperationState::Applied)?;
        for (parent, _, _) in &self.removed {
            map.object(*parent)?;
        }

        while let Some((parent, index, subtree)) = self.removed.pop() {
            map.restore_subtree(parent, Some(index), subtree)?;
        }
        self.state = OperationState::Unapplied;
        Ok(())
    }
}

/// Move objects under a new parent.
pub struct Reparent {
    parent: ObjectId,
    ids: Vec<ObjectId>,
    previous: Vec<(ObjectId, ObjectId, usize)>,
    state: OperationState,
}

impl Reparent {
    pub fn new(parent: ObjectId, ids: impl IntoIterator<Item = ObjectId>) -> Self {
        Self {
            parent,
            ids: ids.into_iter().collect(),
            previous: Vec::new(),
            state: OperationState::Unapplied,
        }
    }
}

impl Operation for Reparent {
    fn description(&self) -> &str {
        "Reparent"
    }

    fn state(&self) -> OperationState {
        self.state
    }

    fn perform(&mut self, map: &mut MapTree) -> OperationResult {
        self.state.require(OperationState::Unapplied)?;
        map.object(self.parent)?;
        let ids = require_objects(map, &self.ids)?;
        for &id in &ids {
            if id == map.root() {
                return Err(StructuralViolation::RootMutation.into_op());
            }
            if id == self.parent || map.is_ancestor(id, self.parent) {
                return Err(StructuralViolation::CycleDetected {
                    parent: self.parent,
                    child: id,
                }
                .into_op());
            }
            if map.index_in_parent(id).is_none() {
                return Err(OperationError::NotAttached(id));
            }
        }

        for id in ids {
            let (old_parent, old_index) = map
                .get(id)
                .and_then(|o| o.parent())
                .zip(map.index_in_parent(id))
                .ok_or(OperationError::NotAttached(id))?;
            map.attach(self.parent, id)?;
            self.previous.push((id, old_parent, old_index));
        }
        self.state = OperationState::Applied;
        Ok(())
    }

    fn reverse(&mut self, map: &mut MapTree) -> OperationResult {
        self.state.require(OperationState::Applied)?;
        for (id, old_parent, _) in &self.previous {
            map.object(*id)?;
            map.object(*old_parent)?;
        }

        while let Some((id, old_parent, old_index)) = self.previous.pop() {
            map.attach_at(old_parent, id, Some(old_index))?;
        }
        self.state = OperationState::Unapplied;
        Ok(())
    }
}

trait IntoOperationError {
    fn into_op(self) -> OperationError;
}

impl IntoOperationError for StructuralViolation {
    fn into_op(self) -> OperationError {
        OperationError::Map(self.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use brush_map::{ObjectColor, Variant};

    /// Root -> [a -> [b], c]
    fn sample() -> (MapTree, [ObjectId; 3]) {
        let mut map = MapTree::new();
        let root = map.root();
        let a = map.new_object(Variant::Group).with_data(ObjectColor::new(9, 9, 9));
        let a = map.insert(root, a, None).unwrap();
        let b = map.new_object(Variant::Solid);
        let b = map.insert(a, b, None).unwrap();
        let c = map.new_object(Variant::Solid);
        let c = map.insert(root, c, None).unwrap();
        (map, [a, b, c])
    }

    #[test]
    fn test_attach_and_reverse_keeps_instances() {
        let (mut map, [a, _, _]) = sample();
        let before = map.clone();
        let object = map.new_object(Variant::Group);
        let snapshot = ObjectSnapshot::leaf(object);
        let id = snapshot.id;

        let mut op = Attach::new(a, [snapshot]);
        op.perform(&mut map).unwrap();
        assert_eq!(map.get(a).unwrap().children().last(), Some(&id));

        op.reverse(&mut map).unwrap();
        assert_eq!(map, before);
        op.perform(&mut map).unwrap();
        assert!(map.contains(id));
    }

    #[test]
    fn test_attach_duplicate_fails_without_changes() {
        let (mut map, [a, b, _]) = sample();
        let before = map.clone();
        let dup = map.clone_object(b).unwrap();

        let mut op = Attach::new(a, [dup]);
        assert!(op.perform(&mut map).is_err());
        assert_eq!(op.state(), OperationState::Unapplied);
        assert_eq!(map, before);
    }

    #[test]
    fn test_detach_restores_order() {
        let (mut map, [a, b, c]) = sample();
        let before = map.clone();

        let mut op = Detach::new([c, b, a]);
        op.perform(&mut map).unwrap();
        assert_eq!(map.object_count(), 1);

        op.reverse(&mut map).unwrap();
        assert_eq!(map, before);
        assert_eq!(map.get(map.root()).unwrap().children(), &[a, c]);
    }

    #[test]
    fn test_detach_root_is_rejected() {
        let (mut map, _) = sample();
        let root = map.root();
        let mut op = Detach::new([root]);
        assert!(op.perform(&mut map).is_err());
        assert_eq!(map.object_count(), 4);
    }

    #[test]
    fn test_reparent_and_reverse() {
        let (mut map, [a, b, c]) = sample();
        let before = map.clone();

        let mut op = Reparent::new(c, [b, a]);
        op.perform(&mut map).unwrap();
        assert_eq!(map.get(c).unwrap().children(), &[b, a]);

        op.reverse(&mut map).unwrap();
        assert_eq!(map, before);
    }

    #[test]
    fn test_reparent_cycle_is_rejected_up_front() {
        let (mut map, [a, b, c]) = sample();
        let before = map.clone();

        let mut op = Reparent::new(b, [c, a]);
        let err = op.perform(&mut map).unwrap_err();
        assert!(err.to_string().contains("cycle"));
        assert_eq!(map, before);
    }

    #[test]
    fn test_out_of_order_calls() {
        let (mut map, [_, _, c]) = sample();
        let mut op = Detach::new([c]);
        assert!(matches!(
            op.reverse(&mut map),
            Err(OperationError::InvalidState { .. })
        ));
        op.perform(&mut map).unwrap();
        assert!(matches!(
            op.perform(&mut map),
            Err(OperationError::InvalidState { .. })
        ));
    }
}
