//! Geometric operations.

use brush_map::{MapError, MapObject, MapTree, ObjectId, ObjectKind, ObjectSnapshot};
use glam::{Affine3A, Vec3};

use super::{require_objects, topmost, Operation, OperationResult, OperationState};

/// Apply an affine transform to objects and everything below them.
///
/// Reversing writes back snapshots taken before the transform rather than
/// applying the inverse matrix, so repeated undo/redo does not drift.
pub struct Transform {
    ids: Vec<ObjectId>,
    matrix: Affine3A,
    before: Vec<ObjectSnapshot>,
    state: OperationState,
}

impl Transform {
    pub fn new(ids: impl IntoIterator<Item = ObjectId>, matrix: Affine3A) -> Self {
        Self {
            ids: ids.into_iter().collect(),
            matrix,
            before: Vec::new(),
            state: OperationState::Unapplied,
        }
    }

    pub fn translate(ids: impl IntoIterator<Item = ObjectId>, offset: Vec3) -> Self {
        Self::new(ids, Affine3A::from_translation(offset))
    }

    pub fn matrix(&self) -> &Affine3A {
        &self.matrix
    }
}

impl Operation for Transform {
    fn description(&self) -> &str {
        "Transform"
    }

    fn state(&self) -> OperationState {
        self.state
    }

    fn perform(&mut self, map: &mut MapTree) -> OperationResult {
        self.state.require(OperationState::Unapplied)?;
        let ids = topmost(map, &self.ids)?;
        let before = ids
            .iter()
            .map(|&id| map.clone_object(id))
            .collect::<Result<Vec<_>, _>>()?;

        for &id in &ids {
            let subtree: Vec<ObjectId> = map.find_all_from(id).map(MapObject::id).collect();
            for oid in subtree {
                if let Some(object) = map.get_mut(oid) {
                    object.transform(&self.matrix);
                }
                map.object_changed(oid);
            }
        }
        self.before = before;
        self.state = OperationState::Applied;
        Ok(())
    }

    fn reverse(&mut self, map: &mut MapTree) -> OperationResult {
        self.state.require(OperationState::Applied)?;
        let ids: Vec<ObjectId> = self.before.iter().map(|s| s.id).collect();
        require_objects(map, &ids)?;

        for snapshot in self.before.iter().rev() {
            map.unclone(snapshot.id, snapshot)?;
        }
        self.before.clear();
        self.state = OperationState::Unapplied;
        Ok(())
    }
}

/// Move a single entity to a new origin.
pub struct SetEntityOrigin {
    id: ObjectId,
    origin: Vec3,
    previous: Option<Vec3>,
    state: OperationState,
}

impl SetEntityOrigin {
    pub fn new(id: ObjectId, origin: Vec3) -> Self {
        Self {
            id,
            origin,
            previous: None,
            state: OperationState::Unapplied,
        }
    }

    fn set(map: &mut MapTree, id: ObjectId, origin: Vec3) -> OperationResult<Vec3> {
        let object = map.object_mut(id)?;
        let kind = object.kind();
        let previous = object.set_origin(origin).ok_or(MapError::TypeKindMismatch {
            expected: ObjectKind::Entity,
            found: kind,
        })?;
        map.object_changed(id);
        Ok(previous)
    }
}

impl Operation for SetEntityOrigin {
    fn description(&self) -> &str {
        "Move Entity"
    }

    fn state(&self) -> OperationState {
        self.state
    }

    fn perform(&mut self, map: &mut MapTree) -> OperationResult {
        self.state.require(OperationState::Unapplied)?;
        self.previous = Some(Self::set(map, self.id, self.origin)?);
        self.state = OperationState::Applied;
        Ok(())
    }

    fn reverse(&mut self, map: &mut MapTree) -> OperationResult {
        self.state.require(OperationState::Applied)?;
        if let Some(previous) = self.previous.take() {
            Self::set(map, self.id, previous)?;
        }
        self.state = OperationState::Unapplied;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use brush_map::{Face, Variant};

    fn map_with_brush() -> (MapTree, ObjectId, ObjectId, ObjectId) {
        let mut map = MapTree::new();
        let root = map.root();
        let group = map.new_object(Variant::Group);
        let group = map.insert(root, group, None).unwrap();
        let face = Face::from_polygon(
            "WALL",
            vec![Vec3::ZERO, Vec3::new(0.0, 32.0, 0.0), Vec3::new(32.0, 32.0, 0.0)],
        )
        .unwrap();
        let solid = map.new_object(Variant::Solid).with_data(face);
        let solid = map.insert(group, solid, None).unwrap();
        let ent = map.new_object(Variant::entity(Vec3::new(1.0, 1.0, 1.0)));
        let ent = map.insert(group, ent, None).unwrap();
        (map, group, solid, ent)
    }

    #[test]
    fn test_transform_moves_whole_subtree() {
        let (mut map, group, solid, ent) = map_with_brush();
        let mut op = Transform::translate([group, solid], Vec3::new(0.0, 0.0, 10.0));
        op.perform(&mut map).unwrap();

        assert_eq!(map.get(ent).unwrap().origin(), Some(Vec3::new(1.0, 1.0, 11.0)));
        // Nested IDs are not transformed twice.
        assert!(map.get(solid).unwrap().faces().all(|f| f.vertices.iter().all(|v| v.z == 10.0)));
    }

    #[test]
    fn test_transform_reverse_is_exact() {
        let (mut map, group, _, _) = map_with_brush();
        let before = map.clone();
        let rotation = Affine3A::from_rotation_z(0.3) * Affine3A::from_scale(Vec3::splat(1.7));
        let mut op = Transform::new([group], rotation);

        for _ in 0..5 {
            op.perform(&mut map).unwrap();
            op.reverse(&mut map).unwrap();
        }
        assert_eq!(map, before);
    }

    #[test]
    fn test_set_entity_origin() {
        let (mut map, _, solid, ent) = map_with_brush();
        let mut op = SetEntityOrigin::new(ent, Vec3::splat(64.0));
        op.perform(&mut map).unwrap();
        assert_eq!(map.get(ent).unwrap().origin(), Some(Vec3::splat(64.0)));
        op.reverse(&mut map).unwrap();
        assert_eq!(map.get(ent).unwrap().origin(), Some(Vec3::ONE));

        let mut bad = SetEntityOrigin::new(solid, Vec3::ZERO);
        assert!(bad.perform(&mut map).is_err());
        assert_eq!(bad.state(), OperationState::Unapplied);
    }
}
