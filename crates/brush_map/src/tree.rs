//! The map tree: an arena of [`MapObject`]s plus the parent/child relation.
//!
//! Parent and child edges are stored as IDs. The arena exclusively owns
//! every object; a parent "owns" its children only in the sense that the
//! child's ID appears once in its child list and the child's parent field
//! points back.
//!
//! Mutations that change what a renderer or spatial query would see go
//! through [`MapTree::descendants_changed`], which invalidates the cached
//! bounding boxes on the way to the root and records the touched IDs so an
//! external consumer can pick them up with [`MapTree::take_changes`].

use std::collections::{BTreeSet, HashMap, HashSet};

use crate::bounds::Aabb;
use crate::error::{MapError, MapResult, StructuralViolation};
use crate::id::{IdGenerator, ObjectId};
use crate::object::{MapObject, ObjectKind, Variant};

/// Arena-backed composite tree of map objects.
#[derive(Clone, Debug)]
pub struct MapTree {
    objects: HashMap<ObjectId, MapObject>,
    root: ObjectId,
    ids: IdGenerator,
    changes: BTreeSet<ObjectId>,
}

impl Default for MapTree {
    fn default() -> Self {
        Self::new()
    }
}

impl MapTree {
    /// Create an empty map: a single root object with ID 0.
    pub fn new() -> Self {
        Self::with_root(ObjectId::from_raw(0))
    }

    /// Create an empty map whose root carries `root_id`.
    pub fn with_root(root_id: ObjectId) -> Self {
        let mut ids = IdGenerator::new();
        ids.observe(root_id);
        let mut objects = HashMap::new();
        objects.insert(root_id, MapObject::new(root_id, Variant::Root));
        Self {
            objects,
            root: root_id,
            ids,
            changes: BTreeSet::new(),
        }
    }

    pub fn root(&self) -> ObjectId {
        self.root
    }

    pub fn get(&self, id: ObjectId) -> Option<&MapObject> {
        self.objects.get(&id)
    }

    /// Mutable access to an object's non-structural state.
    ///
    /// Report data edits with [`object_changed`](Self::object_changed).
    pub fn get_mut(&mut self, id: ObjectId) -> Option<&mut MapObject> {
        self.objects.get_mut(&id)
    }

    pub fn object(&self, id: ObjectId) -> MapResult<&MapObject> {
        self.objects.get(&id).ok_or(MapError::ObjectNotFound(id))
    }

    pub fn object_mut(&mut self, id: ObjectId) -> MapResult<&mut MapObject> {
        self.objects.get_mut(&id).ok_or(MapError::ObjectNotFound(id))
    }

    pub fn contains(&self, id: ObjectId) -> bool {
        self.objects.contains_key(&id)
    }

    /// Number of objects in the arena, root included.
    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    pub fn ids(&self) -> &IdGenerator {
        &self.ids
    }

    pub(crate) fn ids_mut(&mut self) -> &mut IdGenerator {
        &mut self.ids
    }

    /// Allocate a fresh ID.
    pub fn next_id(&mut self) -> ObjectId {
        self.ids.next()
    }

    /// Build a detached object with a fresh ID.
    pub fn new_object(&mut self, variant: Variant) -> MapObject {
        MapObject::new(self.ids.next(), variant)
    }

    // ------------------------------------------------------------------
    // Structure
    // ------------------------------------------------------------------

    /// Insert a new, childless object under `parent`.
    ///
    /// `index` defaults to the end of the child list and is clamped. The ID
    /// must come from [`next_id`](Self::next_id) or a loaded file; any ID
    /// that is not live is accepted, so re-inserting a deleted object's ID
    /// is the caller's responsibility (see [`reissue_ids`](Self::reissue_ids)).
    pub fn insert(&mut self, parent: ObjectId, mut object: MapObject, index: Option<usize>) -> MapResult<ObjectId> {
        let id = object.id();
        self.object(parent)?;
        if self.contains(id) {
            return Err(StructuralViolation::DuplicateId(id).into());
        }
        if object.kind() == ObjectKind::Root {
            return Err(StructuralViolation::RootMutation.into());
        }
        if !object.children().is_empty() {
            return Err(StructuralViolation::UnattachedChildren(id).into());
        }

        object.set_parent(Some(parent));
        self.ids.observe(id);
        self.objects.insert(id, object);
        self.link_child(parent, id, index);
        self.object_changed(id);
        Ok(id)
    }

    /// Move `child` to the end of `parent`'s child list.
    pub fn attach(&mut self, parent: ObjectId, child: ObjectId) -> MapResult<()> {
        self.attach_at(parent, child, None)
    }

    /// Move `child` under `parent` at `index` (end if `None`).
    ///
    /// Fails with [`StructuralViolation::CycleDetected`] when `child` is
    /// `parent` itself or one of its ancestors.
    pub fn attach_at(&mut self, parent: ObjectId, child: ObjectId, index: Option<usize>) -> MapResult<()> {
        self.object(parent)?;
        self.object(child)?;
        if child == self.root {
            return Err(StructuralViolation::RootMutation.into());
        }
        if child == parent || self.is_ancestor(child, parent) {
            return Err(StructuralViolation::CycleDetected { parent, child }.into());
        }

        self.unlink(child);
        if let Some(obj) = self.objects.get_mut(&child) {
            obj.set_parent(Some(parent));
        }
        self.link_child(parent, child, index);
        self.object_changed(child);
        Ok(())
    }

    /// Remove the parent link of `child` without destroying it.
    ///
    /// Returns the previous parent and position so the caller can put the
    /// node back. The node stays in the arena until it is re-attached or
    /// taken with [`take_subtree`](Self::take_subtree).
    pub fn detach(&mut self, child: ObjectId) -> MapResult<Option<(ObjectId, usize)>> {
        self.object(child)?;
        if child == self.root {
            return Err(StructuralViolation::RootMutation.into());
        }
        Ok(self.unlink(child))
    }

    /// Whether `ancestor` is a strict ancestor of `id`.
    pub fn is_ancestor(&self, ancestor: ObjectId, id: ObjectId) -> bool {
        self.ancestors(id).any(|a| a == ancestor)
    }

    /// Parent, grandparent, ... up to the root.
    pub fn ancestors(&self, id: ObjectId) -> impl Iterator<Item = ObjectId> + '_ {
        let mut current = self.objects.get(&id).and_then(MapObject::parent);
        std::iter::from_fn(move || {
            let id = current?;
            current = self.objects.get(&id).and_then(MapObject::parent);
            Some(id)
        })
    }

    /// Position of `id` in its parent's child list.
    pub fn index_in_parent(&self, id: ObjectId) -> Option<usize> {
        let parent = self.objects.get(&id)?.parent()?;
        self.objects.get(&parent)?.children().iter().position(|&c| c == id)
    }

    /// Objects in the arena that have no parent, apart from the root.
    pub fn orphans(&self) -> impl Iterator<Item = &MapObject> + '_ {
        self.objects
            .values()
            .filter(move |o| o.parent().is_none() && o.id() != self.root)
    }

    /// Move `id` and all its descendants out of the arena.
    ///
    /// The returned [`Subtree`](crate::Subtree) holds the exact objects, so
    /// putting it back with [`restore_subtree`](Self::restore_subtree)
    /// reinstates the same identities and data.
    pub fn take_subtree(&mut self, id: ObjectId) -> MapResult<crate::Subtree> {
        self.detach(id)?;
        let ids: Vec<ObjectId> = self.find_all_from(id).map(MapObject::id).collect();
        let mut objects = Vec::with_capacity(ids.len());
        for oid in ids {
            if let Some(obj) = self.objects.remove(&oid) {
                self.changes.insert(oid);
                objects.push(obj);
            }
        }
        log::trace!("Took subtree {} ({} objects)", id, objects.len());
        Ok(crate::Subtree::from_objects(objects))
    }

    /// Put a previously taken subtree back under `parent`.
    ///
    /// Nothing is inserted when an object is a root, is already live or
    /// appears twice in the subtree.
    pub fn restore_subtree(
        &mut self,
        parent: ObjectId,
        index: Option<usize>,
        subtree: crate::Subtree,
    ) -> MapResult<ObjectId> {
        self.object(parent)?;
        let mut seen = HashSet::with_capacity(subtree.len());
        for obj in subtree.objects() {
            if obj.kind() == ObjectKind::Root {
                return Err(StructuralViolation::RootMutation.into());
            }
            if self.contains(obj.id()) || !seen.insert(obj.id()) {
                return Err(StructuralViolation::DuplicateId(obj.id()).into());
            }
        }

        let top = subtree.root_id();
        for mut obj in subtree.into_objects() {
            if obj.id() == top {
                obj.set_parent(Some(parent));
            }
            obj.invalidate_bounds();
            self.ids.observe(obj.id());
            self.changes.insert(obj.id());
            self.objects.insert(obj.id(), obj);
        }
        self.link_child(parent, top, index);
        self.object_changed(top);
        Ok(top)
    }

    fn link_child(&mut self, parent: ObjectId, child: ObjectId, index: Option<usize>) {
        if let Some(p) = self.objects.get_mut(&parent) {
            let children = p.children_mut();
            let at = index.map_or(children.len(), |i| i.min(children.len()));
            children.insert(at, child);
        }
    }

    fn unlink(&mut self, child: ObjectId) -> Option<(ObjectId, usize)> {
        let parent = self.objects.get(&child)?.parent()?;
        let index = self.index_in_parent(child)?;
        if let Some(p) = self.objects.get_mut(&parent) {
            p.children_mut().remove(index);
        }
        if let Some(c) = self.objects.get_mut(&child) {
            c.set_parent(None);
        }
        self.changes.insert(child);
        self.descendants_changed(parent);
        Some((parent, index))
    }

    // ------------------------------------------------------------------
    // Traversal
    // ------------------------------------------------------------------

    /// Every object reachable from the root, depth first, parents before
    /// their children and children in order.
    pub fn find_all(&self) -> FindAll<'_> {
        self.find_all_from(self.root)
    }

    /// Depth-first walk of the subtree rooted at `id` (inclusive).
    pub fn find_all_from(&self, id: ObjectId) -> FindAll<'_> {
        let stack = if self.contains(id) { vec![id] } else { Vec::new() };
        FindAll { tree: self, stack }
    }

    /// Objects matching `pred`, in [`find_all`](Self::find_all) order.
    pub fn find<'a, P>(&'a self, mut pred: P) -> impl Iterator<Item = &'a MapObject> + 'a
    where
        P: FnMut(&MapObject) -> bool + 'a,
    {
        self.find_all().filter(move |o| pred(o))
    }

    /// The primitive renderable units under `id`.
    ///
    /// Groups and the root contribute none of their own; solids and
    /// entities yield themselves. The sequence is lazy and can be restarted
    /// by calling this again or cloning it.
    pub fn primitives(&self, id: ObjectId) -> impl Iterator<Item = Primitive<'_>> + Clone + '_ {
        self.find_all_from(id).filter_map(Primitive::from_object)
    }

    // ------------------------------------------------------------------
    // Invalidation
    // ------------------------------------------------------------------

    /// Propagate a dirty signal from `id` up to the root.
    ///
    /// Clears cached aggregates and records the visited IDs. Nothing is
    /// recomputed here; aggregates are rebuilt on the next query. The walk
    /// stops at the first object that is already invalidated and recorded,
    /// since everything above it is too.
    pub fn descendants_changed(&mut self, id: ObjectId) {
        let mut current = Some(id);
        while let Some(cur) = current {
            let Some(obj) = self.objects.get(&cur) else {
                break;
            };
            let was_fresh = obj.invalidate_bounds();
            let newly_recorded = self.changes.insert(cur);
            if !was_fresh && !newly_recorded {
                break;
            }
            current = obj.parent();
        }
    }

    /// Record that `id` itself changed (data, geometry or position).
    pub fn object_changed(&mut self, id: ObjectId) {
        let Some(obj) = self.objects.get(&id) else {
            return;
        };
        obj.invalidate_bounds();
        self.changes.insert(id);
        if let Some(parent) = obj.parent() {
            self.descendants_changed(parent);
        }
    }

    pub fn has_changes(&self) -> bool {
        !self.changes.is_empty()
    }

    /// Drain the IDs touched since the last call.
    ///
    /// IDs of removed objects are included so consumers can drop them.
    pub fn take_changes(&mut self) -> Vec<ObjectId> {
        std::mem::take(&mut self.changes).into_iter().collect()
    }

    /// Bounding box of the subtree rooted at `id`, recomputed lazily.
    pub fn bounds(&self, id: ObjectId) -> Option<Aabb> {
        let obj = self.objects.get(&id)?;
        if let Some(cached) = obj.cached_bounds() {
            return cached;
        }
        let bounds = obj
            .children()
            .iter()
            .filter_map(|&c| self.bounds(c))
            .fold(obj.own_bounds(), |acc, b| Some(acc.map_or(b, |a| a.union(b))));
        obj.store_bounds(bounds);
        bounds
    }

    // ------------------------------------------------------------------
    // Validation
    // ------------------------------------------------------------------

    /// Check the parent/child invariants over the whole arena.
    pub fn validate(&self) -> Result<(), StructuralViolation> {
        for obj in self.objects.values() {
            if let Some(parent) = obj.parent() {
                let listed = self
                    .objects
                    .get(&parent)
                    .map_or(0, |p| p.children().iter().filter(|&&c| c == obj.id()).count());
                if listed != 1 {
                    return Err(StructuralViolation::NotAChild { parent, child: obj.id() });
                }
            }
            for &child in obj.children() {
                match self.objects.get(&child) {
                    Some(c) if c.parent() == Some(obj.id()) => {}
                    _ => return Err(StructuralViolation::NotAChild { parent: obj.id(), child }),
                }
            }
        }

        let mut seen = HashSet::new();
        for obj in self.find_all() {
            if !seen.insert(obj.id()) {
                return Err(StructuralViolation::CycleDetected {
                    parent: obj.parent().unwrap_or(self.root),
                    child: obj.id(),
                });
            }
        }
        Ok(())
    }
}

/// Structural equality, object for object. Pending change records and
/// cached aggregates are ignored.
impl PartialEq for MapTree {
    fn eq(&self, other: &Self) -> bool {
        self.root == other.root && self.objects == other.objects
    }
}

/// Lazy depth-first iterator returned by [`MapTree::find_all`].
#[derive(Clone, Debug)]
pub struct FindAll<'a> {
    tree: &'a MapTree,
    stack: Vec<ObjectId>,
}

impl<'a> Iterator for FindAll<'a> {
    type Item = &'a MapObject;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let id = self.stack.pop()?;
            if let Some(obj) = self.tree.objects.get(&id) {
                self.stack.extend(obj.children().iter().rev().copied());
                return Some(obj);
            }
        }
    }
}

/// A renderable unit.
#[derive(Clone, Copy, Debug)]
pub enum Primitive<'a> {
    Solid(&'a MapObject),
    Entity(&'a MapObject),
}

impl<'a> Primitive<'a> {
    fn from_object(object: &'a MapObject) -> Option<Self> {
        match object.kind() {
            ObjectKind::Solid => Some(Primitive::Solid(object)),
            ObjectKind::Entity => Some(Primitive::Entity(object)),
            ObjectKind::Root | ObjectKind::Group => None,
        }
    }

    pub fn object(&self) -> &'a MapObject {
        match self {
            Primitive::Solid(o) | Primitive::Entity(o) => o,
        }
    }

    pub fn id(&self) -> ObjectId {
        self.object().id()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Face, ObjectColor};
    use glam::Vec3;

    fn cube_face(z: f32) -> Face {
        Face::from_polygon(
            "BRICK",
            vec![Vec3::new(0.0, 0.0, z), Vec3::new(0.0, 16.0, z), Vec3::new(16.0, 16.0, z)],
        )
        .unwrap()
    }

    /// Root -> [Group -> [Solid, Entity], Solid]
    fn sample() -> (MapTree, [ObjectId; 4]) {
        let mut tree = MapTree::new();
        let root = tree.root();
        let group = tree.new_object(Variant::Group);
        let group = tree.insert(root, group, None).unwrap();
        let solid = tree.new_object(Variant::Solid).with_data(cube_face(0.0));
        let solid = tree.insert(group, solid, None).unwrap();
        let ent = tree.new_object(Variant::entity(Vec3::new(100.0, 0.0, 0.0)));
        let ent = tree.insert(group, ent, None).unwrap();
        let other = tree.new_object(Variant::Solid).with_data(cube_face(32.0));
        let other = tree.insert(root, other, None).unwrap();
        (tree, [group, solid, ent, other])
    }

    #[test]
    fn test_find_all_order() {
        let (tree, [group, solid, ent, other]) = sample();
        let order: Vec<_> = tree.find_all().map(MapObject::id).collect();
        assert_eq!(order, vec![tree.root(), group, solid, ent, other]);
    }

    #[test]
    fn test_attach_rejects_cycles() {
        let (mut tree, [group, solid, _, _]) = sample();
        let err = tree.attach(solid, group).unwrap_err();
        assert!(matches!(
            err,
            MapError::StructuralViolation(StructuralViolation::CycleDetected { .. })
        ));
        assert!(tree.attach(group, group).is_err());
        assert!(tree.validate().is_ok());
    }

    #[test]
    fn test_attach_moves_between_parents() {
        let (mut tree, [group, solid, ent, other]) = sample();
        tree.attach(other, solid).unwrap();

        assert_eq!(tree.get(group).unwrap().children(), &[ent]);
        assert_eq!(tree.get(other).unwrap().children(), &[solid]);
        assert_eq!(tree.get(solid).unwrap().parent(), Some(other));
        assert!(tree.validate().is_ok());
    }

    #[test]
    fn test_insert_rejects_duplicate_and_root() {
        let (mut tree, [group, solid, _, _]) = sample();
        let dup = MapObject::new(solid, Variant::Solid);
        assert!(matches!(
            tree.insert(group, dup, None),
            Err(MapError::StructuralViolation(StructuralViolation::DuplicateId(_)))
        ));
        assert!(tree.detach(tree.root()).is_err());
    }

    #[test]
    fn test_detach_keeps_node_in_arena() {
        let (mut tree, [group, solid, _, _]) = sample();
        let previous = tree.detach(solid).unwrap();

        assert_eq!(previous, Some((group, 0)));
        assert!(tree.contains(solid));
        assert_eq!(tree.orphans().count(), 1);
        assert!(tree.find_all().all(|o| o.id() != solid));

        tree.attach_at(group, solid, Some(0)).unwrap();
        assert_eq!(tree.index_in_parent(solid), Some(0));
    }

    #[test]
    fn test_take_and_restore_subtree() {
        let (mut tree, [group, _, _, _]) = sample();
        let before = tree.clone();
        let root = tree.root();

        let subtree = tree.take_subtree(group).unwrap();
        assert_eq!(subtree.len(), 3);
        assert_eq!(tree.object_count(), 2);

        tree.restore_subtree(root, Some(0), subtree).unwrap();
        assert_eq!(tree, before);
    }

    #[test]
    fn test_bounds_are_cached_and_invalidated() {
        let (mut tree, [group, solid, _, _]) = sample();
        let root = tree.root();
        let b = tree.bounds(root).unwrap();
        assert_eq!(b.max.z, 32.0);
        tree.take_changes();

        if let Some(obj) = tree.get_mut(solid) {
            obj.data_mut().insert(ObjectColor::new(1, 1, 1));
        }
        tree.object_changed(solid);

        let changed = tree.take_changes();
        assert_eq!(changed, vec![root, group, solid]);
        assert!(tree.get(group).unwrap().cached_bounds().is_none());
        assert!(tree.bounds(group).is_some());
    }

    #[test]
    fn test_descendants_changed_is_idempotent() {
        let (mut tree, [group, solid, _, _]) = sample();
        tree.take_changes();
        tree.descendants_changed(solid);
        let first = tree.take_changes();
        tree.descendants_changed(solid);
        tree.descendants_changed(solid);
        assert_eq!(tree.take_changes(), first);
        assert!(first.contains(&group));
    }

    #[test]
    fn test_primitives_are_restartable() {
        let (tree, [group, solid, ent, other]) = sample();
        let prims = tree.primitives(tree.root());
        let again = prims.clone();

        let ids: Vec<_> = prims.map(|p| p.id()).collect();
        assert_eq!(ids, vec![solid, ent, other]);
        assert_eq!(again.count(), 3);
        assert_eq!(tree.primitives(group).count(), 2);
    }
}
