//! Clone / unclone of subtrees for history and clipboard use.
//!
//! An [`ObjectSnapshot`] is a deep, independent copy of a subtree that keeps
//! the original IDs. It is never inserted into the live tree next to the
//! object it was taken from; it is either written back over that object with
//! [`MapTree::unclone`], or given fresh IDs first (paste).
//!
//! A [`Subtree`] is different: it holds the actual objects moved out of the
//! arena by [`MapTree::take_subtree`], so restoring it brings back the same
//! instances rather than equivalent copies.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::data::DataStore;
use crate::error::{MapError, MapResult, StructuralViolation};
use crate::id::{IdGenerator, ObjectId};
use crate::object::{MapObject, ObjectKind, Variant};
use crate::tree::MapTree;

/// Deep copy of an object and its descendants.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ObjectSnapshot {
    pub id: ObjectId,
    pub variant: Variant,
    #[serde(default)]
    pub data: DataStore,
    #[serde(default)]
    pub children: Vec<ObjectSnapshot>,
}

impl ObjectSnapshot {
    /// Snapshot of a single, childless object.
    pub fn leaf(object: MapObject) -> Self {
        Self {
            id: object.id(),
            variant: object.variant().clone(),
            data: object.data().clone(),
            children: Vec::new(),
        }
    }

    pub fn with_child(mut self, child: ObjectSnapshot) -> Self {
        self.children.push(child);
        self
    }

    pub fn kind(&self) -> ObjectKind {
        self.variant.kind()
    }

    /// Every ID in the snapshot, depth first.
    pub fn ids(&self) -> Vec<ObjectId> {
        let mut out = Vec::new();
        self.collect_ids(&mut out);
        out
    }

    fn collect_ids(&self, out: &mut Vec<ObjectId>) {
        out.push(self.id);
        for c in &self.children {
            c.collect_ids(out);
        }
    }

    fn collect_nodes<'a>(&'a self, out: &mut Vec<&'a ObjectSnapshot>) {
        out.push(self);
        for c in &self.children {
            c.collect_nodes(out);
        }
    }

    /// Give every object in the snapshot a new ID (paste / duplicate).
    pub fn reassign_ids(&mut self, ids: &mut IdGenerator) {
        self.id = ids.next();
        for c in &mut self.children {
            c.reassign_ids(ids);
        }
    }
}

/// Objects moved out of the arena, top of the subtree first.
#[derive(Clone, Debug, PartialEq)]
pub struct Subtree {
    objects: Vec<MapObject>,
}

impl Subtree {
    pub(crate) fn from_objects(objects: Vec<MapObject>) -> Self {
        debug_assert!(!objects.is_empty());
        Self { objects }
    }

    pub fn root_id(&self) -> ObjectId {
        self.objects[0].id()
    }

    pub fn root(&self) -> &MapObject {
        &self.objects[0]
    }

    pub fn objects(&self) -> &[MapObject] {
        &self.objects
    }

    pub(crate) fn into_objects(self) -> Vec<MapObject> {
        self.objects
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Copy the subtree back into snapshot form.
    pub fn to_snapshot(&self) -> ObjectSnapshot {
        let by_id: HashMap<ObjectId, &MapObject> = self.objects.iter().map(|o| (o.id(), o)).collect();
        build_snapshot(self.root(), &by_id)
    }
}

fn build_snapshot(object: &MapObject, by_id: &HashMap<ObjectId, &MapObject>) -> ObjectSnapshot {
    ObjectSnapshot {
        id: object.id(),
        variant: object.variant().clone(),
        data: object.data().clone(),
        children: object
            .children()
            .iter()
            .filter_map(|c| by_id.get(c))
            .map(|c| build_snapshot(c, by_id))
            .collect(),
    }
}

/// Build new, linked objects from a snapshot. Used to insert freshly
/// created or pasted content.
impl From<ObjectSnapshot> for Subtree {
    fn from(snapshot: ObjectSnapshot) -> Self {
        let mut objects = Vec::new();
        flatten(snapshot, None, &mut objects);
        Subtree::from_objects(objects)
    }
}

fn flatten(snapshot: ObjectSnapshot, parent: Option<ObjectId>, out: &mut Vec<MapObject>) {
    let ObjectSnapshot { id, variant, data, children } = snapshot;
    let mut object = MapObject::new(id, variant);
    object.set_data(data);
    object.set_parent(parent);
    object.children_mut().extend(children.iter().map(|c| c.id));
    out.push(object);
    for child in children {
        flatten(child, Some(id), out);
    }
}

impl MapTree {
    /// Deep copy of the subtree rooted at `id`, keeping IDs.
    pub fn clone_object(&self, id: ObjectId) -> MapResult<ObjectSnapshot> {
        let obj = self.object(id)?;
        let children = obj
            .children()
            .iter()
            .map(|&c| self.clone_object(c))
            .collect::<MapResult<Vec<_>>>()?;
        Ok(ObjectSnapshot {
            id,
            variant: obj.variant().clone(),
            data: obj.data().clone(),
            children,
        })
    }

    /// Copy of the subtree with fresh IDs from this map's generator.
    pub fn duplicate(&mut self, id: ObjectId) -> MapResult<ObjectSnapshot> {
        let mut snapshot = self.clone_object(id)?;
        snapshot.reassign_ids(self.ids_mut());
        Ok(snapshot)
    }

    /// Give `snapshot` IDs this map has never issued.
    ///
    /// A snapshot taken before its objects were deleted still carries their
    /// old IDs; pasting it must go through here so those IDs stay retired.
    pub fn reissue_ids(&mut self, snapshot: &mut ObjectSnapshot) {
        snapshot.reassign_ids(self.ids_mut());
    }

    /// Overwrite the object `id` in place from `snapshot`.
    ///
    /// The variant payload, attached data and child list are replaced; the
    /// object keeps its identity, parent link and position. Descendants that
    /// are not in the snapshot leave the arena, descendants in the snapshot
    /// are (re)created with their recorded IDs.
    pub fn unclone(&mut self, id: ObjectId, snapshot: &ObjectSnapshot) -> MapResult<()> {
        let target = self.object(id)?;
        if target.kind() != snapshot.kind() {
            return Err(MapError::TypeKindMismatch {
                expected: target.kind(),
                found: snapshot.kind(),
            });
        }

        // Everything is checked before the first mutation.
        let current: HashSet<ObjectId> = self.find_all_from(id).skip(1).map(MapObject::id).collect();
        let mut descendants = Vec::new();
        for child in &snapshot.children {
            child.collect_nodes(&mut descendants);
        }
        let mut seen = HashSet::with_capacity(descendants.len());
        for desc in descendants {
            if desc.kind() == ObjectKind::Root {
                return Err(StructuralViolation::RootMutation.into());
            }
            let repeated = !seen.insert(desc.id);
            let live_elsewhere = self.contains(desc.id) && !current.contains(&desc.id);
            if desc.id == self.root() || desc.id == id || repeated || live_elsewhere {
                return Err(StructuralViolation::DuplicateId(desc.id).into());
            }
        }

        let old_children: Vec<ObjectId> = self.object(id)?.children().to_vec();
        for child in old_children {
            self.take_subtree(child)?;
        }

        let target = self.object_mut(id)?;
        target.set_variant(snapshot.variant.clone());
        target.set_data(snapshot.data.clone());
        for child in &snapshot.children {
            self.restore_subtree(id, None, Subtree::from(child.clone()))?;
        }
        self.object_changed(id);
        log::trace!("Uncloned {} {} with {} children", snapshot.kind(), id, snapshot.children.len());
        Ok(())
    }
}
