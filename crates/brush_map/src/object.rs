//! Map objects: the nodes of the composite scene tree.

use std::cell::Cell;
use std::fmt;

use glam::{Affine3A, Vec3};
use serde::{Deserialize, Serialize};

use crate::bounds::Aabb;
use crate::data::{
    AttachedData, DataStore, EntityData, Face, Hidden, MapObjectData, ObjectColor, Selected,
    VisgroupMembership,
};
use crate::id::ObjectId;

/// Half size of the box drawn for a point entity.
pub const POINT_ENTITY_HALF_EXTENT: f32 = 8.0;

/// Variant tag of a map object.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObjectKind {
    Root,
    Group,
    Solid,
    Entity,
}

impl ObjectKind {
    pub fn name(&self) -> &'static str {
        match self {
            ObjectKind::Root => "Root",
            ObjectKind::Group => "Group",
            ObjectKind::Solid => "Solid",
            ObjectKind::Entity => "Entity",
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Variant-specific state of a map object.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Variant {
    Root,
    Group,
    /// A brush; its faces are attached data.
    Solid,
    /// A point or brush entity placed at `origin`.
    Entity { origin: Vec3 },
}

impl Variant {
    pub fn kind(&self) -> ObjectKind {
        match self {
            Variant::Root => ObjectKind::Root,
            Variant::Group => ObjectKind::Group,
            Variant::Solid => ObjectKind::Solid,
            Variant::Entity { .. } => ObjectKind::Entity,
        }
    }

    pub fn entity(origin: Vec3) -> Self {
        Variant::Entity { origin }
    }
}

#[derive(Clone, Copy, Debug)]
enum BoundsCache {
    Stale,
    Fresh(Option<Aabb>),
}

/// A node of the map tree.
///
/// Objects reference their parent and children by [`ObjectId`]; the
/// [`MapTree`](crate::MapTree) arena owns every live object. Structural
/// fields are therefore only writable through the tree.
#[derive(Clone, Debug)]
pub struct MapObject {
    id: ObjectId,
    variant: Variant,
    parent: Option<ObjectId>,
    children: Vec<ObjectId>,
    data: DataStore,
    bounds: Cell<BoundsCache>,
}

impl MapObject {
    /// Build a detached object with a known ID.
    ///
    /// Fresh objects should normally come from
    /// [`MapTree::new_object`](crate::MapTree::new_object), which allocates
    /// the ID.
    pub fn new(id: ObjectId, variant: Variant) -> Self {
        Self {
            id,
            variant,
            parent: None,
            children: Vec::new(),
            data: DataStore::new(),
            bounds: Cell::new(BoundsCache::Stale),
        }
    }

    pub fn with_data(mut self, data: impl Into<MapObjectData>) -> Self {
        self.data.set(data.into());
        self
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub fn kind(&self) -> ObjectKind {
        self.variant.kind()
    }

    pub fn variant(&self) -> &Variant {
        &self.variant
    }

    pub fn parent(&self) -> Option<ObjectId> {
        self.parent
    }

    /// Children in z/paint order.
    pub fn children(&self) -> &[ObjectId] {
        &self.children
    }

    pub fn data(&self) -> &DataStore {
        &self.data
    }

    /// Mutable attached data.
    ///
    /// Callers editing data of a live object must report the change with
    /// [`MapTree::object_changed`](crate::MapTree::object_changed).
    pub fn data_mut(&mut self) -> &mut DataStore {
        &mut self.data
    }

    pub fn color(&self) -> Option<&ObjectColor> {
        self.data.get_one()
    }

    pub fn faces(&self) -> impl Iterator<Item = &Face> + '_ {
        self.data.get::<Face>()
    }

    pub fn entity_data(&self) -> Option<&EntityData> {
        self.data.get_one()
    }

    pub fn visgroups(&self) -> impl Iterator<Item = u32> + '_ {
        self.data.get::<VisgroupMembership>().map(|v| v.0)
    }

    pub fn is_selected(&self) -> bool {
        self.data.contains(Selected::KIND)
    }

    pub fn is_hidden(&self) -> bool {
        self.data.contains(Hidden::KIND)
    }

    pub fn origin(&self) -> Option<Vec3> {
        match self.variant {
            Variant::Entity { origin } => Some(origin),
            _ => None,
        }
    }

    /// Move an entity. Returns the previous origin, or `None` if this is not
    /// an entity.
    pub fn set_origin(&mut self, origin: Vec3) -> Option<Vec3> {
        match &mut self.variant {
            Variant::Entity { origin: current } => Some(std::mem::replace(current, origin)),
            _ => None,
        }
    }

    /// Solids and entities are the units a renderer draws.
    pub fn is_primitive(&self) -> bool {
        matches!(self.kind(), ObjectKind::Solid | ObjectKind::Entity)
    }

    /// Apply `matrix` to this object's own geometry. Children are untouched.
    pub fn transform(&mut self, matrix: &Affine3A) {
        match &mut self.variant {
            Variant::Entity { origin } => *origin = matrix.transform_point3(*origin),
            Variant::Solid => {
                for face in self.data.get_mut::<Face>() {
                    face.transform(matrix);
                }
            }
            Variant::Root | Variant::Group => {}
        }
    }

    /// Bounds of the object's own geometry, ignoring children.
    pub fn own_bounds(&self) -> Option<Aabb> {
        match &self.variant {
            Variant::Solid => self
                .faces()
                .filter_map(Face::bounds)
                .reduce(Aabb::union),
            Variant::Entity { origin } => Some(Aabb::around(*origin, POINT_ENTITY_HALF_EXTENT)),
            Variant::Root | Variant::Group => None,
        }
    }

    pub(crate) fn set_parent(&mut self, parent: Option<ObjectId>) {
        self.parent = parent;
    }

    pub(crate) fn children_mut(&mut self) -> &mut Vec<ObjectId> {
        &mut self.children
    }

    pub(crate) fn set_variant(&mut self, variant: Variant) {
        self.variant = variant;
    }

    pub(crate) fn set_data(&mut self, data: DataStore) {
        self.data = data;
    }

    pub(crate) fn cached_bounds(&self) -> Option<Option<Aabb>> {
        match self.bounds.get() {
            BoundsCache::Stale => None,
            BoundsCache::Fresh(b) => Some(b),
        }
    }

    pub(crate) fn store_bounds(&self, bounds: Option<Aabb>) {
        self.bounds.set(BoundsCache::Fresh(bounds));
    }

    /// Drop the cached aggregate. Returns whether it was fresh.
    pub(crate) fn invalidate_bounds(&self) -> bool {
        matches!(self.bounds.replace(BoundsCache::Stale), BoundsCache::Fresh(_))
    }
}

/// Structural equality: identity, variant, links, child order and data.
/// Cached aggregates are ignored.
impl PartialEq for MapObject {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.variant == other.variant
            && self.parent == other.parent
            && self.children == other.children
            && self.data == other.data
    }
}
