//! # brush_map - Map Document Model
//!
//! The composite scene tree edited by the Brushwork level editor.
//!
//! ## Overview
//!
//! - [`MapObject`]: a node of the tree, one of Root, Group, Solid or Entity.
//! - [`DataStore`]: typed attached data (color, faces, entity properties,
//!   selection, visibility) with per-kind cardinality.
//! - [`MapTree`]: the arena that owns every object and maintains the
//!   parent/child relation, depth-first traversal, lazy bounds and change
//!   tracking for renderers.
//! - [`ObjectSnapshot`] / [`Subtree`]: clone/unclone support for undo.
//!
//! Geometry types (`Vec3`, `Affine3A`) come from `glam`.
//!
//! ```
//! use brush_map::{MapTree, Variant};
//! use glam::Vec3;
//!
//! let mut map = MapTree::new();
//! let root = map.root();
//! let light = map.new_object(Variant::entity(Vec3::new(0.0, 0.0, 64.0)));
//! let light = map.insert(root, light, None).unwrap();
//!
//! assert_eq!(map.find_all().count(), 2);
//! assert_eq!(map.primitives(root).next().map(|p| p.id()), Some(light));
//! ```

pub mod bounds;
pub mod data;
pub mod error;
pub mod id;
pub mod object;
pub mod snapshot;
pub mod tree;

pub use bounds::Aabb;
pub use data::{
    AttachedData, Cardinality, DataKind, DataStore, EntityData, Face, Hidden, MapObjectData,
    ObjectColor, Plane, Selected, VisgroupMembership,
};
pub use error::{MapError, MapResult, StructuralViolation};
pub use id::{IdGenerator, ObjectId};
pub use object::{MapObject, ObjectKind, Variant, POINT_ENTITY_HALF_EXTENT};
pub use snapshot::{ObjectSnapshot, Subtree};
pub use tree::{FindAll, MapTree, Primitive};

pub use glam;
