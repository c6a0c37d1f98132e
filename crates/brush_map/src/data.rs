//! Attached data: typed side information keyed by kind.
//!
//! Every [`MapObject`](crate::MapObject) owns a [`DataStore`]. The store maps
//! a [`DataKind`] to either exactly one payload (last write wins) or an
//! ordered collection of payloads. The cardinality of each kind is part of
//! the schema ([`DataKind::cardinality`]) rather than something discovered
//! at runtime.
//!
//! Typed access goes through the [`AttachedData`] trait:
//!
//! ```
//! use brush_map::{DataStore, ObjectColor};
//!
//! let mut store = DataStore::new();
//! store.insert(ObjectColor::new(255, 0, 0));
//! store.insert(ObjectColor::new(0, 255, 0));
//! assert_eq!(store.get_one::<ObjectColor>(), Some(&ObjectColor::new(0, 255, 0)));
//! ```

use std::collections::BTreeMap;

use glam::{Affine3A, Vec3};
use serde::{Deserialize, Serialize};

use crate::bounds::Aabb;

/// The kind of an attached data payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DataKind {
    Color,
    EntityData,
    Selection,
    Hidden,
    Visgroup,
    Face,
}

/// How many payloads of a kind an object may carry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Cardinality {
    One,
    Many,
}

impl DataKind {
    pub const ALL: [DataKind; 6] = [
        DataKind::Color,
        DataKind::EntityData,
        DataKind::Selection,
        DataKind::Hidden,
        DataKind::Visgroup,
        DataKind::Face,
    ];

    pub const fn cardinality(self) -> Cardinality {
        match self {
            DataKind::Color | DataKind::EntityData | DataKind::Selection | DataKind::Hidden => {
                Cardinality::One
            }
            DataKind::Visgroup | DataKind::Face => Cardinality::Many,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            DataKind::Color => "Color",
            DataKind::EntityData => "EntityData",
            DataKind::Selection => "Selection",
            DataKind::Hidden => "Hidden",
            DataKind::Visgroup => "Visgroup",
            DataKind::Face => "Face",
        }
    }
}

/// Display color of an object.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl ObjectColor {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

impl Default for ObjectColor {
    fn default() -> Self {
        Self::new(204, 204, 204)
    }
}

/// Game-specific class and key/value properties of an entity.
///
/// Properties keep their insertion order since that is the order the map
/// file and the property editor show them in.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityData {
    pub class_name: String,
    #[serde(default)]
    pub properties: Vec<(String, String)>,
    #[serde(default)]
    pub flags: u32,
}

impl EntityData {
    pub fn new(class_name: impl Into<String>) -> Self {
        Self {
            class_name: class_name.into(),
            ..Default::default()
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    /// Case-insensitive property lookup.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.properties
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    /// Set a property, returning the previous value.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        let key = key.into();
        let value = value.into();
        match self.properties.iter_mut().find(|(k, _)| k.eq_ignore_ascii_case(&key)) {
            Some((_, v)) => Some(std::mem::replace(v, value)),
            None => {
                self.properties.push((key, value));
                None
            }
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        let idx = self.properties.iter().position(|(k, _)| k.eq_ignore_ascii_case(key))?;
        Some(self.properties.remove(idx).1)
    }
}

/// Marker: the object is part of the current selection.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selected;

/// Marker: the object is hidden in the viewports.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hidden;

/// Membership of a visibility group.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VisgroupMembership(pub u32);

/// A plane in `normal . p = distance` form.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Plane {
    pub normal: Vec3,
    pub distance: f32,
}

impl Plane {
    /// Plane through three points wound clockwise when viewed from the front.
    /// Returns `None` for collinear points.
    pub fn from_points(a: Vec3, b: Vec3, c: Vec3) -> Option<Self> {
        let normal = (c - a).cross(b - a).try_normalize()?;
        Some(Self {
            normal,
            distance: normal.dot(a),
        })
    }

    pub fn point_on_plane(&self) -> Vec3 {
        self.normal * self.distance
    }

    /// Signed distance from the plane to `point`.
    pub fn distance_to(&self, point: Vec3) -> f32 {
        self.normal.dot(point) - self.distance
    }

    pub fn transformed(&self, matrix: &Affine3A) -> Self {
        let point = matrix.transform_point3(self.point_on_plane());
        let normal = matrix
            .matrix3
            .inverse()
            .transpose()
            .mul_vec3(self.normal)
            .try_normalize()
            .unwrap_or(self.normal);
        Self {
            normal,
            distance: normal.dot(point),
        }
    }
}

/// One face of a solid.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Face {
    pub plane: Plane,
    pub texture: String,
    pub vertices: Vec<Vec3>,
}

impl Face {
    /// Build a face from a polygon; the plane is derived from the first three
    /// vertices.
    pub fn from_polygon(texture: impl Into<String>, vertices: Vec<Vec3>) -> Option<Self> {
        let plane = match vertices.as_slice() {
            [a, b, c, ..] => Plane::from_points(*a, *b, *c)?,
            _ => return None,
        };
        Some(Self {
            plane,
            texture: texture.into(),
            vertices,
        })
    }

    pub fn transform(&mut self, matrix: &Affine3A) {
        for v in &mut self.vertices {
            *v = matrix.transform_point3(*v);
        }
        self.plane = match self.vertices.as_slice() {
            [a, b, c, ..] => Plane::from_points(*a, *b, *c).unwrap_or_else(|| self.plane.transformed(matrix)),
            _ => self.plane.transformed(matrix),
        };
    }

    pub fn bounds(&self) -> Option<Aabb> {
        Aabb::from_points(self.vertices.iter().copied())
    }
}

/// A single attached data payload.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum MapObjectData {
    Color(ObjectColor),
    EntityData(EntityData),
    Selected(Selected),
    Hidden(Hidden),
    Visgroup(VisgroupMembership),
    Face(Face),
}

impl MapObjectData {
    pub fn kind(&self) -> DataKind {
        match self {
            MapObjectData::Color(_) => DataKind::Color,
            MapObjectData::EntityData(_) => DataKind::EntityData,
            MapObjectData::Selected(_) => DataKind::Selection,
            MapObjectData::Hidden(_) => DataKind::Hidden,
            MapObjectData::Visgroup(_) => DataKind::Visgroup,
            MapObjectData::Face(_) => DataKind::Face,
        }
    }
}

/// Typed view of one [`MapObjectData`] variant.
pub trait AttachedData: Sized {
    const KIND: DataKind;

    fn from_data(data: &MapObjectData) -> Option<&Self>;
    fn from_data_mut(data: &mut MapObjectData) -> Option<&mut Self>;
    fn try_from_data(data: MapObjectData) -> Result<Self, MapObjectData>;
    fn into_data(self) -> MapObjectData;
}

macro_rules! attached_data {
    ($ty:ty, $variant:ident, $kind:ident) => {
        impl AttachedData for $ty {
            const KIND: DataKind = DataKind::$kind;

            fn from_data(data: &MapObjectData) -> Option<&Self> {
                match data {
                    MapObjectData::$variant(v) => Some(v),
                    _ => None,
                }
            }

            fn from_data_mut(data: &mut MapObjectData) -> Option<&mut Self> {
                match data {
                    MapObjectData::$variant(v) => Some(v),
                    _ => None,
                }
            }

            fn try_from_data(data: MapObjectData) -> Result<Self, MapObjectData> {
                match data {
                    MapObjectData::$variant(v) => Ok(v),
                    other => Err(other),
                }
            }

            fn into_data(self) -> MapObjectData {
                MapObjectData::$variant(self)
            }
        }

        impl From<$ty> for MapObjectData {
            fn from(value: $ty) -> Self {
                value.into_data()
            }
        }
    };
}

attached_data!(ObjectColor, Color, Color);
attached_data!(EntityData, EntityData, EntityData);
attached_data!(Selected, Selected, Selection);
attached_data!(Hidden, Hidden, Hidden);
attached_data!(VisgroupMembership, Visgroup, Visgroup);
attached_data!(Face, Face, Face);

#[derive(Clone, Debug, PartialEq)]
enum Slot {
    One(MapObjectData),
    Many(Vec<MapObjectData>),
}

impl Slot {
    fn as_slice(&self) -> &[MapObjectData] {
        match self {
            Slot::One(d) => std::slice::from_ref(d),
            Slot::Many(v) => v,
        }
    }

    fn as_mut_slice(&mut self) -> &mut [MapObjectData] {
        match self {
            Slot::One(d) => std::slice::from_mut(d),
            Slot::Many(v) => v,
        }
    }

    fn into_vec(self) -> Vec<MapObjectData> {
        match self {
            Slot::One(d) => vec![d],
            Slot::Many(v) => v,
        }
    }
}

/// Per-object attached data.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<MapObjectData>", into = "Vec<MapObjectData>")]
pub struct DataStore {
    slots: BTreeMap<DataKind, Slot>,
}

impl DataStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a payload.
    ///
    /// For single-valued kinds the previous payload is replaced and returned;
    /// multi-valued kinds append and return `None`.
    pub fn set(&mut self, data: MapObjectData) -> Option<MapObjectData> {
        let kind = data.kind();
        match kind.cardinality() {
            Cardinality::One => match self.slots.insert(kind, Slot::One(data)) {
                Some(Slot::One(old)) => Some(old),
                Some(Slot::Many(mut old)) => old.pop(),
                None => None,
            },
            Cardinality::Many => {
                let mut items = self.slots.remove(&kind).map(Slot::into_vec).unwrap_or_default();
                items.push(data);
                self.slots.insert(kind, Slot::Many(items));
                None
            }
        }
    }

    /// Typed variant of [`set`](Self::set).
    pub fn insert<T: AttachedData>(&mut self, value: T) -> Option<T> {
        self.set(value.into_data()).and_then(|old| T::try_from_data(old).ok())
    }

    /// The payload of a single-valued kind (or the first of a multi-valued one).
    pub fn get_one<T: AttachedData>(&self) -> Option<&T> {
        self.slots
            .get(&T::KIND)
            .and_then(|s| s.as_slice().first())
            .and_then(T::from_data)
    }

    pub fn get_one_mut<T: AttachedData>(&mut self) -> Option<&mut T> {
        self.slots
            .get_mut(&T::KIND)
            .and_then(|s| s.as_mut_slice().first_mut())
            .and_then(T::from_data_mut)
    }

    /// All payloads of a kind, in insertion order.
    pub fn get<'a, T: AttachedData + 'a>(&'a self) -> impl Iterator<Item = &'a T> + 'a {
        self.kind(T::KIND).iter().filter_map(T::from_data)
    }

    pub fn get_mut<'a, T: AttachedData + 'a>(&'a mut self) -> impl Iterator<Item = &'a mut T> + 'a {
        self.slots
            .get_mut(&T::KIND)
            .map(|s| s.as_mut_slice())
            .unwrap_or_default()
            .iter_mut()
            .filter_map(T::from_data_mut)
    }

    /// Untyped payloads of a kind.
    pub fn kind(&self, kind: DataKind) -> &[MapObjectData] {
        self.slots.get(&kind).map(|s| s.as_slice()).unwrap_or_default()
    }

    pub fn contains(&self, kind: DataKind) -> bool {
        self.slots.contains_key(&kind)
    }

    /// Detach every payload of a kind, returning them in order.
    pub fn remove_kind(&mut self, kind: DataKind) -> Vec<MapObjectData> {
        self.slots.remove(&kind).map(Slot::into_vec).unwrap_or_default()
    }

    /// Detach the payloads of `T`'s kind matching `pred`.
    pub fn remove_where<T: AttachedData>(&mut self, mut pred: impl FnMut(&T) -> bool) -> Vec<MapObjectData> {
        let Some(slot) = self.slots.remove(&T::KIND) else {
            return Vec::new();
        };
        let (removed, kept): (Vec<_>, Vec<_>) = slot
            .into_vec()
            .into_iter()
            .partition(|d| T::from_data(d).is_some_and(&mut pred));
        self.replace_kind(T::KIND, kept);
        removed
    }

    /// Replace everything attached under `kind`.
    ///
    /// An empty `data` removes the kind. For single-valued kinds only the
    /// last payload is kept.
    pub fn replace_kind(&mut self, kind: DataKind, data: Vec<MapObjectData>) {
        debug_assert!(data.iter().all(|d| d.kind() == kind));
        self.slots.remove(&kind);
        for d in data {
            self.set(d);
        }
    }

    /// Every payload, grouped by kind.
    pub fn iter(&self) -> impl Iterator<Item = &MapObjectData> + '_ {
        self.slots.values().flat_map(|s| s.as_slice().iter())
    }

    pub fn len(&self) -> usize {
        self.slots.values().map(|s| s.as_slice().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn clear(&mut self) {
        self.slots.clear();
    }
}

impl From<Vec<MapObjectData>> for DataStore {
    fn from(data: Vec<MapObjectData>) -> Self {
        let mut store = DataStore::new();
        for d in data {
            store.set(d);
        }
        store
    }
}

impl From<DataStore> for Vec<MapObjectData> {
    fn from(store: DataStore) -> Self {
        store.slots.into_values().flat_map(Slot::into_vec).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(z: f32) -> Face {
        Face::from_polygon(
            "AAATRIGGER",
            vec![
                Vec3::new(0.0, 0.0, z),
                Vec3::new(0.0, 1.0, z),
                Vec3::new(1.0, 1.0, z),
                Vec3::new(1.0, 0.0, z),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_single_valued_last_write_wins() {
        let mut store = DataStore::new();
        assert!(store.insert(ObjectColor::new(1, 2, 3)).is_none());
        let old = store.insert(ObjectColor::new(4, 5, 6));

        assert_eq!(old, Some(ObjectColor::new(1, 2, 3)));
        assert_eq!(store.get::<ObjectColor>().count(), 1);
        assert_eq!(store.get_one::<ObjectColor>(), Some(&ObjectColor::new(4, 5, 6)));
    }

    #[test]
    fn test_multi_valued_appends_in_order() {
        let mut store = DataStore::new();
        store.insert(VisgroupMembership(3));
        store.insert(VisgroupMembership(1));

        let groups: Vec<_> = store.get::<VisgroupMembership>().map(|v| v.0).collect();
        assert_eq!(groups, vec![3, 1]);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_get_mut_edits_every_payload() {
        let mut store = DataStore::new();
        store.insert(VisgroupMembership(3));
        store.insert(VisgroupMembership(1));

        for membership in store.get_mut::<VisgroupMembership>() {
            membership.0 += 10;
        }
        let groups: Vec<u32> = store.get::<VisgroupMembership>().map(|v| v.0).collect();
        assert_eq!(groups, vec![13, 11]);
        assert_eq!(store.get_mut::<ObjectColor>().count(), 0);
    }

    #[test]
    fn test_remove_where() {
        let mut store = DataStore::new();
        store.insert(square(0.0));
        store.insert(square(1.0));
        store.insert(Selected);

        let removed = store.remove_where::<Face>(|f| f.plane.distance > 0.5);
        assert_eq!(removed.len(), 1);
        assert_eq!(store.get::<Face>().count(), 1);
        assert!(store.contains(DataKind::Selection));
    }

    #[test]
    fn test_replace_kind_with_nothing_removes_it() {
        let mut store = DataStore::new();
        store.insert(Hidden);
        store.replace_kind(DataKind::Hidden, Vec::new());
        assert!(!store.contains(DataKind::Hidden));
        assert!(store.is_empty());
    }

    #[test]
    fn test_entity_properties_are_case_insensitive() {
        let mut data = EntityData::new("light").with_property("Brightness", "255 255 255 200");
        assert_eq!(data.get("brightness"), Some("255 255 255 200"));
        assert_eq!(data.set("BRIGHTNESS", "0 0 0 0").as_deref(), Some("255 255 255 200"));
        assert_eq!(data.properties.len(), 1);
        assert!(data.remove("brightness").is_some());
    }

    #[test]
    fn test_face_transform_moves_plane() {
        let mut face = square(0.0);
        face.transform(&Affine3A::from_translation(Vec3::new(0.0, 0.0, 8.0)));

        assert!(face.vertices.iter().all(|v| v.z == 8.0));
        assert!(face.plane.distance_to(Vec3::new(0.5, 0.5, 8.0)).abs() < 1e-5);
    }
}
