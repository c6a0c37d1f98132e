//! Attached-data edits.

use brush_map::{DataKind, MapObjectData, MapTree, ObjectId};

use super::{Operation, OperationResult, OperationState};

/// Replace everything attached under `kind` and return what was there.
fn swap_kind(map: &mut MapTree, id: ObjectId, kind: DataKind, data: Vec<MapObjectData>) -> OperationResult<Vec<MapObjectData>> {
    let store = map.object_mut(id)?.data_mut();
    let prior = store.remove_kind(kind);
    store.replace_kind(kind, data);
    map.object_changed(id);
    Ok(prior)
}

/// Attach a payload to an object.
///
/// Single-valued kinds are replaced, multi-valued kinds get the payload
/// appended. Reversing restores the full prior contents of the kind.
pub struct AddData {
    id: ObjectId,
    data: MapObjectData,
    prior: Vec<MapObjectData>,
    state: OperationState,
}

impl AddData {
    pub fn new(id: ObjectId, data: impl Into<MapObjectData>) -> Self {
        Self {
            id,
            data: data.into(),
            prior: Vec::new(),
            state: OperationState::Unapplied,
        }
    }
}

impl Operation for AddData {
    fn description(&self) -> &str {
        "Add Data"
    }

    fn state(&self) -> OperationState {
        self.state
    }

    fn perform(&mut self, map: &mut MapTree) -> OperationResult {
        self.state.require(OperationState::Unapplied)?;
        let kind = self.data.kind();
        let mut next = map.object(self.id)?.data().kind(kind).to_vec();
        next.push(self.data.clone());
        self.prior = swap_kind(map, self.id, kind, next)?;
        self.state = OperationState::Applied;
        Ok(())
    }

    fn reverse(&mut self, map: &mut MapTree) -> OperationResult {
        self.state.require(OperationState::Applied)?;
        swap_kind(map, self.id, self.data.kind(), std::mem::take(&mut self.prior))?;
        self.state = OperationState::Unapplied;
        Ok(())
    }
}

/// Detach payloads from an object: either a whole kind or the payloads equal
/// to a given value.
pub struct RemoveData {
    id: ObjectId,
    kind: DataKind,
    value: Option<MapObjectData>,
    prior: Vec<MapObjectData>,
    state: OperationState,
}

impl RemoveData {
    /// Remove everything of `kind`.
    pub fn kind(id: ObjectId, kind: DataKind) -> Self {
        Self {
            id,
            kind,
            value: None,
            prior: Vec::new(),
            state: OperationState::Unapplied,
        }
    }

    /// Remove the payloads equal to `value`.
    pub fn value(id: ObjectId, value: impl Into<MapObjectData>) -> Self {
        let value = value.into();
        Self {
            id,
            kind: value.kind(),
            value: Some(value),
            prior: Vec::new(),
            state: OperationState::Unapplied,
        }
    }
}

impl Operation for RemoveData {
    fn description(&self) -> &str {
        "Remove Data"
    }

    fn state(&self) -> OperationState {
        self.state
    }

    fn perform(&mut self, map: &mut MapTree) -> OperationResult {
        self.state.require(OperationState::Unapplied)?;
        let kept = match &self.value {
            Some(value) => map
                .object(self.id)?
                .data()
                .kind(self.kind)
                .iter()
                .filter(|d| *d != value)
                .cloned()
                .collect(),
            None => Vec::new(),
        };
        self.prior = swap_kind(map, self.id, self.kind, kept)?;
        self.state = OperationState::Applied;
        Ok(())
    }

    fn reverse(&mut self, map: &mut MapTree) -> OperationResult {
        self.state.require(OperationState::Applied)?;
        swap_kind(map, self.id, self.kind, std::mem::take(&mut self.prior))?;
        self.state = OperationState::Unapplied;
        Ok(())
    }
}
