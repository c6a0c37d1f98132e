//! Reversible map operations.
//!
//! Every change to a document's map goes through an [`Operation`]. The
//! primitive operations here each cover one kind of edit; [`Transaction`]
//! composes them into a single undoable unit.

mod data;
mod operation;
mod selection;
mod structure;
mod transaction;
mod transform;

pub use data::{AddData, RemoveData};
pub use operation::{error_chain, Operation, OperationError, OperationResult, OperationState};
pub use selection::{Deselect, Select};
pub use structure::{Attach, Detach, Reparent};
pub use transaction::Transaction;
pub use transform::{SetEntityOrigin, Transform};

use std::collections::HashSet;

use brush_map::{MapTree, ObjectId};

/// Check that every ID is live, dropping repeats.
fn require_objects(map: &MapTree, ids: &[ObjectId]) -> OperationResult<Vec<ObjectId>> {
    let mut seen = HashSet::with_capacity(ids.len());
    let mut out = Vec::with_capacity(ids.len());
    for &id in ids {
        map.object(id)?;
        if seen.insert(id) {
            out.push(id);
        }
    }
    Ok(out)
}

/// The IDs that are not descendants of another ID in the list.
///
/// Operations that act on whole subtrees use this so nested selections are
/// not handled twice.
pub(crate) fn topmost(map: &MapTree, ids: &[ObjectId]) -> OperationResult<Vec<ObjectId>> {
    let ids = require_objects(map, ids)?;
    let set: HashSet<ObjectId> = ids.iter().copied().collect();
    Ok(ids
        .into_iter()
        .filter(|&id| !map.ancestors(id).any(|a| set.contains(&a)))
        .collect())
}
