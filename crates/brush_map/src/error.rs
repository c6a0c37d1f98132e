//! Error types for the map object tree

use thiserror::Error;

use crate::id::ObjectId;
use crate::object::ObjectKind;

/// Violations of the tree's structural invariants.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StructuralViolation {
    #[error("attaching {child} under {parent} would create a cycle")]
    CycleDetected { parent: ObjectId, child: ObjectId },

    #[error("object {0} is already part of the map")]
    DuplicateId(ObjectId),

    #[error("the root object cannot be moved, removed or re-created")]
    RootMutation,

    #[error("{child} is not a child of {parent}")]
    NotAChild { parent: ObjectId, child: ObjectId },

    #[error("object {0} carries children that are not part of the map")]
    UnattachedChildren(ObjectId),
}

/// Errors raised by [`MapTree`](crate::MapTree) operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MapError {
    #[error("structural violation: {0}")]
    StructuralViolation(#[from] StructuralViolation),

    #[error("cannot unclone a {found} snapshot into a {expected}")]
    TypeKindMismatch { expected: ObjectKind, found: ObjectKind },

    #[error("object not found: {0}")]
    ObjectNotFound(ObjectId),
}

/// Result type for map operations
pub type MapResult<T> = Result<T, MapError>;
