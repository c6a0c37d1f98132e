//! Operation trait, state machine and error types.

use std::fmt;

use brush_map::{MapError, MapTree, ObjectId};
use thiserror::Error;

/// Result type for operation execution.
pub type OperationResult<T = ()> = Result<T, OperationError>;

/// Whether an operation's effect is currently present in the map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OperationState {
    /// Built, or reversed; `perform` is the only valid call.
    #[default]
    Unapplied,
    /// Performed; `reverse` is the only valid call.
    Applied,
}

impl OperationState {
    /// Fail unless the operation is in `expected`.
    pub fn require(self, expected: OperationState) -> OperationResult {
        if self == expected {
            Ok(())
        } else {
            Err(OperationError::InvalidState {
                expected,
                found: self,
            })
        }
    }
}

impl fmt::Display for OperationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationState::Unapplied => f.write_str("unapplied"),
            OperationState::Applied => f.write_str("applied"),
        }
    }
}

/// Errors that can occur while performing or reversing an operation.
#[derive(Debug, Error)]
pub enum OperationError {
    #[error(transparent)]
    Map(#[from] MapError),

    #[error("operation is {found}, expected {expected}")]
    InvalidState {
        expected: OperationState,
        found: OperationState,
    },

    #[error("object {0} is not attached to the map")]
    NotAttached(ObjectId),

    #[error("step {index} ({description}) failed; earlier steps were rolled back")]
    RolledBack {
        index: usize,
        description: String,
        #[source]
        source: Box<OperationError>,
    },

    #[error("rolling back step {index} failed; the map may be partially modified")]
    RollbackFailed {
        index: usize,
        #[source]
        source: Box<OperationError>,
    },
}

/// A reversible, self-contained mutation of the map tree.
///
/// Operations start [`Unapplied`](OperationState::Unapplied). `perform`
/// moves them to [`Applied`](OperationState::Applied) and `reverse` back;
/// calling either out of turn fails with [`OperationError::InvalidState`]
/// without touching the map. Primitive operations validate everything they
/// need before the first mutation, so a failed call leaves the map as it
/// was.
///
/// Operations receive the tree only, never the document, so they cannot
/// start another top-level dispatch from inside `perform`. Composite
/// nesting goes through [`Transaction`](super::Transaction).
pub trait Operation: Send {
    /// Short description, used for logging and default history names.
    fn description(&self) -> &str;

    fn state(&self) -> OperationState;

    /// Apply the operation.
    fn perform(&mut self, map: &mut MapTree) -> OperationResult;

    /// Undo a previous `perform`.
    fn reverse(&mut self, map: &mut MapTree) -> OperationResult;
}

impl fmt::Debug for dyn Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Operation")
            .field("description", &self.description())
            .field("state", &self.state())
            .finish()
    }
}

/// Render an error and its `source()` chain, one cause per line.
pub fn error_chain(err: &dyn std::error::Error) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        out.push_str("\n  caused by: ");
        out.push_str(&cause.to_string());
        source = cause.source();
    }
    out
}
