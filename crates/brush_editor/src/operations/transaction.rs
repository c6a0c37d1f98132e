//! Composite operations.

use brush_map::MapTree;

use super::{error_chain, Operation, OperationError, OperationResult, OperationState};

/// A group of operations performed as a single unit.
///
/// Steps are performed in the order they were added and reversed in strict
/// reverse order. If a step fails, the steps already done are undone again
/// (newest first) before the error is returned, so a failed transaction
/// leaves the map as it found it.
pub struct Transaction {
    description: String,
    operations: Vec<Box<dyn Operation>>,
    state: OperationState,
}

impl Transaction {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            operations: Vec::new(),
            state: OperationState::Unapplied,
        }
    }

    /// Wrap operations that have already been performed.
    pub(crate) fn applied(description: impl Into<String>, operations: Vec<Box<dyn Operation>>) -> Self {
        debug_assert!(operations.iter().all(|op| op.state() == OperationState::Applied));
        Self {
            description: description.into(),
            operations,
            state: OperationState::Applied,
        }
    }

    pub fn push(&mut self, operation: impl Operation + 'static) {
        self.push_boxed(Box::new(operation));
    }

    pub fn push_boxed(&mut self, operation: Box<dyn Operation>) {
        debug_assert_eq!(self.state, OperationState::Unapplied);
        self.operations.push(operation);
    }

    pub fn with(mut self, operation: impl Operation + 'static) -> Self {
        self.push(operation);
        self
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    pub fn operations(&self) -> &[Box<dyn Operation>] {
        &self.operations
    }

    pub(crate) fn into_operations(self) -> Vec<Box<dyn Operation>> {
        self.operations
    }
}

impl Operation for Transaction {
    fn description(&self) -> &str {
        &self.description
    }

    fn state(&self) -> OperationState {
        self.state
    }

    fn perform(&mut self, map: &mut MapTree) -> OperationResult {
        self.state.require(OperationState::Unapplied)?;
        for index in 0..self.operations.len() {
            if let Err(err) = self.operations[index].perform(map) {
                let description = self.operations[index].description().to_string();
                log::debug!("Rolling back {} after step {index} failed", self.description);
                for (undo_index, op) in self.operations[..index].iter_mut().enumerate().rev() {
                    op.reverse(map).map_err(|source| {
                        log::error!("Rollback of {} failed: {}", self.description, error_chain(&source));
                        OperationError::RollbackFailed {
                            index: undo_index,
                            source: Box::new(source),
                        }
                    })?;
                }
                return Err(OperationError::RolledBack {
                    index,
                    description,
                    source: Box::new(err),
                });
            }
        }
        self.state = OperationState::Applied;
        Ok(())
    }

    fn reverse(&mut self, map: &mut MapTree) -> OperationResult {
        self.state.require(OperationState::Applied)?;
        for index in (0..self.operations.len()).rev() {
            if let Err(err) = self.operations[index].reverse(map) {
                let description = self.operations[index].description().to_string();
                for (redo_index, op) in self.operations.iter_mut().enumerate().skip(index + 1) {
                    op.perform(map).map_err(|source| OperationError::RollbackFailed {
                        index: redo_index,
                        source: Box::new(source),
                    })?;
                }
                return Err(OperationError::RolledBack {
                    index,
                    description,
                    source: Box::new(err),
                });
            }
        }
        self.state = OperationState::Unapplied;
        Ok(())
    }
}
