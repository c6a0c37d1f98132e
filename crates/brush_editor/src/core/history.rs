//! Undo/redo history with transaction support.
//!
//! Every successful top-level operation becomes a [`HistoryEntry`]. The
//! history keeps a single cursor: entries before it are applied, entries
//! after it form the redo tail, which is discarded when a new entry is
//! added. Several operations can be grouped into one entry with
//! [`HistoryManager::begin_transaction`].

use brush_map::MapTree;
use thiserror::Error;

use crate::operations::{Operation, OperationError, OperationState, Transaction};

/// Errors raised by history navigation.
#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("nothing to undo")]
    NothingToUndo,

    #[error("nothing to redo")]
    NothingToRedo,

    #[error("transaction \"{0}\" is still open")]
    TransactionOpen(String),

    #[error("no transaction is open")]
    NoTransaction,

    #[error("history operation failed")]
    Operation(#[from] OperationError),
}

pub type HistoryResult<T> = Result<T, HistoryError>;

/// A named, applied operation.
#[derive(Debug)]
pub struct HistoryEntry {
    name: String,
    operation: Box<dyn Operation>,
}

impl HistoryEntry {
    pub fn new(name: impl Into<String>, operation: Box<dyn Operation>) -> Self {
        Self {
            name: name.into(),
            operation,
        }
    }

    /// The name shown in the undo/redo menu.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn operation(&self) -> &dyn Operation {
        self.operation.as_ref()
    }
}

struct OpenTransaction {
    name: String,
    operations: Vec<Box<dyn Operation>>,
}

/// Undo/redo history of one document.
pub struct HistoryManager {
    entries: Vec<HistoryEntry>,
    /// Number of applied entries; the next undo reverses `entries[position - 1]`.
    position: usize,
    /// Maximum number of entries kept (0 = unlimited).
    limit: usize,
    actions_since_checkpoint: usize,
    open: Option<OpenTransaction>,
}

impl Default for HistoryManager {
    fn default() -> Self {
        Self::new()
    }
}

impl HistoryManager {
    /// Default maximum history size.
    pub const DEFAULT_LIMIT: usize = 100;

    pub fn new() -> Self {
        Self::with_limit(Self::DEFAULT_LIMIT)
    }

    pub fn with_limit(limit: usize) -> Self {
        Self {
            entries: Vec::new(),
            position: 0,
            limit,
            actions_since_checkpoint: 0,
            open: None,
        }
    }

    /// Record an operation that has just been performed.
    ///
    /// Truncates the redo tail, appends and advances. While a transaction is
    /// open the operation joins it instead and no entry is created yet.
    pub fn add_history_item(&mut self, entry: HistoryEntry) {
        debug_assert_eq!(entry.operation.state(), OperationState::Applied);
        if let Some(open) = &mut self.open {
            log::debug!("Adding {} to transaction {}", entry.name, open.name);
            open.operations.push(entry.operation);
            return;
        }

        self.entries.truncate(self.position);
        self.entries.push(entry);
        self.position += 1;
        self.actions_since_checkpoint += 1;

        if self.limit > 0 {
            while self.entries.len() > self.limit {
                self.entries.remove(0);
                self.position -= 1;
            }
        }
    }

    /// Reverse the entry at the cursor and step back. Returns its name.
    ///
    /// If the operation fails the cursor stays where it was.
    pub fn undo(&mut self, map: &mut MapTree) -> HistoryResult<&str> {
        self.require_closed()?;
        if self.position == 0 {
            return Err(HistoryError::NothingToUndo);
        }
        let index = self.position - 1;
        self.entries[index].operation.reverse(map)?;
        self.position = index;
        self.actions_since_checkpoint += 1;
        Ok(&self.entries[index].name)
    }

    /// Re-perform the entry after the cursor and advance. Returns its name.
    pub fn redo(&mut self, map: &mut MapTree) -> HistoryResult<&str> {
        self.require_closed()?;
        let index = self.position;
        let entry = self.entries.get_mut(index).ok_or(HistoryError::NothingToRedo)?;
        entry.operation.perform(map)?;
        self.position = index + 1;
        self.actions_since_checkpoint += 1;
        Ok(&self.entries[index].name)
    }

    fn require_closed(&self) -> HistoryResult<()> {
        match &self.open {
            Some(open) => Err(HistoryError::TransactionOpen(open.name.clone())),
            None => Ok(()),
        }
    }

    /// Begin grouping operations into one entry named `name`.
    pub fn begin_transaction(&mut self, name: impl Into<String>) -> HistoryResult<()> {
        self.require_closed()?;
        self.open = Some(OpenTransaction {
            name: name.into(),
            operations: Vec::new(),
        });
        Ok(())
    }

    /// Close the open transaction, adding it as a single entry.
    ///
    /// Returns whether an entry was added (empty transactions add none).
    pub fn commit_transaction(&mut self) -> HistoryResult<bool> {
        let open = self.open.take().ok_or(HistoryError::NoTransaction)?;
        if open.operations.is_empty() {
            return Ok(false);
        }
        let transaction = Transaction::applied(open.name.clone(), open.operations);
        self.add_history_item(HistoryEntry::new(open.name, Box::new(transaction)));
        Ok(true)
    }

    /// Reverse everything performed since `begin_transaction` and drop it.
    ///
    /// If a step cannot be reversed, the steps after it are performed again
    /// and the transaction stays open.
    pub fn rollback_transaction(&mut self, map: &mut MapTree) -> HistoryResult<()> {
        let open = self.open.take().ok_or(HistoryError::NoTransaction)?;
        let name = open.name.clone();
        let mut transaction = Transaction::applied(open.name, open.operations);
        if let Err(err) = transaction.reverse(map) {
            let operations = transaction.into_operations();
            if operations.iter().all(|op| op.state() == OperationState::Applied) {
                self.open = Some(OpenTransaction { name, operations });
            } else {
                log::error!("Transaction {name} left partially reversed");
            }
            return Err(err.into());
        }
        Ok(())
    }

    pub fn in_transaction(&self) -> bool {
        self.open.is_some()
    }

    /// Reset the "changed since last save" counter.
    pub fn checkpoint(&mut self) {
        self.actions_since_checkpoint = 0;
    }

    /// Entries added, undone or redone since the last checkpoint.
    pub fn actions_since_checkpoint(&self) -> usize {
        self.actions_since_checkpoint
    }

    pub fn can_undo(&self) -> bool {
        self.position > 0
    }

    pub fn can_redo(&self) -> bool {
        self.position < self.entries.len()
    }

    /// Name of the entry the next undo would reverse.
    pub fn undo_name(&self) -> Option<&str> {
        self.position.checked_sub(1).map(|i| self.entries[i].name())
    }

    /// Name of the entry the next redo would perform.
    pub fn redo_name(&self) -> Option<&str> {
        self.entries.get(self.position).map(HistoryEntry::name)
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Clear all history.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.position = 0;
        self.open = None;
        self.actions_since_checkpoint = 0;
    }
}
