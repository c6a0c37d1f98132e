//! Editor-level error type.

use thiserror::Error;

use crate::core::{AutosaveError, DocumentId, HistoryError};
use crate::operations::OperationError;
use crate::provider::ProviderError;

/// Errors surfaced to the editor shell. None of them are fatal to the
/// process; a provider error aborts at most the load of one document.
#[derive(Debug, Error)]
pub enum EditorError {
    #[error("operation failed")]
    Operation(#[from] OperationError),

    #[error(transparent)]
    History(#[from] HistoryError),

    #[error("provider failure")]
    Provider(#[from] ProviderError),

    #[error("autosave failed")]
    Autosave(#[from] AutosaveError),

    #[error("document has no file path")]
    NoFilePath,

    #[error("document not found: {0}")]
    DocumentNotFound(DocumentId),

    #[error("unknown command: {0}")]
    UnknownCommand(String),
}

/// Result type for editor operations
pub type EditorResult<T> = Result<T, EditorError>;
