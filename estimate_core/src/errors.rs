//! # Error Types
//!
//! Structured error types for estimate_core. Input coercion is never an
//! error here: partial or garbled numeric input becomes zero so the editing
//! surface always renders. What remains are driver mistakes (unknown field
//! names, bad indices), blocked transitions and collaborator failures.
//!
//! ## Example
//!
//! ```rust
//! use estimate_core::errors::{EstimateError, EstimateResult};
//!
//! fn position(ids: &[&str], id: &str) -> EstimateResult<usize> {
//!     ids.iter()
//!         .position(|candidate| *candidate == id)
//!         .ok_or_else(|| EstimateError::not_found(id))
//! }
//!
//! assert_eq!(position(&["a", "b"], "b").unwrap(), 1);
//! assert_eq!(position(&["a"], "z").unwrap_err().error_code(), "NOT_FOUND");
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for estimate_core operations
pub type EstimateResult<T> = Result<T, EstimateError>;

/// Reasons a draft cannot be saved yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SaveBlocker {
    /// `client_name` is empty or whitespace
    MissingClientName,
    /// The draft has no line items
    NoLineItems,
}

impl SaveBlocker {
    /// Human-readable explanation, suitable for a disabled save button tooltip
    pub fn describe(&self) -> &'static str {
        match self {
            SaveBlocker::MissingClientName => "client name is required",
            SaveBlocker::NoLineItems => "add at least one line item",
        }
    }
}

/// Structured error type for estimate operations.
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "details")]
pub enum EstimateError {
    /// An input value is invalid (unknown field name, unknown unit label, bad date)
    #[error("Invalid input for '{field}': {value} - {reason}")]
    InvalidInput {
        field: String,
        value: String,
        reason: String,
    },

    /// A positional line item reference no longer points at an item
    #[error("Line item index {index} is out of range (draft has {len} items)")]
    IndexOutOfRange { index: usize, len: usize },

    /// A line item key does not belong to the active draft
    #[error("Line item not found in draft: {key}")]
    ItemNotFound { key: String },

    /// A draft operation was issued while no draft is open
    #[error("No estimate draft is open")]
    NoActiveDraft,

    /// Save preconditions are not met; the store was not contacted
    #[error("Cannot save estimate: {}", describe_blockers(.blockers))]
    SaveBlocked { blockers: Vec<SaveBlocker> },

    /// Delete was attempted without a matching confirmation
    #[error("Deletion of estimate {id} was not confirmed")]
    DeleteNotConfirmed { id: String },

    /// The storage collaborator has no estimate with this id
    #[error("Estimate not found: {id}")]
    NotFound { id: String },

    /// The remote estimate API failed or was unreachable
    #[error("Remote error{}: {message}", .status.map(|s| format!(" ({})", s)).unwrap_or_default())]
    Remote { status: Option<u16>, message: String },

    /// File I/O error
    #[error("File error: {operation} on '{path}' - {reason}")]
    FileError {
        operation: String,
        path: String,
        reason: String,
    },

    /// File is locked by another user/process
    #[error("File locked: '{path}' is locked by {locked_by} since {locked_at}")]
    FileLocked {
        path: String,
        locked_by: String,
        locked_at: String,
    },

    /// JSON/TOML serialization or deserialization error
    #[error("Serialization error: {reason}")]
    SerializationError { reason: String },

    /// Schema version mismatch
    #[error("Version mismatch: file version {file_version}, expected {expected_version}")]
    VersionMismatch {
        file_version: String,
        expected_version: String,
    },

    /// Document rendering failed
    #[error("Render failed: {reason}")]
    RenderFailed { reason: String },

    /// Generic internal error (should be rare)
    #[error("Internal error: {message}")]
    Internal { message: String },
}

fn describe_blockers(blockers: &[SaveBlocker]) -> String {
    blockers
        .iter()
        .map(SaveBlocker::describe)
        .collect::<Vec<_>>()
        .join(", ")
}

impl EstimateError {
    /// Create an InvalidInput error
    pub fn invalid_input(field: impl Into<String>, value: impl Into<String>, reason: impl Into<String>) -> Self {
        EstimateError::InvalidInput {
            field: field.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// Create a NotFound error
    pub fn not_found(id: impl Into<String>) -> Self {
        EstimateError::NotFound { id: id.into() }
    }

    /// Create a Remote error
    pub fn remote(status: Option<u16>, message: impl Into<String>) -> Self {
        EstimateError::Remote {
            status,
            message: message.into(),
        }
    }

    /// Create a FileError
    pub fn file_error(operation: impl Into<String>, path: impl Into<String>, reason: impl Into<String>) -> Self {
        EstimateError::FileError {
            operation: operation.into(),
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a FileLocked error
    pub fn file_locked(path: impl Into<String>, locked_by: impl Into<String>, locked_at: impl Into<String>) -> Self {
        EstimateError::FileLocked {
            path: path.into(),
            locked_by: locked_by.into(),
            locked_at: locked_at.into(),
        }
    }

    /// Create a SerializationError from anything displayable
    pub fn serialization(reason: impl ToString) -> Self {
        EstimateError::SerializationError {
            reason: reason.to_string(),
        }
    }

    /// Create a RenderFailed error
    pub fn render_failed(reason: impl Into<String>) -> Self {
        EstimateError::RenderFailed {
            reason: reason.into(),
        }
    }

    /// Check if this is a recoverable error (e.g., can retry)
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            EstimateError::FileLocked { .. } | EstimateError::Remote { status: None, .. }
        )
    }

    /// Get a short error code for programmatic handling
    pub fn error_code(&self) -> &'static str {
        match self {
            EstimateError::InvalidInput { .. } => "INVALID_INPUT",
            EstimateError::IndexOutOfRange { .. } => "INDEX_OUT_OF_RANGE",
            EstimateError::ItemNotFound { .. } => "ITEM_NOT_FOUND",
            EstimateError::NoActiveDraft => "NO_ACTIVE_DRAFT",
            EstimateError::SaveBlocked { .. } => "SAVE_BLOCKED",
            EstimateError::DeleteNotConfirmed { .. } => "DELETE_NOT_CONFIRMED",
            EstimateError::NotFound { .. } => "NOT_FOUND",
            EstimateError::Remote { .. } => "REMOTE_ERROR",
            EstimateError::FileError { .. } => "FILE_ERROR",
            EstimateError::FileLocked { .. } => "FILE_LOCKED",
            EstimateError::SerializationError { .. } => "SERIALIZATION_ERROR",
            EstimateError::VersionMismatch { .. } => "VERSION_MISMATCH",
            EstimateError::RenderFailed { .. } => "RENDER_FAILED",
            EstimateError::Internal { .. } => "INTERNAL_ERROR",
        }
    }
}
