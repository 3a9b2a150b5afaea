//! Error types for hierarchy operations

use thiserror::Error;
use uuid::Uuid;

/// Failures surfaced by the store, the cycle guard and the service layer.
#[derive(Error, Debug)]
pub enum HierarchyError {
    /// Id does not resolve to an existing folder
    #[error("Folder not found: {0}")]
    NotFound(Uuid),

    /// Target is the node itself or one of its descendants
    #[error("Moving folder {node} under {target} would create a cycle")]
    WouldCreateCycle { node: Uuid, target: Uuid },

    /// Parent is scoped to a different department than the node
    #[error("Folder {node} cannot be placed under {target}: department mismatch")]
    DepartmentMismatch { node: Uuid, target: Uuid },

    /// Active folder would sit below an inactive one
    #[error("Folder {folder} cannot be active while ancestor {ancestor} is inactive")]
    InactiveAncestor { folder: Uuid, ancestor: Uuid },

    /// Deletion attempted on a system folder
    #[error("Folder {0} is a system folder and cannot be deleted")]
    BlockedBySystemFlag(Uuid),

    /// Deletion attempted while the folder still has children or documents
    #[error("Folder {0} is not empty")]
    BlockedByNonEmpty(Uuid),

    #[error("User {user} may not access folder {folder}")]
    Unauthorized { user: Uuid, folder: Uuid },

    /// Optimistic version mismatch
    #[error("Folder {id} was modified concurrently (expected version {expected}, found {actual})")]
    ConcurrencyConflict { id: Uuid, expected: u64, actual: u64 },

    #[error("Folder {0} already exists")]
    AlreadyExists(Uuid),

    /// Nesting would exceed the configured depth limit
    #[error("Folder {id} would exceed the maximum depth of {max_depth}")]
    TooDeep { id: Uuid, max_depth: u32 },

    #[error("Invalid folder name: {0:?}")]
    InvalidName(String),

    #[error("Configuration error: {0}")]
    Config(String),

    /// Persistence failed; the caller may retry
    #[error("Storage failure: {0}")]
    StorageFailure(String),
}

impl From<std::io::Error> for HierarchyError {
    fn from(err: std::io::Error) -> Self {
        HierarchyError::StorageFailure(err.to_string())
    }
}

impl From<serde_json::Error> for HierarchyError {
    fn from(err: serde_json::Error) -> Self {
        HierarchyError::StorageFailure(err.to_string())
    }
}

/// Result type for hierarchy operations
pub type Result<T> = std::result::Result<T, HierarchyError>;
