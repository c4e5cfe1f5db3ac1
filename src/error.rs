use std::path::PathBuf;

use thiserror::Error;

/// Unified error type for version-sync operations
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Git operation failed: {0}")]
    Git(#[from] git2::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Cannot resolve reference: {0}")]
    Resolution(String),

    #[error("No version field found in {}", path.display())]
    FieldNotFound { path: PathBuf },

    #[error("Remote operation failed: {0}")]
    Remote(String),

    #[error("Checkout failed: {0}")]
    Checkout(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience type alias for Results in version-sync
pub type Result<T> = std::result::Result<T, SyncError>;

impl SyncError {
    /// Create a configuration error with context
    pub fn config(msg: impl Into<String>) -> Self {
        SyncError::Config(msg.into())
    }

    /// Create a resolution error with context
    pub fn resolution(msg: impl Into<String>) -> Self {
        SyncError::Resolution(msg.into())
    }

    /// Create a remote error with context
    pub fn remote(msg: impl Into<String>) -> Self {
        SyncError::Remote(msg.into())
    }

    /// Create a checkout error with context
    pub fn checkout(msg: impl Into<String>) -> Self {
        SyncError::Checkout(msg.into())
    }

    /// Whether this error aborts the current reconciliation pass.
    ///
    /// A missing manifest field only skips the manifest step.
    pub fn is_fatal_to_pass(&self) -> bool {
        !matches!(self, SyncError::FieldNotFound { .. })
    }
}
