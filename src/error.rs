//! Error types for config parsing and editing

use thiserror::Error;

/// Errors raised by the document store and the editing engines
#[derive(Debug, Error)]
pub enum IetError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A referenced target, option, LUN or ACL entry does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// A target, option key or ACL entry already exists
    #[error("Duplicate: {0}")]
    Duplication(String),

    /// A target still carries options or LUNs
    #[error("Target not empty: {0}")]
    TargetNotEmpty(String),

    /// The document has an unexpected structure
    #[error("Parser error: {0}")]
    Parser(String),

    /// A caller-supplied value cannot be written to the file
    #[error("Invalid value: {0}")]
    Invalid(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl IetError {
    /// Check if this error means the referenced item is missing
    pub fn is_not_found(&self) -> bool {
        matches!(self, IetError::NotFound(_))
    }

    /// Check if this error means the item was already present
    pub fn is_duplication(&self) -> bool {
        matches!(self, IetError::Duplication(_))
    }
}

/// Result type for config operations
pub type IetResult<T> = Result<T, IetError>;
