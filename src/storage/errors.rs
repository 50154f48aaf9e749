//! Storage-specific error types.
//!
//! These errors describe failures of the persistence layer only. Directory
//! semantics such as "entry already exists" are reported through return values
//! of [`PartitionBackend`](super::PartitionBackend) and mapped to LDAP result
//! codes by the directory service.

use std::fmt;

/// Errors that can occur during storage operations.
#[derive(Debug)]
pub enum StorageError {
    /// The underlying store failed.
    Backend { operation: String, message: String },

    /// An entry could not be serialized or deserialized.
    Serialization { message: String },

    /// Stored bytes do not describe a valid entry.
    DataCorruption { key: String, details: String },

    /// The backend could not be opened.
    Open { path: String, message: String },

    /// The backend was closed.
    Closed { path: String },
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::Backend { operation, message } => {
                write!(f, "Storage backend failed during {}: {}", operation, message)
            }
            StorageError::Serialization { message } => {
                write!(f, "Serialization error: {}", message)
            }
            StorageError::DataCorruption { key, details } => {
                write!(f, "Data corruption detected at '{}': {}", key, details)
            }
            StorageError::Open { path, message } => {
                write!(f, "Cannot open storage at '{}': {}", path, message)
            }
            StorageError::Closed { path } => {
                write!(f, "Storage at '{}' is closed", path)
            }
        }
    }
}

impl std::error::Error for StorageError {}

impl StorageError {
    pub fn backend(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Backend {
            operation: operation.into(),
            message: message.into(),
        }
    }

    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    pub fn data_corruption(key: impl Into<String>, details: impl Into<String>) -> Self {
        Self::DataCorruption {
            key: key.into(),
            details: details.into(),
        }
    }

    pub fn open(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Open {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl From<sled::Error> for StorageError {
    fn from(error: sled::Error) -> Self {
        StorageError::backend("sled operation", error.to_string())
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(error: serde_json::Error) -> Self {
        StorageError::serialization(error.to_string())
    }
}
