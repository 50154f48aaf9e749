//! Error types for the embedded directory harness.
//!
//! Errors are grouped by the boundary they cross:
//!
//! - [`MappingError`] - data-shape violations while turning a [`DomainRecord`](crate::DomainRecord)
//!   into a directory entry or back
//! - [`EntryStoreError`] - outcomes of `persist`/`load` against a running listener
//! - [`LifecycleError`] - fatal failures while starting or stopping the embedded service
//! - [`SchemaError`] - a single schema definition that failed to parse or resolve
//! - [`ConfigError`] - rejected [`ServiceConfig`](crate::ServiceConfig) values

use crate::protocol::ResultCode;
use std::io;
use std::path::PathBuf;

/// Errors raised while mapping between domain records and directory entries.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MappingError {
    /// The identifier cannot be turned into a distinguished name component.
    #[error("Invalid identifier '{value}': {reason}")]
    InvalidIdentifier { value: String, reason: String },

    /// A record field cannot be represented as a directory attribute value.
    #[error("Encoding error: {message}")]
    Encoding { message: String },

    /// A stored attribute could not be turned back into a record field.
    #[error("Decoding error: {message}")]
    Decoding { message: String },

    /// A required attribute is absent from the entry.
    #[error("Required attribute '{attribute}' is missing")]
    MissingAttribute { attribute: String },
}

impl MappingError {
    pub fn invalid_identifier(value: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidIdentifier {
            value: value.into(),
            reason: reason.into(),
        }
    }

    pub fn encoding(message: impl Into<String>) -> Self {
        Self::Encoding {
            message: message.into(),
        }
    }

    pub fn decoding(message: impl Into<String>) -> Self {
        Self::Decoding {
            message: message.into(),
        }
    }

    pub fn missing_attribute(attribute: impl Into<String>) -> Self {
        Self::MissingAttribute {
            attribute: attribute.into(),
        }
    }
}

/// Errors returned by [`RecordStore`](crate::RecordStore) operations.
#[derive(Debug, thiserror::Error)]
pub enum EntryStoreError {
    /// The record or the stored entry has an invalid shape.
    #[error(transparent)]
    Mapping(#[from] MappingError),

    /// An entry already occupies the target DN.
    #[error("Entry already exists: {dn}")]
    AlreadyExists { dn: String },

    /// No entry exists at the target DN.
    #[error("No entry found at {dn}")]
    NotFound { dn: String },

    /// The directory server could not be contacted, or the caller's deadline elapsed.
    #[error("Directory server unreachable: {message}")]
    Unreachable { message: String },

    /// The server answered with a result code this store does not translate.
    #[error("Directory server rejected the operation with {code}: {message}")]
    Rejected { code: ResultCode, message: String },
}

impl EntryStoreError {
    pub fn unreachable(message: impl Into<String>) -> Self {
        Self::Unreachable {
            message: message.into(),
        }
    }
}

/// Result type for entry store operations.
pub type StoreResult<T> = Result<T, EntryStoreError>;

/// A schema definition that failed to parse or resolve.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaError {
    /// The definition text is not valid RFC 4512 syntax.
    #[error("{origin}: cannot parse definition: {message}")]
    Parse { origin: String, message: String },

    /// A definition names a superior, MUST or MAY element that is not registered.
    #[error("{element} '{name}' references unknown {reference_kind} '{reference}'")]
    UnresolvedReference {
        element: &'static str,
        name: String,
        reference_kind: &'static str,
        reference: String,
    },

    /// A name or OID is already taken by another definition.
    #[error("Duplicate schema element name or OID '{name}'")]
    Duplicate { name: String },

    /// An object class is (transitively) its own superior.
    #[error("Object class '{name}' has a circular superior chain")]
    Cycle { name: String },

    /// An enabled schema depends on a schema that is missing or disabled.
    #[error("Schema '{schema}' depends on missing or disabled schema '{dependency}'")]
    MissingDependency { schema: String, dependency: String },

    /// Schema files could not be read or written.
    #[error("I/O error on schema file '{path}': {message}")]
    Io { path: String, message: String },
}

impl SchemaError {
    pub fn parse(origin: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Parse {
            origin: origin.into(),
            message: message.into(),
        }
    }

    pub fn io(path: &std::path::Path, error: &io::Error) -> Self {
        Self::Io {
            path: path.display().to_string(),
            message: error.to_string(),
        }
    }
}

/// Invalid configuration values.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid configuration for '{parameter}': {message}")]
pub struct ConfigError {
    pub parameter: String,
    pub message: String,
}

impl ConfigError {
    pub fn new(parameter: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            parameter: parameter.into(),
            message: message.into(),
        }
    }
}

/// Fatal errors from starting or stopping the embedded directory.
#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    /// The underlying directory service still reports itself as started.
    #[error("Directory service is already running")]
    AlreadyRunning,

    /// The working directory exists on disk and will not be reused.
    #[error(
        "The working directory '{}' already exists. Another directory service instance may be \
         using it or it may be left over from an unclean shutdown. Delete it or configure a \
         different working directory",
        .path.display()
    )]
    WorkingDirectoryConflict { path: PathBuf },

    /// The working directory could not be created.
    #[error("Failed to provision working directory '{}': {source}", .path.display())]
    Provisioning {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// One or more schema definitions failed to load.
    #[error("Schema load failed: {}", join_errors(.errors))]
    SchemaLoadFailed { errors: Vec<SchemaError> },

    /// A partition could not be created or its context entry injected.
    #[error("Failed to initialize partition '{partition}': {reason}")]
    PartitionInitFailed { partition: String, reason: String },

    /// The LDAP listener could not bind its socket.
    #[error("Failed to start LDAP listener on {address}: {source}")]
    ListenerFailed {
        address: String,
        #[source]
        source: io::Error,
    },

    /// Stopping the listener or shutting down the service failed.
    #[error("Shutdown failed: {message}")]
    ShutdownFailed { message: String },

    /// The working directory could not be deleted after shutdown.
    #[error("Failed to delete working directory '{}': {source}", .path.display())]
    CleanupFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The configuration was rejected.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl LifecycleError {
    pub fn partition_init(partition: impl Into<String>, reason: impl ToString) -> Self {
        Self::PartitionInitFailed {
            partition: partition.into(),
            reason: reason.to_string(),
        }
    }
}

/// Result type for lifecycle operations.
pub type LifecycleResult<T> = Result<T, LifecycleError>;

fn join_errors(errors: &[SchemaError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_load_failed_lists_every_error() {
        let error = LifecycleError::SchemaLoadFailed {
            errors: vec![
                SchemaError::parse("core.schema:12", "missing ')'"),
                SchemaError::Duplicate {
                    name: "cn".to_string(),
                },
            ],
        };

        let message = error.to_string();
        assert!(message.contains("core.schema:12"));
        assert!(message.contains("Duplicate schema element name or OID 'cn'"));
    }

    #[test]
    fn test_mapping_error_converts_into_store_error() {
        let error: EntryStoreError = MappingError::missing_attribute("special").into();
        assert!(matches!(
            error,
            EntryStoreError::Mapping(MappingError::MissingAttribute { ref attribute }) if attribute == "special"
        ));
        assert_eq!(error.to_string(), "Required attribute 'special' is missing");
    }

    #[test]
    fn test_working_directory_conflict_names_the_path() {
        let error = LifecycleError::WorkingDirectoryConflict {
            path: PathBuf::from("/tmp/apacheds_1"),
        };
        assert!(error.to_string().contains("/tmp/apacheds_1"));
    }
}
