//! Errors raised by directory operations.
//!
//! Every failure of the directory service core carries the LDAP result code it
//! is answered with, so sessions can turn it into a response without another
//! mapping table.

use crate::dn::{Dn, DnError};
use crate::protocol::{LdapResult, ResultCode};
use crate::storage::StorageError;

/// A failed directory operation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{code}: {message}")]
pub struct OperationError {
    pub code: ResultCode,
    pub message: String,
    /// Closest existing ancestor, for `noSuchObject`.
    pub matched_dn: Option<Dn>,
}

/// Result type for directory operations.
pub type OperationResult<T> = Result<T, OperationError>;

impl OperationError {
    pub fn new(code: ResultCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            matched_dn: None,
        }
    }

    pub fn with_matched_dn(mut self, dn: Dn) -> Self {
        self.matched_dn = Some(dn);
        self
    }

    pub fn no_such_object(dn: &Dn) -> Self {
        Self::new(ResultCode::NoSuchObject, format!("No such object: {dn}"))
    }

    pub fn entry_already_exists(dn: &Dn) -> Self {
        Self::new(ResultCode::EntryAlreadyExists, format!("Entry already exists: {dn}"))
    }

    pub fn insufficient_access(message: impl Into<String>) -> Self {
        Self::new(ResultCode::InsufficientAccessRights, message)
    }

    pub fn invalid_credentials() -> Self {
        Self::new(ResultCode::InvalidCredentials, "Invalid credentials")
    }

    pub fn object_class_violation(message: impl Into<String>) -> Self {
        Self::new(ResultCode::ObjectClassViolation, message)
    }

    pub fn undefined_attribute_type(attribute: &str) -> Self {
        Self::new(
            ResultCode::UndefinedAttributeType,
            format!("Undefined attribute type: {attribute}"),
        )
    }

    pub fn constraint_violation(message: impl Into<String>) -> Self {
        Self::new(ResultCode::ConstraintViolation, message)
    }

    pub fn no_such_attribute(attribute: &str) -> Self {
        Self::new(
            ResultCode::NoSuchAttribute,
            format!("No such attribute or value: {attribute}"),
        )
    }

    pub fn attribute_or_value_exists(attribute: &str) -> Self {
        Self::new(
            ResultCode::AttributeOrValueExists,
            format!("Attribute or value already exists: {attribute}"),
        )
    }

    pub fn invalid_attribute_syntax(message: impl Into<String>) -> Self {
        Self::new(ResultCode::InvalidAttributeSyntax, message)
    }

    pub fn not_allowed_on_rdn(message: impl Into<String>) -> Self {
        Self::new(ResultCode::NotAllowedOnRdn, message)
    }

    pub fn unwilling_to_perform(message: impl Into<String>) -> Self {
        Self::new(ResultCode::UnwillingToPerform, message)
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(ResultCode::Unavailable, message)
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self::new(ResultCode::Other, message)
    }

    /// The `LDAPResult` this error is answered with.
    pub fn to_ldap_result(&self) -> LdapResult {
        LdapResult {
            code: self.code,
            matched_dn: self
                .matched_dn
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_default(),
            message: self.message.clone(),
        }
    }
}

impl From<StorageError> for OperationError {
    fn from(error: StorageError) -> Self {
        log::error!("Storage failure during directory operation: {}", error);
        Self::other(error.to_string())
    }
}

impl From<DnError> for OperationError {
    fn from(error: DnError) -> Self {
        Self::new(ResultCode::InvalidDnSyntax, error.to_string())
    }
}
