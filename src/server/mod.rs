//! The directory server: the in-process service core and its LDAP front end.
//!
//! [`DirectoryService`] executes operations against the partitions and the
//! schema registry. [`LdapListener`] exposes it over TCP; every connection
//! runs as its own task with its own [`CoreSession`].
//!
//! Supported operations are simple bind, unbind, search, add and modify.
//! Delete, modify-DN, compare and extended requests are answered with
//! `unwillingToPerform`; abandon is ignored.

mod connection;
pub mod core;
pub mod errors;
pub mod filter;
pub mod listener;
pub mod operations;
pub mod schema_check;
pub mod session;
pub mod subschema;

#[cfg(test)]
mod tests;

pub use core::{ChangeKind, ChangeRecord, DirectoryService, ServiceOptions};
pub use errors::{OperationError, OperationResult};
pub use listener::LdapListener;
pub use operations::SearchOutcome;
pub use session::CoreSession;
