//! Embeddable LDAPv3 directory server for integration tests.
//!
//! Boots an in-process directory with schema, partitions and bulk-loaded
//! fixtures, serves it over TCP, and offers a typed persist/load layer for
//! [`DomainRecord`]s on top of it.
//!
//! # Core Components
//!
//! - [`EmbeddedDirectory`] - start/stop lifecycle of the whole harness
//! - [`ServiceConfig`] - listener, suffix, working directory and import settings
//! - [`LdapEntryStore`] - [`RecordStore`] implementation speaking LDAP
//! - [`DirectoryService`](server::DirectoryService) - the in-process directory core
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use embedded_directory::{DomainRecord, EmbeddedDirectory, LdapEntryStore, RecordStore, ServiceConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ServiceConfig::builder().port(0).build()?;
//! let directory = EmbeddedDirectory::new(config.clone());
//! let report = directory.start().await?;
//!
//! let store = LdapEntryStore::new(
//!     report.local_addr.to_string(),
//!     config.suffix_dn()?,
//!     config.admin_dn.clone(),
//!     config.admin_password.clone(),
//! );
//! store.persist(&DomainRecord::new("alice", "likes tea")).await?;
//! assert_eq!(store.load("alice").await?.special(), "likes tea");
//!
//! directory.stop().await?;
//! # Ok(())
//! # }
//! ```
//!
//! Records are stored below `ou=users` under the configured suffix, so that
//! container has to exist first, typically from an LDIF fixture selected by
//! [`ServiceConfig::ldif_pattern`].

pub mod auth;
pub mod client;
pub mod config;
pub mod dn;
pub mod entry;
pub mod entry_store;
pub mod error;
pub mod fs_util;
pub mod import;
pub mod ldif;
pub mod lifecycle;
pub mod partition;
pub mod protocol;
pub mod schema;
pub mod server;
pub mod storage;

// Re-export commonly used types for convenience
pub use config::{ServiceConfig, ServiceConfigBuilder};
pub use entry::{DirectoryEntry, DomainRecord};
pub use entry_store::{LdapEntryStore, RecordStore};
pub use error::{
    ConfigError, EntryStoreError, LifecycleError, LifecycleResult, MappingError, SchemaError,
    StoreResult,
};
pub use import::{ImportReport, ImportWarning};
pub use lifecycle::{EmbeddedDirectory, StartReport};
pub use schema::SchemaRegistry;
