//! Partition storage backends.
//!
//! A [`PartitionBackend`] stores the entries of one partition keyed by
//! normalized DN and maintains equality indexes on a fixed set of attributes.
//! It knows nothing about hierarchy, schema or access control; the directory
//! service layers those on top.
//!
//! Two implementations are provided:
//!
//! - [`InMemoryBackend`] - `HashMap`s behind a `parking_lot::RwLock`, for tests
//! - [`SledBackend`] - one sled database per partition directory
//!
//! # Example Usage
//!
//! ```rust
//! use embedded_directory::dn::Dn;
//! use embedded_directory::entry::DirectoryEntry;
//! use embedded_directory::storage::{InMemoryBackend, PartitionBackend};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let backend = InMemoryBackend::new(["objectClass", "uid"]);
//! let entry = DirectoryEntry::new(Dn::parse("uid=alice,ou=users")?)
//!     .with_attribute("objectClass", ["top", "person"])
//!     .with_attribute("uid", ["alice"]);
//!
//! assert!(backend.insert(&entry)?);
//! assert!(!backend.insert(&entry)?); // already present
//!
//! let hits = backend.lookup_index("uid", "ALICE")?.unwrap();
//! assert_eq!(hits.len(), 1);
//! # Ok(())
//! # }
//! ```

pub mod errors;
pub mod in_memory;
pub mod sled_backend;


pub use errors::StorageError;
pub use in_memory::InMemoryBackend;
pub use sled_backend::SledBackend;

use crate::dn::{Dn, normalize_value};
use crate::entry::DirectoryEntry;
use std::fmt;

/// Storage for the entries of one partition.
///
/// Implementations must be safe to share between connection tasks; every
/// method takes `&self`.
pub trait PartitionBackend: Send + Sync + fmt::Debug {
    /// Store a new entry. Returns `false`, leaving the store untouched, when an
    /// entry with the same DN already exists.
    fn insert(&self, entry: &DirectoryEntry) -> Result<bool, StorageError>;

    /// Overwrite an existing entry. Returns `false` when there is none.
    fn replace(&self, entry: &DirectoryEntry) -> Result<bool, StorageError>;

    fn get(&self, dn: &Dn) -> Result<Option<DirectoryEntry>, StorageError>;

    fn contains(&self, dn: &Dn) -> Result<bool, StorageError>;

    /// Every entry, in no particular order.
    fn scan(&self) -> Result<Vec<DirectoryEntry>, StorageError>;

    /// Entries whose `attribute` holds `value` (compared normalized).
    ///
    /// `None` when the attribute is not indexed, so the caller must scan.
    fn lookup_index(
        &self,
        attribute: &str,
        value: &str,
    ) -> Result<Option<Vec<DirectoryEntry>>, StorageError>;

    /// Lowercase names of the indexed attributes.
    fn indexed_attributes(&self) -> Vec<String>;

    fn len(&self) -> Result<usize, StorageError>;

    fn is_empty(&self) -> Result<bool, StorageError> {
        self.len().map(|len| len == 0)
    }

    /// Make every write durable.
    fn flush(&self) -> Result<(), StorageError>;

    /// Flush and release the underlying store. Every later call except
    /// `close` itself fails with [`StorageError::Closed`].
    fn close(&self) -> Result<(), StorageError>;
}

/// `(attribute, normalized value)` pairs of `entry` that belong in the index.
fn index_keys(entry: &DirectoryEntry, indexed: &[String]) -> Vec<(String, String)> {
    let mut keys = Vec::new();
    for attribute in indexed {
        for value in entry.attributes.values(attribute) {
            let key = (attribute.clone(), normalize_value(value));
            if !keys.contains(&key) {
                keys.push(key);
            }
        }
    }
    keys
}
