//! In-memory partition backend.
//!
//! Entries live in a `HashMap` keyed by normalized DN, with one reverse index
//! per indexed attribute. A single `parking_lot::RwLock` guards both, so an
//! insert and its index updates are atomic with respect to readers, and two
//! concurrent inserts of the same DN cannot both succeed.

use super::{PartitionBackend, StorageError, index_keys};
use crate::dn::{Dn, normalize_value};
use crate::entry::DirectoryEntry;
use parking_lot::RwLock;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

#[derive(Debug, Default)]
struct State {
    entries: HashMap<String, DirectoryEntry>,
    // (attribute, normalized value) -> normalized DNs
    index: HashMap<(String, String), BTreeSet<String>>,
}

impl State {
    fn unindex(&mut self, entry: &DirectoryEntry, indexed: &[String]) {
        for key in index_keys(entry, indexed) {
            if let Some(dns) = self.index.get_mut(&key) {
                dns.remove(entry.dn.normalized());
                if dns.is_empty() {
                    self.index.remove(&key);
                }
            }
        }
    }

    fn reindex(&mut self, entry: &DirectoryEntry, indexed: &[String]) {
        for key in index_keys(entry, indexed) {
            self.index
                .entry(key)
                .or_default()
                .insert(entry.dn.normalized().to_string());
        }
    }
}

/// Thread-safe in-memory backend. Clones share the same data.
#[derive(Debug, Clone)]
pub struct InMemoryBackend {
    state: Arc<RwLock<State>>,
    indexed: Arc<Vec<String>>,
}

impl InMemoryBackend {
    pub fn new<I, S>(indexed: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            state: Arc::new(RwLock::new(State::default())),
            indexed: Arc::new(
                indexed
                    .into_iter()
                    .map(|name| name.as_ref().to_ascii_lowercase())
                    .collect(),
            ),
        }
    }

    /// Drop every entry (useful for testing).
    pub fn clear(&self) {
        let mut state = self.state.write();
        state.entries.clear();
        state.index.clear();
    }
}

impl PartitionBackend for InMemoryBackend {
    fn insert(&self, entry: &DirectoryEntry) -> Result<bool, StorageError> {
        let mut state = self.state.write();
        let key = entry.dn.normalized().to_string();
        if state.entries.contains_key(&key) {
            return Ok(false);
        }
        state.reindex(entry, &self.indexed);
        state.entries.insert(key, entry.clone());
        Ok(true)
    }

    fn replace(&self, entry: &DirectoryEntry) -> Result<bool, StorageError> {
        let mut state = self.state.write();
        let key = entry.dn.normalized().to_string();
        let Some(previous) = state.entries.remove(&key) else {
            return Ok(false);
        };
        state.unindex(&previous, &self.indexed);
        state.reindex(entry, &self.indexed);
        state.entries.insert(key, entry.clone());
        Ok(true)
    }

    fn get(&self, dn: &Dn) -> Result<Option<DirectoryEntry>, StorageError> {
        Ok(self.state.read().entries.get(dn.normalized()).cloned())
    }

    fn contains(&self, dn: &Dn) -> Result<bool, StorageError> {
        Ok(self.state.read().entries.contains_key(dn.normalized()))
    }

    fn scan(&self) -> Result<Vec<DirectoryEntry>, StorageError> {
        Ok(self.state.read().entries.values().cloned().collect())
    }

    fn lookup_index(
        &self,
        attribute: &str,
        value: &str,
    ) -> Result<Option<Vec<DirectoryEntry>>, StorageError> {
        let attribute = attribute.to_ascii_lowercase();
        if !self.indexed.contains(&attribute) {
            return Ok(None);
        }

        let state = self.state.read();
        let hits = state
            .index
            .get(&(attribute, normalize_value(value)))
            .map(|dns| {
                dns.iter()
                    .filter_map(|dn| state.entries.get(dn).cloned())
                    .collect()
            })
            .unwrap_or_default();
        Ok(Some(hits))
    }

    fn indexed_attributes(&self) -> Vec<String> {
        self.indexed.to_vec()
    }

    fn len(&self) -> Result<usize, StorageError> {
        Ok(self.state.read().entries.len())
    }

    fn flush(&self) -> Result<(), StorageError> {
        Ok(())
    }

    // Nothing to release; the entries stay readable.
    fn close(&self) -> Result<(), StorageError> {
        Ok(())
    }
}
