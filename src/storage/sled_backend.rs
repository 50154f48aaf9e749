//! sled-backed partition storage.
//!
//! Each partition owns one sled database inside its working directory. The
//! `entries` tree maps normalized DNs to JSON-encoded [`DirectoryEntry`]
//! values; every indexed attribute gets an `idx_<attribute>` tree whose keys
//! are `len(value) ++ value ++ dn`, so a prefix scan over one value finds all
//! entries holding it.
//!
//! The sled handles sit behind a lock so that [`PartitionBackend::close`] can
//! drop them, which closes the database files.

use super::{PartitionBackend, StorageError, index_keys};
use crate::dn::{Dn, normalize_value};
use crate::entry::DirectoryEntry;
use parking_lot::{MappedRwLockReadGuard, RwLock, RwLockReadGuard};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

const ENTRIES_TREE: &str = "entries";
const INDEX_TREE_PREFIX: &str = "idx_";

/// Durable backend for one partition.
#[derive(Debug)]
pub struct SledBackend {
    path: PathBuf,
    indexed: Vec<String>,
    store: RwLock<Option<SledStore>>,
}

#[derive(Debug)]
struct SledStore {
    db: sled::Db,
    entries: sled::Tree,
    indexes: HashMap<String, sled::Tree>,
}

impl SledBackend {
    /// Open (or create) the database under `path`.
    pub fn open<I, S>(path: impl AsRef<Path>, indexed: I) -> Result<Self, StorageError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let path = path.as_ref().to_path_buf();
        let db = sled::open(&path)
            .map_err(|e| StorageError::open(path.display().to_string(), e.to_string()))?;
        let entries = db.open_tree(ENTRIES_TREE)?;

        let mut indexes = HashMap::new();
        for attribute in indexed {
            let attribute = attribute.as_ref().to_ascii_lowercase();
            let tree = db.open_tree(format!("{INDEX_TREE_PREFIX}{attribute}"))?;
            indexes.insert(attribute, tree);
        }

        log::debug!(
            "Opened sled partition store at {} ({} entries)",
            path.display(),
            entries.len()
        );

        let mut indexed: Vec<String> = indexes.keys().cloned().collect();
        indexed.sort();
        Ok(Self {
            path,
            indexed,
            store: RwLock::new(Some(SledStore {
                db,
                entries,
                indexes,
            })),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_closed(&self) -> bool {
        self.store.read().is_none()
    }

    fn store(&self) -> Result<MappedRwLockReadGuard<'_, SledStore>, StorageError> {
        RwLockReadGuard::try_map(self.store.read(), Option::as_ref).map_err(|_| {
            StorageError::Closed {
                path: self.path.display().to_string(),
            }
        })
    }
}

impl SledStore {
    fn decode(&self, key: &[u8], bytes: &[u8]) -> Result<DirectoryEntry, StorageError> {
        serde_json::from_slice(bytes).map_err(|e| {
            StorageError::data_corruption(String::from_utf8_lossy(key), e.to_string())
        })
    }

    fn indexed_names(&self) -> Vec<String> {
        self.indexes.keys().cloned().collect()
    }

    fn add_to_indexes(&self, entry: &DirectoryEntry) -> Result<(), StorageError> {
        for (attribute, value) in index_keys(entry, &self.indexed_names()) {
            if let Some(tree) = self.indexes.get(&attribute) {
                tree.insert(index_key(&value, entry.dn.normalized()), &[] as &[u8])?;
            }
        }
        Ok(())
    }

    fn remove_from_indexes(&self, entry: &DirectoryEntry) -> Result<(), StorageError> {
        for (attribute, value) in index_keys(entry, &self.indexed_names()) {
            if let Some(tree) = self.indexes.get(&attribute) {
                tree.remove(index_key(&value, entry.dn.normalized()))?;
            }
        }
        Ok(())
    }
}

fn index_prefix(value: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(4 + value.len());
    key.extend_from_slice(&(value.len() as u32).to_be_bytes());
    key.extend_from_slice(value.as_bytes());
    key
}

fn index_key(value: &str, dn: &str) -> Vec<u8> {
    let mut key = index_prefix(value);
    key.extend_from_slice(dn.as_bytes());
    key
}

impl PartitionBackend for SledBackend {
    fn insert(&self, entry: &DirectoryEntry) -> Result<bool, StorageError> {
        let store = self.store()?;
        let key = entry.dn.normalized().as_bytes();
        let bytes = serde_json::to_vec(entry)?;

        match store
            .entries
            .compare_and_swap(key, None as Option<&[u8]>, Some(bytes))?
        {
            Ok(()) => {
                store.add_to_indexes(entry)?;
                Ok(true)
            }
            Err(_) => Ok(false),
        }
    }

    fn replace(&self, entry: &DirectoryEntry) -> Result<bool, StorageError> {
        let store = self.store()?;
        let key = entry.dn.normalized().as_bytes();
        let bytes = serde_json::to_vec(entry)?;

        loop {
            let Some(current) = store.entries.get(key)? else {
                return Ok(false);
            };
            let swapped = store.entries.compare_and_swap(
                key,
                Some(current.as_ref()),
                Some(bytes.clone()),
            )?;
            if swapped.is_ok() {
                let previous = store.decode(key, &current)?;
                store.remove_from_indexes(&previous)?;
                store.add_to_indexes(entry)?;
                return Ok(true);
            }
        }
    }

    fn get(&self, dn: &Dn) -> Result<Option<DirectoryEntry>, StorageError> {
        let store = self.store()?;
        let key = dn.normalized().as_bytes();
        match store.entries.get(key)? {
            Some(bytes) => store.decode(key, &bytes).map(Some),
            None => Ok(None),
        }
    }

    fn contains(&self, dn: &Dn) -> Result<bool, StorageError> {
        Ok(self.store()?.entries.contains_key(dn.normalized().as_bytes())?)
    }

    fn scan(&self) -> Result<Vec<DirectoryEntry>, StorageError> {
        let store = self.store()?;
        store
            .entries
            .iter()
            .map(|item| {
                let (key, bytes) = item?;
                store.decode(&key, &bytes)
            })
            .collect()
    }

    fn lookup_index(
        &self,
        attribute: &str,
        value: &str,
    ) -> Result<Option<Vec<DirectoryEntry>>, StorageError> {
        let store = self.store()?;
        let Some(tree) = store.indexes.get(&attribute.to_ascii_lowercase()) else {
            return Ok(None);
        };

        let prefix = index_prefix(&normalize_value(value));
        let mut hits = Vec::new();
        for item in tree.scan_prefix(&prefix) {
            let (key, _) = item?;
            let dn = &key[prefix.len()..];
            // A dangling index key means the entry write raced ahead; skip it.
            if let Some(bytes) = store.entries.get(dn)? {
                hits.push(store.decode(dn, &bytes)?);
            }
        }
        Ok(Some(hits))
    }

    fn indexed_attributes(&self) -> Vec<String> {
        self.indexed.clone()
    }

    fn len(&self) -> Result<usize, StorageError> {
        Ok(self.store()?.entries.len())
    }

    fn flush(&self) -> Result<(), StorageError> {
        self.store()?.db.flush()?;
        Ok(())
    }

    fn close(&self) -> Result<(), StorageError> {
        let Some(store) = self.store.write().take() else {
            return Ok(());
        };
        let flushed = store.db.flush();
        drop(store);
        log::debug!("Closed sled partition store at {}", self.path.display());
        flushed?;
        Ok(())
    }
}
