//! Partitions and their creation.
//!
//! Every running directory has the mandatory system partition (`ou=system`,
//! holding the administrator) and one root partition under the configured
//! suffix. Each lives in its own subdirectory of the working directory, backed
//! by sled.
//!
//! Context entries are injected only after the service has started, and only
//! when missing, so starting against a directory that already holds them is
//! harmless.

use crate::auth::hash_password;
use crate::dn::{Dn, Rdn};
use crate::entry::DirectoryEntry;
use crate::error::{LifecycleError, LifecycleResult};
use crate::server::{DirectoryService, OperationResult};
use crate::storage::{InMemoryBackend, PartitionBackend, SledBackend};
use log::{debug, info};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

pub const SYSTEM_PARTITION_ID: &str = "system";
pub const ROOT_PARTITION_ID: &str = "root";

/// Attributes indexed on the root partition.
pub const ROOT_INDEXES: [&str; 4] = ["objectClass", "ou", "uid", "uniqueMember"];

/// Attributes indexed on the system partition.
pub const SYSTEM_INDEXES: [&str; 2] = ["objectClass", "uid"];

/// `ou=system`.
pub fn system_suffix() -> Dn {
    Dn::from_rdns(vec![Rdn::new("ou", SYSTEM_PARTITION_ID)])
}

/// A subtree of the directory stored in one backend.
pub struct Partition {
    id: String,
    directory: PathBuf,
    suffix: Dn,
    backend: Box<dyn PartitionBackend>,
}

impl fmt::Debug for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Partition")
            .field("id", &self.id)
            .field("directory", &self.directory)
            .field("suffix", &self.suffix.to_string())
            .field("indexes", &self.backend.indexed_attributes())
            .finish()
    }
}

impl Partition {
    pub fn new(
        id: impl Into<String>,
        directory: impl Into<PathBuf>,
        suffix: Dn,
        backend: impl PartitionBackend + 'static,
    ) -> Self {
        Self {
            id: id.into(),
            directory: directory.into(),
            suffix,
            backend: Box::new(backend),
        }
    }

    /// A partition held in memory only.
    pub fn in_memory(id: impl Into<String>, suffix: Dn, indexes: &[&str]) -> Self {
        Self::new(id, PathBuf::new(), suffix, InMemoryBackend::new(indexes))
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn suffix(&self) -> &Dn {
        &self.suffix
    }

    pub fn backend(&self) -> &dyn PartitionBackend {
        self.backend.as_ref()
    }

    pub fn indexed_attributes(&self) -> Vec<String> {
        self.backend.indexed_attributes()
    }

    /// Whether `dn` falls under this partition's suffix.
    pub fn holds(&self, dn: &Dn) -> bool {
        dn.is_within(&self.suffix)
    }
}

/// Creates partitions inside a working directory.
#[derive(Debug, Clone)]
pub struct PartitionManager {
    working_dir: PathBuf,
}

impl PartitionManager {
    pub fn new(working_dir: &Path) -> Self {
        Self {
            working_dir: working_dir.to_path_buf(),
        }
    }

    /// Open (or create) a sled-backed partition in `<working dir>/<id>`.
    pub fn create_partition(
        &self,
        id: &str,
        suffix: &Dn,
        indexes: &[&str],
    ) -> LifecycleResult<Partition> {
        let directory = self.working_dir.join(id);
        fs::create_dir_all(&directory).map_err(|e| LifecycleError::partition_init(id, e))?;
        let backend = SledBackend::open(directory.join("data"), indexes)
            .map_err(|e| LifecycleError::partition_init(id, e))?;

        debug!(
            "Created partition '{}' for {} in {} (indexes: {})",
            id,
            suffix,
            directory.display(),
            indexes.join(", ")
        );
        Ok(Partition::new(id, directory, suffix.clone(), backend))
    }

    pub fn create_system_partition(&self) -> LifecycleResult<Partition> {
        self.create_partition(SYSTEM_PARTITION_ID, &system_suffix(), &SYSTEM_INDEXES)
    }

    pub fn create_root_partition(&self, suffix: &Dn) -> LifecycleResult<Partition> {
        self.create_partition(ROOT_PARTITION_ID, suffix, &ROOT_INDEXES)
    }
}

/// Add the system context entry, the administrator and the root entry when
/// they are missing. The service must already be started.
pub fn inject_context_entries(
    service: &DirectoryService,
    admin_password: &str,
) -> LifecycleResult<()> {
    let admin_dn = service.admin_dn().clone();
    let entries = [
        (SYSTEM_PARTITION_ID, system_context_entry()),
        (SYSTEM_PARTITION_ID, admin_entry(&admin_dn, admin_password)),
    ];
    for (partition, entry) in entries {
        inject(service, entry).map_err(|e| LifecycleError::partition_init(partition, e))?;
    }

    let root_suffix = service
        .partition(ROOT_PARTITION_ID)
        .map(|partition| partition.suffix().clone());
    if let Some(suffix) = root_suffix {
        inject(service, root_context_entry(&suffix))
            .map_err(|e| LifecycleError::partition_init(ROOT_PARTITION_ID, e))?;
    }
    Ok(())
}

fn inject(service: &DirectoryService, entry: DirectoryEntry) -> OperationResult<()> {
    let session = service.admin_session();
    if session.exists(&entry.dn)? {
        debug!("Context entry {} already present", entry.dn);
        return Ok(());
    }
    info!("Injecting context entry {}", entry.dn);
    session.add(entry)
}

/// `ou=system`.
pub fn system_context_entry() -> DirectoryEntry {
    DirectoryEntry::new(system_suffix())
        .with_attribute("objectClass", ["top", "organizationalUnit", "extensibleObject"])
        .with_attribute("ou", [SYSTEM_PARTITION_ID])
}

/// The administrator, with a `{SHA256}` hashed password.
pub fn admin_entry(dn: &Dn, password: &str) -> DirectoryEntry {
    DirectoryEntry::new(dn.clone())
        .with_attribute(
            "objectClass",
            ["top", "person", "organizationalPerson", "inetOrgPerson"],
        )
        .with_attribute("cn", ["system administrator"])
        .with_attribute("sn", ["administrator"])
        .with_attribute("userPassword", [hash_password(password)])
}

/// The entry at the root suffix. `ou` mirrors the value of the suffix RDN so
/// the entry satisfies `organizationalUnit`; `extensibleObject` admits the
/// naming attribute (`dc`, `o`, ...).
pub fn root_context_entry(suffix: &Dn) -> DirectoryEntry {
    let mut entry = DirectoryEntry::new(suffix.clone()).with_attribute(
        "objectClass",
        ["top", "organizationalUnit", "extensibleObject"],
    );
    if let Some(rdn) = suffix.rdn() {
        entry.attributes.add_value("dc", rdn.value());
        entry.attributes.add_value("ou", rdn.value());
    }
    entry
}
