//! Core directory service structure, startup and shutdown.
//!
//! [`DirectoryService`] owns the schema partition and the data partitions and
//! executes directory operations against them. It is cheap to clone: clones
//! share one inner state, which is how every connection task gets access.

use super::errors::{OperationError, OperationResult};
use super::session::CoreSession;
use crate::auth::BindState;
use crate::config::DEFAULT_ADMIN_DN;
use crate::dn::Dn;
use crate::partition::Partition;
use crate::schema::{SchemaPartition, SchemaRegistry};
use crate::storage::StorageError;
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Settings the service needs beyond its partitions.
#[derive(Debug, Clone)]
pub struct ServiceOptions {
    /// Principal of in-process administrative sessions.
    pub admin_dn: Dn,
    pub change_log_enabled: bool,
}

impl Default for ServiceOptions {
    fn default() -> Self {
        Self {
            admin_dn: Dn::parse(DEFAULT_ADMIN_DN).unwrap_or_else(|_| Dn::root()),
            change_log_enabled: false,
        }
    }
}

/// Kind of write recorded in the change log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Add,
    Modify,
    SchemaModify,
}

/// One successful write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeRecord {
    pub sequence: u64,
    pub timestamp: DateTime<Utc>,
    pub kind: ChangeKind,
    pub dn: Dn,
    pub principal: Dn,
}

/// The in-process directory service.
///
/// # Examples
///
/// ```rust
/// use embedded_directory::dn::Dn;
/// use embedded_directory::entry::DirectoryEntry;
/// use embedded_directory::partition::Partition;
/// use embedded_directory::schema::{SchemaPartition, SchemaRegistry};
/// use embedded_directory::server::{DirectoryService, ServiceOptions};
///
/// let schema = SchemaPartition::new("schema", SchemaRegistry::with_builtin_schemas().unwrap());
/// let suffix = Dn::parse("dc=example,dc=com").unwrap();
/// let partition = Partition::in_memory("root", suffix.clone(), &["objectClass"]);
///
/// let service = DirectoryService::new(schema, vec![partition], ServiceOptions::default());
/// service.startup();
///
/// let admin = service.admin_session();
/// let root = DirectoryEntry::new(suffix.clone())
///     .with_attribute("objectClass", ["top", "organizationalUnit", "extensibleObject"])
///     .with_attribute("ou", ["example"]);
/// admin.add(root).unwrap();
/// assert!(admin.exists(&suffix).unwrap());
/// ```
#[derive(Debug, Clone)]
pub struct DirectoryService {
    pub(super) inner: Arc<ServiceInner>,
}

#[derive(Debug)]
pub(super) struct ServiceInner {
    pub(super) schema: SchemaPartition,
    pub(super) partitions: Vec<Partition>,
    pub(super) options: ServiceOptions,
    started: Arc<AtomicBool>,
    change_log: Mutex<Vec<ChangeRecord>>,
    next_change: AtomicU64,
}

impl DirectoryService {
    pub fn new(schema: SchemaPartition, partitions: Vec<Partition>, options: ServiceOptions) -> Self {
        Self {
            inner: Arc::new(ServiceInner {
                schema,
                partitions,
                options,
                started: Arc::new(AtomicBool::new(false)),
                change_log: Mutex::new(Vec::new()),
                next_change: AtomicU64::new(1),
            }),
        }
    }

    /// Start accepting operations.
    pub fn startup(&self) {
        if self.inner.started.swap(true, Ordering::SeqCst) {
            debug!("Directory service already started");
            return;
        }
        info!(
            "Directory service started with partitions [{}]",
            self.inner
                .partitions
                .iter()
                .map(|p| format!("{}: {}", p.id(), p.suffix()))
                .collect::<Vec<_>>()
                .join(", ")
        );
    }

    /// Flush every partition, stop accepting operations and close the
    /// partition backends.
    ///
    /// When a partition cannot be flushed the service stays started, so the
    /// caller can see that it was not shut down cleanly. Durable partitions
    /// release their files here; such a service cannot be started again.
    pub fn shutdown(&self) -> Result<(), StorageError> {
        if !self.is_started() {
            return Ok(());
        }
        for partition in &self.inner.partitions {
            if let Err(e) = partition.backend().flush() {
                warn!("Failed to flush partition '{}': {}", partition.id(), e);
                return Err(e);
            }
        }
        self.inner.started.store(false, Ordering::SeqCst);

        let mut closed = Ok(());
        for partition in &self.inner.partitions {
            if let Err(e) = partition.backend().close() {
                warn!("Failed to close partition '{}': {}", partition.id(), e);
                if closed.is_ok() {
                    closed = Err(e);
                }
            }
        }
        info!("Directory service shut down");
        closed
    }

    /// Shared view of the started flag that outlives the service itself.
    pub(crate) fn started_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.inner.started)
    }

    pub fn is_started(&self) -> bool {
        self.inner.started.load(Ordering::SeqCst)
    }

    pub fn schema(&self) -> &SchemaPartition {
        &self.inner.schema
    }

    pub fn registry(&self) -> Arc<RwLock<SchemaRegistry>> {
        self.inner.schema.registry()
    }

    pub fn partitions(&self) -> &[Partition] {
        &self.inner.partitions
    }

    pub fn partition(&self, id: &str) -> Option<&Partition> {
        self.inner.partitions.iter().find(|p| p.id() == id)
    }

    /// The partition holding `dn`: the one with the longest matching suffix.
    pub fn partition_for(&self, dn: &Dn) -> Option<&Partition> {
        self.inner
            .partitions
            .iter()
            .filter(|p| p.holds(dn))
            .max_by_key(|p| p.suffix().depth())
    }

    pub fn naming_contexts(&self) -> Vec<Dn> {
        self.inner
            .partitions
            .iter()
            .map(|p| p.suffix().clone())
            .collect()
    }

    pub fn admin_dn(&self) -> &Dn {
        &self.inner.options.admin_dn
    }

    /// A session already bound as the administrator, for in-process writes.
    pub fn admin_session(&self) -> CoreSession {
        CoreSession::new(
            self.clone(),
            BindState::Authenticated(self.inner.options.admin_dn.clone()),
        )
    }

    /// An anonymous session.
    pub fn session(&self) -> CoreSession {
        CoreSession::new(self.clone(), BindState::Anonymous)
    }

    pub fn is_change_log_enabled(&self) -> bool {
        self.inner.options.change_log_enabled
    }

    /// Every recorded change, oldest first. Empty when the change log is off.
    pub fn change_log(&self) -> Vec<ChangeRecord> {
        self.inner.change_log.lock().clone()
    }

    pub(super) fn record_change(&self, kind: ChangeKind, dn: &Dn, principal: &BindState) {
        if !self.inner.options.change_log_enabled {
            return;
        }
        let record = ChangeRecord {
            sequence: self.inner.next_change.fetch_add(1, Ordering::SeqCst),
            timestamp: Utc::now(),
            kind,
            dn: dn.clone(),
            principal: principal.dn(),
        };
        debug!("Change #{} {:?} {}", record.sequence, record.kind, record.dn);
        self.inner.change_log.lock().push(record);
    }

    pub(super) fn ensure_started(&self) -> OperationResult<()> {
        if self.is_started() {
            Ok(())
        } else {
            Err(OperationError::unavailable("Directory service is not started"))
        }
    }
}
