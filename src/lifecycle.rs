//! Start/stop state machine for the embedded directory.
//!
//! `start` runs, strictly in order: working-directory provisioning, schema
//! bootstrap, partition creation, service startup with context entries,
//! listener bind, and finally the best-effort import passes. A failure before
//! the listener is up tears down whatever was started and deletes the working
//! directory. `start` and `stop` hold one async lock for their whole
//! sequence, so concurrent callers are serialized.

use crate::config::ServiceConfig;
use crate::error::{LifecycleError, LifecycleResult};
use crate::fs_util::{provision_working_dir, remove_tree, resolve_working_dir};
use crate::import::{DataImporter, ImportReport, ImportWarning};
use crate::partition::{PartitionManager, inject_context_entries};
use crate::schema::SchemaBootstrapper;
use crate::server::{DirectoryService, LdapListener, ServiceOptions};
use log::{error, info, warn};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;

/// Outcome of [`EmbeddedDirectory::start`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartReport {
    /// Address the listener is bound to, with the real port.
    pub local_addr: SocketAddr,
    pub working_dir: PathBuf,
    /// The directory was already running; nothing was started or imported.
    pub already_running: bool,
    pub import: ImportReport,
}

impl StartReport {
    pub fn warnings(&self) -> &[ImportWarning] {
        &self.import.warnings
    }
}

enum ServiceState {
    Stopped,
    Starting,
    Running(RunningService),
}

struct RunningService {
    service: DirectoryService,
    listener: LdapListener,
    working_dir: PathBuf,
}

struct Inner {
    state: ServiceState,
    /// Started flag of the most recent directory service. Only the flag
    /// outlives `stop`; the service and its partitions are dropped.
    retained: Option<Arc<AtomicBool>>,
}

/// An in-process LDAP directory for tests.
///
/// # Examples
///
/// ```rust,no_run
/// use embedded_directory::config::ServiceConfig;
/// use embedded_directory::lifecycle::EmbeddedDirectory;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = ServiceConfig::builder()
///     .port(0)
///     .ldif_pattern("fixtures/*.ldif")
///     .build()?;
/// let directory = EmbeddedDirectory::new(config);
///
/// let report = directory.start().await?;
/// println!("LDAP listening on {}", report.local_addr);
/// for warning in report.warnings() {
///     eprintln!("{}: {}", warning.source, warning.message);
/// }
///
/// directory.stop().await?;
/// # Ok(())
/// # }
/// ```
pub struct EmbeddedDirectory {
    config: ServiceConfig,
    inner: Mutex<Inner>,
    running: AtomicBool,
}

impl EmbeddedDirectory {
    pub fn new(config: ServiceConfig) -> Self {
        Self {
            config,
            inner: Mutex::new(Inner {
                state: ServiceState::Stopped,
                retained: None,
            }),
            running: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// The running directory service, for in-process inspection.
    pub async fn service(&self) -> Option<DirectoryService> {
        match &self.inner.lock().await.state {
            ServiceState::Running(running) => Some(running.service.clone()),
            _ => None,
        }
    }

    pub async fn start(&self) -> LifecycleResult<StartReport> {
        let mut inner = self.inner.lock().await;

        if let ServiceState::Running(running) = &inner.state {
            return Ok(StartReport {
                local_addr: running.listener.local_addr(),
                working_dir: running.working_dir.clone(),
                already_running: true,
                import: ImportReport::default(),
            });
        }
        if inner
            .retained
            .as_ref()
            .is_some_and(|started| started.load(Ordering::SeqCst))
        {
            return Err(LifecycleError::AlreadyRunning);
        }

        self.config.validate()?;
        let working_dir = resolve_working_dir(&self.config);
        provision_working_dir(&working_dir)?;

        info!("Starting directory server in {}", working_dir.display());
        inner.state = ServiceState::Starting;

        let mut started = None;
        let (service, listener) = match self.boot(&working_dir, &mut started).await {
            Ok(booted) => booted,
            Err(e) => {
                error!("Directory server startup failed: {}", e);
                if let Some(service) = &started
                    && let Err(shutdown) = service.shutdown()
                {
                    warn!("Service shutdown after failed start also failed: {}", shutdown);
                }
                inner.retained = started.as_ref().map(DirectoryService::started_flag);
                drop(started);
                if let Err(cleanup) = remove_tree(&working_dir) {
                    warn!(
                        "Failed to delete working directory {}: {}",
                        working_dir.display(),
                        cleanup
                    );
                }
                inner.state = ServiceState::Stopped;
                return Err(e);
            }
        };

        let local_addr = listener.local_addr();
        inner.retained = Some(service.started_flag());
        inner.state = ServiceState::Running(RunningService {
            service: service.clone(),
            listener,
            working_dir: working_dir.clone(),
        });
        self.running.store(true, Ordering::SeqCst);
        info!("Directory server listening on {}", local_addr);

        let import = DataImporter::new(&self.config)
            .run(&local_addr.to_string(), &service.admin_session())
            .await;

        Ok(StartReport {
            local_addr,
            working_dir,
            already_running: false,
            import,
        })
    }

    /// Everything up to and including the listener bind. `started` receives
    /// the directory service as soon as it is started.
    async fn boot(
        &self,
        working_dir: &Path,
        started: &mut Option<DirectoryService>,
    ) -> LifecycleResult<(DirectoryService, LdapListener)> {
        let schema = SchemaBootstrapper::new(working_dir).bootstrap()?;

        let manager = PartitionManager::new(working_dir);
        let system = manager.create_system_partition()?;
        let root = manager.create_root_partition(&self.config.suffix_dn()?)?;

        let options = ServiceOptions {
            admin_dn: self.config.admin_dn()?,
            change_log_enabled: self.config.change_log_enabled,
        };
        let service = DirectoryService::new(schema, vec![system, root], options);
        service.startup();
        *started = Some(service.clone());
        inject_context_entries(&service, &self.config.admin_password)?;

        let listener = LdapListener::bind(&self.config.listen_address(), service.clone()).await?;
        Ok((service, listener))
    }

    pub async fn stop(&self) -> LifecycleResult<()> {
        let mut inner = self.inner.lock().await;
        let state = std::mem::replace(&mut inner.state, ServiceState::Stopped);
        let ServiceState::Running(running) = state else {
            return Ok(());
        };

        let RunningService {
            service,
            listener,
            working_dir,
        } = running;

        info!("Shutting down directory server");
        listener.stop().await;
        let shutdown = service.shutdown();
        inner.retained = Some(service.started_flag());
        drop(listener);
        drop(service);
        self.running.store(false, Ordering::SeqCst);

        info!("Deleting working directory {}", working_dir.display());
        let cleanup = remove_tree(&working_dir);

        match (shutdown, cleanup) {
            (Err(e), cleanup) => {
                if let Err(cleanup) = cleanup {
                    warn!("Working directory cleanup failed as well: {}", cleanup);
                }
                Err(LifecycleError::ShutdownFailed {
                    message: e.to_string(),
                })
            }
            (Ok(()), Err(source)) => Err(LifecycleError::CleanupFailed {
                path: working_dir,
                source,
            }),
            (Ok(()), Ok(())) => Ok(()),
        }
    }
}

impl Drop for EmbeddedDirectory {
    fn drop(&mut self) {
        if self.is_running() {
            warn!("Embedded directory dropped while running; its working directory is left behind");
        }
    }
}
