//! Common test utilities for the embedded directory integration tests.
//!
//! Every test gets its own temporary root holding a `resources/` directory
//! for LDIF and schema fixtures and a `work/` directory under which working
//! directories are generated. Listeners always bind to an ephemeral port.

#![allow(dead_code)]

pub mod fixtures;

use embedded_directory::client::LdapClient;
use embedded_directory::{
    EmbeddedDirectory, LdapEntryStore, ServiceConfig, ServiceConfigBuilder, StartReport,
};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// A temporary root for one test.
pub struct TestRoot {
    dir: TempDir,
}

impl TestRoot {
    pub fn new() -> Self {
        init_logging();
        let dir = tempfile::tempdir().expect("temp root");
        fs::create_dir(dir.path().join("resources")).expect("resources dir");
        fs::create_dir(dir.path().join("work")).expect("work dir");
        Self { dir }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn resources(&self) -> PathBuf {
        self.path().join("resources")
    }

    pub fn work(&self) -> PathBuf {
        self.path().join("work")
    }

    /// Write a fixture below `resources/`, creating parent directories.
    pub fn write_resource(&self, relative: &str, contents: &str) {
        let path = self.resources().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("resource parent");
        }
        fs::write(path, contents).expect("resource file");
    }

    /// Ephemeral port, both roots injected.
    pub fn config(&self) -> ServiceConfigBuilder {
        ServiceConfig::builder()
            .port(0)
            .temp_root(self.work())
            .resource_root(self.resources())
    }

    /// Number of working directories currently below `work/`.
    pub fn working_dirs(&self) -> usize {
        fs::read_dir(self.work()).map(|dir| dir.count()).unwrap_or(0)
    }
}

/// A directory started with the `ou=users` fixture.
pub async fn start_with_users(root: &TestRoot) -> (EmbeddedDirectory, StartReport) {
    root.write_resource("ldif/users.ldif", fixtures::USERS_LDIF);
    let config = root
        .config()
        .ldif_pattern("ldif/*.ldif")
        .build()
        .expect("valid config");
    let directory = EmbeddedDirectory::new(config);
    let report = directory.start().await.expect("directory starts");
    (directory, report)
}

/// An entry store bound as the configured administrator.
pub fn entry_store(directory: &EmbeddedDirectory, report: &StartReport) -> LdapEntryStore {
    let config = directory.config();
    LdapEntryStore::new(
        report.local_addr.to_string(),
        config.suffix_dn().expect("suffix"),
        config.admin_dn.clone(),
        config.admin_password.clone(),
    )
    .with_timeout(Duration::from_secs(10))
}

/// A wire client bound as the configured administrator.
pub async fn admin_client(directory: &EmbeddedDirectory, report: &StartReport) -> LdapClient {
    let config = directory.config();
    let mut client = LdapClient::connect(&report.local_addr.to_string())
        .await
        .expect("connect");
    let result = client
        .simple_bind(&config.admin_dn, &config.admin_password)
        .await
        .expect("bind");
    assert!(result.code.is_success(), "admin bind failed: {result:?}");
    client
}
