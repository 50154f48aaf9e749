//! First step of service startup: materialize the built-in schema files,
//! load them and hand the resulting registry to the schema partition.

use super::embedded;
use super::loader::{SCHEMA_EXTENSION, SchemaLoader};
use super::registry::SchemaRegistry;
use crate::error::{LifecycleError, LifecycleResult, SchemaError};
use log::{debug, info};
use parking_lot::RwLock;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// DN of the subschema entry.
pub const SUBSCHEMA_DN: &str = "cn=schema";

/// The loaded schema, shared between the directory service and its sessions.
///
/// Definitions added at runtime through `cn=schema` go into the registry only;
/// the files on disk are not rewritten.
#[derive(Debug, Clone)]
pub struct SchemaPartition {
    directory: PathBuf,
    registry: Arc<RwLock<SchemaRegistry>>,
}

impl SchemaPartition {
    pub fn new(directory: impl Into<PathBuf>, registry: SchemaRegistry) -> Self {
        Self {
            directory: directory.into(),
            registry: Arc::new(RwLock::new(registry)),
        }
    }

    /// Directory the schema files were loaded from.
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn registry(&self) -> Arc<RwLock<SchemaRegistry>> {
        Arc::clone(&self.registry)
    }
}

#[derive(Debug, Clone)]
pub struct SchemaBootstrapper {
    schema_dir: PathBuf,
}

impl SchemaBootstrapper {
    /// Bootstrap into `<working_dir>/schema`.
    pub fn new(working_dir: &Path) -> Self {
        Self {
            schema_dir: working_dir.join("schema"),
        }
    }

    pub fn schema_dir(&self) -> &Path {
        &self.schema_dir
    }

    /// Write any built-in schema file that is not already on disk.
    ///
    /// Returns the names of the files written.
    pub fn extract(&self) -> Result<Vec<String>, SchemaError> {
        fs::create_dir_all(&self.schema_dir).map_err(|e| SchemaError::io(&self.schema_dir, &e))?;

        let mut written = Vec::new();
        for (name, text) in embedded::builtin_schemas() {
            let path = self
                .schema_dir
                .join(format!("{name}.{SCHEMA_EXTENSION}"));
            if path.exists() {
                debug!("Schema file {} already present, keeping it", path.display());
                continue;
            }
            fs::write(&path, text).map_err(|e| SchemaError::io(&path, &e))?;
            written.push(name.to_string());
        }
        Ok(written)
    }

    /// Extract, load every enabled schema and build the schema partition.
    pub fn bootstrap(&self) -> LifecycleResult<SchemaPartition> {
        let written = self.extract().map_err(|error| LifecycleError::SchemaLoadFailed {
            errors: vec![error],
        })?;
        if !written.is_empty() {
            debug!("Extracted schema files: {}", written.join(", "));
        }

        let loader = SchemaLoader::new(&self.schema_dir);
        let mut registry = SchemaRegistry::new();
        let errors = loader.load_all_enabled(&mut registry);
        if !errors.is_empty() {
            return Err(LifecycleError::SchemaLoadFailed { errors });
        }

        info!(
            "Schema loaded: {} attribute types, {} object classes",
            registry.attribute_types().count(),
            registry.object_classes().count()
        );
        Ok(SchemaPartition::new(loader.directory(), registry))
    }
}
