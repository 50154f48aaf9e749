//! Post-startup data import.
//!
//! Two best-effort passes run once the listener accepts connections:
//!
//! 1. Schema fragments matched by the schema pattern are split into
//!    `attributetype` / `objectclass` blocks and added to `cn=schema` over the
//!    wire, bound as the administrator.
//! 2. LDIF files matched by the LDIF pattern are parsed and every entry is
//!    added through an in-process administrative session.
//!
//! Nothing here aborts startup. Every failure is logged and returned as an
//! [`ImportWarning`].

use crate::client::LdapClient;
use crate::config::ServiceConfig;
use crate::fs_util::resolve_pattern;
use crate::ldif::read_ldif_file;
use crate::protocol::{Modification, ModifyOperation, PartialAttribute};
use crate::schema::fragment::{BlockKind, parse_blocks};
use crate::schema::SUBSCHEMA_DN;
use crate::server::CoreSession;
use log::{debug, info, warn};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

/// A problem met during import that did not stop startup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportWarning {
    /// File (or pattern) the problem relates to.
    pub source: String,
    pub message: String,
}

impl ImportWarning {
    fn new(source: impl Into<String>, message: impl Into<String>) -> Self {
        let warning = Self {
            source: source.into(),
            message: message.into(),
        };
        warn!("Import: {}: {}", warning.source, warning.message);
        warning
    }
}

/// What the import passes did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub schema_elements: usize,
    pub entries_added: usize,
    /// Entries already present in the directory.
    pub entries_skipped: usize,
    pub entries_failed: usize,
    pub warnings: Vec<ImportWarning>,
}

#[derive(Debug, Clone)]
pub struct DataImporter {
    resource_root: PathBuf,
    schema_pattern: Option<String>,
    ldif_pattern: Option<String>,
    admin_dn: String,
    admin_password: String,
}

impl DataImporter {
    pub fn new(config: &ServiceConfig) -> Self {
        Self {
            resource_root: config
                .resource_root
                .clone()
                .unwrap_or_else(|| PathBuf::from(".")),
            schema_pattern: config.schema_pattern.clone(),
            ldif_pattern: config.ldif_pattern.clone(),
            admin_dn: config.admin_dn.clone(),
            admin_password: config.admin_password.clone(),
        }
    }

    /// Run the schema pass against the listener at `address`, then the entry
    /// pass through `session`.
    pub async fn run(&self, address: &str, session: &CoreSession) -> ImportReport {
        let mut report = ImportReport::default();
        self.import_schemas(address, &mut report).await;
        self.import_entries(session, &mut report);
        if report.schema_elements + report.entries_added > 0 {
            info!(
                "Imported {} schema element(s) and {} entr{}",
                report.schema_elements,
                report.entries_added,
                if report.entries_added == 1 { "y" } else { "ies" }
            );
        }
        report
    }

    pub async fn import_schemas(&self, address: &str, report: &mut ImportReport) {
        let Some(files) = self.resolve(self.schema_pattern.as_deref(), report) else {
            return;
        };

        // Connect lazily, only once there is something to send.
        let mut client: Option<LdapClient> = None;
        for file in files {
            let source = file.display().to_string();
            info!("Loading schema file: {}", source);
            let text = match fs::read_to_string(&file) {
                Ok(text) => text,
                Err(e) => {
                    report.warnings.push(ImportWarning::new(source, e.to_string()));
                    continue;
                }
            };

            if client.is_none() {
                match self.admin_client(address).await {
                    Ok(connected) => client = Some(connected),
                    Err(message) => {
                        report.warnings.push(ImportWarning::new(source, message));
                        return;
                    }
                }
            }
            let Some(client) = client.as_mut() else {
                return;
            };

            for block in parse_blocks(&text) {
                let location = format!("{source}:{}", block.line);
                let Some(attribute) = block.subschema_attribute() else {
                    if let BlockKind::Unknown(token) = &block.kind {
                        report.warnings.push(ImportWarning::new(
                            location,
                            format!("Unknown schema entry format '{token}'; skipped"),
                        ));
                    }
                    continue;
                };

                let change = Modification {
                    operation: ModifyOperation::Add,
                    attribute: PartialAttribute::new(attribute, [block.definition.clone()]),
                };
                match client.modify(SUBSCHEMA_DN, vec![change]).await {
                    Ok(result) if result.code.is_success() => {
                        debug!("Added schema element from {}", location);
                        report.schema_elements += 1;
                    }
                    Ok(result) => report.warnings.push(ImportWarning::new(
                        location,
                        format!("{}: {}", result.code, result.message),
                    )),
                    Err(e) => {
                        report.warnings.push(ImportWarning::new(location, e.to_string()));
                        return;
                    }
                }
            }
        }

        if let Some(client) = client
            && let Err(e) = client.unbind().await
        {
            debug!("Schema import connection did not close cleanly: {}", e);
        }
    }

    pub fn import_entries(&self, session: &CoreSession, report: &mut ImportReport) {
        let Some(files) = self.resolve(self.ldif_pattern.as_deref(), report) else {
            return;
        };

        for file in files {
            let source = file.display().to_string();
            info!("Loading LDIF file: {}", source);
            let entries = match read_ldif_file(&file) {
                Ok(entries) => entries,
                Err(e) => {
                    report.warnings.push(ImportWarning::new(source, e.to_string()));
                    continue;
                }
            };

            for entry in entries {
                let dn = entry.dn.clone();
                match session.exists(&dn) {
                    Ok(true) => {
                        debug!("{} already exists, skipping", dn);
                        report.entries_skipped += 1;
                        continue;
                    }
                    Ok(false) => {}
                    Err(e) => {
                        report.entries_failed += 1;
                        report
                            .warnings
                            .push(ImportWarning::new(&source, format!("{dn}: {e}")));
                        continue;
                    }
                }
                match session.add(entry) {
                    Ok(()) => report.entries_added += 1,
                    Err(e) => {
                        report.entries_failed += 1;
                        report
                            .warnings
                            .push(ImportWarning::new(&source, format!("{dn}: {e}")));
                    }
                }
            }
        }
    }

    /// Files matched by `pattern`; `None` when the pattern is unset or does
    /// not resolve.
    fn resolve(&self, pattern: Option<&str>, report: &mut ImportReport) -> Option<Vec<PathBuf>> {
        let pattern = pattern?;
        match resolve_pattern(&self.resource_root, pattern) {
            Ok(files) if files.is_empty() => {
                report.warnings.push(ImportWarning::new(
                    pattern,
                    format!("no files match below {}", display(&self.resource_root)),
                ));
                None
            }
            Ok(files) => Some(files),
            Err(e) => {
                report.warnings.push(ImportWarning::new(pattern, e.to_string()));
                None
            }
        }
    }

    async fn admin_client(&self, address: &str) -> Result<LdapClient, String> {
        let mut client = LdapClient::connect(address)
            .await
            .map_err(|e| e.to_string())?;
        let result = client
            .simple_bind(&self.admin_dn, &self.admin_password)
            .await
            .map_err(|e| e.to_string())?;
        if !result.code.is_success() {
            return Err(format!(
                "cannot bind as {}: {}: {}",
                self.admin_dn, result.code, result.message
            ));
        }
        Ok(client)
    }
}

fn display(path: &Path) -> String {
    path.display().to_string()
}
