//! Service configuration.
//!
//! [`ServiceConfig`] is built once, validated, and then only read. Hosts either
//! start from [`ServiceConfig::default`] and use the fluent
//! [`ServiceConfigBuilder`], or deserialize it from whatever format they keep
//! their settings in.
//!
//! # Examples
//!
//! ```rust
//! use embedded_directory::config::ServiceConfig;
//!
//! let config = ServiceConfig::builder()
//!     .port(0)
//!     .suffix("dc=acme,dc=test")
//!     .ldif_pattern("ldif/*.ldif")
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(config.suffix_dn().unwrap().to_string(), "dc=acme,dc=test");
//! ```

use crate::dn::Dn;
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const DEFAULT_ADDRESS: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 53389;
pub const DEFAULT_SUFFIX: &str = "dc=example,dc=com";
pub const DEFAULT_ADMIN_DN: &str = "uid=admin,ou=system";
pub const DEFAULT_ADMIN_PASSWORD: &str = "secret";

/// Everything the embedded directory needs to start.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Interface the listener binds to.
    pub address: String,

    /// Listener port. `0` picks an ephemeral port.
    pub port: u16,

    /// Naming context of the root partition.
    pub suffix: String,

    /// Explicit working directory. Must not exist yet.
    pub working_directory: Option<PathBuf>,

    /// Parent of generated working directories; the system temp dir when unset.
    pub temp_root: Option<PathBuf>,

    /// Directory that resource patterns are resolved against; the current
    /// directory when unset.
    pub resource_root: Option<PathBuf>,

    /// Glob selecting schema fragment files to import after startup.
    pub schema_pattern: Option<String>,

    /// Glob selecting LDIF files to import after startup.
    pub ldif_pattern: Option<String>,

    pub admin_dn: String,
    pub admin_password: String,

    /// Record every successful write in the in-memory change log.
    pub change_log_enabled: bool,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            address: DEFAULT_ADDRESS.to_string(),
            port: DEFAULT_PORT,
            suffix: DEFAULT_SUFFIX.to_string(),
            working_directory: None,
            temp_root: None,
            resource_root: None,
            schema_pattern: None,
            ldif_pattern: None,
            admin_dn: DEFAULT_ADMIN_DN.to_string(),
            admin_password: DEFAULT_ADMIN_PASSWORD.to_string(),
            change_log_enabled: false,
        }
    }
}

impl ServiceConfig {
    pub fn builder() -> ServiceConfigBuilder {
        ServiceConfigBuilder::new()
    }

    /// `address:port` as handed to the socket layer.
    pub fn listen_address(&self) -> String {
        if self.address.contains(':') && !self.address.starts_with('[') {
            format!("[{}]:{}", self.address, self.port)
        } else {
            format!("{}:{}", self.address, self.port)
        }
    }

    pub fn suffix_dn(&self) -> Result<Dn, ConfigError> {
        let dn = Dn::parse(&self.suffix).map_err(|e| ConfigError::new("suffix", e.to_string()))?;
        if dn.is_root() {
            return Err(ConfigError::new("suffix", "the root partition needs a non-empty suffix"));
        }
        Ok(dn)
    }

    pub fn admin_dn(&self) -> Result<Dn, ConfigError> {
        let dn =
            Dn::parse(&self.admin_dn).map_err(|e| ConfigError::new("admin_dn", e.to_string()))?;
        if dn.is_root() {
            return Err(ConfigError::new("admin_dn", "must not be empty"));
        }
        Ok(dn)
    }

    /// Check every value that could make startup fail halfway through.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.address.trim().is_empty() {
            return Err(ConfigError::new("address", "must not be empty"));
        }

        let suffix = self.suffix_dn()?;
        if suffix.is_within(&crate::partition::system_suffix()) {
            return Err(ConfigError::new(
                "suffix",
                "must not overlap the system partition ou=system",
            ));
        }

        let admin = self.admin_dn()?;
        if !admin.is_within(&crate::partition::system_suffix()) {
            return Err(ConfigError::new(
                "admin_dn",
                "the administrator entry lives in the system partition (below ou=system)",
            ));
        }
        if self.admin_password.is_empty() {
            return Err(ConfigError::new("admin_password", "must not be empty"));
        }

        for (parameter, pattern) in [
            ("schema_pattern", &self.schema_pattern),
            ("ldif_pattern", &self.ldif_pattern),
        ] {
            if let Some(pattern) = pattern {
                globset::Glob::new(pattern)
                    .map_err(|e| ConfigError::new(parameter, e.to_string()))?;
            }
        }

        Ok(())
    }
}

/// Fluent builder for [`ServiceConfig`].
#[derive(Debug, Clone, Default)]
pub struct ServiceConfigBuilder {
    config: ServiceConfig,
}

impl ServiceConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn address(mut self, address: impl Into<String>) -> Self {
        self.config.address = address.into();
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    pub fn suffix(mut self, suffix: impl Into<String>) -> Self {
        self.config.suffix = suffix.into();
        self
    }

    pub fn working_directory(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.working_directory = Some(path.into());
        self
    }

    pub fn temp_root(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.temp_root = Some(path.into());
        self
    }

    pub fn resource_root(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.resource_root = Some(path.into());
        self
    }

    pub fn schema_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.config.schema_pattern = Some(pattern.into());
        self
    }

    pub fn ldif_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.config.ldif_pattern = Some(pattern.into());
        self
    }

    pub fn admin_credentials(mut self, dn: impl Into<String>, password: impl Into<String>) -> Self {
        self.config.admin_dn = dn.into();
        self.config.admin_password = password.into();
        self
    }

    pub fn change_log(mut self, enabled: bool) -> Self {
        self.config.change_log_enabled = enabled;
        self
    }

    /// Validate and return the configuration.
    pub fn build(self) -> Result<ServiceConfig, ConfigError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
