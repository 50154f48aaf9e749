//! Directory schema: definitions, parsing, the registry and its bootstrap.
//!
//! # Key Types
//!
//! - [`SchemaRegistry`] - every attribute type and object class, with typed lookups
//! - [`SchemaLoader`] - reads `*.schema` files honouring their `depends`/`disabled` headers
//! - [`SchemaBootstrapper`] - extracts the built-in files and builds the [`SchemaPartition`]
//!
//! # Examples
//!
//! ```rust
//! use embedded_directory::schema::SchemaRegistry;
//!
//! let registry = SchemaRegistry::with_builtin_schemas().unwrap();
//! let required = registry.required_attributes(&["specialUser"]);
//! assert!(required.contains(&"cn"));
//! assert!(required.contains(&"sn"));
//! ```

pub mod bootstrap;
pub mod embedded;
pub mod fragment;
pub mod loader;
pub mod parser;
pub mod registry;
pub mod types;

#[cfg(test)]
mod tests;

pub use bootstrap::{SUBSCHEMA_DN, SchemaBootstrapper, SchemaPartition};
pub use fragment::{BlockKind, SchemaBlock, SchemaDefinition, parse_blocks};
pub use loader::{SchemaFile, SchemaLoader};
pub use registry::SchemaRegistry;
pub use types::{AttributeTypeDefinition, AttributeUsage, ObjectClassDefinition, ObjectClassKind};
