//! Loads schema files from a directory into a [`SchemaRegistry`].

use super::fragment::{BlockKind, parse_blocks};
use super::registry::SchemaRegistry;
use crate::error::SchemaError;
use log::{debug, info};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

/// File extension of schema files.
pub const SCHEMA_EXTENSION: &str = "schema";

/// One schema file with its header fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaFile {
    pub name: String,
    pub depends: Vec<String>,
    pub disabled: bool,
    /// Where the text came from, for error messages.
    pub source: String,
    pub text: String,
}

impl SchemaFile {
    /// Read the `# schema:`, `# depends:` and `# disabled:` headers.
    ///
    /// `default_name` is used when the file has no `# schema:` header.
    pub fn parse(default_name: &str, source: impl Into<String>, text: impl Into<String>) -> Self {
        let text = text.into();
        let mut file = Self {
            name: default_name.to_string(),
            depends: Vec::new(),
            disabled: false,
            source: source.into(),
            text: String::new(),
        };

        for line in text.lines() {
            let Some(comment) = line.trim().strip_prefix('#') else {
                continue;
            };
            let Some((key, value)) = comment.split_once(':') else {
                continue;
            };
            let value = value.trim();
            match key.trim().to_ascii_lowercase().as_str() {
                "schema" => file.name = value.to_string(),
                "depends" => {
                    file.depends = value
                        .split(',')
                        .map(str::trim)
                        .filter(|dependency| !dependency.is_empty())
                        .map(str::to_string)
                        .collect();
                }
                "disabled" => file.disabled = value.eq_ignore_ascii_case("true"),
                _ => {}
            }
        }
        file.text = text;
        file
    }
}

/// Reads every `*.schema` file of a directory.
#[derive(Debug, Clone)]
pub struct SchemaLoader {
    directory: PathBuf,
}

impl SchemaLoader {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// All schema files in the directory, sorted by file name.
    pub fn read_files(&self) -> Result<Vec<SchemaFile>, SchemaError> {
        let entries =
            fs::read_dir(&self.directory).map_err(|e| SchemaError::io(&self.directory, &e))?;

        let mut paths = Vec::new();
        for entry in entries {
            let path = entry
                .map_err(|e| SchemaError::io(&self.directory, &e))?
                .path();
            if path.extension().is_some_and(|ext| ext == SCHEMA_EXTENSION) {
                paths.push(path);
            }
        }
        paths.sort();

        paths
            .into_iter()
            .map(|path| {
                let text = fs::read_to_string(&path).map_err(|e| SchemaError::io(&path, &e))?;
                let stem = path
                    .file_stem()
                    .map(|stem| stem.to_string_lossy().into_owned())
                    .unwrap_or_default();
                Ok(SchemaFile::parse(&stem, path.display().to_string(), text))
            })
            .collect()
    }

    /// Load every enabled schema, dependencies first.
    ///
    /// Returns every error encountered; an empty list means the registry holds
    /// all enabled schemas.
    pub fn load_all_enabled(&self, registry: &mut SchemaRegistry) -> Vec<SchemaError> {
        match self.read_files() {
            Ok(files) => load_files(registry, files),
            Err(error) => vec![error],
        }
    }
}

/// Order enabled files so that every dependency precedes its dependents, then
/// register their definitions.
pub fn load_files(registry: &mut SchemaRegistry, files: Vec<SchemaFile>) -> Vec<SchemaError> {
    let mut errors = Vec::new();
    let (enabled, disabled): (Vec<_>, Vec<_>) = files.into_iter().partition(|file| !file.disabled);
    for file in &disabled {
        debug!("Skipping disabled schema '{}'", file.name);
    }

    let mut remaining: HashMap<String, SchemaFile> = HashMap::new();
    let mut order: Vec<String> = Vec::new();
    for file in enabled {
        let key = file.name.to_ascii_lowercase();
        if remaining.contains_key(&key) {
            errors.push(SchemaError::Duplicate { name: file.name });
            continue;
        }
        order.push(key.clone());
        remaining.insert(key, file);
    }

    // A dependency that is not enabled at all can never be satisfied.
    let known: HashSet<String> = remaining.keys().cloned().collect();
    let mut blocked = HashSet::new();
    for key in &order {
        let file = &remaining[key];
        for dependency in &file.depends {
            if !known.contains(&dependency.to_ascii_lowercase()) {
                errors.push(SchemaError::MissingDependency {
                    schema: file.name.clone(),
                    dependency: dependency.clone(),
                });
                blocked.insert(key.clone());
            }
        }
    }

    let mut loaded: HashSet<String> = HashSet::new();
    loop {
        let ready: Vec<String> = order
            .iter()
            .filter(|key| remaining.contains_key(*key) && !blocked.contains(*key))
            .filter(|key| {
                remaining[*key]
                    .depends
                    .iter()
                    .all(|dependency| loaded.contains(&dependency.to_ascii_lowercase()))
            })
            .cloned()
            .collect();
        if ready.is_empty() {
            break;
        }

        for key in ready {
            let Some(file) = remaining.remove(&key) else {
                continue;
            };
            errors.extend(load_file(registry, &file));
            info!("Loaded schema '{}'", file.name);
            loaded.insert(key);
        }
    }

    for key in order {
        if let Some(file) = remaining.remove(&key)
            && !blocked.contains(&key)
        {
            // Only reachable through a dependency cycle or a blocked dependency.
            let dependency = file
                .depends
                .iter()
                .find(|dependency| !loaded.contains(&dependency.to_ascii_lowercase()))
                .cloned()
                .unwrap_or_default();
            errors.push(SchemaError::MissingDependency {
                schema: file.name,
                dependency,
            });
        }
    }
    errors
}

fn load_file(registry: &mut SchemaRegistry, file: &SchemaFile) -> Vec<SchemaError> {
    let mut errors = Vec::new();
    let mut definitions = Vec::new();

    for block in parse_blocks(&file.text) {
        match block.parse(&file.source) {
            Some(Ok(definition)) => definitions.push(definition),
            Some(Err(error)) => errors.push(error),
            None => errors.push(SchemaError::parse(
                format!("{}:{}", file.source, block.line),
                format!("unknown schema element '{}'", block_token(&block.kind)),
            )),
        }
    }

    debug!(
        "Registering {} definitions from schema '{}'",
        definitions.len(),
        file.name
    );
    errors.extend(registry.register_batch(definitions));
    errors
}

fn block_token(kind: &BlockKind) -> &str {
    match kind {
        BlockKind::AttributeType => "attributetype",
        BlockKind::ObjectClass => "objectclass",
        BlockKind::Unknown(token) => token,
    }
}
