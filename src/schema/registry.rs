//! Schema registry: every attribute type and object class known to the server.
//!
//! Definitions are keyed by OID and indexed by every lowercase name, so lookups
//! accept any alias (`cn`, `commonName`, `2.5.4.3`). References are validated
//! when a definition is registered: a superior, MUST or MAY element must already
//! be known.

use super::fragment::SchemaDefinition;
use super::loader::{SchemaFile, load_files};
use super::types::{AttributeTypeDefinition, ObjectClassDefinition};
use super::embedded;
use crate::error::SchemaError;
use indexmap::IndexMap;
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    attribute_types: IndexMap<String, AttributeTypeDefinition>,
    object_classes: IndexMap<String, ObjectClassDefinition>,
    attribute_names: HashMap<String, String>,
    class_names: HashMap<String, String>,
}

impl SchemaRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding every enabled built-in schema.
    pub fn with_builtin_schemas() -> Result<Self, Vec<SchemaError>> {
        let files = embedded::builtin_schemas()
            .into_iter()
            .map(|(name, text)| SchemaFile::parse(name, format!("builtin:{name}"), text))
            .collect();

        let mut registry = Self::new();
        let errors = load_files(&mut registry, files);
        if errors.is_empty() {
            Ok(registry)
        } else {
            Err(errors)
        }
    }

    pub fn attribute_type(&self, name: &str) -> Option<&AttributeTypeDefinition> {
        self.attribute_names
            .get(&name.to_ascii_lowercase())
            .and_then(|oid| self.attribute_types.get(oid))
    }

    pub fn object_class(&self, name: &str) -> Option<&ObjectClassDefinition> {
        self.class_names
            .get(&name.to_ascii_lowercase())
            .and_then(|oid| self.object_classes.get(oid))
    }

    pub fn attribute_types(&self) -> impl Iterator<Item = &AttributeTypeDefinition> {
        self.attribute_types.values()
    }

    pub fn object_classes(&self) -> impl Iterator<Item = &ObjectClassDefinition> {
        self.object_classes.values()
    }

    /// Primary name of the attribute type `name` refers to.
    pub fn canonical_attribute_name(&self, name: &str) -> Option<&str> {
        self.attribute_type(name)
            .map(AttributeTypeDefinition::primary_name)
    }

    /// Whether two attribute descriptions name the same attribute type.
    pub fn same_attribute(&self, a: &str, b: &str) -> bool {
        if a.eq_ignore_ascii_case(b) {
            return true;
        }
        match (self.attribute_type(a), self.attribute_type(b)) {
            (Some(a), Some(b)) => a.oid == b.oid,
            _ => false,
        }
    }

    pub fn is_operational(&self, name: &str) -> bool {
        self.attribute_type(name)
            .is_some_and(AttributeTypeDefinition::is_operational)
    }

    /// Equality rule of `name`, inherited from its superior when not declared.
    pub fn equality_rule(&self, name: &str) -> Option<&str> {
        let mut current = self.attribute_type(name);
        let mut seen = HashSet::new();
        while let Some(definition) = current {
            if !seen.insert(definition.oid.as_str()) {
                break;
            }
            if let Some(rule) = &definition.equality {
                return Some(rule.as_str());
            }
            current = definition
                .superior
                .as_deref()
                .and_then(|superior| self.attribute_type(superior));
        }
        None
    }

    /// Whether values of `name` compare case-sensitively.
    pub fn is_case_exact(&self, name: &str) -> bool {
        self.equality_rule(name).is_some_and(|rule| {
            let rule = rule.to_ascii_lowercase();
            rule.starts_with("caseexact") || rule == "octetstringmatch"
        })
    }

    /// The class itself followed by every transitive superior, each once.
    pub fn superior_chain(&self, class: &str) -> Vec<&ObjectClassDefinition> {
        let mut chain = Vec::new();
        let mut seen = HashSet::new();
        let mut pending = vec![class.to_string()];

        while let Some(name) = pending.pop() {
            let Some(definition) = self.object_class(&name) else {
                continue;
            };
            if !seen.insert(definition.oid.clone()) {
                continue;
            }
            chain.push(definition);
            pending.extend(definition.superiors.iter().rev().cloned());
        }
        chain
    }

    /// Primary names of every MUST attribute across the classes and their superiors.
    pub fn required_attributes<S: AsRef<str>>(&self, classes: &[S]) -> Vec<&str> {
        self.collect_attributes(classes, false)
    }

    /// Primary names of every MUST or MAY attribute across the classes and their superiors.
    pub fn allowed_attributes<S: AsRef<str>>(&self, classes: &[S]) -> Vec<&str> {
        self.collect_attributes(classes, true)
    }

    fn collect_attributes<S: AsRef<str>>(&self, classes: &[S], include_may: bool) -> Vec<&str> {
        let mut names = Vec::new();
        let mut seen = HashSet::new();
        for class in classes {
            for definition in self.superior_chain(class.as_ref()) {
                let may: &[String] = if include_may { &definition.may } else { &[] };
                for attribute in definition.must.iter().chain(may) {
                    let name = self.canonical_attribute_name(attribute).unwrap_or(attribute);
                    if seen.insert(name.to_ascii_lowercase()) {
                        names.push(name);
                    }
                }
            }
        }
        names
    }

    /// Register one parsed definition.
    pub fn register(&mut self, definition: SchemaDefinition) -> Result<(), SchemaError> {
        match definition {
            SchemaDefinition::AttributeType(definition) => self.register_attribute_type(definition),
            SchemaDefinition::ObjectClass(definition) => self.register_object_class(definition),
        }
    }

    pub fn register_attribute_type(
        &mut self,
        definition: AttributeTypeDefinition,
    ) -> Result<(), SchemaError> {
        self.check_attribute_type(&definition)?;
        let oid = definition.oid.clone();
        for key in keys_of(&definition.oid, &definition.names) {
            self.attribute_names.insert(key, oid.clone());
        }
        self.attribute_types.insert(oid, definition);
        Ok(())
    }

    pub fn register_object_class(
        &mut self,
        definition: ObjectClassDefinition,
    ) -> Result<(), SchemaError> {
        self.check_object_class(&definition)?;
        let oid = definition.oid.clone();
        for key in keys_of(&definition.oid, &definition.names) {
            self.class_names.insert(key, oid.clone());
        }
        self.object_classes.insert(oid, definition);
        Ok(())
    }

    /// Register definitions in whatever order lets their references resolve.
    ///
    /// Returns one error per definition that could not be registered.
    pub fn register_batch(&mut self, definitions: Vec<SchemaDefinition>) -> Vec<SchemaError> {
        let mut errors = Vec::new();
        let mut pending = definitions;

        loop {
            let before = pending.len();
            let mut retry = Vec::new();
            for definition in pending {
                match self.register(definition.clone()) {
                    Ok(()) => {}
                    Err(SchemaError::UnresolvedReference { .. }) => retry.push(definition),
                    Err(other) => errors.push(other),
                }
            }
            pending = retry;
            if pending.is_empty() || pending.len() == before {
                break;
            }
        }

        let stuck: HashMap<String, &ObjectClassDefinition> = pending
            .iter()
            .filter_map(|definition| match definition {
                SchemaDefinition::ObjectClass(class) => Some(class),
                SchemaDefinition::AttributeType(_) => None,
            })
            .flat_map(|class| {
                keys_of(&class.oid, &class.names)
                    .into_iter()
                    .map(move |key| (key, class))
            })
            .collect();

        for definition in &pending {
            if let SchemaDefinition::ObjectClass(class) = definition
                && has_cycle(class, &stuck)
            {
                errors.push(SchemaError::Cycle {
                    name: class.primary_name().to_string(),
                });
                continue;
            }
            let result = match definition {
                SchemaDefinition::AttributeType(attribute) => self.check_attribute_type(attribute),
                SchemaDefinition::ObjectClass(class) => self.check_object_class(class),
            };
            if let Err(error) = result {
                errors.push(error);
            }
        }
        errors
    }

    fn check_attribute_type(&self, definition: &AttributeTypeDefinition) -> Result<(), SchemaError> {
        for key in keys_of(&definition.oid, &definition.names) {
            if self.attribute_names.contains_key(&key) {
                return Err(SchemaError::Duplicate { name: key });
            }
        }
        if let Some(superior) = &definition.superior
            && self.attribute_type(superior).is_none()
        {
            return Err(SchemaError::UnresolvedReference {
                element: "attribute type",
                name: definition.primary_name().to_string(),
                reference_kind: "superior attribute type",
                reference: superior.clone(),
            });
        }
        Ok(())
    }

    fn check_object_class(&self, definition: &ObjectClassDefinition) -> Result<(), SchemaError> {
        for key in keys_of(&definition.oid, &definition.names) {
            if self.class_names.contains_key(&key) {
                return Err(SchemaError::Duplicate { name: key });
            }
        }
        let unresolved = |reference_kind: &'static str, reference: &String| {
            SchemaError::UnresolvedReference {
                element: "object class",
                name: definition.primary_name().to_string(),
                reference_kind,
                reference: reference.clone(),
            }
        };
        for superior in &definition.superiors {
            if self.object_class(superior).is_none() {
                return Err(unresolved("superior object class", superior));
            }
        }
        for attribute in definition.must.iter().chain(&definition.may) {
            if self.attribute_type(attribute).is_none() {
                return Err(unresolved("attribute type", attribute));
            }
        }
        Ok(())
    }
}

fn keys_of(oid: &str, names: &[String]) -> Vec<String> {
    std::iter::once(oid)
        .chain(names.iter().map(String::as_str))
        .map(str::to_ascii_lowercase)
        .collect()
}

/// Whether following superiors among unregistered classes leads back to `start`.
fn has_cycle(start: &ObjectClassDefinition, stuck: &HashMap<String, &ObjectClassDefinition>) -> bool {
    let mut pending: Vec<&str> = start.superiors.iter().map(String::as_str).collect();
    let mut seen = HashSet::new();
    while let Some(name) = pending.pop() {
        let Some(class) = stuck.get(&name.to_ascii_lowercase()) else {
            continue;
        };
        if class.oid == start.oid {
            return true;
        }
        if seen.insert(class.oid.as_str()) {
            pending.extend(class.superiors.iter().map(String::as_str));
        }
    }
    false
}
