//! Schema enforcement for entries about to be written.

use super::errors::{OperationError, OperationResult};
use crate::entry::{Attributes, DirectoryEntry};
use crate::schema::{ObjectClassKind, SchemaRegistry};

/// Rename attributes written under an alias (`surname`) to the primary name
/// (`sn`), merging values when both spellings were used. Names that differ
/// from the primary name only in case keep the case they were written in.
pub fn canonicalize_names(entry: &mut DirectoryEntry, registry: &SchemaRegistry) {
    let mut canonical = Attributes::new();
    for attribute in entry.attributes.iter() {
        let name = match registry.canonical_attribute_name(&attribute.name) {
            Some(primary) if !primary.eq_ignore_ascii_case(&attribute.name) => primary,
            _ => attribute.name.as_str(),
        };
        let mut values = canonical.values(name).to_vec();
        values.extend(attribute.values.iter().cloned());
        canonical.set(name, values);
    }
    entry.attributes = canonical;
}

/// Name under which `entry` stores `attribute`, or the attribute's primary
/// name when the entry does not hold it yet.
pub fn stored_name(entry: &DirectoryEntry, attribute: &str, registry: &SchemaRegistry) -> String {
    entry
        .attributes
        .iter()
        .find(|stored| registry.same_attribute(&stored.name, attribute))
        .map(|stored| stored.name.clone())
        .or_else(|| registry.canonical_attribute_name(attribute).map(str::to_string))
        .unwrap_or_else(|| attribute.to_string())
}

/// Make sure every RDN value is also an attribute value.
pub fn add_rdn_attributes(entry: &mut DirectoryEntry, registry: &SchemaRegistry) {
    let Some(rdn) = entry.dn.rdn().cloned() else {
        return;
    };
    for ava in rdn.avas() {
        let name = stored_name(entry, ava.attribute(), registry);
        entry.attributes.add_value(&name, ava.value());
    }
}

/// Whether every RDN value is still present on `entry`.
pub fn check_rdn_values(entry: &DirectoryEntry, registry: &SchemaRegistry) -> OperationResult<()> {
    let Some(rdn) = entry.dn.rdn() else {
        return Ok(());
    };
    for ava in rdn.avas() {
        let name = stored_name(entry, ava.attribute(), registry);
        if !entry.attributes.has_value(&name, ava.value()) {
            return Err(OperationError::not_allowed_on_rdn(format!(
                "Cannot remove RDN value {}={}",
                ava.attribute(),
                ava.value()
            )));
        }
    }
    Ok(())
}

/// Validate object classes, MUST and MAY attributes and single-valued
/// attributes against the registry.
pub fn check_entry(entry: &DirectoryEntry, registry: &SchemaRegistry) -> OperationResult<()> {
    let classes = entry.object_classes();
    if classes.is_empty() {
        return Err(OperationError::object_class_violation(format!(
            "Entry {} has no objectClass",
            entry.dn
        )));
    }

    let mut structural = false;
    let mut extensible = false;
    for class in classes {
        let Some(definition) = registry.object_class(class) else {
            return Err(OperationError::object_class_violation(format!(
                "Unknown object class '{class}'"
            )));
        };
        structural |= definition.kind == ObjectClassKind::Structural;
        extensible |= definition.primary_name().eq_ignore_ascii_case("extensibleObject");
    }
    if !structural {
        return Err(OperationError::object_class_violation(format!(
            "Entry {} has no structural object class",
            entry.dn
        )));
    }

    for required in registry.required_attributes(classes) {
        let present = entry
            .attributes
            .iter()
            .any(|attribute| registry.same_attribute(&attribute.name, required));
        if !present {
            return Err(OperationError::object_class_violation(format!(
                "Entry {} is missing required attribute '{required}'",
                entry.dn
            )));
        }
    }

    let allowed = registry.allowed_attributes(classes);
    for attribute in entry.attributes.iter() {
        let Some(definition) = registry.attribute_type(&attribute.name) else {
            return Err(OperationError::undefined_attribute_type(&attribute.name));
        };
        if definition.single_value && attribute.values.len() > 1 {
            return Err(OperationError::constraint_violation(format!(
                "Attribute '{}' is single-valued",
                attribute.name
            )));
        }
        if definition.is_operational() || extensible {
            continue;
        }
        let permitted = allowed
            .iter()
            .any(|name| registry.same_attribute(name, &attribute.name));
        if !permitted {
            return Err(OperationError::object_class_violation(format!(
                "Attribute '{}' is not allowed by the object classes of {}",
                attribute.name, entry.dn
            )));
        }
    }

    Ok(())
}
