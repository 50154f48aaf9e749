//! Virtual entries: the root DSE and the `cn=schema` subschema subentry.
//!
//! Neither is stored in a partition. Both are rebuilt on every read, so schema
//! elements registered at runtime show up immediately.

use crate::dn::Dn;
use crate::entry::DirectoryEntry;
use crate::schema::{SUBSCHEMA_DN, SchemaRegistry};

pub const VENDOR_NAME: &str = "embedded-directory";

pub fn subschema_dn() -> Dn {
    Dn::from_rdns(vec![crate::dn::Rdn::new("cn", "schema")])
}

/// The root DSE, listing `naming_contexts`.
pub fn root_dse(naming_contexts: &[Dn]) -> DirectoryEntry {
    DirectoryEntry::new(Dn::root())
        .with_attribute("objectClass", ["top", "extensibleObject"])
        .with_attribute("namingContexts", naming_contexts.iter().map(ToString::to_string))
        .with_attribute("subschemaSubentry", [SUBSCHEMA_DN])
        .with_attribute("supportedLDAPVersion", ["3"])
        .with_attribute("vendorName", [VENDOR_NAME])
        .with_attribute("vendorVersion", [env!("CARGO_PKG_VERSION")])
}

/// The subschema subentry publishing every registered definition.
pub fn subschema_entry(registry: &SchemaRegistry) -> DirectoryEntry {
    DirectoryEntry::new(subschema_dn())
        .with_attribute("objectClass", ["top", "subschema"])
        .with_attribute("cn", ["schema"])
        .with_attribute(
            "attributeTypes",
            registry.attribute_types().map(ToString::to_string),
        )
        .with_attribute(
            "objectClasses",
            registry.object_classes().map(ToString::to_string),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_dse_lists_naming_contexts() {
        let contexts = [
            Dn::parse("ou=system").unwrap(),
            Dn::parse("dc=example,dc=com").unwrap(),
        ];
        let dse = root_dse(&contexts);
        assert!(dse.dn.is_root());
        assert_eq!(
            dse.attributes.values("namingContexts"),
            ["ou=system", "dc=example,dc=com"]
        );
        assert_eq!(dse.attributes.first("subschemaSubentry"), Some("cn=schema"));
    }

    #[test]
    fn test_subschema_entry_publishes_harness_schema() {
        let registry = SchemaRegistry::with_builtin_schemas().unwrap();
        let entry = subschema_entry(&registry);
        assert_eq!(entry.dn, subschema_dn());
        assert!(entry
            .attributes
            .values("objectClasses")
            .iter()
            .any(|value| value.contains("NAME 'specialUser'")));
        assert!(entry
            .attributes
            .values("attributeTypes")
            .iter()
            .any(|value| value.contains("NAME 'special'")));
    }
}
