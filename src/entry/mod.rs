//! Directory entries and their attribute sets.
//!
//! [`Attributes`] is an insertion-ordered multimap keyed case-insensitively by
//! attribute name. The name is kept in the case it was first written so that
//! entries read back over the wire look the way they were stored.

pub mod codec;
pub mod record;

pub use codec::{decode, encode};
pub use record::DomainRecord;

use crate::dn::{Dn, normalize_value};
use crate::protocol::PartialAttribute;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One attribute with its values, in insertion order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    pub name: String,
    pub values: Vec<String>,
}

/// Attribute multimap keyed by lowercase attribute name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Attributes {
    inner: IndexMap<String, Attribute>,
}

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Attribute> {
        self.inner.get(&name.to_ascii_lowercase())
    }

    /// All values of `name`, or an empty slice when absent.
    pub fn values(&self, name: &str) -> &[String] {
        self.get(name)
            .map(|attribute| attribute.values.as_slice())
            .unwrap_or_default()
    }

    pub fn first(&self, name: &str) -> Option<&str> {
        self.values(name).first().map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.inner.contains_key(&name.to_ascii_lowercase())
    }

    /// Whether `name` holds `value` under case- and whitespace-insensitive matching.
    pub fn has_value(&self, name: &str, value: &str) -> bool {
        let wanted = normalize_value(value);
        self.values(name)
            .iter()
            .any(|existing| normalize_value(existing) == wanted)
    }

    /// Append a value, returning `false` if an equal value is already present.
    pub fn add_value(&mut self, name: &str, value: impl Into<String>) -> bool {
        let value = value.into();
        if self.has_value(name, &value) {
            return false;
        }
        self.inner
            .entry(name.to_ascii_lowercase())
            .or_insert_with(|| Attribute {
                name: name.to_string(),
                values: Vec::new(),
            })
            .values
            .push(value);
        true
    }

    /// Replace every value of `name`. An empty value list removes the attribute.
    pub fn set<I, V>(&mut self, name: &str, values: I)
    where
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        let values: Vec<String> = values.into_iter().map(Into::into).collect();
        let key = name.to_ascii_lowercase();
        if values.is_empty() {
            self.inner.shift_remove(&key);
            return;
        }
        match self.inner.get_mut(&key) {
            Some(existing) => existing.values = values,
            None => {
                self.inner.insert(
                    key,
                    Attribute {
                        name: name.to_string(),
                        values,
                    },
                );
            }
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<Attribute> {
        self.inner.shift_remove(&name.to_ascii_lowercase())
    }

    /// Remove one value, dropping the attribute when it becomes empty.
    pub fn remove_value(&mut self, name: &str, value: &str) -> bool {
        let key = name.to_ascii_lowercase();
        let wanted = normalize_value(value);
        let Some(attribute) = self.inner.get_mut(&key) else {
            return false;
        };
        let before = attribute.values.len();
        attribute
            .values
            .retain(|existing| normalize_value(existing) != wanted);
        let removed = attribute.values.len() != before;
        if attribute.values.is_empty() {
            self.inner.shift_remove(&key);
        }
        removed
    }

    pub fn iter(&self) -> impl Iterator<Item = &Attribute> {
        self.inner.values()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn to_partial_attributes(&self) -> Vec<PartialAttribute> {
        self.iter()
            .map(|attribute| PartialAttribute::new(attribute.name.clone(), attribute.values.clone()))
            .collect()
    }
}

impl From<Vec<PartialAttribute>> for Attributes {
    fn from(list: Vec<PartialAttribute>) -> Self {
        let mut attributes = Attributes::new();
        for partial in list {
            for value in partial.values {
                attributes.add_value(&partial.name, value);
            }
        }
        attributes
    }
}

/// A named set of attributes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryEntry {
    pub dn: Dn,
    pub attributes: Attributes,
}

impl DirectoryEntry {
    pub fn new(dn: Dn) -> Self {
        Self {
            dn,
            attributes: Attributes::new(),
        }
    }

    pub fn with_attribute<I, V>(mut self, name: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        self.attributes.set(name, values);
        self
    }

    /// Move the entry from a relative DN to one beneath `base`.
    pub fn relocate(mut self, base: &Dn) -> Self {
        self.dn = self.dn.join(base);
        self
    }

    pub fn object_classes(&self) -> &[String] {
        self.attributes.values("objectClass")
    }

    pub fn has_object_class(&self, name: &str) -> bool {
        self.attributes.has_value("objectClass", name)
    }
}

/// Read-only, case-insensitive access to attribute values.
pub trait AttributeLookup {
    fn lookup(&self, name: &str) -> Option<&[String]>;
}

impl AttributeLookup for Attributes {
    fn lookup(&self, name: &str) -> Option<&[String]> {
        self.get(name).map(|attribute| attribute.values.as_slice())
    }
}

impl AttributeLookup for DirectoryEntry {
    fn lookup(&self, name: &str) -> Option<&[String]> {
        self.attributes.lookup(name)
    }
}

impl AttributeLookup for HashMap<String, Vec<String>> {
    fn lookup(&self, name: &str) -> Option<&[String]> {
        self.get(name)
            .or_else(|| {
                self.iter()
                    .find(|(key, _)| key.eq_ignore_ascii_case(name))
                    .map(|(_, values)| values)
            })
            .map(Vec::as_slice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_are_case_insensitive_but_preserved() {
        let mut attributes = Attributes::new();
        attributes.add_value("objectClass", "top");
        attributes.add_value("OBJECTCLASS", "person");

        assert_eq!(attributes.len(), 1);
        assert_eq!(attributes.get("objectclass").unwrap().name, "objectClass");
        assert_eq!(attributes.values("ObjectClass"), ["top", "person"]);
    }

    #[test]
    fn test_duplicate_values_are_not_added() {
        let mut attributes = Attributes::new();
        assert!(attributes.add_value("cn", "Alice  Smith"));
        assert!(!attributes.add_value("cn", "alice smith"));
        assert!(attributes.has_value("CN", "ALICE SMITH"));
        assert_eq!(attributes.values("cn").len(), 1);
    }

    #[test]
    fn test_insertion_order_survives_removal() {
        let mut attributes = Attributes::new();
        attributes.set("objectClass", ["top"]);
        attributes.set("cn", ["a"]);
        attributes.set("sn", ["b"]);
        attributes.remove("cn");
        attributes.set("special", ["c"]);

        let names: Vec<_> = attributes.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, ["objectClass", "sn", "special"]);
    }

    #[test]
    fn test_remove_last_value_drops_attribute() {
        let mut attributes = Attributes::new();
        attributes.set("mail", ["a@example.com", "b@example.com"]);
        assert!(attributes.remove_value("mail", "A@example.com"));
        assert!(attributes.contains("mail"));
        assert!(attributes.remove_value("mail", "b@example.com"));
        assert!(!attributes.contains("mail"));
        assert!(!attributes.remove_value("mail", "b@example.com"));
    }

    #[test]
    fn test_hash_map_lookup_falls_back_to_case_insensitive() {
        let mut map = HashMap::new();
        map.insert("CN".to_string(), vec!["alice".to_string()]);
        assert_eq!(map.lookup("cn").unwrap(), ["alice"]);
        assert!(map.lookup("sn").is_none());
    }

    #[test]
    fn test_entry_serde_round_trip() {
        let entry = DirectoryEntry::new(Dn::parse("uid=a,ou=users").unwrap())
            .with_attribute("objectClass", ["top", "person"])
            .with_attribute("cn", ["a"]);
        let json = serde_json::to_string(&entry).unwrap();
        let back: DirectoryEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(back, entry);
    }
}
