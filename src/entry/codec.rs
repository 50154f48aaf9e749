//! Mapping between [`DomainRecord`] and [`DirectoryEntry`].
//!
//! A record is stored as an `inetOrgPerson` subclass named by `uid`:
//!
//! ```text
//! dn: uid=<username>,ou=users
//! objectClass: specialUser
//! objectClass: inetOrgPerson
//! objectClass: organizationalPerson
//! objectClass: person
//! objectClass: top
//! cn: <username>
//! sn: <username>
//! special: <payload>
//! ```
//!
//! `sn` is only written because `person` requires it; decoding reads `cn`
//! and `special` and ignores everything else.

use super::{AttributeLookup, DirectoryEntry, DomainRecord};
use crate::dn::user_dn;
use crate::error::MappingError;

/// Object classes written on every encoded entry, most specific first.
pub const OBJECT_CLASSES: [&str; 5] = [
    "specialUser",
    "inetOrgPerson",
    "organizationalPerson",
    "person",
    "top",
];

pub const ATTR_OBJECT_CLASS: &str = "objectClass";
pub const ATTR_CN: &str = "cn";
pub const ATTR_SN: &str = "sn";
pub const ATTR_SPECIAL: &str = "special";

/// Encode a record into an entry whose DN is relative to the base DN.
pub fn encode(record: &DomainRecord) -> Result<DirectoryEntry, MappingError> {
    let dn = user_dn(record.username())?;

    if record.special().is_empty() {
        return Err(MappingError::encoding(
            "'special' must contain at least one character",
        ));
    }
    for (field, value) in [("username", record.username()), ("special", record.special())] {
        if value.contains('\0') {
            return Err(MappingError::encoding(format!(
                "'{field}' contains a NUL character"
            )));
        }
    }

    Ok(DirectoryEntry::new(dn)
        .with_attribute(ATTR_OBJECT_CLASS, OBJECT_CLASSES)
        .with_attribute(ATTR_CN, [record.username()])
        .with_attribute(ATTR_SN, [record.username()])
        .with_attribute(ATTR_SPECIAL, [record.special()]))
}

/// Decode a record from any attribute source, reading only `cn` and `special`.
pub fn decode(entry: &impl AttributeLookup) -> Result<DomainRecord, MappingError> {
    let username = single_value(entry, ATTR_CN)?;
    let special = single_value(entry, ATTR_SPECIAL)?;
    Ok(DomainRecord::new(username, special))
}

fn single_value(entry: &impl AttributeLookup, name: &str) -> Result<String, MappingError> {
    match entry.lookup(name) {
        None | Some([]) => Err(MappingError::missing_attribute(name)),
        Some([value]) => Ok(value.clone()),
        Some(values) => Err(MappingError::decoding(format!(
            "'{name}' holds {} values, expected exactly one",
            values.len()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::Attributes;
    use proptest::prelude::*;

    #[test]
    fn test_encode_layout() {
        let entry = encode(&DomainRecord::new("alice", "s3cret")).unwrap();

        assert_eq!(entry.dn.to_string(), "uid=alice,ou=users");
        assert_eq!(entry.object_classes(), OBJECT_CLASSES);
        assert_eq!(entry.attributes.values("cn"), ["alice"]);
        assert_eq!(entry.attributes.values("sn"), ["alice"]);
        assert_eq!(entry.attributes.values("special"), ["s3cret"]);

        let names: Vec<_> = entry.attributes.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, ["objectClass", "cn", "sn", "special"]);
    }

    #[test]
    fn test_encode_rejects_unrepresentable_values() {
        assert!(matches!(
            encode(&DomainRecord::new("alice", "")),
            Err(MappingError::Encoding { .. })
        ));
        assert!(matches!(
            encode(&DomainRecord::new("alice", "a\0b")),
            Err(MappingError::Encoding { .. })
        ));
        assert!(matches!(
            encode(&DomainRecord::new("al\0ice", "x")),
            Err(MappingError::Encoding { .. })
        ));
        assert!(matches!(
            encode(&DomainRecord::new("", "x")),
            Err(MappingError::InvalidIdentifier { .. })
        ));
    }

    #[test]
    fn test_decode_ignores_sn_and_extra_attributes() {
        let mut attributes = Attributes::new();
        attributes.set("CN", ["bob"]);
        attributes.set("sn", ["something else"]);
        attributes.set("mail", ["bob@example.com"]);
        attributes.set("Special", ["payload"]);

        assert_eq!(
            decode(&attributes).unwrap(),
            DomainRecord::new("bob", "payload")
        );
    }

    #[test]
    fn test_decode_missing_and_multi_valued() {
        let mut attributes = Attributes::new();
        attributes.set("cn", ["bob"]);
        assert_eq!(
            decode(&attributes),
            Err(MappingError::missing_attribute("special"))
        );

        attributes.set("special", ["one", "two"]);
        assert!(matches!(
            decode(&attributes),
            Err(MappingError::Decoding { .. })
        ));
    }

    proptest! {
        #[test]
        fn test_decode_inverts_encode(
            username in "[^\\x00]{1,24}",
            special in "[^\\x00]{1,64}",
        ) {
            prop_assume!(!username.chars().all(char::is_whitespace));
            let record = DomainRecord::new(username, special);
            let entry = encode(&record).unwrap();
            prop_assert_eq!(decode(&entry).unwrap(), record);
        }
    }
}
