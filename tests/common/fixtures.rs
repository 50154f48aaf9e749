//! Resource files written into per-test resource roots.

/// The `ou=users` container and two people below the default suffix.
pub const USERS_LDIF: &str = "\
version: 1

dn: ou=users,dc=example,dc=com
objectClass: top
objectClass: organizationalUnit
ou: users

# a record the entry store can read back
dn: uid=carol,ou=users,dc=example,dc=com
objectClass: specialUser
objectClass: inetOrgPerson
objectClass: organizationalPerson
objectClass: person
objectClass: top
cn: carol
sn: carol
special: preloaded

dn: uid=dave,ou=users,dc=example,dc=com
objectClass: inetOrgPerson
objectClass: organizationalPerson
objectClass: person
objectClass: top
cn: Dave
sn: Smith
description:: bXVsdGktbGluZQpkZXNjcmlwdGlvbg==
";

/// Entries that collide with context entries created at startup.
pub const CONTEXT_LDIF: &str = "\
dn: dc=example,dc=com
objectClass: top
objectClass: domain
dc: example

dn: ou=system
objectClass: top
objectClass: organizationalUnit
ou: system
";

/// One auxiliary class with one attribute, plus a block the importer cannot use.
pub const COLOURS_SCHEMA: &str = "\
# schema: colours
# depends: core

attributetype ( 1.3.6.1.4.1.32473.9.1
    NAME 'favouriteColour'
    EQUALITY caseIgnoreMatch
    SYNTAX 1.3.6.1.4.1.1466.115.121.1.15 )

objectclass ( 1.3.6.1.4.1.32473.9.2 NAME 'colourful'
    SUP top AUXILIARY
    MAY favouriteColour )

ditcontentrule ( 2.5.6.6 NAME 'person' )
";
