//! Built-in schema files.
//!
//! Each schema is an OpenLDAP-style file with a small header:
//!
//! ```text
//! # schema: <name>
//! # depends: <name>, <name>
//! # disabled: true
//! ```
//!
//! The bootstrapper writes these files into the working directory on first
//! start, and the loader reads them back from there, so an operator can edit
//! or disable a schema between runs.

/// Name and contents of every built-in schema, in dependency order.
pub fn builtin_schemas() -> [(&'static str, &'static str); 6] {
    [
        ("system", system_schema()),
        ("core", core_schema()),
        ("cosine", cosine_schema()),
        ("inetorgperson", inetorgperson_schema()),
        ("nis", nis_schema()),
        ("harness", harness_schema()),
    ]
}

/// Operational attributes and the classes every server needs.
pub fn system_schema() -> &'static str {
    r#"# schema: system
# Operational and structural elements required by the server itself.

attributetype ( 2.5.4.0 NAME 'objectClass'
    DESC 'RFC4512: object classes of the entity'
    EQUALITY objectIdentifierMatch
    SYNTAX 1.3.6.1.4.1.1466.115.121.1.38 )

attributetype ( 2.5.4.41 NAME 'name'
    DESC 'RFC4519: common supertype of name attributes'
    EQUALITY caseIgnoreMatch
    SUBSTR caseIgnoreSubstringsMatch
    SYNTAX 1.3.6.1.4.1.1466.115.121.1.15{32768} )

attributetype ( 2.5.4.49 NAME 'distinguishedName'
    DESC 'RFC4519: common supertype of DN attributes'
    EQUALITY distinguishedNameMatch
    SYNTAX 1.3.6.1.4.1.1466.115.121.1.12 )

attributetype ( 2.5.18.1 NAME 'createTimestamp'
    DESC 'RFC4512: time which object was created'
    EQUALITY generalizedTimeMatch
    ORDERING generalizedTimeOrderingMatch
    SYNTAX 1.3.6.1.4.1.1466.115.121.1.24
    SINGLE-VALUE NO-USER-MODIFICATION USAGE directoryOperation )

attributetype ( 2.5.18.2 NAME 'modifyTimestamp'
    DESC 'RFC4512: time which object was last modified'
    EQUALITY generalizedTimeMatch
    ORDERING generalizedTimeOrderingMatch
    SYNTAX 1.3.6.1.4.1.1466.115.121.1.24
    SINGLE-VALUE NO-USER-MODIFICATION USAGE directoryOperation )

attributetype ( 2.5.18.3 NAME 'creatorsName'
    DESC 'RFC4512: name of creator'
    EQUALITY distinguishedNameMatch
    SYNTAX 1.3.6.1.4.1.1466.115.121.1.12
    SINGLE-VALUE NO-USER-MODIFICATION USAGE directoryOperation )

attributetype ( 2.5.18.4 NAME 'modifiersName'
    DESC 'RFC4512: name of last modifier'
    EQUALITY distinguishedNameMatch
    SYNTAX 1.3.6.1.4.1.1466.115.121.1.12
    SINGLE-VALUE NO-USER-MODIFICATION USAGE directoryOperation )

attributetype ( 2.5.18.10 NAME 'subschemaSubentry'
    DESC 'RFC4512: name of controlling subschema entry'
    EQUALITY distinguishedNameMatch
    SYNTAX 1.3.6.1.4.1.1466.115.121.1.12
    SINGLE-VALUE NO-USER-MODIFICATION USAGE directoryOperation )

attributetype ( 1.3.6.1.1.16.4 NAME 'entryUUID'
    DESC 'RFC4530: UUID of the entry'
    EQUALITY uuidMatch
    ORDERING uuidOrderingMatch
    SYNTAX 1.3.6.1.1.16.1
    SINGLE-VALUE NO-USER-MODIFICATION USAGE directoryOperation )

attributetype ( 2.5.21.5 NAME 'attributeTypes'
    DESC 'RFC4512: attribute types'
    EQUALITY objectIdentifierFirstComponentMatch
    SYNTAX 1.3.6.1.4.1.1466.115.121.1.3
    USAGE directoryOperation )

attributetype ( 2.5.21.6 NAME 'objectClasses'
    DESC 'RFC4512: object classes'
    EQUALITY objectIdentifierFirstComponentMatch
    SYNTAX 1.3.6.1.4.1.1466.115.121.1.37
    USAGE directoryOperation )

attributetype ( 1.3.6.1.4.1.1466.101.120.5 NAME 'namingContexts'
    DESC 'RFC4512: naming contexts'
    SYNTAX 1.3.6.1.4.1.1466.115.121.1.12
    USAGE dSAOperation )

attributetype ( 1.3.6.1.4.1.1466.101.120.15 NAME 'supportedLDAPVersion'
    DESC 'RFC4512: supported LDAP versions'
    SYNTAX 1.3.6.1.4.1.1466.115.121.1.27
    USAGE dSAOperation )

attributetype ( 1.3.6.1.1.4 NAME 'vendorName'
    DESC 'RFC3045: name of implementation vendor'
    EQUALITY caseExactIA5Match
    SYNTAX 1.3.6.1.4.1.1466.115.121.1.26
    SINGLE-VALUE NO-USER-MODIFICATION USAGE dSAOperation )

attributetype ( 1.3.6.1.1.5 NAME 'vendorVersion'
    DESC 'RFC3045: version of implementation'
    EQUALITY caseExactIA5Match
    SYNTAX 1.3.6.1.4.1.1466.115.121.1.26
    SINGLE-VALUE NO-USER-MODIFICATION USAGE dSAOperation )

objectclass ( 2.5.6.0 NAME 'top'
    DESC 'RFC4512: top of the superclass chain'
    ABSTRACT
    MUST objectClass )

objectclass ( 1.3.6.1.4.1.1466.101.120.111 NAME 'extensibleObject'
    DESC 'RFC4512: extensible object'
    SUP top AUXILIARY )

objectclass ( 2.5.20.1 NAME 'subschema'
    DESC 'RFC4512: controlling subschema (sub)entry'
    AUXILIARY
    MAY ( attributeTypes $ objectClasses ) )
"#
}

/// RFC 4519 user schema.
pub fn core_schema() -> &'static str {
    r#"# schema: core
# depends: system

attributetype ( 2.5.4.3 NAME ( 'cn' 'commonName' )
    DESC 'RFC4519: common name(s) for which the entity is known by'
    SUP name )

attributetype ( 2.5.4.4 NAME ( 'sn' 'surname' )
    DESC 'RFC4519: last (family) name(s) for which the entity is known by'
    SUP name )

attributetype ( 2.5.4.42 NAME 'givenName'
    DESC 'RFC4519: first name(s) for which the entity is known by'
    SUP name )

attributetype ( 2.5.4.43 NAME 'initials'
    DESC 'RFC4519: initials of some or all of names, but not the surname(s)'
    SUP name )

attributetype ( 2.5.4.12 NAME 'title'
    DESC 'RFC4519: title associated with the entity'
    SUP name )

attributetype ( 2.5.4.10 NAME ( 'o' 'organizationName' )
    DESC 'RFC4519: organization this object belongs to'
    SUP name )

attributetype ( 2.5.4.11 NAME ( 'ou' 'organizationalUnitName' )
    DESC 'RFC4519: organizational unit this object belongs to'
    SUP name )

attributetype ( 2.5.4.7 NAME ( 'l' 'localityName' )
    DESC 'RFC4519: locality which this object resides in'
    SUP name )

attributetype ( 2.5.4.8 NAME ( 'st' 'stateOrProvinceName' )
    DESC 'RFC4519: state or province which this object resides in'
    SUP name )

attributetype ( 2.5.4.9 NAME ( 'street' 'streetAddress' )
    DESC 'RFC4519: street address of this object'
    EQUALITY caseIgnoreMatch
    SUBSTR caseIgnoreSubstringsMatch
    SYNTAX 1.3.6.1.4.1.1466.115.121.1.15{128} )

attributetype ( 2.5.4.17 NAME 'postalCode'
    DESC 'RFC4519: postal code'
    EQUALITY caseIgnoreMatch
    SUBSTR caseIgnoreSubstringsMatch
    SYNTAX 1.3.6.1.4.1.1466.115.121.1.15{40} )

attributetype ( 2.5.4.16 NAME 'postalAddress'
    DESC 'RFC4519: postal address'
    EQUALITY caseIgnoreListMatch
    SUBSTR caseIgnoreListSubstringsMatch
    SYNTAX 1.3.6.1.4.1.1466.115.121.1.41 )

attributetype ( 2.5.4.13 NAME 'description'
    DESC 'RFC4519: descriptive information'
    EQUALITY caseIgnoreMatch
    SUBSTR caseIgnoreSubstringsMatch
    SYNTAX 1.3.6.1.4.1.1466.115.121.1.15{1024} )

attributetype ( 2.5.4.15 NAME 'businessCategory'
    DESC 'RFC4519: business category'
    EQUALITY caseIgnoreMatch
    SUBSTR caseIgnoreSubstringsMatch
    SYNTAX 1.3.6.1.4.1.1466.115.121.1.15{128} )

attributetype ( 2.5.4.20 NAME 'telephoneNumber'
    DESC 'RFC4519: Telephone Number'
    EQUALITY telephoneNumberMatch
    SUBSTR telephoneNumberSubstringsMatch
    SYNTAX 1.3.6.1.4.1.1466.115.121.1.50{32} )

attributetype ( 2.5.4.23 NAME ( 'facsimileTelephoneNumber' 'fax' )
    DESC 'RFC4519: Facsimile (Fax) Telephone Number'
    SYNTAX 1.3.6.1.4.1.1466.115.121.1.22 )

attributetype ( 2.5.4.35 NAME 'userPassword'
    DESC 'RFC4519/2307: password of user'
    EQUALITY octetStringMatch
    SYNTAX 1.3.6.1.4.1.1466.115.121.1.40{128} )

attributetype ( 2.5.4.34 NAME 'seeAlso'
    DESC 'RFC4519: DN of related object'
    SUP distinguishedName )

attributetype ( 2.5.4.31 NAME 'member'
    DESC 'RFC4519: member of a group'
    SUP distinguishedName )

attributetype ( 2.5.4.32 NAME 'owner'
    DESC 'RFC4519: owner (of the object)'
    SUP distinguishedName )

attributetype ( 2.5.4.50 NAME 'uniqueMember'
    DESC 'RFC4519: unique member of a group'
    EQUALITY uniqueMemberMatch
    SYNTAX 1.3.6.1.4.1.1466.115.121.1.34 )

attributetype ( 0.9.2342.19200300.100.1.1 NAME ( 'uid' 'userid' )
    DESC 'RFC4519: user identifier'
    EQUALITY caseIgnoreMatch
    SUBSTR caseIgnoreSubstringsMatch
    SYNTAX 1.3.6.1.4.1.1466.115.121.1.15{256} )

attributetype ( 0.9.2342.19200300.100.1.25 NAME ( 'dc' 'domainComponent' )
    DESC 'RFC1274/2247: domain component'
    EQUALITY caseIgnoreIA5Match
    SUBSTR caseIgnoreIA5SubstringsMatch
    SYNTAX 1.3.6.1.4.1.1466.115.121.1.26 SINGLE-VALUE )

objectclass ( 2.5.6.4 NAME 'organization'
    DESC 'RFC4519: an organization'
    SUP top STRUCTURAL
    MUST o
    MAY ( userPassword $ seeAlso $ businessCategory $ street $ l $ st
        $ postalCode $ postalAddress $ telephoneNumber
        $ facsimileTelephoneNumber $ description ) )

objectclass ( 2.5.6.5 NAME 'organizationalUnit'
    DESC 'RFC4519: an organizational unit'
    SUP top STRUCTURAL
    MUST ou
    MAY ( userPassword $ seeAlso $ businessCategory $ street $ l $ st
        $ postalCode $ postalAddress $ telephoneNumber
        $ facsimileTelephoneNumber $ description ) )

objectclass ( 2.5.6.6 NAME 'person'
    DESC 'RFC4519: a person'
    SUP top STRUCTURAL
    MUST ( sn $ cn )
    MAY ( userPassword $ telephoneNumber $ seeAlso $ description ) )

objectclass ( 2.5.6.7 NAME 'organizationalPerson'
    DESC 'RFC4519: an organizational person'
    SUP person STRUCTURAL
    MAY ( title $ ou $ street $ l $ st $ postalCode $ postalAddress
        $ telephoneNumber $ facsimileTelephoneNumber ) )

objectclass ( 2.5.6.9 NAME 'groupOfNames'
    DESC 'RFC4519: a group of names (DNs)'
    SUP top STRUCTURAL
    MUST ( member $ cn )
    MAY ( businessCategory $ seeAlso $ owner $ ou $ o $ description ) )

objectclass ( 2.5.6.17 NAME 'groupOfUniqueNames'
    DESC 'RFC4519: a group of unique names (DN and Unique Identifier)'
    SUP top STRUCTURAL
    MUST ( uniqueMember $ cn )
    MAY ( businessCategory $ seeAlso $ owner $ ou $ o $ description ) )

objectclass ( 1.3.6.1.4.1.1466.344 NAME 'dcObject'
    DESC 'RFC4519: domain component object'
    SUP top AUXILIARY
    MUST dc )

objectclass ( 1.3.6.1.1.3.1 NAME 'uidObject'
    DESC 'RFC4519: uid object'
    SUP top AUXILIARY
    MUST uid )
"#
}

/// RFC 4524 (COSINE) attributes and classes.
pub fn cosine_schema() -> &'static str {
    r#"# schema: cosine
# depends: core

attributetype ( 0.9.2342.19200300.100.1.3 NAME ( 'mail' 'rfc822Mailbox' )
    DESC 'RFC4524: electronic mailbox'
    EQUALITY caseIgnoreIA5Match
    SUBSTR caseIgnoreIA5SubstringsMatch
    SYNTAX 1.3.6.1.4.1.1466.115.121.1.26{256} )

attributetype ( 0.9.2342.19200300.100.1.10 NAME 'manager'
    DESC 'RFC4524: DN of manager'
    EQUALITY distinguishedNameMatch
    SYNTAX 1.3.6.1.4.1.1466.115.121.1.12 )

attributetype ( 0.9.2342.19200300.100.1.6 NAME 'roomNumber'
    DESC 'RFC4524: room number'
    EQUALITY caseIgnoreMatch
    SUBSTR caseIgnoreSubstringsMatch
    SYNTAX 1.3.6.1.4.1.1466.115.121.1.15{256} )

attributetype ( 0.9.2342.19200300.100.1.20 NAME ( 'homePhone' 'homeTelephoneNumber' )
    DESC 'RFC4524: home telephone number'
    EQUALITY telephoneNumberMatch
    SUBSTR telephoneNumberSubstringsMatch
    SYNTAX 1.3.6.1.4.1.1466.115.121.1.50 )

attributetype ( 0.9.2342.19200300.100.1.41 NAME ( 'mobile' 'mobileTelephoneNumber' )
    DESC 'RFC4524: mobile telephone number'
    EQUALITY telephoneNumberMatch
    SUBSTR telephoneNumberSubstringsMatch
    SYNTAX 1.3.6.1.4.1.1466.115.121.1.50 )

attributetype ( 0.9.2342.19200300.100.1.42 NAME ( 'pager' 'pagerTelephoneNumber' )
    DESC 'RFC4524: pager telephone number'
    EQUALITY telephoneNumberMatch
    SUBSTR telephoneNumberSubstringsMatch
    SYNTAX 1.3.6.1.4.1.1466.115.121.1.50 )

attributetype ( 0.9.2342.19200300.100.1.5 NAME ( 'drink' 'favouriteDrink' )
    DESC 'RFC1274: favorite drink'
    EQUALITY caseIgnoreMatch
    SUBSTR caseIgnoreSubstringsMatch
    SYNTAX 1.3.6.1.4.1.1466.115.121.1.15{256} )

objectclass ( 0.9.2342.19200300.100.4.5 NAME 'account'
    DESC 'RFC4524: a computer account'
    SUP top STRUCTURAL
    MUST uid
    MAY ( description $ seeAlso $ l $ o $ ou ) )

objectclass ( 0.9.2342.19200300.100.4.13 NAME 'domain'
    DESC 'RFC4524: a domain'
    SUP top STRUCTURAL
    MUST dc
    MAY ( userPassword $ businessCategory $ seeAlso $ description $ o
        $ l $ st $ street $ postalCode $ telephoneNumber ) )
"#
}

/// RFC 2798 `inetOrgPerson`.
pub fn inetorgperson_schema() -> &'static str {
    r#"# schema: inetorgperson
# depends: core, cosine

attributetype ( 2.16.840.1.113730.3.1.1 NAME 'carLicense'
    DESC 'RFC2798: vehicle license or registration plate'
    EQUALITY caseIgnoreMatch
    SUBSTR caseIgnoreSubstringsMatch
    SYNTAX 1.3.6.1.4.1.1466.115.121.1.15 )

attributetype ( 2.16.840.1.113730.3.1.2 NAME 'departmentNumber'
    DESC 'RFC2798: identifies a department within an organization'
    EQUALITY caseIgnoreMatch
    SUBSTR caseIgnoreSubstringsMatch
    SYNTAX 1.3.6.1.4.1.1466.115.121.1.15 )

attributetype ( 2.16.840.1.113730.3.1.241 NAME 'displayName'
    DESC 'RFC2798: preferred name to be used when displaying entries'
    EQUALITY caseIgnoreMatch
    SUBSTR caseIgnoreSubstringsMatch
    SYNTAX 1.3.6.1.4.1.1466.115.121.1.15
    SINGLE-VALUE )

attributetype ( 2.16.840.1.113730.3.1.3 NAME 'employeeNumber'
    DESC 'RFC2798: numerically identifies an employee within an organization'
    EQUALITY caseIgnoreMatch
    SUBSTR caseIgnoreSubstringsMatch
    SYNTAX 1.3.6.1.4.1.1466.115.121.1.15
    SINGLE-VALUE )

attributetype ( 2.16.840.1.113730.3.1.4 NAME 'employeeType'
    DESC 'RFC2798: type of employment for a person'
    EQUALITY caseIgnoreMatch
    SUBSTR caseIgnoreSubstringsMatch
    SYNTAX 1.3.6.1.4.1.1466.115.121.1.15 )

attributetype ( 2.16.840.1.113730.3.1.39 NAME 'preferredLanguage'
    DESC 'RFC2798: preferred written or spoken language for a person'
    EQUALITY caseIgnoreMatch
    SUBSTR caseIgnoreSubstringsMatch
    SYNTAX 1.3.6.1.4.1.1466.115.121.1.15
    SINGLE-VALUE )

attributetype ( 1.3.6.1.4.1.250.1.57 NAME 'labeledURI'
    DESC 'RFC2079: Uniform Resource Identifier with optional label'
    EQUALITY caseExactMatch
    SYNTAX 1.3.6.1.4.1.1466.115.121.1.15 )

objectclass ( 2.16.840.1.113730.3.2.2 NAME 'inetOrgPerson'
    DESC 'RFC2798: Internet Organizational Person'
    SUP organizationalPerson STRUCTURAL
    MAY ( businessCategory $ carLicense $ departmentNumber $ displayName
        $ employeeNumber $ employeeType $ givenName $ homePhone $ initials
        $ labeledURI $ mail $ manager $ mobile $ o $ pager $ roomNumber
        $ uid $ preferredLanguage ) )
"#
}

/// RFC 2307 NIS schema. Shipped disabled.
pub fn nis_schema() -> &'static str {
    r#"# schema: nis
# depends: core, cosine
# disabled: true

attributetype ( 1.3.6.1.1.1.1.0 NAME 'uidNumber'
    DESC 'RFC2307: An integer uniquely identifying a user in an administrative domain'
    EQUALITY integerMatch
    SYNTAX 1.3.6.1.4.1.1466.115.121.1.27 SINGLE-VALUE )

attributetype ( 1.3.6.1.1.1.1.1 NAME 'gidNumber'
    DESC 'RFC2307: An integer uniquely identifying a group in an administrative domain'
    EQUALITY integerMatch
    SYNTAX 1.3.6.1.4.1.1466.115.121.1.27 SINGLE-VALUE )

attributetype ( 1.3.6.1.1.1.1.3 NAME 'homeDirectory'
    DESC 'RFC2307: The absolute path to the home directory'
    EQUALITY caseExactIA5Match
    SYNTAX 1.3.6.1.4.1.1466.115.121.1.26 SINGLE-VALUE )

attributetype ( 1.3.6.1.1.1.1.4 NAME 'loginShell'
    DESC 'RFC2307: The path to the login shell'
    EQUALITY caseExactIA5Match
    SYNTAX 1.3.6.1.4.1.1466.115.121.1.26 SINGLE-VALUE )

attributetype ( 1.3.6.1.1.1.1.12 NAME 'memberUid'
    EQUALITY caseExactIA5Match
    SUBSTR caseExactIA5SubstringsMatch
    SYNTAX 1.3.6.1.4.1.1466.115.121.1.26 )

objectclass ( 1.3.6.1.1.1.2.0 NAME 'posixAccount'
    DESC 'RFC2307: Abstraction of an account with POSIX attributes'
    SUP top AUXILIARY
    MUST ( cn $ uid $ uidNumber $ gidNumber $ homeDirectory )
    MAY ( userPassword $ loginShell $ description ) )

objectclass ( 1.3.6.1.1.1.2.2 NAME 'posixGroup'
    DESC 'RFC2307: Abstraction of a group of accounts'
    SUP top STRUCTURAL
    MUST ( cn $ gidNumber )
    MAY ( userPassword $ memberUid $ description ) )
"#
}

/// Elements used by the record mapping: the `special` payload attribute and
/// the `specialUser` class that carries it.
pub fn harness_schema() -> &'static str {
    r#"# schema: harness
# depends: inetorgperson

attributetype ( 1.3.6.1.4.1.32473.1.1.1 NAME 'special'
    DESC 'Opaque payload stored with a user'
    EQUALITY caseExactMatch
    SUBSTR caseExactSubstringsMatch
    SYNTAX 1.3.6.1.4.1.1466.115.121.1.15 )

objectclass ( 1.3.6.1.4.1.32473.1.2.1 NAME 'specialUser'
    DESC 'A person with an opaque payload'
    SUP inetOrgPerson STRUCTURAL
    MAY special )
"#
}
