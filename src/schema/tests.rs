//! Tests for the schema registry, loader and bootstrapper.

use super::bootstrap::SchemaBootstrapper;
use super::fragment::SchemaDefinition;
use super::loader::{SchemaFile, SchemaLoader, load_files};
use super::parser::{parse_attribute_type, parse_object_class};
use super::registry::SchemaRegistry;
use crate::error::{LifecycleError, SchemaError};
use std::fs;

fn attribute(text: &str) -> SchemaDefinition {
    SchemaDefinition::AttributeType(parse_attribute_type("test", text).unwrap())
}

fn class(text: &str) -> SchemaDefinition {
    SchemaDefinition::ObjectClass(parse_object_class("test", text).unwrap())
}

#[test]
fn test_builtin_schemas_load_cleanly() {
    let registry = SchemaRegistry::with_builtin_schemas().expect("built-in schemas must load");

    assert!(registry.object_class("specialUser").is_some());
    assert!(registry.attribute_type("special").is_some());
    // nis ships disabled
    assert!(registry.object_class("posixAccount").is_none());
    assert!(registry.attribute_type("uidNumber").is_none());
}

#[test]
fn test_lookup_by_alias_and_oid() {
    let registry = SchemaRegistry::with_builtin_schemas().unwrap();

    let by_name = registry.attribute_type("commonName").unwrap();
    let by_oid = registry.attribute_type("2.5.4.3").unwrap();
    assert_eq!(by_name.oid, by_oid.oid);
    assert_eq!(registry.canonical_attribute_name("COMMONNAME"), Some("cn"));
    assert!(registry.same_attribute("cn", "commonName"));
    assert!(!registry.same_attribute("cn", "sn"));
}

#[test]
fn test_superior_chain_of_special_user() {
    let registry = SchemaRegistry::with_builtin_schemas().unwrap();
    let chain: Vec<_> = registry
        .superior_chain("specialUser")
        .into_iter()
        .map(|class| class.primary_name().to_string())
        .collect();

    assert_eq!(
        chain,
        ["specialUser", "inetOrgPerson", "organizationalPerson", "person", "top"]
    );
}

#[test]
fn test_required_and_allowed_attributes() {
    let registry = SchemaRegistry::with_builtin_schemas().unwrap();

    let required = registry.required_attributes(&["specialUser"]);
    assert_eq!(required, ["sn", "cn", "objectClass"]);

    let allowed = registry.allowed_attributes(&["specialUser"]);
    for name in ["special", "uid", "mail", "userPassword", "cn"] {
        assert!(allowed.contains(&name), "{name} should be allowed");
    }
    assert!(!allowed.contains(&"dc"));
}

#[test]
fn test_equality_rules_are_inherited() {
    let registry = SchemaRegistry::with_builtin_schemas().unwrap();

    assert_eq!(registry.equality_rule("cn"), Some("caseIgnoreMatch"));
    assert!(!registry.is_case_exact("cn"));
    assert!(registry.is_case_exact("special"));
    assert!(registry.is_operational("createTimestamp"));
    assert!(!registry.is_operational("cn"));
}

#[test]
fn test_batch_registration_resolves_out_of_order_definitions() {
    let mut registry = SchemaRegistry::with_builtin_schemas().unwrap();
    let errors = registry.register_batch(vec![
        class("( 1.3.6.1.4.1.32473.9.2 NAME 'tagged' SUP top AUXILIARY MAY tag )"),
        attribute("( 1.3.6.1.4.1.32473.9.1 NAME 'tag' SUP name )"),
    ]);

    assert!(errors.is_empty(), "{errors:?}");
    assert!(registry.object_class("tagged").is_some());
}

#[test]
fn test_batch_registration_reports_unresolved_and_duplicates() {
    let mut registry = SchemaRegistry::with_builtin_schemas().unwrap();
    let errors = registry.register_batch(vec![
        class("( 1.3.6.1.4.1.32473.9.3 NAME 'orphan' SUP missingClass STRUCTURAL )"),
        attribute("( 1.3.6.1.4.1.32473.9.4 NAME 'cn' SUP name )"),
        class("( 1.3.6.1.4.1.32473.9.5 NAME 'needy' SUP top MUST nothingLikeThis )"),
    ]);

    assert_eq!(errors.len(), 3);
    assert!(errors.iter().any(|e| matches!(
        e,
        SchemaError::UnresolvedReference { reference, .. } if reference == "missingClass"
    )));
    assert!(errors.iter().any(|e| matches!(e, SchemaError::Duplicate { name } if name == "cn")));
    assert!(errors.iter().any(|e| matches!(
        e,
        SchemaError::UnresolvedReference { reference_kind: "attribute type", .. }
    )));
}

#[test]
fn test_inheritance_cycle_detected() {
    let mut registry = SchemaRegistry::with_builtin_schemas().unwrap();
    let errors = registry.register_batch(vec![
        class("( 1.3.6.1.4.1.32473.9.6 NAME 'chicken' SUP egg STRUCTURAL )"),
        class("( 1.3.6.1.4.1.32473.9.7 NAME 'egg' SUP chicken STRUCTURAL )"),
    ]);

    assert_eq!(errors.len(), 2);
    assert!(errors.iter().all(|e| matches!(e, SchemaError::Cycle { .. })));
}

#[test]
fn test_dependencies_load_first_regardless_of_file_order() {
    let files = vec![
        SchemaFile::parse(
            "child",
            "child.schema",
            "# depends: parent\n\nobjectclass ( 1.3.6.1.4.1.32473.9.9 NAME 'child' SUP parent STRUCTURAL )\n",
        ),
        SchemaFile::parse(
            "parent",
            "parent.schema",
            "# depends: system\n\nobjectclass ( 1.3.6.1.4.1.32473.9.8 NAME 'parent' SUP top STRUCTURAL )\n",
        ),
        SchemaFile::parse("system", "system", super::embedded::system_schema()),
    ];

    let mut registry = SchemaRegistry::new();
    let errors = load_files(&mut registry, files);
    assert!(errors.is_empty(), "{errors:?}");
    assert_eq!(registry.superior_chain("child").len(), 3);
}

#[test]
fn test_missing_or_disabled_dependency_reported() {
    let files = vec![
        SchemaFile::parse("off", "off.schema", "# disabled: true\n"),
        SchemaFile::parse("needs-off", "needs-off.schema", "# depends: off\n"),
        SchemaFile::parse("needs-ghost", "needs-ghost.schema", "# depends: ghost\n"),
    ];

    let mut registry = SchemaRegistry::new();
    let errors = load_files(&mut registry, files);
    assert_eq!(
        errors,
        vec![
            SchemaError::MissingDependency {
                schema: "needs-off".to_string(),
                dependency: "off".to_string(),
            },
            SchemaError::MissingDependency {
                schema: "needs-ghost".to_string(),
                dependency: "ghost".to_string(),
            },
        ]
    );
}

#[test]
fn test_header_parsing() {
    let file = SchemaFile::parse(
        "fallback",
        "x.schema",
        "# schema: named\n# depends: core, cosine\n# disabled: TRUE\n",
    );
    assert_eq!(file.name, "named");
    assert_eq!(file.depends, ["core", "cosine"]);
    assert!(file.disabled);
}

#[test]
fn test_bootstrap_extracts_and_keeps_existing_files() {
    let working = tempfile::tempdir().unwrap();
    let bootstrapper = SchemaBootstrapper::new(working.path());

    let written = bootstrapper.extract().unwrap();
    assert_eq!(written.len(), 6);
    assert!(bootstrapper.schema_dir().join("harness.schema").exists());

    // An operator edit survives the next extraction.
    let nis = bootstrapper.schema_dir().join("nis.schema");
    fs::write(&nis, "# schema: nis\n# disabled: true\n").unwrap();
    assert!(bootstrapper.extract().unwrap().is_empty());
    assert_eq!(
        fs::read_to_string(&nis).unwrap(),
        "# schema: nis\n# disabled: true\n"
    );

    let partition = bootstrapper.bootstrap().unwrap();
    assert!(partition.registry().read().object_class("specialUser").is_some());
}

#[test]
fn test_bootstrap_fails_on_broken_schema_file() {
    let working = tempfile::tempdir().unwrap();
    let bootstrapper = SchemaBootstrapper::new(working.path());
    bootstrapper.extract().unwrap();
    fs::write(
        bootstrapper.schema_dir().join("zz-broken.schema"),
        "# depends: core\n\nattributetype ( 1.2.3.4 NAME 'broken'\n",
    )
    .unwrap();

    match bootstrapper.bootstrap() {
        Err(LifecycleError::SchemaLoadFailed { errors }) => {
            assert_eq!(errors.len(), 1);
            assert!(matches!(errors[0], SchemaError::Parse { .. }));
        }
        other => panic!("expected SchemaLoadFailed, got {other:?}"),
    }
}

#[test]
fn test_loader_reports_missing_directory() {
    let mut registry = SchemaRegistry::new();
    let errors = SchemaLoader::new("/definitely/not/here").load_all_enabled(&mut registry);
    assert!(matches!(errors.as_slice(), [SchemaError::Io { .. }]));
}
