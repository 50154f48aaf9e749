//! End-to-end lifecycle tests: startup, fixture import, schema extension over
//! the wire, and cleanup.

mod common;

use common::{TestRoot, admin_client, fixtures, start_with_users};
use embedded_directory::dn::Dn;
use embedded_directory::entry::DirectoryEntry;
use embedded_directory::protocol::{Filter, ResultCode, SearchRequest, SearchScope};
use embedded_directory::{EmbeddedDirectory, LifecycleError};

fn dn(text: &str) -> Dn {
    Dn::parse(text).unwrap()
}

#[tokio::test]
async fn test_start_imports_ldif_and_stop_removes_everything() {
    let root = TestRoot::new();
    let (directory, report) = start_with_users(&root).await;

    assert!(directory.is_running());
    assert_eq!(report.import.entries_added, 3);
    assert_eq!(report.import.entries_failed, 0);
    assert!(report.warnings().is_empty(), "{:?}", report.warnings());
    assert!(report.working_dir.starts_with(root.work()));
    assert_eq!(root.working_dirs(), 1);

    let service = directory.service().await.unwrap();
    let dave = service
        .lookup(&dn("uid=dave,ou=users,dc=example,dc=com"))
        .unwrap()
        .unwrap();
    assert_eq!(dave.attributes.values("description"), ["multi-line\ndescription"]);
    assert_eq!(dave.attributes.values("uid"), ["dave"]);

    directory.stop().await.unwrap();
    assert!(!directory.is_running());
    assert!(!report.working_dir.exists());
    assert_eq!(root.working_dirs(), 0);
}

#[tokio::test]
async fn test_context_entries_exist_once_and_fixtures_do_not_duplicate_them() {
    let root = TestRoot::new();
    root.write_resource("context.ldif", fixtures::CONTEXT_LDIF);
    let directory = EmbeddedDirectory::new(
        root.config()
            .ldif_pattern("context.ldif")
            .build()
            .unwrap(),
    );
    let report = directory.start().await.unwrap();

    assert_eq!(report.import.entries_skipped, 2);
    assert_eq!(report.import.entries_added, 0);

    let mut client = admin_client(&directory, &report).await;
    for base in ["dc=example,dc=com", "ou=system"] {
        let response = client
            .search(SearchRequest::new(base, SearchScope::BaseObject, Filter::present("objectClass")))
            .await
            .unwrap();
        assert_eq!(response.result.code, ResultCode::Success);
        assert_eq!(response.entries.len(), 1, "{base}");
    }

    // The root entry keeps its startup shape, not the fixture's.
    let root_entry = directory
        .service()
        .await
        .unwrap()
        .lookup(&dn("dc=example,dc=com"))
        .unwrap()
        .unwrap();
    assert!(root_entry.has_object_class("extensibleObject"));
    assert!(!root_entry.has_object_class("domain"));

    client.unbind().await.unwrap();
    directory.stop().await.unwrap();
}

#[tokio::test]
async fn test_imported_schema_is_usable_over_the_wire() {
    let root = TestRoot::new();
    root.write_resource("schema/colours.schema", fixtures::COLOURS_SCHEMA);
    root.write_resource("ldif/users.ldif", fixtures::USERS_LDIF);
    let directory = EmbeddedDirectory::new(
        root.config()
            .schema_pattern("schema/*.schema")
            .ldif_pattern("ldif/*.ldif")
            .build()
            .unwrap(),
    );
    let report = directory.start().await.unwrap();

    assert_eq!(report.import.schema_elements, 2);
    assert_eq!(report.warnings().len(), 1);
    assert!(report.warnings()[0].source.ends_with("colours.schema:13"));
    assert!(report.warnings()[0].message.contains("ditcontentrule"));

    let mut client = admin_client(&directory, &report).await;
    let erin = DirectoryEntry::new(dn("uid=erin,ou=users,dc=example,dc=com"))
        .with_attribute(
            "objectClass",
            ["top", "person", "organizationalPerson", "inetOrgPerson", "colourful"],
        )
        .with_attribute("cn", ["Erin"])
        .with_attribute("sn", ["Ellis"])
        .with_attribute("favouriteColour", ["Teal"]);
    assert_eq!(client.add(&erin).await.unwrap().code, ResultCode::Success);

    // caseIgnoreMatch from the imported definition applies to the filter.
    let response = client
        .search(SearchRequest::new(
            "ou=users,dc=example,dc=com",
            SearchScope::SingleLevel,
            Filter::equality("favouriteColour", "teal"),
        ))
        .await
        .unwrap();
    assert_eq!(response.entries.len(), 1);
    assert_eq!(response.entries[0].dn, "uid=erin,ou=users,dc=example,dc=com");

    client.unbind().await.unwrap();
    directory.stop().await.unwrap();
}

#[tokio::test]
async fn test_schema_is_not_carried_over_to_the_next_start() {
    let root = TestRoot::new();
    root.write_resource("colours.schema", fixtures::COLOURS_SCHEMA);
    let with_schema = EmbeddedDirectory::new(
        root.config().schema_pattern("colours.schema").build().unwrap(),
    );
    with_schema.start().await.unwrap();
    with_schema.stop().await.unwrap();

    let plain = EmbeddedDirectory::new(root.config().build().unwrap());
    plain.start().await.unwrap();
    let service = plain.service().await.unwrap();
    let registry = service.registry();
    assert!(registry.read().object_class("colourful").is_none());
    plain.stop().await.unwrap();
}

#[tokio::test]
async fn test_import_problems_are_warnings_not_failures() {
    let root = TestRoot::new();
    root.write_resource("ldif/broken.ldif", "dn: uid=x,ou=missing,dc=example,dc=com\ncn: x\n");
    let directory = EmbeddedDirectory::new(
        root.config()
            .schema_pattern("schema/*.schema")
            .ldif_pattern("ldif/*.ldif")
            .build()
            .unwrap(),
    );
    let report = directory.start().await.unwrap();

    assert!(directory.is_running());
    assert_eq!(report.import.entries_failed, 1);
    // One for the unmatched schema pattern, one for the orphaned entry.
    assert_eq!(report.warnings().len(), 2);
    assert!(report.warnings().iter().any(|w| w.source == "schema/*.schema"));

    directory.stop().await.unwrap();
}

#[tokio::test]
async fn test_explicit_working_directory_must_not_exist() {
    let root = TestRoot::new();
    let taken = root.path().join("taken");
    std::fs::create_dir(&taken).unwrap();
    std::fs::write(taken.join("keep.txt"), "mine").unwrap();

    let directory =
        EmbeddedDirectory::new(root.config().working_directory(&taken).build().unwrap());
    assert!(matches!(
        directory.start().await,
        Err(LifecycleError::WorkingDirectoryConflict { .. })
    ));
    assert!(!directory.is_running());
    assert_eq!(std::fs::read_to_string(taken.join("keep.txt")).unwrap(), "mine");
}

#[tokio::test]
async fn test_two_directories_run_side_by_side() {
    let root = TestRoot::new();
    let first = EmbeddedDirectory::new(root.config().build().unwrap());
    let second = EmbeddedDirectory::new(root.config().suffix("o=other").build().unwrap());

    let a = first.start().await.unwrap();
    let b = second.start().await.unwrap();
    assert_ne!(a.local_addr, b.local_addr);
    assert_ne!(a.working_dir, b.working_dir);
    assert_eq!(root.working_dirs(), 2);

    let service = second.service().await.unwrap();
    assert!(service.exists(&dn("o=other")).unwrap());
    assert!(!service.exists(&dn("dc=example,dc=com")).unwrap());

    first.stop().await.unwrap();
    second.stop().await.unwrap();
    assert_eq!(root.working_dirs(), 0);
}
