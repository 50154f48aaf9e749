use super::*;
use crate::auth::BindState;
use crate::client::LdapClient;
use crate::dn::Dn;
use crate::entry::DirectoryEntry;
use crate::partition::{
    Partition, ROOT_INDEXES, ROOT_PARTITION_ID, SYSTEM_INDEXES, SYSTEM_PARTITION_ID,
    inject_context_entries, system_suffix,
};
use crate::protocol::message::{DEL_REQUEST, DEL_RESPONSE};
use crate::protocol::{
    Filter, LdapCodec, LdapMessage, Modification, ModifyOperation, PartialAttribute, ProtocolOp,
    ResultCode, SearchRequest, SearchScope, SubstringFilter,
};
use crate::schema::{SchemaPartition, SchemaRegistry};
use futures::{SinkExt, StreamExt};
use tokio_util::codec::Framed;

const SUFFIX: &str = "dc=example,dc=com";
const ADMIN: &str = "uid=admin,ou=system";

fn dn(text: &str) -> Dn {
    Dn::parse(text).unwrap()
}

fn service_with(options: ServiceOptions) -> DirectoryService {
    let schema = SchemaPartition::new("schema", SchemaRegistry::with_builtin_schemas().unwrap());
    let service = DirectoryService::new(
        schema,
        vec![
            Partition::in_memory(SYSTEM_PARTITION_ID, system_suffix(), &SYSTEM_INDEXES),
            Partition::in_memory(ROOT_PARTITION_ID, dn(SUFFIX), &ROOT_INDEXES),
        ],
        options,
    );
    service.startup();
    inject_context_entries(&service, "secret").unwrap();
    service
}

fn service() -> DirectoryService {
    service_with(ServiceOptions::default())
}

fn users_ou() -> DirectoryEntry {
    DirectoryEntry::new(dn("ou=users,dc=example,dc=com"))
        .with_attribute("objectClass", ["top", "organizationalUnit"])
}

fn person(uid: &str) -> DirectoryEntry {
    DirectoryEntry::new(dn(&format!("uid={uid},ou=users,dc=example,dc=com")))
        .with_attribute("objectClass", ["top", "person", "organizationalPerson", "inetOrgPerson"])
        .with_attribute("cn", [uid])
        .with_attribute("sn", [uid])
}

fn populated() -> DirectoryService {
    let service = service();
    let admin = service.admin_session();
    admin.add(users_ou()).unwrap();
    for uid in ["carol", "alice", "bob"] {
        admin.add(person(uid)).unwrap();
    }
    service
}

fn change(operation: ModifyOperation, attribute: &str, values: &[&str]) -> Modification {
    Modification {
        operation,
        attribute: PartialAttribute::new(attribute, values.iter().copied()),
    }
}

fn uids(outcome: &SearchOutcome) -> Vec<String> {
    outcome
        .entries
        .iter()
        .map(|entry| entry.dn.to_string())
        .collect()
}

// Add

#[test]
fn test_add_under_missing_parent_reports_matched_dn() {
    let service = service();

    let error = service.admin_session().add(person("alice")).unwrap_err();
    assert_eq!(error.code, ResultCode::NoSuchObject);
    assert_eq!(error.matched_dn, Some(dn(SUFFIX)));
}

#[test]
fn test_duplicate_add_reports_entry_already_exists() {
    let service = populated();

    let error = service.admin_session().add(person("alice")).unwrap_err();
    assert_eq!(error.code, ResultCode::EntryAlreadyExists);
    assert_eq!(error.code.code(), 68);
}

#[test]
fn test_anonymous_session_cannot_write() {
    let service = service();

    let error = service.session().add(users_ou()).unwrap_err();
    assert_eq!(error.code, ResultCode::InsufficientAccessRights);
    assert!(!service.exists(&dn("ou=users,dc=example,dc=com")).unwrap());
}

#[test]
fn test_add_outside_every_partition() {
    let service = service();
    let entry = DirectoryEntry::new(dn("o=elsewhere"))
        .with_attribute("objectClass", ["top", "organization"])
        .with_attribute("o", ["elsewhere"]);

    let error = service.admin_session().add(entry).unwrap_err();
    assert_eq!(error.code, ResultCode::NoSuchObject);
}

#[test]
fn test_add_maintains_operational_attributes() {
    let service = populated();

    let alice = service
        .lookup(&dn("uid=alice,ou=users,dc=example,dc=com"))
        .unwrap()
        .unwrap();
    assert_eq!(alice.attributes.values("uid"), ["alice"]);
    assert_eq!(alice.attributes.first("creatorsName"), Some(ADMIN));
    assert!(alice.attributes.first("createTimestamp").unwrap().ends_with('Z'));
    assert!(uuid::Uuid::parse_str(alice.attributes.first("entryUUID").unwrap()).is_ok());

    let forged = person("mallory").with_attribute("entryUUID", ["not-yours"]);
    let error = service.admin_session().add(forged).unwrap_err();
    assert_eq!(error.code, ResultCode::ConstraintViolation);
}

#[test]
fn test_add_folds_aliases_so_indexes_apply() {
    let service = service();
    let admin = service.admin_session();
    admin
        .add(
            DirectoryEntry::new(dn("ou=people,dc=example,dc=com"))
                .with_attribute("objectClass", ["top", "organizationalUnit"])
                .with_attribute("organizationalUnitName", ["people"]),
        )
        .unwrap();

    let mut request = SearchRequest::new(SUFFIX, SearchScope::WholeSubtree, Filter::equality("ou", "People"));
    request.attributes = vec!["ou".to_string()];
    let outcome = service.session().search(&request).unwrap();

    assert!(outcome.used_index);
    assert_eq!(uids(&outcome), ["ou=people,dc=example,dc=com"]);
    assert_eq!(outcome.entries[0].attributes.values("ou"), ["people"]);
}

// Bind

#[test]
fn test_bind() {
    let service = service();

    assert_eq!(
        service.bind(ADMIN, "secret").unwrap(),
        BindState::Authenticated(dn(ADMIN))
    );
    assert_eq!(service.bind("", "").unwrap(), BindState::Anonymous);

    let code = |name: &str, password: &str| service.bind(name, password).unwrap_err().code;
    assert_eq!(code(ADMIN, "wrong"), ResultCode::InvalidCredentials);
    assert_eq!(code("uid=ghost,ou=system", "secret"), ResultCode::InvalidCredentials);
    assert_eq!(code(ADMIN, ""), ResultCode::UnwillingToPerform);
    assert_eq!(code("", "secret"), ResultCode::UnwillingToPerform);
    assert_eq!(code("not a dn", "secret"), ResultCode::InvalidDnSyntax);
}

#[test]
fn test_failed_rebind_leaves_session_anonymous() {
    let service = service();
    let mut session = service.session();

    session.bind(ADMIN, "secret").unwrap();
    assert!(session.principal().is_authenticated());

    assert!(session.bind(ADMIN, "wrong").is_err());
    assert_eq!(session.principal(), &BindState::Anonymous);
}

// Search

#[test]
fn test_search_scopes() {
    let service = populated();
    let session = service.session();
    let search = |base: &str, scope| {
        session
            .search(&SearchRequest::new(base, scope, Filter::present("objectClass")))
            .unwrap()
    };

    let base = search("ou=users,dc=example,dc=com", SearchScope::BaseObject);
    assert_eq!(uids(&base), ["ou=users,dc=example,dc=com"]);

    let one = search("ou=users,dc=example,dc=com", SearchScope::SingleLevel);
    assert_eq!(
        uids(&one),
        [
            "uid=alice,ou=users,dc=example,dc=com",
            "uid=bob,ou=users,dc=example,dc=com",
            "uid=carol,ou=users,dc=example,dc=com",
        ]
    );

    let sub = search(SUFFIX, SearchScope::WholeSubtree);
    assert_eq!(sub.entries.len(), 5);
    assert_eq!(sub.entries[0].dn, dn(SUFFIX));
}

#[test]
fn test_search_filters() {
    let service = populated();
    let session = service.session();
    let find = |filter: Filter| {
        let outcome = session
            .search(&SearchRequest::new(SUFFIX, SearchScope::WholeSubtree, filter))
            .unwrap();
        uids(&outcome)
    };

    assert_eq!(
        find(Filter::Substrings(SubstringFilter {
            attribute: "cn".to_string(),
            initial: Some("A".to_string()),
            any: Vec::new(),
            final_value: None,
        })),
        ["uid=alice,ou=users,dc=example,dc=com"]
    );
    assert_eq!(
        find(Filter::And(vec![
            Filter::equality("objectClass", "person"),
            Filter::Not(Box::new(Filter::equality("sn", "bob"))),
            Filter::Not(Box::new(Filter::equality("sn", "carol"))),
        ])),
        ["uid=alice,ou=users,dc=example,dc=com"]
    );
    assert_eq!(find(Filter::equality("sn", "nobody")).len(), 0);
}

#[test]
fn test_equality_search_uses_index() {
    let service = populated();
    let session = service.session();

    let indexed = session
        .search(&SearchRequest::new(
            SUFFIX,
            SearchScope::WholeSubtree,
            Filter::equality("uid", "BOB"),
        ))
        .unwrap();
    assert!(indexed.used_index);
    assert_eq!(uids(&indexed), ["uid=bob,ou=users,dc=example,dc=com"]);

    let scanned = session
        .search(&SearchRequest::new(
            SUFFIX,
            SearchScope::WholeSubtree,
            Filter::equality("sn", "bob"),
        ))
        .unwrap();
    assert!(!scanned.used_index);
    assert_eq!(uids(&scanned), uids(&indexed));
}

#[test]
fn test_search_size_limit() {
    let service = populated();
    let mut request = SearchRequest::new(
        "ou=users,dc=example,dc=com",
        SearchScope::SingleLevel,
        Filter::present("objectClass"),
    );
    request.size_limit = 2;

    let outcome = service.session().search(&request).unwrap();
    assert!(outcome.size_limit_exceeded);
    assert_eq!(outcome.entries.len(), 2);
}

#[test]
fn test_search_attribute_selection() {
    let service = populated();
    let base = |attributes: &[&str]| {
        let mut request = SearchRequest::new(
            "uid=alice,ou=users,dc=example,dc=com",
            SearchScope::BaseObject,
            Filter::present("objectClass"),
        );
        request.attributes = attributes.iter().map(|name| name.to_string()).collect();
        service.session().search(&request).unwrap().entries.remove(0)
    };

    let all_user = base(&[]);
    assert!(all_user.attributes.contains("cn"));
    assert!(!all_user.attributes.contains("entryUUID"));

    let operational = base(&["+"]);
    assert!(operational.attributes.contains("entryUUID"));
    assert!(!operational.attributes.contains("cn"));

    let named = base(&["surname", "creatorsName"]);
    assert_eq!(named.attributes.len(), 2);
    assert_eq!(named.attributes.values("sn"), ["alice"]);
}

#[test]
fn test_search_missing_base() {
    let service = populated();

    let error = service
        .session()
        .search(&SearchRequest::new(
            "ou=nowhere,ou=users,dc=example,dc=com",
            SearchScope::WholeSubtree,
            Filter::present("objectClass"),
        ))
        .unwrap_err();
    assert_eq!(error.code, ResultCode::NoSuchObject);
    assert_eq!(error.matched_dn, Some(dn("ou=users,dc=example,dc=com")));
}

#[test]
fn test_root_dse_and_subschema() {
    let service = service();
    let session = service.session();

    let root = session
        .search(&SearchRequest::new("", SearchScope::BaseObject, Filter::present("objectClass")))
        .unwrap();
    let dse = &root.entries[0];
    assert!(dse.attributes.has_value("namingContexts", SUFFIX));
    assert!(dse.attributes.has_value("namingContexts", "ou=system"));
    assert_eq!(dse.attributes.values("subschemaSubentry"), ["cn=schema"]);
    assert_eq!(dse.attributes.values("supportedLDAPVersion"), ["3"]);

    let mut request = SearchRequest::new("cn=schema", SearchScope::BaseObject, Filter::present("objectClass"));
    request.attributes = vec!["objectClasses".to_string(), "attributeTypes".to_string()];
    let subschema = session.search(&request).unwrap();
    let classes = subschema.entries[0].attributes.values("objectClasses");
    assert!(classes.iter().any(|class| class.contains("'specialUser'")));
}

#[test]
fn test_root_dse_honours_requested_attributes() {
    let service = service();
    let session = service.session();

    let mut request = SearchRequest::new("", SearchScope::BaseObject, Filter::present("objectClass"));
    request.attributes = vec!["namingContexts".to_string()];
    let selected = session.search(&request).unwrap();
    let dse = &selected.entries[0];
    assert!(dse.attributes.has_value("namingContexts", SUFFIX));
    assert!(!dse.attributes.contains("subschemaSubentry"));
    assert!(!dse.attributes.contains("objectClass"));

    request.attributes = vec!["*".to_string()];
    let user_only = session.search(&request).unwrap();
    assert!(user_only.entries[0].attributes.contains("objectClass"));
    assert!(!user_only.entries[0].attributes.contains("namingContexts"));
}

// Modify

#[test]
fn test_modify_add_delete_replace() {
    let service = populated();
    let admin = service.admin_session();
    let alice = dn("uid=alice,ou=users,dc=example,dc=com");

    admin
        .modify(
            &alice,
            &[
                change(ModifyOperation::Add, "mail", &["alice@example.com", "a@example.com"]),
                change(ModifyOperation::Replace, "sn", &["Liddell"]),
                change(ModifyOperation::Delete, "mail", &["a@example.com"]),
            ],
        )
        .unwrap();

    let entry = service.lookup(&alice).unwrap().unwrap();
    assert_eq!(entry.attributes.values("mail"), ["alice@example.com"]);
    assert_eq!(entry.attributes.values("sn"), ["Liddell"]);
    assert_eq!(entry.attributes.first("modifiersName"), Some(ADMIN));
    assert!(entry.attributes.contains("modifyTimestamp"));
}

#[test]
fn test_modify_is_atomic() {
    let service = populated();
    let admin = service.admin_session();
    let alice = dn("uid=alice,ou=users,dc=example,dc=com");

    let error = admin
        .modify(
            &alice,
            &[
                change(ModifyOperation::Add, "description", &["first"]),
                change(ModifyOperation::Delete, "sn", &[]),
            ],
        )
        .unwrap_err();
    assert_eq!(error.code, ResultCode::ObjectClassViolation);

    let entry = service.lookup(&alice).unwrap().unwrap();
    assert!(!entry.attributes.contains("description"));
}

#[test]
fn test_modify_errors() {
    let service = populated();
    let admin = service.admin_session();
    let alice = dn("uid=alice,ou=users,dc=example,dc=com");
    let code = |changes: &[Modification]| admin.modify(&alice, changes).unwrap_err().code;

    assert_eq!(
        code(&[change(ModifyOperation::Add, "cn", &["ALICE"])]),
        ResultCode::AttributeOrValueExists
    );
    assert_eq!(
        code(&[change(ModifyOperation::Delete, "mail", &[])]),
        ResultCode::NoSuchAttribute
    );
    assert_eq!(
        code(&[change(ModifyOperation::Delete, "uid", &[])]),
        ResultCode::NotAllowedOnRdn
    );
    assert_eq!(
        code(&[change(ModifyOperation::Add, "shoeSize", &["44"])]),
        ResultCode::UndefinedAttributeType
    );
    assert_eq!(
        code(&[change(ModifyOperation::Replace, "displayName", &["A", "B"])]),
        ResultCode::ConstraintViolation
    );
    assert_eq!(
        code(&[change(ModifyOperation::Replace, "entryUUID", &["x"])]),
        ResultCode::ConstraintViolation
    );

    let missing = admin
        .modify(&dn("uid=ghost,ou=users,dc=example,dc=com"), &[])
        .unwrap_err();
    assert_eq!(missing.code, ResultCode::NoSuchObject);
    assert_eq!(missing.matched_dn, Some(dn("ou=users,dc=example,dc=com")));
}

#[test]
fn test_schema_modify_registers_definitions() {
    let service = service();
    let admin = service.admin_session();
    let schema = dn("cn=schema");

    admin
        .modify(
            &schema,
            &[
                change(
                    ModifyOperation::Add,
                    "attributeTypes",
                    &["( 1.3.6.1.4.1.32473.9.1 NAME 'shoeSize' EQUALITY integerMatch \
                       SYNTAX 1.3.6.1.4.1.1466.115.121.1.27 SINGLE-VALUE )"],
                ),
                change(
                    ModifyOperation::Add,
                    "objectClasses",
                    &["( 1.3.6.1.4.1.32473.9.2 NAME 'shod' SUP top AUXILIARY MAY shoeSize )"],
                ),
            ],
        )
        .unwrap();

    let registry = service.registry();
    assert!(registry.read().attribute_type("shoeSize").is_some());
    assert!(registry.read().object_class("shod").is_some());

    let duplicate = admin
        .modify(
            &schema,
            &[change(
                ModifyOperation::Add,
                "attributeTypes",
                &["( 1.3.6.1.4.1.32473.9.1 NAME 'shoeSize' SYNTAX 1.3.6.1.4.1.1466.115.121.1.27 )"],
            )],
        )
        .unwrap_err();
    assert_eq!(duplicate.code, ResultCode::AttributeOrValueExists);

    let garbage = admin
        .modify(&schema, &[change(ModifyOperation::Add, "objectClasses", &["( oops"])])
        .unwrap_err();
    assert_eq!(garbage.code, ResultCode::InvalidAttributeSyntax);

    let unresolved = admin
        .modify(
            &schema,
            &[change(
                ModifyOperation::Add,
                "objectClasses",
                &["( 1.3.6.1.4.1.32473.9.3 NAME 'orphan' SUP nothingHere STRUCTURAL )"],
            )],
        )
        .unwrap_err();
    assert_eq!(unresolved.code, ResultCode::ConstraintViolation);
    assert!(registry.read().object_class("orphan").is_none());

    let removal = admin
        .modify(&schema, &[change(ModifyOperation::Delete, "objectClasses", &[])])
        .unwrap_err();
    assert_eq!(removal.code, ResultCode::UnwillingToPerform);
}

// Service state

#[test]
fn test_change_log() {
    let disabled = populated();
    assert!(disabled.change_log().is_empty());

    let service = service_with(ServiceOptions {
        change_log_enabled: true,
        ..ServiceOptions::default()
    });
    let admin = service.admin_session();
    admin.add(users_ou()).unwrap();
    admin
        .modify(
            &dn("ou=users,dc=example,dc=com"),
            &[change(ModifyOperation::Add, "description", &["people"])],
        )
        .unwrap();

    let log = service.change_log();
    // The three context entries come first.
    assert_eq!(log.len(), 5);
    assert_eq!(log[3].kind, ChangeKind::Add);
    assert_eq!(log[4].kind, ChangeKind::Modify);
    assert_eq!(log[4].principal, dn(ADMIN));
    assert!(log.windows(2).all(|pair| pair[0].sequence < pair[1].sequence));
}

#[test]
fn test_operations_require_started_service() {
    let service = populated();
    service.shutdown().unwrap();
    assert!(!service.is_started());

    let error = service.lookup(&dn(SUFFIX)).unwrap_err();
    assert_eq!(error.code, ResultCode::Unavailable);
    assert_eq!(
        service.bind(ADMIN, "secret").unwrap_err().code,
        ResultCode::Unavailable
    );

    service.startup();
    assert!(service.exists(&dn(SUFFIX)).unwrap());
}

#[test]
fn test_partition_for_prefers_longest_suffix() {
    let service = service();

    assert_eq!(
        service.partition_for(&dn("uid=admin,ou=system")).unwrap().id(),
        SYSTEM_PARTITION_ID
    );
    assert_eq!(
        service.partition_for(&dn("ou=x,dc=example,dc=com")).unwrap().id(),
        ROOT_PARTITION_ID
    );
    assert!(service.partition_for(&dn("dc=org")).is_none());
}

// Over the wire

#[tokio::test]
async fn test_listener_serves_ldap_clients() {
    let service = service();
    let listener = LdapListener::bind("127.0.0.1:0", service.clone()).await.unwrap();
    let address = listener.local_addr().to_string();

    let mut client = LdapClient::connect(&address).await.unwrap();

    let anonymous_add = client.add(&users_ou()).await.unwrap();
    assert_eq!(anonymous_add.code, ResultCode::InsufficientAccessRights);

    let bind = client.simple_bind(ADMIN, "secret").await.unwrap();
    assert!(bind.code.is_success());
    assert!(client.add(&users_ou()).await.unwrap().code.is_success());
    assert!(client.add(&person("alice")).await.unwrap().code.is_success());
    assert_eq!(
        client.add(&person("alice")).await.unwrap().code,
        ResultCode::EntryAlreadyExists
    );

    let mut request = SearchRequest::new(SUFFIX, SearchScope::WholeSubtree, Filter::equality("uid", "alice"));
    request.types_only = true;
    let response = client.search(request).await.unwrap();
    assert!(response.result.code.is_success());
    assert_eq!(response.entries.len(), 1);
    assert_eq!(response.entries[0].dn, "uid=alice,ou=users,dc=example,dc=com");
    assert!(response.entries[0].attributes.iter().all(|attribute| attribute.values.is_empty()));

    let modify = client
        .modify(
            "uid=alice,ou=users,dc=example,dc=com",
            vec![change(ModifyOperation::Replace, "description", &["over the wire"])],
        )
        .await
        .unwrap();
    assert!(modify.code.is_success());

    client.unbind().await.unwrap();
    listener.stop().await;
    assert!(listener.is_stopped());

    let alice = service
        .lookup(&dn("uid=alice,ou=users,dc=example,dc=com"))
        .unwrap()
        .unwrap();
    assert_eq!(alice.attributes.values("description"), ["over the wire"]);
}

#[tokio::test]
async fn test_unsupported_request_gets_matching_response() {
    let service = service();
    let listener = LdapListener::bind("127.0.0.1:0", service).await.unwrap();
    let stream = tokio::net::TcpStream::connect(listener.local_addr()).await.unwrap();
    let mut framed = Framed::new(stream, LdapCodec::new());

    // Abandon is answered with silence, so the first reply is the delete's.
    framed
        .send(LdapMessage::new(6, ProtocolOp::AbandonRequest(3)))
        .await
        .unwrap();
    framed
        .send(LdapMessage::new(7, ProtocolOp::Unsupported { tag: DEL_REQUEST }))
        .await
        .unwrap();
    let reply = framed.next().await.unwrap().unwrap();

    assert_eq!(reply.id, 7);
    match reply.op {
        ProtocolOp::GenericResponse { tag, result } => {
            assert_eq!(tag, DEL_RESPONSE);
            assert_eq!(result.code, ResultCode::UnwillingToPerform);
        }
        other => panic!("expected a delete response, got {other:?}"),
    }
    listener.stop().await;
}

#[tokio::test]
async fn test_stop_closes_open_connections() {
    let service = service();
    let listener = LdapListener::bind("127.0.0.1:0", service).await.unwrap();
    let mut client = LdapClient::connect(&listener.local_addr().to_string())
        .await
        .unwrap();
    assert!(client.simple_bind("", "").await.unwrap().code.is_success());

    listener.stop().await;

    assert!(client.simple_bind(ADMIN, "secret").await.is_err());
}
