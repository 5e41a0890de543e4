mod support;

use firetrack_core::{
    sqlite_accessor, AccessError, Document, DocumentName, DocumentQuery, DocumentStore,
    FieldFilter, FieldValue, SchemaAccessor, SqliteDocumentStore, SqliteSchemaMetadata,
    StoreError,
};
use firetrack_core::db::open_db_in_memory;
use std::sync::atomic::Ordering;
use support::{register, seeded_db, FakeSchema, WatchedStore};

const CUSTOMER_KEYS: &[&str] = &["name", "customer_name"];

#[test]
fn field_exists_is_false_for_unknown_kind_and_undefined_field() {
    let conn = seeded_db();
    let access = sqlite_accessor(&conn);

    assert!(access.field_exists("customer", "customer_name"));
    assert!(!access.field_exists("customer", "customer_abn"));
    assert!(!access.field_exists("asset_zone", "zone_name"));
    assert!(!access.kind_exists("asset_zone"));
    assert!(access.kind_exists("asset"));
}

#[test]
fn metadata_failures_are_treated_as_absence() {
    let conn = open_db_in_memory().unwrap();
    let schema = FakeSchema::default().with_kind("customer", &["customer_name"]);
    schema.failing.store(true, Ordering::Relaxed);
    let access = SchemaAccessor::new(&schema, SqliteDocumentStore::new(&conn));

    assert!(!access.field_exists("customer", "customer_name"));
    assert!(!access.kind_exists("customer"));
    assert_eq!(
        access.first_existing_field("customer", &["customer_name"]),
        None
    );
}

#[test]
fn first_existing_field_honours_candidate_order() {
    let conn = open_db_in_memory().unwrap();
    let schema = FakeSchema::default().with_kind("user", &["signature_image", "signature"]);
    let access = SchemaAccessor::new(schema, SqliteDocumentStore::new(&conn));

    let candidates = ["user_signature", "signature", "signature_image"];
    assert_eq!(
        access.first_existing_field("user", &candidates),
        Some("signature")
    );
    assert_eq!(access.first_existing_field("user", &["user_signature"]), None);
    assert_eq!(access.first_existing_field("contact", &candidates), None);
}

#[test]
fn is_link_field_checks_type_and_target() {
    let conn = seeded_db();
    let access = sqlite_accessor(&conn);

    assert!(access.is_link_field("asset", "asset_property", "property"));
    assert!(!access.is_link_field("asset", "asset_property", "customer"));
    assert!(!access.is_link_field("asset", "asset_label", "property"));
    assert!(!access.is_link_field("asset_zone", "zone", "zone"));
}

#[test]
fn set_if_defined_touches_only_the_in_memory_document() {
    let conn = seeded_db();
    let store = WatchedStore::new(&conn);
    let access = SchemaAccessor::new(SqliteSchemaMetadata::new(&conn), &store);

    let mut asset = Document::new("asset");
    assert!(access.set_if_defined(&mut asset, "asset_make", "Tyco"));
    assert!(!access.set_if_defined(&mut asset, "asset_zone", "Level 2"));

    assert_eq!(asset.text("asset_make"), Some("Tyco"));
    assert!(asset.get("asset_zone").is_none());
    assert_eq!(store.mutations(), 0);
}

#[test]
fn persist_if_defined_issues_exactly_one_mutation_when_defined() {
    let conn = seeded_db();
    register(
        &conn,
        "user",
        &[("user_signature", firetrack_core::FieldType::AttachImage)],
    );
    let store = WatchedStore::new(&conn);
    let access = SchemaAccessor::new(SqliteSchemaMetadata::new(&conn), &store);
    let user = SqliteDocumentStore::new(&conn)
        .create_document(&Document::with_name("user", "tech@example.com"))
        .unwrap();

    assert!(access
        .persist_if_defined("user", &user, "user_signature", "/files/sig.png")
        .unwrap());
    assert_eq!(store.mutations(), 1);

    assert!(!access
        .persist_if_defined("user", &user, "signature", "/files/sig.png")
        .unwrap());
    assert!(!access
        .persist_if_defined("user", &user, "name", "someone-else")
        .unwrap());
    assert_eq!(store.mutations(), 1);

    let stored = store.get_document("user", &user).unwrap().unwrap();
    assert_eq!(stored.text("user_signature"), Some("/files/sig.png"));
}

#[test]
fn get_optional_returns_default_for_undefined_fields() {
    let conn = seeded_db();
    let access = sqlite_accessor(&conn);

    let asset = Document::with_name("asset", "A-1")
        .with("asset_make", "Tyco")
        .with("asset_zone", "stale value");

    assert_eq!(
        access.get_optional(&asset, "asset_make", FieldValue::Null),
        FieldValue::from("Tyco")
    );
    assert_eq!(
        access.get_optional(&asset, "asset_zone", FieldValue::from("n/a")),
        FieldValue::from("n/a")
    );
    assert_eq!(
        access.get_optional(&asset, "asset_model", FieldValue::Null),
        FieldValue::Null
    );
    assert_eq!(
        access.get_optional(&asset, "name", FieldValue::Null),
        FieldValue::from("A-1")
    );
}

#[test]
fn resolve_link_target_tries_name_then_defined_keys() {
    let conn = seeded_db();
    let access = sqlite_accessor(&conn);
    let store = access.store();
    store
        .create_document(&Document::with_name("customer", "CUST-0001").with("customer_name", "Acme"))
        .unwrap();

    assert_eq!(
        access
            .resolve_link_target("customer", CUSTOMER_KEYS, "CUST-0001")
            .unwrap(),
        Some(DocumentName::new("CUST-0001"))
    );
    assert_eq!(
        access
            .resolve_link_target("customer", CUSTOMER_KEYS, " Acme ")
            .unwrap(),
        Some(DocumentName::new("CUST-0001"))
    );
    assert_eq!(
        access
            .resolve_link_target("customer", &["customer_abn"], "Acme")
            .unwrap(),
        None
    );
    assert_eq!(
        access
            .resolve_link_target("customer", CUSTOMER_KEYS, "   ")
            .unwrap(),
        None
    );
}

#[test]
fn ensure_document_twice_returns_same_id_with_one_create() {
    let conn = seeded_db();
    let store = WatchedStore::new(&conn);
    let access = SchemaAccessor::new(SqliteSchemaMetadata::new(&conn), &store);

    let first = access
        .ensure_document("customer", CUSTOMER_KEYS, "Acme", &[])
        .unwrap();
    let second = access
        .ensure_document("customer", CUSTOMER_KEYS, "Acme", &[])
        .unwrap();

    assert_eq!(first, second);
    assert_eq!(first.as_str(), "Acme");
    assert_eq!(store.creates(), 1);

    let stored = store.get_document("customer", &first).unwrap().unwrap();
    assert_eq!(stored.text("customer_name"), Some("Acme"));
}

#[test]
fn ensure_document_applies_only_defined_defaults() {
    let conn = seeded_db();
    let access = sqlite_accessor(&conn);

    let name = access
        .ensure_document(
            "customer",
            CUSTOMER_KEYS,
            "Acme",
            &[
                ("customer_type", FieldValue::from("Company")),
                ("customer_abn", FieldValue::from("12 345 678 901")),
                ("customer_name", FieldValue::from("ignored")),
            ],
        )
        .unwrap();

    let stored = access.store().get_document("customer", &name).unwrap().unwrap();
    assert_eq!(stored.text("customer_type"), Some("Company"));
    assert_eq!(stored.text("customer_name"), Some("Acme"));
    assert!(stored.get("customer_abn").is_none());
}

#[test]
fn ensure_document_rejects_blank_and_unkeyable_values() {
    let conn = seeded_db();
    let store = WatchedStore::new(&conn);
    let access = SchemaAccessor::new(SqliteSchemaMetadata::new(&conn), &store);

    assert!(matches!(
        access.ensure_document("customer", CUSTOMER_KEYS, "  ", &[]),
        Err(AccessError::BlankKey { .. })
    ));
    assert!(matches!(
        access.ensure_document("customer", &["customer_abn"], "Acme", &[]),
        Err(AccessError::NoUsableKey { kind }) if kind == "customer"
    ));
    assert_eq!(store.mutations(), 0);
}

#[test]
fn ensure_document_converges_after_name_conflict() {
    let conn = seeded_db();
    SqliteDocumentStore::new(&conn)
        .create_document(&Document::with_name("customer", "Acme").with("customer_name", "Acme"))
        .unwrap();
    let store = WatchedStore::new(&conn);
    // The racing writer committed after our first existence check.
    store.stale_reads.store(1, Ordering::Relaxed);
    let access = SchemaAccessor::new(SqliteSchemaMetadata::new(&conn), &store);

    let name = access
        .ensure_document("customer", &["name"], "Acme", &[])
        .unwrap();

    assert_eq!(name.as_str(), "Acme");
    assert_eq!(store.creates(), 1);
    let customers = store
        .list_documents(&DocumentQuery::new("customer"))
        .unwrap();
    assert_eq!(customers, vec![DocumentName::new("Acme")]);
}

#[test]
fn ensure_document_on_field_only_key_can_duplicate_under_stale_reads() {
    let conn = seeded_db();
    let plain = SqliteDocumentStore::new(&conn);
    plain
        .create_document(&Document::new("customer").with("customer_name", "Acme"))
        .unwrap();
    let store = WatchedStore::new(&conn);
    store.stale_reads.store(1, Ordering::Relaxed);
    let access = SchemaAccessor::new(SqliteSchemaMetadata::new(&conn), &store);

    access
        .ensure_document("customer", &["customer_name"], "Acme", &[])
        .unwrap();

    let matches = plain
        .list_documents(
            &DocumentQuery::new("customer").filter(FieldFilter::eq("customer_name", "Acme")),
        )
        .unwrap();
    assert_eq!(matches.len(), 2);
}

#[test]
fn store_failures_propagate_unmodified() {
    let conn = seeded_db();
    let store = WatchedStore::new(&conn);
    store.failing_reads.store(true, Ordering::Relaxed);
    let access = SchemaAccessor::new(SqliteSchemaMetadata::new(&conn), &store);

    let err = access
        .ensure_document("customer", CUSTOMER_KEYS, "Acme", &[])
        .unwrap_err();
    assert!(matches!(
        err,
        AccessError::Store(StoreError::InvalidData(ref message)) if message == "store offline"
    ));
    assert!(access
        .resolve_link_target("customer", CUSTOMER_KEYS, "Acme")
        .is_err());
    assert_eq!(store.mutations(), 0);
}

#[test]
fn accessor_works_against_fake_metadata() {
    let conn = open_db_in_memory().unwrap();
    let schema = FakeSchema::default()
        .with_kind("territory", &["territory_name"])
        .with_link("customer", "territory", "territory");
    let access = SchemaAccessor::new(&schema, SqliteDocumentStore::new(&conn));

    let name = access
        .ensure_document("territory", &["territory_name"], "Victoria", &[])
        .unwrap();
    assert_ne!(name.as_str(), "Victoria");
    assert_eq!(
        access
            .resolve_link_target("territory", &["territory_name"], "Victoria")
            .unwrap(),
        Some(name)
    );
    assert!(access.is_link_field("customer", "territory", "territory"));
    assert!(schema.lookups.load(Ordering::Relaxed) > 0);
}
