mod support;

use firetrack_core::db::{open_db_in_memory, seed_core_schema};
use firetrack_core::FieldType;
use firetrack_core::service::customer_service::CustomerService;
use firetrack_core::{
    sqlite_accessor, Document, DocumentName, DocumentQuery, DocumentStore, SchemaAccessor,
    ServiceError, SqliteDocumentStore, SqliteSchemaMetadata,
};
use std::sync::atomic::Ordering;
use support::{register, seeded_db, WatchedStore};

#[test]
fn ensure_customer_creates_once_with_group_defaults() {
    let conn = seeded_db();
    let store = WatchedStore::new(&conn);
    let service = CustomerService::new(SchemaAccessor::new(SqliteSchemaMetadata::new(&conn), &store));

    let first = service.ensure_customer("Acme Fire Services").unwrap();
    let second = service.ensure_customer("  Acme Fire Services ").unwrap();

    assert_eq!(first, second);
    assert_eq!(store.creates(), 1);

    let customer = store.get_document("customer", &first).unwrap().unwrap();
    assert_eq!(customer.text("customer_name"), Some("Acme Fire Services"));
    assert_eq!(customer.text("customer_group"), Some("All Customer Groups"));
    assert_eq!(customer.text("territory"), Some("All Territories"));
    assert_eq!(customer.text("customer_type"), Some("Company"));
}

#[test]
fn ensure_customer_rejects_blank_name_without_writing() {
    let conn = seeded_db();
    let store = WatchedStore::new(&conn);
    let service = CustomerService::new(SchemaAccessor::new(SqliteSchemaMetadata::new(&conn), &store));

    let err = service.ensure_customer("   ").unwrap_err();
    assert!(matches!(err, ServiceError::InvalidInput(ref message) if message == "Customer name required"));
    assert_eq!(store.mutations(), 0);
}

#[test]
fn find_customer_matches_id_or_display_name() {
    let conn = seeded_db();
    let service = CustomerService::new(sqlite_accessor(&conn));
    SqliteDocumentStore::new(&conn)
        .create_document(
            &Document::with_name("customer", "CUST-0042").with("customer_name", "Harbour Towers"),
        )
        .unwrap();

    assert_eq!(
        service.find_customer("CUST-0042").unwrap(),
        Some(DocumentName::new("CUST-0042"))
    );
    assert_eq!(
        service.find_customer("Harbour Towers").unwrap(),
        Some(DocumentName::new("CUST-0042"))
    );
    assert_eq!(service.find_customer("Unknown Pty Ltd").unwrap(), None);

    // An existing display name is reused rather than duplicated.
    assert_eq!(
        service.ensure_customer("Harbour Towers").unwrap(),
        DocumentName::new("CUST-0042")
    );
    let customers = SqliteDocumentStore::new(&conn)
        .list_documents(&DocumentQuery::new("customer"))
        .unwrap();
    assert_eq!(customers.len(), 1);
}

#[test]
fn group_defaults_fall_back_to_first_leaf_then_literal() {
    let conn = open_db_in_memory().unwrap();
    seed_core_schema(&conn).unwrap();
    let store = SqliteDocumentStore::new(&conn);
    store
        .create_document(&Document::with_name("territory", "Regions").with("is_group", true))
        .unwrap();
    store
        .create_document(&Document::with_name("territory", "Victoria").with("is_group", false))
        .unwrap();
    store
        .create_document(&Document::with_name("territory", "Tasmania").with("is_group", false))
        .unwrap();

    let service = CustomerService::new(sqlite_accessor(&conn));
    assert_eq!(service.default_territory(), "Tasmania");
    assert_eq!(service.default_customer_group(), "All Customer Groups");

    let name = service.ensure_customer("Acme").unwrap();
    let customer = store.get_document("customer", &name).unwrap().unwrap();
    assert_eq!(customer.text("territory"), Some("Tasmania"));
}

#[test]
fn store_failure_while_picking_defaults_does_not_block_creation() {
    let conn = seeded_db();
    let store = WatchedStore::new(&conn);
    let service = CustomerService::new(SchemaAccessor::new(SqliteSchemaMetadata::new(&conn), &store));

    // Root lookups run first and see a transient failure.
    store
        .failing_reads
        .store(true, Ordering::Relaxed);
    assert_eq!(service.default_customer_group(), "All Customer Groups");
    store
        .failing_reads
        .store(false, Ordering::Relaxed);

    assert!(service.ensure_customer("Acme").is_ok());
}

#[test]
fn existing_customer_is_returned_without_computing_defaults() {
    let conn = seeded_db();
    let store = WatchedStore::new(&conn);
    let service = CustomerService::new(SchemaAccessor::new(SqliteSchemaMetadata::new(&conn), &store));
    let created = service.ensure_customer("Acme").unwrap();

    store.reads.store(0, Ordering::Relaxed);
    assert_eq!(service.ensure_customer("Acme").unwrap(), created);
    assert_eq!(store.reads(), 1);
    assert_eq!(store.creates(), 1);
}

#[test]
fn first_leaf_default_needs_an_is_group_field() {
    let conn = open_db_in_memory().unwrap();
    register(&conn, "territory", &[("territory_name", FieldType::Data)]);
    let store = SqliteDocumentStore::new(&conn);
    store
        .create_document(&Document::with_name("territory", "Victoria").with("is_group", false))
        .unwrap();

    let service = CustomerService::new(sqlite_accessor(&conn));
    assert_eq!(service.default_territory(), "All Territories");
    assert_eq!(service.default_customer_group(), "All Customer Groups");
}
