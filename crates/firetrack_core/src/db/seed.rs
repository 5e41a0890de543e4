//! Baseline kinds, fields and reference documents.
//!
//! # Responsibility
//! - Register the kinds and fields core services rely on.
//! - Upsert the reference documents (root groups, AS1851 suites).
//!
//! # Invariants
//! - Seeding is idempotent; re-running never duplicates rows.
//! - Optional install extensions (zones, location details, signature,
//!   contract/timezone on schedule rules) are deliberately not seeded.

use crate::model::document::{Document, DocumentName, FieldValue};
use crate::repo::document_repo::{DocumentStore, SqliteDocumentStore, StoreResult};
use crate::schema::{FieldDescriptor, FieldType, SchemaRegistry, SchemaResult};
use log::info;
use rusqlite::Connection;

/// Root customer group created by [`seed_core_documents`].
pub const ROOT_CUSTOMER_GROUP: &str = "All Customer Groups";
/// Root territory created by [`seed_core_documents`].
pub const ROOT_TERRITORY: &str = "All Territories";

enum Seed {
    Field(&'static str, FieldType),
    Link(&'static str, &'static str),
}

use Seed::{Field, Link};

const CORE_SCHEMA: &[(&str, &[Seed])] = &[
    (
        "customer",
        &[
            Field("customer_name", FieldType::Data),
            Link("customer_group", "customer_group"),
            Link("territory", "territory"),
            Field("customer_type", FieldType::Select),
        ],
    ),
    (
        "customer_group",
        &[
            Field("customer_group_name", FieldType::Data),
            Field("is_group", FieldType::Check),
        ],
    ),
    (
        "territory",
        &[
            Field("territory_name", FieldType::Data),
            Field("is_group", FieldType::Check),
        ],
    ),
    (
        "address",
        &[
            Field("address_title", FieldType::Data),
            Field("address_line1", FieldType::Data),
            Field("city", FieldType::Data),
            Field("country", FieldType::Data),
            Field("latitude", FieldType::Float),
            Field("longitude", FieldType::Float),
        ],
    ),
    (
        "property",
        &[
            Field("property_name", FieldType::Data),
            Link("property_customer", "customer"),
            Link("property_address", "address"),
        ],
    ),
    (
        "asset_type",
        &[
            Field("asset_type_code", FieldType::Data),
            Field("asset_type_label", FieldType::Data),
            Field("asset_type_default_frequency", FieldType::Select),
        ],
    ),
    (
        "asset",
        &[
            Link("asset_property", "property"),
            Link("asset_customer", "customer"),
            Link("asset_type", "asset_type"),
            Field("asset_label", FieldType::Data),
            Field("asset_status", FieldType::Select),
            Field("asset_make", FieldType::Data),
            Field("asset_model", FieldType::Data),
            Field("asset_serial", FieldType::Data),
            Field("asset_install_date", FieldType::Date),
        ],
    ),
    (
        "schedule_rule",
        &[
            Link("schedule_rule_property", "property"),
            Field("schedule_rule_frequency", FieldType::Select),
            Field("schedule_rule_anchor_date", FieldType::Date),
            Field("schedule_rule_next_occurrence", FieldType::Datetime),
        ],
    ),
    (
        "job",
        &[
            Link("job_property", "property"),
            Field("job_title", FieldType::Data),
            Field("job_status", FieldType::Select),
            Field("job_scheduled_start", FieldType::Datetime),
            Field("job_required_date", FieldType::Date),
        ],
    ),
    (
        "user",
        &[
            Field("full_name", FieldType::Data),
            Field("email", FieldType::Data),
        ],
    ),
    (
        "standard",
        &[
            Field("standard_code", FieldType::Data),
            Field("standard_label", FieldType::Data),
            Field("standard_version", FieldType::Data),
        ],
    ),
    (
        "test_suite",
        &[
            Field("test_suite_code", FieldType::Data),
            Field("test_suite_label", FieldType::Data),
            Link("test_suite_standard", "standard"),
            Field("test_suite_frequency", FieldType::Select),
            Field("test_suite_table_ref", FieldType::Data),
        ],
    ),
];

/// Registers the baseline kinds and fields.
pub fn seed_core_schema(conn: &Connection) -> SchemaResult<()> {
    let registry = SchemaRegistry::new(conn);
    for (kind, fields) in CORE_SCHEMA {
        registry.register_kind(kind)?;
        for field in *fields {
            let descriptor = match field {
                Field(fieldname, fieldtype) => FieldDescriptor::new(*kind, *fieldname, *fieldtype),
                Link(fieldname, target) => FieldDescriptor::link(*kind, *fieldname, *target),
            };
            registry.register_field(&descriptor)?;
        }
    }
    info!(
        "event=seed_schema module=db status=ok kinds={}",
        CORE_SCHEMA.len()
    );
    Ok(())
}

/// Upserts reference documents: root groups and the AS1851 pump suites.
pub fn seed_core_documents(conn: &Connection) -> StoreResult<()> {
    let store = SqliteDocumentStore::new(conn);

    upsert(
        &store,
        Document::with_name("customer_group", ROOT_CUSTOMER_GROUP)
            .with("customer_group_name", ROOT_CUSTOMER_GROUP)
            .with("is_group", true),
    )?;
    upsert(
        &store,
        Document::with_name("territory", ROOT_TERRITORY)
            .with("territory_name", ROOT_TERRITORY)
            .with("is_group", true),
    )?;

    let standard = upsert(
        &store,
        Document::with_name("standard", "AS1851-2018")
            .with("standard_code", "AS1851")
            .with(
                "standard_label",
                "AS 1851 Routine Service of Fire Protection Systems and Equipment",
            )
            .with("standard_version", "2018"),
    )?;

    for (label, code, frequency) in [
        ("AS1851-2018 Pump Annual", "AS1851-2018-pump-annual", "annual"),
        ("AS1851-2018 Pump Monthly", "AS1851-2018-pump-monthly", "monthly"),
    ] {
        upsert(
            &store,
            Document::with_name("test_suite", label)
                .with("test_suite_code", code)
                .with("test_suite_label", label)
                .with("test_suite_standard", FieldValue::from(&standard))
                .with("test_suite_frequency", frequency)
                .with("test_suite_table_ref", "Table 10"),
        )?;
    }

    info!("event=seed_documents module=db status=ok");
    Ok(())
}

fn upsert(store: &SqliteDocumentStore<'_>, document: Document) -> StoreResult<DocumentName> {
    if store.document_exists(&document.kind, &document.name)? {
        store.update_document(&document)?;
        return Ok(document.name);
    }
    store.create_document(&document)
}
