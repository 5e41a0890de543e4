//! Core domain logic for FireTrack.
//! Schema-tolerant document access and inspection recurrence live here;
//! hosts (CLI, HTTP adapters) stay thin.

pub mod access;
pub mod config;
pub mod context;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod schedule;
pub mod schema;
pub mod service;

pub use access::{AccessError, AccessResult, FallbackChain, SchemaAccessor};
pub use config::{ConfigError, CoreConfig};
pub use context::RequestContext;
pub use db::{open_db, open_db_in_memory, seed_core_documents, seed_core_schema, DbError};
pub use logging::{
    default_log_level, init_logging, init_logging_from_config, logging_status, LoggingError,
};
pub use model::document::{Document, DocumentName, FieldValue};
pub use repo::document_repo::{
    DocumentQuery, DocumentStore, FieldFilter, FieldMatch, SqliteDocumentStore, StoreError,
    StoreResult,
};
pub use schedule::recurrence::{next_from_anchor, next_occurrence, parse_when, Frequency, When};
pub use schema::{
    FieldDescriptor, FieldType, SchemaError, SchemaMetadata, SchemaRegistry, SqliteSchemaMetadata,
};
pub use service::{ServiceError, ServiceResult};

/// Accessor wired to SQLite metadata and store over one connection.
pub type SqliteAccessor<'conn> =
    SchemaAccessor<SqliteSchemaMetadata<'conn>, SqliteDocumentStore<'conn>>;

/// Builds a [`SqliteAccessor`] over a migrated connection.
pub fn sqlite_accessor(conn: &rusqlite::Connection) -> SqliteAccessor<'_> {
    SchemaAccessor::new(SqliteSchemaMetadata::new(conn), SqliteDocumentStore::new(conn))
}

/// Minimal health-check API for host wiring.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
