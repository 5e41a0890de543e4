#![allow(dead_code)]

use firetrack_core::db::{open_db_in_memory, seed_core_documents, seed_core_schema};
use firetrack_core::{
    Document, DocumentName, DocumentQuery, DocumentStore, FieldDescriptor, FieldFilter,
    FieldType, FieldValue, SchemaError, SchemaMetadata, SchemaRegistry, SqliteDocumentStore,
    StoreError, StoreResult,
};
use firetrack_core::schema::SchemaResult;
use rusqlite::Connection;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Migrated in-memory database with baseline schema and reference documents.
pub fn seeded_db() -> Connection {
    let conn = open_db_in_memory().unwrap();
    seed_core_schema(&conn).unwrap();
    seed_core_documents(&conn).unwrap();
    conn
}

pub fn register(conn: &Connection, kind: &str, fields: &[(&str, FieldType)]) {
    let registry = SchemaRegistry::new(conn);
    registry.register_kind(kind).unwrap();
    for (fieldname, fieldtype) in fields {
        registry
            .register_field(&FieldDescriptor::new(kind, *fieldname, *fieldtype))
            .unwrap();
    }
}

/// In-memory schema metadata; lookups can be switched to fail.
#[derive(Default)]
pub struct FakeSchema {
    kinds: HashMap<String, Vec<FieldDescriptor>>,
    pub lookups: AtomicUsize,
    pub failing: AtomicBool,
}

impl FakeSchema {
    pub fn with_kind(mut self, kind: &str, fields: &[&str]) -> Self {
        let descriptors = fields
            .iter()
            .map(|field| FieldDescriptor::new(kind, *field, FieldType::Data))
            .collect();
        self.kinds.insert(kind.to_string(), descriptors);
        self
    }

    pub fn with_link(mut self, kind: &str, field: &str, target: &str) -> Self {
        self.kinds
            .entry(kind.to_string())
            .or_default()
            .push(FieldDescriptor::link(kind, field, target));
        self
    }
}

impl SchemaMetadata for FakeSchema {
    fn kind_exists(&self, kind: &str) -> SchemaResult<bool> {
        self.lookups.fetch_add(1, Ordering::Relaxed);
        if self.failing.load(Ordering::Relaxed) {
            return Err(SchemaError::InvalidData("metadata offline".to_string()));
        }
        Ok(self.kinds.contains_key(kind))
    }

    fn describe_field(&self, kind: &str, fieldname: &str) -> SchemaResult<Option<FieldDescriptor>> {
        self.lookups.fetch_add(1, Ordering::Relaxed);
        if self.failing.load(Ordering::Relaxed) {
            return Err(SchemaError::InvalidData("metadata offline".to_string()));
        }
        let fields = self
            .kinds
            .get(kind)
            .ok_or_else(|| SchemaError::UnknownKind(kind.to_string()))?;
        if fieldname == "name" {
            return Ok(Some(FieldDescriptor::new(kind, "name", FieldType::Data)));
        }
        Ok(fields
            .iter()
            .find(|descriptor| descriptor.fieldname == fieldname)
            .cloned())
    }
}

/// SQLite store wrapper that counts reads and mutations and can lie or fail
/// on reads.
///
/// `stale_reads` hides existing documents from the next N lookups, which is
/// what a caller racing another writer observes.
pub struct WatchedStore<'conn> {
    inner: SqliteDocumentStore<'conn>,
    pub reads: AtomicUsize,
    pub creates: AtomicUsize,
    pub mutations: AtomicUsize,
    pub stale_reads: AtomicUsize,
    pub failing_reads: AtomicBool,
}

impl<'conn> WatchedStore<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self {
            inner: SqliteDocumentStore::new(conn),
            reads: AtomicUsize::new(0),
            creates: AtomicUsize::new(0),
            mutations: AtomicUsize::new(0),
            stale_reads: AtomicUsize::new(0),
            failing_reads: AtomicBool::new(false),
        }
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::Relaxed)
    }

    pub fn creates(&self) -> usize {
        self.creates.load(Ordering::Relaxed)
    }

    pub fn mutations(&self) -> usize {
        self.mutations.load(Ordering::Relaxed)
    }

    fn read_gate(&self) -> StoreResult<bool> {
        self.reads.fetch_add(1, Ordering::Relaxed);
        if self.failing_reads.load(Ordering::Relaxed) {
            return Err(StoreError::InvalidData("store offline".to_string()));
        }
        let hidden = self
            .stale_reads
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |left| left.checked_sub(1))
            .is_ok();
        Ok(hidden)
    }

    fn mutated(&self) {
        self.mutations.fetch_add(1, Ordering::Relaxed);
    }
}

impl DocumentStore for WatchedStore<'_> {
    fn get_document(&self, kind: &str, name: &DocumentName) -> StoreResult<Option<Document>> {
        if self.read_gate()? {
            return Ok(None);
        }
        self.inner.get_document(kind, name)
    }

    fn document_exists(&self, kind: &str, name: &DocumentName) -> StoreResult<bool> {
        if self.read_gate()? {
            return Ok(false);
        }
        self.inner.document_exists(kind, name)
    }

    fn create_document(&self, document: &Document) -> StoreResult<DocumentName> {
        self.creates.fetch_add(1, Ordering::Relaxed);
        self.mutated();
        self.inner.create_document(document)
    }

    fn update_document(&self, document: &Document) -> StoreResult<()> {
        self.mutated();
        self.inner.update_document(document)
    }

    fn set_field(
        &self,
        kind: &str,
        name: &DocumentName,
        field: &str,
        value: &FieldValue,
    ) -> StoreResult<()> {
        self.mutated();
        self.inner.set_field(kind, name, field, value)
    }

    fn delete_document(&self, kind: &str, name: &DocumentName) -> StoreResult<()> {
        self.mutated();
        self.inner.delete_document(kind, name)
    }

    fn find_by_field(&self, kind: &str, filter: &FieldFilter) -> StoreResult<Option<DocumentName>> {
        if self.read_gate()? {
            return Ok(None);
        }
        self.inner.find_by_field(kind, filter)
    }

    fn list_documents(&self, query: &DocumentQuery) -> StoreResult<Vec<DocumentName>> {
        if self.read_gate()? {
            return Ok(Vec::new());
        }
        self.inner.list_documents(query)
    }
}
