//! Document store contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide get/create/update/delete and field lookups for any kind.
//! - Keep SQL details inside the persistence boundary.
//!
//! # Invariants
//! - `(kind, name)` is unique; creating an existing pair is a `Conflict`.
//! - Field values are stored as JSON scalars, one row per field.
//! - Every mutation touches `documents.modified_at`.

use crate::db::DbError;
use crate::model::document::{Document, DocumentName, FieldValue, NAME_FIELD};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, ErrorCode, OptionalExtension};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type StoreResult<T> = Result<T, StoreError>;

/// Store-level failure. Propagated unmodified through accessors.
#[derive(Debug)]
pub enum StoreError {
    Db(DbError),
    NotFound { kind: String, name: DocumentName },
    Conflict { kind: String, name: DocumentName },
    InvalidData(String),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound { kind, name } => write!(f, "{kind} not found: {name}"),
            Self::Conflict { kind, name } => write!(f, "{kind} already exists: {name}"),
            Self::InvalidData(message) => write!(f, "invalid persisted document data: {message}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// How a field filter compares values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FieldMatch {
    #[default]
    Exact,
    /// ASCII case-insensitive comparison of text values.
    IgnoreCase,
}

/// One `field <match> value` condition.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldFilter {
    pub field: String,
    pub value: FieldValue,
    pub matching: FieldMatch,
}

impl FieldFilter {
    pub fn eq(field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
            matching: FieldMatch::Exact,
        }
    }

    pub fn eq_ignore_case(field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
            matching: FieldMatch::IgnoreCase,
        }
    }
}

/// Query options for listing documents of one kind.
#[derive(Debug, Clone, Default)]
pub struct DocumentQuery {
    pub kind: String,
    /// All filters must hold.
    pub filters: Vec<FieldFilter>,
    pub limit: Option<u32>,
}

impl DocumentQuery {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            ..Self::default()
        }
    }

    pub fn filter(mut self, filter: FieldFilter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Document store interface.
pub trait DocumentStore {
    fn get_document(&self, kind: &str, name: &DocumentName) -> StoreResult<Option<Document>>;
    fn document_exists(&self, kind: &str, name: &DocumentName) -> StoreResult<bool>;
    /// Inserts a new document and returns its name.
    fn create_document(&self, document: &Document) -> StoreResult<DocumentName>;
    /// Replaces all fields of an existing document.
    fn update_document(&self, document: &Document) -> StoreResult<()>;
    /// Writes one field of an existing document.
    fn set_field(
        &self,
        kind: &str,
        name: &DocumentName,
        field: &str,
        value: &FieldValue,
    ) -> StoreResult<()>;
    fn delete_document(&self, kind: &str, name: &DocumentName) -> StoreResult<()>;
    /// First document (by name order) whose `filter` holds.
    fn find_by_field(&self, kind: &str, filter: &FieldFilter) -> StoreResult<Option<DocumentName>>;
    /// Names of documents matching `query`, sorted by name.
    fn list_documents(&self, query: &DocumentQuery) -> StoreResult<Vec<DocumentName>>;
}

impl<T: DocumentStore + ?Sized> DocumentStore for &T {
    fn get_document(&self, kind: &str, name: &DocumentName) -> StoreResult<Option<Document>> {
        (**self).get_document(kind, name)
    }

    fn document_exists(&self, kind: &str, name: &DocumentName) -> StoreResult<bool> {
        (**self).document_exists(kind, name)
    }

    fn create_document(&self, document: &Document) -> StoreResult<DocumentName> {
        (**self).create_document(document)
    }

    fn update_document(&self, document: &Document) -> StoreResult<()> {
        (**self).update_document(document)
    }

    fn set_field(
        &self,
        kind: &str,
        name: &DocumentName,
        field: &str,
        value: &FieldValue,
    ) -> StoreResult<()> {
        (**self).set_field(kind, name, field, value)
    }

    fn delete_document(&self, kind: &str, name: &DocumentName) -> StoreResult<()> {
        (**self).delete_document(kind, name)
    }

    fn find_by_field(&self, kind: &str, filter: &FieldFilter) -> StoreResult<Option<DocumentName>> {
        (**self).find_by_field(kind, filter)
    }

    fn list_documents(&self, query: &DocumentQuery) -> StoreResult<Vec<DocumentName>> {
        (**self).list_documents(query)
    }
}

/// SQLite-backed document store.
pub struct SqliteDocumentStore<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteDocumentStore<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    fn touch(&self, kind: &str, name: &DocumentName) -> StoreResult<()> {
        let changed = self.conn.execute(
            "UPDATE documents
             SET modified_at = (strftime('%s', 'now') * 1000)
             WHERE kind = ?1 AND name = ?2;",
            params![kind, name.as_str()],
        )?;
        if changed == 0 {
            return Err(not_found(kind, name));
        }
        Ok(())
    }
}

impl DocumentStore for SqliteDocumentStore<'_> {
    fn get_document(&self, kind: &str, name: &DocumentName) -> StoreResult<Option<Document>> {
        if !self.document_exists(kind, name)? {
            return Ok(None);
        }

        let mut stmt = self.conn.prepare(
            "SELECT fieldname, value
             FROM document_fields
             WHERE kind = ?1 AND name = ?2
             ORDER BY fieldname ASC;",
        )?;
        let mut rows = stmt.query(params![kind, name.as_str()])?;
        let mut fields = BTreeMap::new();
        while let Some(row) = rows.next()? {
            let fieldname: String = row.get(0)?;
            let raw: String = row.get(1)?;
            let value = decode_value(&raw).map_err(|err| {
                StoreError::InvalidData(format!(
                    "invalid value for {kind}.{fieldname} on `{name}`: {err}"
                ))
            })?;
            fields.insert(fieldname, value);
        }

        Ok(Some(Document {
            kind: kind.to_string(),
            name: name.clone(),
            fields,
        }))
    }

    fn document_exists(&self, kind: &str, name: &DocumentName) -> StoreResult<bool> {
        let exists: i64 = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM documents WHERE kind = ?1 AND name = ?2);",
            params![kind, name.as_str()],
            |row| row.get(0),
        )?;
        Ok(exists == 1)
    }

    fn create_document(&self, document: &Document) -> StoreResult<DocumentName> {
        validate_document(document)?;

        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "INSERT INTO documents (kind, name) VALUES (?1, ?2);",
            params![document.kind, document.name.as_str()],
        )
        .map_err(|err| map_insert_error(err, document))?;
        insert_fields(&tx, document)?;
        tx.commit()?;

        Ok(document.name.clone())
    }

    fn update_document(&self, document: &Document) -> StoreResult<()> {
        validate_document(document)?;

        let tx = self.conn.unchecked_transaction()?;
        let changed = tx.execute(
            "UPDATE documents
             SET modified_at = (strftime('%s', 'now') * 1000)
             WHERE kind = ?1 AND name = ?2;",
            params![document.kind, document.name.as_str()],
        )?;
        if changed == 0 {
            return Err(not_found(&document.kind, &document.name));
        }
        tx.execute(
            "DELETE FROM document_fields WHERE kind = ?1 AND name = ?2;",
            params![document.kind, document.name.as_str()],
        )?;
        insert_fields(&tx, document)?;
        tx.commit()?;

        Ok(())
    }

    fn set_field(
        &self,
        kind: &str,
        name: &DocumentName,
        field: &str,
        value: &FieldValue,
    ) -> StoreResult<()> {
        if field == NAME_FIELD {
            return Err(StoreError::InvalidData(
                "documents cannot be renamed through set_field".to_string(),
            ));
        }

        let tx = self.conn.unchecked_transaction()?;
        SqliteDocumentStore::new(&tx).touch(kind, name)?;
        tx.execute(
            "INSERT INTO document_fields (kind, name, fieldname, value)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT (kind, name, fieldname) DO UPDATE SET value = excluded.value;",
            params![kind, name.as_str(), field, encode_value(value)?],
        )?;
        tx.commit()?;
        Ok(())
    }

    fn delete_document(&self, kind: &str, name: &DocumentName) -> StoreResult<()> {
        let removed = self.conn.execute(
            "DELETE FROM documents WHERE kind = ?1 AND name = ?2;",
            params![kind, name.as_str()],
        )?;
        if removed == 0 {
            return Err(not_found(kind, name));
        }
        Ok(())
    }

    fn find_by_field(&self, kind: &str, filter: &FieldFilter) -> StoreResult<Option<DocumentName>> {
        let query = DocumentQuery::new(kind).filter(filter.clone()).limit(1);
        Ok(self.list_documents(&query)?.into_iter().next())
    }

    fn list_documents(&self, query: &DocumentQuery) -> StoreResult<Vec<DocumentName>> {
        let mut sql = String::from("SELECT d.name FROM documents d WHERE d.kind = ?");
        let mut bind_values: Vec<Value> = vec![Value::Text(query.kind.clone())];

        for filter in &query.filters {
            if filter.field == NAME_FIELD {
                let name = filter.value.to_string();
                match filter.matching {
                    FieldMatch::Exact => sql.push_str(" AND d.name = ?"),
                    FieldMatch::IgnoreCase => sql.push_str(" AND lower(d.name) = lower(?)"),
                }
                bind_values.push(Value::Text(name));
                continue;
            }

            let comparison = match filter.matching {
                FieldMatch::Exact => "f.value = ?",
                FieldMatch::IgnoreCase => "lower(f.value) = lower(?)",
            };
            sql.push_str(&format!(
                " AND EXISTS (
                    SELECT 1 FROM document_fields f
                    WHERE f.kind = d.kind AND f.name = d.name
                      AND f.fieldname = ? AND {comparison}
                )"
            ));
            bind_values.push(Value::Text(filter.field.clone()));
            bind_values.push(Value::Text(encode_value(&filter.value)?));
        }

        sql.push_str(" ORDER BY d.name ASC");
        if let Some(limit) = query.limit {
            sql.push_str(" LIMIT ?");
            bind_values.push(Value::Integer(i64::from(limit)));
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut names = Vec::new();
        while let Some(row) = rows.next()? {
            names.push(DocumentName::new(row.get::<_, String>(0)?));
        }
        Ok(names)
    }
}

/// Reads `created_at`/`modified_at` epoch milliseconds for one document.
pub fn document_timestamps(
    conn: &Connection,
    kind: &str,
    name: &DocumentName,
) -> StoreResult<Option<(i64, i64)>> {
    let row = conn
        .query_row(
            "SELECT created_at, modified_at FROM documents WHERE kind = ?1 AND name = ?2;",
            params![kind, name.as_str()],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;
    Ok(row)
}

fn insert_fields(conn: &Connection, document: &Document) -> StoreResult<()> {
    let mut stmt = conn.prepare(
        "INSERT INTO document_fields (kind, name, fieldname, value) VALUES (?1, ?2, ?3, ?4);",
    )?;
    for (fieldname, value) in &document.fields {
        stmt.execute(params![
            document.kind,
            document.name.as_str(),
            fieldname,
            encode_value(value)?,
        ])?;
    }
    Ok(())
}

fn validate_document(document: &Document) -> StoreResult<()> {
    if document.kind.trim().is_empty() {
        return Err(StoreError::InvalidData("kind must not be blank".to_string()));
    }
    if document.name.as_str().trim().is_empty() {
        return Err(StoreError::InvalidData(format!(
            "{} name must not be blank",
            document.kind
        )));
    }
    if document.fields.contains_key(NAME_FIELD) {
        return Err(StoreError::InvalidData(
            "`name` must not be stored as a field".to_string(),
        ));
    }
    Ok(())
}

fn map_insert_error(err: rusqlite::Error, document: &Document) -> StoreError {
    match &err {
        rusqlite::Error::SqliteFailure(failure, _)
            if failure.code == ErrorCode::ConstraintViolation =>
        {
            StoreError::Conflict {
                kind: document.kind.clone(),
                name: document.name.clone(),
            }
        }
        _ => err.into(),
    }
}

fn not_found(kind: &str, name: &DocumentName) -> StoreError {
    StoreError::NotFound {
        kind: kind.to_string(),
        name: name.clone(),
    }
}

fn encode_value(value: &FieldValue) -> StoreResult<String> {
    serde_json::to_string(value)
        .map_err(|err| StoreError::InvalidData(format!("unencodable field value: {err}")))
}

fn decode_value(raw: &str) -> Result<FieldValue, serde_json::Error> {
    serde_json::from_str(raw)
}
