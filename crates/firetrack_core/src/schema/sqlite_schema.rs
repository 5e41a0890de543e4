//! SQLite-backed schema metadata and install-time registry.
//!
//! # Responsibility
//! - Read kind/field definitions from `schema_kinds` and `schema_fields`.
//! - Let an install register kinds and extend them with custom fields.
//!
//! # Invariants
//! - `register_field` is an upsert: re-registering updates type and target.
//! - Link fields always carry a target; other types never do.
//! - The reserved `name` field cannot be registered or dropped.

use super::{FieldDescriptor, FieldType, SchemaError, SchemaMetadata, SchemaResult};
use crate::model::document::NAME_FIELD;
use log::info;
use rusqlite::{params, Connection, OptionalExtension};

/// Schema metadata reader over a migrated connection.
pub struct SqliteSchemaMetadata<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteSchemaMetadata<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl SchemaMetadata for SqliteSchemaMetadata<'_> {
    fn kind_exists(&self, kind: &str) -> SchemaResult<bool> {
        kind_registered(self.conn, kind)
    }

    fn describe_field(
        &self,
        kind: &str,
        fieldname: &str,
    ) -> SchemaResult<Option<FieldDescriptor>> {
        if !kind_registered(self.conn, kind)? {
            return Err(SchemaError::UnknownKind(kind.to_string()));
        }
        if fieldname == NAME_FIELD {
            return Ok(Some(FieldDescriptor::new(kind, NAME_FIELD, FieldType::Data)));
        }

        let row = self
            .conn
            .query_row(
                "SELECT fieldtype, link_target
                 FROM schema_fields
                 WHERE kind = ?1 AND fieldname = ?2;",
                params![kind, fieldname],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, Option<String>>(1)?)),
            )
            .optional()?;

        row.map(|(fieldtype, link_target)| {
            descriptor_from_row(kind, fieldname, &fieldtype, link_target)
        })
        .transpose()
    }
}

/// Write access to schema metadata, used at install/seed time.
pub struct SchemaRegistry<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SchemaRegistry<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    /// Registers `kind`; no-op when it already exists.
    pub fn register_kind(&self, kind: &str) -> SchemaResult<()> {
        let kind = kind.trim();
        if kind.is_empty() {
            return Err(SchemaError::InvalidData("kind must not be blank".to_string()));
        }
        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO schema_kinds (kind) VALUES (?1);",
            [kind],
        )?;
        if inserted > 0 {
            info!("event=schema_register_kind module=schema status=ok kind={kind}");
        }
        Ok(())
    }

    /// Adds or updates one field definition on an already registered kind.
    pub fn register_field(&self, descriptor: &FieldDescriptor) -> SchemaResult<()> {
        validate_descriptor(descriptor)?;
        if !kind_registered(self.conn, &descriptor.kind)? {
            return Err(SchemaError::UnknownKind(descriptor.kind.clone()));
        }

        self.conn.execute(
            "INSERT INTO schema_fields (kind, fieldname, fieldtype, link_target)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT (kind, fieldname) DO UPDATE SET
                fieldtype = excluded.fieldtype,
                link_target = excluded.link_target;",
            params![
                descriptor.kind,
                descriptor.fieldname,
                descriptor.fieldtype.as_str(),
                descriptor.link_target,
            ],
        )?;
        info!(
            "event=schema_register_field module=schema status=ok kind={} field={} fieldtype={}",
            descriptor.kind,
            descriptor.fieldname,
            descriptor.fieldtype.as_str()
        );
        Ok(())
    }

    /// Removes one field definition. Returns whether it existed.
    ///
    /// Stored values for the field stay in place; they become unreachable
    /// through schema-tolerant access until the field is registered again.
    pub fn drop_field(&self, kind: &str, fieldname: &str) -> SchemaResult<bool> {
        if fieldname == NAME_FIELD {
            return Err(SchemaError::InvalidData(
                "the `name` field cannot be dropped".to_string(),
            ));
        }
        let removed = self.conn.execute(
            "DELETE FROM schema_fields WHERE kind = ?1 AND fieldname = ?2;",
            params![kind, fieldname],
        )?;
        Ok(removed > 0)
    }

    /// All registered fields of `kind`, sorted by field name.
    pub fn list_fields(&self, kind: &str) -> SchemaResult<Vec<FieldDescriptor>> {
        if !kind_registered(self.conn, kind)? {
            return Err(SchemaError::UnknownKind(kind.to_string()));
        }

        let mut stmt = self.conn.prepare(
            "SELECT fieldname, fieldtype, link_target
             FROM schema_fields
             WHERE kind = ?1
             ORDER BY fieldname ASC;",
        )?;
        let mut rows = stmt.query([kind])?;
        let mut fields = Vec::new();
        while let Some(row) = rows.next()? {
            let fieldname: String = row.get(0)?;
            let fieldtype: String = row.get(1)?;
            fields.push(descriptor_from_row(kind, &fieldname, &fieldtype, row.get(2)?)?);
        }
        Ok(fields)
    }
}

fn kind_registered(conn: &Connection, kind: &str) -> SchemaResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM schema_kinds WHERE kind = ?1);",
        [kind],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn descriptor_from_row(
    kind: &str,
    fieldname: &str,
    fieldtype: &str,
    link_target: Option<String>,
) -> SchemaResult<FieldDescriptor> {
    let fieldtype = FieldType::parse(fieldtype).ok_or_else(|| {
        SchemaError::InvalidData(format!(
            "invalid fieldtype `{fieldtype}` for {kind}.{fieldname}"
        ))
    })?;
    Ok(FieldDescriptor {
        kind: kind.to_string(),
        fieldname: fieldname.to_string(),
        fieldtype,
        link_target,
    })
}

fn validate_descriptor(descriptor: &FieldDescriptor) -> SchemaResult<()> {
    if descriptor.fieldname.trim().is_empty() {
        return Err(SchemaError::InvalidData(
            "fieldname must not be blank".to_string(),
        ));
    }
    if descriptor.fieldname == NAME_FIELD {
        return Err(SchemaError::InvalidData(
            "the `name` field is reserved".to_string(),
        ));
    }
    match (descriptor.fieldtype, descriptor.link_target.as_deref()) {
        (FieldType::Link, Some(target)) if !target.trim().is_empty() => Ok(()),
        (FieldType::Link, _) => Err(SchemaError::InvalidData(format!(
            "link field {}.{} needs a target kind",
            descriptor.kind, descriptor.fieldname
        ))),
        (_, Some(_)) => Err(SchemaError::InvalidData(format!(
            "only link fields may declare a target ({}.{})",
            descriptor.kind, descriptor.fieldname
        ))),
        (_, None) => Ok(()),
    }
}
