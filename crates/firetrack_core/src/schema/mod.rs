//! Schema metadata boundary.
//!
//! # Responsibility
//! - Answer "does kind K define field F" and "what is F's declared type".
//! - Keep metadata lookups behind a trait so accessors can be exercised
//!   against fakes.
//!
//! # Invariants
//! - An unregistered kind is reported as `SchemaError::UnknownKind`, never
//!   as an empty field list.
//! - `name` is implicitly defined on every registered kind.

use crate::db::DbError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod sqlite_schema;

pub use sqlite_schema::{SchemaRegistry, SqliteSchemaMetadata};

pub type SchemaResult<T> = Result<T, SchemaError>;

/// Declared type of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    Data,
    Text,
    Int,
    Float,
    Check,
    Date,
    Datetime,
    Link,
    Attach,
    AttachImage,
    Select,
}

impl FieldType {
    /// Stable storage text.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Data => "Data",
            Self::Text => "Text",
            Self::Int => "Int",
            Self::Float => "Float",
            Self::Check => "Check",
            Self::Date => "Date",
            Self::Datetime => "Datetime",
            Self::Link => "Link",
            Self::Attach => "Attach",
            Self::AttachImage => "Attach Image",
            Self::Select => "Select",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "Data" => Some(Self::Data),
            "Text" => Some(Self::Text),
            "Int" => Some(Self::Int),
            "Float" => Some(Self::Float),
            "Check" => Some(Self::Check),
            "Date" => Some(Self::Date),
            "Datetime" => Some(Self::Datetime),
            "Link" => Some(Self::Link),
            "Attach" => Some(Self::Attach),
            "Attach Image" => Some(Self::AttachImage),
            "Select" => Some(Self::Select),
            _ => None,
        }
    }
}

/// Metadata of one field on one kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub kind: String,
    pub fieldname: String,
    pub fieldtype: FieldType,
    /// Target kind; set only for `FieldType::Link`.
    pub link_target: Option<String>,
}

impl FieldDescriptor {
    pub fn new(kind: impl Into<String>, fieldname: impl Into<String>, fieldtype: FieldType) -> Self {
        Self {
            kind: kind.into(),
            fieldname: fieldname.into(),
            fieldtype,
            link_target: None,
        }
    }

    /// Link field pointing at `target`.
    pub fn link(
        kind: impl Into<String>,
        fieldname: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        Self {
            kind: kind.into(),
            fieldname: fieldname.into(),
            fieldtype: FieldType::Link,
            link_target: Some(target.into()),
        }
    }

    /// True when this is a link to documents of `target`.
    pub fn links_to(&self, target: &str) -> bool {
        self.fieldtype == FieldType::Link && self.link_target.as_deref() == Some(target)
    }
}

/// Metadata lookup failures.
#[derive(Debug)]
pub enum SchemaError {
    UnknownKind(String),
    Db(DbError),
    InvalidData(String),
}

impl Display for SchemaError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownKind(kind) => write!(f, "unknown kind: {kind}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid schema metadata: {message}"),
        }
    }
}

impl Error for SchemaError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::UnknownKind(_) | Self::InvalidData(_) => None,
        }
    }
}

impl From<DbError> for SchemaError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for SchemaError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Read-only schema metadata service.
pub trait SchemaMetadata {
    /// Whether `kind` is defined in this deployment.
    fn kind_exists(&self, kind: &str) -> SchemaResult<bool>;

    /// Descriptor of `fieldname` on `kind`, `None` when the kind does not
    /// define it. Errors with `UnknownKind` when the kind itself is missing.
    fn describe_field(&self, kind: &str, fieldname: &str)
        -> SchemaResult<Option<FieldDescriptor>>;

    fn has_field(&self, kind: &str, fieldname: &str) -> SchemaResult<bool> {
        Ok(self.describe_field(kind, fieldname)?.is_some())
    }
}

impl<T: SchemaMetadata + ?Sized> SchemaMetadata for &T {
    fn kind_exists(&self, kind: &str) -> SchemaResult<bool> {
        (**self).kind_exists(kind)
    }

    fn describe_field(
        &self,
        kind: &str,
        fieldname: &str,
    ) -> SchemaResult<Option<FieldDescriptor>> {
        (**self).describe_field(kind, fieldname)
    }

    fn has_field(&self, kind: &str, fieldname: &str) -> SchemaResult<bool> {
        (**self).has_field(kind, fieldname)
    }
}
