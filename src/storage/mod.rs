//! Storage module for persisting harvested rows
//!
//! This module handles all database operations for the harvester, including:
//! - SQLite table creation from the fixed schema
//! - Transactional batch inserts validated against declared columns
//! - Reloading a stage's table as the input of the next stage

mod records;
mod schema;
mod sqlite;
mod traits;

pub use records::{ArticleData, ArticleUrl, Category, PageUrl};
pub use schema::{
    schema_for, TableSchema, ARTICLES_DATA_TABLE, ARTICLES_URLS_TABLE, CATEGORIES_TABLE,
    PAGES_URLS_TABLE, TABLES,
};
pub use sqlite::SqliteStorage;
pub use traits::{Storage, StorageError, StorageResult};

use crate::HarvestError;
use rusqlite::types::{ToSqlOutput, Value, ValueRef};
use rusqlite::ToSql;
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

/// Initializes or opens a storage database
pub fn open_storage(path: &Path) -> Result<SqliteStorage, HarvestError> {
    SqliteStorage::new(path)
}

/// A single column value as stored in SQLite
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Integer(value)
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(FieldValue::Null)
    }
}

impl From<ValueRef<'_>> for FieldValue {
    fn from(value: ValueRef<'_>) -> Self {
        match value {
            ValueRef::Null => FieldValue::Null,
            ValueRef::Integer(i) => FieldValue::Integer(i),
            ValueRef::Real(f) => FieldValue::Real(f),
            ValueRef::Text(t) => FieldValue::Text(String::from_utf8_lossy(t).into_owned()),
            ValueRef::Blob(b) => FieldValue::Text(String::from_utf8_lossy(b).into_owned()),
        }
    }
}

impl ToSql for FieldValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            FieldValue::Null => ToSqlOutput::Owned(Value::Null),
            FieldValue::Integer(i) => ToSqlOutput::Owned(Value::Integer(*i)),
            FieldValue::Real(f) => ToSqlOutput::Owned(Value::Real(*f)),
            FieldValue::Text(t) => ToSqlOutput::Borrowed(ValueRef::Text(t.as_bytes())),
        })
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Null => write!(f, "NULL"),
            FieldValue::Integer(i) => write!(f, "{}", i),
            FieldValue::Real(r) => write!(f, "{}", r),
            FieldValue::Text(t) => write!(f, "'{}'", t),
        }
    }
}

/// One row as a column name to value map
pub type Record = BTreeMap<String, FieldValue>;

/// A typed row belonging to one table
///
/// Rows are converted to [`Record`]s at the persistence boundary and parsed
/// back when a later stage reloads the table.
pub trait Row: Sized {
    /// Name of the table this row is written to
    const TABLE: &'static str;

    fn to_record(&self) -> Record;

    fn from_record(record: &Record) -> StorageResult<Self>;
}

/// Reads a required integer column
pub(crate) fn integer_field(
    record: &Record,
    table: &'static str,
    column: &str,
) -> StorageResult<i64> {
    match field(record, table, column)? {
        FieldValue::Integer(i) => Ok(*i),
        _ => Err(StorageError::InvalidField {
            table,
            column: column.to_string(),
            expected: "an integer",
        }),
    }
}

/// Reads a required text column
pub(crate) fn text_field(
    record: &Record,
    table: &'static str,
    column: &str,
) -> StorageResult<String> {
    optional_text_field(record, table, column)?.ok_or_else(|| StorageError::InvalidField {
        table,
        column: column.to_string(),
        expected: "text",
    })
}

/// Reads a nullable text column
pub(crate) fn optional_text_field(
    record: &Record,
    table: &'static str,
    column: &str,
) -> StorageResult<Option<String>> {
    match field(record, table, column)? {
        FieldValue::Null => Ok(None),
        FieldValue::Text(t) => Ok(Some(t.clone())),
        _ => Err(StorageError::InvalidField {
            table,
            column: column.to_string(),
            expected: "text or NULL",
        }),
    }
}

fn field<'a>(record: &'a Record, table: &'static str, column: &str) -> StorageResult<&'a FieldValue> {
    record.get(column).ok_or_else(|| StorageError::MissingField {
        table,
        column: column.to_string(),
    })
}
