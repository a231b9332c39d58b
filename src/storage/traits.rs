//! Storage traits and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use crate::storage::Record;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Unknown table: {0}")]
    UnknownTable(String),

    #[error("Record columns {found:?} do not match table {table} columns {expected:?}")]
    SchemaMismatch {
        table: String,
        expected: Vec<String>,
        found: Vec<String>,
    },

    #[error("Missing column {column} in {table} record")]
    MissingField { table: &'static str, column: String },

    #[error("Column {column} in {table} record is not {expected}")]
    InvalidField {
        table: &'static str,
        column: String,
        expected: &'static str,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for storage backend implementations
///
/// Tables are addressed by name and must be declared in the schema.
pub trait Storage {
    /// Creates the named table if it does not exist yet
    fn create_table(&mut self, table: &str) -> StorageResult<()>;

    /// Inserts records into a table in a single transaction
    ///
    /// Either every record is written or none is. A record whose column set
    /// differs from the table's declared columns fails the whole call with
    /// [`StorageError::SchemaMismatch`]. Rows with an existing primary key
    /// are replaced.
    fn insert_into(&mut self, table: &str, records: &[Record]) -> StorageResult<()>;

    /// Loads every row of a table, in insertion order
    fn load_all(&self, table: &str) -> StorageResult<Vec<Record>>;

    /// Loads at most `limit` rows of a table
    fn preview(&self, table: &str, limit: usize) -> StorageResult<Vec<Record>>;

    /// Counts the rows of a table
    fn count_rows(&self, table: &str) -> StorageResult<u64>;
}
