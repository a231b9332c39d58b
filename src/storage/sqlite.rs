//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.

use crate::storage::schema::{create_table_sql, schema_for, TableSchema};
use crate::storage::traits::{Storage, StorageError, StorageResult};
use crate::storage::{FieldValue, Record};
use crate::HarvestError;
use rusqlite::{params_from_iter, Connection};
use std::path::Path;

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Creates a new SqliteStorage instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(HarvestError)` - Failed to open database
    pub fn new(path: &Path) -> Result<Self, HarvestError> {
        let conn = Connection::open(path).map_err(StorageError::from)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )
        .map_err(StorageError::from)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> Result<Self, HarvestError> {
        let conn = Connection::open_in_memory().map_err(StorageError::from)?;
        Ok(Self { conn })
    }

    /// Columns of a table as SQLite reports them, in declaration order
    fn table_columns(&self, schema: &TableSchema) -> StorageResult<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare(&format!("PRAGMA table_info('{}')", schema.name))?;
        let columns = stmt
            .query_map([], |row| row.get::<_, String>(1))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(columns)
    }

    fn query_records(&self, sql: &str) -> StorageResult<Vec<Record>> {
        let mut stmt = self.conn.prepare(sql)?;
        let names: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();

        let records = stmt
            .query_map([], |row| {
                let mut record = Record::new();
                for (idx, name) in names.iter().enumerate() {
                    record.insert(name.clone(), FieldValue::from(row.get_ref(idx)?));
                }
                Ok(record)
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(records)
    }
}

fn known_table(table: &str) -> StorageResult<&'static TableSchema> {
    schema_for(table).ok_or_else(|| StorageError::UnknownTable(table.to_string()))
}

impl Storage for SqliteStorage {
    fn create_table(&mut self, table: &str) -> StorageResult<()> {
        let schema = known_table(table)?;
        self.conn.execute(&create_table_sql(schema), [])?;
        Ok(())
    }

    fn insert_into(&mut self, table: &str, records: &[Record]) -> StorageResult<()> {
        let schema = known_table(table)?;
        if records.is_empty() {
            return Ok(());
        }

        let columns = self.table_columns(schema)?;
        if columns.is_empty() {
            return Err(StorageError::UnknownTable(table.to_string()));
        }

        // Validate everything before touching the table
        for record in records {
            let matches = record.len() == columns.len()
                && columns.iter().all(|column| record.contains_key(column));
            if !matches {
                return Err(StorageError::SchemaMismatch {
                    table: table.to_string(),
                    expected: columns,
                    found: record.keys().cloned().collect(),
                });
            }
        }

        let placeholders = (1..=columns.len())
            .map(|i| format!("?{}", i))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "INSERT OR REPLACE INTO {} ({}) VALUES ({})",
            schema.name,
            columns.join(", "),
            placeholders
        );

        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(&sql)?;
            for record in records {
                stmt.execute(params_from_iter(columns.iter().map(|c| &record[c])))?;
            }
        }
        tx.commit()?;

        tracing::debug!("Inserted {} records into {}", records.len(), schema.name);
        Ok(())
    }

    fn load_all(&self, table: &str) -> StorageResult<Vec<Record>> {
        let schema = known_table(table)?;
        self.query_records(&format!("SELECT * FROM {} ORDER BY rowid", schema.name))
    }

    fn preview(&self, table: &str, limit: usize) -> StorageResult<Vec<Record>> {
        let schema = known_table(table)?;
        self.query_records(&format!(
            "SELECT * FROM {} ORDER BY rowid LIMIT {}",
            schema.name, limit
        ))
    }

    fn count_rows(&self, table: &str) -> StorageResult<u64> {
        let schema = known_table(table)?;
        let count: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", schema.name),
            [],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }
}
