use anyhow::{Context, Result};
use log::info;
use rusqlite::types::Value;
use rusqlite::{Connection, ToSql, Transaction};
use std::path::{Path, PathBuf};

mod schema;

pub mod models;
pub mod store;

#[cfg(test)]
mod tests;

pub use store::Record;

/// Handle to the single file-backed ledger database.
///
/// The handle owns persistence exclusively; other components only ever go
/// through its operations. Every public operation is its own unit of work: a
/// connection is opened, the operation runs, and the connection is released
/// on every exit path. Multi-step work that must commit together goes
/// through [`Database::with_transaction`].
pub struct Database {
    path: PathBuf,
}

impl Database {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Create the database file and schema if they do not exist yet.
    pub fn initialize(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)
                    .context("Failed to create database directory")?;
            }
        }
        let mut conn = self.connect()?;
        schema::create_schema(&mut conn).context("Failed to create database schema")?;
        info!("Database initialized at {}", self.path.display());
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn connect(&self) -> Result<Connection> {
        Connection::open(&self.path)
            .with_context(|| format!("Failed to open database at {}", self.path.display()))
    }

    /// Run `op` against a freshly opened connection, released afterwards.
    pub fn with_connection<T>(&self, op: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let conn = self.connect()?;
        op(&conn)
    }

    /// Run `op` inside a single transaction: committed when `op` succeeds,
    /// rolled back when it fails.
    pub fn with_transaction<T>(&self, op: impl FnOnce(&Transaction) -> Result<T>) -> Result<T> {
        let mut conn = self.connect()?;
        let tx = conn
            .transaction()
            .context("Failed to start a transaction")?;
        let out = op(&tx)?;
        tx.commit().context("Failed to commit transaction")?;
        Ok(out)
    }

    /// Fetch at most one record matching `column = value`.
    pub fn get_record<T: Record>(&self, column: &str, value: &dyn ToSql) -> Result<Option<T>> {
        self.with_connection(|conn| store::get_record(conn, column, value))
    }

    /// Fetch a column subset for the row matching `column = value`.
    pub fn get_record_fields<T: Record>(
        &self,
        column: &str,
        value: &dyn ToSql,
        fields: &[&str],
    ) -> Result<Option<Vec<Value>>> {
        self.with_connection(|conn| store::get_record_fields::<T>(conn, column, value, fields))
    }

    /// Apply a partial-field update to the row with the given id.
    pub fn update_record<T: Record>(&self, patch: &[(&str, Value)], id: i64) -> Result<()> {
        self.with_connection(|conn| store::update_record::<T>(conn, patch, id))
    }

    /// Remove the row with the given id; idempotent.
    pub fn delete_record<T: Record>(&self, id: i64) -> Result<()> {
        self.with_connection(|conn| store::delete_record::<T>(conn, id))
    }

    /// Bulk-insert rows, all-or-nothing.
    pub fn add_records<T: Record>(&self, rows: &[T]) -> Result<()> {
        self.with_transaction(|tx| store::insert_rows(tx, rows))
    }

    /// Remove every row of the record's table.
    pub fn clear_table<T: Record>(&self) -> Result<()> {
        self.with_connection(|conn| store::clear_table::<T>(conn))
    }

    /// Number of rows in the record's table.
    pub fn count_rows<T: Record>(&self) -> Result<u64> {
        self.with_connection(|conn| store::count_rows::<T>(conn))
    }

    /// Ids of every user row.
    pub fn user_ids(&self) -> Result<Vec<i64>> {
        self.with_connection(|conn| {
            let mut stmt = conn.prepare("SELECT id FROM users")?;
            let ids = stmt
                .query_map([], |row| row.get(0))?
                .collect::<rusqlite::Result<Vec<i64>>>()
                .context("Failed to read user ids")?;
            Ok(ids)
        })
    }
}
