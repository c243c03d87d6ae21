use anyhow::{bail, Context, Result};
use log::{debug, info, warn};
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection, OptionalExtension, Row, ToSql};

/// A persisted record type. Implementations declare the table they live in
/// and the column list the generic store operations are derived from.
pub trait Record: Sized {
    /// Table name.
    const TABLE: &'static str;

    /// Column names excluding the store-generated `id`, in declaration order.
    const COLUMNS: &'static [&'static str];

    /// Build a record from a `SELECT id, <COLUMNS...>` row.
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self>;

    /// Values for the insert column list, matching [`Record::COLUMNS`].
    fn insert_values(&self) -> Vec<Value>;
}

/// Reject column names outside the record's declared schema. Column names
/// cannot be bound as statement parameters, so this gate is what keeps the
/// interpolated identifiers safe.
fn check_column<T: Record>(column: &str) -> Result<()> {
    if column == "id" || T::COLUMNS.contains(&column) {
        Ok(())
    } else {
        bail!("unknown column {} for table {}", column, T::TABLE);
    }
}

/// Fetch at most one record matching `column = value`.
pub fn get_record<T: Record>(
    conn: &Connection,
    column: &str,
    value: &dyn ToSql,
) -> Result<Option<T>> {
    check_column::<T>(column)?;
    let sql = format!(
        "SELECT id, {} FROM {} WHERE {} = ?1",
        T::COLUMNS.join(", "),
        T::TABLE,
        column
    );
    let record = conn
        .query_row(&sql, [value], T::from_row)
        .optional()
        .with_context(|| format!("failed to query table {}", T::TABLE))?;
    if record.is_some() {
        debug!(
            "retrieved record from table {} with condition {} = value",
            T::TABLE,
            column
        );
    }
    Ok(record)
}

/// Positional variant of [`get_record`]: fetch a subset of columns for the
/// row matching `column = value`, without building the full record.
pub fn get_record_fields<T: Record>(
    conn: &Connection,
    column: &str,
    value: &dyn ToSql,
    fields: &[&str],
) -> Result<Option<Vec<Value>>> {
    check_column::<T>(column)?;
    for field in fields {
        check_column::<T>(field)?;
    }
    let sql = format!(
        "SELECT {} FROM {} WHERE {} = ?1",
        fields.join(", "),
        T::TABLE,
        column
    );
    conn.query_row(&sql, [value], |row| {
        (0..fields.len())
            .map(|i| row.get::<_, Value>(i))
            .collect::<rusqlite::Result<Vec<_>>>()
    })
    .optional()
    .with_context(|| format!("failed to query fields from table {}", T::TABLE))
}

/// Apply a partial-field update to the row with the given id. An empty patch
/// is a warning no-op. Patch contents are the caller's to validate.
pub fn update_record<T: Record>(
    conn: &Connection,
    patch: &[(&str, Value)],
    id: i64,
) -> Result<()> {
    if patch.is_empty() {
        warn!("no data provided for update of table {}", T::TABLE);
        return Ok(());
    }
    for (column, _) in patch {
        check_column::<T>(column)?;
    }
    let assignments = patch
        .iter()
        .enumerate()
        .map(|(i, (column, _))| format!("{} = ?{}", column, i + 1))
        .collect::<Vec<_>>()
        .join(", ");
    let sql = format!(
        "UPDATE {} SET {} WHERE id = ?{}",
        T::TABLE,
        assignments,
        patch.len() + 1
    );
    let mut values: Vec<Value> = patch.iter().map(|(_, value)| value.clone()).collect();
    values.push(Value::Integer(id));
    conn.execute(&sql, params_from_iter(values))
        .with_context(|| format!("failed to update record {} in table {}", id, T::TABLE))?;
    info!("record with id {} in table {} updated", id, T::TABLE);
    Ok(())
}

/// Remove the row with the given id. Deleting an absent id is not an error.
pub fn delete_record<T: Record>(conn: &Connection, id: i64) -> Result<()> {
    let sql = format!("DELETE FROM {} WHERE id = ?1", T::TABLE);
    let deleted = conn
        .execute(&sql, [id])
        .with_context(|| format!("failed to delete record {} from table {}", id, T::TABLE))?;
    if deleted == 0 {
        debug!("no record with id {} in table {}", id, T::TABLE);
    } else {
        info!("record with id {} in table {} deleted", id, T::TABLE);
    }
    Ok(())
}

/// Insert rows one statement execution at a time. Callers that need
/// all-or-nothing semantics run this inside a transaction
/// (see [`crate::database::Database::add_records`]).
pub fn insert_rows<T: Record>(conn: &Connection, rows: &[T]) -> Result<()> {
    if rows.is_empty() {
        warn!("no rows provided for insert into table {}", T::TABLE);
        return Ok(());
    }
    let placeholders = (1..=T::COLUMNS.len())
        .map(|i| format!("?{}", i))
        .collect::<Vec<_>>()
        .join(", ");
    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        T::TABLE,
        T::COLUMNS.join(", "),
        placeholders
    );
    let mut stmt = conn
        .prepare(&sql)
        .with_context(|| format!("failed to prepare insert for table {}", T::TABLE))?;
    for row in rows {
        stmt.execute(params_from_iter(row.insert_values()))
            .with_context(|| format!("failed to insert row into table {}", T::TABLE))?;
    }
    info!("{} rows added to table {}", rows.len(), T::TABLE);
    Ok(())
}

/// Remove every row; used to reset state between scenarios.
pub fn clear_table<T: Record>(conn: &Connection) -> Result<()> {
    let sql = format!("DELETE FROM {}", T::TABLE);
    let deleted = conn
        .execute(&sql, [])
        .with_context(|| format!("failed to clear table {}", T::TABLE))?;
    info!("cleared {} rows from table {}", deleted, T::TABLE);
    Ok(())
}

/// Number of rows currently in the table.
pub fn count_rows<T: Record>(conn: &Connection) -> Result<u64> {
    let sql = format!("SELECT COUNT(*) FROM {}", T::TABLE);
    let count: i64 = conn
        .query_row(&sql, [], |row| row.get(0))
        .with_context(|| format!("failed to count rows in table {}", T::TABLE))?;
    Ok(count as u64)
}
