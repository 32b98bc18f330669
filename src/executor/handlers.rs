//! Statement handlers
//!
//! Every handler follows the same sequence: take the table lock (released when
//! the guard drops, on every exit path), validate against the catalog, append
//! the change durably, then apply it to the in-memory table.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use serde::Serialize;
use tracing::info;

use crate::catalog::{SystemCatalog, SYSTEM_USER_TABLES};
use crate::error::{Error, Result};
use crate::sql::{
    CreateTableStatement, DeleteStatement, InsertStatement, SelectStatement, UpdateStatement,
};
use crate::storage::{BinaryWriter, Row, RowRecord, TableStore};
use crate::transaction::LockManager;

/// Text shown for a column a row has no value for
pub const NULL_TEXT: &str = "NULL";

/// Query result
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryResult {
    /// Column names
    pub columns: Vec<String>,
    /// Result rows, one value per column
    pub rows: Vec<Vec<String>>,
    /// Number of affected rows (for INSERT/UPDATE/DELETE)
    pub affected_rows: usize,
    /// Message
    pub message: Option<String>,
}

impl QueryResult {
    /// Create a result with a message
    pub fn with_message(message: impl Into<String>) -> Self {
        Self {
            columns: Vec::new(),
            rows: Vec::new(),
            affected_rows: 0,
            message: Some(message.into()),
        }
    }

    /// Create a result with affected rows count
    pub fn with_affected_rows(count: usize, message: impl Into<String>) -> Self {
        Self {
            affected_rows: count,
            ..Self::with_message(message)
        }
    }

    /// Create a result carrying rows
    pub fn with_rows(columns: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self {
            columns,
            rows,
            affected_rows: 0,
            message: None,
        }
    }
}

/// Shared state a handler works against
pub struct ExecutionContext<'a> {
    pub locks: &'a LockManager,
    pub catalog: &'a SystemCatalog,
    pub tables: &'a Mutex<HashMap<String, Arc<Mutex<TableStore>>>>,
    pub writer: &'a Mutex<Box<dyn BinaryWriter>>,
    pub data_dir: &'a Path,
    pub btree_order: usize,
}

impl ExecutionContext<'_> {
    /// Append `bytes` to the file of `table`; a rejected write becomes `IoFailure`
    fn append(&self, table: &str, bytes: &[u8]) -> Result<()> {
        let mut writer = lock_ignoring_poison(self.writer);
        writer.set_write_table(table)?;
        if writer.write(bytes) {
            Ok(())
        } else {
            Err(Error::IoFailure(table.to_string()))
        }
    }

    /// Fail with `UnknownTable` unless `name` is a user table
    fn ensure_user_table(&self, name: &str) -> Result<()> {
        if name != SYSTEM_USER_TABLES && self.catalog.contains(name) {
            Ok(())
        } else {
            Err(Error::UnknownTable(name.to_string()))
        }
    }

    /// The in-memory store of `name`, replaying its row log on first access
    fn table(&self, name: &str) -> Result<Arc<Mutex<TableStore>>> {
        let mut tables = lock_ignoring_poison(self.tables);
        if let Some(store) = tables.get(name) {
            return Ok(Arc::clone(store));
        }

        let store = Arc::new(Mutex::new(TableStore::load(
            name,
            self.data_dir,
            self.btree_order,
        )?));
        tables.insert(name.to_string(), Arc::clone(&store));
        Ok(store)
    }
}

fn lock_ignoring_poison<T: ?Sized>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

/// A statement that can be executed against the engine
pub trait StatementHandler {
    fn execute(&self, ctx: &ExecutionContext<'_>) -> Result<QueryResult>;
}

impl StatementHandler for CreateTableStatement {
    fn execute(&self, ctx: &ExecutionContext<'_>) -> Result<QueryResult> {
        let name = self.table_name.as_str();
        let _guard = ctx.locks.try_lock_guard(name)?;

        if ctx.catalog.contains(name) {
            return Err(Error::DuplicateTable(name.to_string()));
        }

        // Not atomic: a crash between the two appends leaves an unlisted table file
        ctx.append(name, &[])?;
        ctx.append(SYSTEM_USER_TABLES, &SystemCatalog::record(name))?;

        ctx.catalog.register(name);
        let store = TableStore::new(name, ctx.btree_order)?;
        lock_ignoring_poison(ctx.tables).insert(name.to_string(), Arc::new(Mutex::new(store)));

        info!(
            table = name,
            columns = self.columns.len(),
            constraints = self.constraints.len(),
            "table created"
        );
        Ok(QueryResult::with_message(format!("Table '{}' created", name)))
    }
}

impl StatementHandler for InsertStatement {
    fn execute(&self, ctx: &ExecutionContext<'_>) -> Result<QueryResult> {
        let name = self.table_name.as_str();
        let _guard = ctx.locks.try_lock_guard(name)?;
        ctx.ensure_user_table(name)?;

        let values: Row = self
            .columns
            .iter()
            .cloned()
            .zip(self.values.iter().cloned())
            .collect();

        let store = ctx.table(name)?;
        let mut store = lock_ignoring_poison(&*store);

        let row_id = store.allocate_row_id();
        let record = RowRecord::Insert { row_id, values };
        ctx.append(name, &record.encode()?)?;
        store.apply(record);

        info!(table = name, row_id, "row inserted");
        Ok(QueryResult::with_affected_rows(1, "1 row(s) inserted"))
    }
}

impl StatementHandler for SelectStatement {
    fn execute(&self, ctx: &ExecutionContext<'_>) -> Result<QueryResult> {
        let name = self.table_name.as_str();
        let _guard = ctx.locks.try_lock_guard(name)?;
        ctx.ensure_user_table(name)?;

        let store = ctx.table(name)?;
        let store = lock_ignoring_poison(&*store);

        if !store.is_empty() {
            if let Some(missing) = self.columns.iter().find(|c| !store.has_column(c)) {
                return Err(Error::ColumnNotFound(missing.clone(), name.to_string()));
            }
        }

        let rows: Vec<Vec<String>> = store
            .matching(self.where_clause.as_ref())
            .map(|(_, row)| {
                self.columns
                    .iter()
                    .map(|c| row.get(c).cloned().unwrap_or_else(|| NULL_TEXT.to_string()))
                    .collect()
            })
            .collect();

        Ok(QueryResult::with_rows(self.columns.clone(), rows))
    }
}

impl StatementHandler for DeleteStatement {
    fn execute(&self, ctx: &ExecutionContext<'_>) -> Result<QueryResult> {
        let name = self.table_name.as_str();
        let _guard = ctx.locks.try_lock_guard(name)?;
        ctx.ensure_user_table(name)?;

        let store = ctx.table(name)?;
        let mut store = lock_ignoring_poison(&*store);

        let records: Vec<RowRecord> = store
            .matching(self.where_clause.as_ref())
            .map(|(row_id, _)| RowRecord::Delete { row_id })
            .collect();

        let count = apply_logged(ctx, name, &mut store, records)?;
        Ok(QueryResult::with_affected_rows(
            count,
            format!("{} row(s) deleted", count),
        ))
    }
}

impl StatementHandler for UpdateStatement {
    fn execute(&self, ctx: &ExecutionContext<'_>) -> Result<QueryResult> {
        let name = self.table_name.as_str();
        let _guard = ctx.locks.try_lock_guard(name)?;
        ctx.ensure_user_table(name)?;

        let store = ctx.table(name)?;
        let mut store = lock_ignoring_poison(&*store);

        let records: Vec<RowRecord> = store
            .matching(self.where_clause.as_ref())
            .map(|(row_id, row)| {
                let mut values = row.clone();
                for (column, value) in &self.set_clauses {
                    values.insert(column.clone(), value.clone());
                }
                RowRecord::Update { row_id, values }
            })
            .collect();

        let count = apply_logged(ctx, name, &mut store, records)?;
        Ok(QueryResult::with_affected_rows(
            count,
            format!("{} row(s) updated", count),
        ))
    }
}

/// Append all records in one write, then apply them; returns how many there were
fn apply_logged(
    ctx: &ExecutionContext<'_>,
    table: &str,
    store: &mut TableStore,
    records: Vec<RowRecord>,
) -> Result<usize> {
    if records.is_empty() {
        return Ok(0);
    }

    let mut bytes = Vec::new();
    for record in &records {
        bytes.extend(record.encode()?);
    }
    ctx.append(table, &bytes)?;

    let count = records.len();
    for record in records {
        store.apply(record);
    }
    info!(table, rows = count, "rows changed");
    Ok(count)
}
