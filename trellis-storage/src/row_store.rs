//! Generic row interface handed to extensions as their persistence handle.

use crate::error::{StorageError, StorageResult};
use rusqlite::types::{Value as SqlValue, ValueRef};
use rusqlite::{params_from_iter, Connection};
use serde_json::{Map, Value};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// One result row, keyed by column name.
pub type Row = Map<String, Value>;

/// Outcome of a write statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunResult {
    /// Rows changed by the statement.
    pub changes: usize,
    /// Rowid of the most recent successful insert on this connection.
    pub last_id: i64,
}

/// The `get` / `all` / `run` persistence interface.
///
/// Parameters are bound positionally (`?1`, `?2`, ...). Booleans bind as
/// `0`/`1`; arrays and objects bind as their JSON text. Calls block on the
/// underlying connection, so async callers should go through
/// `tokio::task::spawn_blocking`.
pub trait RowStore: Send + Sync {
    /// Returns the first row produced by `query`, if any.
    fn get(&self, query: &str, params: &[Value]) -> StorageResult<Option<Row>>;

    /// Returns every row produced by `query`.
    fn all(&self, query: &str, params: &[Value]) -> StorageResult<Vec<Row>>;

    /// Executes a write statement.
    fn run(&self, query: &str, params: &[Value]) -> StorageResult<RunResult>;
}

/// SQLite-backed store sharing a single connection.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Opens (or creates) a database file.
    pub fn open(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;
        // Lets a second connection wait out an IMMEDIATE transaction.
        conn.busy_timeout(Duration::from_secs(5))?;
        Ok(Self::from_connection(conn))
    }

    /// Opens an in-memory database (for testing).
    pub fn open_in_memory() -> StorageResult<Self> {
        Ok(Self::from_connection(Connection::open_in_memory()?))
    }

    fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    pub(crate) fn lock(&self) -> StorageResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StorageError::Poisoned)
    }

    /// Runs a batch of semicolon-separated statements.
    pub fn execute_batch(&self, sql: &str) -> StorageResult<()> {
        self.lock()?.execute_batch(sql)?;
        Ok(())
    }

    fn query_rows(&self, query: &str, params: &[Value], limit: Option<usize>) -> StorageResult<Vec<Row>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(query)?;
        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();

        let mut rows = stmt.query(params_from_iter(params.iter().map(to_sql)))?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            let mut record = Map::with_capacity(columns.len());
            for (idx, column) in columns.iter().enumerate() {
                record.insert(column.clone(), from_sql(row.get_ref(idx)?));
            }
            out.push(record);
            if limit.is_some_and(|max| out.len() >= max) {
                break;
            }
        }
        Ok(out)
    }
}

impl RowStore for SqliteStore {
    fn get(&self, query: &str, params: &[Value]) -> StorageResult<Option<Row>> {
        Ok(self.query_rows(query, params, Some(1))?.into_iter().next())
    }

    fn all(&self, query: &str, params: &[Value]) -> StorageResult<Vec<Row>> {
        self.query_rows(query, params, None)
    }

    fn run(&self, query: &str, params: &[Value]) -> StorageResult<RunResult> {
        let conn = self.lock()?;
        let changes = conn.execute(query, params_from_iter(params.iter().map(to_sql)))?;
        Ok(RunResult {
            changes,
            last_id: conn.last_insert_rowid(),
        })
    }
}

fn to_sql(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
        Value::Number(n) => n
            .as_i64()
            .map(SqlValue::Integer)
            .or_else(|| n.as_f64().map(SqlValue::Real))
            .unwrap_or(SqlValue::Null),
        Value::String(s) => SqlValue::Text(s.clone()),
        other => SqlValue::Text(other.to_string()),
    }
}

fn from_sql(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        ValueRef::Text(t) => Value::String(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => Value::String(hex::encode(b)),
    }
}
