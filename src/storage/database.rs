//! SQLite Store with Connection Pooling
//!
//! Production-ready SQLite layer featuring:
//! - Connection pooling via r2d2 for concurrent pipeline runs
//! - WAL mode and busy timeout for read/write overlap
//! - Transactional single-row inserts with rollback-on-drop
//!
//! Column names reaching an INSERT are re-checked against the column
//! identifier grammar even though parsing already validated them; values
//! are always bound as parameters, never interpolated.

use std::path::Path;

use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Connection;
use serde_json::Value;
use tracing::debug;

use super::{CorpusSummary, ProfileStore};
use crate::constants::storage::{PROFILES_TABLE, SUMMARY_TOP_N};
use crate::types::{ProfileRecord, StoreError, is_column_ident};

const SCHEMA: &str = include_str!("schema.sql");

// =============================================================================
// Pool Configuration
// =============================================================================

/// Connection pool configuration
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Maximum number of connections in the pool
    pub max_size: u32,
    /// Timeout for acquiring a connection (seconds)
    pub connection_timeout_secs: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_size: 8,
            connection_timeout_secs: 30,
        }
    }
}

// =============================================================================
// SqliteStore
// =============================================================================

/// Thread-safe profile store backed by a pooled SQLite database.
pub struct SqliteStore {
    pool: Pool<SqliteConnectionManager>,
}

impl SqliteStore {
    /// Open the store at the specified path with default pooling.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        Self::open_with_config(path, PoolConfig::default())
    }

    /// Open the store with custom pool configuration.
    pub fn open_with_config<P: AsRef<Path>>(
        path: P,
        config: PoolConfig,
    ) -> Result<Self, StoreError> {
        let manager =
            SqliteConnectionManager::file(path.as_ref()).with_init(Self::configure_connection);

        let pool = Pool::builder()
            .max_size(config.max_size)
            .connection_timeout(std::time::Duration::from_secs(
                config.connection_timeout_secs,
            ))
            .build(manager)
            .map_err(|e| StoreError::Pool(format!("Failed to create connection pool: {e}")))?;

        let store = Self { pool };
        store.initialize()?;
        Ok(store)
    }

    /// Open an in-memory store for testing or dry runs.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let manager = SqliteConnectionManager::memory().with_init(|conn| {
            conn.execute_batch("PRAGMA foreign_keys = ON;")?;
            Ok(())
        });

        // A single connection: in-memory databases are per-connection
        let pool = Pool::builder()
            .max_size(1)
            .build(manager)
            .map_err(|e| StoreError::Pool(format!("Failed to create in-memory pool: {e}")))?;

        let store = Self { pool };
        store.initialize()?;
        Ok(store)
    }

    /// Configure a new connection with production-ready settings.
    fn configure_connection(conn: &mut Connection) -> std::result::Result<(), rusqlite::Error> {
        conn.execute_batch(
            r#"
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA busy_timeout = 5000;
            "#,
        )?;
        Ok(())
    }

    /// Get a connection from the pool.
    fn conn(&self) -> Result<PooledConnection<SqliteConnectionManager>, StoreError> {
        self.pool
            .get()
            .map_err(|e| StoreError::Pool(format!("Failed to acquire database connection: {e}")))
    }

    /// Create the schema if it does not exist yet.
    fn initialize(&self) -> Result<(), StoreError> {
        self.conn()?
            .execute_batch(SCHEMA)
            .map_err(|e| StoreError::Query(format!("Failed to initialize schema: {e}")))
    }

    /// Idle connections currently sitting in the pool (test observability).
    pub fn idle_connections(&self) -> u32 {
        self.pool.state().idle_connections
    }

    fn top_values(
        conn: &Connection,
        column: &str,
    ) -> Result<Vec<(String, u64)>, StoreError> {
        // `column` is a compile-time constant here, never caller input
        let sql = format!(
            "SELECT {column}, COUNT(*) AS n FROM {PROFILES_TABLE} \
             WHERE {column} IS NOT NULL GROUP BY {column} ORDER BY n DESC LIMIT {SUMMARY_TOP_N}"
        );
        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| StoreError::from_sqlite(&e))?;
        let rows = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as u64)))
            .map_err(|e| StoreError::from_sqlite(&e))?;
        rows.collect::<Result<Vec<_>, _>>()
            .map_err(|e| StoreError::from_sqlite(&e))
    }
}

impl ProfileStore for SqliteStore {
    fn insert_profile(&self, run_id: &str, record: &ProfileRecord) -> Result<(), StoreError> {
        for key in record.keys() {
            if !is_column_ident(key) {
                return Err(StoreError::Constraint(format!(
                    "illegal column name {key:?}"
                )));
            }
        }

        let mut conn = self.conn()?;
        let tx = conn
            .transaction()
            .map_err(|e| StoreError::Transaction(e.to_string()))?;

        let mut columns = vec!["run_id".to_string(), "created_at".to_string()];
        let mut values = vec![
            rusqlite::types::Value::Text(run_id.to_string()),
            rusqlite::types::Value::Text(chrono::Utc::now().to_rfc3339()),
        ];
        for (key, value) in record.iter() {
            columns.push(key.to_string());
            values.push(to_sql_value(value));
        }

        let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("?{i}")).collect();
        let sql = format!(
            "INSERT INTO {PROFILES_TABLE} ({}) VALUES ({})",
            columns.join(", "),
            placeholders.join(", ")
        );

        tx.execute(&sql, rusqlite::params_from_iter(values))
            .map_err(|e| StoreError::from_sqlite(&e))?;
        // Any error above drops `tx`, which rolls the insert back
        tx.commit()
            .map_err(|e| StoreError::Transaction(e.to_string()))?;

        debug!("Inserted profile row for run {run_id}");
        Ok(())
    }

    fn corpus_summary(&self) -> Result<CorpusSummary, StoreError> {
        let conn = self.conn()?;

        let total_profiles: i64 = conn
            .query_row(&format!("SELECT COUNT(*) FROM {PROFILES_TABLE}"), [], |row| {
                row.get(0)
            })
            .map_err(|e| StoreError::from_sqlite(&e))?;

        Ok(CorpusSummary {
            total_profiles: total_profiles as u64,
            top_locations: Self::top_values(&conn, "location")?,
            top_occupations: Self::top_values(&conn, "occupation")?,
            top_languages: Self::top_values(&conn, "language")?,
        })
    }

    fn profile_count(&self) -> Result<u64, StoreError> {
        let conn = self.conn()?;
        conn.query_row(&format!("SELECT COUNT(*) FROM {PROFILES_TABLE}"), [], |row| {
            row.get::<_, i64>(0)
        })
        .map(|n| n as u64)
        .map_err(|e| StoreError::from_sqlite(&e))
    }
}

/// Convert a JSON field value into a bound SQLite value.
///
/// Sequences (languages_known) and nested objects are stored as JSON text.
fn to_sql_value(value: &Value) -> rusqlite::types::Value {
    use rusqlite::types::Value as Sql;
    match value {
        Value::Null => Sql::Null,
        Value::Bool(b) => Sql::Integer(i64::from(*b)),
        Value::Number(n) => match n.as_i64() {
            Some(i) => Sql::Integer(i),
            None => Sql::Real(n.as_f64().unwrap_or(0.0)),
        },
        Value::String(s) => Sql::Text(s.clone()),
        other => Sql::Text(other.to_string()),
    }
}

// =============================================================================
// Tests
// =============================================================================
