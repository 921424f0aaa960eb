//! `SQLite`-backed [`TacticStore`].

use super::{acquire_lock, configure_connection, record_operation_metrics};
use crate::storage::traits::TacticStore;
use crate::{Error, Result};
use rusqlite::{Connection, OptionalExtension, Transaction, params};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Instant;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS tactic_lists (
    key TEXT NOT NULL,
    position INTEGER NOT NULL,
    item TEXT NOT NULL,
    PRIMARY KEY (key, position)
);
CREATE TABLE IF NOT EXISTS tactic_fields (
    key TEXT NOT NULL,
    field TEXT NOT NULL,
    value TEXT NOT NULL,
    PRIMARY KEY (key, field)
);
";

/// `SQLite` list store.
///
/// Lists live in `tactic_lists` ordered by `position`; field maps live in
/// `tactic_fields`. Compound writes run inside one transaction.
pub struct SqliteStore {
    conn: Mutex<Connection>,
    db_path: Option<PathBuf>,
}

impl SqliteStore {
    /// Opens (creating if needed) the database at `db_path`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StoreUnavailable`] if the file cannot be opened or the
    /// schema cannot be created.
    pub fn new(db_path: impl Into<PathBuf>) -> Result<Self> {
        let db_path = db_path.into();
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| Error::store("open_sqlite", e))?;
        }
        let conn = Connection::open(&db_path).map_err(|e| Error::store("open_sqlite", e))?;
        tracing::debug!(path = %db_path.display(), "Opened SQLite tactic store");
        Self::init(conn, Some(db_path))
    }

    /// Creates a store backed by a private in-memory database.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StoreUnavailable`] if the schema cannot be created.
    pub fn in_memory() -> Result<Self> {
        let conn =
            Connection::open_in_memory().map_err(|e| Error::store("open_sqlite_in_memory", e))?;
        Self::init(conn, None)
    }

    /// Returns the database path, if file-backed.
    #[must_use]
    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    fn init(conn: Connection, db_path: Option<PathBuf>) -> Result<Self> {
        configure_connection(&conn)?;
        conn.execute_batch(SCHEMA)
            .map_err(|e| Error::store("create_schema", e))?;
        Ok(Self {
            conn: Mutex::new(conn),
            db_path,
        })
    }

    /// Runs `f` on the connection and records metrics.
    fn with_conn<T>(
        &self,
        operation: &'static str,
        f: impl FnOnce(&mut Connection) -> rusqlite::Result<T>,
    ) -> Result<T> {
        let start = Instant::now();
        let mut conn = acquire_lock(&self.conn);
        let result = f(&mut conn);
        drop(conn);

        let status = if result.is_ok() { "success" } else { "error" };
        record_operation_metrics(operation, start, status);
        result.map_err(|e| Error::store(operation, e))
    }

    /// Runs `f` inside a transaction that commits only if `f` succeeds.
    fn with_tx<T>(
        &self,
        operation: &'static str,
        f: impl FnOnce(&Transaction<'_>) -> rusqlite::Result<T>,
    ) -> Result<T> {
        self.with_conn(operation, |conn| {
            let tx = conn.transaction()?;
            let value = f(&tx)?;
            tx.commit()?;
            Ok(value)
        })
    }
}

fn next_position(conn: &Connection, key: &str) -> rusqlite::Result<i64> {
    conn.query_row(
        "SELECT COALESCE(MAX(position) + 1, 0) FROM tactic_lists WHERE key = ?1",
        params![key],
        |row| row.get(0),
    )
}

fn push_items<'a>(
    conn: &Connection,
    key: &str,
    items: impl IntoIterator<Item = &'a str>,
) -> rusqlite::Result<()> {
    let mut position = next_position(conn, key)?;
    let mut stmt =
        conn.prepare_cached("INSERT INTO tactic_lists (key, position, item) VALUES (?1, ?2, ?3)")?;
    for item in items {
        stmt.execute(params![key, position, item])?;
        position += 1;
    }
    Ok(())
}

fn upsert_field(conn: &Connection, key: &str, field: &str, value: &str) -> rusqlite::Result<()> {
    conn.prepare_cached(
        "INSERT INTO tactic_fields (key, field, value) VALUES (?1, ?2, ?3)
         ON CONFLICT (key, field) DO UPDATE SET value = excluded.value",
    )?
    .execute(params![key, field, value])?;
    Ok(())
}

fn delete_list(conn: &Connection, key: &str) -> rusqlite::Result<()> {
    conn.execute("DELETE FROM tactic_lists WHERE key = ?1", params![key])?;
    Ok(())
}

fn delete_fields(conn: &Connection, key: &str) -> rusqlite::Result<()> {
    conn.execute("DELETE FROM tactic_fields WHERE key = ?1", params![key])?;
    Ok(())
}

impl TacticStore for SqliteStore {
    fn backend_name(&self) -> &'static str {
        "sqlite"
    }

    fn read_list(&self, key: &str) -> Result<Vec<String>> {
        self.with_conn("read_list", |conn| {
            let mut stmt = conn.prepare_cached(
                "SELECT item FROM tactic_lists WHERE key = ?1 ORDER BY position",
            )?;
            let rows = stmt.query_map(params![key], |row| row.get(0))?;
            rows.collect()
        })
    }

    fn append(&self, key: &str, items: &[String]) -> Result<()> {
        if items.is_empty() {
            return Ok(());
        }
        self.with_tx("append", |tx| {
            push_items(tx, key, items.iter().map(String::as_str))
        })
    }

    fn get_fields(&self, key: &str, fields: &[String]) -> Result<Vec<Option<String>>> {
        self.with_conn("get_fields", |conn| {
            let mut stmt = conn.prepare_cached(
                "SELECT value FROM tactic_fields WHERE key = ?1 AND field = ?2",
            )?;
            fields
                .iter()
                .map(|field| {
                    stmt.query_row(params![key, field], |row| row.get(0))
                        .optional()
                })
                .collect()
        })
    }

    fn put_field(&self, key: &str, field: &str, value: &str) -> Result<()> {
        self.with_conn("put_field", |conn| upsert_field(conn, key, field, value))
    }

    fn delete(&self, keys: &[&str]) -> Result<()> {
        // A key names either a list or a map; drop whichever exists.
        self.with_tx("delete", |tx| {
            for key in keys {
                delete_list(tx, key)?;
                delete_fields(tx, key)?;
            }
            Ok(())
        })
    }

    fn list_keys(&self, prefix: &str, suffix: &str) -> Result<Vec<String>> {
        let keys: Vec<String> = self.with_conn("list_keys", |conn| {
            let mut stmt = conn.prepare_cached(
                "SELECT DISTINCT key FROM tactic_lists WHERE substr(key, 1, length(?1)) = ?1 \
                 ORDER BY key",
            )?;
            let rows = stmt.query_map(params![prefix], |row| row.get(0))?;
            rows.collect()
        })?;
        Ok(keys
            .into_iter()
            .filter(|key| key.len() >= prefix.len() + suffix.len() && key.ends_with(suffix))
            .collect())
    }

    fn append_entry(&self, list_key: &str, item: &str, map_key: &str, value: &str) -> Result<()> {
        self.with_tx("append_entry", |tx| {
            push_items(tx, list_key, [item])?;
            upsert_field(tx, map_key, item, value)
        })
    }

    fn replace_entries(
        &self,
        list_key: &str,
        map_key: &str,
        entries: &[(String, String)],
    ) -> Result<()> {
        self.with_tx("replace_entries", |tx| {
            delete_list(tx, list_key)?;
            delete_fields(tx, map_key)?;
            push_items(tx, list_key, entries.iter().map(|(item, _)| item.as_str()))?;
            for (item, value) in entries {
                upsert_field(tx, map_key, item, value)?;
            }
            Ok(())
        })
    }

    fn remove_entry(&self, list_key: &str, map_key: &str, item: &str) -> Result<bool> {
        self.with_tx("remove_entry", |tx| {
            let removed = tx.execute(
                "DELETE FROM tactic_lists WHERE key = ?1 AND item = ?2",
                params![list_key, item],
            )?;
            tx.execute(
                "DELETE FROM tactic_fields WHERE key = ?1 AND field = ?2",
                params![map_key, item],
            )?;
            Ok(removed > 0)
        })
    }
}
