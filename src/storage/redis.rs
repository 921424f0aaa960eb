//! Redis-backed list store.
//!
//! # Redis Commands Used
//!
//! | Operation | Redis Command |
//! |-----------|---------------|
//! | Read list | `LRANGE key 0 -1` |
//! | Append | `RPUSH` |
//! | Read fields | `HMGET` |
//! | Write field | `HSET` |
//! | Delete keys | `DEL` |
//! | List keys | `SCAN cursor MATCH prefix*suffix COUNT 100 TYPE list` |
//! | Append entry | `MULTI` / `RPUSH` + `HSET` / `EXEC` |
//! | Replace entries | `MULTI` / `DEL` + `RPUSH` + `HSET` / `EXEC` |
//! | Remove entry | `MULTI` / `LREM` + `HDEL` / `EXEC` |
//!
//! # Thread Safety
//!
//! One connection is cached behind a `Mutex` and reused across calls. A
//! connection that returned an error is dropped and replaced on the next call.

use super::resilience::{StoreResilienceConfig, retry_connection};
use super::traits::TacticStore;
use crate::{Error, Result};
use redis::{Client, Connection, RedisResult};
use std::sync::Mutex;
use std::time::Duration;

/// Default read/write timeout on Redis sockets.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// `COUNT` hint for each `SCAN` step.
const SCAN_COUNT: u32 = 100;

/// Escapes Redis glob metacharacters so `text` matches literally.
fn glob_escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '*' | '?' | '[' | ']' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Redis list store.
pub struct RedisStore {
    connection_url: String,
    client: Client,
    connection: Mutex<Option<Connection>>,
    timeout: Duration,
    resilience: StoreResilienceConfig,
}

impl RedisStore {
    /// Creates a store for the server at `connection_url`.
    ///
    /// No connection is made until the first operation.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StoreUnavailable`] if the URL is invalid.
    pub fn new(connection_url: impl Into<String>) -> Result<Self> {
        let connection_url = connection_url.into();
        let client =
            Client::open(connection_url.as_str()).map_err(|e| Error::store("redis_open", e))?;

        Ok(Self {
            connection_url,
            client,
            connection: Mutex::new(None),
            timeout: DEFAULT_TIMEOUT,
            resilience: StoreResilienceConfig::from_env(),
        })
    }

    /// Sets the socket read/write timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Returns the connection URL.
    #[must_use]
    pub fn connection_url(&self) -> &str {
        &self.connection_url
    }

    /// Checks connectivity with `PING`.
    ///
    /// Returns `false` instead of an error when the server is unreachable.
    #[must_use]
    pub fn health_check(&self) -> bool {
        self.with_connection("ping", |conn| redis::cmd("PING").query::<String>(conn))
            .is_ok_and(|reply| reply == "PONG")
    }

    fn get_connection(&self) -> Result<Connection> {
        let cached = self
            .connection
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .take();
        if let Some(conn) = cached {
            return Ok(conn);
        }

        let timeout = self.timeout;
        retry_connection(&self.resilience, "redis", "get_connection", || {
            let conn = self
                .client
                .get_connection()
                .map_err(|e| Error::store("redis_get_connection", e))?;
            conn.set_read_timeout(Some(timeout))
                .map_err(|e| Error::store("redis_set_read_timeout", e))?;
            conn.set_write_timeout(Some(timeout))
                .map_err(|e| Error::store("redis_set_write_timeout", e))?;
            Ok(conn)
        })
    }

    fn return_connection(&self, conn: Connection) {
        if let Ok(mut guard) = self.connection.lock() {
            *guard = Some(conn);
        }
    }

    /// Runs `f` on a pooled connection; the connection is kept only on success.
    fn with_connection<T>(
        &self,
        operation: &'static str,
        f: impl FnOnce(&mut Connection) -> RedisResult<T>,
    ) -> Result<T> {
        let mut conn = self.get_connection()?;
        match f(&mut conn) {
            Ok(value) => {
                self.return_connection(conn);
                Ok(value)
            },
            Err(e) => {
                tracing::debug!(operation, error = %e, "Redis command failed, dropping connection");
                Err(Error::store(operation, e))
            },
        }
    }
}

impl TacticStore for RedisStore {
    fn backend_name(&self) -> &'static str {
        "redis"
    }

    fn read_list(&self, key: &str) -> Result<Vec<String>> {
        self.with_connection("read_list", |conn| {
            redis::cmd("LRANGE").arg(key).arg(0).arg(-1).query(conn)
        })
    }

    fn append(&self, key: &str, items: &[String]) -> Result<()> {
        if items.is_empty() {
            return Ok(());
        }
        self.with_connection("append", |conn| {
            redis::cmd("RPUSH").arg(key).arg(items).query::<i64>(conn)
        })
        .map(|_| ())
    }

    fn get_fields(&self, key: &str, fields: &[String]) -> Result<Vec<Option<String>>> {
        if fields.is_empty() {
            return Ok(Vec::new());
        }
        self.with_connection("get_fields", |conn| {
            redis::cmd("HMGET").arg(key).arg(fields).query(conn)
        })
    }

    fn put_field(&self, key: &str, field: &str, value: &str) -> Result<()> {
        self.with_connection("put_field", |conn| {
            redis::cmd("HSET").arg(key).arg(field).arg(value).query::<i64>(conn)
        })
        .map(|_| ())
    }

    fn delete(&self, keys: &[&str]) -> Result<()> {
        if keys.is_empty() {
            return Ok(());
        }
        self.with_connection("delete", |conn| {
            redis::cmd("DEL").arg(keys).query::<i64>(conn)
        })
        .map(|_| ())
    }

    fn list_keys(&self, prefix: &str, suffix: &str) -> Result<Vec<String>> {
        let pattern = format!("{}*{}", glob_escape(prefix), glob_escape(suffix));
        let mut keys = self.with_connection("list_keys", |conn| {
            let mut keys = Vec::new();
            let mut cursor: u64 = 0;
            loop {
                let (next, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                    .arg(cursor)
                    .arg("MATCH")
                    .arg(pattern.as_str())
                    .arg("COUNT")
                    .arg(SCAN_COUNT)
                    .arg("TYPE")
                    .arg("list")
                    .query(conn)?;
                keys.extend(batch);
                if next == 0 {
                    break;
                }
                cursor = next;
            }
            Ok(keys)
        })?;
        // SCAN may return a key more than once.
        keys.retain(|key| key.len() >= prefix.len() + suffix.len());
        keys.sort_unstable();
        keys.dedup();
        Ok(keys)
    }

    fn append_entry(&self, list_key: &str, item: &str, map_key: &str, value: &str) -> Result<()> {
        self.with_connection("append_entry", |conn| {
            redis::pipe()
                .atomic()
                .cmd("RPUSH")
                .arg(list_key)
                .arg(item)
                .ignore()
                .cmd("HSET")
                .arg(map_key)
                .arg(item)
                .arg(value)
                .ignore()
                .query::<()>(conn)
        })
    }

    fn replace_entries(
        &self,
        list_key: &str,
        map_key: &str,
        entries: &[(String, String)],
    ) -> Result<()> {
        self.with_connection("replace_entries", |conn| {
            let mut pipe = redis::pipe();
            pipe.atomic().cmd("DEL").arg(list_key).arg(map_key).ignore();
            if !entries.is_empty() {
                let items: Vec<&str> = entries.iter().map(|(item, _)| item.as_str()).collect();
                pipe.cmd("RPUSH").arg(list_key).arg(items).ignore();

                let hset = pipe.cmd("HSET").arg(map_key);
                for (item, value) in entries {
                    hset.arg(item).arg(value);
                }
                hset.ignore();
            }
            pipe.query::<()>(conn)
        })
    }

    fn remove_entry(&self, list_key: &str, map_key: &str, item: &str) -> Result<bool> {
        let (removed, _): (i64, i64) = self.with_connection("remove_entry", |conn| {
            redis::pipe()
                .atomic()
                .cmd("LREM")
                .arg(list_key)
                .arg(0)
                .arg(item)
                .cmd("HDEL")
                .arg(map_key)
                .arg(item)
                .query(conn)
        })?;
        Ok(removed > 0)
    }
}
