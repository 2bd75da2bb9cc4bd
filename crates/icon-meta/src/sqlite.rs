//! SQLite-backed metadata store.
//!
//! `rusqlite` is synchronous, so every call runs on the blocking thread pool
//! against a single connection guarded by a mutex. Each trait method maps to
//! one SQLite transaction.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension};
use tracing::{debug, info};

use icon_types::{IconFileKey, IconName};

use crate::error::{MetaError, MetaResult};
use crate::record::{FileRemoval, IconRecord};
use crate::traits::MetadataStore;

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS icon (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS icon_file (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    icon_id INTEGER NOT NULL REFERENCES icon(id) ON DELETE CASCADE,
    file_format TEXT NOT NULL,
    icon_size TEXT NOT NULL,
    UNIQUE(icon_id, file_format, icon_size)
);
CREATE INDEX IF NOT EXISTS idx_icon_file_icon ON icon_file(icon_id);
"#;

/// [`MetadataStore`] persisted in a SQLite database.
pub struct SqliteMetadataStore {
    conn: Arc<Mutex<Connection>>,
    path: Option<PathBuf>,
}

impl SqliteMetadataStore {
    /// Open (or create) the database file at `path` and apply the schema.
    pub async fn open(path: impl AsRef<Path>) -> MetaResult<Self> {
        let path = path.as_ref().to_path_buf();
        let opened = path.clone();
        let conn = tokio::task::spawn_blocking(move || -> MetaResult<Connection> {
            if let Some(parent) = opened.parent() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| MetaError::Unavailable(format!("create {}: {e}", parent.display())))?;
            }
            let conn = Connection::open(&opened)?;
            // journal_mode reports the resulting mode as a row.
            let mode: String =
                conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
            debug!(%mode, "sqlite journal mode");
            Ok(conn)
        })
        .await
        .map_err(|e| MetaError::Unavailable(format!("blocking task failed: {e}")))??;

        let store = Self::from_connection(conn, Some(path.clone())).await?;
        info!(path = %path.display(), "opened sqlite metadata store");
        Ok(store)
    }

    /// A private, throwaway database.
    pub async fn open_in_memory() -> MetaResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn, None).await
    }

    async fn from_connection(conn: Connection, path: Option<PathBuf>) -> MetaResult<Self> {
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
            path,
        };
        store.migrate().await?;
        Ok(store)
    }

    /// Location of the database file, if it is not in memory.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    async fn migrate(&self) -> MetaResult<()> {
        self.with_conn(|conn| {
            conn.pragma_update(None, "foreign_keys", "ON")?;
            conn.execute_batch(SCHEMA_SQL)?;
            Ok(())
        })
        .await
    }

    /// Run `f` against the connection on the blocking pool.
    async fn with_conn<T, F>(&self, f: F) -> MetaResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> MetaResult<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut guard = conn
                .lock()
                .map_err(|e| MetaError::Unavailable(format!("lock poisoned: {e}")))?;
            f(&mut *guard)
        })
        .await
        .map_err(|e| MetaError::Unavailable(format!("blocking task failed: {e}")))?
    }
}

fn decode_name(raw: String) -> MetaResult<IconName> {
    IconName::new(raw).map_err(|e| MetaError::Corrupt(e.to_string()))
}

fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::ConstraintViolation
    )
}

#[async_trait]
impl MetadataStore for SqliteMetadataStore {
    async fn get_icon(&self, name: &IconName) -> MetaResult<Option<IconRecord>> {
        let name = name.clone();
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare_cached(
                "SELECT f.file_format, f.icon_size
                 FROM icon i JOIN icon_file f ON f.icon_id = i.id
                 WHERE i.name = ?1
                 ORDER BY f.id",
            )?;
            let files = stmt
                .query_map(params![name.as_str()], |row| {
                    Ok(IconFileKey {
                        format: row.get(0)?,
                        size: row.get(1)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            if files.is_empty() {
                Ok(None)
            } else {
                Ok(Some(IconRecord { name, files }))
            }
        })
        .await
    }

    async fn list_icons(&self) -> MetaResult<Vec<IconRecord>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare_cached(
                "SELECT i.name, f.file_format, f.icon_size
                 FROM icon i JOIN icon_file f ON f.icon_id = i.id
                 ORDER BY i.id, f.id",
            )?;
            let rows = stmt
                .query_map([], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        IconFileKey {
                            format: row.get(1)?,
                            size: row.get(2)?,
                        },
                    ))
                })?
                .collect::<Result<Vec<_>, _>>()?;

            let mut records: Vec<IconRecord> = Vec::new();
            for (raw_name, key) in rows {
                match records.last_mut() {
                    Some(last) if last.name.as_str() == raw_name => last.files.push(key),
                    _ => records.push(IconRecord {
                        name: decode_name(raw_name)?,
                        files: vec![key],
                    }),
                }
            }
            Ok(records)
        })
        .await
    }

    async fn insert_file(&self, name: &IconName, key: &IconFileKey) -> MetaResult<()> {
        let name = name.clone();
        let key = key.clone();
        self.with_conn(move |conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT OR IGNORE INTO icon (name, created_at) VALUES (?1, ?2)",
                params![name.as_str(), chrono::Utc::now().to_rfc3339()],
            )?;
            let icon_id: i64 = tx.query_row(
                "SELECT id FROM icon WHERE name = ?1",
                params![name.as_str()],
                |row| row.get(0),
            )?;
            let inserted = tx.execute(
                "INSERT INTO icon_file (icon_id, file_format, icon_size) VALUES (?1, ?2, ?3)",
                params![icon_id, key.format, key.size],
            );
            match inserted {
                Ok(_) => {}
                Err(e) if is_constraint_violation(&e) => {
                    return Err(MetaError::AlreadyExists { name, key });
                }
                Err(e) => return Err(e.into()),
            }
            tx.commit()?;
            debug!(icon = %name, file = %key, "metadata row inserted");
            Ok(())
        })
        .await
    }

    async fn delete_file(&self, name: &IconName, key: &IconFileKey) -> MetaResult<FileRemoval> {
        let name = name.clone();
        let key = key.clone();
        self.with_conn(move |conn| {
            let tx = conn.transaction()?;
            let icon_id: Option<i64> = tx
                .query_row(
                    "SELECT id FROM icon WHERE name = ?1",
                    params![name.as_str()],
                    |row| row.get(0),
                )
                .optional()?;
            let Some(icon_id) = icon_id else {
                return Err(MetaError::IconNotFound(name));
            };

            let deleted = tx.execute(
                "DELETE FROM icon_file WHERE icon_id = ?1 AND file_format = ?2 AND icon_size = ?3",
                params![icon_id, key.format, key.size],
            )?;
            if deleted == 0 {
                return Err(MetaError::FileNotFound { name, key });
            }

            let remaining: i64 = tx.query_row(
                "SELECT COUNT(*) FROM icon_file WHERE icon_id = ?1",
                params![icon_id],
                |row| row.get(0),
            )?;
            let removal = if remaining == 0 {
                tx.execute("DELETE FROM icon WHERE id = ?1", params![icon_id])?;
                FileRemoval::IconRemoved
            } else {
                FileRemoval::FileRemoved
            };
            tx.commit()?;
            debug!(icon = %name, file = %key, ?removal, "metadata row deleted");
            Ok(removal)
        })
        .await
    }

    async fn reset(&self) -> MetaResult<()> {
        self.with_conn(|conn| {
            conn.execute_batch("DELETE FROM icon_file; DELETE FROM icon;")?;
            Ok(())
        })
        .await
    }
}

impl std::fmt::Debug for SqliteMetadataStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteMetadataStore")
            .field("path", &self.path)
            .finish()
    }
}
