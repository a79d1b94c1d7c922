// SQLite document store
//
// Documents live in a plain table mirrored into an FTS5 index. Relevance
// comes from SQLite's bm25() ranking; this module only negates it so that
// higher means more relevant.

use super::{DocumentStore, LibrarySummary, MatchRecord, StoreError, StoreResult, VersionSummary};
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::debug;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS libraries (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    version TEXT NOT NULL DEFAULT '',
    indexed_at TEXT NOT NULL,
    UNIQUE(name, version)
);

CREATE TABLE IF NOT EXISTS documents (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    library_id INTEGER NOT NULL REFERENCES libraries(id) ON DELETE CASCADE,
    url TEXT NOT NULL,
    content TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_documents_library ON documents(library_id);

CREATE VIRTUAL TABLE IF NOT EXISTS documents_fts USING fts5(
    content,
    content='documents',
    content_rowid='id'
);

CREATE TRIGGER IF NOT EXISTS documents_ai AFTER INSERT ON documents BEGIN
    INSERT INTO documents_fts(rowid, content) VALUES (new.id, new.content);
END;

CREATE TRIGGER IF NOT EXISTS documents_ad AFTER DELETE ON documents BEGIN
    INSERT INTO documents_fts(documents_fts, rowid, content) VALUES ('delete', old.id, old.content);
END;
"#;

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        StoreError::Backend(err.to_string())
    }
}

/// Document store backed by a SQLite database with an FTS5 index
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open (or create) a store at `path`
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    StoreError::Backend(format!("Failed to create {}: {}", parent.display(), e))
                })?;
            }
        }

        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        Self::from_connection(conn)
    }

    /// Open a private in-memory store
    pub fn open_in_memory() -> StoreResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> StoreResult<Self> {
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Register a library version without documents
    ///
    /// Returns the row id of the (possibly pre-existing) version.
    pub fn register_library(&self, library: &str, version: &str) -> StoreResult<i64> {
        let conn = self.lock()?;
        upsert_library(&conn, library, version)
    }

    /// Add one document to a library version, registering it if needed
    pub fn insert_document(
        &self,
        library: &str,
        version: &str,
        url: &str,
        content: &str,
    ) -> StoreResult<()> {
        let conn = self.lock()?;
        let library_id = upsert_library(&conn, library, version)?;
        conn.execute(
            "INSERT INTO documents (library_id, url, content) VALUES (?1, ?2, ?3)",
            params![library_id, url, content],
        )?;
        Ok(())
    }

    /// Check whether a library name is known to the store
    pub fn contains_library(&self, library: &str) -> StoreResult<bool> {
        let conn = self.lock()?;
        let found: Option<i64> = conn
            .query_row(
                "SELECT id FROM libraries WHERE name = ?1 LIMIT 1",
                params![library],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    fn lock(&self) -> StoreResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Backend("Connection mutex poisoned".to_string()))
    }

    async fn blocking<T, F>(&self, work: F) -> StoreResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> StoreResult<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = conn
                .lock()
                .map_err(|_| StoreError::Backend("Connection mutex poisoned".to_string()))?;
            work(&*guard)
        })
        .await
        .map_err(|e| StoreError::Backend(format!("Task join error: {}", e)))?
    }
}

fn upsert_library(conn: &Connection, library: &str, version: &str) -> StoreResult<i64> {
    conn.execute(
        "INSERT OR IGNORE INTO libraries (name, version, indexed_at) VALUES (?1, ?2, ?3)",
        params![library, version, chrono::Utc::now().to_rfc3339()],
    )?;
    let id = conn.query_row(
        "SELECT id FROM libraries WHERE name = ?1 AND version = ?2",
        params![library, version],
        |row| row.get(0),
    )?;
    Ok(id)
}

fn list_libraries_sync(conn: &Connection) -> StoreResult<Vec<LibrarySummary>> {
    let mut stmt = conn.prepare(
        "SELECT l.name, l.version, l.indexed_at, COUNT(d.id)
         FROM libraries l
         LEFT JOIN documents d ON d.library_id = l.id
         GROUP BY l.id
         ORDER BY l.name, l.version",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok((
            row.get::<_, String>(0)?,
            VersionSummary {
                version: row.get(1)?,
                indexed_at: row.get(2)?,
                document_count: row.get::<_, i64>(3)? as usize,
            },
        ))
    })?;

    let mut libraries: Vec<LibrarySummary> = Vec::new();
    for row in rows {
        let (name, version) = row?;
        match libraries.last_mut() {
            Some(last) if last.library == name => last.versions.push(version),
            _ => libraries.push(LibrarySummary {
                library: name,
                versions: vec![version],
            }),
        }
    }
    Ok(libraries)
}

fn search_sync(
    conn: &Connection,
    library: &str,
    version: Option<&str>,
    query: &str,
    limit: usize,
) -> StoreResult<Vec<MatchRecord>> {
    let mut stmt = conn.prepare(
        "SELECT l.id, l.version, (SELECT COUNT(*) FROM documents d WHERE d.library_id = l.id)
         FROM libraries l WHERE l.name = ?1",
    )?;
    let versions = stmt
        .query_map(params![library], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, i64>(2)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    if versions.is_empty() {
        return Err(StoreError::LibraryNotFound(library.to_string()));
    }

    let selected: Vec<&(i64, String, i64)> = match version {
        Some(wanted) => {
            let matching: Vec<_> = versions.iter().filter(|(_, v, _)| v == wanted).collect();
            if matching.is_empty() {
                return Err(StoreError::VersionNotFound {
                    library: library.to_string(),
                    version: wanted.to_string(),
                });
            }
            matching
        }
        None => versions.iter().collect(),
    };

    let searchable: Vec<String> = selected
        .iter()
        .filter(|(_, _, count)| *count > 0)
        .map(|(id, _, _)| id.to_string())
        .collect();
    if searchable.is_empty() {
        return Err(StoreError::NoSearchableVersion {
            library: library.to_string(),
        });
    }

    let Some(expression) = fts_expression(query) else {
        debug!("Query {:?} has no searchable terms", query);
        return Ok(Vec::new());
    };

    // Library ids come from the database, never from the caller.
    let sql = format!(
        "SELECT d.content, d.url, bm25(documents_fts) AS rank
         FROM documents_fts
         JOIN documents d ON d.id = documents_fts.rowid
         WHERE documents_fts MATCH ?1 AND d.library_id IN ({})
         ORDER BY rank
         LIMIT ?2",
        searchable.join(",")
    );
    let mut stmt = conn.prepare(&sql)?;
    let records = stmt
        .query_map(params![expression, limit as i64], |row| {
            let rank: Option<f64> = row.get(2)?;
            Ok(MatchRecord {
                content: row.get(0)?,
                url: row.get(1)?,
                score: rank.map(|r| -r),
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(records)
}

/// Turn free text into an FTS5 expression of quoted terms joined by OR
///
/// Returns `None` when the text holds no alphanumeric terms.
pub fn fts_expression(query: &str) -> Option<String> {
    let terms: Vec<String> = query
        .split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|t| !t.is_empty())
        .map(|t| format!("\"{}\"", t.to_lowercase()))
        .collect();

    if terms.is_empty() {
        None
    } else {
        Some(terms.join(" OR "))
    }
}

#[async_trait]
impl DocumentStore for SqliteStore {
    async fn list_libraries(&self) -> StoreResult<Vec<LibrarySummary>> {
        self.blocking(list_libraries_sync).await
    }

    async fn search_store(
        &self,
        library: &str,
        version: Option<&str>,
        query: &str,
        limit: usize,
    ) -> StoreResult<Vec<MatchRecord>> {
        let library = library.to_string();
        let version = version.map(str::to_string);
        let query = query.to_string();
        self.blocking(move |conn| search_sync(conn, &library, version.as_deref(), &query, limit))
            .await
    }
}
