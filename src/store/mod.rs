//! Document store abstraction
//!
//! The suggester never indexes or scores content itself. Everything it knows
//! about libraries comes through [`DocumentStore`], which a storage/search
//! subsystem implements.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// In-memory store with canned responses
pub mod memory;

/// SQLite/FTS5 backed store
#[cfg(feature = "storage")]
pub mod sqlite;

pub use memory::MemoryStore;
#[cfg(feature = "storage")]
pub use sqlite::SqliteStore;

/// Errors raised by a document store
#[derive(Debug, Error)]
pub enum StoreError {
    /// No library with this name is indexed
    #[error("Library not found: {0}")]
    LibraryNotFound(String),

    /// The library exists but none of its versions holds searchable content
    #[error("No searchable version for library: {library}")]
    NoSearchableVersion {
        /// Library name
        library: String,
    },

    /// The requested version is not indexed
    #[error("Version {version} not found for library: {library}")]
    VersionNotFound {
        /// Library name
        library: String,
        /// Requested version
        version: String,
    },

    /// The search did not complete in time
    #[error("Search in {library} timed out after {millis}ms")]
    Timeout {
        /// Library name
        library: String,
        /// Elapsed budget in milliseconds
        millis: u64,
    },

    /// Backend failure (database, I/O, task join)
    #[error("Backend error: {0}")]
    Backend(String),
}

/// Result type for store operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// One indexed version of a library
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionSummary {
    /// Version label, empty for unversioned content
    pub version: String,

    /// Number of documents indexed under this version
    pub document_count: usize,

    /// When the version was indexed (RFC 3339)
    pub indexed_at: Option<String>,
}

/// A library as reported by [`DocumentStore::list_libraries`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LibrarySummary {
    /// Library identifier
    pub library: String,

    /// Indexed versions
    pub versions: Vec<VersionSummary>,
}

impl LibrarySummary {
    /// Summary with no version details, for stores that only know names
    pub fn named(library: impl Into<String>) -> Self {
        Self {
            library: library.into(),
            versions: Vec::new(),
        }
    }
}

/// One search hit for a library/query pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchRecord {
    /// Matched text
    pub content: String,

    /// Relevance score; absent counts as zero
    pub score: Option<f64>,

    /// Source location of the match
    pub url: String,
}

impl MatchRecord {
    /// Create a scored match record
    pub fn new(content: impl Into<String>, score: Option<f64>, url: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            score,
            url: url.into(),
        }
    }
}

/// Search capability the suggester depends on
///
/// Implementations own indexing, scoring and persistence. Each call operates
/// on one library namespace, so concurrent calls for different libraries
/// must not interfere.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// List every currently indexed library
    async fn list_libraries(&self) -> StoreResult<Vec<LibrarySummary>>;

    /// Search one library, optionally restricted to a version
    ///
    /// Returns at most `limit` records, best first. Fails when the library
    /// has no searchable version.
    async fn search_store(
        &self,
        library: &str,
        version: Option<&str>,
        query: &str,
        limit: usize,
    ) -> StoreResult<Vec<MatchRecord>>;
}
