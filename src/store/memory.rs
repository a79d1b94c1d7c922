// In-memory document store
//
// Serves canned per-library responses. It performs no matching of its own:
// whatever records a library was seeded with are returned for any query,
// capped at the requested limit.

use super::{DocumentStore, LibrarySummary, MatchRecord, StoreError, StoreResult};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

#[derive(Debug, Clone)]
enum CannedResponse {
    Records(Vec<MatchRecord>),
    Failure(String),
}

#[derive(Debug, Clone)]
struct CannedLibrary {
    summary: LibrarySummary,
    response: CannedResponse,
    delay: Option<Duration>,
}

/// Document store holding canned responses in listing order
#[derive(Debug, Default)]
pub struct MemoryStore {
    libraries: Vec<CannedLibrary>,
    searches: AtomicUsize,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a library answering every search with `records`
    pub fn with_library(mut self, name: impl Into<String>, records: Vec<MatchRecord>) -> Self {
        self.push(name.into(), CannedResponse::Records(records));
        self
    }

    /// Add a library whose searches always fail with `message`
    pub fn with_failing_library(mut self, name: impl Into<String>, message: impl Into<String>) -> Self {
        self.push(name.into(), CannedResponse::Failure(message.into()));
        self
    }

    /// Delay every search of an already added library
    pub fn with_delay(mut self, name: &str, delay: Duration) -> Self {
        if let Some(entry) = self.libraries.iter_mut().find(|l| l.summary.library == name) {
            entry.delay = Some(delay);
        }
        self
    }

    /// Number of `search_store` calls served so far
    pub fn search_count(&self) -> usize {
        self.searches.load(Ordering::SeqCst)
    }

    fn push(&mut self, name: String, response: CannedResponse) {
        self.libraries.retain(|l| l.summary.library != name);
        self.libraries.push(CannedLibrary {
            summary: LibrarySummary::named(name),
            response,
            delay: None,
        });
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn list_libraries(&self) -> StoreResult<Vec<LibrarySummary>> {
        Ok(self.libraries.iter().map(|l| l.summary.clone()).collect())
    }

    async fn search_store(
        &self,
        library: &str,
        _version: Option<&str>,
        _query: &str,
        limit: usize,
    ) -> StoreResult<Vec<MatchRecord>> {
        self.searches.fetch_add(1, Ordering::SeqCst);

        let entry = self
            .libraries
            .iter()
            .find(|l| l.summary.library == library)
            .ok_or_else(|| StoreError::LibraryNotFound(library.to_string()))?;

        if let Some(delay) = entry.delay {
            tokio::time::sleep(delay).await;
        }

        match &entry.response {
            CannedResponse::Records(records) => Ok(records.iter().take(limit).cloned().collect()),
            CannedResponse::Failure(message) => Err(StoreError::Backend(message.clone())),
        }
    }
}
