// Library Suggester
//
// Ranks indexed libraries for a free-text query by fanning out one small
// search per library and keeping each library's best match score.

use crate::config::SuggestConfig;
use crate::error::{Result, SuggestError};
use crate::store::{DocumentStore, LibrarySummary, MatchRecord, StoreError};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Number of libraries returned when the caller does not say
pub const DEFAULT_MAX_RESULTS: usize = 5;

/// Largest accepted `max_results`
pub const MAX_RESULTS_LIMIT: usize = 20;

/// Records fetched per library; only the best one matters
pub const SEARCH_LIMIT: usize = 3;

/// Maximum length, in characters, of a returned snippet
pub const SNIPPET_MAX_CHARS: usize = 200;

/// Validated suggestion request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuggestOptions {
    query: String,
    max_results: usize,
}

impl SuggestOptions {
    /// Validate a request
    ///
    /// `query` must contain something other than whitespace and
    /// `max_results`, when given, must lie in `1..=20`. The query is kept as
    /// given, untrimmed.
    pub fn new(query: impl Into<String>, max_results: Option<usize>) -> Result<Self> {
        let query = query.into();
        if query.trim().is_empty() {
            return Err(SuggestError::invalid_argument(
                "query required",
                Some("Provide a non-empty search query".to_string()),
            ));
        }

        let max_results = max_results.unwrap_or(DEFAULT_MAX_RESULTS);
        if !(1..=MAX_RESULTS_LIMIT).contains(&max_results) {
            return Err(SuggestError::invalid_argument(
                "maxResults out of range",
                Some(format!("Use a value between 1 and {}", MAX_RESULTS_LIMIT)),
            ));
        }

        Ok(Self { query, max_results })
    }

    /// The search query
    pub fn query(&self) -> &str {
        &self.query
    }

    /// Maximum number of libraries to return
    pub fn max_results(&self) -> usize {
        self.max_results
    }
}

/// One ranked library
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LibrarySuggestion {
    /// Library identifier
    pub name: String,

    /// Best match score for the query, always positive
    pub score: f64,

    /// Leading characters of the best matching record
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matched_content: Option<String>,
}

/// Ranked libraries, best first
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SuggestionResult {
    /// Suggestions sorted by descending score
    pub libraries: Vec<LibrarySuggestion>,
}

impl SuggestionResult {
    /// Whether no library matched
    pub fn is_empty(&self) -> bool {
        self.libraries.is_empty()
    }

    /// Number of suggestions
    pub fn len(&self) -> usize {
        self.libraries.len()
    }
}

/// Ranks the libraries of a [`DocumentStore`] against a query
#[derive(Clone)]
pub struct LibrarySuggester {
    store: Arc<dyn DocumentStore>,
    default_max_results: usize,
    search_timeout: Option<Duration>,
}

impl LibrarySuggester {
    /// Create a suggester over `store` with no per-search timeout
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            default_max_results: DEFAULT_MAX_RESULTS,
            search_timeout: None,
        }
    }

    /// Create a suggester using configured defaults
    pub fn from_config(store: Arc<dyn DocumentStore>, config: &SuggestConfig) -> Self {
        Self::new(store)
            .with_default_max_results(config.default_max_results)
            .with_search_timeout(config.search_timeout())
    }

    /// Result count used when a request gives none
    pub fn with_default_max_results(mut self, max_results: usize) -> Self {
        self.default_max_results = max_results;
        self
    }

    /// Bound every per-library search; a search that overruns counts as failed
    pub fn with_search_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.search_timeout = timeout;
        self
    }

    /// The underlying store
    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    /// Rank libraries for `query`
    ///
    /// Returns at most `max_results` (default 5, or as configured) libraries with a positive
    /// best-match score, highest first. Libraries whose search fails are left
    /// out; only invalid input or a failed listing is reported as an error.
    pub async fn suggest(&self, query: &str, max_results: Option<usize>) -> Result<SuggestionResult> {
        let options = SuggestOptions::new(query, max_results.or(Some(self.default_max_results)))?;
        self.suggest_with(&options).await
    }

    /// Rank libraries for already validated options
    pub async fn suggest_with(&self, options: &SuggestOptions) -> Result<SuggestionResult> {
        let libraries = self.store.list_libraries().await?;
        if libraries.is_empty() {
            debug!("No indexed libraries, nothing to rank");
            return Ok(SuggestionResult::default());
        }

        let searches = libraries
            .iter()
            .map(|library| self.score_library(library, options.query()));
        let scored = join_all(searches).await;

        let total = scored.len();
        let libraries = rank(scored, options.max_results());
        info!(
            "Ranked {} of {} libraries for query {:?}",
            libraries.len(),
            total,
            options.query()
        );

        Ok(SuggestionResult { libraries })
    }

    /// Search one library and reduce its records to a single entry
    ///
    /// Never fails: a store error or timeout yields a zero score.
    async fn score_library(&self, library: &LibrarySummary, query: &str) -> LibrarySuggestion {
        let name = library.library.as_str();
        match self.search(name, query).await {
            Ok(records) => reduce(name, &records),
            Err(e) => {
                debug!("Search in library {} failed, scoring 0: {}", name, e);
                LibrarySuggestion {
                    name: name.to_string(),
                    score: 0.0,
                    matched_content: None,
                }
            }
        }
    }

    async fn search(&self, library: &str, query: &str) -> std::result::Result<Vec<MatchRecord>, StoreError> {
        let search = self.store.search_store(library, None, query, SEARCH_LIMIT);
        match self.search_timeout {
            Some(timeout) => tokio::time::timeout(timeout, search)
                .await
                .map_err(|_| StoreError::Timeout {
                    library: library.to_string(),
                    millis: timeout.as_millis() as u64,
                })?,
            None => search.await,
        }
    }
}

/// Reduce a library's records to its best score and that record's snippet
///
/// Absent and non-finite scores are skipped. On ties the earliest record wins.
fn reduce(library: &str, records: &[MatchRecord]) -> LibrarySuggestion {
    let mut best: Option<(f64, &MatchRecord)> = None;
    for record in records {
        let Some(score) = record.score.filter(|s| s.is_finite()) else {
            continue;
        };
        if best.map_or(true, |(top, _)| score > top) {
            best = Some((score, record));
        }
    }

    match best {
        Some((score, record)) if score > 0.0 => LibrarySuggestion {
            name: library.to_string(),
            score,
            matched_content: Some(truncate_chars(&record.content, SNIPPET_MAX_CHARS)),
        },
        _ => LibrarySuggestion {
            name: library.to_string(),
            score: 0.0,
            matched_content: None,
        },
    }
}

/// Drop non-positive scores, sort best first and keep the top `max_results`
///
/// The sort is stable, so equal scores keep the store's listing order.
fn rank(mut scored: Vec<LibrarySuggestion>, max_results: usize) -> Vec<LibrarySuggestion> {
    scored.retain(|s| s.score > 0.0 && s.score.is_finite());
    scored.sort_by(|a, b| b.score.total_cmp(&a.score));
    scored.truncate(max_results);
    scored
}

/// Keep at most `max` characters, cutting mid-word if needed
fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((byte_index, _)) => text[..byte_index].to_string(),
        None => text.to_string(),
    }
}
