// Integration Tests for LeSuggestion
//
// These tests cover end-to-end workflows including:
// - Ranking over an in-memory store
// - Ranking over a SQLite/FTS5 store on disk
// - Result invariants under arbitrary store contents

use async_trait::async_trait;
use lesuggestion::store::StoreResult;
use lesuggestion::{
    DocumentStore, LibrarySuggester, LibrarySummary, MatchRecord, MemoryStore, StoreError,
};
use std::sync::{Arc, Mutex};

/// Store recording every search request it receives
#[derive(Default)]
struct RecordingStore {
    libraries: Vec<String>,
    calls: Mutex<Vec<(String, Option<String>, String, usize)>>,
}

#[async_trait]
impl DocumentStore for RecordingStore {
    async fn list_libraries(&self) -> StoreResult<Vec<LibrarySummary>> {
        Ok(self.libraries.iter().map(LibrarySummary::named).collect())
    }

    async fn search_store(
        &self,
        library: &str,
        version: Option<&str>,
        query: &str,
        limit: usize,
    ) -> StoreResult<Vec<MatchRecord>> {
        self.calls.lock().unwrap().push((
            library.to_string(),
            version.map(str::to_string),
            query.to_string(),
            limit,
        ));
        Ok(vec![MatchRecord::new(format!("{} docs", library), Some(1.0), "")])
    }
}

/// Store whose listing always fails
struct UnreachableStore;

#[async_trait]
impl DocumentStore for UnreachableStore {
    async fn list_libraries(&self) -> StoreResult<Vec<LibrarySummary>> {
        Err(StoreError::Backend("connection refused".to_string()))
    }

    async fn search_store(
        &self,
        library: &str,
        _version: Option<&str>,
        _query: &str,
        _limit: usize,
    ) -> StoreResult<Vec<MatchRecord>> {
        Err(StoreError::LibraryNotFound(library.to_string()))
    }
}

// ============================================================================
// RANKING WORKFLOW TESTS
// ============================================================================

mod ranking_tests {
    use super::*;

    fn record(content: &str, score: f64) -> MatchRecord {
        MatchRecord::new(content, Some(score), "https://docs.example/page")
    }

    #[tokio::test]
    async fn test_libraries_ranked_and_empty_ones_excluded() {
        let store = MemoryStore::new()
            .with_library("react", vec![record("useEffect and custom hooks", 0.95)])
            .with_library("vue", vec![record("Composition API hooks", 0.75)])
            .with_library("angular", vec![]);
        let suggester = LibrarySuggester::new(Arc::new(store));

        let result = suggester.suggest("hooks", Some(5)).await.unwrap();

        let ranked: Vec<(&str, f64)> = result
            .libraries
            .iter()
            .map(|l| (l.name.as_str(), l.score))
            .collect();
        assert_eq!(ranked, vec![("react", 0.95), ("vue", 0.75)]);
    }

    #[tokio::test]
    async fn test_max_results_truncates() {
        let store = MemoryStore::new()
            .with_library("a", vec![record("x", 0.8)])
            .with_library("b", vec![record("y", 0.8)])
            .with_library("c", vec![record("z", 0.8)]);
        let suggester = LibrarySuggester::new(Arc::new(store));

        let result = suggester.suggest("anything", Some(2)).await.unwrap();

        assert_eq!(result.len(), 2);
        let names: Vec<&str> = result.libraries.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_failing_library_is_skipped() {
        let store = MemoryStore::new()
            .with_failing_library("broken", "index corrupted")
            .with_library("healthy", vec![record("works", 0.5)]);
        let suggester = LibrarySuggester::new(Arc::new(store));

        let result = suggester.suggest("works", None).await.unwrap();

        assert_eq!(result.len(), 1);
        assert_eq!(result.libraries[0].name, "healthy");
    }

    #[tokio::test]
    async fn test_long_content_is_truncated() {
        let content = "a".repeat(300);
        let store = MemoryStore::new().with_library("big", vec![record(&content, 0.9)]);
        let suggester = LibrarySuggester::new(Arc::new(store));

        let result = suggester.suggest("a", None).await.unwrap();

        let snippet = result.libraries[0]
            .matched_content
            .as_deref()
            .expect("snippet present");
        assert!(snippet.chars().count() <= 200);
        assert!(content.starts_with(snippet));
    }

    #[tokio::test]
    async fn test_no_libraries() {
        let suggester = LibrarySuggester::new(Arc::new(MemoryStore::new()));

        let result = suggester.suggest("anything", None).await.unwrap();

        assert!(result.is_empty());
        assert_eq!(
            serde_json::to_value(&result).unwrap(),
            serde_json::json!({ "libraries": [] })
        );
    }

    #[tokio::test]
    async fn test_one_search_per_library_without_version() {
        let store = Arc::new(RecordingStore {
            libraries: vec!["serde".to_string(), "tokio".to_string()],
            ..Default::default()
        });
        let suggester = LibrarySuggester::new(store.clone());

        let result = suggester.suggest("spawn", Some(1)).await.unwrap();
        assert_eq!(result.len(), 1);

        let mut calls = store.calls.lock().unwrap().clone();
        calls.sort();
        assert_eq!(
            calls,
            vec![
                ("serde".to_string(), None, "spawn".to_string(), 3),
                ("tokio".to_string(), None, "spawn".to_string(), 3),
            ]
        );
    }

    #[tokio::test]
    async fn test_listing_failure_is_reported() {
        let suggester = LibrarySuggester::new(Arc::new(UnreachableStore));

        let err = suggester.suggest("anything", None).await.unwrap_err();

        assert!(!err.is_invalid_argument());
        assert!(err.to_string().contains("connection refused"));
    }

    #[tokio::test]
    async fn test_invalid_input_rejected() {
        let suggester = LibrarySuggester::new(Arc::new(MemoryStore::new()));

        for (query, max) in [("", None), ("  \t", Some(3)), ("ok", Some(0)), ("ok", Some(21))] {
            let err = suggester.suggest(query, max).await.unwrap_err();
            assert!(err.is_invalid_argument(), "{:?} / {:?}", query, max);
        }
    }
}

// ============================================================================
// SQLITE STORE WORKFLOW TESTS
// ============================================================================

#[cfg(feature = "storage")]
mod sqlite_workflow_tests {
    use super::*;
    use lesuggestion::SqliteStore;
    use tempfile::TempDir;

    fn seed(store: &SqliteStore) {
        store
            .insert_document(
                "react",
                "18.2",
                "https://react.dev/reference/react/hooks",
                "Hooks let you use state and other React features from your components.",
            )
            .unwrap();
        store
            .insert_document(
                "react",
                "18.2",
                "https://react.dev/learn",
                "Components are the building blocks of React applications.",
            )
            .unwrap();
        store
            .insert_document(
                "tokio",
                "1.40",
                "https://docs.rs/tokio/latest/tokio/task",
                "Spawn asynchronous tasks onto the runtime with tokio::spawn.",
            )
            .unwrap();
        store.register_library("empty-lib", "0.1").unwrap();
    }

    #[tokio::test]
    async fn test_suggest_over_sqlite_store() {
        let dir = TempDir::new().unwrap();
        let store = SqliteStore::open(dir.path().join("docs.db")).unwrap();
        seed(&store);
        let suggester = LibrarySuggester::new(Arc::new(store));

        let result = suggester.suggest("react hooks state", None).await.unwrap();

        assert_eq!(result.len(), 1);
        let top = &result.libraries[0];
        assert_eq!(top.name, "react");
        assert!(top.score > 0.0);
        assert!(top
            .matched_content
            .as_deref()
            .unwrap_or_default()
            .contains("Hooks"));
    }

    #[tokio::test]
    async fn test_store_survives_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/docs.db");
        {
            let store = SqliteStore::open(&path).unwrap();
            seed(&store);
        }

        let store = SqliteStore::open(&path).unwrap();
        let suggester = LibrarySuggester::new(Arc::new(store));
        let result = suggester.suggest("spawn tasks", Some(3)).await.unwrap();

        let names: Vec<&str> = result.libraries.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, vec!["tokio"]);
    }

    #[tokio::test]
    async fn test_query_without_terms_matches_nothing() {
        let store = SqliteStore::open_in_memory().unwrap();
        seed(&store);
        let suggester = LibrarySuggester::new(Arc::new(store));

        let result = suggester.suggest("!!! ???", None).await.unwrap();

        assert!(result.is_empty());
    }
}

// ============================================================================
// RESULT INVARIANT TESTS
// ============================================================================

mod invariant_tests {
    use super::*;
    use proptest::prelude::*;

    fn library_strategy() -> impl Strategy<Value = Vec<Option<(f64, String)>>> {
        prop::collection::vec(
            prop::option::weighted(0.8, (0.0f64..10.0, "[a-z ]{0,400}")),
            0..12,
        )
    }

    proptest! {
        #[test]
        fn result_is_sorted_bounded_and_positive(
            libraries in library_strategy(),
            max_results in 1usize..=20,
        ) {
            let mut store = MemoryStore::new();
            for (i, entry) in libraries.iter().enumerate() {
                let name = format!("lib{}", i);
                store = match entry {
                    Some((score, content)) => store.with_library(
                        name,
                        vec![MatchRecord::new(content.clone(), Some(*score), "")],
                    ),
                    None => store.with_failing_library(name, "unavailable"),
                };
            }
            let suggester = LibrarySuggester::new(Arc::new(store));

            let result = tokio_test::block_on(suggester.suggest("query", Some(max_results)))
                .unwrap();

            prop_assert!(result.len() <= max_results);
            for pair in result.libraries.windows(2) {
                prop_assert!(pair[0].score >= pair[1].score);
            }
            for library in &result.libraries {
                prop_assert!(library.score > 0.0);
                let snippet = library.matched_content.as_deref().unwrap_or_default();
                prop_assert!(snippet.chars().count() <= 200);
            }

            let positive = libraries
                .iter()
                .filter(|e| matches!(e, Some((score, _)) if *score > 0.0))
                .count();
            prop_assert_eq!(result.len(), positive.min(max_results));
        }
    }
}
