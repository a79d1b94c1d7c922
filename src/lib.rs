// lesuggestion - Library Suggestion
//
// *La Suggestion* (The Suggestion) - Rank indexed documentation libraries by
// relevance to a free-text query

#![warn(missing_docs)]
#![warn(unused_extern_crates)]

/// Error types shared by the suggester and its surfaces
pub mod error;

/// Configuration loading and validation
pub mod config;

/// Document store abstraction and implementations
pub mod store;

/// Library ranking over a document store
pub mod suggest;

/// MCP JSON-RPC surface
#[cfg(feature = "server")]
pub mod mcp;

/// Command-line interface
#[cfg(feature = "cli")]
pub mod cli;

pub use config::{Config, ConfigError};
pub use error::{Result, SuggestError};
pub use store::{DocumentStore, LibrarySummary, MatchRecord, MemoryStore, StoreError, VersionSummary};
#[cfg(feature = "storage")]
pub use store::SqliteStore;
pub use suggest::{
    LibrarySuggester, LibrarySuggestion, SuggestOptions, SuggestionResult, DEFAULT_MAX_RESULTS,
    MAX_RESULTS_LIMIT,
};
