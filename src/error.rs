// Error Handling
//
// *La Gestion des Erreurs* (The Error Management) - Errors surfaced to callers of the suggester

use crate::store::StoreError;
use thiserror::Error;

/// Result type for suggestion operations
pub type Result<T> = std::result::Result<T, SuggestError>;

/// Errors surfaced by [`crate::LibrarySuggester`]
///
/// Per-library search failures never appear here; they are absorbed during
/// the fan-out. Only malformed input and a failed library listing reach the
/// caller.
#[derive(Debug, Error)]
pub enum SuggestError {
    /// Malformed request, rejected before any I/O
    #[error("Invalid argument: {message}")]
    InvalidArgument {
        /// What was wrong with the input
        message: String,
        /// How to fix the request
        suggestion: Option<String>,
    },

    /// The store could not enumerate its libraries
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl SuggestError {
    /// Create an invalid argument error
    pub fn invalid_argument(message: impl Into<String>, suggestion: Option<String>) -> Self {
        SuggestError::InvalidArgument {
            message: message.into(),
            suggestion,
        }
    }

    /// Whether the error was caused by the caller's input
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, SuggestError::InvalidArgument { .. })
    }

    /// Get user-friendly suggestion for recovery
    pub fn suggestion(&self) -> Option<String> {
        match self {
            SuggestError::InvalidArgument { suggestion, .. } => suggestion.clone(),
            SuggestError::Store(StoreError::Backend(_)) => {
                Some("Check that the document store is reachable and its database is readable.".to_string())
            }
            SuggestError::Store(_) => None,
        }
    }
}

/// Format error for user display
///
/// Appends the recovery suggestion, if any, on its own paragraph.
pub fn format_error(error: &SuggestError) -> String {
    let mut message = format!("Error: {}", error);

    if let Some(suggestion) = error.suggestion() {
        message.push_str(&format!("\n\nSuggestion: {}", suggestion));
    }

    message
}
