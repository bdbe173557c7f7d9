//! Error taxonomy shared by the store, filter and catalog layers.

use crate::types::{Namespace, SearchId};

/// Result type for search store operations.
pub type SearchResult<T> = Result<T, SearchError>;

/// Every failure a store, filter or catalog operation can report.
///
/// None of these terminate the host process; tools turn them into error
/// results at the call boundary.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    /// A required API key is missing from the environment.
    #[error("Configuration error: {variable} environment variable is required")]
    Configuration { variable: String },

    /// Network failure, timeout, non-2xx status or provider error body.
    #[error("Provider {provider} unavailable: {message}")]
    ProviderUnavailable { provider: String, message: String },

    /// The provider answered but found nothing for the request. Asking again
    /// gives the same answer.
    #[error("No results from {provider}: {message}")]
    NoResults { provider: String, message: String },

    /// The referenced search does not exist.
    #[error("No {} search found with ID: {id}", .namespace.noun())]
    NotFound { namespace: Namespace, id: SearchId },

    /// The stored bytes are not a valid record for the namespace.
    #[error("Corrupted {} data for search ID {id}: {reason}", .namespace.noun())]
    Corrupt {
        namespace: Namespace,
        id: SearchId,
        reason: String,
    },

    /// Caller supplied arguments the operation cannot work with.
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    /// The storage medium could not be read or written.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Anything else.
    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

impl SearchError {
    pub fn not_found(namespace: Namespace, id: &SearchId) -> Self {
        Self::NotFound {
            namespace,
            id: id.clone(),
        }
    }

    pub fn corrupt(namespace: Namespace, id: &SearchId, reason: impl ToString) -> Self {
        Self::Corrupt {
            namespace,
            id: id.clone(),
            reason: reason.to_string(),
        }
    }

    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ProviderUnavailable {
            provider: provider.into(),
            message: message.into(),
        }
    }

    pub fn no_results(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::NoResults {
            provider: provider.into(),
            message: message.into(),
        }
    }

    pub fn storage(err: impl std::fmt::Display) -> Self {
        Self::Storage(err.to_string())
    }

    /// Check if the caller may retry the operation unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ProviderUnavailable { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Short machine-readable tag for the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Configuration { .. } => "configuration",
            Self::ProviderUnavailable { .. } => "provider_unavailable",
            Self::NoResults { .. } => "no_results",
            Self::NotFound { .. } => "not_found",
            Self::Corrupt { .. } => "corrupt",
            Self::InvalidArguments(_) => "invalid_arguments",
            Self::Storage(_) => "storage",
            Self::Unexpected(_) => "unexpected",
        }
    }
}
