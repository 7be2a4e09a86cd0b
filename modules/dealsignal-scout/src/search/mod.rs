//! Search capability and the gateway every strategy goes through.
//!
//! `WebSearcher` is the raw provider seam (Brave in production, mocks in
//! tests). `SearchGateway` layers the shared concurrency ceiling, quota,
//! per-call timeout, retries and normalization on top of it and never
//! returns an error.

pub mod brave;
pub mod gateway;
pub mod quota;

pub use brave::BraveSearcher;
pub use gateway::{GatewayConfig, SearchGateway};
pub use quota::QueryQuota;

use std::time::Duration;

use async_trait::async_trait;
use dealsignal_common::FailureKind;
use thiserror::Error;

/// One raw result as the provider returned it. Any field may be missing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchResult {
    pub title: Option<String>,
    pub url: Option<String>,
    pub description: Option<String>,
    pub extra_snippets: Option<Vec<String>>,
}

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("search capability is not configured")]
    Unconfigured,

    #[error("rate limited by search provider")]
    RateLimited { retry_after: Option<Duration> },

    #[error("search provider returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("network error: {0}")]
    Network(String),

    #[error("malformed search response: {0}")]
    Malformed(String),
}

impl SearchError {
    /// Rate limits, 5xx and network errors are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            SearchError::RateLimited { .. } | SearchError::Network(_) => true,
            SearchError::Http { status, .. } => *status >= 500,
            SearchError::Unconfigured | SearchError::Malformed(_) => false,
        }
    }

    pub fn kind(&self) -> FailureKind {
        match self {
            SearchError::Unconfigured => FailureKind::Unconfigured,
            SearchError::RateLimited { .. } => FailureKind::RateLimited,
            SearchError::Http { .. } | SearchError::Network(_) => FailureKind::Http,
            SearchError::Malformed(_) => FailureKind::Malformed,
        }
    }
}

impl From<reqwest::Error> for SearchError {
    fn from(e: reqwest::Error) -> Self {
        SearchError::Network(e.to_string())
    }
}

// --- WebSearcher trait ---

#[async_trait]
pub trait WebSearcher: Send + Sync {
    async fn search(&self, query: &str, max_results: usize)
        -> Result<Vec<SearchResult>, SearchError>;

    /// False when no credential/endpoint is available. The gateway then
    /// short-circuits every query to an empty result.
    fn is_configured(&self) -> bool {
        true
    }

    fn name(&self) -> &str;
}

/// Searcher used when no search credential is configured.
pub struct NoopSearcher;

#[async_trait]
impl WebSearcher for NoopSearcher {
    async fn search(
        &self,
        _query: &str,
        _max_results: usize,
    ) -> Result<Vec<SearchResult>, SearchError> {
        Ok(Vec::new())
    }

    fn is_configured(&self) -> bool {
        false
    }

    fn name(&self) -> &str {
        "noop"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retry_classification() {
        assert!(SearchError::RateLimited { retry_after: None }.is_retryable());
        assert!(SearchError::Http { status: 503, body: String::new() }.is_retryable());
        assert!(!SearchError::Http { status: 401, body: String::new() }.is_retryable());
        assert!(!SearchError::Malformed("x".into()).is_retryable());
        assert_eq!(
            SearchError::Network("reset".into()).kind(),
            FailureKind::Http
        );
    }
}
