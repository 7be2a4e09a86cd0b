use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dealsignal_common::{FailureKind, Query, SearchHit};
use rand::Rng;
use tokio::sync::Semaphore;
use tokio::time::Instant;
use tracing::{debug, warn};

use super::{QueryQuota, SearchResult, WebSearcher};

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Global ceiling on in-flight search calls for the whole run.
    pub max_concurrent: usize,
    pub results_per_query: usize,
    /// Strict timeout for one provider call.
    pub call_timeout: Duration,
    /// Wall-clock cap on one query across all attempts and backoff sleeps.
    /// The concurrency permit is never held longer than this.
    pub query_budget: Duration,
    /// Attempts per query, including the first.
    pub max_attempts: u32,
    /// Backoff before retry n is `retry_base * 3^n` plus up to 250ms jitter.
    pub retry_base: Duration,
    /// Max calls per run. 0 = unlimited.
    pub quota: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 6,
            results_per_query: 10,
            call_timeout: Duration::from_secs(8),
            query_budget: Duration::from_secs(12),
            max_attempts: 2,
            retry_base: Duration::from_millis(500),
            quota: 60,
        }
    }
}

/// Per-run counters. Atomic so concurrent workers can record without locks.
#[derive(Default)]
struct GatewayStats {
    issued: AtomicU64,
    succeeded: AtomicU64,
    failures: [AtomicU64; FailureKind::ALL.len()],
}

impl GatewayStats {
    fn record_failure(&self, kind: FailureKind) {
        let idx = FailureKind::ALL
            .iter()
            .position(|k| *k == kind)
            .unwrap_or_default();
        self.failures[idx].fetch_add(1, Ordering::Relaxed);
    }
}

/// Rate-aware, retrying adapter over one `WebSearcher`.
///
/// `execute` never fails: any problem turns into zero hits plus a recorded
/// failure reason. The concurrency permit is held across retries, for at
/// most `query_budget`, and released on drop, so a timed-out or aborted call
/// never leaks a slot.
pub struct SearchGateway {
    searcher: Arc<dyn WebSearcher>,
    permits: Arc<Semaphore>,
    quota: QueryQuota,
    config: GatewayConfig,
    stats: GatewayStats,
}

impl SearchGateway {
    /// One gateway per run: the permit pool, quota and counters are all
    /// scoped to it.
    pub fn new(searcher: Arc<dyn WebSearcher>, config: GatewayConfig) -> Self {
        Self {
            searcher,
            permits: Arc::new(Semaphore::new(config.max_concurrent.max(1))),
            quota: QueryQuota::new(config.quota),
            config,
            stats: GatewayStats::default(),
        }
    }

    /// Whether the underlying capability has credentials at all.
    pub fn is_available(&self) -> bool {
        self.searcher.is_configured()
    }

    pub fn searcher_name(&self) -> &str {
        self.searcher.name()
    }

    /// Free concurrency slots right now.
    pub fn available_permits(&self) -> usize {
        self.permits.available_permits()
    }

    pub async fn execute(&self, query: &Query) -> Vec<SearchHit> {
        if !self.searcher.is_configured() {
            self.stats.record_failure(FailureKind::Unconfigured);
            debug!(query = query.text.as_str(), "Search unconfigured, skipping query");
            return Vec::new();
        }

        let Ok(_permit) = self.permits.acquire().await else {
            self.fail(query, FailureKind::Http, "concurrency pool closed");
            return Vec::new();
        };

        if !self.quota.try_acquire() {
            self.fail(query, FailureKind::QuotaExceeded, "search quota exhausted");
            return Vec::new();
        }
        self.stats.issued.fetch_add(1, Ordering::Relaxed);

        let deadline = Instant::now() + self.config.query_budget;
        let max_attempts = self.config.max_attempts.max(1);
        for attempt in 0..max_attempts {
            let call = self
                .searcher
                .search(&query.text, self.config.results_per_query);
            let remaining = deadline.saturating_duration_since(Instant::now());

            match tokio::time::timeout(self.config.call_timeout.min(remaining), call).await {
                Err(_) => {
                    self.fail(query, FailureKind::Timeout, "search call timed out");
                    return Vec::new();
                }
                Ok(Ok(results)) => {
                    self.stats.succeeded.fetch_add(1, Ordering::Relaxed);
                    let hits = self.normalize(results, query);
                    debug!(
                        query = query.text.as_str(),
                        strategy = %query.strategy,
                        hits = hits.len(),
                        "Query complete"
                    );
                    return hits;
                }
                Ok(Err(e)) if e.is_retryable() && attempt + 1 < max_attempts => {
                    let backoff = self.backoff(attempt, &e);
                    if Instant::now() + backoff >= deadline {
                        self.fail(query, e.kind(), &format!("{e}; no query budget left to retry"));
                        return Vec::new();
                    }
                    warn!(
                        query = query.text.as_str(),
                        strategy = %query.strategy,
                        attempt = attempt + 1,
                        backoff_ms = backoff.as_millis() as u64,
                        error = %e,
                        "Search failed, retrying after backoff"
                    );
                    tokio::time::sleep(backoff).await;
                }
                Ok(Err(e)) => {
                    self.fail(query, e.kind(), &e.to_string());
                    return Vec::new();
                }
            }
        }

        Vec::new()
    }

    fn backoff(&self, attempt: u32, error: &super::SearchError) -> Duration {
        if let super::SearchError::RateLimited {
            retry_after: Some(wait),
        } = error
        {
            return (*wait).min(self.config.call_timeout);
        }
        let jitter = Duration::from_millis(rand::rng().random_range(0..250));
        self.config.retry_base * 3u32.pow(attempt) + jitter
    }

    fn normalize(&self, results: Vec<SearchResult>, query: &Query) -> Vec<SearchHit> {
        results
            .into_iter()
            .take(self.config.results_per_query)
            .map(|r| SearchHit {
                title: r.title.unwrap_or_default().trim().to_string(),
                url: r.url.unwrap_or_default().trim().to_string(),
                snippet: r.description.unwrap_or_default().trim().to_string(),
                extra_snippets: r.extra_snippets.unwrap_or_default(),
                source_strategy: query.strategy,
            })
            .collect()
    }

    fn fail(&self, query: &Query, kind: FailureKind, reason: &str) {
        self.stats.record_failure(kind);
        warn!(
            query = query.text.as_str(),
            strategy = %query.strategy,
            failure = %kind,
            reason,
            "Search query contributed no hits"
        );
    }

    /// Calls actually sent to the provider (quota-admitted).
    pub fn issued(&self) -> u64 {
        self.stats.issued.load(Ordering::Relaxed)
    }

    pub fn succeeded(&self) -> u64 {
        self.stats.succeeded.load(Ordering::Relaxed)
    }

    /// Failure counts for every kind, zeros included.
    pub fn failure_counts(&self) -> BTreeMap<FailureKind, u64> {
        FailureKind::ALL
            .iter()
            .zip(self.stats.failures.iter())
            .map(|(kind, count)| (*kind, count.load(Ordering::Relaxed)))
            .collect()
    }

    pub fn log_status(&self) {
        self.quota.log_status();
    }
}
