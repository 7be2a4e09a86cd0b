// Test doubles for the sourcing pipeline.
//
// Two mocks matching the two outbound seams:
// - MockSearcher (WebSearcher): predicate rules, delays, scripted failures
// - MockGenerator (TextGenerator): canned text or error, call recording
//
// Plus helpers for building results, hits, evidence pools and theses.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use ai_client::{AiError, TextGenerator};
use async_trait::async_trait;
use dealsignal_common::{Evidence, EvidencePool, SearchHit, StrategyKind, Thesis};

use crate::search::{SearchError, SearchResult, WebSearcher};

// ---------------------------------------------------------------------------
// MockSearcher
// ---------------------------------------------------------------------------

type QueryPredicate = Box<dyn Fn(&str) -> bool + Send + Sync>;

/// Rule-based searcher. The first rule whose predicate matches the query
/// text wins; unmatched queries get zero results.
/// Builder pattern: `.on_matching()`, `.on_contains()`, `.on_any()`.
pub struct MockSearcher {
    rules: Vec<(QueryPredicate, Vec<SearchResult>)>,
    delay: Option<Duration>,
    scripted_failures: Mutex<VecDeque<SearchError>>,
    failing_status: Option<u16>,
    configured: bool,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
    queries: Mutex<Vec<String>>,
}

impl Default for MockSearcher {
    fn default() -> Self {
        Self::new()
    }
}

impl MockSearcher {
    pub fn new() -> Self {
        Self {
            rules: Vec::new(),
            delay: None,
            scripted_failures: Mutex::new(VecDeque::new()),
            failing_status: None,
            configured: true,
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn on_matching(
        mut self,
        predicate: impl Fn(&str) -> bool + Send + Sync + 'static,
        results: Vec<SearchResult>,
    ) -> Self {
        self.rules.push((Box::new(predicate), results));
        self
    }

    /// Case-insensitive substring rule.
    pub fn on_contains(self, needle: &str, results: Vec<SearchResult>) -> Self {
        let needle = needle.to_lowercase();
        self.on_matching(move |q| q.to_lowercase().contains(&needle), results)
    }

    pub fn on_any(self, results: Vec<SearchResult>) -> Self {
        self.on_matching(|_| true, results)
    }

    /// Every call sleeps this long before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Queue an error returned by the next call, before any rule applies.
    pub fn fail_next(self, error: SearchError) -> Self {
        self.scripted_failures
            .lock()
            .expect("lock poisoned")
            .push_back(error);
        self
    }

    /// Every call fails with this HTTP status.
    pub fn failing_with_status(mut self, status: u16) -> Self {
        self.failing_status = Some(status);
        self
    }

    pub fn unconfigured(mut self) -> Self {
        self.configured = false;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Highest number of concurrent `search` calls observed.
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    pub fn queries_seen(&self) -> Vec<String> {
        self.queries.lock().expect("lock poisoned").clone()
    }
}

/// Decrements the in-flight counter even when the call future is dropped.
struct InFlightGuard<'a>(&'a AtomicUsize);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl WebSearcher for MockSearcher {
    async fn search(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<SearchResult>, SearchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.queries
            .lock()
            .expect("lock poisoned")
            .push(query.to_string());

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
        let _guard = InFlightGuard(&self.in_flight);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let scripted = self
            .scripted_failures
            .lock()
            .expect("lock poisoned")
            .pop_front();
        if let Some(error) = scripted {
            return Err(error);
        }
        if let Some(status) = self.failing_status {
            return Err(SearchError::Http {
                status,
                body: "mock failure".to_string(),
            });
        }

        Ok(self
            .rules
            .iter()
            .find(|(predicate, _)| predicate(query))
            .map(|(_, results)| results.iter().take(max_results).cloned().collect())
            .unwrap_or_default())
    }

    fn is_configured(&self) -> bool {
        self.configured
    }

    fn name(&self) -> &str {
        "mock"
    }
}

// ---------------------------------------------------------------------------
// MockGenerator
// ---------------------------------------------------------------------------

enum Reply {
    Text(String),
    Error,
}

/// Canned synthesis provider. Records every user prompt it receives.
pub struct MockGenerator {
    provider: &'static str,
    reply: Reply,
    configured: bool,
    delay: Option<Duration>,
    prompts: Mutex<Vec<String>>,
}

impl MockGenerator {
    pub fn responding(provider: &'static str, text: &str) -> Self {
        Self {
            provider,
            reply: Reply::Text(text.to_string()),
            configured: true,
            delay: None,
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(provider: &'static str) -> Self {
        Self {
            reply: Reply::Error,
            ..Self::responding(provider, "")
        }
    }

    pub fn unconfigured(provider: &'static str) -> Self {
        Self {
            configured: false,
            ..Self::failing(provider)
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().expect("lock poisoned").len()
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.prompts.lock().expect("lock poisoned").last().cloned()
    }
}

#[async_trait]
impl TextGenerator for MockGenerator {
    fn provider(&self) -> &'static str {
        self.provider
    }

    fn model(&self) -> &str {
        "mock-model"
    }

    fn is_configured(&self) -> bool {
        self.configured
    }

    async fn generate(&self, _system: &str, user: &str) -> Result<String, AiError> {
        self.prompts
            .lock()
            .expect("lock poisoned")
            .push(user.to_string());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match &self.reply {
            Reply::Text(text) => Ok(text.clone()),
            Reply::Error => Err(AiError::Api {
                status: 500,
                body: "mock provider failure".to_string(),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Builders
// ---------------------------------------------------------------------------

pub fn result(title: &str, url: &str, snippet: &str) -> SearchResult {
    SearchResult {
        title: Some(title.to_string()),
        url: Some(url.to_string()),
        description: Some(snippet.to_string()),
        extra_snippets: None,
    }
}

pub fn hit(title: &str, url: &str, snippet: &str, strategy: StrategyKind) -> SearchHit {
    SearchHit {
        title: title.to_string(),
        url: url.to_string(),
        snippet: snippet.to_string(),
        extra_snippets: Vec::new(),
        source_strategy: strategy,
    }
}

/// Pool with one evidence item per hit, each from its own query.
pub fn pool(hits: Vec<SearchHit>) -> EvidencePool {
    EvidencePool::new(
        hits.into_iter()
            .enumerate()
            .map(|(i, hit)| Evidence {
                query_index: i,
                query: format!("query {i}"),
                position: 0,
                hit,
            })
            .collect(),
    )
}

/// Seed-stage European fintech thesis.
pub fn fintech_europe() -> Thesis {
    Thesis {
        sectors: vec!["Fintech".to_string()],
        stage: Some("seed".to_string()),
        geography: Some("Europe".to_string()),
        ..Default::default()
    }
}
