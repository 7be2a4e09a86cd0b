use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use reqwest::header::{ACCEPT, RETRY_AFTER};
use serde::Deserialize;
use tracing::{debug, info};

use super::{SearchError, SearchResult, WebSearcher};

static TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]{1,40}>").expect("valid regex"));

const BRAVE_API_URL: &str = "https://api.search.brave.com";

/// Brave caps `count` at 20 per request.
const BRAVE_MAX_COUNT: usize = 20;

// --- Brave web search ---

pub struct BraveSearcher {
    api_key: String,
    base_url: String,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct BraveResponse {
    #[serde(default)]
    web: Option<BraveWeb>,
}

#[derive(Debug, Deserialize)]
struct BraveWeb {
    #[serde(default)]
    results: Vec<BraveResult>,
}

#[derive(Debug, Deserialize)]
struct BraveResult {
    title: Option<String>,
    url: Option<String>,
    description: Option<String>,
    extra_snippets: Option<Vec<String>>,
}

impl BraveSearcher {
    pub fn new(api_key: &str) -> Self {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            api_key: api_key.trim().to_string(),
            base_url: BRAVE_API_URL.to_string(),
            client,
        }
    }

    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.trim_end_matches('/').to_string();
        self
    }

    fn parse(body: &str) -> Result<Vec<SearchResult>, SearchError> {
        let data: BraveResponse =
            serde_json::from_str(body).map_err(|e| SearchError::Malformed(e.to_string()))?;

        Ok(data
            .web
            .map(|w| w.results)
            .unwrap_or_default()
            .into_iter()
            .map(|r| SearchResult {
                title: r.title.map(|t| strip_markup(&t)),
                url: r.url,
                description: r.description.map(|d| strip_markup(&d)),
                extra_snippets: r
                    .extra_snippets
                    .map(|s| s.iter().map(|x| strip_markup(x)).collect()),
            })
            .collect())
    }
}

#[async_trait]
impl WebSearcher for BraveSearcher {
    async fn search(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<SearchResult>, SearchError> {
        if !self.is_configured() {
            return Err(SearchError::Unconfigured);
        }

        let count = max_results.clamp(1, BRAVE_MAX_COUNT).to_string();
        debug!(query, count = count.as_str(), "Brave search");

        let resp = self
            .client
            .get(format!("{}/res/v1/web/search", self.base_url))
            .header("X-Subscription-Token", &self.api_key)
            .header(ACCEPT, "application/json")
            .query(&[("q", query), ("count", count.as_str())])
            .send()
            .await?;

        let status = resp.status();
        if status.as_u16() == 429 {
            let retry_after = resp
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok())
                .map(Duration::from_secs);
            return Err(SearchError::RateLimited { retry_after });
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(SearchError::Http {
                status: status.as_u16(),
                body: ai_client::truncate_to_char_boundary(&body, 300).to_string(),
            });
        }

        let body = resp.text().await?;
        let results = Self::parse(&body)?;

        info!(query, count = results.len(), "Brave search complete");
        Ok(results)
    }

    fn is_configured(&self) -> bool {
        !self.api_key.is_empty()
    }

    fn name(&self) -> &str {
        "brave"
    }
}

/// Brave wraps matched terms in `<strong>` and escapes a few entities.
fn strip_markup(text: &str) -> String {
    TAG_RE
        .replace_all(text, "")
        .replace("&amp;", "&")
        .replace("&quot;", "\"")
        .replace("&#x27;", "'")
        .replace("&#39;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_keeps_missing_fields_missing() {
        let body = r#"{
            "web": {"results": [
                {"title": "<strong>Fintory</strong> startup", "url": "https://fintory.io",
                 "description": "Payments &amp; treasury", "extra_snippets": ["Series A"]},
                {"url": "https://example.com"}
            ]}
        }"#;
        let results = BraveSearcher::parse(body).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].title.as_deref(), Some("Fintory startup"));
        assert_eq!(results[0].description.as_deref(), Some("Payments & treasury"));
        assert_eq!(results[1].title, None);
        assert_eq!(results[1].extra_snippets, None);
    }

    #[test]
    fn response_without_web_section_is_empty() {
        assert!(BraveSearcher::parse(r#"{"type": "search"}"#).unwrap().is_empty());
    }

    #[test]
    fn non_json_body_is_malformed() {
        let err = BraveSearcher::parse("<html>busy</html>").unwrap_err();
        assert!(matches!(err, SearchError::Malformed(_)));
    }

    #[test]
    fn blank_key_is_unconfigured() {
        assert!(!BraveSearcher::new("  ").is_configured());
        assert!(BraveSearcher::new("token").is_configured());
    }
}
