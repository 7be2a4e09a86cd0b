use std::collections::HashMap;
use std::env;
use std::str::FromStr;

use ai_client::key_preview;
use tracing::{info, warn};

pub const DEFAULT_ANTHROPIC_MODEL: &str = "claude-haiku-4-5-20251001";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_OPENROUTER_MODEL: &str = "anthropic/claude-3.5-haiku";

/// Application configuration loaded from environment variables.
///
/// Every credential is optional: a missing search key or synthesis key puts
/// the run into degraded mode instead of failing startup.
#[derive(Debug, Clone)]
pub struct Config {
    // Search
    pub brave_search_api_key: Option<String>,
    pub brave_search_url: Option<String>,

    // Synthesis providers, in priority order
    pub anthropic_api_key: Option<String>,
    pub anthropic_model: String,
    pub openai_api_key: Option<String>,
    pub openai_model: String,
    pub openrouter_api_key: Option<String>,
    pub openrouter_model: String,

    // Pipeline tuning
    pub max_concurrent_searches: usize,
    pub max_queries_per_strategy: usize,
    pub results_per_query: usize,
    pub search_timeout_secs: u64,
    pub run_budget_secs: u64,
    /// Max search calls per run. 0 = unlimited.
    pub search_quota: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            brave_search_api_key: None,
            brave_search_url: None,
            anthropic_api_key: None,
            anthropic_model: DEFAULT_ANTHROPIC_MODEL.to_string(),
            openai_api_key: None,
            openai_model: DEFAULT_OPENAI_MODEL.to_string(),
            openrouter_api_key: None,
            openrouter_model: DEFAULT_OPENROUTER_MODEL.to_string(),
            max_concurrent_searches: 6,
            max_queries_per_strategy: 8,
            results_per_query: 10,
            search_timeout_secs: 8,
            run_budget_secs: 45,
            search_quota: 60,
        }
    }
}

impl Config {
    /// Load `.env` (if present) and then read the process environment.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        let config = Self::from_lookup(|key| env::var(key).ok());
        config.log_keys();
        config
    }

    /// Build from an explicit map. Used by tests and embedding callers.
    pub fn from_map(vars: &HashMap<String, String>) -> Self {
        Self::from_lookup(|key| vars.get(key).cloned())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let secret = |key: &str| get(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let text = |key: &str, default: String| secret(key).unwrap_or(default);

        Self {
            brave_search_api_key: secret("BRAVE_SEARCH_API_KEY"),
            brave_search_url: secret("BRAVE_SEARCH_URL"),
            anthropic_api_key: secret("ANTHROPIC_API_KEY"),
            anthropic_model: text("ANTHROPIC_MODEL", defaults.anthropic_model),
            openai_api_key: secret("OPENAI_API_KEY"),
            openai_model: text("OPENAI_MODEL", defaults.openai_model),
            openrouter_api_key: secret("OPENROUTER_API_KEY"),
            openrouter_model: text("OPENROUTER_MODEL", defaults.openrouter_model),
            max_concurrent_searches: parse_or(
                &get,
                "SCOUT_MAX_CONCURRENT_SEARCHES",
                defaults.max_concurrent_searches,
            )
            .max(1),
            max_queries_per_strategy: parse_or(
                &get,
                "SCOUT_MAX_QUERIES_PER_STRATEGY",
                defaults.max_queries_per_strategy,
            )
            .max(1),
            results_per_query: parse_or(&get, "SCOUT_RESULTS_PER_QUERY", defaults.results_per_query)
                .clamp(1, 20),
            search_timeout_secs: parse_or(
                &get,
                "SCOUT_SEARCH_TIMEOUT_SECS",
                defaults.search_timeout_secs,
            )
            .max(1),
            run_budget_secs: parse_or(&get, "SCOUT_RUN_BUDGET_SECS", defaults.run_budget_secs)
                .max(1),
            search_quota: parse_or(&get, "SCOUT_SEARCH_QUOTA", defaults.search_quota),
        }
    }

    pub fn search_configured(&self) -> bool {
        self.brave_search_api_key.is_some()
    }

    pub fn synthesis_configured(&self) -> bool {
        self.anthropic_api_key.is_some()
            || self.openai_api_key.is_some()
            || self.openrouter_api_key.is_some()
    }

    pub fn log_keys(&self) {
        fn preview_opt(val: &Option<String>) -> String {
            key_preview(val.as_deref().unwrap_or_default())
        }

        info!("Config loaded:");
        info!("  BRAVE_SEARCH_API_KEY: {}", preview_opt(&self.brave_search_api_key));
        info!("  ANTHROPIC_API_KEY: {}", preview_opt(&self.anthropic_api_key));
        info!("  OPENAI_API_KEY: {}", preview_opt(&self.openai_api_key));
        info!("  OPENROUTER_API_KEY: {}", preview_opt(&self.openrouter_api_key));
        info!(
            max_concurrent_searches = self.max_concurrent_searches,
            max_queries_per_strategy = self.max_queries_per_strategy,
            results_per_query = self.results_per_query,
            search_timeout_secs = self.search_timeout_secs,
            run_budget_secs = self.run_budget_secs,
            search_quota = self.search_quota,
            "Pipeline tuning"
        );
        if !self.search_configured() {
            warn!("No search credential set; runs will be degraded with zero evidence");
        }
        if !self.synthesis_configured() {
            warn!("No synthesis provider set; ranking falls back to raw candidates");
        }
    }
}

fn parse_or<T: FromStr + Copy>(get: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T {
    match get(key) {
        None => default,
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!(key, value = raw.as_str(), "Unparseable config value, using default");
            default
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn empty_environment_gives_defaults_and_no_credentials() {
        let config = Config::from_map(&HashMap::new());
        assert!(!config.search_configured());
        assert!(!config.synthesis_configured());
        assert_eq!(config.max_concurrent_searches, 6);
        assert_eq!(config.anthropic_model, DEFAULT_ANTHROPIC_MODEL);
    }

    #[test]
    fn blank_keys_count_as_missing() {
        let config = Config::from_map(&vars(&[("BRAVE_SEARCH_API_KEY", "   ")]));
        assert!(!config.search_configured());
    }

    #[test]
    fn tuning_values_parse_and_fall_back() {
        let config = Config::from_map(&vars(&[
            ("SCOUT_MAX_CONCURRENT_SEARCHES", "0"),
            ("SCOUT_MAX_QUERIES_PER_STRATEGY", "4"),
            ("SCOUT_RUN_BUDGET_SECS", "soon"),
            ("OPENAI_API_KEY", "sk-test"),
        ]));
        assert_eq!(config.max_concurrent_searches, 1);
        assert_eq!(config.max_queries_per_strategy, 4);
        assert_eq!(config.run_budget_secs, 45);
        assert!(config.synthesis_configured());
    }

    #[test]
    fn zero_query_cap_is_raised_to_one() {
        let config = Config::from_map(&vars(&[
            ("SCOUT_MAX_QUERIES_PER_STRATEGY", "0"),
            ("SCOUT_RESULTS_PER_QUERY", "0"),
        ]));
        assert_eq!(config.max_queries_per_strategy, 1);
        assert_eq!(config.results_per_query, 1);
    }
}
