use std::sync::Arc;
use std::time::Duration;

use ai_client::{Claude, OpenAi, OpenRouter, TextGenerator};
use dealsignal_common::Config;
use tracing::info;

/// Ordered synthesis providers. The first configured one handles the whole
/// request; a failing provider is not retried with the next.
#[derive(Clone, Default)]
pub struct SynthesisChain {
    providers: Vec<Arc<dyn TextGenerator>>,
}

impl SynthesisChain {
    pub fn new(providers: Vec<Arc<dyn TextGenerator>>) -> Self {
        Self { providers }
    }

    /// Claude, then OpenAI, then OpenRouter. Providers without a key are
    /// kept in the chain but report themselves unconfigured.
    pub fn from_config(config: &Config, request_timeout: Duration) -> Self {
        let http = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        let key = |k: &Option<String>| k.clone().unwrap_or_default();

        let chain = Self::new(vec![
            Arc::new(
                Claude::new(key(&config.anthropic_api_key), &config.anthropic_model)
                    .with_max_tokens(2048)
                    .with_http_client(http.clone()),
            ),
            Arc::new(
                OpenAi::new(key(&config.openai_api_key), &config.openai_model)
                    .with_max_tokens(2048)
                    .with_http_client(http.clone()),
            ),
            Arc::new(
                OpenRouter::new(key(&config.openrouter_api_key), &config.openrouter_model)
                    .with_app_name("dealsignal-scout")
                    .with_http_client(http),
            ),
        ]);

        match chain.select() {
            Some(p) => info!(provider = p.provider(), model = p.model(), "Synthesis provider selected"),
            None => info!("No synthesis provider configured"),
        }
        chain
    }

    /// First configured provider, if any.
    pub fn select(&self) -> Option<&Arc<dyn TextGenerator>> {
        self.providers.iter().find(|p| p.is_configured())
    }

    pub fn is_configured(&self) -> bool {
        self.select().is_some()
    }

    pub fn providers(&self) -> &[Arc<dyn TextGenerator>] {
        &self.providers
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::testing::MockGenerator;

    #[test]
    fn first_configured_provider_wins() {
        let chain = SynthesisChain::new(vec![
            Arc::new(MockGenerator::unconfigured("anthropic")),
            Arc::new(MockGenerator::responding("openai", "{}")),
            Arc::new(MockGenerator::responding("openrouter", "{}")),
        ]);
        assert_eq!(chain.select().map(|p| p.provider()), Some("openai"));
    }

    #[test]
    fn empty_or_unconfigured_chain_selects_nothing() {
        assert!(!SynthesisChain::default().is_configured());
        let chain = SynthesisChain::new(vec![Arc::new(MockGenerator::unconfigured("anthropic"))]);
        assert!(chain.select().is_none());
    }

    #[test]
    fn from_config_follows_fixed_provider_order() {
        let vars: HashMap<String, String> = [
            ("OPENROUTER_API_KEY", "or-key"),
            ("OPENAI_API_KEY", "sk-key"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        let chain = SynthesisChain::from_config(&Config::from_map(&vars), Duration::from_secs(5));

        let order: Vec<_> = chain.providers().iter().map(|p| p.provider()).collect();
        assert_eq!(order, ["anthropic", "openai", "openrouter"]);
        assert_eq!(chain.select().map(|p| p.provider()), Some("openai"));
    }
}
