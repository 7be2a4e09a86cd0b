mod client;
pub(crate) mod types;

use async_trait::async_trait;

use crate::error::AiError;
use crate::traits::TextGenerator;

pub(crate) use client::OpenAiClient;

// =============================================================================
// OpenAi Generator
// =============================================================================

#[derive(Clone)]
pub struct OpenAi {
    api_key: String,
    pub(crate) model: String,
    max_tokens: u32,
    http: reqwest::Client,
}

impl OpenAi {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            max_tokens: 4096,
            http: reqwest::Client::new(),
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    pub(crate) fn client(&self) -> OpenAiClient {
        OpenAiClient::new(&self.api_key, self.http.clone())
    }

    /// JSON-mode chat completion.
    pub async fn chat_completion(&self, system: &str, user: &str) -> Result<String, AiError> {
        let request = types::ChatRequest::json(&self.model, system, user, self.max_tokens);
        self.client().chat(&request).await
    }
}

#[async_trait]
impl TextGenerator for OpenAi {
    fn provider(&self) -> &'static str {
        "openai"
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn is_configured(&self) -> bool {
        !self.api_key.trim().is_empty()
    }

    async fn generate(&self, system: &str, user: &str) -> Result<String, AiError> {
        if !self.is_configured() {
            return Err(AiError::Config("OpenAI API key is empty".into()));
        }
        self.chat_completion(system, user).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openai_new() {
        let ai = OpenAi::new("sk-test", "gpt-4o-mini");
        assert_eq!(ai.model(), "gpt-4o-mini");
        assert_eq!(ai.api_key, "sk-test");
        assert_eq!(ai.provider(), "openai");
    }

    #[test]
    fn empty_key_is_unconfigured() {
        assert!(!OpenAi::new("", "gpt-4o-mini").is_configured());
    }
}
