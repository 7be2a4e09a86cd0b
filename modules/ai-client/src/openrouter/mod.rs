use async_trait::async_trait;

use crate::error::AiError;
use crate::openai::types::ChatRequest;
use crate::openai::OpenAiClient;
use crate::traits::TextGenerator;

const OPENROUTER_API_URL: &str = "https://openrouter.ai/api/v1";

// =============================================================================
// OpenRouter Generator
// =============================================================================

/// OpenRouter speaks the OpenAI chat-completions format, so it reuses that
/// client with its own base URL and attribution headers.
#[derive(Clone)]
pub struct OpenRouter {
    api_key: String,
    pub(crate) model: String,
    app_name: Option<String>,
    max_tokens: u32,
    http: reqwest::Client,
}

impl OpenRouter {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            app_name: None,
            max_tokens: 4096,
            http: reqwest::Client::new(),
        }
    }

    pub fn with_app_name(mut self, name: impl Into<String>) -> Self {
        self.app_name = Some(name.into());
        self
    }

    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    fn client(&self) -> OpenAiClient {
        let mut client = OpenAiClient::new(&self.api_key, self.http.clone())
            .with_base_url(OPENROUTER_API_URL)
            .with_label("OpenRouter");
        if let Some(ref name) = self.app_name {
            client = client.with_header("X-Title", name);
        }
        client
    }
}

#[async_trait]
impl TextGenerator for OpenRouter {
    fn provider(&self) -> &'static str {
        "openrouter"
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn is_configured(&self) -> bool {
        !self.api_key.trim().is_empty()
    }

    async fn generate(&self, system: &str, user: &str) -> Result<String, AiError> {
        if !self.is_configured() {
            return Err(AiError::Config("OpenRouter API key is empty".into()));
        }
        let request = ChatRequest::json(&self.model, system, user, self.max_tokens);
        self.client().chat(&request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openrouter_builder() {
        let ai = OpenRouter::new("or-key", "anthropic/claude-3.5-haiku")
            .with_app_name("dealsignal");
        assert_eq!(ai.model(), "anthropic/claude-3.5-haiku");
        assert_eq!(ai.app_name.as_deref(), Some("dealsignal"));
        assert!(ai.is_configured());
    }
}
