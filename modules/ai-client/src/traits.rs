use async_trait::async_trait;

use crate::error::AiError;

// =============================================================================
// TextGenerator Trait
// =============================================================================

/// One generative provider behind a single "system + user -> text" call.
///
/// Implementations must be cheap to construct without credentials so callers
/// can hold an ordered provider list and pick the first configured entry.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Stable provider name used in logs and run stats.
    fn provider(&self) -> &'static str;

    /// Model identifier sent to the provider.
    fn model(&self) -> &str;

    /// Whether credentials are present. Unconfigured providers are skipped.
    fn is_configured(&self) -> bool;

    /// Send system instructions plus a user payload and return the raw text.
    async fn generate(&self, system: &str, user: &str) -> Result<String, AiError>;
}
