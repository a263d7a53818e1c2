pub mod claude;
pub mod gemini;
pub mod models;
pub mod openai;

use async_trait::async_trait;

use crate::config::types::Settings;
use crate::error::MrAgentError;
pub use models::{ModelInfo, Pricing, Provider, UsageReport, resolve_model};

/// Raw result of one model call. The text still needs to go through
/// response normalization before anyone trusts its shape.
#[derive(Debug, Clone)]
pub struct AiResponse {
    pub text: String,
    pub usage: Option<UsageReport>,
}

/// Trait for model provider adapters.
///
/// An adapter owns exactly two concerns: turning prompts into one HTTP
/// call, and tagging the returned usage metadata with its provider.
/// Everything else (prompt building, parsing, validation) is shared.
/// Object-safe for dynamic dispatch via `Box<dyn AiAdapter>`.
#[async_trait]
pub trait AiAdapter: Send + Sync {
    fn provider(&self) -> Provider;

    /// Concrete model name sent over the wire.
    fn model_name(&self) -> &str;

    /// Human-readable name for summaries and metrics.
    fn display_name(&self) -> &str;

    fn pricing(&self) -> Pricing;

    /// Send one system+user prompt pair and return the raw response.
    async fn complete(&self, system: &str, user: &str) -> Result<AiResponse, MrAgentError>;
}

/// Build the adapter selected by `config.ai_provider`.
pub fn create_adapter(settings: &Settings) -> Result<Box<dyn AiAdapter>, MrAgentError> {
    let provider = Provider::parse(&settings.config.ai_provider)?;
    match provider {
        Provider::Gemini => Ok(Box::new(gemini::GeminiAdapter::from_settings(settings)?)),
        Provider::Claude => Ok(Box::new(claude::ClaudeAdapter::from_settings(settings)?)),
        Provider::OpenAi => Ok(Box::new(openai::OpenAiAdapter::from_settings(settings)?)),
    }
}
