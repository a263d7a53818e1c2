use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use crate::ai::models::{ModelInfo, Pricing, Provider, UsageReport, resolve_model};
use crate::ai::{AiAdapter, AiResponse};
use crate::config::types::Settings;
use crate::error::MrAgentError;

const API_URL: &str = "https://api.openai.com/v1/chat/completions";

pub struct OpenAiAdapter {
    client: Client,
    api_key: String,
    model: &'static ModelInfo,
}

impl OpenAiAdapter {
    pub fn from_settings(settings: &Settings) -> Result<Self, MrAgentError> {
        let api_key = settings.openai.key.clone();
        if api_key.is_empty() {
            return Err(MrAgentError::AiAdapter(
                "no OpenAI API key configured (set OPENAI_API_KEY)".into(),
            ));
        }
        let model = resolve_model(Provider::OpenAi, &settings.config.model)?;
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(settings.config.ai_timeout))
            .build()
            .map_err(|e| MrAgentError::Other(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            api_key,
            model,
        })
    }
}

#[async_trait]
impl AiAdapter for OpenAiAdapter {
    fn provider(&self) -> Provider {
        Provider::OpenAi
    }

    fn model_name(&self) -> &str {
        self.model.name
    }

    fn display_name(&self) -> &str {
        self.model.display_name
    }

    fn pricing(&self) -> Pricing {
        self.model.pricing
    }

    async fn complete(&self, system: &str, user: &str) -> Result<AiResponse, MrAgentError> {
        let body = json!({
            "model": self.model.name,
            "messages": [
                { "role": "system", "content": system },
                { "role": "user", "content": user },
            ],
            "response_format": { "type": "json_object" },
        });

        let resp = self
            .client
            .post(API_URL)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            if status.as_u16() == 429 {
                let retry_after = resp
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(60);
                return Err(MrAgentError::RateLimited {
                    retry_after_secs: retry_after,
                });
            }
            let body_text = resp.text().await.unwrap_or_default();
            return Err(MrAgentError::AiAdapter(format!(
                "OpenAI API returned {status}: {body_text}"
            )));
        }

        let api_resp: ApiResponse = resp.json().await?;
        let text = api_resp
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| MrAgentError::AiAdapter("no choices in OpenAI response".into()))?;

        let usage = api_resp.usage.map(|u| UsageReport {
            provider: Provider::OpenAi,
            input_tokens: u.prompt_tokens,
            output_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        });

        Ok(AiResponse { text, usage })
    }
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    choices: Vec<ApiChoice>,
    usage: Option<ApiUsage>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: ApiMessage,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    prompt_tokens: u64,
    completion_tokens: u64,
    total_tokens: u64,
}
