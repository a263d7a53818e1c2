use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use crate::ai::models::{ModelInfo, Pricing, Provider, UsageReport, resolve_model};
use crate::ai::{AiAdapter, AiResponse};
use crate::config::types::Settings;
use crate::error::MrAgentError;

const API_URL: &str = "https://api.anthropic.com/v1/messages";
const API_VERSION: &str = "2023-06-01";
const MAX_OUTPUT_TOKENS: u32 = 8192;

pub struct ClaudeAdapter {
    client: Client,
    api_key: String,
    model: &'static ModelInfo,
}

impl ClaudeAdapter {
    pub fn from_settings(settings: &Settings) -> Result<Self, MrAgentError> {
        let api_key = settings.anthropic.key.clone();
        if api_key.is_empty() {
            return Err(MrAgentError::AiAdapter(
                "no Anthropic API key configured (set ANTHROPIC_API_KEY)".into(),
            ));
        }
        let model = resolve_model(Provider::Claude, &settings.config.model)?;
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
impl AiAdapter for ClaudeAdapter {
    fn provider(&self) -> Provider {
        Provider::Claude
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
            "max_tokens": MAX_OUTPUT_TOKENS,
            "system": system,
            "messages": [
                { "role": "user", "content": user },
            ],
        });

        let resp = self
            .client
            .post(API_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
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
                "Anthropic API returned {status}: {body_text}"
            )));
        }

        let api_resp: ApiResponse = resp.json().await?;
        let text = api_resp
            .content
            .into_iter()
            .find_map(|block| block.text)
            .ok_or_else(|| MrAgentError::AiAdapter("no text content in Claude response".into()))?;

        // Claude reports input/output only, no total.
        let usage = api_resp
            .usage
            .map(|u| UsageReport::from_in_out(Provider::Claude, u.input_tokens, u.output_tokens));

        Ok(AiResponse { text, usage })
    }
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    content: Vec<ContentBlock>,
    usage: Option<ApiUsage>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    input_tokens: u64,
    output_tokens: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_api_response() {
        let json = r#"{
            "content": [{"type": "text", "text": "{\"issues\": []}"}],
            "usage": {"input_tokens": 900, "output_tokens": 120}
        }"#;
        let resp: ApiResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.content[0].text.as_deref(), Some("{\"issues\": []}"));

        let usage = resp.usage.unwrap();
        let report = UsageReport::from_in_out(Provider::Claude, usage.input_tokens, usage.output_tokens);
        assert_eq!(report.total_tokens, 1020);
    }
}
