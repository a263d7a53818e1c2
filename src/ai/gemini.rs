use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use crate::ai::models::{ModelInfo, Pricing, Provider, UsageReport, resolve_model};
use crate::ai::{AiAdapter, AiResponse};
use crate::config::types::Settings;
use crate::error::MrAgentError;

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

pub struct GeminiAdapter {
    client: Client,
    api_key: String,
    model: &'static ModelInfo,
}

impl GeminiAdapter {
    pub fn from_settings(settings: &Settings) -> Result<Self, MrAgentError> {
        let api_key = settings.google.key.clone();
        if api_key.is_empty() {
            return Err(MrAgentError::AiAdapter(
                "no Google API key configured (set GOOGLE_API_KEY)".into(),
            ));
        }
        let model = resolve_model(Provider::Gemini, &settings.config.model)?;
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
impl AiAdapter for GeminiAdapter {
    fn provider(&self) -> Provider {
        Provider::Gemini
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
        let url = format!("{API_BASE}/{}:generateContent", self.model.name);
        let body = json!({
            "system_instruction": { "parts": [{ "text": system }] },
            "contents": [
                { "role": "user", "parts": [{ "text": user }] },
            ],
            "generationConfig": { "responseMimeType": "application/json" },
        });

        let resp = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            if status.as_u16() == 429 {
                return Err(MrAgentError::RateLimited { retry_after_secs: 60 });
            }
            let body_text = resp.text().await.unwrap_or_default();
            return Err(MrAgentError::AiAdapter(format!(
                "Gemini API returned {status}: {body_text}"
            )));
        }

        let api_resp: ApiResponse = resp.json().await?;
        let text = api_resp
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content.parts.into_iter().find_map(|p| p.text))
            .ok_or_else(|| MrAgentError::AiAdapter("no candidates in Gemini response".into()))?;

        let usage = api_resp.usage_metadata.map(|u| UsageReport {
            provider: Provider::Gemini,
            input_tokens: u.prompt_token_count,
            output_tokens: u.candidates_token_count,
            // Gemini's total includes thinking tokens, trust it.
            total_tokens: u.total_token_count,
        });

        Ok(AiResponse { text, usage })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Content,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: u64,
    #[serde(default)]
    candidates_token_count: u64,
    #[serde(default)]
    total_token_count: u64,
}
