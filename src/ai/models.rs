//! Central registry of supported models, display names, and pricing.

use serde::{Deserialize, Serialize};

use crate::error::MrAgentError;

/// Model provider family. Every adapter tags its usage metadata with
/// one of these so the metrics layer consumes a single uniform shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Gemini,
    Claude,
    OpenAi,
}

impl Provider {
    /// Normalize a provider identifier, accepting common aliases.
    pub fn parse(name: &str) -> Result<Self, MrAgentError> {
        match name.to_lowercase().as_str() {
            "gemini" | "google" => Ok(Provider::Gemini),
            "claude" | "anthropic" => Ok(Provider::Claude),
            "openai" => Ok(Provider::OpenAi),
            other => Err(MrAgentError::AiAdapter(format!(
                "unsupported AI provider: {other} (expected gemini, claude, or openai)"
            ))),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Provider::Gemini => "gemini",
            Provider::Claude => "claude",
            Provider::OpenAi => "openai",
        }
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// USD per million tokens.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pricing {
    pub input_per_million: f64,
    pub output_per_million: f64,
}

/// Metadata for one registry model.
#[derive(Debug, Clone, Copy)]
pub struct ModelInfo {
    pub provider: Provider,
    pub name: &'static str,
    pub display_name: &'static str,
    pub pricing: Pricing,
    pub aliases: &'static [&'static str],
    pub is_default: bool,
}

/// Token counts for one model call, tagged with the provider that
/// produced them. Adapters construct this at their API boundary so no
/// downstream code needs to know provider-specific usage shapes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct UsageReport {
    pub provider: Provider,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub total_tokens: u64,
}

impl UsageReport {
    /// Claude reports no total; compute it at the boundary.
    pub fn from_in_out(provider: Provider, input_tokens: u64, output_tokens: u64) -> Self {
        Self {
            provider,
            input_tokens,
            output_tokens,
            total_tokens: input_tokens + output_tokens,
        }
    }
}

// Pricing references gathered from each provider's public pricing pages (2025-09).
static REGISTRY: &[ModelInfo] = &[
    ModelInfo {
        provider: Provider::Gemini,
        name: "gemini-2.5-flash",
        display_name: "Gemini 2.5 Flash",
        pricing: Pricing {
            input_per_million: 0.3,
            output_per_million: 2.5,
        },
        aliases: &["gemini-2-5-flash", "gemini-flash", "flash-2.5"],
        is_default: true,
    },
    ModelInfo {
        provider: Provider::Gemini,
        name: "gemini-2.5-pro",
        display_name: "Gemini 2.5 Pro",
        pricing: Pricing {
            input_per_million: 1.25,
            output_per_million: 10.0,
        },
        aliases: &["gemini-2-5-pro", "gemini-pro", "pro-2.5"],
        is_default: false,
    },
    ModelInfo {
        provider: Provider::Claude,
        name: "claude-sonnet-4-5-20250929",
        display_name: "Claude 4.5 Sonnet",
        pricing: Pricing {
            input_per_million: 3.0,
            output_per_million: 15.0,
        },
        aliases: &["claude-sonnet-4.5", "claude-sonnet-4-5", "sonnet-4.5", "sonnet-4-5"],
        is_default: true,
    },
    ModelInfo {
        provider: Provider::Claude,
        name: "claude-sonnet-4-20250514",
        display_name: "Claude Sonnet 4",
        pricing: Pricing {
            input_per_million: 3.0,
            output_per_million: 15.0,
        },
        aliases: &["claude-sonnet-4", "sonnet-4"],
        is_default: false,
    },
    ModelInfo {
        provider: Provider::OpenAi,
        name: "gpt-5-2025-08-07",
        display_name: "GPT-5 (Aug 2025)",
        pricing: Pricing {
            input_per_million: 1.25,
            output_per_million: 10.0,
        },
        aliases: &["gpt-5", "gpt5"],
        is_default: true,
    },
    ModelInfo {
        provider: Provider::OpenAi,
        name: "gpt-5-mini-2025-08-07",
        display_name: "GPT-5 Mini (Aug 2025)",
        pricing: Pricing {
            input_per_million: 0.25,
            output_per_million: 2.0,
        },
        aliases: &["gpt-5-mini", "gpt5-mini", "gpt-5m", "gpt5m"],
        is_default: false,
    },
];

/// All models registered for one provider.
pub fn models_for_provider(provider: Provider) -> impl Iterator<Item = &'static ModelInfo> {
    REGISTRY.iter().filter(move |m| m.provider == provider)
}

/// Resolve a requested model name (or empty string for the provider
/// default) to registry metadata. Aliases match loosely in both
/// directions so "sonnet-4.5" and "claude-sonnet-4-5-latest" both work.
pub fn resolve_model(
    provider: Provider,
    requested: &str,
) -> Result<&'static ModelInfo, MrAgentError> {
    if requested.is_empty() {
        return models_for_provider(provider)
            .find(|m| m.is_default)
            .or_else(|| models_for_provider(provider).next())
            .ok_or_else(|| {
                MrAgentError::AiAdapter(format!("no models registered for provider {provider}"))
            });
    }

    let requested_lower = requested.to_lowercase();
    for model in models_for_provider(provider) {
        if model.name.eq_ignore_ascii_case(&requested_lower) {
            return Ok(model);
        }
    }
    for model in models_for_provider(provider) {
        for alias in model.aliases {
            if *alias == requested_lower
                || alias.contains(&requested_lower)
                || requested_lower.contains(alias)
            {
                return Ok(model);
            }
        }
    }
    Err(MrAgentError::AiAdapter(format!(
        "unknown model '{requested}' for provider '{provider}'"
    )))
}
