use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use figment::Figment;
use figment::providers::{Format, Toml};

use crate::config::types::Settings;
use crate::error::MrAgentError;

// Embedded default TOML files, so the binary is self-contained.
static CONFIGURATION_TOML: &str = include_str!("../../settings/configuration.toml");
static REVIEW_PROMPTS_TOML: &str = include_str!("../../settings/review_prompts.toml");

/// Global settings, re-settable (e.g. in tests).
static GLOBAL_SETTINGS: RwLock<Option<Arc<Settings>>> = RwLock::new(None);

/// Get the current settings, loading defaults on first use.
pub fn get_settings() -> Arc<Settings> {
    {
        let guard = GLOBAL_SETTINGS.read().unwrap_or_else(|poisoned| {
            tracing::error!("settings RwLock poisoned, recovering inner value");
            poisoned.into_inner()
        });
        if let Some(settings) = guard.as_ref() {
            return settings.clone();
        }
    }

    let fallback = Arc::new(load_settings(&HashMap::new()).unwrap_or_else(|e| {
        tracing::error!(error = %e, "failed to load fallback settings, using Default");
        Settings::default()
    }));
    let mut write_guard = GLOBAL_SETTINGS
        .write()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    *write_guard = Some(fallback.clone());
    fallback
}

/// Initialize (or re-initialize) global settings.
pub fn init_settings(cli_overrides: &HashMap<String, String>) -> Result<Arc<Settings>, MrAgentError> {
    let settings = Arc::new(load_settings(cli_overrides)?);
    *GLOBAL_SETTINGS.write().unwrap_or_else(|poisoned| {
        tracing::error!("settings RwLock poisoned, recovering inner value");
        poisoned.into_inner()
    }) = Some(settings.clone());
    Ok(settings)
}

/// Build the full configuration by merging layers:
///
/// 1. Embedded TOML defaults (`settings/configuration.toml`, prompts)
/// 2. Secrets file from filesystem (`.secrets.toml`, optional)
/// 3. CLI argument overrides (`--section.key=value`)
/// 4. Environment variables (highest precedence for secrets)
pub fn load_settings(cli_overrides: &HashMap<String, String>) -> Result<Settings, MrAgentError> {
    // Layer 1: embedded defaults
    let mut figment = Figment::new()
        .merge(Toml::string(CONFIGURATION_TOML))
        .merge(Toml::string(REVIEW_PROMPTS_TOML));

    // Layer 2: secrets file (optional, from filesystem)
    figment = figment.merge(Toml::file(".secrets.toml"));
    figment = figment.merge(Toml::file("settings/.secrets.toml"));

    // Layer 3: CLI argument overrides (--review.max_files=5)
    for (key, value) in cli_overrides {
        // Figment doesn't have a direct "set key" method for arbitrary dotted keys,
        // so we build a TOML fragment: `[section]\nkey = value`
        if let Some(toml_fragment) = override_to_toml(key, value) {
            figment = figment.merge(Toml::string(&toml_fragment));
        }
    }

    // Layer 4a: well-known env var aliases
    for (env_name, dotted) in [
        ("GOOGLE_API_KEY", "google.key"),
        ("ANTHROPIC_API_KEY", "anthropic.key"),
        ("OPENAI_API_KEY", "openai.key"),
        ("GITLAB_TOKEN", "gitlab.personal_access_token"),
        ("AI_MODEL", "config.ai_provider"),
    ] {
        if let Ok(value) = std::env::var(env_name)
            && let Some(fragment) = override_to_toml(dotted, &value)
        {
            figment = figment.merge(Toml::string(&fragment));
        }
    }

    // Layer 4b: SECTION.KEY env vars, handled as TOML fragments because
    // figment's Env provider treats all values as strings and cannot
    // deserialize array syntax like ['item'] into Vec<T> fields.
    for (key, value) in std::env::vars() {
        if !key.contains('.') {
            continue;
        }
        let lower = key.to_lowercase();
        if let Some(fragment) = override_to_toml(&lower, value.trim()) {
            figment = figment.merge(Toml::string(&fragment));
        }
    }

    let settings: Settings = figment.extract()?;
    Ok(settings)
}

/// Convert a dotted override like "review.max_files=5" into a TOML fragment.
fn override_to_toml(key: &str, value: &str) -> Option<String> {
    let (section, field) = match key.split_once('.') {
        Some(pair) => pair,
        None => {
            tracing::warn!("ignoring override with no section: {key}={value}");
            return None;
        }
    };

    let is_array = value.starts_with('[') && value.ends_with(']');
    let toml_value = if is_array {
        // Normalize single quotes so ['a'] parses as a TOML string array.
        value.replace("\\'", "'").replace("\\\"", "\"").replace('\'', "\"")
    } else {
        let is_literal = value == "true"
            || value == "false"
            || value.parse::<i64>().is_ok()
            || value.parse::<f64>().is_ok();
        if is_literal {
            value.to_string()
        } else {
            let escaped = value
                .replace('\\', "\\\\")
                .replace('"', "\\\"")
                .replace('\n', "\\n")
                .replace('\r', "\\r")
                .replace('\t', "\\t");
            format!("\"{escaped}\"")
        }
    };
    Some(format!("[{section}]\n{field} = {toml_value}"))
}
