use serde::{Deserialize, Serialize};

/// Redact a secret string for Debug output. Shows "[REDACTED]" if non-empty, "[]" if empty.
fn redact(s: &str) -> &str {
    if s.is_empty() { "[]" } else { "[REDACTED]" }
}

/// Top-level configuration. Each field maps to a TOML `[section]`.
/// Uses `#[serde(default)]` so missing sections gracefully fall back.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct Settings {
    pub config: GlobalConfig,
    pub review: ReviewConfig,
    pub review_prompt: ReviewPromptConfig,
    pub gitlab: GitlabConfig,
    pub server: ServerConfig,
    pub google: GoogleSecrets,
    pub anthropic: AnthropicSecrets,
    pub openai: OpenAiSecrets,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GlobalConfig {
    /// Which model adapter to use: "gemini", "claude", or "openai".
    pub ai_provider: String,
    /// Override the adapter's default model name. Empty = adapter default.
    pub model: String,
    /// Seconds to wait for one model call.
    pub ai_timeout: u64,
    /// Post results back to GitLab. Off = log to stdout only (dry run).
    pub publish_output: bool,
    /// tracing filter directive, e.g. "info" or "gitlab_mr_agent=debug".
    pub log_level: String,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            ai_provider: "gemini".into(),
            model: String::new(),
            ai_timeout: 120,
            publish_output: true,
            log_level: "info".into(),
        }
    }
}

/// Review scope and suggestion-safety limits.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ReviewConfig {
    /// Most-changed files reviewed per MR.
    pub max_files: u32,
    /// Per-file diff text sent to the model is clipped to this many bytes.
    pub max_diff_length: usize,
    /// Hard cap on lines a code suggestion may replace.
    pub max_suggestion_lines: u32,
    /// Log a warning above this many replaced lines.
    pub warn_suggestion_lines: u32,
    /// Replacing at least this many original lines counts toward the
    /// function-rewrite heuristic.
    pub rewrite_original_lines: u32,
    /// Replacement body length that completes the rewrite heuristic.
    pub rewrite_replacement_lines: u32,
    /// Substring patterns for files excluded from review.
    pub excluded_patterns: Vec<String>,
    /// Max issues posted per severity; critical is never limited.
    pub max_high_issues: u32,
    pub max_medium_issues: u32,
    pub max_low_issues: u32,
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            max_files: 10,
            max_diff_length: 3000,
            max_suggestion_lines: 10,
            warn_suggestion_lines: 7,
            rewrite_original_lines: 15,
            rewrite_replacement_lines: 10,
            excluded_patterns: vec![
                "package-lock.json".into(),
                "yarn.lock".into(),
                "Gemfile.lock".into(),
                "composer.lock".into(),
                "Pipfile.lock".into(),
                "poetry.lock".into(),
                ".min.js".into(),
                ".min.css".into(),
                "dist/".into(),
                "build/".into(),
                "node_modules/".into(),
                "vendor/".into(),
                ".svg".into(),
                ".png".into(),
                ".jpg".into(),
                ".jpeg".into(),
                ".gif".into(),
                ".ico".into(),
                ".woff".into(),
                ".woff2".into(),
                ".ttf".into(),
                ".eot".into(),
            ],
            max_high_issues: 3,
            max_medium_issues: 3,
            max_low_issues: 3,
        }
    }
}

impl ReviewConfig {
    /// Whether a file path matches any exclusion pattern.
    pub fn is_excluded(&self, path: &str) -> bool {
        self.excluded_patterns.iter().any(|p| path.contains(p))
    }
}

/// Prompt templates, loaded from `settings/review_prompts.toml`.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ReviewPromptConfig {
    pub system: String,
    pub user: String,
}

/// The instance to talk to is derived from the MR URL itself, so the
/// only GitLab setting is the token.
#[derive(Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GitlabConfig {
    pub personal_access_token: String,
}

impl std::fmt::Debug for GitlabConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitlabConfig")
            .field(
                "personal_access_token",
                &redact(&self.personal_access_token),
            )
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 8080,
        }
    }
}

#[derive(Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GoogleSecrets {
    pub key: String,
}

impl std::fmt::Debug for GoogleSecrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleSecrets")
            .field("key", &redact(&self.key))
            .finish()
    }
}

#[derive(Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AnthropicSecrets {
    pub key: String,
}

impl std::fmt::Debug for AnthropicSecrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnthropicSecrets")
            .field("key", &redact(&self.key))
            .finish()
    }
}

#[derive(Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct OpenAiSecrets {
    pub key: String,
}

impl std::fmt::Debug for OpenAiSecrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiSecrets")
            .field("key", &redact(&self.key))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_review_defaults() {
        let review = ReviewConfig::default();
        assert_eq!(review.max_files, 10);
        assert_eq!(review.max_suggestion_lines, 10);
        assert_eq!(review.warn_suggestion_lines, 7);
        assert_eq!(review.rewrite_original_lines, 15);
        assert_eq!(review.rewrite_replacement_lines, 10);
    }

    #[test]
    fn test_excluded_patterns() {
        let review = ReviewConfig::default();
        assert!(review.is_excluded("package-lock.json"));
        assert!(review.is_excluded("frontend/dist/bundle.min.js"));
        assert!(review.is_excluded("assets/logo.svg"));
        assert!(!review.is_excluded("src/main.rs"));
    }

    #[test]
    fn test_secrets_redacted_in_debug() {
        let gitlab = GitlabConfig {
            personal_access_token: "glpat-supersecret".into(),
        };
        let debug = format!("{gitlab:?}");
        assert!(!debug.contains("supersecret"));
        assert!(debug.contains("[REDACTED]"));

        let empty = GoogleSecrets::default();
        assert!(format!("{empty:?}").contains("[]"));
    }
}
