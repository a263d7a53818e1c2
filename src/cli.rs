use std::collections::HashMap;

use clap::{Parser, Subcommand};

use crate::config::loader::init_settings;
use crate::error::MrAgentError;
use crate::tools::MrReviewer;

/// AI-powered merge request review for GitLab.
#[derive(Parser, Debug)]
#[command(name = "mr-agent", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Extra arguments passed as config overrides (--section.key=value).
    /// Place after `--`: `mr-agent review --mr-url=<url> -- --config.model=gemini-2.5-pro`
    #[arg(last = true, allow_hyphen_values = true, global = true)]
    pub rest: Vec<String>,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Review a merge request and publish the results.
    Review {
        /// The URL of the merge request to review.
        #[arg(long)]
        mr_url: String,
    },
    /// Start the review server.
    Serve,
}

/// Config keys that cannot be overridden via CLI args.
///
/// These are security-sensitive; overriding them could redirect secrets
/// or replace the prompts wholesale.
pub const FORBIDDEN_OVERRIDE_KEYS: &[&str] = &[
    "personal_access_token",
    "key",
    "system",
    "user",
];

/// Check if a config key is forbidden for override.
pub fn check_forbidden_key(key: &str) -> Option<&'static str> {
    let key_lower = key.to_lowercase();
    let segments: Vec<&str> = key_lower.split('.').collect();
    FORBIDDEN_OVERRIDE_KEYS
        .iter()
        .find(|&&forbidden| key_lower == forbidden || segments.contains(&forbidden))
        .copied()
}

/// Parse the `rest` args into config overrides.
/// Format: `--section.key=value` or `--section__key=value`.
fn parse_config_overrides(rest: &[String]) -> Result<HashMap<String, String>, MrAgentError> {
    let mut overrides = HashMap::new();

    for arg in rest {
        let stripped = arg.trim_start_matches('-');
        if stripped.is_empty() {
            continue;
        }
        let stripped = stripped.replace("__", ".");

        if let Some((key, value)) = stripped.split_once('=') {
            if let Some(forbidden) = check_forbidden_key(key) {
                return Err(MrAgentError::Other(format!(
                    "forbidden CLI override: '{key}' (matches '{forbidden}')"
                )));
            }
            overrides.insert(key.to_string(), value.to_string());
        }
    }

    Ok(overrides)
}

pub async fn run() -> Result<(), MrAgentError> {
    let cli = Cli::parse();
    let config_overrides = parse_config_overrides(&cli.rest)?;
    let settings = init_settings(&config_overrides)?;

    init_tracing(&settings.config.log_level);
    tracing::info!(
        provider = %settings.config.ai_provider,
        overrides = config_overrides.len(),
        "starting mr-agent"
    );

    match cli.command {
        Command::Review { mr_url } => {
            MrReviewer::new(&mr_url)?.run().await?;
        }
        Command::Serve => {
            crate::server::start_server().await?;
        }
    }

    Ok(())
}

/// RUST_LOG wins when set; otherwise the configured log level applies.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level.to_string()));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config_overrides() {
        let args = vec![
            "--review.max_files=5".into(),
            "--config.publish_output=false".into(),
            "--config__ai_provider=claude".into(),
        ];
        let overrides = parse_config_overrides(&args).unwrap();
        assert_eq!(overrides.get("review.max_files").unwrap(), "5");
        assert_eq!(overrides.get("config.publish_output").unwrap(), "false");
        assert_eq!(overrides.get("config.ai_provider").unwrap(), "claude");
    }

    #[test]
    fn test_forbidden_overrides() {
        let args = vec!["--gitlab.personal_access_token=glpat-x".into()];
        let result = parse_config_overrides(&args);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("forbidden"));

        let args = vec!["--google.key=secret".into()];
        assert!(parse_config_overrides(&args).is_err());
    }

    #[test]
    fn test_non_config_args_ignored() {
        let args = vec!["--verbose".into(), "".into()];
        let overrides = parse_config_overrides(&args).unwrap();
        assert!(overrides.is_empty());
    }
}
