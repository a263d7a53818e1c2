use thiserror::Error;

#[derive(Error, Debug)]
pub enum MrAgentError {
    #[error("Configuration error: {0}")]
    Config(Box<figment::Error>),

    #[error("GitLab API error: {0}")]
    Gitlab(String),

    #[error("AI adapter error: {0}")]
    AiAdapter(String),

    #[error("Invalid merge request URL: {0}")]
    InvalidMrUrl(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Template rendering error: {0}")]
    Template(#[from] minijinja::Error),

    #[error("Rate limited, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("{0}")]
    Other(String),
}

impl From<figment::Error> for MrAgentError {
    fn from(err: figment::Error) -> Self {
        MrAgentError::Config(Box::new(err))
    }
}

impl MrAgentError {
    #[allow(dead_code)]
    pub fn is_retryable(&self) -> bool {
        match self {
            MrAgentError::Http(e) => {
                e.is_timeout() || e.is_connect() || e.status().is_none_or(|s| s.is_server_error())
            }
            MrAgentError::AiAdapter(_) | MrAgentError::RateLimited { .. } => true,
            _ => false,
        }
    }
}
