//! HTTP server mode: accepts review requests over REST so CI jobs and
//! webhooks can trigger reviews without a local checkout.

use std::net::SocketAddr;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use serde::Deserialize;
use serde_json::json;
use tower_http::trace::TraceLayer;

use crate::config::loader::get_settings;
use crate::error::MrAgentError;
use crate::tools::MrReviewer;

pub async fn start_server() -> Result<(), MrAgentError> {
    let settings = get_settings();
    let addr: SocketAddr = format!("{}:{}", settings.server.host, settings.server.port)
        .parse()
        .map_err(|e| MrAgentError::Other(format!("invalid server address: {e}")))?;

    let app = Router::new()
        .route("/", get(health_check))
        .route("/review", post(handle_review))
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(1024 * 1024));

    tracing::info!(%addr, "starting review server");
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| MrAgentError::Other(format!("failed to bind to {addr}: {e}")))?;

    axum::serve(listener, app)
        .await
        .map_err(|e| MrAgentError::Other(format!("server error: {e}")))?;

    Ok(())
}

async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, axum::Json(json!({"status": "ok"})))
}

#[derive(Debug, Deserialize)]
struct ReviewRequest {
    mr_url: String,
    /// Webhook-style MR action. Only "opened" (or absent) triggers a
    /// review; update/merge/close events are acknowledged and skipped.
    action: Option<String>,
}

/// POST /review with `{"mr_url": "...", "action": "opened"}`. Runs the
/// review synchronously and reports the outcome; callers with long MRs
/// should use a generous client timeout.
async fn handle_review(axum::Json(req): axum::Json<ReviewRequest>) -> impl IntoResponse {
    tracing::info!(mr_url = %req.mr_url, action = req.action.as_deref(), "received review request");

    if let Some(action) = req.action.as_deref()
        && !matches!(action, "opened" | "open" | "reopen")
    {
        return (
            StatusCode::OK,
            axum::Json(json!({"status": "skipped", "reason": format!("action '{action}' is not reviewed")})),
        );
    }

    let result = async { MrReviewer::new(&req.mr_url)?.run().await }.await;
    match result {
        Ok(()) => (
            StatusCode::OK,
            axum::Json(json!({"status": "completed", "mr_url": req.mr_url})),
        ),
        Err(MrAgentError::InvalidMrUrl(msg)) => (
            StatusCode::BAD_REQUEST,
            axum::Json(json!({"status": "error", "error": msg})),
        ),
        Err(MrAgentError::RateLimited { retry_after_secs }) => (
            StatusCode::TOO_MANY_REQUESTS,
            axum::Json(json!({
                "status": "error",
                "error": "rate limited by upstream API",
                "retry_after_secs": retry_after_secs,
            })),
        ),
        Err(e) => {
            tracing::error!(mr_url = %req.mr_url, error = %e, "review failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                axum::Json(json!({"status": "error", "error": e.to_string()})),
            )
        }
    }
}
