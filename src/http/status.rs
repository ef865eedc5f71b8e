//! Service status endpoint.

use axum::{Json, response::IntoResponse};
use chrono::Utc;
use serde_json::json;

/// Identity blurb for humans and uptime checks.
pub async fn service_status() -> impl IntoResponse {
  Json(json!({
    "status": "mailgram service running",
    "services": ["email webhook", "telegram delivery"],
    "timestamp": Utc::now().to_rfc3339(),
  }))
}
