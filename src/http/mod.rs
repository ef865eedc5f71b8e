//! HTTP router and handlers.

use crate::app::AppState;
use axum::{
  Router,
  routing::{get, post},
};

pub mod status;
pub mod webhook;

/// Assemble the HTTP router with all routes.
pub fn build_router(state: AppState) -> Router {
  Router::new()
    .route("/", get(status::service_status))
    .route("/webhook/email", post(webhook::receive_email))
    .with_state(state)
}
