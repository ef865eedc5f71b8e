//! Application setup and runtime.

use crate::transport::telegram::TelegramTransport;
use crate::transport::ChatTransport;
use crate::{db, http};
use sqlx::{SqlitePool, sqlite::SqlitePoolOptions};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

/// Shared application state. Handed to the webhook at construction time;
/// webhook invocations share nothing else — all cross-call state lives
/// in the database.
#[derive(Clone)]
pub struct AppState {
  pub db: SqlitePool,
  pub transport: Arc<dyn ChatTransport>,
  pub max_message_len: usize,
}

/// Start the webhook server with configured environment.
pub async fn run() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
  crate::util::init_tracing();

  let bot_token =
    std::env::var("MAILGRAM_BOT_TOKEN").map_err(|_| "MAILGRAM_BOT_TOKEN must be set")?;

  let db_url =
    std::env::var("MAILGRAM_DATABASE").unwrap_or_else(|_| "sqlite://mailgram.db".to_string());
  let db_url = db::ensure_sqlite_path(&db_url);
  let pool = SqlitePoolOptions::new()
    .max_connections(5)
    .connect(&db_url)
    .await?;
  db::run_migrations(&pool).await?;

  let max_message_len = std::env::var("MAILGRAM_MAX_MESSAGE_LEN")
    .ok()
    .and_then(|v| v.parse().ok())
    .unwrap_or(crate::chunk::MAX_MESSAGE_LEN);

  let state = AppState {
    db: pool.clone(),
    transport: Arc::new(TelegramTransport::new(&bot_token)),
    max_message_len,
  };

  let app = http::build_router(state);

  let addr: SocketAddr = std::env::var("MAILGRAM_ADDR")
    .unwrap_or_else(|_| "0.0.0.0:8000".to_string())
    .parse()?;

  info!("mailgram status:     http://{}/", addr);
  info!("email webhook:       POST http://{}/webhook/email", addr);

  let listener = tokio::net::TcpListener::bind(addr).await?;
  axum::serve(listener, app).await?;
  Ok(())
}
