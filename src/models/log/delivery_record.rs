//! Persisted record of one routed inbound email.

use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Row in `email_logs`. Created once per successfully resolved email,
/// never mutated or deleted by this service.
#[derive(Debug, FromRow)]
pub struct DeliveryRecord {
  pub id: i64,
  pub user_id: i64,
  pub sender: String,
  pub receiver: String,
  pub subject: Option<String>,
  pub body: Option<String>,
  pub timestamp: DateTime<Utc>,
}
