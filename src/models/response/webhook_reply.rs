//! JSON body returned to the upstream email relay.

use serde::Serialize;

/// Always delivered with HTTP 200; `status` carries the real outcome.
/// The relay treats any non-200 as "retry forever", so failures must be
/// expressed in the payload, never the status line.
#[derive(Debug, Serialize)]
pub struct WebhookReply {
  pub status: &'static str,
  pub message: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub email_info: Option<EmailInfo>,
}

impl WebhookReply {
  pub fn success(message: impl Into<String>, info: EmailInfo) -> Self {
    WebhookReply {
      status: "success",
      message: message.into(),
      email_info: Some(info),
    }
  }

  pub fn error(message: impl Into<String>) -> Self {
    WebhookReply {
      status: "error",
      message: message.into(),
      email_info: None,
    }
  }
}

/// Summary of a delivered email, echoed back on success.
#[derive(Debug, Serialize)]
pub struct EmailInfo {
  pub from: String,
  pub to: String,
  pub subject: String,
  pub delivered_to: i64,
}
