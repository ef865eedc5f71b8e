//! Telegram Bot API transport.

use super::{ChatTransport, MarkupMode, TransportError};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde_json::json;

/// Bot API client. One instance per process; reqwest pools connections
/// internally.
pub struct TelegramTransport {
  http: reqwest::Client,
  base: String,
}

impl TelegramTransport {
  pub fn new(bot_token: &str) -> Self {
    Self::with_base("https://api.telegram.org", bot_token)
  }

  /// Point the client at a different API host (test doubles, local relays).
  pub fn with_base(api_base: &str, bot_token: &str) -> Self {
    TelegramTransport {
      http: reqwest::Client::new(),
      base: format!("{}/bot{}", api_base.trim_end_matches('/'), bot_token),
    }
  }

  fn url(&self, method: &str) -> String {
    format!("{}/{method}", self.base)
  }

  /// Unwrap the Bot API envelope. Failures arrive both as HTTP errors and
  /// as 200s carrying `ok: false`.
  async fn check(resp: reqwest::Response) -> Result<(), TransportError> {
    let value: serde_json::Value = resp.json().await?;
    if value.get("ok").and_then(|v| v.as_bool()).unwrap_or(false) {
      return Ok(());
    }
    let description = value
      .get("description")
      .and_then(|v| v.as_str())
      .unwrap_or("unknown error")
      .to_string();
    Err(TransportError::Api(description))
  }
}

#[async_trait]
impl ChatTransport for TelegramTransport {
  async fn send_text(
    &self,
    chat_id: i64,
    content: &str,
    markup: MarkupMode,
  ) -> Result<(), TransportError> {
    let mut payload = json!({ "chat_id": chat_id, "text": content });
    if markup == MarkupMode::Html {
      payload["parse_mode"] = json!("HTML");
    }
    let resp = self
      .http
      .post(self.url("sendMessage"))
      .json(&payload)
      .send()
      .await?;
    Self::check(resp).await
  }

  async fn send_image(
    &self,
    chat_id: i64,
    bytes: &[u8],
    caption: &str,
  ) -> Result<(), TransportError> {
    let form = Form::new()
      .text("chat_id", chat_id.to_string())
      .text("caption", caption.to_string())
      .part("photo", Part::bytes(bytes.to_vec()).file_name("image"));
    let resp = self
      .http
      .post(self.url("sendPhoto"))
      .multipart(form)
      .send()
      .await?;
    Self::check(resp).await
  }

  async fn send_file(
    &self,
    chat_id: i64,
    bytes: &[u8],
    filename: &str,
    caption: &str,
  ) -> Result<(), TransportError> {
    let form = Form::new()
      .text("chat_id", chat_id.to_string())
      .text("caption", caption.to_string())
      .part(
        "document",
        Part::bytes(bytes.to_vec()).file_name(filename.to_string()),
      );
    let resp = self
      .http
      .post(self.url("sendDocument"))
      .multipart(form)
      .send()
      .await?;
    Self::check(resp).await
  }
}
