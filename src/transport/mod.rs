//! Chat transport interface.
//!
//! The webhook pipeline holds a `dyn ChatTransport` handed to it at
//! construction time; nothing in the core talks to a chat platform
//! directly. Rate limiting and retries live behind this trait.

use async_trait::async_trait;
use thiserror::Error;

pub mod telegram;

/// A single transport call failed. Callers decide whether this aborts
/// sibling sends.
#[derive(Debug, Error)]
pub enum TransportError {
  /// The HTTP request itself failed.
  #[error("transport request failed: {0}")]
  Http(#[from] reqwest::Error),

  /// The platform answered but rejected the call.
  #[error("chat api rejected the call: {0}")]
  Api(String),
}

/// Markup handling for text sends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkupMode {
  /// Content uses the platform's HTML subset.
  Html,
  /// Content is sent verbatim, no markup interpretation.
  Plain,
}

/// One-way message channel to a chat destination.
#[async_trait]
pub trait ChatTransport: Send + Sync {
  async fn send_text(
    &self,
    chat_id: i64,
    content: &str,
    markup: MarkupMode,
  ) -> Result<(), TransportError>;

  async fn send_image(&self, chat_id: i64, bytes: &[u8], caption: &str)
    -> Result<(), TransportError>;

  async fn send_file(
    &self,
    chat_id: i64,
    bytes: &[u8],
    filename: &str,
    caption: &str,
  ) -> Result<(), TransportError>;
}
