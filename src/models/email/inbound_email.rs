//! Decoded inbound email, one per webhook call.

use super::attachment::Attachment;
use chrono::{DateTime, Utc};

/// Structured view of one raw MIME message. Request-scoped; never cached.
#[derive(Debug, Clone)]
pub struct InboundEmail {
  /// First parsed `From` address, or "Unknown".
  pub sender: String,
  /// First parsed `To` address, lowercased and trimmed. Absent when the
  /// message carries no usable recipient.
  pub recipient: Option<String>,
  /// `Subject` header, or "No Subject".
  pub subject: String,
  /// `Date` header carried verbatim, display only.
  pub date: Option<String>,
  pub body_html: Option<String>,
  pub body_plain: Option<String>,
  pub attachments: Vec<Attachment>,
  pub received_at: DateTime<Utc>,
}
