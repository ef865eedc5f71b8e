//! Ordered dispatch of message parts and attachments.

use crate::models::email::attachment::Attachment;
use crate::models::message::message_part::MessagePart;
use crate::transport::{ChatTransport, MarkupMode};
use tracing::{debug, error, info};

/// Hard cap on attachments attempted per email.
pub const MAX_ATTACHMENTS: usize = 10;

/// What actually went out, for the webhook's log line.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryReport {
  pub parts_sent: usize,
  pub parts_failed: usize,
  pub attachments_sent: usize,
  pub attachments_failed: usize,
  pub attachments_skipped: usize,
}

/// Send parts in order (header first), then the first ten attachments.
///
/// Failures are logged and never abort the remaining sends: best-effort
/// delivery must not bubble back into the webhook response. Ordering
/// within the invocation is enforced by sequential awaiting; the
/// transport gives no ordering guarantee across separate calls.
pub async fn deliver(
  transport: &dyn ChatTransport,
  chat_id: i64,
  parts: &[MessagePart],
  attachments: &[Attachment],
) -> DeliveryReport {
  let mut report = DeliveryReport::default();

  for part in parts {
    match transport
      .send_text(chat_id, &part.content, MarkupMode::Html)
      .await
    {
      Ok(()) => report.parts_sent += 1,
      Err(e) => {
        report.parts_failed += 1;
        error!("failed to send part {} to chat {chat_id}: {e}", part.index);
      }
    }
  }

  if attachments.len() > MAX_ATTACHMENTS {
    debug!(
      "skipping {} attachments over the cap of {MAX_ATTACHMENTS}",
      attachments.len() - MAX_ATTACHMENTS
    );
  }
  for att in attachments.iter().take(MAX_ATTACHMENTS) {
    // Empty payloads are skipped, not errors.
    if att.payload.is_empty() {
      report.attachments_skipped += 1;
      continue;
    }
    let caption = format!("📎 {}", att.filename);
    let result = if att.is_image() {
      transport.send_image(chat_id, &att.payload, &caption).await
    } else {
      transport
        .send_file(chat_id, &att.payload, &att.filename, &caption)
        .await
    };
    match result {
      Ok(()) => {
        report.attachments_sent += 1;
        info!(
          "sent attachment {} ({} bytes) to chat {chat_id}",
          att.filename,
          att.size()
        );
      }
      Err(e) => {
        report.attachments_failed += 1;
        error!(
          "failed to send attachment {} to chat {chat_id}: {e}",
          att.filename
        );
      }
    }
  }
  report
}
