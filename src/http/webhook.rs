//! Inbound email webhook: decode, resolve, persist, relay.

use crate::{
  app::AppState,
  chunk, db, deliver,
  error::PipelineError,
  mail,
  models::message::rendered_message::RenderedMessage,
  models::response::webhook_reply::{EmailInfo, WebhookReply},
  render,
};
use axum::{Json, body::Bytes, extract::State, response::IntoResponse};
use tracing::{debug, error, info, warn};

/// Receive one raw MIME message from the upstream relay.
///
/// The single place internal failures become a response: always HTTP
/// 200 with the real outcome in the JSON payload, because the relay
/// retries any other status forever.
pub async fn receive_email(State(state): State<AppState>, body: Bytes) -> impl IntoResponse {
  let reply = match process(&state, &body).await {
    Ok(info) => WebhookReply::success("Email received and delivered", info),
    Err(e) => {
      match &e {
        PipelineError::AliasNotFound(addr) => {
          warn!("email address '{addr}' not found in database");
        }
        other => error!("email processing failed: {other}"),
      }
      WebhookReply::error(e.to_string())
    }
  };
  Json(reply)
}

/// Linear pipeline with early exits. Persistence and transport failures
/// past the alias lookup are logged and survived; see the error module.
async fn process(state: &AppState, raw: &[u8]) -> Result<EmailInfo, PipelineError> {
  let email = mail::decode(raw)?;
  let recipient = email
    .recipient
    .clone()
    .ok_or(PipelineError::MissingRecipient)?;
  info!("inbound email from {} to {recipient}", email.sender);

  let owner = db::find_alias(&state.db, &recipient)
    .await?
    .ok_or_else(|| PipelineError::AliasNotFound(recipient.clone()))?;

  let normalized = render::normalize_body(email.body_html.as_deref(), email.body_plain.as_deref());
  debug!(
    "plain body preview: {}",
    normalized.plain.chars().take(120).collect::<String>()
  );
  let message = RenderedMessage {
    header_block: render::render_header(&email),
    body_content: normalized.rendered,
  };
  debug!("rendered message totals {} chars pre-split", message.total_len());

  // Archival write. Delivery still goes ahead when this fails: the user
  // seeing their mail wins over completeness of the log, and the error
  // line is the reconciliation trail.
  match db::append_log(
    &state.db,
    owner.user_id,
    &email.sender,
    &recipient,
    &email.subject,
    &message.body_content,
  )
  .await
  {
    Ok(id) => info!("email logged to database (id {id})"),
    Err(e) => error!(
      "failed to persist delivery record for {recipient} (from {}): {e}",
      email.sender
    ),
  }

  let parts = chunk::chunk_message(
    &message.header_block,
    &message.body_content,
    state.max_message_len,
  );
  let report = deliver::deliver(
    state.transport.as_ref(),
    owner.chat_id,
    &parts,
    &email.attachments,
  )
  .await;
  info!(
    "delivered to chat {}: {} part(s) sent, {} failed; {} attachment(s) sent, {} failed, {} skipped",
    owner.chat_id,
    report.parts_sent,
    report.parts_failed,
    report.attachments_sent,
    report.attachments_failed,
    report.attachments_skipped
  );

  Ok(EmailInfo {
    from: email.sender,
    to: recipient,
    subject: email.subject,
    delivered_to: owner.chat_id,
  })
}
