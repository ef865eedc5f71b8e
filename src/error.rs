//! Pipeline error taxonomy.

use thiserror::Error;

/// Failures that end a webhook invocation early.
///
/// Internal failures are values here, not propagated panics; the webhook
/// handler is the single place that maps them onto an HTTP-200 error
/// payload. Transport and persistence-write failures never reach this
/// enum: they are logged where they happen and the pipeline continues.
#[derive(Debug, Error)]
pub enum PipelineError {
  /// Raw bytes were not parseable as MIME at all.
  #[error("message could not be parsed as MIME: {0}")]
  MalformedMessage(#[from] mailparse::MailParseError),

  /// No usable recipient address could be extracted.
  #[error("no recipient email found")]
  MissingRecipient,

  /// Recipient address is not registered. Expected outcome, not a fault.
  #[error("email address '{0}' not registered")]
  AliasNotFound(String),

  /// The alias lookup itself failed at the store level.
  #[error("alias lookup failed: {0}")]
  Lookup(#[from] sqlx::Error),
}
