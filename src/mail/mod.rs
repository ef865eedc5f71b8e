//! MIME decoding of raw inbound email.
//!
//! Pure transform from webhook bytes to an [`InboundEmail`]. Only a
//! message that fails to parse as MIME at all is an error; malformed
//! individual parts are dropped with a warning.

use crate::models::email::{attachment::Attachment, inbound_email::InboundEmail};
use chrono::Utc;
use mailparse::{
  DispositionType, MailAddr, MailHeaderMap, MailParseError, ParsedMail, addrparse, parse_mail,
};
use tracing::warn;

pub const DEFAULT_SENDER: &str = "Unknown";
pub const DEFAULT_SUBJECT: &str = "No Subject";
pub const DEFAULT_FILENAME: &str = "unnamed";
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Decode raw webhook bytes into a structured email.
pub fn decode(raw: &[u8]) -> Result<InboundEmail, MailParseError> {
  let parsed = parse_mail(raw)?;

  let sender = first_address(&parsed, "From").unwrap_or_else(|| DEFAULT_SENDER.to_string());
  // Single-recipient delivery: when several To entries are present only
  // the first is routed. An alias maps to exactly one identity.
  let recipient = first_address(&parsed, "To").map(|a| a.trim().to_lowercase());
  let subject = parsed
    .headers
    .get_first_value("Subject")
    .filter(|s| !s.trim().is_empty())
    .unwrap_or_else(|| DEFAULT_SUBJECT.to_string());
  let date = parsed.headers.get_first_value("Date");

  let (body_plain, body_html) = extract_bodies(&parsed);
  let mut attachments = Vec::new();
  collect_attachments(&parsed, &mut attachments);

  Ok(InboundEmail {
    sender,
    recipient,
    subject,
    date,
    body_html,
    body_plain,
    attachments,
    received_at: Utc::now(),
  })
}

/// First address in an address-list header, if any.
fn first_address(parsed: &ParsedMail<'_>, header: &str) -> Option<String> {
  let raw = parsed.headers.get_first_value(header)?;
  if let Ok(list) = addrparse(&raw) {
    for addr in list.iter() {
      match addr {
        MailAddr::Single(s) => return Some(s.addr.clone()),
        MailAddr::Group(g) => {
          if let Some(s) = g.addrs.first() {
            return Some(s.addr.clone());
          }
        }
      }
    }
  }
  // Some relays emit headers addrparse rejects; fall back to a comma split.
  raw
    .split(',')
    .map(str::trim)
    .find(|s| !s.is_empty())
    .map(str::to_string)
}

/// First plain and HTML bodies in the MIME tree, depth-first, skipping
/// parts marked as attachments.
fn extract_bodies(part: &ParsedMail<'_>) -> (Option<String>, Option<String>) {
  if part.subparts.is_empty() {
    if part.get_content_disposition().disposition == DispositionType::Attachment {
      return (None, None);
    }
    return match part.ctype.mimetype.as_str() {
      "text/html" => match part.get_body() {
        Ok(body) => (None, Some(body)),
        Err(e) => {
          warn!("undecodable text/html part: {e}");
          (None, None)
        }
      },
      t if t.starts_with("text/") => match part.get_body() {
        Ok(body) => (Some(body), None),
        Err(e) => {
          warn!("undecodable {t} part: {e}");
          (None, None)
        }
      },
      _ => (None, None),
    };
  }

  let mut plain = None;
  let mut html = None;
  for sub in &part.subparts {
    let (p, h) = extract_bodies(sub);
    if plain.is_none() {
      plain = p;
    }
    if html.is_none() {
      html = h;
    }
    if plain.is_some() && html.is_some() {
      break;
    }
  }
  (plain, html)
}

/// Collect attachment parts in MIME order. A part that cannot be decoded
/// is dropped; the rest of the message still goes through.
fn collect_attachments(part: &ParsedMail<'_>, out: &mut Vec<Attachment>) {
  if !part.subparts.is_empty() {
    for sub in &part.subparts {
      collect_attachments(sub, out);
    }
    return;
  }

  let disposition = part.get_content_disposition();
  let filename = disposition
    .params
    .get("filename")
    .cloned()
    .or_else(|| part.ctype.params.get("name").cloned())
    .filter(|f| !f.trim().is_empty());

  let mimetype = part.ctype.mimetype.as_str();
  let is_body_text = matches!(mimetype, "text/plain" | "text/html");
  let looks_attachment = disposition.disposition == DispositionType::Attachment
    || filename.is_some()
    || !is_body_text;
  if !looks_attachment {
    return;
  }

  let payload = match part.get_body_raw() {
    Ok(p) => p,
    Err(e) => {
      warn!("dropping undecodable attachment part: {e}");
      return;
    }
  };
  let content_type = if mimetype.trim().is_empty() {
    DEFAULT_CONTENT_TYPE.to_string()
  } else {
    part.ctype.mimetype.clone()
  };
  out.push(Attachment {
    filename: filename.unwrap_or_else(|| DEFAULT_FILENAME.to_string()),
    content_type,
    payload,
  });
}
