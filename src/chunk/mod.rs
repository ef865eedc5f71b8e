//! Platform-size-bounded message splitting.
//!
//! Lengths are counted in characters and every cut lands on a char
//! boundary. Re-joining the body slices (labels stripped) reproduces the
//! body exactly: no characters dropped or duplicated.

use crate::models::message::message_part::MessagePart;

/// Telegram's documented per-message maximum. Kept as the default; the
/// runtime limit comes from configuration.
pub const MAX_MESSAGE_LEN: usize = 4096;

/// Label prefixed to each body part once a message needs splitting.
pub fn part_label(n: usize) -> String {
  format!("📄 <b>Part {n}</b>\n\n")
}

/// Split a rendered message into parts of at most `limit` characters.
///
/// The header is never split: either the whole message fits in one
/// combined part, or the header goes out alone and the body follows in
/// labeled slices. An empty header emits no standalone header part.
pub fn chunk_message(header: &str, body: &str, limit: usize) -> Vec<MessagePart> {
  let header_len = header.chars().count();
  let body_len = body.chars().count();

  if header_len + body_len <= limit {
    let mut content = String::with_capacity(header.len() + body.len());
    content.push_str(header);
    content.push_str(body);
    return vec![MessagePart {
      index: 0,
      content,
      is_header: !header.is_empty(),
    }];
  }

  let mut parts = Vec::new();
  if !header.is_empty() {
    parts.push(MessagePart {
      index: 0,
      content: header.to_string(),
      is_header: true,
    });
  }

  let mut remaining = body;
  let mut n = 1;
  while !remaining.is_empty() {
    let label = part_label(n);
    // A limit smaller than the label must still make progress.
    let budget = limit.saturating_sub(label.chars().count()).max(1);
    let (slice, rest) = take_slice(remaining, budget);
    parts.push(MessagePart {
      index: parts.len(),
      content: format!("{label}{slice}"),
      is_header: false,
    });
    remaining = rest;
    n += 1;
  }
  parts
}

/// Cut up to `budget` characters off the front. Prefers the last newline
/// in the window when it sits at or past half the budget, so paragraphs
/// survive splitting; otherwise cuts hard at the budget, mid-word if need
/// be.
fn take_slice(text: &str, budget: usize) -> (&str, &str) {
  let cut = match text.char_indices().nth(budget) {
    Some((byte_pos, _)) => byte_pos,
    // The rest fits in this part.
    None => return (text, ""),
  };

  let window = &text[..cut];
  let split_at = match window.rfind('\n') {
    Some(nl) => {
      let nl_char_pos = window[..nl].chars().count();
      if nl_char_pos >= budget / 2 {
        nl + 1
      } else {
        cut
      }
    }
    None => cut,
  };
  (&text[..split_at], &text[split_at..])
}
