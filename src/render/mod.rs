//! Body normalization and message rendering.
//!
//! Reconciles HTML and plain-text bodies into a single string safe for
//! the chat platform's HTML subset, and renders the header block. The
//! sanitizer is an allow-list tag scanner, not a full HTML parser:
//! malformed markup degrades to text instead of raising.

use crate::models::email::inbound_email::InboundEmail;

/// Tags passed through verbatim, attributes included (links need theirs).
const ALLOWED_TAGS: [&str; 7] = ["b", "i", "u", "s", "code", "pre", "a"];

/// Resource guard: HTML beyond this many bytes is truncated before scanning.
pub const MAX_HTML_INPUT: usize = 512 * 1024;

/// Placeholder when a message carries no usable body at all.
pub const NO_CONTENT: &str = "No content";

/// Reconciled body: `rendered` for the markup-aware channel, `plain` for
/// any construction that needs raw text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedBody {
  pub rendered: String,
  pub plain: String,
}

/// Minimal HTML escaping for text rendered through the markup channel.
pub fn html_escape(s: &str) -> String {
  s.replace('&', "&amp;")
    .replace('<', "&lt;")
    .replace('>', "&gt;")
}

/// Produce the renderable body, preferring HTML when present.
pub fn normalize_body(body_html: Option<&str>, body_plain: Option<&str>) -> NormalizedBody {
  let html = body_html.map(str::trim).filter(|s| !s.is_empty());
  let plain = body_plain.map(str::trim).filter(|s| !s.is_empty());

  let mut rendered = match (html, plain) {
    (Some(h), _) => sanitize_html(h),
    (None, Some(p)) => html_escape(p),
    (None, None) => String::new(),
  };
  if rendered.is_empty() {
    // Sanitizing can eat an all-markup body; fall back through the plain
    // text before settling on the placeholder.
    rendered = plain
      .map(html_escape)
      .unwrap_or_else(|| html_escape(NO_CONTENT));
  }

  let plain = plain
    .or(html)
    .map(str::to_string)
    .unwrap_or_else(|| NO_CONTENT.to_string());

  NormalizedBody {
    rendered,
    plain,
  }
}

/// Header block for the notification. Always entity-escaped: header
/// fields travel through the markup-aware channel regardless of where
/// the body came from.
pub fn render_header(email: &InboundEmail) -> String {
  let recipient = email.recipient.as_deref().unwrap_or("Unknown");
  let mut header = format!(
    "📧 <b>New Email Received!</b>\n\n\
     <b>From:</b> <code>{}</code>\n\
     <b>To:</b> <code>{}</code>\n\
     <b>Subject:</b> {}\n",
    html_escape(&email.sender),
    html_escape(recipient),
    html_escape(&email.subject),
  );
  if let Some(date) = email.date.as_deref() {
    header.push_str(&format!("<b>Date:</b> {}\n", html_escape(date)));
  }
  header.push_str(&format!(
    "<b>Attachments:</b> {}\n\n───────────────────────\n",
    email.attachments.len()
  ));
  header
}

/// Reduce arbitrary HTML to the supported tag subset.
///
/// Rules: `<script>`/`<style>` elements vanish with their content;
/// `h1`-`h6` become bold with a trailing newline; `strong` → `b`,
/// `em` → `i`; allowed tags pass through verbatim; every other tag is
/// dropped keeping its inner text; blank-line runs collapse to one; the
/// result is trimmed.
pub fn sanitize_html(input: &str) -> String {
  let input = truncate_on_char_boundary(input, MAX_HTML_INPUT);
  let stripped = strip_tags(input);
  let collapsed = collapse_blank_lines(&stripped);
  collapsed.trim().to_string()
}

fn truncate_on_char_boundary(input: &str, max: usize) -> &str {
  if input.len() <= max {
    return input;
  }
  let mut end = max;
  while !input.is_char_boundary(end) {
    end -= 1;
  }
  &input[..end]
}

struct Tag<'a> {
  name: String,
  closing: bool,
  raw: &'a str,
  /// Byte offset just past the closing '>'.
  end: usize,
}

/// Parse a tag starting at `start` (which must point at '<'). Returns
/// `None` for text that only looks like a tag ("a < b", unterminated
/// markup), which the caller keeps as literal text.
fn scan_tag(input: &str, start: usize) -> Option<Tag<'_>> {
  let bytes = input.as_bytes();
  let mut i = start + 1;

  // Comments and doctypes: drop up to the next '>'.
  if bytes.get(i) == Some(&b'!') {
    let close = input[i..].find('>')? + i;
    return Some(Tag {
      name: "!".to_string(),
      closing: false,
      raw: &input[start..=close],
      end: close + 1,
    });
  }

  let closing = bytes.get(i) == Some(&b'/');
  if closing {
    i += 1;
  }
  if !bytes.get(i).is_some_and(u8::is_ascii_alphabetic) {
    return None;
  }
  let name_start = i;
  while bytes.get(i).is_some_and(u8::is_ascii_alphanumeric) {
    i += 1;
  }
  let name = input[name_start..i].to_ascii_lowercase();
  let close = input[i..].find('>')? + i;
  Some(Tag {
    name,
    closing,
    raw: &input[start..=close],
    end: close + 1,
  })
}

/// ASCII case-insensitive substring search. The needle must be ASCII.
fn find_ci(haystack: &str, needle_lower: &str, from: usize) -> Option<usize> {
  let hay = haystack.as_bytes();
  let ndl = needle_lower.as_bytes();
  if ndl.is_empty() || from >= hay.len() {
    return None;
  }
  (from..hay.len().saturating_sub(ndl.len() - 1)).find(|&i| {
    hay[i..i + ndl.len()]
      .iter()
      .zip(ndl)
      .all(|(a, b)| a.eq_ignore_ascii_case(b))
  })
}

fn is_heading(name: &str) -> bool {
  let mut chars = name.chars();
  chars.next() == Some('h')
    && matches!(chars.next(), Some('1'..='6'))
    && chars.next().is_none()
}

fn strip_tags(input: &str) -> String {
  let mut out = String::with_capacity(input.len());
  let mut i = 0;

  while i < input.len() {
    if input.as_bytes()[i] != b'<' {
      let next = input[i..].find('<').map_or(input.len(), |o| i + o);
      out.push_str(&input[i..next]);
      i = next;
      continue;
    }

    let Some(tag) = scan_tag(input, i) else {
      out.push('<');
      i += 1;
      continue;
    };

    if !tag.closing && (tag.name == "script" || tag.name == "style") {
      // Elide the whole element; an unterminated one swallows the rest.
      i = match find_ci(input, &format!("</{}", tag.name), tag.end) {
        Some(close_start) => input[close_start..]
          .find('>')
          .map_or(input.len(), |o| close_start + o + 1),
        None => input.len(),
      };
      continue;
    }

    match tag.name.as_str() {
      name if is_heading(name) => {
        out.push_str(if tag.closing { "</b>\n" } else { "<b>" });
      }
      "strong" => out.push_str(if tag.closing { "</b>" } else { "<b>" }),
      "em" => out.push_str(if tag.closing { "</i>" } else { "<i>" }),
      name if ALLOWED_TAGS.contains(&name) => out.push_str(tag.raw),
      _ => {}
    }
    i = tag.end;
  }
  out
}

/// Collapse runs of blank (or whitespace-only) lines into one blank line.
fn collapse_blank_lines(input: &str) -> String {
  let mut out = String::with_capacity(input.len());
  let mut pending_blank = false;
  let mut first = true;
  for line in input.lines() {
    if line.trim().is_empty() {
      pending_blank = true;
      continue;
    }
    if !first {
      out.push('\n');
      if pending_blank {
        out.push('\n');
      }
    }
    out.push_str(line);
    first = false;
    pending_blank = false;
  }
  out
}
