//! MIME part traversal: body selection, attachment enumeration, and
//! HTML-to-text conversion.

use mail_parser::{Message, MessagePart, MimeHeaders, PartType};

use crate::model::attachment::{format_file_size, AttachmentRecord};
use crate::parser::header;

/// Depth-first pre-order walk over every part of the message, containers
/// included. Nested `message/rfc822` parts are descended into. The visitor
/// returns `false` to stop the walk early; the return value reports
/// whether the walk ran to completion.
pub fn walk_parts<'x>(
    message: &Message<'x>,
    visit: &mut dyn FnMut(&MessagePart<'x>) -> bool,
) -> bool {
    walk_from(message, 0, visit)
}

fn walk_from<'x>(
    message: &Message<'x>,
    part_id: usize,
    visit: &mut dyn FnMut(&MessagePart<'x>) -> bool,
) -> bool {
    let Some(part) = message.parts.get(part_id) else {
        return true;
    };
    if !visit(part) {
        return false;
    }
    match &part.body {
        PartType::Multipart(children) => {
            for &child in children {
                if !walk_from(message, child, visit) {
                    return false;
                }
            }
        }
        PartType::Message(nested) => {
            if !walk_parts(nested, visit) {
                return false;
            }
        }
        _ => {}
    }
    true
}

/// Whether the root part makes this a multi-part message. Single-part
/// messages take the direct-decode path and never yield attachments.
pub fn is_multipart(message: &Message<'_>) -> bool {
    matches!(
        message.root_part().body,
        PartType::Multipart(_) | PartType::Message(_)
    )
}

/// Select the body text.
///
/// Multi-part: the first non-empty `text/plain` leaf wins and stops the
/// walk; failing that, the first HTML leaf whose conversion is non-empty
/// is used. A plain-text part found after an HTML one still wins.
/// Single-part: the payload is decoded directly, except that an HTML
/// payload is converted to plain text like any other HTML body.
///
/// The result may be empty; the caller substitutes the placeholder.
pub fn extract_body(message: &Message<'_>) -> String {
    if !is_multipart(message) {
        return single_part_text(message.root_part());
    }

    let mut plain: Option<String> = None;
    let mut html_fallback: Option<String> = None;
    walk_parts(message, &mut |part| {
        if is_plain_text(part) {
            if let Some(text) = part_text(part) {
                if !text.is_empty() {
                    plain = Some(text);
                    return false;
                }
            }
        } else if is_html(part) && html_fallback.is_none() {
            if let Some(markup) = part_text(part) {
                let converted = html_to_text(&markup);
                if !converted.is_empty() {
                    html_fallback = Some(converted);
                }
            }
        }
        true
    });

    plain.or(html_fallback).unwrap_or_default()
}

/// Enumerate qualifying attachments in traversal order.
///
/// A part qualifies when its disposition value contains `attachment` or
/// `inline` and it declares a filename.
pub fn collect_attachments(message: &Message<'_>) -> Vec<AttachmentRecord> {
    if !is_multipart(message) {
        return Vec::new();
    }

    let mut records = Vec::new();
    walk_parts(message, &mut |part| {
        if let Some(record) = attachment_record(part) {
            records.push(record);
        }
        true
    });
    records
}

fn attachment_record(part: &MessagePart<'_>) -> Option<AttachmentRecord> {
    let disposition = part.content_disposition()?;
    let kind = disposition.ctype().to_ascii_lowercase();
    if !kind.contains("attachment") && !kind.contains("inline") {
        return None;
    }
    let name = part.attachment_name().filter(|n| !n.is_empty())?;

    Some(AttachmentRecord {
        filename: header::decode_header_field(name),
        size: format_file_size(part.contents().len() as u64),
        content_type: content_type_label(part),
    })
}

/// `type/subtype` of a part, or the generic binary default.
fn content_type_label(part: &MessagePart<'_>) -> String {
    part.content_type()
        .map(|ct| match ct.subtype() {
            Some(sub) => format!("{}/{}", ct.ctype(), sub),
            None => ct.ctype().to_string(),
        })
        .unwrap_or_else(|| "application/octet-stream".to_string())
}

/// A part counts as plain text when it says `text/plain` or declares no
/// content type at all (the RFC 2045 default).
fn is_plain_text(part: &MessagePart<'_>) -> bool {
    match part.content_type() {
        Some(ct) => {
            ct.ctype().eq_ignore_ascii_case("text")
                && ct.subtype().map_or(true, |s| s.eq_ignore_ascii_case("plain"))
        }
        None => matches!(part.body, PartType::Text(_)),
    }
}

fn is_html(part: &MessagePart<'_>) -> bool {
    part.content_type().is_some_and(|ct| {
        ct.ctype().eq_ignore_ascii_case("text")
            && ct.subtype().is_some_and(|s| s.eq_ignore_ascii_case("html"))
    })
}

/// Decoded text of a leaf part. Binary leaves are decoded as UTF-8 with
/// invalid bytes dropped; containers yield nothing.
fn part_text(part: &MessagePart<'_>) -> Option<String> {
    match &part.body {
        PartType::Text(text) | PartType::Html(text) => Some(text.as_ref().to_string()),
        PartType::Binary(bytes) | PartType::InlineBinary(bytes) => {
            Some(header::decode_utf8_ignore(bytes))
        }
        _ => None,
    }
}

fn single_part_text(part: &MessagePart<'_>) -> String {
    let text = part_text(part).unwrap_or_default();
    if is_html(part) {
        html_to_text(&text)
    } else {
        text
    }
}

/// Convert HTML to plain text.
///
/// - `<br>`, `<p>`, `<div>`, `<li>`, headings and table rows become newlines
/// - every other tag is stripped; anchor targets live inside the `<a …>`
///   tag itself, so link text survives and URLs do not
/// - script and style blocks are removed whole
/// - common entities are decoded
/// - runs of blank lines collapse to one
pub fn html_to_text(html: &str) -> String {
    let mut text = remove_tag_block(html, "script");
    text = remove_tag_block(&text, "style");

    for tag in ["br", "br/", "br /"] {
        text = text.replace(&format!("<{tag}>"), "\n");
        text = text.replace(&format!("<{}>", tag.to_uppercase()), "\n");
    }
    for tag in ["p", "div", "tr", "li", "h1", "h2", "h3", "h4", "h5", "h6"] {
        let upper = tag.to_uppercase();
        text = text.replace(&format!("<{tag}>"), "\n");
        text = text.replace(&format!("<{upper}>"), "\n");
        text = text.replace(&format!("<{tag} "), "\n<");
        text = text.replace(&format!("<{upper} "), "\n<");
        text = text.replace(&format!("</{tag}>"), "\n");
        text = text.replace(&format!("</{upper}>"), "\n");
    }

    let mut stripped = String::with_capacity(text.len());
    let mut in_tag = false;
    for ch in text.chars() {
        match ch {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => stripped.push(ch),
            _ => {}
        }
    }

    collapse_blank_lines(&decode_entities(&stripped))
}

fn decode_entities(text: &str) -> String {
    const ENTITIES: [(&str, &str); 8] = [
        ("&amp;", "&"),
        ("&lt;", "<"),
        ("&gt;", ">"),
        ("&quot;", "\""),
        ("&#39;", "'"),
        ("&apos;", "'"),
        ("&nbsp;", " "),
        ("&#160;", " "),
    ];
    let mut decoded = text.to_string();
    for (entity, replacement) in ENTITIES {
        decoded = decoded.replace(entity, replacement);
    }
    decoded
}

/// Trim each line and collapse runs of blank lines into a single one.
fn collapse_blank_lines(text: &str) -> String {
    let mut cleaned = String::with_capacity(text.len());
    let mut prev_was_blank = false;
    for line in text.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            if !prev_was_blank {
                cleaned.push('\n');
                prev_was_blank = true;
            }
        } else {
            cleaned.push_str(trimmed);
            cleaned.push('\n');
            prev_was_blank = false;
        }
    }
    cleaned.trim().to_string()
}

/// Remove an entire tag block (e.g. `<script>…</script>`).
fn remove_tag_block(html: &str, tag: &str) -> String {
    let mut result = String::with_capacity(html.len());
    let mut remaining = html;
    let open = format!("<{tag}");
    let close = format!("</{tag}>");

    while let Some(start) = find_ascii_ci(remaining, &open) {
        result.push_str(&remaining[..start]);
        let after = &remaining[start..];
        if let Some(end) = find_ascii_ci(after, &close) {
            remaining = &after[end + close.len()..];
        } else {
            // No closing tag, drop the rest
            remaining = "";
            break;
        }
    }
    result.push_str(remaining);
    result
}

/// Byte offset of `needle` in `haystack`, ASCII case-insensitive.
///
/// `needle` must be ASCII, so the returned offsets are char boundaries.
fn find_ascii_ci(haystack: &str, needle: &str) -> Option<usize> {
    let h = haystack.as_bytes();
    let n = needle.as_bytes();
    if n.is_empty() || h.len() < n.len() {
        return None;
    }
    h.windows(n.len()).position(|w| w.eq_ignore_ascii_case(n))
}

#[cfg(test)]
mod tests {
    use super::*;
    use mail_parser::MessageParser;

    #[test]
    fn test_html_to_text_basic() {
        let html = "<p>Hello <b>world</b></p><p>Second paragraph</p>";
        let text = html_to_text(html);
        assert!(text.contains("Hello world"));
        assert!(text.contains("Second paragraph"));
    }

    #[test]
    fn test_html_to_text_entities() {
        let html = "Tom &amp; Jerry &lt;3&gt;";
        assert_eq!(html_to_text(html), "Tom & Jerry <3>");
    }

    #[test]
    fn test_html_to_text_removes_scripts() {
        let html = "Before<script>alert('x')</script>After";
        assert_eq!(html_to_text(html), "BeforeAfter");
    }

    #[test]
    fn test_remove_tag_block_mixed_case_after_accents() {
        let html = "perché<SCRIPT>x()</script>dopo";
        assert_eq!(html_to_text(html), "perchédopo");
    }

    #[test]
    fn test_html_to_text_drops_link_targets() {
        let html = "Visita <a href=\"https://example.com/pagina\">il sito</a> ora";
        let text = html_to_text(html);
        assert!(text.contains("il sito"));
        assert!(!text.contains("example.com"));
        assert!(!text.contains("https"));
    }

    #[test]
    fn test_walk_visits_all_leaves() {
        let raw = b"From: a@b.com\r\n\
            Content-Type: multipart/mixed; boundary=\"xyz\"\r\n\r\n\
            --xyz\r\nContent-Type: text/plain\r\n\r\nuno\r\n\
            --xyz\r\nContent-Type: text/plain\r\n\r\ndue\r\n\
            --xyz--\r\n";
        let message = MessageParser::default().parse(&raw[..]).unwrap();
        let mut visited = 0;
        walk_parts(&message, &mut |_| {
            visited += 1;
            true
        });
        // Root container plus two leaves.
        assert_eq!(visited, 3);
    }

    #[test]
    fn test_walk_stops_when_visitor_says_so() {
        let raw = b"From: a@b.com\r\n\
            Content-Type: multipart/mixed; boundary=\"xyz\"\r\n\r\n\
            --xyz\r\nContent-Type: text/plain\r\n\r\nuno\r\n\
            --xyz\r\nContent-Type: text/plain\r\n\r\ndue\r\n\
            --xyz--\r\n";
        let message = MessageParser::default().parse(&raw[..]).unwrap();
        let mut visited = 0;
        let completed = walk_parts(&message, &mut |_| {
            visited += 1;
            visited < 2
        });
        assert!(!completed);
        assert_eq!(visited, 2);
    }

    #[test]
    fn test_single_part_yields_no_attachments() {
        let raw = b"From: a@b.com\r\nSubject: x\r\n\r\nsolo testo\r\n";
        let message = MessageParser::default().parse(&raw[..]).unwrap();
        assert!(!is_multipart(&message));
        assert!(collect_attachments(&message).is_empty());
    }
}
