//! Parser for individual `.eml` files (bare RFC 5322 messages).

use std::path::Path;

use mail_parser::MessageParser;
use tracing::debug;

use crate::error::{ConvertError, Result};
use crate::model::message::{ParsedMessage, EMPTY_BODY, NO_RECIPIENT, NO_SUBJECT, UNKNOWN_DATE};
use crate::parser::{address, header, mime, sender};

/// Parse raw EML bytes into a [`ParsedMessage`].
///
/// Individual header or part decode failures fall back to field defaults;
/// only input that cannot be interpreted as a message at all is an error,
/// and then no partial record is produced.
pub fn parse_message(raw: &[u8]) -> Result<ParsedMessage> {
    if raw.is_empty() {
        return Err(ConvertError::Parse("empty input".into()));
    }

    let message = MessageParser::default()
        .parse(raw)
        .ok_or_else(|| ConvertError::Parse("not a parseable RFC 5322 message".into()))?;
    if message.parts.is_empty() {
        return Err(ConvertError::Parse("message has no content".into()));
    }

    // Header fields are decoded from the raw unfolded block, not from the
    // MIME view, so encoded words reach the decoder untouched.
    let headers = header::raw_headers(raw);

    let subject = header::get_header(&headers, "subject")
        .map(header::decode_header_field)
        .unwrap_or_else(|| NO_SUBJECT.to_string());

    let sender = sender::format_sender(header::get_header(&headers, "from"), &headers);
    let recipient = resolve_recipient(&headers);

    let date = header::get_header(&headers, "date")
        .map(header::decode_header_field)
        .unwrap_or_else(|| UNKNOWN_DATE.to_string());

    let mut body = mime::extract_body(&message);
    if body.trim().is_empty() {
        body = EMPTY_BODY.to_string();
    }

    let attachments = mime::collect_attachments(&message);

    debug!(
        subject = %subject,
        attachments = attachments.len(),
        "parsed message"
    );

    Ok(ParsedMessage {
        subject,
        sender,
        recipient,
        date,
        body,
        attachments,
    })
}

/// Read and parse a single `.eml` file.
pub fn parse_file(path: impl AsRef<Path>) -> Result<ParsedMessage> {
    let path = path.as_ref();
    let data = std::fs::read(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            ConvertError::FileNotFound(path.to_path_buf())
        } else {
            ConvertError::io(path, e)
        }
    })?;
    parse_message(&data)
}

/// Resolve the recipient display string, first success wins:
/// `To`, then `Cc`/`Bcc` (prefixed `"CC: "`), then the delivered-to
/// family in header appearance order.
fn resolve_recipient(headers: &[(String, String)]) -> String {
    if let Some(value) = header::get_header(headers, "to") {
        let list = address::extract_address_list(value);
        if list != address::NO_ADDRESSES {
            return list;
        }
    }

    for name in ["cc", "bcc"] {
        if let Some(value) = header::get_header(headers, name) {
            let list = address::extract_address_list(value);
            if list != address::NO_ADDRESSES {
                return format!("CC: {list}");
            }
        }
    }

    for (name, value) in headers {
        if matches!(
            name.as_str(),
            "delivered-to" | "x-delivered-to" | "x-original-to"
        ) {
            let list = address::extract_address_list(value);
            if list != address::NO_ADDRESSES {
                return list;
            }
        }
    }

    NO_RECIPIENT.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::message::UNKNOWN_SENDER;

    #[test]
    fn test_parse_simple_message() {
        let raw = b"From: Mario Rossi <mario@esempio.it>\r\n\
            To: anna@esempio.it\r\n\
            Subject: Saluti\r\n\
            Date: Thu, 04 Jan 2024 10:00:00 +0000\r\n\r\n\
            Ciao Anna,\r\nti scrivo per un saluto.\r\n";
        let parsed = parse_message(raw).unwrap();
        assert_eq!(parsed.subject, "Saluti");
        assert_eq!(parsed.sender, "\"Mario Rossi\" <mario@esempio.it>");
        assert_eq!(parsed.recipient, "anna@esempio.it");
        assert_eq!(parsed.date, "Thu, 04 Jan 2024 10:00:00 +0000");
        assert!(parsed.body.contains("Ciao Anna"));
        assert!(parsed.attachments.is_empty());
    }

    #[test]
    fn test_missing_headers_get_placeholders() {
        let raw = b"X-Other: x\r\n\r\ncorpo\r\n";
        let parsed = parse_message(raw).unwrap();
        assert_eq!(parsed.subject, NO_SUBJECT);
        assert_eq!(parsed.sender, UNKNOWN_SENDER);
        assert_eq!(parsed.recipient, NO_RECIPIENT);
        assert_eq!(parsed.date, UNKNOWN_DATE);
    }

    #[test]
    fn test_cc_fallback_is_prefixed() {
        let raw = b"From: a@b.it\r\nCc: c@d.it\r\n\r\ncorpo\r\n";
        let parsed = parse_message(raw).unwrap();
        assert_eq!(parsed.recipient, "CC: c@d.it");
    }

    #[test]
    fn test_delivered_to_fallback() {
        let raw = b"From: a@b.it\r\nX-Original-To: finale@d.it\r\n\r\ncorpo\r\n";
        let parsed = parse_message(raw).unwrap();
        assert_eq!(parsed.recipient, "finale@d.it");
    }

    #[test]
    fn test_empty_body_gets_placeholder() {
        let raw = b"From: a@b.it\r\nSubject: vuota\r\n\r\n   \r\n";
        let parsed = parse_message(raw).unwrap();
        assert_eq!(parsed.body, EMPTY_BODY);
    }

    #[test]
    fn test_empty_input_is_an_error() {
        assert!(parse_message(b"").is_err());
    }

    #[test]
    fn test_date_preserved_verbatim() {
        let raw = b"From: a@b.it\r\nDate: luned\xc3\xac 4 gennaio\r\n\r\ncorpo\r\n";
        let parsed = parse_message(raw).unwrap();
        assert_eq!(parsed.date, "lunedì 4 gennaio");
    }
}
