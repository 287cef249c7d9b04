//! Sender classification: format the `From` header, marking senders that
//! went through a certified-mail (PEC) transport.

use tracing::debug;

use crate::model::address::EmailAddress;
use crate::model::message::UNKNOWN_SENDER;
use crate::parser::header;

/// Prefix applied to senders detected as certified mail.
pub const CERTIFIED_PREFIX: &str = "Posta Certificata ";

/// Header names whose presence (with a non-empty value) marks a certified
/// transport. These are the receipt/transport headers PEC providers add.
const MARKER_HEADERS: [&str; 6] = [
    "x-transport",
    "x-trasporto",
    "x-tiporicevuta",
    "x-ricevuta",
    "x-verificasicurezza",
    "x-riferimento-message-id",
];

/// Keywords looked up in the address's domain portion.
const DOMAIN_KEYWORDS: [&str; 4] = ["pec", "cert", "certificata", "legalmail"];

/// Keywords looked up in the display name, consulted only when the header
/// and domain predicates found nothing.
const NAME_KEYWORDS: [&str; 3] = ["pec", "certificata", "cert"];

/// What the predicates inspect: the full header set plus the parsed
/// `From` address.
struct Candidate<'a> {
    headers: &'a [(String, String)],
    parsed: &'a EmailAddress,
}

fn has_marker_header(c: &Candidate) -> bool {
    c.headers
        .iter()
        .any(|(name, value)| MARKER_HEADERS.contains(&name.as_str()) && !value.is_empty())
}

fn has_certified_domain(c: &Candidate) -> bool {
    if c.parsed.address.is_empty() {
        return false;
    }
    let domain = c.parsed.domain().to_lowercase();
    DOMAIN_KEYWORDS.iter().any(|kw| domain.contains(kw))
}

fn has_certified_name(c: &Candidate) -> bool {
    if c.parsed.display_name.is_empty() {
        return false;
    }
    let name = c.parsed.display_name.to_lowercase();
    NAME_KEYWORDS.iter().any(|kw| name.contains(kw))
}

/// Detection predicates in evaluation order; the first hit wins.
const PREDICATES: [fn(&Candidate) -> bool; 3] =
    [has_marker_header, has_certified_domain, has_certified_name];

/// Format the sender display string from the raw `From` header value and
/// the message's full header set.
///
/// An absent or empty header yields [`UNKNOWN_SENDER`]. Decode failures
/// degrade to best-effort text; this function never fails.
pub fn format_sender(from_raw: Option<&str>, headers: &[(String, String)]) -> String {
    let raw = match from_raw {
        Some(value) if !value.is_empty() => value,
        _ => return UNKNOWN_SENDER.to_string(),
    };

    let decoded = header::decode_header_field(raw);
    let parsed = EmailAddress::parse(&decoded);
    let candidate = Candidate {
        headers,
        parsed: &parsed,
    };

    let certified = PREDICATES.iter().any(|predicate| predicate(&candidate));
    if certified {
        debug!(sender = %decoded, "certified transport detected");
    }
    let marker = if certified { CERTIFIED_PREFIX } else { "" };

    if parsed.address.is_empty() {
        return format!("{marker}{decoded}");
    }
    if parsed.display_name.is_empty() {
        if certified {
            format!("{marker}<{}>", parsed.address)
        } else {
            parsed.address.clone()
        }
    } else {
        format!("{marker}\"{}\" <{}>", parsed.display_name, parsed.address)
    }
}
