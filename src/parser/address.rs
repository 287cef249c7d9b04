//! Address extraction: turn an address-bearing header value into the
//! canonical semicolon-joined display list.

use crate::model::address::EmailAddress;
use crate::parser::header;

/// Sentinel returned when a header value yields no address entries.
/// Callers compare against it to decide whether to try a fallback header.
pub const NO_ADDRESSES: &str = "Non specificato";

/// Extract every address entry from a raw header value.
///
/// The split separator is `,` when the decoded value contains one anywhere,
/// else `;`, else the whole value is a single entry. Values mixing both
/// separators are split on the first strategy only. Each entry renders as
/// `Name <address>` or bare `address`; an entry with no parseable address
/// is kept as opaque text. Empty input, or input where nothing survives,
/// yields [`NO_ADDRESSES`].
pub fn extract_address_list(raw: &str) -> String {
    if raw.is_empty() {
        return NO_ADDRESSES.to_string();
    }

    let decoded = header::decode_header_field(raw);
    let parts: Vec<&str> = if decoded.contains(',') {
        decoded.split(',').collect()
    } else if decoded.contains(';') {
        decoded.split(';').collect()
    } else {
        vec![decoded.as_str()]
    };

    let mut entries: Vec<String> = Vec::new();
    for part in parts {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        let parsed = EmailAddress::parse(part);
        if parsed.address.is_empty() {
            entries.push(part.to_string());
        } else {
            entries.push(parsed.display());
        }
    }

    if entries.is_empty() {
        NO_ADDRESSES.to_string()
    } else {
        entries.join("; ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_two_comma_separated_entries() {
        let out = extract_address_list("A <a@x.com>, B <b@x.com>");
        assert_eq!(out, "A <a@x.com>; B <b@x.com>");
    }

    #[test]
    fn test_semicolon_separated_entries() {
        let out = extract_address_list("a@x.com; b@x.com");
        assert_eq!(out, "a@x.com; b@x.com");
    }

    #[test]
    fn test_single_bare_address() {
        assert_eq!(extract_address_list("user@example.com"), "user@example.com");
    }

    #[test]
    fn test_empty_input_yields_sentinel() {
        assert_eq!(extract_address_list(""), NO_ADDRESSES);
    }

    #[test]
    fn test_whitespace_entries_skipped() {
        let out = extract_address_list("a@x.com, , b@x.com");
        assert_eq!(out, "a@x.com; b@x.com");
    }

    #[test]
    fn test_entry_without_address_kept_as_text() {
        let out = extract_address_list("Ufficio Protocollo, user@x.com");
        assert_eq!(out, "Ufficio Protocollo; user@x.com");
    }

    #[test]
    fn test_encoded_display_name() {
        let out = extract_address_list("=?UTF-8?B?TWFyaW8gUm9zc2k=?= <mario@esempio.it>");
        assert_eq!(out, "Mario Rossi <mario@esempio.it>");
    }

    #[test]
    fn test_comma_wins_over_semicolon() {
        // First-found separator governs the whole value.
        let out = extract_address_list("a@x.com, b@x.com; c@x.com");
        assert_eq!(out, "a@x.com; b@x.com; c@x.com");
    }
}
