//! Raw header handling: block splitting, unfolding, and RFC 2047
//! encoded-word decoding with charset fallbacks.

use tracing::warn;

/// Split the raw header block out of a message and return it as unfolded
/// `(lowercase_name, raw_value)` pairs, in appearance order.
///
/// The block is everything before the first blank line (the whole input
/// when there is none). Values are kept exactly as written; encoded
/// words are resolved later, per field, by [`decode_header_field`].
pub fn raw_headers(data: &[u8]) -> Vec<(String, String)> {
    let block = match find_header_end(data) {
        Some(end) => &data[..end],
        None => data,
    };
    let text = decode_header_bytes(block);
    unfold_headers(&text)
}

/// Get the first value for a header name (case-insensitive; names in the
/// list are already lowercase).
pub fn get_header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.as_str())
}

/// Decode one raw header field value into plain text.
///
/// Resolves RFC 2047 encoded words and trims the result; whitespace is
/// otherwise left alone. Empty input stays empty, callers supply their
/// own placeholder defaults.
pub fn decode_header_field(raw: &str) -> String {
    if raw.is_empty() {
        return String::new();
    }
    decode_encoded_words(raw).trim().to_string()
}

/// Byte offset of the first blank line (`\n\n` or `\r\n\r\n`), i.e. where
/// the header block ends.
fn find_header_end(data: &[u8]) -> Option<usize> {
    let mut i = 0;
    while i + 1 < data.len() {
        if data[i] == b'\n' {
            if data[i + 1] == b'\n' {
                return Some(i);
            }
            if data[i + 1] == b'\r' && data.get(i + 2) == Some(&b'\n') {
                return Some(i);
            }
        }
        i += 1;
    }
    None
}

/// Decode raw header bytes to a string.
///
/// Tries UTF-8 first, then falls back to Windows-1252 (which accepts
/// every byte).
fn decode_header_bytes(bytes: &[u8]) -> String {
    // Strip BOM if present
    let bytes = if bytes.starts_with(&[0xEF, 0xBB, 0xBF]) {
        &bytes[3..]
    } else {
        bytes
    };

    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => {
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
            decoded.into_owned()
        }
    }
}

/// Unfold headers: join continuation lines (starting with space or tab)
/// with the previous header.
///
/// Returns a list of `(lowercase_name, raw_value)` pairs.
fn unfold_headers(text: &str) -> Vec<(String, String)> {
    let mut result: Vec<(String, String)> = Vec::new();

    for line in text.lines() {
        if line.starts_with(' ') || line.starts_with('\t') {
            // Continuation line
            if let Some(last) = result.last_mut() {
                last.1.push(' ');
                last.1.push_str(line.trim());
            }
        } else if let Some(colon_pos) = line.find(':') {
            let name = line[..colon_pos].trim().to_lowercase();
            let value = line[colon_pos + 1..].trim().to_string();
            result.push((name, value));
        }
        // Lines without a colon and not a continuation are silently skipped
    }

    result
}

/// Decode RFC 2047 encoded-words in a header value.
///
/// Example: `"=?UTF-8?B?Q2lhbw==?= =?UTF-8?B?IG1vbmRv?="` → `"Ciao mondo"`
///
/// A token that does not decode is preserved as literal text.
pub fn decode_encoded_words(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    let mut remaining = input;
    let mut last_was_encoded = false;

    while let Some(start) = remaining.find("=?") {
        let before = &remaining[..start];
        // If the gap between two encoded words is only whitespace, skip it (RFC 2047 §6.2)
        if !last_was_encoded || !before.trim().is_empty() {
            result.push_str(before);
        }

        let after_start = &remaining[start + 2..];

        if let Some(decoded) = try_decode_one_word(after_start) {
            result.push_str(&decoded.text);
            remaining = &remaining[start + 2 + decoded.consumed..];
            last_was_encoded = true;
        } else {
            result.push_str("=?");
            remaining = after_start;
            last_was_encoded = false;
        }
    }

    result.push_str(remaining);
    result
}

struct DecodedWord {
    text: String,
    consumed: usize, // bytes consumed from the string *after* the initial "=?"
}

fn try_decode_one_word(s: &str) -> Option<DecodedWord> {
    // Format: charset?encoding?encoded_text?=
    let first_q = s.find('?')?;
    let charset = &s[..first_q];

    let rest = &s[first_q + 1..];
    let second_q = rest.find('?')?;
    let encoding = &rest[..second_q];

    let rest2 = &rest[second_q + 1..];
    let end = rest2.find("?=")?;
    let encoded_text = &rest2[..end];

    let total_consumed = first_q + 1 + second_q + 1 + end + 2;

    let bytes = match encoding {
        "B" | "b" => decode_base64(encoded_text)?,
        "Q" | "q" => decode_q_encoding(encoded_text),
        _ => return None,
    };

    let text = decode_charset(charset, &bytes);

    Some(DecodedWord {
        text,
        consumed: total_consumed,
    })
}

/// Strict base64 decoder for encoded-word payloads.
///
/// Whitespace is tolerated; any other character outside the alphabet
/// rejects the whole token, which keeps the original text visible
/// instead of producing garbage.
fn decode_base64(input: &str) -> Option<Vec<u8>> {
    let mut out = Vec::with_capacity(input.len() / 4 * 3);
    let mut quad = [0u8; 4];
    let mut filled = 0;
    let mut padding = 0usize;

    for &b in input.as_bytes() {
        let value = match b {
            b'A'..=b'Z' => b - b'A',
            b'a'..=b'z' => b - b'a' + 26,
            b'0'..=b'9' => b - b'0' + 52,
            b'+' => 62,
            b'/' => 63,
            b'=' => {
                padding += 1;
                0
            }
            b' ' | b'\t' | b'\r' | b'\n' => continue,
            _ => return None,
        };
        quad[filled] = value;
        filled += 1;
        if filled == 4 {
            out.push((quad[0] << 2) | (quad[1] >> 4));
            out.push((quad[1] << 4) | (quad[2] >> 2));
            out.push((quad[2] << 6) | quad[3]);
            filled = 0;
        }
    }

    // Unpadded trailing group
    match filled {
        0 => {}
        2 => out.push((quad[0] << 2) | (quad[1] >> 4)),
        3 => {
            out.push((quad[0] << 2) | (quad[1] >> 4));
            out.push((quad[1] << 4) | (quad[2] >> 2));
        }
        _ => return None,
    }

    if padding > 2 {
        return None;
    }
    out.truncate(out.len().saturating_sub(padding));
    Some(out)
}

/// Decode Q-encoding (RFC 2047): underscores → spaces, `=XX` → byte.
fn decode_q_encoding(input: &str) -> Vec<u8> {
    let mut result = Vec::with_capacity(input.len());
    let bytes = input.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'_' => {
                result.push(b' ');
                i += 1;
            }
            b'=' if i + 2 < bytes.len() => {
                let hex = std::str::from_utf8(&bytes[i + 1..i + 3]).unwrap_or("");
                if let Ok(byte) = u8::from_str_radix(hex, 16) {
                    result.push(byte);
                    i += 3;
                } else {
                    result.push(b'=');
                    i += 1;
                }
            }
            b => {
                result.push(b);
                i += 1;
            }
        }
    }
    result
}

/// Decode bytes using a named charset.
///
/// Unknown labels fall back to UTF-8 with invalid bytes dropped.
fn decode_charset(charset: &str, bytes: &[u8]) -> String {
    let charset_lower = charset.to_lowercase();
    match charset_lower.as_str() {
        "utf-8" | "utf8" => String::from_utf8_lossy(bytes).into_owned(),
        _ => {
            if let Some(encoding) = encoding_rs::Encoding::for_label(charset.as_bytes()) {
                let (decoded, _, _) = encoding.decode(bytes);
                decoded.into_owned()
            } else {
                warn!(charset = charset, "Unknown charset, decoding as UTF-8");
                decode_utf8_ignore(bytes)
            }
        }
    }
}

/// Decode bytes as UTF-8, skipping invalid sequences entirely.
pub fn decode_utf8_ignore(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len());
    let mut rest = bytes;
    while !rest.is_empty() {
        match std::str::from_utf8(rest) {
            Ok(s) => {
                out.push_str(s);
                break;
            }
            Err(e) => {
                let valid = e.valid_up_to();
                out.push_str(std::str::from_utf8(&rest[..valid]).unwrap_or_default());
                let skip = e.error_len().unwrap_or(rest.len() - valid);
                rest = &rest[valid + skip..];
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_base64_encoded_word() {
        let input = "=?UTF-8?B?Q2lhbyBtb25kbw==?=";
        assert_eq!(decode_encoded_words(input), "Ciao mondo");
    }

    #[test]
    fn test_decode_q_encoded_word() {
        let input = "=?ISO-8859-1?Q?caf=E9?=";
        assert_eq!(decode_encoded_words(input), "café");
    }

    #[test]
    fn test_decode_multiple_encoded_words() {
        let input = "=?UTF-8?B?Q2lhbw==?= =?UTF-8?B?IG1vbmRv?=";
        assert_eq!(decode_encoded_words(input), "Ciao mondo");
    }

    #[test]
    fn test_decode_mixed_plain_and_encoded() {
        let input = "Re: =?UTF-8?B?Q2lhbw==?= there";
        assert_eq!(decode_encoded_words(input), "Re: Ciao there");
    }

    #[test]
    fn test_malformed_word_stays_literal() {
        let input = "=?UTF-8?B?###?=";
        assert_eq!(decode_encoded_words(input), "=?UTF-8?B?###?=");
    }

    #[test]
    fn test_decode_iso8859_encoded_word() {
        let input = "=?ISO-8859-1?Q?R=E9sum=E9_du_projet?=";
        assert_eq!(decode_encoded_words(input), "Résumé du projet");
    }

    #[test]
    fn test_decode_windows1252_encoded_word() {
        let input = "=?Windows-1252?Q?M=FCller?=";
        assert_eq!(decode_encoded_words(input), "Müller");
    }

    #[test]
    fn test_decode_utf8_base64_accents() {
        // Comunicazione è urgente
        let input = "=?UTF-8?B?Q29tdW5pY2F6aW9uZSDDqCB1cmdlbnRl?=";
        assert_eq!(decode_encoded_words(input), "Comunicazione è urgente");
    }

    #[test]
    fn test_decode_header_field_trims() {
        assert_eq!(decode_header_field("  plain value  "), "plain value");
        assert_eq!(decode_header_field(""), "");
    }

    #[test]
    fn test_unfold_headers() {
        let text = "Subject: This is a long\n\tsubject line\nFrom: user@example.com\n";
        let headers = unfold_headers(text);
        assert_eq!(headers.len(), 2);
        assert_eq!(headers[0].0, "subject");
        assert_eq!(headers[0].1, "This is a long subject line");
    }

    #[test]
    fn test_raw_headers_stop_at_blank_line() {
        let data = b"From: a@b.com\nSubject: Hi\n\nBody: not a header\n";
        let headers = raw_headers(data);
        assert_eq!(headers.len(), 2);
        assert_eq!(headers[1], ("subject".to_string(), "Hi".to_string()));
    }

    #[test]
    fn test_raw_headers_crlf() {
        let data = b"From: a@b.com\r\nSubject: Hi\r\n\r\nBody\r\n";
        let headers = raw_headers(data);
        assert_eq!(headers.len(), 2);
        assert_eq!(get_header(&headers, "from"), Some("a@b.com"));
    }

    #[test]
    fn test_decode_utf8_ignore_drops_bad_bytes() {
        let bytes = b"abc\xFF\xFEdef";
        assert_eq!(decode_utf8_ignore(bytes), "abcdef");
    }
}
