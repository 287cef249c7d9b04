//! Minimal inline markup for paragraph text.
//!
//! Layout code builds paragraph strings such as `<b>Oggetto:</b> Saluti`
//! and body lines are escaped before they reach the renderer. This module
//! turns those strings into styled spans. Only `<b>` and `<i>` tags are
//! recognized; any other angle-bracket sequence (a raw email address like
//! `<anna@esempio.it>`, for instance) is kept as literal text.

use super::font::FontStyle;

/// A run of identically styled text within one paragraph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span {
    pub text: String,
    pub style: FontStyle,
}

/// Escapes `&`, `<` and `>` so body text is treated as literal content.
pub fn escape_markup(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Parses mini-markup into styled spans.
///
/// Bold and italic tags may nest; `&amp;`, `&lt;` and `&gt;` decode to
/// their characters. Unmatched closing tags are ignored rather than
/// rejected, since header values are rendered unescaped.
pub fn parse_markup(input: &str) -> Vec<Span> {
    let mut spans: Vec<Span> = Vec::new();
    let mut text = String::new();
    let mut bold = 0u32;
    let mut italic = 0u32;

    let flush = |spans: &mut Vec<Span>, text: &mut String, bold: u32, italic: u32| {
        if !text.is_empty() {
            let style = FontStyle::from_flags(bold > 0, italic > 0);
            match spans.last_mut() {
                Some(last) if last.style == style => last.text.push_str(text),
                _ => spans.push(Span {
                    text: text.clone(),
                    style,
                }),
            }
            text.clear();
        }
    };

    let mut rest = input;
    while let Some(ch) = rest.chars().next() {
        match ch {
            '<' => {
                if let Some(tail) = rest.strip_prefix("<b>") {
                    flush(&mut spans, &mut text, bold, italic);
                    bold += 1;
                    rest = tail;
                } else if let Some(tail) = rest.strip_prefix("</b>") {
                    flush(&mut spans, &mut text, bold, italic);
                    bold = bold.saturating_sub(1);
                    rest = tail;
                } else if let Some(tail) = rest.strip_prefix("<i>") {
                    flush(&mut spans, &mut text, bold, italic);
                    italic += 1;
                    rest = tail;
                } else if let Some(tail) = rest.strip_prefix("</i>") {
                    flush(&mut spans, &mut text, bold, italic);
                    italic = italic.saturating_sub(1);
                    rest = tail;
                } else {
                    text.push('<');
                    rest = &rest[1..];
                }
            }
            '&' => {
                if let Some(tail) = rest.strip_prefix("&amp;") {
                    text.push('&');
                    rest = tail;
                } else if let Some(tail) = rest.strip_prefix("&lt;") {
                    text.push('<');
                    rest = tail;
                } else if let Some(tail) = rest.strip_prefix("&gt;") {
                    text.push('>');
                    rest = tail;
                } else {
                    text.push('&');
                    rest = &rest[1..];
                }
            }
            _ => {
                text.push(ch);
                rest = &rest[ch.len_utf8()..];
            }
        }
    }
    flush(&mut spans, &mut text, bold, italic);
    spans
}

/// Concatenated text of a span list, for measuring and assertions.
pub fn plain_text(spans: &[Span]) -> String {
    spans.iter().map(|s| s.text.as_str()).collect()
}
