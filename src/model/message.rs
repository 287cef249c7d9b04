//! The parsed-message record produced by the parser and consumed by the
//! renderer and the JSON API.

use super::attachment::AttachmentRecord;

/// Placeholder when the `Subject` header is absent.
pub const NO_SUBJECT: &str = "Nessun oggetto";
/// Placeholder when the `From` header is absent or empty.
pub const UNKNOWN_SENDER: &str = "Mittente sconosciuto";
/// Placeholder when no recipient header resolves to an address list.
pub const NO_RECIPIENT: &str = "Destinatario non specificato";
/// Placeholder when the `Date` header is absent.
pub const UNKNOWN_DATE: &str = "Data sconosciuta";
/// Placeholder when the body is empty or whitespace-only after all
/// extraction attempts.
pub const EMPTY_BODY: &str = "Contenuto del messaggio non disponibile o vuoto";

/// Everything the renderer needs about one email message.
///
/// Built once per conversion by [`crate::parser::parse_message`], a pure
/// function of the input bytes. All fields are display-ready text; the
/// placeholders above stand in for anything missing, so no field is ever
/// empty.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ParsedMessage {
    /// Decoded subject line (RFC 2047 encoded-words resolved).
    pub subject: String,

    /// Formatted sender, possibly carrying the certified-mail prefix and a
    /// quoted display name.
    pub sender: String,

    /// Formatted recipient list; `"CC: "`-prefixed when resolved from a
    /// carbon-copy header.
    pub recipient: String,

    /// The `Date` header exactly as decoded. No semantic date parsing.
    pub date: String,

    /// Plain-text body. Never empty.
    pub body: String,

    /// Attachments in discovery order.
    pub attachments: Vec<AttachmentRecord>,
}
