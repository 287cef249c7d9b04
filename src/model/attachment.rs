//! Attachment metadata.
//!
//! The size is stored pre-formatted: the renderer and the JSON API both
//! show it verbatim, so formatting happens once at parse time.

/// One attachment discovered while walking the message parts.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq)]
pub struct AttachmentRecord {
    /// Decoded filename, exactly as declared by the part headers.
    pub filename: String,

    /// Human-readable size (`"2.0 kB"`), see [`format_file_size`].
    pub size: String,

    /// MIME content type (e.g. `"image/jpeg"`, `"application/pdf"`).
    pub content_type: String,
}

/// Format a byte count with units `B`, `kB`, `MB`, `GB`, dividing by 1024
/// while the value is ≥ 1024 and a larger unit remains.
///
/// Zero is `"0 B"`. The base unit prints without decimals; every higher
/// unit prints with exactly one decimal digit. The 1024 divisor together
/// with SI-style unit labels is intentional and must stay as-is.
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "kB", "MB", "GB"];

    if bytes == 0 {
        return "0 B".to_string();
    }

    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }

    if unit == 0 {
        format!("{} {}", bytes, UNITS[unit])
    } else {
        format!("{:.1} {}", size, UNITS[unit])
    }
}
