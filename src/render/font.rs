//! Helvetica metrics and WinAnsi text encoding.
//!
//! The renderer sticks to the standard 14 fonts, so glyph widths come from
//! the Adobe AFM tables (1000 units per em) instead of an embedded font
//! program. Oblique variants share the upright widths.

/// The four faces registered in the page resources.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontStyle {
    Regular,
    Bold,
    Oblique,
    BoldOblique,
}

impl FontStyle {
    pub fn from_flags(bold: bool, italic: bool) -> Self {
        match (bold, italic) {
            (false, false) => Self::Regular,
            (true, false) => Self::Bold,
            (false, true) => Self::Oblique,
            (true, true) => Self::BoldOblique,
        }
    }

    /// Resource name inside the page font dictionary.
    pub fn resource_name(self) -> &'static str {
        match self {
            Self::Regular => "F1",
            Self::Bold => "F2",
            Self::Oblique => "F3",
            Self::BoldOblique => "F4",
        }
    }

    /// PostScript base font name.
    pub fn base_font(self) -> &'static str {
        match self {
            Self::Regular => "Helvetica",
            Self::Bold => "Helvetica-Bold",
            Self::Oblique => "Helvetica-Oblique",
            Self::BoldOblique => "Helvetica-BoldOblique",
        }
    }

    fn is_bold(self) -> bool {
        matches!(self, Self::Bold | Self::BoldOblique)
    }
}

/// Helvetica glyph widths for ASCII 0x20..=0x7E.
const WIDTHS_REGULAR: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // 0x20
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556, // 0x30
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778, // 0x40
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556, // 0x50
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556, // 0x60
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584, // 0x70
];

/// Helvetica-Bold glyph widths for ASCII 0x20..=0x7E.
const WIDTHS_BOLD: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278, // 0x20
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611, // 0x30
    975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778, // 0x40
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556, // 0x50
    333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611, // 0x60
    611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584, // 0x70
];

/// Width outside the ASCII table: most accented Latin glyphs sit at the
/// lowercase average, close enough for line breaking.
const FALLBACK_WIDTH: u16 = 556;

fn char_width_units(c: char, bold: bool) -> u16 {
    let table = if bold { &WIDTHS_BOLD } else { &WIDTHS_REGULAR };
    let cp = c as u32;
    if (0x20..=0x7E).contains(&cp) {
        table[(cp - 0x20) as usize]
    } else {
        FALLBACK_WIDTH
    }
}

/// Width of `text` in points at the given size.
pub fn text_width(text: &str, font: FontStyle, size: f32) -> f32 {
    let units: u32 = text
        .chars()
        .map(|c| u32::from(char_width_units(c, font.is_bold())))
        .sum();
    units as f32 * size / 1000.0
}

/// Encode text to Windows-1252 bytes for a WinAnsi-encoded font.
/// Characters outside the code page degrade to `?`.
pub fn encode_win1252(text: &str) -> Vec<u8> {
    text.chars().map(win1252_byte).collect()
}

fn win1252_byte(c: char) -> u8 {
    let cp = c as u32;
    match cp {
        0x00..=0x7F | 0xA0..=0xFF => cp as u8,
        _ => match c {
            '\u{20AC}' => 0x80, // €
            '\u{201A}' => 0x82,
            '\u{0192}' => 0x83,
            '\u{201E}' => 0x84,
            '\u{2026}' => 0x85, // …
            '\u{2020}' => 0x86,
            '\u{2021}' => 0x87,
            '\u{02C6}' => 0x88,
            '\u{2030}' => 0x89,
            '\u{0160}' => 0x8A,
            '\u{2039}' => 0x8B,
            '\u{0152}' => 0x8C,
            '\u{017D}' => 0x8E,
            '\u{2018}' => 0x91,
            '\u{2019}' => 0x92,
            '\u{201C}' => 0x93,
            '\u{201D}' => 0x94,
            '\u{2022}' => 0x95,
            '\u{2013}' => 0x96, // en dash
            '\u{2014}' => 0x97, // em dash
            '\u{02DC}' => 0x98,
            '\u{2122}' => 0x99,
            '\u{0161}' => 0x9A,
            '\u{203A}' => 0x9B,
            '\u{0153}' => 0x9C,
            '\u{017E}' => 0x9E,
            '\u{0178}' => 0x9F,
            _ => b'?',
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ascii_widths_positive() {
        for c in ' '..='~' {
            assert!(char_width_units(c, false) > 0);
            assert!(char_width_units(c, true) > 0);
        }
    }

    #[test]
    fn test_bold_is_wider_for_lowercase() {
        let regular = text_width("conversione", FontStyle::Regular, 10.0);
        let bold = text_width("conversione", FontStyle::Bold, 10.0);
        assert!(bold > regular);
    }

    #[test]
    fn test_oblique_shares_upright_widths() {
        let upright = text_width("Allegati", FontStyle::Regular, 9.0);
        let oblique = text_width("Allegati", FontStyle::Oblique, 9.0);
        assert_eq!(upright, oblique);
    }

    #[test]
    fn test_encode_latin1_passthrough() {
        assert_eq!(encode_win1252("perché"), b"perch\xE9");
    }

    #[test]
    fn test_encode_windows_specials() {
        assert_eq!(encode_win1252("—"), vec![0x97]);
        assert_eq!(encode_win1252("€"), vec![0x80]);
    }

    #[test]
    fn test_encode_unmappable_degrades() {
        assert_eq!(encode_win1252("日"), b"?");
    }
}
