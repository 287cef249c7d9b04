//! Low-level PDF composition on top of `lopdf`.
//!
//! [`PageComposer`] accumulates content-stream operations for A4 pages and
//! tracks a vertical cursor that flows top to bottom. Layout code draws
//! through the text and rectangle primitives and lets [`PageComposer::ensure_room`]
//! start a new page whenever the next element would cross the bottom margin.
//! [`PageComposer::write_document`] assembles the page tree, the four
//! standard Helvetica fonts and the catalog, then serializes the document.

use std::io::Write;
use std::mem;

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, Stream};

use super::font::{self, FontStyle};
use super::markup::Span;
use crate::error::{ConvertError, Result};

/// A4 portrait page size in points.
pub const PAGE_WIDTH: f32 = 595.28;
pub const PAGE_HEIGHT: f32 = 841.89;

/// One-inch page margin on all sides.
pub const MARGIN: f32 = 72.0;

/// Points per centimetre; the layout constants are given in centimetres.
pub const CM: f32 = 28.3465;

/// Horizontal space available to content.
pub const CONTENT_WIDTH: f32 = PAGE_WIDTH - 2.0 * MARGIN;

const PAGE_TOP: f32 = PAGE_HEIGHT - MARGIN;

/// Cursor-based writer for a sequence of A4 pages.
pub struct PageComposer {
    pages: Vec<Vec<Operation>>,
    ops: Vec<Operation>,
    cursor: f32,
}

impl PageComposer {
    pub fn new() -> Self {
        PageComposer {
            pages: Vec::new(),
            ops: Vec::new(),
            cursor: PAGE_TOP,
        }
    }

    /// Top edge of the next element, in page coordinates.
    pub fn cursor(&self) -> f32 {
        self.cursor
    }

    /// Starts a new page if `height` does not fit above the bottom margin.
    /// On a fresh page the element is drawn regardless, so oversized
    /// elements cannot loop forever.
    pub fn ensure_room(&mut self, height: f32) {
        if self.cursor - height < MARGIN && self.cursor < PAGE_TOP {
            self.break_page();
        }
    }

    /// Consumes vertical space without drawing. Clamps at the bottom margin;
    /// the next `ensure_room` call performs the actual page break.
    pub fn advance(&mut self, height: f32) {
        self.cursor = (self.cursor - height).max(MARGIN);
    }

    fn break_page(&mut self) {
        self.pages.push(mem::take(&mut self.ops));
        self.cursor = PAGE_TOP;
    }

    /// Draws one line of styled text at the cursor, indented by `indent`
    /// from the left margin, then advances the cursor by `leading`.
    pub fn text_line(&mut self, indent: f32, spans: &[Span], size: f32, leading: f32) {
        self.ensure_room(leading);
        let baseline = self.cursor - size;
        self.text_at(MARGIN + indent, baseline, spans, size);
        self.cursor -= leading;
    }

    /// Draws styled text at an absolute baseline position. Does not move
    /// the cursor; table layout manages its own row geometry.
    pub fn text_at(&mut self, x: f32, baseline: f32, spans: &[Span], size: f32) {
        self.ops.push(Operation::new("BT", vec![]));
        self.ops.push(Operation::new(
            "Tm",
            vec![
                1.into(),
                0.into(),
                0.into(),
                1.into(),
                Object::Real(x),
                Object::Real(baseline),
            ],
        ));
        for span in spans {
            self.ops.push(Operation::new(
                "Tf",
                vec![span.style.resource_name().into(), Object::Real(size)],
            ));
            self.ops.push(Operation::new(
                "Tj",
                vec![Object::string_literal(font::encode_win1252(&span.text))],
            ));
        }
        self.ops.push(Operation::new("ET", vec![]));
    }

    /// Fills a rectangle with a grayscale value (0 black, 1 white).
    pub fn fill_rect(&mut self, x: f32, y: f32, width: f32, height: f32, gray: f32) {
        self.ops.push(Operation::new("q", vec![]));
        self.ops.push(Operation::new("g", vec![Object::Real(gray)]));
        self.ops.push(Operation::new(
            "re",
            vec![
                Object::Real(x),
                Object::Real(y),
                Object::Real(width),
                Object::Real(height),
            ],
        ));
        self.ops.push(Operation::new("f", vec![]));
        self.ops.push(Operation::new("Q", vec![]));
    }

    /// Strokes a rectangle outline in black.
    pub fn stroke_rect(&mut self, x: f32, y: f32, width: f32, height: f32, line_width: f32) {
        self.ops.push(Operation::new("q", vec![]));
        self.ops.push(Operation::new("w", vec![Object::Real(line_width)]));
        self.ops.push(Operation::new(
            "re",
            vec![
                Object::Real(x),
                Object::Real(y),
                Object::Real(width),
                Object::Real(height),
            ],
        ));
        self.ops.push(Operation::new("S", vec![]));
        self.ops.push(Operation::new("Q", vec![]));
    }

    /// Assembles the PDF document and writes it to `out`.
    pub fn write_document(mut self, out: &mut impl Write) -> Result<()> {
        if !self.ops.is_empty() || self.pages.is_empty() {
            self.pages.push(mem::take(&mut self.ops));
        }

        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let mut fonts = Dictionary::new();
        for style in [
            FontStyle::Regular,
            FontStyle::Bold,
            FontStyle::Oblique,
            FontStyle::BoldOblique,
        ] {
            let font_id = doc.add_object(dictionary! {
                "Type" => "Font",
                "Subtype" => "Type1",
                "BaseFont" => style.base_font(),
                "Encoding" => "WinAnsiEncoding",
            });
            fonts.set(style.resource_name(), font_id);
        }
        let resources_id = doc.add_object(dictionary! { "Font" => fonts });

        let mut kids: Vec<Object> = Vec::with_capacity(self.pages.len());
        for operations in self.pages {
            let encoded = Content { operations }
                .encode()
                .map_err(|e| ConvertError::Render(e.to_string()))?;
            let content_id = doc.add_object(Stream::new(Dictionary::new(), encoded));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            });
            kids.push(page_id.into());
        }

        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
                "Resources" => resources_id,
                "MediaBox" => vec![
                    0.into(),
                    0.into(),
                    Object::Real(PAGE_WIDTH),
                    Object::Real(PAGE_HEIGHT),
                ],
            }),
        );

        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let info_id = doc.add_object(dictionary! {
            "Producer" => Object::string_literal(concat!("eml2pdf ", env!("CARGO_PKG_VERSION"))),
        });
        doc.trailer.set("Info", info_id);

        doc.compress();
        doc.save_to(out)
            .map_err(|e| ConvertError::Render(e.to_string()))?;
        Ok(())
    }
}

impl Default for PageComposer {
    fn default() -> Self {
        Self::new()
    }
}

/// Greedy word-wrap of styled spans to `max_width` points.
///
/// Breaks at whitespace runs; a single token wider than the whole line is
/// hard-broken character by character. Always returns at least one line.
pub fn wrap_spans(spans: &[Span], size: f32, max_width: f32) -> Vec<Vec<Span>> {
    let mut lines: Vec<Vec<Span>> = Vec::new();
    let mut line: Vec<Span> = Vec::new();
    let mut line_width = 0.0f32;

    for span in spans {
        for token in tokenize(&span.text) {
            let width = font::text_width(token, span.style, size);
            let is_space = token.chars().all(char::is_whitespace);

            if line_width + width <= max_width {
                if !(is_space && line.is_empty()) {
                    push_piece(&mut line, token, span.style);
                    line_width += width;
                }
            } else if is_space {
                close_line(&mut lines, &mut line, &mut line_width);
            } else if width <= max_width {
                close_line(&mut lines, &mut line, &mut line_width);
                push_piece(&mut line, token, span.style);
                line_width = width;
            } else {
                let mut buf = [0u8; 4];
                for ch in token.chars() {
                    let piece = ch.encode_utf8(&mut buf);
                    let piece_width = font::text_width(piece, span.style, size);
                    if line_width + piece_width > max_width && !line.is_empty() {
                        close_line(&mut lines, &mut line, &mut line_width);
                    }
                    push_piece(&mut line, piece, span.style);
                    line_width += piece_width;
                }
            }
        }
    }

    if !line.is_empty() || lines.is_empty() {
        lines.push(line);
    }
    lines
}

fn push_piece(line: &mut Vec<Span>, piece: &str, style: FontStyle) {
    match line.last_mut() {
        Some(last) if last.style == style => last.text.push_str(piece),
        _ => line.push(Span {
            text: piece.to_string(),
            style,
        }),
    }
}

fn close_line(lines: &mut Vec<Vec<Span>>, line: &mut Vec<Span>, line_width: &mut f32) {
    while let Some(last) = line.last_mut() {
        let trimmed = last.text.trim_end().len();
        if trimmed == last.text.len() {
            break;
        }
        if trimmed == 0 {
            line.pop();
        } else {
            last.text.truncate(trimmed);
            break;
        }
    }
    lines.push(mem::take(line));
    *line_width = 0.0;
}

/// Splits text into alternating runs of whitespace and non-whitespace.
fn tokenize(text: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    let mut start = 0;
    let mut in_space: Option<bool> = None;
    for (i, ch) in text.char_indices() {
        let space = ch.is_whitespace();
        match in_space {
            None => in_space = Some(space),
            Some(prev) if prev != space => {
                tokens.push(&text[start..i]);
                start = i;
                in_space = Some(space);
            }
            _ => {}
        }
    }
    if start < text.len() {
        tokens.push(&text[start..]);
    }
    tokens
}
