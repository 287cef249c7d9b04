//! Paginated PDF rendering of parsed messages.
//!
//! The layout mirrors a printed delivery notice: a header block with the
//! bold-labelled `Oggetto:`/`Da:`/`A:`/`Data:` lines, an underscore rule,
//! the message body one paragraph per line, and, when the message carries
//! attachments, an inventory table followed by the delivery footer.

pub mod font;
pub mod markup;
pub mod page;

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use chrono::Local;

use crate::error::{ConvertError, Result};
use crate::model::{AttachmentRecord, ParsedMessage};
use font::FontStyle;
use markup::Span;
use page::{PageComposer, CM, CONTENT_WIDTH, MARGIN};

const BODY_SIZE: f32 = 10.0;
const BODY_LEADING: f32 = 12.0;
const HEADING_SIZE: f32 = 14.0;
const HEADING_LEADING: f32 = 17.0;
const FOOTER_SIZE: f32 = 9.0;
const FOOTER_LEADING: f32 = 12.0;

const TABLE_HEADER_SIZE: f32 = 10.0;
const TABLE_ROW_SIZE: f32 = 9.0;
const CELL_LEADING: f32 = 12.0;
const CELL_PADDING: f32 = 6.0;
const GRID_WIDTH: f32 = 0.5;
const HEADER_BACKGROUND: f32 = 0.827451;

const FILENAME_COL: f32 = 12.0 * CM;
const SIZE_COL: f32 = 3.0 * CM;

/// Renders `message` as a PDF document into `out`.
pub fn render_pdf(message: &ParsedMessage, out: &mut impl Write) -> Result<()> {
    let mut composer = PageComposer::new();

    paragraph(
        &mut composer,
        &format!("<b>Oggetto:</b> {}", message.subject),
        BODY_SIZE,
        BODY_LEADING,
        0.0,
    );
    composer.advance(0.3 * CM);
    paragraph(
        &mut composer,
        &format!("<b>Da:</b> {}", message.sender),
        BODY_SIZE,
        BODY_LEADING,
        0.0,
    );
    composer.advance(0.2 * CM);
    paragraph(
        &mut composer,
        &format!("<b>A:</b> {}", message.recipient),
        BODY_SIZE,
        BODY_LEADING,
        0.0,
    );
    composer.advance(0.2 * CM);
    paragraph(
        &mut composer,
        &format!("<b>Data:</b> {}", message.date),
        BODY_SIZE,
        BODY_LEADING,
        0.0,
    );
    composer.advance(0.5 * CM);

    rule(&mut composer);
    composer.advance(0.5 * CM);

    for line in message.body.lines() {
        let line = line.trim();
        if !line.is_empty() {
            paragraph(
                &mut composer,
                &markup::escape_markup(line),
                BODY_SIZE,
                BODY_LEADING,
                0.0,
            );
        }
        composer.advance(0.2 * CM);
    }

    if !message.attachments.is_empty() {
        composer.advance(1.0 * CM);
        rule(&mut composer);
        composer.advance(0.5 * CM);
        paragraph(
            &mut composer,
            "<b>— Allegati: —</b>",
            HEADING_SIZE,
            HEADING_LEADING,
            0.0,
        );
        composer.advance(0.3 * CM);
        attachment_table(&mut composer, &message.attachments);
        composer.advance(0.5 * CM);
        paragraph(
            &mut composer,
            "<i>CONSEGNA: Notificazione ai sensi della legge n. 53 del 1994</i>",
            FOOTER_SIZE,
            FOOTER_LEADING,
            0.5 * CM,
        );
        composer.advance(0.2 * CM);
        let today = Local::now().format("%d/%m/%Y");
        paragraph(
            &mut composer,
            &format!("<i>Data: {today}</i>"),
            FOOTER_SIZE,
            FOOTER_LEADING,
            0.5 * CM,
        );
    }

    composer.write_document(out)
}

/// Renders `message` to a file, removing the partial output on failure.
pub fn render_pdf_file(message: &ParsedMessage, path: &Path) -> Result<()> {
    let file = File::create(path).map_err(|e| ConvertError::io(path, e))?;
    let mut writer = BufWriter::new(file);
    let result = render_pdf(message, &mut writer)
        .and_then(|()| writer.flush().map_err(|e| ConvertError::io(path, e)));
    if let Err(err) = result {
        drop(writer);
        let _ = fs::remove_file(path);
        return Err(err);
    }
    Ok(())
}

/// Parses the mini-markup, wraps and draws the resulting lines.
fn paragraph(composer: &mut PageComposer, text: &str, size: f32, leading: f32, indent: f32) {
    let spans = markup::parse_markup(text);
    for line in page::wrap_spans(&spans, size, CONTENT_WIDTH - indent) {
        composer.text_line(indent, &line, size, leading);
    }
}

/// The underscore rule separating header, body and attachment sections.
fn rule(composer: &mut PageComposer) {
    let spans = vec![Span {
        text: "_".repeat(80),
        style: FontStyle::Regular,
    }];
    composer.text_line(0.0, &spans, BODY_SIZE, BODY_LEADING);
}

fn attachment_table(composer: &mut PageComposer, attachments: &[AttachmentRecord]) {
    table_row(composer, "Nome file", "Dimensione", true);
    for attachment in attachments {
        table_row(composer, &attachment.filename, &attachment.size, false);
    }
}

/// Draws one table row: filename cell left-aligned, size cell
/// right-aligned, both vertically centred. Rows never split across
/// pages; a row that does not fit moves to the next page whole.
fn table_row(composer: &mut PageComposer, name: &str, size_text: &str, header: bool) {
    let (style, font_size, pad_bottom) = if header {
        (FontStyle::Bold, TABLE_HEADER_SIZE, 6.0)
    } else {
        (FontStyle::Regular, TABLE_ROW_SIZE, 3.0)
    };
    let pad_top = 3.0;

    let name_spans = vec![Span {
        text: name.to_string(),
        style,
    }];
    let size_spans = vec![Span {
        text: size_text.to_string(),
        style,
    }];
    let name_lines = page::wrap_spans(&name_spans, font_size, FILENAME_COL - 2.0 * CELL_PADDING);
    let size_lines = page::wrap_spans(&size_spans, font_size, SIZE_COL - 2.0 * CELL_PADDING);

    let name_height = name_lines.len() as f32 * CELL_LEADING;
    let size_height = size_lines.len() as f32 * CELL_LEADING;
    let content_height = name_height.max(size_height);
    let row_height = content_height + pad_top + pad_bottom;

    composer.ensure_room(row_height);
    let top = composer.cursor();
    let bottom = top - row_height;

    if header {
        composer.fill_rect(
            MARGIN,
            bottom,
            FILENAME_COL + SIZE_COL,
            row_height,
            HEADER_BACKGROUND,
        );
    }
    composer.stroke_rect(MARGIN, bottom, FILENAME_COL, row_height, GRID_WIDTH);
    composer.stroke_rect(MARGIN + FILENAME_COL, bottom, SIZE_COL, row_height, GRID_WIDTH);

    let name_top = top - pad_top - (content_height - name_height) / 2.0;
    for (i, line) in name_lines.iter().enumerate() {
        let baseline = name_top - font_size - i as f32 * CELL_LEADING;
        composer.text_at(MARGIN + CELL_PADDING, baseline, line, font_size);
    }

    let size_top = top - pad_top - (content_height - size_height) / 2.0;
    for (i, line) in size_lines.iter().enumerate() {
        let width = line_width(line, font_size);
        let baseline = size_top - font_size - i as f32 * CELL_LEADING;
        composer.text_at(
            MARGIN + FILENAME_COL + SIZE_COL - CELL_PADDING - width,
            baseline,
            line,
            font_size,
        );
    }

    composer.advance(row_height);
}

fn line_width(spans: &[Span], size: f32) -> f32 {
    spans
        .iter()
        .map(|s| font::text_width(&s.text, s.style, size))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::Document;

    fn message_without_attachments() -> ParsedMessage {
        ParsedMessage {
            subject: "Saluti".to_string(),
            sender: "mario@esempio.it".to_string(),
            recipient: "anna@esempio.it".to_string(),
            date: "Thu, 04 Jan 2024 10:00:00 +0100".to_string(),
            body: "Prima riga.\n\nSeconda riga.".to_string(),
            attachments: Vec::new(),
        }
    }

    fn rendered_text(message: &ParsedMessage) -> String {
        let mut buffer = Vec::new();
        render_pdf(message, &mut buffer).unwrap();
        let doc = Document::load_mem(&buffer).unwrap();
        let pages: Vec<u32> = (1..=doc.get_pages().len() as u32).collect();
        doc.extract_text(&pages).unwrap()
    }

    // ─── Test 1: the underscore rule fits on a single line ───
    #[test]
    fn test_rule_fits_one_line() {
        let spans = vec![Span {
            text: "_".repeat(80),
            style: FontStyle::Regular,
        }];
        let lines = page::wrap_spans(&spans, BODY_SIZE, CONTENT_WIDTH);
        assert_eq!(lines.len(), 1);
    }

    // ─── Test 2: header block and body come through, no table ───
    #[test]
    fn test_render_without_attachments() {
        let text = rendered_text(&message_without_attachments());
        assert!(text.contains("Oggetto:"));
        assert!(text.contains("Saluti"));
        assert!(text.contains("Prima riga."));
        assert!(text.contains("Seconda riga."));
        assert!(!text.contains("Nome file"));
        assert!(!text.contains("Allegati"));
        assert!(!text.contains("CONSEGNA"));
    }

    // ─── Test 3: attachment section renders heading, table and footer ───
    #[test]
    fn test_render_with_attachments() {
        let mut message = message_without_attachments();
        message.attachments.push(AttachmentRecord {
            filename: "relazione.pdf".to_string(),
            size: "16 B".to_string(),
            content_type: "application/pdf".to_string(),
        });
        let text = rendered_text(&message);
        assert!(text.contains("Allegati"));
        assert!(text.contains("Nome file"));
        assert!(text.contains("Dimensione"));
        assert!(text.contains("relazione.pdf"));
        assert!(text.contains("16 B"));
        assert!(text.contains("CONSEGNA: Notificazione ai sensi della legge n. 53 del 1994"));
        assert!(text.contains("Data:"));
    }

    // ─── Test 4: markup in body text renders literally ───
    #[test]
    fn test_body_markup_is_literal() {
        let mut message = message_without_attachments();
        message.body = "testo con <b>tag</b> & parentesi".to_string();
        let text = rendered_text(&message);
        assert!(text.contains("<b>tag</b>"));
        assert!(text.contains("&"));
    }
}
