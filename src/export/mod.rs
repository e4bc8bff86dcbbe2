//! PDF export
//!
//! Selected records are laid out as a flat sequence of text lines and
//! composed into an A4 document with printpdf. `Questions` mode renders only
//! the question text; `Full` mode appends tags and analysis when present.
//!
//! Question text is Chinese, so the builtin WinAnsi fonts are useless here;
//! a Noto Sans SC face is bundled and embedded into every document.

use std::io::Cursor;

use printpdf::{Mm, PdfDocument};

use crate::db::Mistake;
use crate::error::{AppError, Result};

/// Embedded CJK-capable face (SIL OFL, see assets/fonts/OFL.txt)
const FONT_BYTES: &[u8] = include_bytes!("../../assets/fonts/NotoSansSC-Regular.ttf");

/// What the exported document includes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportMode {
    /// Question text only
    Questions,
    /// Questions plus tags and analysis
    Full,
}

impl ExportMode {
    pub fn parse(mode: &str) -> Option<Self> {
        match mode {
            "questions" => Some(ExportMode::Questions),
            "full" => Some(ExportMode::Full),
            _ => None,
        }
    }
}

const PAGE_WIDTH_MM: f32 = 210.0;
const PAGE_HEIGHT_MM: f32 = 297.0;
const MARGIN_MM: f32 = 15.0;
const LINE_HEIGHT_MM: f32 = 6.0;
const FONT_SIZE_PT: f32 = 11.0;
// Column budget per line; a full-width CJK glyph spends two columns
const WRAP_COLUMNS: usize = 84;

/// Compose the export document for the given records
pub fn export_pdf(mistakes: &[Mistake], mode: ExportMode) -> Result<Vec<u8>> {
    let lines = render_lines(mistakes, mode);
    build_pdf("错题导出", &lines)
}

/// Lay records out as text lines; separated so tests can check content
/// without decoding a PDF.
pub fn render_lines(mistakes: &[Mistake], mode: ExportMode) -> Vec<String> {
    let mut lines = Vec::new();

    for (index, mistake) in mistakes.iter().enumerate() {
        lines.push(format!("{}. [{}]", index + 1, mistake.created_at));
        for line in mistake.content.lines() {
            lines.extend(wrap(line));
        }

        if mode == ExportMode::Full {
            let tags = mistake.tag_list();
            if !tags.is_empty() {
                lines.push(format!("知识点: {}", tags.join("、")));
            }
            if let Some(analysis) = &mistake.analysis {
                lines.push("解析:".to_string());
                for line in analysis.lines() {
                    lines.extend(wrap(line));
                }
            }
        }

        lines.push(String::new());
    }

    lines
}

/// Columns a glyph occupies; CJK and full-width forms take two
fn glyph_columns(c: char) -> usize {
    match c as u32 {
        0x1100..=0x115F | 0x2E80..=0x9FFF | 0xAC00..=0xD7A3 | 0xF900..=0xFAFF
        | 0xFE30..=0xFE4F | 0xFF00..=0xFF60 | 0x20000..=0x3FFFF => 2,
        _ => 1,
    }
}

/// Naive column wrap; good enough for question text
fn wrap(line: &str) -> Vec<String> {
    if line.is_empty() {
        return vec![String::new()];
    }

    let mut out = Vec::new();
    let mut current = String::new();
    let mut columns = 0;
    for c in line.chars() {
        let width = glyph_columns(c);
        if columns + width > WRAP_COLUMNS && !current.is_empty() {
            out.push(std::mem::take(&mut current));
            columns = 0;
        }
        current.push(c);
        columns += width;
    }
    if !current.is_empty() {
        out.push(current);
    }
    out
}

/// Compose the wrapped lines into PDF bytes
fn build_pdf(title: &str, lines: &[String]) -> Result<Vec<u8>> {
    let (doc, first_page, first_layer) = PdfDocument::new(
        title,
        Mm(PAGE_WIDTH_MM.into()),
        Mm(PAGE_HEIGHT_MM.into()),
        "content",
    );
    let font = doc
        .add_external_font(Cursor::new(FONT_BYTES))
        .map_err(|e| AppError::Pdf(e.to_string()))?;

    let mut layer = doc.get_page(first_page).get_layer(first_layer);
    let mut y = PAGE_HEIGHT_MM - MARGIN_MM;

    for line in lines {
        if y < MARGIN_MM {
            let (page, new_layer) = doc.add_page(
                Mm(PAGE_WIDTH_MM.into()),
                Mm(PAGE_HEIGHT_MM.into()),
                "content",
            );
            layer = doc.get_page(page).get_layer(new_layer);
            y = PAGE_HEIGHT_MM - MARGIN_MM;
        }

        if !line.is_empty() {
            layer.use_text(
                line.clone(),
                FONT_SIZE_PT.into(),
                Mm(MARGIN_MM.into()),
                Mm(y.into()),
                &font,
            );
        }
        y -= LINE_HEIGHT_MM;
    }

    doc.save_to_bytes().map_err(|e| AppError::Pdf(e.to_string()))
}
