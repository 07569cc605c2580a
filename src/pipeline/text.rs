//! Full-text extraction: one UTF-8 text file per PDF page.
//!
//! pdfium returns page text with Windows line endings, trailing blanks and
//! the odd zero-width character picked up from the PDF's text layer. The
//! clean-up rules below are deterministic string passes applied before the
//! text is written; [`crate::GenerationConfig::clean_text`] turns them off.

use crate::error::FulltextError;
use crate::pipeline::page_file_name;
use once_cell::sync::Lazy;
use pdfium_render::prelude::*;
use regex::Regex;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Extract the text of every page of `source` into `text_dir`.
pub fn write_full_text(
    pdfium: &Pdfium,
    source: &Path,
    text_dir: &Path,
    first_page: u32,
    clean: bool,
) -> Result<Vec<PathBuf>, FulltextError> {
    let document = pdfium
        .load_pdf_from_file(source, None)
        .map_err(|e| FulltextError::PdfRead {
            path: source.to_path_buf(),
            detail: format!("{:?}", e),
        })?;

    let mut written = Vec::new();
    for (offset, page) in document.pages().iter().enumerate() {
        let raw = page
            .text()
            .map_err(|e| FulltextError::PdfRead {
                path: source.to_path_buf(),
                detail: format!("page {}: {:?}", offset + 1, e),
            })?
            .all();
        let content = if clean { clean_text(&raw) } else { raw };

        let path = text_dir.join(page_file_name(first_page + offset as u32, "txt"));
        std::fs::write(&path, content.as_bytes()).map_err(|e| FulltextError::PdfWrite {
            path: path.clone(),
            detail: e.to_string(),
        })?;
        debug!("Wrote {} ({} bytes)", path.display(), content.len());
        written.push(path);
    }

    Ok(written)
}

/// Apply all clean-up rules to extracted page text.
///
/// 1. Normalise line endings (CRLF/CR → LF)
/// 2. Strip invisible Unicode (zero-width spaces, BOM, soft hyphens)
/// 3. Trim trailing whitespace per line
/// 4. Collapse 3+ consecutive blank lines down to 2
/// 5. End with exactly one newline (empty pages stay empty)
pub fn clean_text(input: &str) -> String {
    let s = normalise_line_endings(input);
    let s = remove_invisible_chars(&s);
    let s = trim_trailing_whitespace(&s);
    let s = collapse_blank_lines(&s);
    ensure_final_newline(&s)
}

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

const INVISIBLE: &[char] = &['\u{200B}', '\u{200C}', '\u{200D}', '\u{2060}', '\u{FEFF}', '\u{00AD}'];

fn remove_invisible_chars(input: &str) -> String {
    input.chars().filter(|c| !INVISIBLE.contains(c)).collect()
}

fn trim_trailing_whitespace(input: &str) -> String {
    input
        .lines()
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n")
}

static BLANK_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{4,}").unwrap());

fn collapse_blank_lines(input: &str) -> String {
    BLANK_RUN.replace_all(input, "\n\n\n").into_owned()
}

fn ensure_final_newline(input: &str) -> String {
    let trimmed = input.trim_end_matches('\n');
    if trimmed.trim().is_empty() {
        String::new()
    } else {
        format!("{trimmed}\n")
    }
}
