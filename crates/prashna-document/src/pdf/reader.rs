// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF reader: open a PDF and pull text out of its text layer using the
// `lopdf` crate.
//
// Two independent extraction paths are provided: lopdf's own whole-document
// extractor (font-encoding aware) and a page-by-page walk over each content
// stream's text-showing operators. The classifier consults both.

use std::path::{Path, PathBuf};

use lopdf::content::Content;
use lopdf::{Document, Object};
use prashna_core::error::PrashnaError;
use tracing::{debug, info, instrument, warn};

/// A `TJ` kerning adjustment below this value (thousandths of an em) is
/// treated as a word gap.
const TJ_SPACE_THRESHOLD: f32 = -200.0;

/// Reads the text layer of an existing PDF file.
pub struct PdfReader {
    /// The underlying lopdf document.
    document: Document,
    /// File the document was loaded from.
    source_path: PathBuf,
}

impl PdfReader {
    // -- Construction ---------------------------------------------------------

    /// Open a PDF from the filesystem.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self, PrashnaError> {
        let path_ref = path.as_ref();
        info!("Opening PDF: {}", path_ref.display());

        let document = Document::load(path_ref).map_err(|err| {
            PrashnaError::PdfError(format!("failed to open {}: {}", path_ref.display(), err))
        })?;

        debug!(pages = document.get_pages().len(), "PDF loaded");

        Ok(Self {
            document,
            source_path: path_ref.to_path_buf(),
        })
    }

    // -- Inspection -----------------------------------------------------------

    /// Number of pages in the document.
    pub fn page_count(&self) -> usize {
        self.document.get_pages().len()
    }

    /// 1-indexed page numbers in reading order.
    pub fn page_numbers(&self) -> Vec<u32> {
        self.document.get_pages().keys().copied().collect()
    }

    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    // -- Extraction -----------------------------------------------------------

    /// Extract the text of every page in one pass with lopdf's extractor.
    #[instrument(skip(self))]
    pub fn extract_text_stream(&self) -> Result<String, PrashnaError> {
        let pages = self.page_numbers();
        self.document
            .extract_text(&pages)
            .map_err(|err| PrashnaError::PdfError(format!("text stream extraction failed: {}", err)))
    }

    /// Extract the text of a single page (1-indexed) with lopdf's extractor.
    pub fn extract_page_text(&self, page_number: u32) -> Result<String, PrashnaError> {
        self.document.extract_text(&[page_number]).map_err(|err| {
            PrashnaError::PdfError(format!(
                "text extraction failed for page {}: {}",
                page_number, err
            ))
        })
    }

    /// Walk each page's content stream and collect the strings shown by the
    /// text operators, one entry per page in reading order.
    ///
    /// Line breaks are emitted on text-positioning operators, and large `TJ`
    /// kerning gaps become spaces.
    #[instrument(skip(self))]
    pub fn extract_text_by_structure(&self) -> Result<Vec<String>, PrashnaError> {
        let pages = self.document.get_pages();
        let mut texts = Vec::with_capacity(pages.len());

        for (page_number, page_id) in pages {
            let raw = self.document.get_page_content(page_id).map_err(|err| {
                PrashnaError::PdfError(format!(
                    "cannot read content of page {}: {}",
                    page_number, err
                ))
            })?;
            let content = Content::decode(&raw).map_err(|err| {
                PrashnaError::PdfError(format!(
                    "cannot decode content of page {}: {}",
                    page_number, err
                ))
            })?;

            let text = collect_shown_text(&content);
            debug!(page_number, chars = text.len(), "Page text collected");
            texts.push(text);
        }

        Ok(texts)
    }

    /// Per-page text for a text-native document.
    ///
    /// Prefers lopdf's extractor for each page and falls back to the content
    /// stream walk for pages it cannot handle.
    #[instrument(skip(self))]
    pub fn page_texts(&self) -> Result<Vec<String>, PrashnaError> {
        let structural = self.extract_text_by_structure().unwrap_or_else(|err| {
            warn!(%err, "Structure-aware extraction failed; relying on stream extractor");
            Vec::new()
        });

        let texts = self
            .page_numbers()
            .into_iter()
            .enumerate()
            .map(|(index, page_number)| match self.extract_page_text(page_number) {
                Ok(text) if !text.trim().is_empty() => text,
                Ok(_) | Err(_) => structural.get(index).cloned().unwrap_or_default(),
            })
            .collect();

        Ok(texts)
    }
}

/// Concatenate the strings shown by `Tj`, `TJ`, `'` and `"` operators.
fn collect_shown_text(content: &Content) -> String {
    let mut text = String::new();

    for operation in &content.operations {
        match operation.operator.as_str() {
            "Tj" => {
                if let Some(Object::String(bytes, _)) = operation.operands.first() {
                    text.push_str(&decode_pdf_string(bytes));
                }
            }
            "'" | "\"" => {
                text.push('\n');
                if let Some(Object::String(bytes, _)) = operation.operands.last() {
                    text.push_str(&decode_pdf_string(bytes));
                }
            }
            "TJ" => {
                if let Some(Object::Array(items)) = operation.operands.first() {
                    for item in items {
                        match item {
                            Object::String(bytes, _) => text.push_str(&decode_pdf_string(bytes)),
                            Object::Integer(gap) if (*gap as f32) < TJ_SPACE_THRESHOLD => {
                                text.push(' ')
                            }
                            Object::Real(gap) if *gap < TJ_SPACE_THRESHOLD => text.push(' '),
                            _ => {}
                        }
                    }
                }
            }
            "Td" | "TD" | "T*" | "ET" => {
                if !text.ends_with('\n') && !text.is_empty() {
                    text.push('\n');
                }
            }
            _ => {}
        }
    }

    text
}

/// Decode a PDF string operand: UTF-16BE when it carries a byte-order mark,
/// UTF-8 when valid, otherwise byte-per-character.
fn decode_pdf_string(bytes: &[u8]) -> String {
    if let Some(utf16) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = utf16
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        return String::from_utf16_lossy(&units);
    }
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => bytes.iter().map(|&b| b as char).collect(),
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::content::Operation;
    use lopdf::StringFormat;

    #[test]
    fn page_count_and_numbers() {
        let bytes = fixtures::pdf_with_pages(&[&["one"], &["two"], &["three"]]);
        let (dir, reader) = fixtures::open_pdf(&bytes);
        let reader = reader.unwrap();
        assert_eq!(reader.page_count(), 3);
        assert_eq!(reader.page_numbers(), vec![1, 2, 3]);
        assert_eq!(reader.source_path(), dir.path().join("fixture.pdf"));
    }

    #[test]
    fn structure_walk_keeps_lines_and_pages() {
        let bytes = fixtures::pdf_with_pages(&[&["1. Which planet?", "A) Mars"], &["B) Venus"]]);
        let (_dir, reader) = fixtures::open_pdf(&bytes);
        let reader = reader.unwrap();
        let pages = reader.extract_text_by_structure().unwrap();
        assert_eq!(pages.len(), 2);
        let first: Vec<&str> = pages[0].lines().collect();
        assert_eq!(first, ["1. Which planet?", "A) Mars"]);
        assert_eq!(pages[1].trim(), "B) Venus");
    }

    #[test]
    fn page_texts_has_one_entry_per_page() {
        let bytes = fixtures::pdf_with_pages(&[&["alpha"], &["beta"]]);
        let (_dir, reader) = fixtures::open_pdf(&bytes);
        let reader = reader.unwrap();
        let texts = reader.page_texts().unwrap();
        assert_eq!(texts.len(), 2);
        assert!(texts[0].contains("alpha"));
        assert!(texts[1].contains("beta"));
    }

    #[test]
    fn garbage_bytes_are_rejected() {
        let (_dir, result) = fixtures::open_pdf(b"definitely not a pdf");
        assert!(matches!(result, Err(PrashnaError::PdfError(_))));
    }

    #[test]
    fn tj_array_gaps_become_spaces() {
        let content = Content {
            operations: vec![Operation::new(
                "TJ",
                vec![Object::Array(vec![
                    Object::String(b"Jupi".to_vec(), StringFormat::Literal),
                    Object::Integer(-40),
                    Object::String(b"ter".to_vec(), StringFormat::Literal),
                    Object::Integer(-600),
                    Object::String(b"planet".to_vec(), StringFormat::Literal),
                ])],
            )],
        };
        assert_eq!(collect_shown_text(&content), "Jupiter planet");
    }

    #[test]
    fn decodes_utf16_with_bom() {
        // "कख" as UTF-16BE with BOM
        let bytes = [0xFE, 0xFF, 0x09, 0x15, 0x09, 0x16];
        assert_eq!(decode_pdf_string(&bytes), "कख");
        assert_eq!(decode_pdf_string(b"plain"), "plain");
        assert_eq!(decode_pdf_string(&[0x41, 0xE9]), "Aé");
    }
}
