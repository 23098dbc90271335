// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Document classifier: decides whether a document's text can be read
// directly or has to go through the image pipeline, and splits it into pages.

use std::path::Path;

use prashna_core::error::PrashnaError;
use prashna_core::{ContentKind, Document, Page, PageSource, SourceFormat};
use tracing::{debug, info, instrument, warn};

use crate::pdf::reader::PdfReader;

/// An extraction must yield strictly more than this many non-whitespace
/// characters for the document to count as text-native.
pub const TEXT_NATIVE_MIN_CHARS: usize = 100;

/// Classifies input files and builds their [`Document`] records.
#[derive(Debug, Clone, Copy, Default)]
pub struct DocumentClassifier;

impl DocumentClassifier {
    pub fn new() -> Self {
        Self
    }

    /// Inspect `path` and produce a classified document.
    ///
    /// Image files are always scanned and form a single page. PDFs are probed
    /// with both text extractors. A PDF that cannot be parsed at all, or whose
    /// extractions both fail, is treated as scanned.
    #[instrument(skip_all, fields(path = %path.display()))]
    pub fn classify(&self, path: &Path) -> Result<Document, PrashnaError> {
        std::fs::metadata(path)?;

        let format = SourceFormat::from_path(path).ok_or_else(|| {
            PrashnaError::UnsupportedDocument(format!(
                "{} (expected a PDF or an image file)",
                path.display()
            ))
        })?;

        let document = match format {
            SourceFormat::Image => Document::new(
                path.to_path_buf(),
                format,
                ContentKind::Scanned,
                vec![Page {
                    index: 0,
                    source: PageSource::ImageFile(path.to_path_buf()),
                }],
            ),
            SourceFormat::Pdf => match PdfReader::open(path) {
                Ok(reader) => classify_pdf(&reader)?,
                Err(err) => unreadable_pdf(path, err),
            },
        };

        info!(
            kind = ?document.kind(),
            pages = document.pages().len(),
            "Document classified"
        );
        Ok(document)
    }
}

fn classify_pdf(reader: &PdfReader) -> Result<Document, PrashnaError> {
    debug!(
        path = %reader.source_path().display(),
        pages = reader.page_count(),
        "Probing text layer"
    );
    let stream = reader.extract_text_stream();
    let structured = reader
        .extract_text_by_structure()
        .map(|pages| pages.join("\n"));

    let kind = classify_from_extractions(stream, structured);

    let pages = match kind {
        ContentKind::TextNative => reader
            .page_texts()?
            .into_iter()
            .enumerate()
            .map(|(index, text)| Page {
                index,
                source: PageSource::Text(text),
            })
            .collect(),
        ContentKind::Scanned => reader
            .page_numbers()
            .into_iter()
            .enumerate()
            .map(|(index, number)| Page {
                index,
                source: PageSource::PdfPage(number),
            })
            .collect(),
    };

    Ok(Document::new(
        reader.source_path().to_path_buf(),
        SourceFormat::Pdf,
        kind,
        pages,
    ))
}

/// Both extractors fail when the PDF cannot be parsed, so the document is
/// scanned. Its page count is unknown until the rasterizer renders it.
fn unreadable_pdf(path: &Path, cause: PrashnaError) -> Document {
    let err = PrashnaError::Classification(format!("unreadable PDF: {}", cause));
    warn!(%err, "Defaulting to scanned");
    Document::new(
        path.to_path_buf(),
        SourceFormat::Pdf,
        ContentKind::Scanned,
        vec![Page {
            index: 0,
            source: PageSource::UnindexedPdf,
        }],
    )
}

/// Decide the content kind from the outcome of the two text extractors.
///
/// A failed extraction counts as "no text yielded". When both fail the
/// classification failure is logged and the document defaults to `Scanned`.
pub fn classify_from_extractions(
    stream: Result<String, PrashnaError>,
    structured: Result<String, PrashnaError>,
) -> ContentKind {
    let mut yields = Vec::with_capacity(2);
    let mut failures = Vec::new();

    for (method, outcome) in [("stream", stream), ("structure", structured)] {
        match outcome {
            Ok(text) => yields.push(non_whitespace_chars(&text)),
            Err(err) => {
                warn!(method, %err, "Text extraction failed");
                failures.push(err.to_string());
            }
        }
    }

    if yields.is_empty() {
        let err = PrashnaError::Classification(failures.join("; "));
        warn!(%err, "Defaulting to scanned");
        return ContentKind::Scanned;
    }

    if yields.iter().any(|&chars| chars > TEXT_NATIVE_MIN_CHARS) {
        ContentKind::TextNative
    } else {
        ContentKind::Scanned
    }
}

fn non_whitespace_chars(text: &str) -> usize {
    text.chars().filter(|c| !c.is_whitespace()).count()
}
