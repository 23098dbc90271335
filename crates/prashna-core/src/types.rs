// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the Prashna quiz extractor.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for an ingested document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentId(pub Uuid);

impl DocumentId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for DocumentId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for DocumentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// File formats accepted at ingestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceFormat {
    Pdf,
    /// A photo or scan readable by the `image` crate.
    Image,
}

impl SourceFormat {
    /// Infer the source format from a file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "pdf" => Some(Self::Pdf),
            "png" | "jpg" | "jpeg" | "tif" | "tiff" | "bmp" | "webp" => Some(Self::Image),
            _ => None,
        }
    }

    /// Infer the source format from a path's extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }
}

/// How the text of a document is obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ContentKind {
    /// The document carries an extractable text layer.
    TextNative,
    /// The document must go through the image pipeline.
    Scanned,
}

/// Where the raw content of a page lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageSource {
    /// Text pulled straight from the PDF text layer.
    Text(String),
    /// A 1-indexed page of a scanned PDF, rasterized on demand.
    PdfPage(u32),
    /// A whole PDF whose page tree could not be read. It is rasterized in one
    /// pass and every rendered image becomes a page of its own.
    UnindexedPdf,
    /// A standalone image file (the whole document is one photo).
    ImageFile(PathBuf),
}

/// One unit of recognizable content, owned by its [`Document`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    /// 0-based position in reading order.
    pub index: usize,
    pub source: PageSource,
}

/// An ingested, classified input file.
///
/// Immutable after construction: the classifier decides the content kind and
/// page list once.
#[derive(Debug, Clone)]
pub struct Document {
    id: DocumentId,
    path: PathBuf,
    format: SourceFormat,
    kind: ContentKind,
    pages: Vec<Page>,
}

impl Document {
    pub fn new(path: PathBuf, format: SourceFormat, kind: ContentKind, pages: Vec<Page>) -> Self {
        Self {
            id: DocumentId::new(),
            path,
            format,
            kind,
            pages,
        }
    }

    pub fn id(&self) -> DocumentId {
        self.id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn format(&self) -> SourceFormat {
        self.format
    }

    pub fn kind(&self) -> ContentKind {
        self.kind
    }

    pub fn pages(&self) -> &[Page] {
        &self.pages
    }
}

/// Normalized text for one page plus the recognizer's confidence in it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecognizedText {
    pub page_index: usize,
    pub text: String,
    /// 0–100.
    pub confidence: f32,
    /// Why the page degraded to empty text, if it did.
    pub failure: Option<String>,
}

impl RecognizedText {
    /// A page whose text came from the PDF text layer.
    pub fn extracted(page_index: usize, text: String) -> Self {
        Self {
            page_index,
            text,
            confidence: 100.0,
            failure: None,
        }
    }

    /// A page that could not be recognized.
    pub fn failed(page_index: usize, reason: impl Into<String>) -> Self {
        Self {
            page_index,
            text: String::new(),
            confidence: 0.0,
            failure: Some(reason.into()),
        }
    }

    pub fn is_failed(&self) -> bool {
        self.failure.is_some()
    }
}

/// Canonical answer letter, A through H.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AnswerLetter {
    A,
    B,
    C,
    D,
    E,
    F,
    G,
    H,
}

impl AnswerLetter {
    pub const ALL: [AnswerLetter; 8] = [
        Self::A,
        Self::B,
        Self::C,
        Self::D,
        Self::E,
        Self::F,
        Self::G,
        Self::H,
    ];

    /// Letter implied by an option's 0-based position.
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// 0-based option position this letter points at.
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn as_char(self) -> char {
        (b'A' + self as u8) as char
    }
}

impl std::fmt::Display for AnswerLetter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// One extracted multiple-choice question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    /// Numbering token exactly as it appeared (`1`, `१२`, ...).
    pub number: String,
    pub text: String,
    pub options: Vec<String>,
    pub correct_answer: Option<AnswerLetter>,
}

impl Question {
    /// Letter implied by the option at `index`.
    pub fn option_letter(&self, index: usize) -> Option<AnswerLetter> {
        if index < self.options.len() {
            AnswerLetter::from_index(index)
        } else {
            None
        }
    }

    /// Text of the option the resolved answer points at, if both exist.
    pub fn correct_option(&self) -> Option<&str> {
        self.correct_answer
            .and_then(|letter| self.options.get(letter.index()))
            .map(String::as_str)
    }
}

/// Result of running the pipeline over one document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionReport {
    pub document_id: DocumentId,
    pub kind: ContentKind,
    /// Per-page results in reading order, with text elided to save space.
    pub pages: Vec<PageSummary>,
    pub questions: Vec<Question>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl ExtractionReport {
    /// Mean confidence across pages that produced text; 0 when none did.
    pub fn mean_confidence(&self) -> f32 {
        let usable: Vec<f32> = self
            .pages
            .iter()
            .filter(|page| page.failure.is_none())
            .map(|page| page.confidence)
            .collect();
        if usable.is_empty() {
            return 0.0;
        }
        usable.iter().sum::<f32>() / usable.len() as f32
    }

    /// Number of pages that degraded to empty text.
    pub fn failed_pages(&self) -> usize {
        self.pages.iter().filter(|page| page.failure.is_some()).count()
    }
}

/// Page-level outcome recorded in an [`ExtractionReport`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageSummary {
    pub page_index: usize,
    pub confidence: f32,
    pub chars: usize,
    pub failure: Option<String>,
}

impl From<&RecognizedText> for PageSummary {
    fn from(page: &RecognizedText) -> Self {
        Self {
            page_index: page.page_index,
            confidence: page.confidence,
            chars: page.text.chars().count(),
            failure: page.failure.clone(),
        }
    }
}
