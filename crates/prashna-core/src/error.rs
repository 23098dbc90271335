// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Prashna.

use thiserror::Error;

/// Top-level error type for all Prashna operations.
///
/// Page-level variants (see [`PrashnaError::is_page_local`]) never abort a
/// document: the pipeline records them on the affected page and carries on.
#[derive(Debug, Error)]
pub enum PrashnaError {
    // -- Ingestion --
    #[error("unsupported document type: {0}")]
    UnsupportedDocument(String),

    #[error("document classification failed: {0}")]
    Classification(String),

    #[error("PDF operation failed: {0}")]
    PdfError(String),

    // -- Page pipeline --
    #[error("page rasterization failed: {0}")]
    Rasterization(String),

    #[error("image processing failed: {0}")]
    ImageError(String),

    #[error("image preprocessing failed: {0}")]
    Preprocessing(String),

    #[error("text recognition failed: {0}")]
    Recognition(String),

    #[error("text recognition timed out after {secs}s")]
    RecognitionTimeout { secs: u64 },

    #[error("no usable recognition: all {pages} page(s) failed")]
    NoUsableRecognition { pages: usize },

    // -- Configuration / persistence --
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl PrashnaError {
    /// Whether this error belongs to a single page rather than the whole document.
    pub fn is_page_local(&self) -> bool {
        matches!(
            self,
            Self::Rasterization(_)
                | Self::ImageError(_)
                | Self::Preprocessing(_)
                | Self::Recognition(_)
                | Self::RecognitionTimeout { .. }
        )
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, PrashnaError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_errors_are_page_local() {
        assert!(PrashnaError::Recognition("no engine".into()).is_page_local());
        assert!(PrashnaError::RecognitionTimeout { secs: 5 }.is_page_local());
        assert!(!PrashnaError::NoUsableRecognition { pages: 2 }.is_page_local());
        assert!(!PrashnaError::UnsupportedDocument("docx".into()).is_page_local());
    }

    #[test]
    fn timeout_message_names_the_limit() {
        let err = PrashnaError::RecognitionTimeout { secs: 30 };
        assert_eq!(err.to_string(), "text recognition timed out after 30s");
    }
}
