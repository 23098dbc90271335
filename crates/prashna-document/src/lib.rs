// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// prashna-document: Document side of the quiz extractor.
//
// Provides PDF text extraction and page rasterization, text-native vs scanned
// classification, a recognition-oriented preprocessing pipeline (binarization,
// deskew, crop, upscale), and optical character recognition with a
// confidence score.

pub mod classify;
pub mod pdf;
pub mod scan;

// Re-export the primary structs so callers can use `prashna_document::PdfReader` etc.
pub use classify::DocumentClassifier;
pub use pdf::raster::PageRasterizer;
pub use pdf::reader::PdfReader;
pub use scan::ocr::{RecognitionEngine, TesseractEngine, TextRecognizer};
pub use scan::preprocess::ImagePreprocessor;
