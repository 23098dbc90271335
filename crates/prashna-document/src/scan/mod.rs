// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scanning pipeline: recognition-oriented preprocessing and optical
// character recognition (OCR).

pub mod ocr;
pub mod preprocess;

pub use ocr::{RecognitionEngine, TesseractEngine, TextRecognizer};
pub use preprocess::ImagePreprocessor;
