// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// prashna-pipeline orchestrates one extraction run: classify the document,
// obtain text per page (direct extraction or rasterize → preprocess →
// recognize), normalize it, then parse questions and resolve answers.

pub mod pipeline;
pub mod scratch;

pub use pipeline::ExtractionPipeline;
pub use scratch::PageScratch;
