// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Extraction pipeline: turns one input file into an `ExtractionReport`.
//
// Pages are handled strictly in order. Text-native pages are normalized
// directly. Scanned pages get a private scratch directory inside the run's
// work directory, are rasterized (PDF pages only; a PDF with an unreadable
// page tree is rendered whole and split afterwards), preprocessed on the
// blocking pool and recognized under a timeout. A page that fails in any of
// those steps degrades to empty text; only when every page degrades does the
// run fail.

use std::path::{Path, PathBuf};

use chrono::Utc;
use prashna_core::error::{PrashnaError, Result};
use prashna_core::{
    ContentKind, Document, ExtractionReport, Page, PageSource, PageSummary, PipelineConfig,
    Question, RecognizedText,
};
use prashna_document::scan::ocr::PageRecognition;
use prashna_document::{
    DocumentClassifier, ImagePreprocessor, PageRasterizer, RecognitionEngine, TesseractEngine,
    TextRecognizer,
};
use prashna_quiz::{extract_questions, normalize_text};
use tempfile::TempDir;
use tracing::{debug, info, instrument, warn};

use crate::scratch::PageScratch;

/// File name of the preprocessed image inside a page's scratch directory.
const PREPROCESSED_IMAGE: &str = "preprocessed.png";

/// Runs classification, recognition, normalization and parsing.
pub struct ExtractionPipeline<E: RecognitionEngine = TesseractEngine> {
    config: PipelineConfig,
    classifier: DocumentClassifier,
    rasterizer: PageRasterizer,
    recognizer: TextRecognizer<E>,
    /// Parent of the per-run work directory; the system temp dir when unset.
    scratch_root: Option<PathBuf>,
}

impl ExtractionPipeline<TesseractEngine> {
    /// Build a pipeline backed by the Tesseract binary named in `config`.
    pub fn new(config: PipelineConfig) -> Result<Self> {
        let recognizer = TextRecognizer::from_config(&config);
        Self::with_recognizer(config, recognizer)
    }
}

impl<E: RecognitionEngine> ExtractionPipeline<E> {
    /// Build a pipeline around a custom recognizer.
    pub fn with_recognizer(config: PipelineConfig, recognizer: TextRecognizer<E>) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            classifier: DocumentClassifier::new(),
            rasterizer: PageRasterizer::from_config(&config),
            recognizer,
            config,
            scratch_root: None,
        })
    }

    /// Create per-run work directories under `dir` instead of the system
    /// temp directory.
    pub fn with_scratch_root(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch_root = Some(dir.into());
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    // -- Entry points ---------------------------------------------------------

    /// Extract the question records from the file at `path`.
    pub async fn extract(&self, path: &Path) -> Result<Vec<Question>> {
        Ok(self.run(path).await?.questions)
    }

    /// Classify the file at `path` and run it through the pipeline.
    #[instrument(skip_all, fields(path = %path.display()))]
    pub async fn run(&self, path: &Path) -> Result<ExtractionReport> {
        let classifier = self.classifier;
        let owned = path.to_path_buf();
        let document = tokio::task::spawn_blocking(move || classifier.classify(&owned))
            .await
            .map_err(|err| PrashnaError::Classification(format!("classifier task failed: {}", err)))??;

        self.run_document(&document).await
    }

    /// Run an already classified document through the pipeline.
    #[instrument(skip_all, fields(document = %document.id(), kind = ?document.kind()))]
    pub async fn run_document(&self, document: &Document) -> Result<ExtractionReport> {
        let started_at = Utc::now();
        info!(
            pages = document.pages().len(),
            language = %self.config.language,
            "Extraction started"
        );

        let work_dir = self.work_dir()?;
        let mut recognized = Vec::with_capacity(document.pages().len());

        for page in document.pages() {
            let texts = match &page.source {
                PageSource::Text(raw) => {
                    vec![RecognizedText::extracted(page.index, normalize_text(raw))]
                }
                PageSource::PdfPage(_) | PageSource::ImageFile(_) => {
                    vec![self.recognize_page(document, page, work_dir.path()).await?]
                }
                PageSource::UnindexedPdf => {
                    self.recognize_unindexed(document, page, work_dir.path())
                        .await?
                }
            };
            for text in texts {
                debug!(
                    page = text.page_index,
                    confidence = text.confidence,
                    chars = text.text.chars().count(),
                    "Page done"
                );
                recognized.push(text);
            }
        }

        if recognized.iter().all(RecognizedText::is_failed) {
            return Err(PrashnaError::NoUsableRecognition {
                pages: recognized.len(),
            });
        }

        let combined = recognized
            .iter()
            .map(|page| page.text.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        let questions = extract_questions(&combined);

        let report = ExtractionReport {
            document_id: document.id(),
            kind: document.kind(),
            pages: recognized.iter().map(PageSummary::from).collect(),
            questions,
            started_at,
            finished_at: Utc::now(),
        };

        info!(
            questions = report.questions.len(),
            failed_pages = report.failed_pages(),
            confidence = report.mean_confidence(),
            "Extraction finished"
        );
        Ok(report)
    }

    // -- Scanned pages --------------------------------------------------------

    fn work_dir(&self) -> Result<TempDir> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("prashna-");
        let dir = match &self.scratch_root {
            Some(root) => builder.tempdir_in(root)?,
            None => builder.tempdir()?,
        };
        Ok(dir)
    }

    /// Recognize one scanned page. Page-local failures degrade the page;
    /// anything else aborts the run.
    async fn recognize_page(
        &self,
        document: &Document,
        page: &Page,
        work_dir: &Path,
    ) -> Result<RecognizedText> {
        let scratch = PageScratch::acquire(work_dir, page.index)?;

        let outcome = match self.recognize_in(document, page, &scratch).await {
            Ok(PageRecognition {
                error: Some(err), ..
            })
            | Err(err)
                if err.is_page_local() =>
            {
                warn!(page = page.index, %err, "Page degraded to empty text");
                Ok(RecognizedText::failed(page.index, err.to_string()))
            }
            Ok(recognition) => Ok(RecognizedText {
                page_index: page.index,
                text: normalize_text(&recognition.text),
                confidence: recognition.confidence,
                failure: recognition.error.map(|err| err.to_string()),
            }),
            Err(err) => Err(err),
        };

        if let Err(err) = scratch.release() {
            warn!(page = page.index, %err, "Failed to remove page scratch");
        }
        outcome
    }

    /// Render a PDF with an unreadable page tree in one pass, then recognize
    /// each rendered image as its own page. A failed render degrades to a
    /// single empty page.
    async fn recognize_unindexed(
        &self,
        document: &Document,
        page: &Page,
        work_dir: &Path,
    ) -> Result<Vec<RecognizedText>> {
        let render = PageScratch::acquire(work_dir, page.index)?;
        let outcome = self.recognize_rendered(document, page, &render, work_dir).await;
        if let Err(err) = render.release() {
            warn!(page = page.index, %err, "Failed to remove render scratch");
        }
        outcome
    }

    async fn recognize_rendered(
        &self,
        document: &Document,
        page: &Page,
        render: &PageScratch,
        work_dir: &Path,
    ) -> Result<Vec<RecognizedText>> {
        let images = match self
            .rasterizer
            .rasterize_all(document.path(), render.path())
            .await
        {
            Ok(images) => images,
            Err(err) if err.is_page_local() => {
                warn!(page = page.index, %err, "Document render degraded to empty text");
                return Ok(vec![RecognizedText::failed(page.index, err.to_string())]);
            }
            Err(err) => return Err(err),
        };

        let mut texts = Vec::with_capacity(images.len());
        for (offset, image) in images.into_iter().enumerate() {
            let rendered = Page {
                index: page.index + offset,
                source: PageSource::ImageFile(image),
            };
            texts.push(self.recognize_page(document, &rendered, work_dir).await?);
        }
        Ok(texts)
    }

    async fn recognize_in(
        &self,
        document: &Document,
        page: &Page,
        scratch: &PageScratch,
    ) -> Result<PageRecognition> {
        let raster = match &page.source {
            PageSource::PdfPage(number) => {
                self.rasterizer
                    .rasterize(document.path(), *number, scratch.path())
                    .await?
            }
            PageSource::ImageFile(image) => image.clone(),
            PageSource::Text(_) | PageSource::UnindexedPdf => {
                return Err(PrashnaError::Preprocessing(format!(
                    "page {} has no single image",
                    page.index
                )));
            }
        };
        debug!(page = scratch.page_index(), image = %raster.display(), "Preprocessing page");

        let prepped = scratch.file(PREPROCESSED_IMAGE);
        let output = prepped.clone();
        let enhance = self.config.enhance;
        tokio::task::spawn_blocking(move || {
            ImagePreprocessor::process_file(&raster, &output, enhance)
        })
        .await
        .map_err(|err| PrashnaError::Preprocessing(format!("preprocessing task failed: {}", err)))??;

        Ok(self.recognizer.recognize(&prepped, &self.config.language).await)
    }
}
