// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// OCR (Optical Character Recognition) for preprocessed quiz pages.
//
// Recognition goes through the `RecognitionEngine` trait. The shipped engine
// drives the Tesseract command-line binary in TSV mode, which returns the page
// text and a confidence per word in one pass:
//
// ```sh
// tesseract page.png stdout -l hin --oem 3 --psm 6 tsv
// ```
//
// `--oem 3` selects the LSTM engine and `--psm 6` treats the page as a single
// uniform block of text. Language models (`hin.traineddata`) must be
// installed on the host, e.g. via the `tesseract-ocr-hin` package.
//
// `TextRecognizer` wraps an engine with a timeout and turns every failure
// into an empty, zero-confidence result so that one bad page never aborts a
// document.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use prashna_core::PipelineConfig;
use prashna_core::error::PrashnaError;
use tokio::process::Command;
use tracing::{debug, info, instrument, warn};

/// Engine mode: LSTM only.
const OEM_LSTM: &str = "3";
/// Page segmentation: a single uniform block of text.
const PSM_SINGLE_BLOCK: &str = "6";
/// Confidence reported by Tesseract for rows that are not words.
const NO_CONFIDENCE: f32 = -1.0;
/// TSV `level` value of word rows.
const WORD_LEVEL: u32 = 5;

// -- Engine seam ----------------------------------------------------------------

/// A recognized word and the engine's confidence in it (0–100, or -1).
#[derive(Debug, Clone, PartialEq)]
pub struct TokenConfidence {
    pub text: String,
    pub confidence: f32,
}

/// Raw engine output before scoring.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRecognition {
    pub text: String,
    pub tokens: Vec<TokenConfidence>,
}

/// An optical character recognition backend.
pub trait RecognitionEngine: Send + Sync {
    /// Recognize the text in the image at `image` using the `language` model.
    fn recognize(
        &self,
        image: &Path,
        language: &str,
    ) -> impl Future<Output = Result<RawRecognition, PrashnaError>> + Send;
}

// -- Tesseract ------------------------------------------------------------------

/// Runs the `tesseract` binary as a child process.
#[derive(Debug, Clone)]
pub struct TesseractEngine {
    bin: PathBuf,
}

impl Default for TesseractEngine {
    fn default() -> Self {
        Self::new("tesseract")
    }
}

impl TesseractEngine {
    pub fn new(bin: impl Into<PathBuf>) -> Self {
        Self { bin: bin.into() }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(config.tesseract_bin.clone())
    }

    pub fn bin(&self) -> &Path {
        &self.bin
    }

    /// Language models installed for this Tesseract binary.
    #[instrument(skip(self))]
    pub async fn available_languages(&self) -> Result<Vec<String>, PrashnaError> {
        let output = Command::new(&self.bin)
            .arg("--list-langs")
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|err| self.spawn_error(err))?;

        // Older releases print the list on stderr.
        let mut listing = String::from_utf8_lossy(&output.stdout).into_owned();
        listing.push_str(&String::from_utf8_lossy(&output.stderr));
        Ok(parse_language_list(&listing))
    }

    fn spawn_error(&self, err: std::io::Error) -> PrashnaError {
        PrashnaError::Recognition(format!(
            "cannot run tesseract binary {}: {}",
            self.bin.display(),
            err
        ))
    }
}

impl RecognitionEngine for TesseractEngine {
    #[instrument(skip_all, fields(image = %image.display(), language = %language))]
    async fn recognize(&self, image: &Path, language: &str) -> Result<RawRecognition, PrashnaError> {
        let output = Command::new(&self.bin)
            .arg(image)
            .arg("stdout")
            .arg("-l")
            .arg(language)
            .arg("--oem")
            .arg(OEM_LSTM)
            .arg("--psm")
            .arg(PSM_SINGLE_BLOCK)
            .arg("tsv")
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|err| self.spawn_error(err))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(PrashnaError::Recognition(format!(
                "tesseract exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        let tsv = String::from_utf8_lossy(&output.stdout);
        let recognition = parse_tsv(&tsv);
        debug!(
            tokens = recognition.tokens.len(),
            chars = recognition.text.chars().count(),
            "Tesseract output parsed"
        );
        Ok(recognition)
    }
}

/// Parse Tesseract's TSV output into page text and word confidences.
///
/// Words on the same (block, paragraph, line) are space-joined, lines are
/// separated by a newline and blocks by a blank line.
pub fn parse_tsv(tsv: &str) -> RawRecognition {
    let mut text = String::new();
    let mut tokens = Vec::new();
    let mut current_line: Option<(u32, u32, u32)> = None;

    for row in tsv.lines().skip(1) {
        let columns: Vec<&str> = row.split('\t').collect();
        if columns.len() < 11 {
            continue;
        }
        let number = |i: usize| columns[i].trim().parse::<u32>().ok();
        if number(0) != Some(WORD_LEVEL) {
            continue;
        }
        let (Some(block), Some(par), Some(line)) = (number(2), number(3), number(4)) else {
            continue;
        };
        let confidence = columns[10].trim().parse::<f32>().unwrap_or(NO_CONFIDENCE);
        let word = columns.get(11).copied().unwrap_or("");

        tokens.push(TokenConfidence {
            text: word.to_string(),
            confidence,
        });

        if word.trim().is_empty() {
            continue;
        }
        match current_line {
            Some(key) if key == (block, par, line) => text.push(' '),
            Some((previous_block, _, _)) if previous_block != block => text.push_str("\n\n"),
            Some(_) => text.push('\n'),
            None => {}
        }
        current_line = Some((block, par, line));
        text.push_str(word);
    }

    RawRecognition { text, tokens }
}

/// Arithmetic mean of word confidences, rounded to two decimals.
///
/// Tokens with the `-1` sentinel or whitespace-only text are excluded; the
/// result is 0 when nothing qualifies.
pub fn mean_confidence(tokens: &[TokenConfidence]) -> f32 {
    let scores: Vec<f32> = tokens
        .iter()
        .filter(|token| token.confidence != NO_CONFIDENCE && !token.text.trim().is_empty())
        .map(|token| token.confidence)
        .collect();

    if scores.is_empty() {
        return 0.0;
    }
    let mean = scores.iter().sum::<f32>() / scores.len() as f32;
    (mean * 100.0).round() / 100.0
}

fn parse_language_list(listing: &str) -> Vec<String> {
    listing
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with("List of"))
        .map(str::to_string)
        .collect()
}

// -- Recognizer -----------------------------------------------------------------

/// Result of recognizing one page. `error` is set when the page degraded to
/// empty text.
#[derive(Debug)]
pub struct PageRecognition {
    pub text: String,
    pub confidence: f32,
    pub error: Option<PrashnaError>,
}

impl PageRecognition {
    fn failed(error: PrashnaError) -> Self {
        Self {
            text: String::new(),
            confidence: 0.0,
            error: Some(error),
        }
    }
}

/// Runs an engine under a timeout and scores its output.
pub struct TextRecognizer<E: RecognitionEngine> {
    engine: E,
    timeout: Duration,
}

impl TextRecognizer<TesseractEngine> {
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(TesseractEngine::from_config(config), config.recognition_timeout())
    }
}

impl<E: RecognitionEngine> TextRecognizer<E> {
    pub fn new(engine: E, timeout: Duration) -> Self {
        Self { engine, timeout }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Recognize one preprocessed page image. Never fails: errors are carried
    /// in [`PageRecognition::error`].
    #[instrument(skip_all, fields(image = %image.display(), language = %language))]
    pub async fn recognize(&self, image: &Path, language: &str) -> PageRecognition {
        let outcome = tokio::time::timeout(self.timeout, self.engine.recognize(image, language)).await;

        match outcome {
            Ok(Ok(raw)) => {
                let confidence = mean_confidence(&raw.tokens);
                info!(confidence, chars = raw.text.chars().count(), "Page recognized");
                PageRecognition {
                    text: raw.text,
                    confidence,
                    error: None,
                }
            }
            Ok(Err(err)) => {
                warn!(%err, "Recognition failed");
                PageRecognition::failed(err)
            }
            Err(_) => {
                let err = PrashnaError::RecognitionTimeout {
                    secs: self.timeout.as_secs(),
                };
                warn!(%err, "Recognition timed out");
                PageRecognition::failed(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "level\tpage_num\tblock_num\tpar_num\tline_num\tword_num\tleft\ttop\twidth\theight\tconf\ttext";

    fn token(confidence: f32, text: &str) -> TokenConfidence {
        TokenConfidence {
            text: text.to_string(),
            confidence,
        }
    }

    struct FixedEngine(RawRecognition);

    impl RecognitionEngine for FixedEngine {
        async fn recognize(&self, _: &Path, _: &str) -> Result<RawRecognition, PrashnaError> {
            Ok(self.0.clone())
        }
    }

    struct FailingEngine;

    impl RecognitionEngine for FailingEngine {
        async fn recognize(&self, _: &Path, _: &str) -> Result<RawRecognition, PrashnaError> {
            Err(PrashnaError::Recognition(
                "Failed loading language 'hin'".into(),
            ))
        }
    }

    struct StalledEngine;

    impl RecognitionEngine for StalledEngine {
        async fn recognize(&self, _: &Path, _: &str) -> Result<RawRecognition, PrashnaError> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(RawRecognition::default())
        }
    }

    #[test]
    fn confidence_excludes_sentinel_and_blank_tokens() {
        let tokens = [
            token(80.0, "क"),
            token(-1.0, "ख"),
            token(60.0, "ग"),
            token(55.0, "  "),
            token(90.0, "घ"),
        ];
        assert!((mean_confidence(&tokens) - 76.67).abs() < 1e-4);
    }

    #[test]
    fn confidence_is_zero_when_nothing_qualifies() {
        assert_eq!(mean_confidence(&[]), 0.0);
        assert_eq!(mean_confidence(&[token(-1.0, "क"), token(70.0, " ")]), 0.0);
    }

    #[test]
    fn tsv_words_lines_and_blocks() {
        let tsv = format!(
            "{HEADER}\n\
             1\t1\t0\t0\t0\t0\t0\t0\t100\t100\t-1\t\n\
             5\t1\t1\t1\t1\t1\t10\t10\t20\t10\t91.5\tप्रश्न\n\
             5\t1\t1\t1\t1\t2\t40\t10\t20\t10\t88\t1.\n\
             5\t1\t1\t1\t2\t1\t10\t30\t20\t10\t75\tA)\n\
             5\t1\t1\t1\t2\t2\t40\t30\t20\t10\t-1\t \n\
             5\t1\t1\t1\t2\t3\t60\t30\t20\t10\t70\t100\n\
             5\t1\t2\t1\t1\t1\t10\t80\t20\t10\t65\tB)\n"
        );
        let raw = parse_tsv(&tsv);
        assert_eq!(raw.text, "प्रश्न 1.\nA) 100\n\nB)");
        assert_eq!(raw.tokens.len(), 6);
        assert_eq!(raw.tokens[0], token(91.5, "प्रश्न"));
        assert!((mean_confidence(&raw.tokens) - 77.9).abs() < 1e-4);
    }

    #[test]
    fn tsv_with_only_header_is_empty() {
        let raw = parse_tsv(HEADER);
        assert!(raw.text.is_empty());
        assert!(raw.tokens.is_empty());
    }

    #[test]
    fn language_listing() {
        let listing = "List of available languages in \"/usr/share/tessdata/\" (3):\neng\nhin\nosd\n";
        assert_eq!(parse_language_list(listing), ["eng", "hin", "osd"]);
    }

    #[tokio::test]
    async fn recognizer_scores_engine_output() {
        let engine = FixedEngine(RawRecognition {
            text: "क ख".into(),
            tokens: vec![token(90.0, "क"), token(70.0, "ख")],
        });
        let recognizer = TextRecognizer::new(engine, Duration::from_secs(5));
        let page = recognizer.recognize(Path::new("page.png"), "hin").await;
        assert_eq!(page.text, "क ख");
        assert_eq!(page.confidence, 80.0);
        assert!(page.error.is_none());
    }

    #[tokio::test]
    async fn engine_failure_degrades_to_empty_text() {
        let recognizer = TextRecognizer::new(FailingEngine, Duration::from_secs(5));
        let page = recognizer.recognize(Path::new("page.png"), "hin").await;
        assert!(page.text.is_empty());
        assert_eq!(page.confidence, 0.0);
        assert!(matches!(page.error, Some(PrashnaError::Recognition(_))));
    }

    #[tokio::test]
    async fn timeout_degrades_to_empty_text() {
        let recognizer = TextRecognizer::new(StalledEngine, Duration::from_millis(50));
        let page = recognizer.recognize(Path::new("page.png"), "hin").await;
        assert!(page.text.is_empty());
        assert!(matches!(
            page.error,
            Some(PrashnaError::RecognitionTimeout { .. })
        ));
    }

    #[tokio::test]
    async fn missing_tesseract_binary_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let engine = TesseractEngine::new(dir.path().join("no-such-tesseract"));
        let err = engine
            .recognize(&dir.path().join("page.png"), "hin")
            .await
            .unwrap_err();
        assert!(matches!(err, PrashnaError::Recognition(ref msg) if msg.contains("cannot run")));
    }

    #[test]
    fn from_config_uses_configured_binary_and_timeout() {
        let config = PipelineConfig {
            tesseract_bin: PathBuf::from("/opt/tesseract/bin/tesseract"),
            recognition_timeout_secs: 12,
            ..PipelineConfig::default()
        };
        let recognizer = TextRecognizer::from_config(&config);
        assert_eq!(recognizer.engine().bin(), Path::new("/opt/tesseract/bin/tesseract"));
        assert_eq!(recognizer.timeout, Duration::from_secs(12));
    }
}
