// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Plain-language diagnostics for the host bot.
//
// Every pipeline error maps to a short message and a concrete suggestion the
// bot can relay to the person who sent the document.

use crate::error::PrashnaError;

/// How the host should treat a failed extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Timeout or a flaky engine run; trying again may work.
    Transient,
    /// The sender must do something (send a clearer photo, another format).
    ActionRequired,
    /// The deployment is missing something (engine, language pack, config).
    Setup,
    /// Cannot be fixed by retrying or by the sender.
    Permanent,
}

/// A human-readable error with a message and an actionable suggestion.
#[derive(Debug, Clone)]
pub struct HumanError {
    pub message: String,
    pub suggestion: String,
    pub retriable: bool,
    pub severity: Severity,
}

/// Convert a `PrashnaError` into a `HumanError`.
pub fn humanize_error(err: &PrashnaError) -> HumanError {
    match err {
        PrashnaError::UnsupportedDocument(detail) => HumanError {
            message: "This type of file can't be read as a quiz.".into(),
            suggestion: format!("Send a PDF or a photo (PNG/JPG) of the quiz instead. (File type: {detail})"),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        PrashnaError::Classification(_) | PrashnaError::PdfError(_) => HumanError {
            message: "The PDF could not be opened.".into(),
            suggestion: "The file may be damaged or password protected. Try exporting it again, or send photos of the pages.".into(),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        PrashnaError::Rasterization(detail) => {
            if detail.contains("not found") || detail.contains("No such file") {
                HumanError {
                    message: "Scanned PDFs can't be processed on this server yet.".into(),
                    suggestion: "Install poppler-utils (pdftoppm) on the host.".into(),
                    retriable: false,
                    severity: Severity::Setup,
                }
            } else {
                HumanError {
                    message: "A page of the PDF could not be turned into an image.".into(),
                    suggestion: "Try again, or send photos of the pages instead.".into(),
                    retriable: true,
                    severity: Severity::Transient,
                }
            }
        }

        PrashnaError::ImageError(_) | PrashnaError::Preprocessing(_) => HumanError {
            message: "The photo could not be read.".into(),
            suggestion: "Send the photo again as a PNG or JPG, taken straight on and in good light.".into(),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        PrashnaError::Recognition(detail) => humanize_recognition_error(detail),

        PrashnaError::RecognitionTimeout { secs } => HumanError {
            message: "Reading the page took too long.".into(),
            suggestion: format!("Try again, or send a smaller or cropped image. (Limit: {secs}s)"),
            retriable: true,
            severity: Severity::Transient,
        },

        PrashnaError::NoUsableRecognition { pages } => HumanError {
            message: "No text could be read from the document.".into(),
            suggestion: format!(
                "All {pages} page(s) failed. Send a sharper photo with the whole quiz visible and no shadows."
            ),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        PrashnaError::Config(detail) => HumanError {
            message: "The extractor is misconfigured.".into(),
            suggestion: format!("Fix the configuration file and restart. ({detail})"),
            retriable: false,
            severity: Severity::Setup,
        },

        PrashnaError::Io(err) => HumanError {
            message: "The file could not be read.".into(),
            suggestion: format!("Check the file still exists and try again. ({err})"),
            retriable: true,
            severity: Severity::Transient,
        },

        PrashnaError::Serialization(_) => HumanError {
            message: "The results could not be packaged.".into(),
            suggestion: "This is a bug; please report it along with the document.".into(),
            retriable: false,
            severity: Severity::Permanent,
        },
    }
}

/// Recognition failures are mostly deployment problems; pick them apart by detail.
fn humanize_recognition_error(detail: &str) -> HumanError {
    let lower = detail.to_lowercase();

    if lower.contains("failed loading language") || lower.contains("traineddata") {
        HumanError {
            message: "The Hindi reading model is not installed.".into(),
            suggestion: "Install the Tesseract Hindi language pack (tesseract-ocr-hin) on the host.".into(),
            retriable: false,
            severity: Severity::Setup,
        }
    } else if lower.contains("not found") || lower.contains("no such file") {
        HumanError {
            message: "The text reader is not installed on this server.".into(),
            suggestion: "Install tesseract-ocr or set tesseract_bin in the configuration.".into(),
            retriable: false,
            severity: Severity::Setup,
        }
    } else {
        HumanError {
            message: "The page could not be read.".into(),
            suggestion: format!("Try again with a clearer photo. (Detail: {detail})"),
            retriable: true,
            severity: Severity::Transient,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_is_transient() {
        let human = humanize_error(&PrashnaError::RecognitionTimeout { secs: 60 });
        assert_eq!(human.severity, Severity::Transient);
        assert!(human.retriable);
    }

    #[test]
    fn missing_language_pack_is_setup() {
        let err = PrashnaError::Recognition(
            "tesseract exited with 1: Failed loading language 'hin'".into(),
        );
        assert_eq!(humanize_error(&err).severity, Severity::Setup);
    }

    #[test]
    fn missing_engine_is_setup() {
        let err = PrashnaError::Recognition("failed to spawn tesseract: not found".into());
        let human = humanize_error(&err);
        assert_eq!(human.severity, Severity::Setup);
        assert!(!human.retriable);
    }

    #[test]
    fn all_pages_failed_asks_for_better_input() {
        let human = humanize_error(&PrashnaError::NoUsableRecognition { pages: 3 });
        assert_eq!(human.severity, Severity::ActionRequired);
        assert!(human.suggestion.contains('3'));
    }

    #[test]
    fn unsupported_format_is_action_required() {
        let human = humanize_error(&PrashnaError::UnsupportedDocument("docx".into()));
        assert_eq!(human.severity, Severity::ActionRequired);
        assert!(!human.retriable);
    }
}
