// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Prashna: Devanagari multiple-choice quiz extraction
//
// Entry point. Initialises logging, loads the persisted configuration,
// applies command-line overrides and runs the requested command.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use prashna_core::config::config_dir;
use prashna_core::diagnostics::humanize_error;
use prashna_core::error::Result;
use prashna_core::{PipelineConfig, PrashnaError};
use prashna_document::TesseractEngine;
use prashna_pipeline::ExtractionPipeline;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "prashna")]
#[command(version)]
#[command(about = "Extract multiple-choice questions from Hindi quiz PDFs and photos", long_about = None)]
struct Cli {
    /// Directory holding config.json (default: $XDG_CONFIG_HOME/prashna)
    #[arg(long, global = true, value_name = "DIR")]
    config_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Extract questions from a PDF or image and print them as JSON
    Extract {
        /// Input PDF or image file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        #[command(flatten)]
        overrides: Overrides,

        /// Print the full extraction report instead of just the questions
        #[arg(long)]
        report: bool,
    },

    /// List the recognition languages installed for Tesseract
    Languages,

    /// Print the effective configuration
    Config {
        #[command(flatten)]
        overrides: Overrides,

        /// Persist the effective configuration to config.json
        #[arg(long)]
        save: bool,
    },
}

/// Per-run settings that take precedence over config.json.
#[derive(clap::Args, Debug, Default)]
struct Overrides {
    /// Recognition language, e.g. "hin" or "hin+eng"
    #[arg(short, long, value_name = "LANG")]
    lang: Option<String>,

    /// Denoise and equalize contrast before recognition
    #[arg(long)]
    enhance: bool,

    /// Per-page recognition timeout in seconds
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,

    /// Rasterization resolution for scanned PDF pages
    #[arg(long, value_name = "DPI")]
    dpi: Option<u32>,

    /// Path to the tesseract binary
    #[arg(long, value_name = "PATH")]
    tesseract: Option<PathBuf>,
}

impl Overrides {
    fn apply(&self, mut config: PipelineConfig) -> Result<PipelineConfig> {
        if let Some(lang) = &self.lang {
            config.language = lang.clone();
        }
        if self.enhance {
            config.enhance = true;
        }
        if let Some(secs) = self.timeout {
            config.recognition_timeout_secs = secs;
        }
        if let Some(dpi) = self.dpi {
            config.rasterize_dpi = dpi;
        }
        if let Some(bin) = &self.tesseract {
            config.tesseract_bin = bin.clone();
        }
        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(%err, "prashna failed");
            let human = humanize_error(&err);
            eprintln!("{}", human.message);
            eprintln!("{}", human.suggestion);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let dir = cli.config_dir.unwrap_or_else(config_dir);
    let stored = PipelineConfig::load_from(&dir)?;

    match cli.command {
        Command::Extract {
            input,
            overrides,
            report,
        } => {
            let config = overrides.apply(stored)?;
            extract(&input, config, report).await
        }
        Command::Languages => {
            let engine = TesseractEngine::from_config(&stored);
            for language in engine.available_languages().await? {
                println!("{language}");
            }
            Ok(())
        }
        Command::Config { overrides, save } => {
            let config = overrides.apply(stored)?;
            if save {
                config.save_to(&dir)?;
                info!(path = %dir.display(), "Configuration saved");
            }
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(())
        }
    }
}

async fn extract(input: &Path, config: PipelineConfig, report: bool) -> Result<()> {
    info!(input = %input.display(), language = %config.language, "Extracting questions");
    let pipeline = ExtractionPipeline::new(config)?;
    let outcome = pipeline.run(input).await?;

    let json = if report {
        serde_json::to_string_pretty(&outcome)
    } else {
        serde_json::to_string_pretty(&outcome.questions)
    }
    .map_err(PrashnaError::from)?;

    println!("{json}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn extract_flags_parse() {
        let cli = Cli::try_parse_from([
            "prashna", "extract", "paper.pdf", "--lang", "hin+eng", "--enhance", "--timeout", "90",
            "--report",
        ])
        .unwrap();
        match cli.command {
            Command::Extract {
                input,
                overrides,
                report,
            } => {
                assert_eq!(input, PathBuf::from("paper.pdf"));
                assert_eq!(overrides.lang.as_deref(), Some("hin+eng"));
                assert!(overrides.enhance);
                assert_eq!(overrides.timeout, Some(90));
                assert!(report);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn overrides_take_precedence() {
        let overrides = Overrides {
            lang: Some("eng".into()),
            enhance: true,
            timeout: Some(5),
            dpi: Some(200),
            tesseract: Some(PathBuf::from("/usr/local/bin/tesseract")),
        };
        let config = overrides.apply(PipelineConfig::default()).unwrap();
        assert_eq!(config.language, "eng");
        assert!(config.enhance);
        assert_eq!(config.recognition_timeout_secs, 5);
        assert_eq!(config.rasterize_dpi, 200);
        assert_eq!(config.tesseract_bin, PathBuf::from("/usr/local/bin/tesseract"));
    }

    #[test]
    fn no_overrides_keep_stored_values() {
        let stored = PipelineConfig {
            language: "hin+eng".into(),
            enhance: true,
            ..PipelineConfig::default()
        };
        let config = Overrides::default().apply(stored.clone()).unwrap();
        assert_eq!(config, stored);
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let overrides = Overrides {
            timeout: Some(0),
            ..Overrides::default()
        };
        assert!(matches!(
            overrides.apply(PipelineConfig::default()),
            Err(PrashnaError::Config(_))
        ));
    }
}
