// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Pipeline configuration and its on-disk persistence.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{PrashnaError, Result};

/// Name of the persisted configuration file inside the config directory.
pub const CONFIG_FILE: &str = "config.json";

/// Default recognition language (Tesseract's Hindi model).
pub const DEFAULT_LANGUAGE: &str = "hin";

/// Settings for one extraction run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Recognition language code passed to the engine (`hin`, `hin+eng`, ...).
    pub language: String,
    /// Enable denoising and CLAHE during preprocessing.
    pub enhance: bool,
    /// Upper bound for a single page recognition call, in seconds.
    pub recognition_timeout_secs: u64,
    /// Upper bound for rasterizing a single PDF page, in seconds.
    pub rasterize_timeout_secs: u64,
    /// Resolution used when rasterizing scanned PDF pages.
    pub rasterize_dpi: u32,
    /// Path or name of the Tesseract binary.
    pub tesseract_bin: PathBuf,
    /// Path or name of the poppler `pdftoppm` binary.
    pub pdftoppm_bin: PathBuf,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            language: DEFAULT_LANGUAGE.to_string(),
            enhance: false,
            recognition_timeout_secs: 60,
            rasterize_timeout_secs: 120,
            rasterize_dpi: 300,
            tesseract_bin: PathBuf::from("tesseract"),
            pdftoppm_bin: PathBuf::from("pdftoppm"),
        }
    }
}

impl PipelineConfig {
    pub fn recognition_timeout(&self) -> Duration {
        Duration::from_secs(self.recognition_timeout_secs)
    }

    pub fn rasterize_timeout(&self) -> Duration {
        Duration::from_secs(self.rasterize_timeout_secs)
    }

    /// Reject settings the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.language.trim().is_empty() {
            return Err(PrashnaError::Config("language must not be empty".into()));
        }
        if self.recognition_timeout_secs == 0 {
            return Err(PrashnaError::Config(
                "recognition_timeout_secs must be greater than zero".into(),
            ));
        }
        if self.rasterize_timeout_secs == 0 {
            return Err(PrashnaError::Config(
                "rasterize_timeout_secs must be greater than zero".into(),
            ));
        }
        if !(72..=1200).contains(&self.rasterize_dpi) {
            return Err(PrashnaError::Config(format!(
                "rasterize_dpi {} outside supported range 72..=1200",
                self.rasterize_dpi
            )));
        }
        Ok(())
    }

    /// Load `config.json` from `dir`. A missing file yields the defaults.
    pub fn load_from(dir: &Path) -> Result<Self> {
        let path = dir.join(CONFIG_FILE);
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = std::fs::read_to_string(&path)?;
        let config: Self = serde_json::from_str(&data)?;
        config.validate()?;
        Ok(config)
    }

    /// Persist this config as pretty JSON into `dir`, creating it if needed.
    pub fn save_to(&self, dir: &Path) -> Result<()> {
        std::fs::create_dir_all(dir)?;
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(dir.join(CONFIG_FILE), json)?;
        Ok(())
    }
}

/// Return the configuration directory for Prashna.
///
/// Uses `$XDG_CONFIG_HOME/prashna`, falling back to `~/.config/prashna`.
pub fn config_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(xdg).join("prashna");
    }
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".config").join("prashna");
    }
    // Last resort
    PathBuf::from(".prashna")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = PipelineConfig::default();
        assert_eq!(config.language, "hin");
        assert!(!config.enhance);
        config.validate().expect("defaults must validate");
    }

    #[test]
    fn empty_language_rejected() {
        let config = PipelineConfig {
            language: "  ".into(),
            ..PipelineConfig::default()
        };
        assert!(matches!(config.validate(), Err(PrashnaError::Config(_))));
    }

    #[test]
    fn zero_timeout_rejected() {
        let config = PipelineConfig {
            recognition_timeout_secs: 0,
            ..PipelineConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = PipelineConfig::load_from(dir.path()).unwrap();
        assert_eq!(config, PipelineConfig::default());
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let config = PipelineConfig {
            language: "hin+eng".into(),
            enhance: true,
            ..PipelineConfig::default()
        };
        config.save_to(dir.path()).unwrap();
        let loaded = PipelineConfig::load_from(dir.path()).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), r#"{"enhance": true}"#).unwrap();
        let loaded = PipelineConfig::load_from(dir.path()).unwrap();
        assert!(loaded.enhance);
        assert_eq!(loaded.language, DEFAULT_LANGUAGE);
        assert_eq!(loaded.rasterize_dpi, 300);
    }
}
