// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Page rasterizer: renders pages of a scanned PDF to PNG files by driving
// poppler's `pdftoppm` binary, either one page at a time or the whole file.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use prashna_core::PipelineConfig;
use prashna_core::error::PrashnaError;
use tokio::process::Command;
use tracing::{debug, info, instrument};

/// Output prefix for whole-document renders.
const ALL_PAGES_PREFIX: &str = "rendered";

/// Renders PDF pages to PNG files.
#[derive(Debug, Clone)]
pub struct PageRasterizer {
    bin: PathBuf,
    dpi: u32,
    timeout: Duration,
}

impl PageRasterizer {
    pub fn new(bin: impl Into<PathBuf>, dpi: u32, timeout: Duration) -> Self {
        Self {
            bin: bin.into(),
            dpi,
            timeout,
        }
    }

    /// Build a rasterizer from the pipeline configuration.
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(
            config.pdftoppm_bin.clone(),
            config.rasterize_dpi,
            config.rasterize_timeout(),
        )
    }

    pub fn dpi(&self) -> u32 {
        self.dpi
    }

    /// Render 1-indexed `page` of `pdf` into `out_dir`, returning the PNG path.
    ///
    /// The child process is killed if the timeout elapses.
    #[instrument(skip_all, fields(page = page, dpi = self.dpi))]
    pub async fn rasterize(
        &self,
        pdf: &Path,
        page: u32,
        out_dir: &Path,
    ) -> Result<PathBuf, PrashnaError> {
        let prefix = out_dir.join(format!("page-{page:04}"));
        let page_arg = page.to_string();
        let what = format!("page {}", page);

        let mut command = self.command();
        command
            .arg("-f")
            .arg(&page_arg)
            .arg("-l")
            .arg(&page_arg)
            .arg("-singlefile")
            .arg(pdf)
            .arg(&prefix);
        self.execute(command, &what).await?;

        let png = prefix.with_extension("png");
        if !png.exists() {
            return Err(PrashnaError::Rasterization(format!(
                "no image produced for {}",
                what
            )));
        }

        info!(path = %png.display(), "Page rasterized");
        Ok(png)
    }

    /// Render every page of `pdf` into `out_dir` without consulting its page
    /// tree. Returns the PNG paths in page order.
    ///
    /// One timeout covers the whole render.
    #[instrument(skip_all, fields(dpi = self.dpi))]
    pub async fn rasterize_all(
        &self,
        pdf: &Path,
        out_dir: &Path,
    ) -> Result<Vec<PathBuf>, PrashnaError> {
        let what = "all pages";
        let mut command = self.command();
        command.arg(pdf).arg(out_dir.join(ALL_PAGES_PREFIX));
        self.execute(command, what).await?;

        let listing_error = |err: std::io::Error| {
            PrashnaError::Rasterization(format!("cannot list rendered pages: {}", err))
        };
        let mut pages = Vec::new();
        for entry in std::fs::read_dir(out_dir).map_err(listing_error)? {
            let path = entry.map_err(listing_error)?.path();
            if let Some(number) = rendered_page_number(&path) {
                pages.push((number, path));
            }
        }
        if pages.is_empty() {
            return Err(PrashnaError::Rasterization(format!(
                "no image produced for {}",
                what
            )));
        }
        pages.sort_by_key(|(number, _)| *number);

        info!(pages = pages.len(), "Document rasterized");
        Ok(pages.into_iter().map(|(_, path)| path).collect())
    }

    fn command(&self) -> Command {
        let mut command = Command::new(&self.bin);
        command
            .arg("-r")
            .arg(self.dpi.to_string())
            .arg("-png")
            .stdin(Stdio::null())
            .kill_on_drop(true);
        command
    }

    async fn execute(&self, mut command: Command, what: &str) -> Result<(), PrashnaError> {
        debug!(bin = %self.bin.display(), "Spawning rasterizer");

        let output = tokio::time::timeout(self.timeout, command.output())
            .await
            .map_err(|_| {
                PrashnaError::Rasterization(format!(
                    "{} timed out after {}s",
                    what,
                    self.timeout.as_secs()
                ))
            })?
            .map_err(|err| {
                PrashnaError::Rasterization(format!(
                    "cannot run {}: {}",
                    self.bin.display(),
                    err
                ))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(PrashnaError::Rasterization(format!(
                "{} exited with {} for {}: {}",
                self.bin.display(),
                output.status,
                what,
                stderr.trim()
            )));
        }
        Ok(())
    }
}

/// Page number of a `rendered-<n>.png` file written by [`PageRasterizer::rasterize_all`].
/// pdftoppm zero-pads `<n>` to the width of the page count.
fn rendered_page_number(path: &Path) -> Option<u32> {
    if path.extension()? != "png" {
        return None;
    }
    path.file_stem()?
        .to_str()?
        .strip_prefix(ALL_PAGES_PREFIX)?
        .strip_prefix('-')?
        .parse()
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_config_copies_settings() {
        let config = PipelineConfig {
            rasterize_dpi: 150,
            rasterize_timeout_secs: 7,
            ..PipelineConfig::default()
        };
        let rasterizer = PageRasterizer::from_config(&config);
        assert_eq!(rasterizer.dpi(), 150);
        assert_eq!(rasterizer.timeout, Duration::from_secs(7));
        assert_eq!(rasterizer.bin, PathBuf::from("pdftoppm"));
    }

    #[tokio::test]
    async fn missing_binary_is_a_rasterization_error() {
        let dir = tempfile::tempdir().unwrap();
        let rasterizer = PageRasterizer::new(
            dir.path().join("no-such-pdftoppm"),
            300,
            Duration::from_secs(5),
        );
        let result = rasterizer
            .rasterize(&dir.path().join("in.pdf"), 1, dir.path())
            .await;
        match result {
            Err(PrashnaError::Rasterization(msg)) => assert!(msg.contains("cannot run")),
            other => panic!("expected rasterization error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn whole_document_render_reports_a_missing_binary() {
        let dir = tempfile::tempdir().unwrap();
        let rasterizer = PageRasterizer::new(
            dir.path().join("no-such-pdftoppm"),
            300,
            Duration::from_secs(5),
        );
        let result = rasterizer
            .rasterize_all(&dir.path().join("in.pdf"), dir.path())
            .await;
        assert!(matches!(result, Err(PrashnaError::Rasterization(_))));
    }

    #[test]
    fn rendered_pages_are_recognised_by_name() {
        assert_eq!(rendered_page_number(Path::new("/tmp/rendered-1.png")), Some(1));
        assert_eq!(rendered_page_number(Path::new("/tmp/rendered-012.png")), Some(12));
        assert_eq!(rendered_page_number(Path::new("/tmp/rendered-3.ppm")), None);
        assert_eq!(rendered_page_number(Path::new("/tmp/page-0001.png")), None);
        assert_eq!(rendered_page_number(Path::new("/tmp/rendered.png")), None);
    }
}
