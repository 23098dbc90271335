// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Per-page scratch space for rasterized and preprocessed images.

use std::path::{Path, PathBuf};

use prashna_core::error::Result;
use tempfile::TempDir;
use tracing::debug;

/// A page's private scratch directory. Everything inside is deleted when the
/// guard is released or dropped, whichever comes first.
#[derive(Debug)]
pub struct PageScratch {
    page_index: usize,
    dir: TempDir,
}

impl PageScratch {
    /// Create a fresh scratch directory for `page_index` under `work_dir`.
    pub fn acquire(work_dir: &Path, page_index: usize) -> Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix(&format!("page-{page_index:04}-"))
            .tempdir_in(work_dir)?;
        debug!(page = page_index, path = %dir.path().display(), "Scratch acquired");
        Ok(Self { page_index, dir })
    }

    pub fn page_index(&self) -> usize {
        self.page_index
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Path for a named file inside the scratch directory.
    pub fn file(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Delete the scratch directory now, surfacing any removal error.
    pub fn release(self) -> Result<()> {
        let page = self.page_index;
        self.dir.close()?;
        debug!(page, "Scratch released");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn release_removes_contents() {
        let work = tempfile::tempdir().unwrap();
        let scratch = PageScratch::acquire(work.path(), 3).unwrap();
        let file = scratch.file("page.png");
        std::fs::write(&file, b"png").unwrap();
        let dir = scratch.path().to_path_buf();

        assert_eq!(scratch.page_index(), 3);
        assert!(dir.file_name().unwrap().to_string_lossy().starts_with("page-0003-"));

        scratch.release().unwrap();
        assert!(!file.exists());
        assert!(!dir.exists());
    }

    #[test]
    fn drop_removes_contents() {
        let work = tempfile::tempdir().unwrap();
        let dir = {
            let scratch = PageScratch::acquire(work.path(), 0).unwrap();
            std::fs::write(scratch.file("prepped.png"), b"png").unwrap();
            scratch.path().to_path_buf()
        };
        assert!(!dir.exists());
        assert_eq!(std::fs::read_dir(work.path()).unwrap().count(), 0);
    }

    #[test]
    fn pages_get_separate_directories() {
        let work = tempfile::tempdir().unwrap();
        let a = PageScratch::acquire(work.path(), 0).unwrap();
        let b = PageScratch::acquire(work.path(), 1).unwrap();
        assert_ne!(a.path(), b.path());
    }

    #[test]
    fn missing_work_dir_is_an_io_error() {
        let work = tempfile::tempdir().unwrap();
        let gone = work.path().join("missing");
        let result = PageScratch::acquire(&gone, 0);
        assert!(matches!(result, Err(prashna_core::PrashnaError::Io(_))));
    }
}
