//! Sequential writer for temp download files.

use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Writer for one in-progress download. Bytes are appended in arrival order.
pub struct StorageWriter {
    file: BufWriter<File>,
    temp_path: PathBuf,
    written: u64,
}

impl StorageWriter {
    /// Create a new temp file at `temp_path` (e.g. `destination.part`).
    /// Overwrites if the path already exists (leftover from an interrupted run).
    pub fn create(temp_path: &Path, buffer_size: usize) -> Result<Self> {
        let file = File::options()
            .write(true)
            .create(true)
            .truncate(true)
            .open(temp_path)
            .with_context(|| format!("failed to create temp file: {}", temp_path.display()))?;
        Ok(Self {
            file: BufWriter::with_capacity(buffer_size.max(1), file),
            temp_path: temp_path.to_path_buf(),
            written: 0,
        })
    }

    pub fn write(&mut self, data: &[u8]) -> Result<()> {
        self.file
            .write_all(data)
            .with_context(|| format!("write to {} failed", self.temp_path.display()))?;
        self.written += data.len() as u64;
        Ok(())
    }

    /// Flush, sync and atomically rename the temp file to `final_path`.
    /// Consumes the writer. Fails if `final_path` is on a different filesystem.
    pub fn finalize(self, final_path: &Path) -> Result<()> {
        let temp_path = self.temp_path.clone();
        let file = self
            .file
            .into_inner()
            .map_err(|e| anyhow::anyhow!("flush {} failed: {}", temp_path.display(), e.error()))?;
        file.sync_all().context("storage sync failed")?;
        drop(file);

        std::fs::rename(&temp_path, final_path).with_context(|| {
            format!("failed to rename {} to {}", temp_path.display(), final_path.display())
        })?;
        Ok(())
    }

    /// Drop the partial download. Errors are ignored; a leftover `.part` file is
    /// truncated by the next attempt anyway.
    pub fn discard(self) {
        let temp_path = self.temp_path.clone();
        tracing::debug!(path = %temp_path.display(), bytes = self.written, "discarding partial download");
        drop(self.file);
        if let Err(e) = std::fs::remove_file(&temp_path) {
            tracing::debug!(path = %temp_path.display(), "could not remove temp file: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::temp_path;

    #[test]
    fn create_write_finalize() {
        let dir = tempfile::tempdir().unwrap();
        let final_path = dir.path().join("output.zip");
        let tp = temp_path(&final_path);

        let mut writer = StorageWriter::create(&tp, 8192).unwrap();
        writer.write(b"hello ").unwrap();
        writer.write(b"world").unwrap();
        assert!(!final_path.exists());
        writer.finalize(&final_path).unwrap();

        assert!(!tp.exists());
        assert_eq!(std::fs::read(&final_path).unwrap(), b"hello world");
    }

    #[test]
    fn discard_removes_temp_and_never_creates_final() {
        let dir = tempfile::tempdir().unwrap();
        let final_path = dir.path().join("output.zip");
        let tp = temp_path(&final_path);

        let mut writer = StorageWriter::create(&tp, 16).unwrap();
        writer.write(&[7u8; 100]).unwrap();
        writer.discard();

        assert!(!tp.exists());
        assert!(!final_path.exists());
    }

    #[test]
    fn create_truncates_leftover_part_file() {
        let dir = tempfile::tempdir().unwrap();
        let tp = dir.path().join("stale.zip.part");
        std::fs::write(&tp, b"stale partial content").unwrap();

        let mut writer = StorageWriter::create(&tp, 8192).unwrap();
        writer.write(b"new").unwrap();
        let final_path = dir.path().join("stale.zip");
        writer.finalize(&final_path).unwrap();
        assert_eq!(std::fs::read(&final_path).unwrap(), b"new");
    }
}
