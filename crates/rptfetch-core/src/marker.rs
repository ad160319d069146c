//! Retention marker: the newest publication date handled by a previous run.
//!
//! Stored as `YYYY-MM-DD` in `last_downloaded_date.txt` inside the download
//! directory. A missing or unreadable marker means "no lower bound".

use chrono::NaiveDate;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::storage;

pub const MARKER_FILENAME: &str = "last_downloaded_date.txt";
const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Error)]
pub enum MarkerError {
    #[error("marker io: {0}")]
    Io(#[from] io::Error),
    #[error("marker content {content:?} is not a YYYY-MM-DD date")]
    Parse { content: String },
}

#[derive(Debug, Clone)]
pub struct RetentionMarker {
    path: PathBuf,
}

impl RetentionMarker {
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            path: dir.join(MARKER_FILENAME),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Strict read: `Ok(None)` when the file does not exist, `Err` when it
    /// exists but cannot be read or parsed.
    pub fn try_load(&self) -> Result<Option<NaiveDate>, MarkerError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let trimmed = content.trim();
        NaiveDate::parse_from_str(trimmed, DATE_FORMAT)
            .map(Some)
            .map_err(|_| MarkerError::Parse {
                content: trimmed.to_string(),
            })
    }

    /// Permissive read used by runs: any error is logged and treated as absent.
    pub fn load(&self) -> Option<NaiveDate> {
        match self.try_load() {
            Ok(date) => date,
            Err(e) => {
                tracing::warn!(path = %self.path.display(), "ignoring retention marker: {}", e);
                None
            }
        }
    }

    /// Write `date`, replacing any previous marker atomically.
    pub fn save(&self, date: NaiveDate) -> Result<(), MarkerError> {
        let tp = storage::temp_path(&self.path);
        fs::write(&tp, date.format(DATE_FORMAT).to_string())?;
        fs::rename(&tp, &self.path)?;
        Ok(())
    }

    /// Remove the marker. Returns whether one existed.
    pub fn clear(&self) -> Result<bool, MarkerError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}
