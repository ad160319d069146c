//! Single-archive fetcher.
//!
//! Materializes one `Link` under the destination directory: skips files that
//! are already present, otherwise streams the body into a `.part` file with
//! bounded retries and renames it into place on success.

mod session;

pub use session::{HttpClientConfig, HttpSession};

use std::fmt;
use std::path::{Path, PathBuf};

use crate::retry::{run_with_retry, FetchError, RetryPolicy};
use crate::storage::{self, StorageWriter};
use crate::url_model::Link;

/// Longest failure reason kept in a `FetchOutcome::Failed`.
pub const MAX_REASON_CHARS: usize = 120;

/// Terminal classification of one link in a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// A file with the same name was already in the destination; nothing fetched.
    AlreadyPresent,
    /// Downloaded and renamed into place.
    Succeeded { bytes: u64 },
    /// Every attempt failed.
    Failed { reason: String },
}

impl fmt::Display for FetchOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchOutcome::AlreadyPresent => write!(f, "already present"),
            FetchOutcome::Succeeded { bytes } => write!(f, "downloaded ({} bytes)", bytes),
            FetchOutcome::Failed { reason } => write!(f, "failed ({})", reason),
        }
    }
}

/// Download settings shared by every worker; holds no per-run state.
#[derive(Debug, Clone)]
pub struct Fetcher {
    dest_dir: PathBuf,
    policy: RetryPolicy,
    chunk_size: usize,
}

impl Fetcher {
    pub fn new(dest_dir: impl Into<PathBuf>, policy: RetryPolicy, chunk_size: usize) -> Self {
        Self {
            dest_dir: dest_dir.into(),
            policy,
            chunk_size,
        }
    }

    /// Final on-disk path for `link`.
    pub fn destination(&self, link: &Link) -> PathBuf {
        self.dest_dir.join(&link.filename)
    }

    /// Fetch `link` using `session`. Never overwrites an existing file and never
    /// leaves partial content under the final name.
    pub fn fetch(&self, session: &mut HttpSession, link: &Link) -> FetchOutcome {
        let final_path = self.destination(link);
        if final_path.exists() {
            return FetchOutcome::AlreadyPresent;
        }

        let max_attempts = self.policy.max_attempts;
        let res = run_with_retry(
            &self.policy,
            |_attempt| self.fetch_once(session, &link.url, &final_path),
            |attempt, e, delay| {
                tracing::warn!(
                    file = %link.filename,
                    "download failed (attempt {}/{}): {}; retrying in {:?}",
                    attempt,
                    max_attempts,
                    e,
                    delay
                );
            },
        );

        match res {
            Ok(bytes) => FetchOutcome::Succeeded { bytes },
            Err(e) => FetchOutcome::Failed {
                reason: e.truncated_reason(MAX_REASON_CHARS),
            },
        }
    }

    /// One attempt: stream into `<final>.part`, rename on success, remove the
    /// temp file on any failure.
    fn fetch_once(
        &self,
        session: &mut HttpSession,
        url: &str,
        final_path: &Path,
    ) -> Result<u64, FetchError> {
        let tp = storage::temp_path(final_path);
        let mut writer = StorageWriter::create(&tp, self.chunk_size).map_err(FetchError::Storage)?;

        match session.get_streaming(url, |chunk| writer.write(chunk)) {
            Ok(bytes) => {
                writer.finalize(final_path).map_err(FetchError::Storage)?;
                Ok(bytes)
            }
            Err(e) => {
                writer.discard();
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn fast_policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            delay: Duration::from_millis(1),
            jitter: Duration::ZERO,
        }
    }

    #[test]
    fn existing_file_is_already_present_without_network() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Daily_20240101.zip"), b"old").unwrap();
        let fetcher = Fetcher::new(dir.path(), fast_policy(), 8192);
        let mut session = HttpSession::new(&HttpClientConfig::from_config(
            &crate::config::FetchConfig::default(),
        ))
        .unwrap();
        // Port 9 (discard) is never contacted: the skip happens before any request.
        let link = Link::parse("http://127.0.0.1:9/Daily_20240101.zip").unwrap();
        assert_eq!(fetcher.fetch(&mut session, &link), FetchOutcome::AlreadyPresent);
        assert_eq!(std::fs::read(dir.path().join("Daily_20240101.zip")).unwrap(), b"old");
    }

    #[test]
    fn outcome_display() {
        assert_eq!(FetchOutcome::AlreadyPresent.to_string(), "already present");
        assert_eq!(
            FetchOutcome::Succeeded { bytes: 5 }.to_string(),
            "downloaded (5 bytes)"
        );
        assert_eq!(
            FetchOutcome::Failed { reason: "HTTP 404".into() }.to_string(),
            "failed (HTTP 404)"
        );
    }
}
