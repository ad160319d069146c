//! Download error type.

use thiserror::Error;

/// Error from a single download attempt.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Curl reported an error (timeout, connection, etc.).
    #[error("{0}")]
    Curl(#[from] curl::Error),
    /// HTTP response had a non-2xx status.
    #[error("HTTP {0}")]
    Http(u32),
    /// Disk/storage write failed (e.g. disk full, permission denied).
    #[error("storage: {0:#}")]
    Storage(anyhow::Error),
}

impl FetchError {
    /// One-line reason, cut to `max_chars` characters for outcome reporting.
    pub fn truncated_reason(&self, max_chars: usize) -> String {
        let full = self.to_string();
        match full.char_indices().nth(max_chars) {
            Some((idx, _)) => format!("{}...", &full[..idx]),
            None => full,
        }
    }
}
