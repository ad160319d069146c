//! Reusable HTTP session on top of a libcurl Easy handle.
//!
//! One `HttpSession` per worker thread: the handle keeps its connection cache
//! between transfers, so consecutive downloads from the same host reuse the
//! connection. Configuration is shared read-only through `HttpClientConfig`.

use anyhow::Context;
use std::cell::Cell;
use std::collections::BTreeMap;
use std::str;
use std::time::Duration;

use crate::config::FetchConfig;
use crate::retry::FetchError;

const MAX_REDIRECTS: u32 = 10;

/// Read-only settings every session is built from.
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    pub headers: BTreeMap<String, String>,
    /// Bounds connect, and the longest stall (no bytes received) of a transfer.
    pub timeout: Duration,
    /// Receive buffer size; the body is delivered in chunks of at most this size.
    pub chunk_size: usize,
}

impl HttpClientConfig {
    pub fn from_config(cfg: &FetchConfig) -> Self {
        Self {
            headers: cfg.headers.clone(),
            timeout: cfg.timeout(),
            chunk_size: cfg.chunk_size,
        }
    }
}

pub struct HttpSession {
    easy: curl::easy::Easy,
}

impl HttpSession {
    pub fn new(cfg: &HttpClientConfig) -> Result<Self, curl::Error> {
        let mut easy = curl::easy::Easy::new();
        easy.follow_location(true)?;
        easy.max_redirections(MAX_REDIRECTS)?;
        easy.connect_timeout(cfg.timeout)?;
        // Abort when fewer than 1 byte/s arrives for `timeout`.
        easy.low_speed_limit(1)?;
        easy.low_speed_time(cfg.timeout)?;
        if cfg.chunk_size > 0 {
            easy.buffer_size(cfg.chunk_size)?;
        }

        let mut list = curl::easy::List::new();
        for (k, v) in &cfg.headers {
            list.append(&format!("{}: {}", k.trim(), v.trim()))?;
        }
        if !cfg.headers.is_empty() {
            easy.http_headers(list)?;
        }
        Ok(Self { easy })
    }

    /// GET `url` and pass each body chunk to `on_chunk`, but only once the final
    /// (post-redirect) response status is known to be 2xx. Returns the number of
    /// body bytes delivered.
    pub fn get_streaming<F>(&mut self, url: &str, mut on_chunk: F) -> Result<u64, FetchError>
    where
        F: FnMut(&[u8]) -> anyhow::Result<()>,
    {
        self.easy.url(url)?;
        self.easy.get(true)?;

        let status: Cell<Option<u32>> = Cell::new(None);
        let mut rejected_status: Option<u32> = None;
        let mut sink_error: Option<anyhow::Error> = None;
        let mut delivered = 0u64;

        let perform = {
            let mut transfer = self.easy.transfer();
            transfer.header_function(|data| {
                if let Some(code) = parse_status_line(data) {
                    status.set(Some(code));
                }
                true
            })?;
            transfer.write_function(|data| {
                match status.get() {
                    Some(code) if (200..300).contains(&code) => {}
                    other => {
                        rejected_status = Some(other.unwrap_or(0));
                        return Ok(0); // abort transfer
                    }
                }
                match on_chunk(data) {
                    Ok(()) => {
                        delivered += data.len() as u64;
                        Ok(data.len())
                    }
                    Err(e) => {
                        sink_error = Some(e);
                        Ok(0) // abort transfer
                    }
                }
            })?;
            transfer.perform()
        };

        if let Some(e) = sink_error {
            return Err(FetchError::Storage(e));
        }
        if let Some(code) = rejected_status {
            return Err(FetchError::Http(code));
        }
        perform?;

        let code = self.easy.response_code()?;
        if !(200..300).contains(&code) {
            return Err(FetchError::Http(code));
        }
        Ok(delivered)
    }

    /// GET `url` and return the body decoded as (lossy) UTF-8.
    pub fn get_text(&mut self, url: &str) -> anyhow::Result<String> {
        let mut body = Vec::new();
        self.get_streaming(url, |chunk| {
            body.extend_from_slice(chunk);
            Ok(())
        })
        .with_context(|| format!("GET {} failed", url))?;
        Ok(String::from_utf8_lossy(&body).into_owned())
    }
}

/// Status code from an `HTTP/x.y NNN reason` header line; `None` for other lines.
fn parse_status_line(data: &[u8]) -> Option<u32> {
    let line = str::from_utf8(data).ok()?.trim();
    let mut parts = line.split_whitespace();
    if !parts.next()?.starts_with("HTTP/") {
        return None;
    }
    parts.next()?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_lines() {
        assert_eq!(parse_status_line(b"HTTP/1.1 200 OK\r\n"), Some(200));
        assert_eq!(parse_status_line(b"HTTP/2 404\r\n"), Some(404));
        assert_eq!(parse_status_line(b"HTTP/1.1 302 Found\r\n"), Some(302));
    }

    #[test]
    fn other_header_lines_are_ignored() {
        assert_eq!(parse_status_line(b"Content-Length: 10\r\n"), None);
        assert_eq!(parse_status_line(b"\r\n"), None);
        assert_eq!(parse_status_line(b"HTTP/1.1 abc\r\n"), None);
    }

    #[test]
    fn client_config_from_fetch_config() {
        let cfg = FetchConfig::default();
        let client = HttpClientConfig::from_config(&cfg);
        assert_eq!(client.timeout, Duration::from_secs(30));
        assert_eq!(client.chunk_size, 8192);
        assert!(client.headers.contains_key("User-Agent"));
    }
}
