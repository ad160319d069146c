#![allow(dead_code)]

pub mod archive_server;

use rptfetch_core::config::FetchConfig;
use std::path::Path;

/// Config pointing at `listing_url`, writing to `dir`, with fast retries.
pub fn test_config(listing_url: String, dir: &Path) -> FetchConfig {
    let mut cfg = FetchConfig::default();
    cfg.listing_url = listing_url;
    cfg.download_dir = dir.to_path_buf();
    cfg.workers = 3;
    cfg.timeout_secs = 5;
    cfg.retry.delay_secs = 0.01;
    cfg
}
