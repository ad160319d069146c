//! Link extractor: fetch the listing page and pull out archive links.
//!
//! Failures never reach the caller: a transport error or an unusable page is
//! logged and reported as "no links".

mod parse;

pub use parse::{extract_links, LinkRules};

use anyhow::{Context, Result};

use crate::fetcher::{HttpClientConfig, HttpSession};
use crate::url_model::Link;

/// GET the listing page and return its body.
pub fn fetch_listing_page(url: &str, client: &HttpClientConfig) -> Result<String> {
    let mut session = HttpSession::new(client).context("failed to set up HTTP session")?;
    session.get_text(url)
}

/// Fetch `url` and extract its archive links, oldest-first. Returns an empty
/// list (after logging) on any failure.
pub fn discover_links(url: &str, client: &HttpClientConfig, rules: &LinkRules) -> Vec<Link> {
    match fetch_listing_page(url, client) {
        Ok(html) => {
            let links = extract_links(&html, rules);
            tracing::debug!(url, bytes = html.len(), links = links.len(), "listing page parsed");
            links
        }
        Err(e) => {
            tracing::error!(url, "failed to fetch listing page: {:#}", e);
            Vec::new()
        }
    }
}
