//! Bounded worker pool for archive fetches.
//!
//! `workers` OS threads pull links from a shared queue; each owns one
//! `HttpSession` so its connection is reused across the links it handles.
//! Outcomes come back over a channel in completion order.

use std::collections::{HashSet, VecDeque};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};

use crate::fetcher::{FetchOutcome, Fetcher, HttpClientConfig, HttpSession};
use crate::url_model::Link;

/// Keep the first link for each destination filename. Two URLs ending in the
/// same name would otherwise write the same `.part` file concurrently.
pub fn unique_by_filename(links: Vec<Link>) -> Vec<Link> {
    let mut seen = HashSet::new();
    links
        .into_iter()
        .filter(|link| {
            let fresh = seen.insert(link.filename.clone());
            if !fresh {
                tracing::warn!(file = %link.filename, url = %link.url, "skipping link with duplicate filename");
            }
            fresh
        })
        .collect()
}

/// Fetch every link with at most `workers` transfers in flight. Blocks until
/// all workers finished. Result order is completion order, not input order.
/// Links whose filename repeats an earlier one are dropped (see `unique_by_filename`).
pub fn fetch_all(
    links: Vec<Link>,
    fetcher: &Fetcher,
    client: &HttpClientConfig,
    workers: usize,
) -> Vec<(Link, FetchOutcome)> {
    let links = unique_by_filename(links);
    let count = links.len();
    if count == 0 {
        return Vec::new();
    }

    let work: Arc<Mutex<VecDeque<Link>>> = Arc::new(Mutex::new(links.into_iter().collect()));
    let (tx, rx) = mpsc::channel();
    let num_workers = workers.max(1).min(count);

    let mut handles = Vec::with_capacity(num_workers);
    for worker in 0..num_workers {
        let work = Arc::clone(&work);
        let tx = tx.clone();
        let fetcher = fetcher.clone();
        let client = client.clone();
        handles.push(std::thread::spawn(move || {
            let mut session = match HttpSession::new(&client) {
                Ok(s) => Some(s),
                Err(e) => {
                    tracing::error!(worker, "could not create HTTP session: {}", e);
                    None
                }
            };
            loop {
                let next = match work.lock() {
                    Ok(mut q) => q.pop_front(),
                    Err(_) => None,
                };
                let Some(link) = next else {
                    break;
                };
                let outcome = match session.as_mut() {
                    Some(s) => fetcher.fetch(s, &link),
                    None => FetchOutcome::Failed {
                        reason: "HTTP session unavailable".to_string(),
                    },
                };
                tracing::info!(file = %link.filename, worker, "{}", outcome);
                if tx.send((link, outcome)).is_err() {
                    break;
                }
            }
        }));
    }
    drop(tx);

    let results: Vec<(Link, FetchOutcome)> = rx.iter().collect();
    for h in handles {
        if h.join().is_err() {
            tracing::error!("fetch worker panicked");
        }
    }
    results
}
