//! Run orchestrator.
//!
//! One run: ensure the download directory, discover links, apply the date
//! filter against the retention marker, fetch the eligible links on a bounded
//! worker pool, then advance the marker if anything was downloaded.
//! Pipeline: listing → filter → fetcher (parallel) → marker.

mod pool;

pub use pool::{fetch_all, unique_by_filename};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use std::fmt;
use std::fs;

use crate::config::FetchConfig;
use crate::fetcher::{FetchOutcome, Fetcher, HttpClientConfig};
use crate::filter::{FilterPolicy, Selection};
use crate::listing::{self, LinkRules};
use crate::marker::RetentionMarker;
use crate::url_model::Link;

/// Phase of the orchestrator. Every run goes
/// `Idle → Listing → Filtering → Fetching → Finalizing → Idle`,
/// returning early to `Idle` when there is nothing to fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Listing,
    Filtering,
    Fetching,
    Finalizing,
}

/// Tally of one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Links extracted from the listing page.
    pub links_found: usize,
    /// Links handed to the fetcher.
    pub attempted: Vec<Link>,
    pub succeeded: usize,
    pub already_present: usize,
    pub failed: usize,
    /// `(filename, reason)` of each failed link.
    pub failures: Vec<(String, String)>,
    /// Marker date written by this run, if any.
    pub marker_saved: Option<NaiveDate>,
    /// The marker already covered the newest listed date.
    pub up_to_date: bool,
}

impl RunSummary {
    fn record(&mut self, link: &Link, outcome: &FetchOutcome) {
        match outcome {
            FetchOutcome::AlreadyPresent => self.already_present += 1,
            FetchOutcome::Succeeded { .. } => self.succeeded += 1,
            FetchOutcome::Failed { reason } => {
                self.failed += 1;
                self.failures.push((link.filename.clone(), reason.clone()));
            }
        }
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "succeeded: {}, already present: {}, failed: {}",
            self.succeeded, self.already_present, self.failed
        )
    }
}

/// Listing and filter result without any download (for previews).
#[derive(Debug, Clone)]
pub struct ListingPreview {
    pub links: Vec<Link>,
    pub marker: Option<NaiveDate>,
    pub selection: Selection,
}

/// Drives runs for one configuration. `run` takes `&mut self`, so a single
/// orchestrator never has two runs in flight.
pub struct Orchestrator {
    cfg: FetchConfig,
    state: RunState,
}

impl Orchestrator {
    pub fn new(cfg: FetchConfig) -> Self {
        Self {
            cfg,
            state: RunState::Idle,
        }
    }

    pub fn config(&self) -> &FetchConfig {
        &self.cfg
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn marker(&self) -> RetentionMarker {
        RetentionMarker::in_dir(&self.cfg.download_dir)
    }

    fn enter(&mut self, next: RunState) {
        tracing::debug!(from = ?self.state, to = ?next, "run state");
        self.state = next;
    }

    /// Perform one full run. Per-file failures are counted in the summary;
    /// only a download directory that cannot be created is an error.
    pub async fn run(&mut self) -> Result<RunSummary> {
        let res = self.run_phases().await;
        self.enter(RunState::Idle);
        res
    }

    async fn run_phases(&mut self) -> Result<RunSummary> {
        tracing::info!("=== rptfetch run started ===");
        let dir = self.cfg.download_dir.clone();
        fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create download dir {}", dir.display()))?;

        self.enter(RunState::Listing);
        let links = self.discover().await?;
        let mut summary = RunSummary {
            links_found: links.len(),
            ..RunSummary::default()
        };
        if links.is_empty() {
            tracing::warn!("no download links found");
            return Ok(summary);
        }
        tracing::info!("found {} link(s)", links.len());

        self.enter(RunState::Filtering);
        let marker = self.marker();
        let selection = FilterPolicy::new(self.cfg.withheld_days).select(&links, marker.load());
        log_selection(&selection, links.len());
        if selection.up_to_date {
            summary.up_to_date = true;
            tracing::info!("no new files");
            return Ok(summary);
        }
        if selection.eligible.is_empty() {
            tracing::info!("no new files");
            return Ok(summary);
        }

        self.enter(RunState::Fetching);
        let eligible = pool::unique_by_filename(selection.eligible.clone());
        summary.attempted = eligible.clone();
        let fetcher = Fetcher::new(dir, self.cfg.retry.policy(), self.cfg.chunk_size);
        let client = HttpClientConfig::from_config(&self.cfg);
        let workers = self.cfg.worker_count();
        let results = tokio::task::spawn_blocking(move || {
            pool::fetch_all(eligible, &fetcher, &client, workers)
        })
        .await
        .map_err(|e| anyhow::anyhow!("fetch pool join: {}", e))?;
        for (link, outcome) in &results {
            summary.record(link, outcome);
        }

        self.enter(RunState::Finalizing);
        if summary.succeeded > 0 {
            if let Some(date) = selection.max_date {
                match marker.save(date) {
                    Ok(()) => {
                        tracing::info!("saved retention marker {}", date);
                        summary.marker_saved = Some(date);
                    }
                    Err(e) => {
                        tracing::warn!(path = %marker.path().display(), "could not save retention marker: {}", e)
                    }
                }
            }
        }
        for (file, reason) in &summary.failures {
            tracing::warn!(file = %file, "not downloaded: {}", reason);
        }
        tracing::info!("=== rptfetch run finished === {}", summary);
        Ok(summary)
    }

    async fn discover(&self) -> Result<Vec<Link>> {
        let url = self.cfg.listing_url.clone();
        let client = HttpClientConfig::from_config(&self.cfg);
        let rules = LinkRules::from_config(&self.cfg);
        tokio::task::spawn_blocking(move || listing::discover_links(&url, &client, &rules))
            .await
            .map_err(|e| anyhow::anyhow!("listing task join: {}", e))
    }

    /// Discover and filter without downloading or touching the marker.
    pub async fn preview(&self) -> Result<ListingPreview> {
        let links = self.discover().await?;
        let marker = self.marker().load();
        let selection = FilterPolicy::new(self.cfg.withheld_days).select(&links, marker);
        Ok(ListingPreview {
            links,
            marker,
            selection,
        })
    }
}

fn log_selection(selection: &Selection, total: usize) {
    if let (Some(max), Some(cutoff)) = (selection.max_date, selection.cutoff) {
        tracing::info!("newest listed date: {}, cutoff: {}", max, cutoff);
    } else if let Some(max) = selection.max_date {
        tracing::info!("newest listed date: {} (already covered by marker)", max);
    }
    tracing::info!(
        "before filter: {} link(s), after filter: {} link(s)",
        total,
        selection.eligible.len()
    );
}

/// Run once with `cfg`. Entry point for schedulers and the CLI.
pub async fn run_download(cfg: FetchConfig) -> Result<RunSummary> {
    Orchestrator::new(cfg).run().await
}
