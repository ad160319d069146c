//! `rptfetch run` – one full download run.

use anyhow::Result;
use rptfetch_core::config::FetchConfig;
use rptfetch_core::Orchestrator;
use std::time::Instant;

pub async fn run_download_once(cfg: FetchConfig) -> Result<()> {
    let started = Instant::now();
    let dir = cfg.download_dir.clone();
    let mut orchestrator = Orchestrator::new(cfg);
    let summary = orchestrator.run().await?;

    if summary.links_found == 0 {
        println!("No download links found.");
    } else if summary.attempted.is_empty() {
        println!("No new files.");
    } else {
        println!(
            "{} ({} of {} listed link(s) eligible) in {}",
            summary,
            summary.attempted.len(),
            summary.links_found,
            dir.display()
        );
        for (file, reason) in &summary.failures {
            println!("  failed: {} ({})", file, reason);
        }
    }
    tracing::debug!(elapsed_ms = started.elapsed().as_millis() as u64, "run command done");
    Ok(())
}
