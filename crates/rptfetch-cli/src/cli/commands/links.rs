//! `rptfetch links` – preview the listing and the date filter.

use anyhow::Result;
use rptfetch_core::config::FetchConfig;
use rptfetch_core::Orchestrator;
use std::collections::HashSet;

pub async fn run_links(cfg: FetchConfig) -> Result<()> {
    let orchestrator = Orchestrator::new(cfg);
    let preview = orchestrator.preview().await?;

    if preview.links.is_empty() {
        println!("No download links found.");
        return Ok(());
    }

    let eligible: HashSet<&str> = preview
        .selection
        .eligible
        .iter()
        .map(|l| l.url.as_str())
        .collect();
    let dir = &orchestrator.config().download_dir;
    for link in &preview.links {
        let date = link
            .date
            .map(|d| d.to_string())
            .unwrap_or_else(|| "----------".to_string());
        let status = if dir.join(&link.filename).exists() {
            "present"
        } else if eligible.contains(link.url.as_str()) {
            "eligible"
        } else {
            "withheld"
        };
        println!("{}  {:<8}  {}", date, status, link.url);
    }

    let marker = preview
        .marker
        .map(|d| d.to_string())
        .unwrap_or_else(|| "none".to_string());
    match (preview.selection.max_date, preview.selection.cutoff) {
        (Some(max), Some(cutoff)) => {
            println!("newest: {}  cutoff: {}  marker: {}", max, cutoff, marker)
        }
        (Some(max), None) => println!("newest: {}  marker: {} (up to date)", max, marker),
        _ => println!("marker: {}", marker),
    }
    println!(
        "{} link(s), {} eligible",
        preview.links.len(),
        preview.selection.eligible.len()
    );
    Ok(())
}
