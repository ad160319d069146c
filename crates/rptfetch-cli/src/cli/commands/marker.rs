//! `rptfetch marker` – show or clear the retention marker.

use anyhow::{Context, Result};
use rptfetch_core::config::FetchConfig;
use rptfetch_core::marker::RetentionMarker;

pub fn run_marker(cfg: &FetchConfig, clear: bool) -> Result<()> {
    let marker = RetentionMarker::in_dir(&cfg.download_dir);

    if clear {
        let existed = marker
            .clear()
            .with_context(|| format!("failed to remove {}", marker.path().display()))?;
        if existed {
            tracing::info!("cleared retention marker {}", marker.path().display());
            println!("Marker cleared.");
        } else {
            println!("No marker to clear.");
        }
        return Ok(());
    }

    match marker
        .try_load()
        .with_context(|| format!("failed to read {}", marker.path().display()))?
    {
        Some(date) => println!("{}", date),
        None => println!("No marker at {}", marker.path().display()),
    }
    Ok(())
}
