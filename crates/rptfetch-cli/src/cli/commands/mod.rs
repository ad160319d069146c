//! CLI command handlers.

mod config;
mod links;
mod marker;
mod run;

pub use config::run_config;
pub use links::run_links;
pub use marker::run_marker;
pub use run::run_download_once;
