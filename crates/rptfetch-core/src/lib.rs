pub mod config;
pub mod logging;

pub mod fetcher;
pub mod filter;
pub mod listing;
pub mod marker;
pub mod orchestrator;
pub mod retry;
pub mod storage;
pub mod url_model;

pub use orchestrator::{run_download, Orchestrator, RunSummary};
