//! Archive link modeling.
//!
//! A `Link` is an absolute archive URL plus what can be derived from it: the
//! local filename (last path segment) and the publication date encoded in that
//! filename.

mod date;
mod path;

pub use date::parse_filename_date;
pub use path::filename_from_url_path;

use chrono::NaiveDate;

/// One downloadable archive advertised by the listing page.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Link {
    pub url: String,
    /// Last path segment of `url`; also the name on disk.
    pub filename: String,
    /// Date parsed from `filename`, if it carries a valid `YYYYMMDD` run.
    pub date: Option<NaiveDate>,
}

impl Link {
    /// Builds a link from an absolute URL. Returns `None` when the URL has no
    /// usable last path segment (nothing to name the file after).
    ///
    /// # Examples
    ///
    /// - `Link::parse("https://example.com/rpt/Daily_2024_01_03.zip")` → filename `Daily_2024_01_03.zip`, no date
    /// - `Link::parse("https://example.com/rpt/Daily_20240103.zip")` → date 2024-01-03
    pub fn parse(url: &str) -> Option<Self> {
        let filename = filename_from_url_path(url)?;
        let date = parse_filename_date(&filename);
        Some(Self {
            url: url.to_string(),
            filename,
            date,
        })
    }
}
