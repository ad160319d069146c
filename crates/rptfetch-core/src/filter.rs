//! Date-based selection of the links to download in a run.
//!
//! The newest `withheld_days` of publications are held back because the source
//! may still revise them, and a run is a no-op when the listing has nothing
//! newer than the retention marker.

use chrono::{Days, NaiveDate};

use crate::url_model::Link;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterPolicy {
    /// Days below the newest listed date that are withheld (cutoff = newest - N).
    pub withheld_days: u32,
}

impl Default for FilterPolicy {
    fn default() -> Self {
        Self { withheld_days: 2 }
    }
}

/// Result of applying the policy to one listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    /// Links to download, in listing order.
    pub eligible: Vec<Link>,
    /// Newest date among all listed links; `None` if no link has a date.
    pub max_date: Option<NaiveDate>,
    /// Latest date still eligible; `None` when no date comparison was made.
    pub cutoff: Option<NaiveDate>,
    /// True when the marker already covers `max_date` and the run has nothing to do.
    pub up_to_date: bool,
}

impl FilterPolicy {
    pub fn new(withheld_days: u32) -> Self {
        Self { withheld_days }
    }

    /// Select the links eligible this run, given the current retention marker.
    ///
    /// Links without a date carry no ordering information and always pass.
    pub fn select(&self, links: &[Link], marker: Option<NaiveDate>) -> Selection {
        let max_date = links.iter().filter_map(|l| l.date).max();

        let Some(max_date) = max_date else {
            return Selection {
                eligible: links.to_vec(),
                max_date: None,
                cutoff: None,
                up_to_date: false,
            };
        };

        if marker.is_some_and(|m| max_date <= m) {
            return Selection {
                eligible: Vec::new(),
                max_date: Some(max_date),
                cutoff: None,
                up_to_date: true,
            };
        }

        let cutoff = max_date
            .checked_sub_days(Days::new(u64::from(self.withheld_days)))
            .unwrap_or(NaiveDate::MIN);
        let eligible = links
            .iter()
            .filter(|l| l.date.map_or(true, |d| d <= cutoff))
            .cloned()
            .collect();

        Selection {
            eligible,
            max_date: Some(max_date),
            cutoff: Some(cutoff),
            up_to_date: false,
        }
    }
}
