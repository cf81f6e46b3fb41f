//! Date windows and the narrowing decision.

use chrono::NaiveDate;

use super::dates::format_portal_date;
use crate::models::CourtTarget;

/// The current search window of one court crawl.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlWindow {
    pub court: CourtTarget,
    /// Inclusive upper bound of the date range.
    pub date_upper: NaiveDate,
}

impl CrawlWindow {
    pub fn new(court: CourtTarget, date_upper: NaiveDate) -> Self {
        Self { court, date_upper }
    }

    pub fn date_upper_string(&self) -> String {
        format_portal_date(self.date_upper)
    }

    /// Move the upper bound down to `next`.
    ///
    /// Returns false and leaves the window untouched unless `next` is
    /// strictly earlier than the current bound.
    pub fn narrow(&mut self, next: NaiveDate) -> bool {
        if next < self.date_upper {
            self.date_upper = next;
            true
        } else {
            false
        }
    }
}

/// What to do with a court after probing its current window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeDecision {
    /// Resubmit with this upper bound.
    Narrow(NaiveDate),
    /// The earliest date is on or before the cutoff.
    CutoffReached,
    /// The earliest date does not move the window down.
    Stalled,
}

/// Decide the next step from the earliest date found on the probed page.
pub fn decide_after_probe(earliest: NaiveDate, current_upper: NaiveDate, cutoff: NaiveDate) -> ProbeDecision {
    if earliest <= cutoff {
        ProbeDecision::CutoffReached
    } else if earliest >= current_upper {
        ProbeDecision::Stalled
    } else {
        ProbeDecision::Narrow(earliest)
    }
}
