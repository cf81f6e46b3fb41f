//! Per-court crawl state machine.
//!
//! One driver walks a single court from today back to the cutoff:
//!
//! ```text
//! Submitting -> Confirming -> Harvesting -> Probing -> Narrowing -> Submitting ...
//!                                                  \-> Terminated
//! ```
//!
//! Every failure terminates the court. Nothing is retried.

use std::fmt;
use std::path::PathBuf;

use chrono::NaiveDate;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::components::{CrawlComponents, ResultsView};
use super::dates::format_portal_date;
use super::error::CrawlError;
use super::query::SearchHandle;
use super::seen::SeenLinks;
use super::session::PortalSession;
use super::window::{decide_after_probe, CrawlWindow, ProbeDecision};
use crate::models::{CourtTarget, DownloadRecord};

/// Settings every driver in a run shares.
#[derive(Debug, Clone)]
pub struct DriverSettings {
    /// A court is complete once its earliest probed date is on or before this.
    pub cutoff: NaiveDate,
    /// Where diagnostic screenshots go.
    pub screenshots_dir: PathBuf,
}

/// Phases of a court crawl, used to label failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrawlPhase {
    Submitting,
    Confirming,
    Harvesting,
    Probing,
}

impl CrawlPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            CrawlPhase::Submitting => "submitting",
            CrawlPhase::Confirming => "confirming",
            CrawlPhase::Harvesting => "harvesting",
            CrawlPhase::Probing => "probing",
        }
    }
}

/// Why a court crawl ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Termination {
    /// The probed window reached back to the cutoff. The normal ending.
    CutoffReached { earliest: NaiveDate },
    /// The probed page did not move the window down.
    Stalled { earliest: NaiveDate },
    Failed { phase: CrawlPhase, error: String },
}

impl Termination {
    pub fn is_failure(&self) -> bool {
        matches!(self, Termination::Failed { .. })
    }
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Termination::CutoffReached { earliest } => {
                write!(f, "reached cutoff at {}", format_portal_date(*earliest))
            }
            Termination::Stalled { earliest } => {
                write!(f, "stalled at {}", format_portal_date(*earliest))
            }
            Termination::Failed { phase, error } => write!(f, "failed while {}: {}", phase.as_str(), error),
        }
    }
}

/// Outcome of one court crawl.
#[derive(Debug, Clone)]
pub struct CourtCrawlReport {
    pub court: CourtTarget,
    /// Upper bounds searched, in order.
    pub windows: Vec<NaiveDate>,
    /// Searches submitted.
    pub searches: usize,
    /// Records emitted.
    pub records: usize,
    pub termination: Termination,
    pub screenshot: Option<PathBuf>,
}

struct Progress {
    windows: Vec<NaiveDate>,
    searches: usize,
    records: usize,
}

enum CrawlState {
    Submitting,
    Confirming(SearchHandle),
    Harvesting(SearchHandle, Box<dyn ResultsView>),
    Probing(SearchHandle, Box<dyn ResultsView>),
    Narrowing(NaiveDate, Box<dyn ResultsView>),
    Terminated(Termination, Option<Box<dyn ResultsView>>),
}

impl CrawlState {
    fn failed(phase: CrawlPhase, error: CrawlError, view: Option<Box<dyn ResultsView>>) -> Self {
        CrawlState::Terminated(
            Termination::Failed {
                phase,
                error: error.to_string(),
            },
            view,
        )
    }
}

/// Runs the state machine for one court.
pub struct CourtCrawlDriver<'a> {
    components: &'a CrawlComponents,
    session: &'a PortalSession,
    seen: &'a SeenLinks,
    settings: &'a DriverSettings,
    records: mpsc::Sender<DownloadRecord>,
}

impl<'a> CourtCrawlDriver<'a> {
    pub fn new(
        components: &'a CrawlComponents,
        session: &'a PortalSession,
        seen: &'a SeenLinks,
        settings: &'a DriverSettings,
        records: mpsc::Sender<DownloadRecord>,
    ) -> Self {
        Self {
            components,
            session,
            seen,
            settings,
            records,
        }
    }

    /// Crawl `court` starting with `date_upper` as the first upper bound.
    pub async fn run(&self, court: CourtTarget, date_upper: NaiveDate) -> CourtCrawlReport {
        let mut window = CrawlWindow::new(court, date_upper);
        let mut progress = Progress {
            windows: vec![date_upper],
            searches: 0,
            records: 0,
        };
        let mut state = CrawlState::Submitting;

        loop {
            state = match state {
                CrawlState::Submitting => self.submit(&window, &mut progress).await,
                CrawlState::Confirming(handle) => self.confirm(&window, handle).await,
                CrawlState::Harvesting(handle, view) => {
                    self.harvest(&window, handle, view, &mut progress).await
                }
                CrawlState::Probing(handle, view) => self.probe(&window, handle, view).await,
                CrawlState::Narrowing(next, view) => {
                    self.narrow(&mut window, next, view, &mut progress).await
                }
                CrawlState::Terminated(termination, view) => {
                    return self.finish(window, progress, termination, view).await;
                }
            };
        }
    }

    async fn submit(&self, window: &CrawlWindow, progress: &mut Progress) -> CrawlState {
        info!(
            "Making search for court {} with id {} from date {}",
            window.court.title,
            window.court.id,
            window.date_upper_string()
        );
        progress.searches += 1;

        match self.components.submitter.submit(self.session, window).await {
            Ok(handle) => {
                debug!("Court {}: search id {}", window.court.id, handle);
                CrawlState::Confirming(handle)
            }
            Err(e) => {
                let view = self.diagnostic_view(window, None).await;
                CrawlState::failed(CrawlPhase::Submitting, e, view)
            }
        }
    }

    async fn confirm(&self, window: &CrawlWindow, handle: SearchHandle) -> CrawlState {
        match self
            .components
            .confirmer
            .confirm(self.session, window, &handle)
            .await
        {
            Ok(view) => CrawlState::Harvesting(handle, view),
            Err(e) => {
                let view = self.diagnostic_view(window, Some(&handle)).await;
                CrawlState::failed(CrawlPhase::Confirming, e, view)
            }
        }
    }

    /// Page to screenshot when a step failed before a results view was open.
    async fn diagnostic_view(
        &self,
        window: &CrawlWindow,
        handle: Option<&SearchHandle>,
    ) -> Option<Box<dyn ResultsView>> {
        match self
            .components
            .confirmer
            .snapshot_page(self.session, window, handle)
            .await
        {
            Ok(view) => Some(view),
            Err(e) => {
                warn!("Could not open a page to capture for court {}: {}", window.court.id, e);
                None
            }
        }
    }

    async fn harvest(
        &self,
        window: &CrawlWindow,
        handle: SearchHandle,
        view: Box<dyn ResultsView>,
        progress: &mut Progress,
    ) -> CrawlState {
        let record = match self
            .components
            .harvester
            .harvest(self.session, window, &handle, view.as_ref(), self.seen)
            .await
        {
            Ok(record) => record,
            Err(e) => return CrawlState::failed(CrawlPhase::Harvesting, e, Some(view)),
        };

        info!("New download link: {}", record.file_url);
        if self.records.send(record).await.is_err() {
            return CrawlState::failed(CrawlPhase::Harvesting, CrawlError::RecordSinkClosed, Some(view));
        }
        progress.records += 1;

        CrawlState::Probing(handle, view)
    }

    async fn probe(&self, window: &CrawlWindow, handle: SearchHandle, view: Box<dyn ResultsView>) -> CrawlState {
        let earliest = match self
            .components
            .probe
            .earliest_date(self.session, &handle)
            .await
        {
            Ok(date) => date,
            Err(e) => return CrawlState::failed(CrawlPhase::Probing, e, Some(view)),
        };
        info!("Earliest date: {}", format_portal_date(earliest));

        match decide_after_probe(earliest, window.date_upper, self.settings.cutoff) {
            ProbeDecision::Narrow(next) => CrawlState::Narrowing(next, view),
            ProbeDecision::CutoffReached => {
                CrawlState::Terminated(Termination::CutoffReached { earliest }, Some(view))
            }
            ProbeDecision::Stalled => {
                CrawlState::Terminated(Termination::Stalled { earliest }, Some(view))
            }
        }
    }

    async fn narrow(
        &self,
        window: &mut CrawlWindow,
        next: NaiveDate,
        view: Box<dyn ResultsView>,
        progress: &mut Progress,
    ) -> CrawlState {
        view.close().await;

        if !window.narrow(next) {
            return CrawlState::Terminated(Termination::Stalled { earliest: next }, None);
        }
        progress.windows.push(next);
        debug!(
            "Court {}: narrowed window to {}",
            window.court.id,
            window.date_upper_string()
        );

        CrawlState::Submitting
    }

    async fn finish(
        &self,
        window: CrawlWindow,
        progress: Progress,
        termination: Termination,
        view: Option<Box<dyn ResultsView>>,
    ) -> CourtCrawlReport {
        let court = window.court;

        match &termination {
            Termination::CutoffReached { .. } => {
                warn!("Reached cutoff date: terminating crawl for court {}", court.title);
            }
            Termination::Stalled { earliest } => {
                warn!(
                    "Window stuck at {}: terminating crawl for court {}",
                    format_portal_date(*earliest),
                    court.title
                );
            }
            Termination::Failed { phase, error } => {
                warn!(
                    "{} (while {}): terminating crawl for court {}",
                    error,
                    phase.as_str(),
                    court.title
                );
            }
        }

        let mut screenshot = None;
        if let Some(view) = view {
            let path = self.settings.screenshots_dir.join(court.screenshot_filename());
            match view.save_screenshot(&path).await {
                Ok(()) => screenshot = Some(path),
                Err(e) => warn!("Could not save screenshot for court {}: {}", court.id, e),
            }
            view.close().await;
        }

        CourtCrawlReport {
            court,
            windows: progress.windows,
            searches: progress.searches,
            records: progress.records,
            termination,
            screenshot,
        }
    }
}
