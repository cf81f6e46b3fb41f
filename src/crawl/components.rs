//! Seams between the crawl state machine and the portal.
//!
//! Each step of a court crawl that touches the browser or the network sits
//! behind one of these traits. The portal implementation lives in
//! `scrapers::caselook`; tests substitute in-memory fakes.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;

use super::error::Result;
use super::query::SearchHandle;
use super::seen::SeenLinks;
use super::session::PortalSession;
use super::window::CrawlWindow;
use crate::models::DownloadRecord;

/// Logs in and produces the session every chain shares.
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn authenticate(&self) -> Result<PortalSession>;
}

/// Submits the structured search for a window.
#[async_trait]
pub trait SearchSubmitter: Send + Sync {
    async fn submit(&self, session: &PortalSession, window: &CrawlWindow) -> Result<SearchHandle>;
}

/// Opens the results listing for a search and selects all results.
#[async_trait]
pub trait ResultConfirmer: Send + Sync {
    async fn confirm(
        &self,
        session: &PortalSession,
        window: &CrawlWindow,
        handle: &SearchHandle,
    ) -> Result<Box<dyn ResultsView>>;

    /// Open a page to capture after a step failed without leaving one open.
    ///
    /// Lands on the listing for `handle` when there is one, on the search
    /// screen otherwise.
    async fn snapshot_page(
        &self,
        session: &PortalSession,
        window: &CrawlWindow,
        handle: Option<&SearchHandle>,
    ) -> Result<Box<dyn ResultsView>>;
}

/// Waits for a not-yet-seen export link and turns it into a record.
#[async_trait]
pub trait LinkHarvester: Send + Sync {
    async fn harvest(
        &self,
        session: &PortalSession,
        window: &CrawlWindow,
        handle: &SearchHandle,
        view: &dyn ResultsView,
        seen: &SeenLinks,
    ) -> Result<DownloadRecord>;
}

/// Reads the earliest document date from a fixed results page.
#[async_trait]
pub trait PageProbe: Send + Sync {
    async fn earliest_date(&self, session: &PortalSession, handle: &SearchHandle) -> Result<NaiveDate>;
}

/// An open results listing. Lives for one iteration of a court crawl.
#[async_trait]
pub trait ResultsView: Send + Sync {
    /// Absolute URLs of the export links currently shown.
    async fn export_links(&self) -> Result<Vec<String>>;

    /// Save a full-page screenshot.
    async fn save_screenshot(&self, path: &Path) -> Result<()>;

    /// Close the underlying page.
    async fn close(self: Box<Self>);
}

/// The step implementations a court crawl runs on.
#[derive(Clone)]
pub struct CrawlComponents {
    pub submitter: Arc<dyn SearchSubmitter>,
    pub confirmer: Arc<dyn ResultConfirmer>,
    pub harvester: Arc<dyn LinkHarvester>,
    pub probe: Arc<dyn PageProbe>,
}

impl CrawlComponents {
    /// Use one value for every step, as the portal client does.
    pub fn from_portal<P>(portal: Arc<P>) -> Self
    where
        P: SearchSubmitter + ResultConfirmer + LinkHarvester + PageProbe + 'static,
    {
        Self {
            submitter: portal.clone(),
            confirmer: portal.clone(),
            harvester: portal.clone(),
            probe: portal,
        }
    }
}
