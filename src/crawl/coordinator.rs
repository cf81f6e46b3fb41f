//! Runs one court crawl per included catalogue row.

use std::collections::HashSet;

use chrono::NaiveDate;
use futures::stream::{self, StreamExt};
use tokio::sync::mpsc;
use tracing::{error, info};

use super::components::{Authenticator, CrawlComponents};
use super::dates::format_portal_date;
use super::driver::{CourtCrawlDriver, CourtCrawlReport, DriverSettings, Termination};
use super::error::Result;
use super::seen::SeenLinks;
use super::session::PortalSession;
use crate::models::{CourtId, CourtTarget, DownloadRecord};

/// Outcome of a whole crawl run.
#[derive(Debug, Clone, Default)]
pub struct CrawlSummary {
    pub reports: Vec<CourtCrawlReport>,
}

impl CrawlSummary {
    pub fn courts(&self) -> usize {
        self.reports.len()
    }

    pub fn records(&self) -> usize {
        self.reports.iter().map(|r| r.records).sum()
    }

    pub fn completed(&self) -> usize {
        self.reports
            .iter()
            .filter(|r| matches!(r.termination, Termination::CutoffReached { .. }))
            .count()
    }

    pub fn failed(&self) -> impl Iterator<Item = &CourtCrawlReport> {
        self.reports.iter().filter(|r| r.termination.is_failure())
    }

    pub fn report_for(&self, court: &CourtId) -> Option<&CourtCrawlReport> {
        self.reports.iter().find(|r| &r.court.id == court)
    }
}

/// Owns the catalogue and the dedup set for one run.
pub struct CrawlCoordinator {
    catalogue: Vec<CourtTarget>,
    components: CrawlComponents,
    settings: DriverSettings,
    max_concurrent: usize,
    only: Option<HashSet<CourtId>>,
    seen: SeenLinks,
}

impl CrawlCoordinator {
    pub fn new(
        catalogue: Vec<CourtTarget>,
        components: CrawlComponents,
        settings: DriverSettings,
        max_concurrent: usize,
    ) -> Self {
        Self {
            catalogue,
            components,
            settings,
            max_concurrent: max_concurrent.max(1),
            only: None,
            seen: SeenLinks::new(),
        }
    }

    /// Restrict the run to these court ids. An empty list keeps every
    /// included court.
    pub fn with_courts(mut self, ids: Vec<CourtId>) -> Self {
        self.only = if ids.is_empty() {
            None
        } else {
            Some(ids.into_iter().collect())
        };
        self
    }

    /// Courts that will get a crawl chain.
    pub fn courts_to_crawl(&self) -> Vec<&CourtTarget> {
        self.catalogue
            .iter()
            .filter(|court| court.included)
            .filter(|court| self.only.as_ref().map_or(true, |only| only.contains(&court.id)))
            .collect()
    }

    /// Log in once. Any error here aborts the run.
    pub async fn authenticate(&self, authenticator: &dyn Authenticator) -> Result<PortalSession> {
        info!("Logging in");
        match authenticator.authenticate().await {
            Ok(session) => {
                info!("Logged in with {} session cookie(s)", session.cookies().len());
                Ok(session)
            }
            Err(e) => {
                error!("Login failed: {}", e);
                Err(e)
            }
        }
    }

    /// Crawl every selected court with `start` as its first upper bound.
    ///
    /// Records go to `records` as they are found. The sender is dropped when
    /// the last chain finishes so the consumer sees the channel close.
    pub async fn crawl(
        &self,
        session: &PortalSession,
        start: NaiveDate,
        records: mpsc::Sender<DownloadRecord>,
    ) -> CrawlSummary {
        let courts = self.courts_to_crawl();
        info!(
            "Crawling {} of {} catalogued courts, {} at a time",
            courts.len(),
            self.catalogue.len(),
            self.max_concurrent
        );

        let reports = stream::iter(courts)
            .map(|court| {
                let records = records.clone();
                async move {
                    info!(
                        "Starting crawl for court {} with id {} from date {}",
                        court.title,
                        court.id,
                        format_portal_date(start)
                    );
                    CourtCrawlDriver::new(&self.components, session, &self.seen, &self.settings, records)
                        .run(court.clone(), start)
                        .await
                }
            })
            .buffer_unordered(self.max_concurrent)
            .collect::<Vec<_>>()
            .await;
        drop(records);

        let summary = CrawlSummary { reports };
        info!(
            "Crawl finished: {} court(s), {} record(s), {} reached the cutoff, {} failed",
            summary.courts(),
            summary.records(),
            summary.completed(),
            summary.failed().count()
        );
        summary
    }

    /// Authenticate, then crawl from `start`.
    pub async fn run(
        &self,
        authenticator: &dyn Authenticator,
        start: NaiveDate,
        records: mpsc::Sender<DownloadRecord>,
    ) -> Result<CrawlSummary> {
        let session = self.authenticate(authenticator).await?;
        Ok(self.crawl(&session, start, records).await)
    }
}
