//! Crawl Coordinator Tests
//!
//! Drives the coordinator and the per-court state machine against an
//! in-memory portal that records every submission and scripts every probe.

use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use tempfile::TempDir;
use tokio::sync::mpsc;

use caselook::catalogue::read_catalogue;
use caselook::crawl::{
    poll_for_new_link, Authenticator, CrawlComponents, CrawlCoordinator, CrawlError, CrawlPhase,
    CrawlSummary, CrawlWindow, DriverSettings, LinkHarvester, PageProbe, PortalSession, Result,
    ResultConfirmer, ResultsView, SearchHandle, SearchSubmitter, SeenLinks, Termination,
};
use caselook::models::{CourtId, CourtTarget, DownloadRecord};
use caselook::scrapers::BrowserCookie;

fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y%m%d").unwrap()
}

/// A portal whose probe results and export links are scripted per court.
#[derive(Default)]
struct FakePortal {
    /// Earliest dates returned by successive probes, per court id.
    /// An exhausted script makes the probe fail.
    probes: Mutex<HashMap<String, VecDeque<NaiveDate>>>,
    /// Links every results view of a court shows before its own unique one.
    shared_links: HashMap<String, Vec<String>>,
    /// Courts whose views show only the shared links.
    only_shared: Vec<String>,
    submissions: Mutex<Vec<(String, NaiveDate)>>,
    /// Diagnostic pages opened: court id and the search they landed on.
    snapshots: Mutex<Vec<(String, Option<String>)>>,
    /// Courts whose search submission is rejected.
    failing_submit: Vec<String>,
    /// Courts whose results listing never offers the select-all control.
    failing_confirm: Vec<String>,
    fail_login: bool,
}

impl FakePortal {
    fn probe_script(self, court: &str, dates: &[&str]) -> Self {
        self.probes
            .lock()
            .unwrap()
            .insert(court.to_string(), dates.iter().map(|d| date(d)).collect());
        self
    }

    fn submissions_for(&self, court: &str) -> Vec<NaiveDate> {
        self.submissions
            .lock()
            .unwrap()
            .iter()
            .filter(|(c, _)| c == court)
            .map(|(_, d)| *d)
            .collect()
    }

    fn snapshots_for(&self, court: &str) -> Vec<Option<String>> {
        self.snapshots
            .lock()
            .unwrap()
            .iter()
            .filter(|(c, _)| c == court)
            .map(|(_, h)| h.clone())
            .collect()
    }

    fn court_of(handle: &SearchHandle) -> String {
        handle.as_str().split('-').next().unwrap_or_default().to_string()
    }
}

struct FakeView {
    links: Vec<String>,
}

#[async_trait]
impl ResultsView for FakeView {
    async fn export_links(&self) -> Result<Vec<String>> {
        Ok(self.links.clone())
    }

    async fn save_screenshot(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, b"png")?;
        Ok(())
    }

    async fn close(self: Box<Self>) {}
}

#[async_trait]
impl Authenticator for FakePortal {
    async fn authenticate(&self) -> Result<PortalSession> {
        if self.fail_login {
            return Err(CrawlError::Authentication("bad credentials".to_string()));
        }
        PortalSession::from_cookies(vec![BrowserCookie::new("sid", "abc", "caselook.ru")])
    }
}

#[async_trait]
impl SearchSubmitter for FakePortal {
    async fn submit(&self, _session: &PortalSession, window: &CrawlWindow) -> Result<SearchHandle> {
        self.submissions
            .lock()
            .unwrap()
            .push((window.court.id.to_string(), window.date_upper));
        if self.failing_submit.contains(&window.court.id.to_string()) {
            return Err(CrawlError::Submission("search returned HTTP 500".to_string()));
        }
        Ok(SearchHandle::new(format!(
            "{}-{}",
            window.court.id,
            window.date_upper_string()
        )))
    }
}

#[async_trait]
impl ResultConfirmer for FakePortal {
    async fn confirm(
        &self,
        _session: &PortalSession,
        window: &CrawlWindow,
        handle: &SearchHandle,
    ) -> Result<Box<dyn ResultsView>> {
        let court = window.court.id.to_string();
        if self.failing_confirm.contains(&court) {
            return Err(CrawlError::Confirmation(format!(
                "select-all control not visible for search {}",
                handle
            )));
        }
        let mut links = self.shared_links.get(&court).cloned().unwrap_or_default();
        if !self.only_shared.contains(&court) {
            links.push(format!("https://caselook.ru/export/{}.xlsx", handle));
        }
        Ok(Box::new(FakeView { links }))
    }

    async fn snapshot_page(
        &self,
        _session: &PortalSession,
        window: &CrawlWindow,
        handle: Option<&SearchHandle>,
    ) -> Result<Box<dyn ResultsView>> {
        self.snapshots
            .lock()
            .unwrap()
            .push((window.court.id.to_string(), handle.map(|h| h.to_string())));
        Ok(Box::new(FakeView { links: Vec::new() }))
    }
}

#[async_trait]
impl LinkHarvester for FakePortal {
    async fn harvest(
        &self,
        _session: &PortalSession,
        window: &CrawlWindow,
        _handle: &SearchHandle,
        view: &dyn ResultsView,
        seen: &SeenLinks,
    ) -> Result<DownloadRecord> {
        let link =
            poll_for_new_link(view, seen, Duration::from_millis(1), Duration::from_millis(20)).await?;
        Ok(DownloadRecord::new(link, window.court.id.clone(), window.date_upper))
    }
}

#[async_trait]
impl PageProbe for FakePortal {
    async fn earliest_date(&self, _session: &PortalSession, handle: &SearchHandle) -> Result<NaiveDate> {
        let court = Self::court_of(handle);
        self.probes
            .lock()
            .unwrap()
            .get_mut(&court)
            .and_then(|script| script.pop_front())
            .ok_or_else(|| CrawlError::Probe(format!("HTTP 500 for search {}", handle)))
    }
}

struct Harness {
    portal: Arc<FakePortal>,
    screenshots: TempDir,
}

impl Harness {
    fn new(portal: FakePortal) -> Self {
        Self {
            portal: Arc::new(portal),
            screenshots: TempDir::new().unwrap(),
        }
    }

    fn screenshot(&self, court: &str) -> PathBuf {
        self.screenshots.path().join(format!("{}.png", court))
    }

    fn coordinator(&self, catalogue: Vec<CourtTarget>) -> CrawlCoordinator {
        self.coordinator_with_concurrency(catalogue, 4)
    }

    fn coordinator_with_concurrency(&self, catalogue: Vec<CourtTarget>, max_concurrent: usize) -> CrawlCoordinator {
        CrawlCoordinator::new(
            catalogue,
            CrawlComponents::from_portal(self.portal.clone()),
            DriverSettings {
                cutoff: date("20080101"),
                screenshots_dir: self.screenshots.path().to_path_buf(),
            },
            max_concurrent,
        )
    }

    async fn crawl(&self, coordinator: &CrawlCoordinator, start: &str) -> (CrawlSummary, Vec<DownloadRecord>) {
        let session = coordinator.authenticate(self.portal.as_ref()).await.unwrap();
        let (tx, mut rx) = mpsc::channel(64);
        let summary = coordinator.crawl(&session, date(start), tx).await;

        let mut records = Vec::new();
        while let Some(record) = rx.recv().await {
            records.push(record);
        }
        (summary, records)
    }
}

#[tokio::test]
async fn test_excluded_courts_never_start() {
    let harness = Harness::new(
        FakePortal::default()
            .probe_script("1", &["20071231"])
            .probe_script("2", &["20071231"]),
    );
    let catalogue = read_catalogue("Code,Title,Include\n1,Included court,True\n2,Excluded court,False\n".as_bytes())
        .unwrap();
    let coordinator = harness.coordinator(catalogue);

    let (summary, records) = harness.crawl(&coordinator, "20100101").await;

    assert_eq!(summary.courts(), 1);
    assert_eq!(records.len(), 1);
    assert!(harness.portal.submissions_for("2").is_empty());
    assert!(summary.report_for(&CourtId::new("2")).is_none());
}

#[tokio::test]
async fn test_court_filter_restricts_included_courts() {
    let harness = Harness::new(
        FakePortal::default()
            .probe_script("1", &["20071231"])
            .probe_script("2", &["20071231"]),
    );
    let coordinator = harness
        .coordinator(vec![
            CourtTarget::new("1", "First", true),
            CourtTarget::new("2", "Second", true),
            CourtTarget::new("3", "Third", false),
        ])
        .with_courts(vec![CourtId::new("2"), CourtId::new("3")]);

    let ids: Vec<&str> = coordinator
        .courts_to_crawl()
        .iter()
        .map(|c| c.id.as_str())
        .collect();
    assert_eq!(ids, vec!["2"]);

    let (summary, _) = harness.crawl(&coordinator, "20100101").await;
    assert_eq!(summary.courts(), 1);
    assert!(harness.portal.submissions_for("1").is_empty());
}

#[tokio::test]
async fn test_windows_strictly_decrease_until_cutoff() {
    let harness = Harness::new(FakePortal::default().probe_script(
        "7",
        &["20090615", "20080601", "20071231"],
    ));
    let coordinator = harness.coordinator(vec![CourtTarget::new("7", "Court seven", true)]);

    let (summary, records) = harness.crawl(&coordinator, "20100101").await;
    let report = summary.report_for(&CourtId::new("7")).unwrap();

    let expected = vec![date("20100101"), date("20090615"), date("20080601")];
    assert_eq!(report.windows, expected);
    assert_eq!(harness.portal.submissions_for("7"), expected);
    assert!(report.windows.windows(2).all(|pair| pair[1] < pair[0]));
    assert!(report.windows.iter().all(|d| *d >= date("20050101")));
    assert_eq!(report.searches, 3);
    assert_eq!(report.records, 3);
    assert_eq!(records.len(), 3);
    assert_eq!(
        report.termination,
        Termination::CutoffReached {
            earliest: date("20071231")
        }
    );
}

#[tokio::test]
async fn test_probe_before_cutoff_terminates_with_screenshot() {
    let harness = Harness::new(FakePortal::default().probe_script("42", &["20071231"]));
    let coordinator = harness.coordinator(vec![CourtTarget::new("42", "Court", true)]);

    let (summary, records) = harness.crawl(&coordinator, "20100101").await;
    let report = summary.report_for(&CourtId::new("42")).unwrap();

    assert!(matches!(report.termination, Termination::CutoffReached { .. }));
    assert_eq!(harness.portal.submissions_for("42"), vec![date("20100101")]);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].date_upper, date("20100101"));
    assert_eq!(report.screenshot.as_deref(), Some(harness.screenshot("42").as_path()));
    assert!(harness.screenshot("42").exists());
    assert_eq!(summary.completed(), 1);
}

#[tokio::test]
async fn test_later_probe_narrows_and_resubmits() {
    let harness = Harness::new(FakePortal::default().probe_script("5", &["20090615", "20071231"]));
    let coordinator = harness.coordinator(vec![CourtTarget::new("5", "Court", true)]);

    let (_, records) = harness.crawl(&coordinator, "20100101").await;

    assert_eq!(
        harness.portal.submissions_for("5"),
        vec![date("20100101"), date("20090615")]
    );
    let uppers: Vec<NaiveDate> = records.iter().map(|r| r.date_upper).collect();
    assert_eq!(uppers, vec![date("20100101"), date("20090615")]);
}

#[tokio::test]
async fn test_probe_at_or_after_upper_bound_stalls() {
    let harness = Harness::new(FakePortal::default().probe_script("9", &["20100101"]));
    let coordinator = harness.coordinator(vec![CourtTarget::new("9", "Court", true)]);

    let (summary, _) = harness.crawl(&coordinator, "20100101").await;
    let report = summary.report_for(&CourtId::new("9")).unwrap();

    assert_eq!(
        report.termination,
        Termination::Stalled {
            earliest: date("20100101")
        }
    );
    assert_eq!(report.searches, 1);
    assert!(!report.termination.is_failure());
}

#[tokio::test]
async fn test_same_link_across_windows_emits_once() {
    let shared = "https://caselook.ru/export/shared.xlsx".to_string();
    let mut portal = FakePortal::default()
        .probe_script("1", &["20090615", "20071231"])
        .probe_script("2", &["20071231"]);
    portal.shared_links.insert("1".to_string(), vec![shared.clone()]);
    portal.shared_links.insert("2".to_string(), vec![shared.clone()]);
    portal.only_shared.push("2".to_string());

    // One court at a time, in catalogue order
    let harness = Harness::new(portal);
    let coordinator = harness.coordinator_with_concurrency(
        vec![
            CourtTarget::new("1", "First", true),
            CourtTarget::new("2", "Second", true),
        ],
        1,
    );

    let (summary, records) = harness.crawl(&coordinator, "20100101").await;

    let urls: Vec<&str> = records.iter().map(|r| r.file_url.as_str()).collect();
    assert_eq!(
        urls,
        vec![
            shared.as_str(),
            "https://caselook.ru/export/1-20090615.xlsx",
        ]
    );

    // The second window shows the shared link again and falls through to its own
    let first = summary.report_for(&CourtId::new("1")).unwrap();
    assert_eq!(first.records, 2);
    assert_eq!(records[0].date_upper, date("20100101"));

    // Court 2 only ever shows the link court 1 already emitted
    let second = summary.report_for(&CourtId::new("2")).unwrap();
    assert_eq!(second.records, 0);
    assert!(matches!(
        second.termination,
        Termination::Failed {
            phase: CrawlPhase::Harvesting,
            ..
        }
    ));
}

#[tokio::test]
async fn test_probe_failure_does_not_stop_other_courts() {
    // Court A has no probe script, so its first probe fails
    let harness = Harness::new(FakePortal::default().probe_script("B", &["20071231"]));
    let coordinator = harness.coordinator(vec![
        CourtTarget::new("A", "Failing court", true),
        CourtTarget::new("B", "Healthy court", true),
    ]);

    let (summary, records) = harness.crawl(&coordinator, "20100101").await;

    let failing = summary.report_for(&CourtId::new("A")).unwrap();
    assert!(matches!(
        failing.termination,
        Termination::Failed {
            phase: CrawlPhase::Probing,
            ..
        }
    ));
    assert!(harness.screenshot("A").exists());

    let healthy = summary.report_for(&CourtId::new("B")).unwrap();
    assert!(matches!(healthy.termination, Termination::CutoffReached { .. }));
    assert!(records.iter().any(|r| r.court == CourtId::new("B")));
    assert_eq!(summary.failed().count(), 1);
}

#[tokio::test]
async fn test_submission_failure_stops_only_that_court() {
    let harness = Harness::new(FakePortal {
        failing_submit: vec!["A".to_string()],
        ..FakePortal::default().probe_script("B", &["20071231"])
    });
    let coordinator = harness.coordinator(vec![
        CourtTarget::new("A", "Rejected court", true),
        CourtTarget::new("B", "Healthy court", true),
    ]);

    let (summary, records) = harness.crawl(&coordinator, "20100101").await;

    let failing = summary.report_for(&CourtId::new("A")).unwrap();
    assert!(matches!(
        failing.termination,
        Termination::Failed {
            phase: CrawlPhase::Submitting,
            ..
        }
    ));
    assert_eq!(failing.records, 0);
    assert_eq!(harness.portal.submissions_for("A"), vec![date("20100101")]);

    // No results view was open, so the search screen is captured instead
    assert_eq!(harness.portal.snapshots_for("A"), vec![None]);
    assert_eq!(failing.screenshot.as_deref(), Some(harness.screenshot("A").as_path()));
    assert!(harness.screenshot("A").exists());

    assert!(records.iter().any(|r| r.court == CourtId::new("B")));
    assert!(records.iter().all(|r| r.court != CourtId::new("A")));
    assert!(harness.portal.snapshots_for("B").is_empty());
}

#[tokio::test]
async fn test_confirmation_failure_stops_only_that_court() {
    let harness = Harness::new(FakePortal {
        failing_confirm: vec!["A".to_string()],
        ..FakePortal::default()
            .probe_script("A", &["20090615", "20071231"])
            .probe_script("B", &["20071231"])
    });
    let coordinator = harness.coordinator(vec![
        CourtTarget::new("A", "Unconfirmed court", true),
        CourtTarget::new("B", "Healthy court", true),
    ]);

    let (summary, records) = harness.crawl(&coordinator, "20100101").await;

    let failing = summary.report_for(&CourtId::new("A")).unwrap();
    assert!(matches!(
        failing.termination,
        Termination::Failed {
            phase: CrawlPhase::Confirming,
            ..
        }
    ));
    assert_eq!(failing.searches, 1);
    assert_eq!(harness.portal.submissions_for("A"), vec![date("20100101")]);
    assert_eq!(
        harness.portal.snapshots_for("A"),
        vec![Some("A-20100101".to_string())]
    );
    assert!(harness.screenshot("A").exists());

    let healthy = summary.report_for(&CourtId::new("B")).unwrap();
    assert!(matches!(healthy.termination, Termination::CutoffReached { .. }));
    assert!(records.iter().any(|r| r.court == CourtId::new("B")));
    assert!(records.iter().all(|r| r.court != CourtId::new("A")));
    assert_eq!(summary.failed().count(), 1);
}

#[tokio::test]
async fn test_login_failure_aborts_run() {
    let harness = Harness::new(FakePortal {
        fail_login: true,
        ..FakePortal::default()
    });
    let coordinator = harness.coordinator(vec![CourtTarget::new("1", "Court", true)]);

    let (tx, _rx) = mpsc::channel(8);
    let err = coordinator
        .run(harness.portal.as_ref(), date("20100101"), tx)
        .await
        .unwrap_err();

    assert!(err.is_fatal_to_run());
    assert!(harness.portal.submissions.lock().unwrap().is_empty());
}
