//! The crawl command: log in, walk every court and persist the records.

#[cfg(feature = "browser")]
use console::style;

use caselook::config::Config;
#[cfg(feature = "browser")]
use caselook::config::Credentials;
#[cfg(feature = "browser")]
use caselook::crawl::CrawlSummary;
#[cfg(feature = "browser")]
use caselook::services::{DownloadEvent, DownloadResult};

#[cfg(feature = "browser")]
use crate::cli::helpers::{arrow, failure, format_number, success};

#[cfg(feature = "browser")]
pub async fn cmd_crawl(
    config: &Config,
    courts: Vec<String>,
    no_download: bool,
    email: Option<String>,
    password: Option<String>,
) -> anyhow::Result<()> {
    use anyhow::Context;

    use caselook::scrapers::PortalBrowser;

    let credentials = Credentials::new(email, password)?;
    let browser = PortalBrowser::start(config.browser.clone())
        .await
        .context("Failed to start browser")?;

    let outcome = crawl_with_browser(config, browser.clone(), courts, no_download, credentials).await;
    browser.close().await;
    outcome
}

/// Everything holding a browser handle is dropped before this returns.
#[cfg(feature = "browser")]
async fn crawl_with_browser(
    config: &Config,
    browser: caselook::scrapers::PortalBrowser,
    courts: Vec<String>,
    no_download: bool,
    credentials: Credentials,
) -> anyhow::Result<()> {
    use std::sync::Arc;

    use anyhow::Context;
    use tokio::sync::mpsc;

    use caselook::catalogue::load_catalogue;
    use caselook::crawl::{CrawlComponents, CrawlCoordinator};
    use caselook::models::CourtId;
    use caselook::scrapers::{CaselookPortal, HttpClient, PortalSettings};
    use caselook::services::{DownloadConfig, DownloadService};

    let paths = config.resolved_paths();
    let catalogue = load_catalogue(&paths.catalogue)?;
    let settings = PortalSettings::from_config(config, credentials)?;
    let driver_settings = config.driver_settings()?;

    let http = HttpClient::new(
        config.portal.base(),
        config.browser.timeout(),
        config.portal.user_agent.as_deref(),
        &config.portal.accept_language,
    )
    .context("Failed to build HTTP client")?;

    let portal = Arc::new(CaselookPortal::new(browser, http.clone(), settings));

    let coordinator = CrawlCoordinator::new(
        catalogue,
        CrawlComponents::from_portal(portal.clone()),
        driver_settings,
        config.crawl.max_concurrent_courts,
    )
    .with_courts(courts.into_iter().map(CourtId::new).collect());

    let selected = coordinator.courts_to_crawl().len();
    if selected == 0 {
        println!("{} No courts selected for crawling", style("!").yellow());
        return Ok(());
    }

    let session = coordinator.authenticate(portal.as_ref()).await?;
    println!(
        "{} Logged in at {}, crawling {} court(s)",
        success(),
        session
            .established_at()
            .with_timezone(&chrono::Local)
            .format("%H:%M:%S"),
        selected
    );

    let service = DownloadService::open(
        http,
        DownloadConfig {
            downloads_dir: paths.downloads_dir.clone(),
            workers: config.download.workers,
            fetch_files: config.download.enabled && !no_download,
        },
    )
    .await
    .with_context(|| format!("Failed to open manifest in {}", paths.downloads_dir.display()))?;

    let (record_tx, record_rx) = mpsc::channel(64);
    let (event_tx, event_rx) = mpsc::channel(256);
    let start = chrono::Local::now().date_naive();

    let (summary, result, ()) = tokio::join!(
        coordinator.crawl(&session, start, record_tx),
        service.run(record_rx, session.cookie_header(), event_tx),
        log_events(event_rx),
    );

    print_summary(&summary, &result, &service.manifest_path());
    Ok(())
}

#[cfg(not(feature = "browser"))]
pub async fn cmd_crawl(
    _config: &Config,
    _courts: Vec<String>,
    _no_download: bool,
    _email: Option<String>,
    _password: Option<String>,
) -> anyhow::Result<()> {
    anyhow::bail!("Crawling requires the browser feature: rebuild with --features browser")
}

#[cfg(feature = "browser")]
async fn log_events(mut events: tokio::sync::mpsc::Receiver<DownloadEvent>) {
    while let Some(event) = events.recv().await {
        match event {
            DownloadEvent::Started { url, court, .. } => {
                tracing::debug!("Persisting {} for court {}", url, court);
            }
            DownloadEvent::Completed { url, path, .. } => {
                tracing::info!("Saved {} to {}", url, path.display());
            }
            DownloadEvent::Recorded { url, .. } => {
                tracing::info!("Recorded {}", url);
            }
            DownloadEvent::Failed { url, error, .. } => {
                tracing::warn!("Could not persist {}: {}", url, error);
            }
            DownloadEvent::Progress { .. } => {}
        }
    }
}

#[cfg(feature = "browser")]
fn print_summary(summary: &CrawlSummary, result: &DownloadResult, manifest: &std::path::Path) {
    println!();
    println!("{}", style("Crawl summary").bold());
    println!(
        "  {} {} court(s) crawled, {} reached the cutoff",
        arrow(),
        format_number(summary.courts()),
        format_number(summary.completed())
    );
    println!("  {} {} export link(s) found", arrow(), format_number(summary.records()));

    for report in summary.failed() {
        println!(
            "  {} Court {} stopped: {}",
            failure(),
            report.court.id,
            report.termination
        );
    }

    println!(
        "  {} {} file(s) downloaded, {} recorded only, {} failed",
        if result.failed == 0 { success() } else { failure() },
        format_number(result.downloaded),
        format_number(result.recorded),
        format_number(result.failed)
    );
    println!("  {} Manifest: {}", arrow(), manifest.display());
}
