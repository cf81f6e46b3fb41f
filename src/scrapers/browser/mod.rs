//! Chrome automation over CDP.
//!
//! Uses chromiumoxide to drive a local or remote Chrome for the parts of the
//! portal that only work in a real browser: login, result selection and
//! export links.

mod config;
#[cfg(feature = "browser")]
mod cookies;
#[cfg(feature = "browser")]
mod page;
mod types;

pub use config::BrowserEngineConfig;
#[cfg(feature = "browser")]
pub use cookies::page_cookies;
#[cfg(feature = "browser")]
pub use page::{close_page, export_hrefs, page_url, save_full_screenshot, wait_for_element, wait_for_visible};
pub use types::{cookie_header, resolve_href, BrowserCookie};

#[cfg(feature = "browser")]
use std::path::PathBuf;
#[cfg(feature = "browser")]
use std::sync::Arc;

#[cfg(feature = "browser")]
use anyhow::{Context, Result};
#[cfg(feature = "browser")]
use chromiumoxide::{Browser, BrowserConfig, Page};
#[cfg(feature = "browser")]
use futures::StreamExt;
#[cfg(feature = "browser")]
use tokio::task::JoinHandle;
#[cfg(feature = "browser")]
use tracing::{debug, info};

/// A running browser shared by every crawl chain.
///
/// Cloning shares the same browser. Pages are opened per step and closed by
/// whoever opened them.
#[cfg(feature = "browser")]
#[derive(Clone)]
pub struct PortalBrowser {
    browser: Arc<Browser>,
    handler: Arc<JoinHandle<()>>,
}

#[cfg(feature = "browser")]
impl PortalBrowser {
    /// Common Chrome executable paths to check.
    const CHROME_PATHS: &'static [&'static str] = &[
        // Linux
        "/usr/bin/google-chrome",
        "/usr/bin/google-chrome-stable",
        "/usr/bin/chromium",
        "/usr/bin/chromium-browser",
        "/snap/bin/chromium",
        // macOS
        "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
        "/Applications/Chromium.app/Contents/MacOS/Chromium",
        "/opt/google/chrome/google-chrome",
    ];

    const CHROME_COMMANDS: &'static [&'static str] = &[
        "google-chrome",
        "google-chrome-stable",
        "chromium",
        "chromium-browser",
    ];

    /// Launch a local browser, or connect to `remote_url` when configured.
    pub async fn start(config: BrowserEngineConfig) -> Result<Self> {
        match config.remote_url.clone() {
            Some(remote_url) => Self::connect_remote(config, &remote_url).await,
            None => Self::launch(config).await,
        }
    }

    fn find_chrome(config: &BrowserEngineConfig) -> Result<PathBuf> {
        if let Some(path) = &config.chrome_path {
            if path.exists() {
                return Ok(path.clone());
            }
            anyhow::bail!("Configured Chrome executable not found: {}", path.display());
        }

        for path in Self::CHROME_PATHS {
            let p = std::path::Path::new(path);
            if p.exists() {
                info!("Found Chrome at: {}", path);
                return Ok(p.to_path_buf());
            }
        }

        for cmd in Self::CHROME_COMMANDS {
            if let Ok(path) = which::which(cmd) {
                info!("Found Chrome in PATH: {}", path.display());
                return Ok(path);
            }
        }

        Err(anyhow::anyhow!(
            "Chrome/Chromium not found. Please install it:\n\
             - Arch/Manjaro: sudo pacman -S chromium\n\
             - Ubuntu/Debian: sudo apt install chromium-browser\n\
             - Fedora: sudo dnf install chromium\n\
             - Or set browser.chrome_path / browser.remote_url in the config"
        ))
    }

    async fn launch(config: BrowserEngineConfig) -> Result<Self> {
        info!("Launching browser (headless={})", config.headless);

        let chrome_path = Self::find_chrome(&config)?;
        let mut builder = BrowserConfig::builder()
            .chrome_executable(chrome_path)
            .request_timeout(config.timeout())
            .window_size(config.window_width, config.window_height);

        // with_head means NOT headless
        if !config.headless {
            builder = builder.with_head();
        }

        for arg in config.launch_args() {
            builder = builder.arg(arg);
        }

        let browser_config = builder
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to build browser config: {}", e))?;

        let (browser, mut handler) = Browser::launch(browser_config)
            .await
            .context("Failed to launch browser")?;

        let handler = tokio::spawn(async move {
            while let Some(h) = handler.next().await {
                if h.is_err() {
                    break;
                }
            }
        });

        Ok(Self {
            browser: Arc::new(browser),
            handler: Arc::new(handler),
        })
    }

    async fn connect_remote(config: BrowserEngineConfig, url: &str) -> Result<Self> {
        info!(
            "Connecting to remote browser at {} (timeout: {}s)",
            url, config.timeout
        );

        // The WebSocket URL comes from the /json/version endpoint
        let http_url = url
            .replace("ws://", "http://")
            .replace("wss://", "https://");
        let version_url = format!("{}/json/version", http_url.trim_end_matches('/'));

        let resp: serde_json::Value = reqwest::Client::new()
            .get(&version_url)
            .send()
            .await
            .context("Failed to connect to remote browser")?
            .json()
            .await
            .context("Failed to parse browser version info")?;

        let ws_url = resp
            .get("webSocketDebuggerUrl")
            .and_then(|v| v.as_str())
            .ok_or_else(|| anyhow::anyhow!("No webSocketDebuggerUrl in response"))?;

        info!("Connecting to WebSocket: {}", ws_url);

        let handler_config = chromiumoxide::handler::HandlerConfig {
            request_timeout: config.timeout(),
            ..Default::default()
        };

        let (browser, mut handler) = Browser::connect_with_config(ws_url, handler_config)
            .await
            .context("Failed to connect to remote browser")?;

        let handler = tokio::spawn(async move {
            while let Some(h) = handler.next().await {
                if h.is_err() {
                    break;
                }
            }
        });

        Ok(Self {
            browser: Arc::new(browser),
            handler: Arc::new(handler),
        })
    }

    /// Open a new page at `url`. The caller closes it.
    pub async fn new_page(&self, url: &str) -> Result<Page> {
        debug!("Opening page {}", url);
        self.browser
            .new_page(url)
            .await
            .with_context(|| format!("Failed to open {}", url))
    }

    /// Every cookie in the browser's store.
    pub async fn cookies(&self) -> Result<Vec<BrowserCookie>> {
        let cookies = self
            .browser
            .get_cookies()
            .await
            .context("Failed to read browser cookies")?;
        Ok(cookies.iter().map(BrowserCookie::from).collect())
    }

    /// Shut the browser down if this is the last handle to it.
    pub async fn close(self) {
        let Self { browser, handler } = self;

        match Arc::try_unwrap(browser) {
            Ok(mut browser) => {
                if let Err(e) = browser.close().await {
                    debug!("Browser close failed: {}", e);
                }
                let _ = browser.wait().await;
                handler.abort();
                info!("Browser closed");
            }
            Err(_) => debug!("Browser still in use elsewhere; leaving it running"),
        }
    }
}
