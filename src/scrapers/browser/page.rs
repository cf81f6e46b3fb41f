//! Page-level helpers: waiting for elements, reading links, screenshots.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use chromiumoxide::element::Element;
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::Page;
use tokio::time::Instant;
use tracing::debug;

const WAIT_POLL: Duration = Duration::from_millis(100);

/// Wait until `selector` matches an element and return it.
pub async fn wait_for_element(page: &Page, selector: &str, timeout: Duration) -> Result<Element> {
    let started = Instant::now();
    loop {
        if let Ok(element) = page.find_element(selector).await {
            return Ok(element);
        }
        if started.elapsed() >= timeout {
            anyhow::bail!("Timed out after {:?} waiting for {}", timeout, selector);
        }
        tokio::time::sleep(WAIT_POLL).await;
    }
}

/// Wait until `selector` matches an element with a non-empty, visible box.
pub async fn wait_for_visible(page: &Page, selector: &str, timeout: Duration) -> Result<Element> {
    let script = visibility_script(selector)?;
    let started = Instant::now();
    loop {
        let visible = match page.evaluate(script.clone()).await {
            Ok(result) => result.into_value::<bool>().unwrap_or(false),
            Err(e) => {
                debug!("Visibility check failed: {}", e);
                false
            }
        };
        if visible {
            return page
                .find_element(selector)
                .await
                .with_context(|| format!("{} disappeared after becoming visible", selector));
        }
        if started.elapsed() >= timeout {
            anyhow::bail!("Timed out after {:?} waiting for {} to become visible", timeout, selector);
        }
        tokio::time::sleep(WAIT_POLL).await;
    }
}

fn visibility_script(selector: &str) -> Result<String> {
    let selector = serde_json::to_string(selector)?;
    Ok(format!(
        r#"(() => {{
            const el = document.querySelector({selector});
            if (!el) return false;
            const rect = el.getBoundingClientRect();
            const style = window.getComputedStyle(el);
            return rect.width > 0 && rect.height > 0
                && style.visibility !== 'hidden' && style.display !== 'none';
        }})()"#
    ))
}

/// Raw `href` attributes of every element matching `selector`.
pub async fn export_hrefs(page: &Page, selector: &str) -> Result<Vec<String>> {
    let selector = serde_json::to_string(selector)?;
    let script = format!(
        "Array.from(document.querySelectorAll({selector})).map(a => a.getAttribute('href')).filter(h => h)"
    );
    let hrefs = page
        .evaluate(script)
        .await
        .context("Failed to read export links")?
        .into_value::<Vec<String>>()
        .context("Export links were not strings")?;
    Ok(hrefs)
}

/// Current URL of the page, if it has navigated anywhere.
pub async fn page_url(page: &Page) -> Result<Option<String>> {
    Ok(page.url().await?)
}

/// Save a full-page PNG screenshot, creating the parent directory.
pub async fn save_full_screenshot(page: &Page, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let params = ScreenshotParams::builder()
        .format(CaptureScreenshotFormat::Png)
        .full_page(true)
        .build();
    page.save_screenshot(params, path)
        .await
        .with_context(|| format!("Failed to save screenshot to {}", path.display()))?;
    debug!("Saved screenshot {}", path.display());
    Ok(())
}

/// Close a page. A failure only means the tab is already gone.
pub async fn close_page(page: Page) {
    if let Err(e) = page.close().await {
        debug!("Closing page failed: {}", e);
    }
}
