//! Browser engine configuration types.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Browser engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserEngineConfig {
    /// Run in headless mode (default: true).
    /// Set to false to watch the login and result pages while debugging.
    #[serde(default = "default_headless")]
    pub headless: bool,

    /// Proxy server URL (e.g., "socks5://127.0.0.1:1080").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy: Option<String>,

    /// Timeout in seconds for page loads and element waits.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Explicit Chrome/Chromium executable. Searched for when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chrome_path: Option<PathBuf>,

    /// Additional Chrome arguments.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub chrome_args: Vec<String>,

    /// Remote Chrome DevTools URL (e.g., "http://localhost:9222").
    /// If set, connects to an existing browser instead of launching one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_url: Option<String>,

    /// Viewport width in pixels.
    #[serde(default = "default_window_width")]
    pub window_width: u32,

    /// Viewport height in pixels.
    #[serde(default = "default_window_height")]
    pub window_height: u32,
}

pub fn default_headless() -> bool {
    true
}

pub fn default_timeout() -> u64 {
    30
}

fn default_window_width() -> u32 {
    1920
}

fn default_window_height() -> u32 {
    1080
}

impl Default for BrowserEngineConfig {
    fn default() -> Self {
        Self {
            headless: default_headless(),
            proxy: None,
            timeout: default_timeout(),
            chrome_path: None,
            chrome_args: Vec::new(),
            remote_url: None,
            window_width: default_window_width(),
            window_height: default_window_height(),
        }
    }
}

impl BrowserEngineConfig {
    pub fn timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.timeout)
    }

    /// Arguments passed to a locally launched browser.
    pub fn launch_args(&self) -> Vec<String> {
        let mut args = vec![
            "--disable-blink-features=AutomationControlled".to_string(),
            "--disable-dev-shm-usage".to_string(),
            "--no-first-run".to_string(),
            "--no-default-browser-check".to_string(),
        ];
        if let Some(proxy) = &self.proxy {
            args.push(format!("--proxy-server={}", proxy));
        }
        args.extend(self.chrome_args.iter().cloned());
        args
    }
}
