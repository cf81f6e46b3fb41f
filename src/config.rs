//! Configuration management for caselook using the prefer crate.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::crawl::dates::parse_portal_date;
use crate::crawl::{DriverSettings, QueryFilters};
use crate::scrapers::browser::BrowserEngineConfig;

/// Default portal root.
pub const DEFAULT_BASE_URL: &str = "https://caselook.ru";

/// Errors raised while loading or interpreting configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {format} config {path}: {message}")]
    Parse {
        path: PathBuf,
        format: &'static str,
        message: String,
    },

    #[error("Invalid date for {field}: {value:?} (expected YYYYMMDD)")]
    InvalidDate { field: &'static str, value: String },

    #[error("Invalid value for {field}: {message}")]
    Invalid {
        field: &'static str,
        message: String,
    },

    #[error("Missing {0}: pass it on the command line or set it in the environment")]
    MissingCredential(&'static str),
}

/// Portal endpoint and request identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortalConfig {
    /// Portal root, without trailing slash.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// User agent override. Defaults to a current desktop Chrome.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    #[serde(default = "default_accept_language")]
    pub accept_language: String,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_accept_language() -> String {
    crate::scrapers::ACCEPT_LANGUAGE.to_string()
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            user_agent: None,
            accept_language: default_accept_language(),
        }
    }
}

impl PortalConfig {
    /// Base URL with any trailing slash removed.
    pub fn base(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }
}

/// Crawl pacing and query constants.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlConfig {
    /// Lower bound of every date range, YYYYMMDD.
    #[serde(default = "default_epoch")]
    pub epoch: String,
    /// A court is finished once its probed window reaches this date, YYYYMMDD.
    #[serde(default = "default_cutoff")]
    pub cutoff: String,
    /// Results page sampled to find the next window.
    #[serde(default = "default_probe_page")]
    pub probe_page: u32,
    /// Delay between export link polls in milliseconds.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Give up on a window after this many seconds without a new export link.
    #[serde(default = "default_harvest_timeout_secs")]
    pub harvest_timeout_secs: u64,
    /// Wait after submitting the login form, in milliseconds.
    #[serde(default = "default_login_settle_ms")]
    pub login_settle_ms: u64,
    /// Court chains in flight at once.
    #[serde(default = "default_max_concurrent_courts")]
    pub max_concurrent_courts: usize,
    #[serde(default = "default_document_type_id")]
    pub document_type_id: u32,
    #[serde(default = "default_case_type_id")]
    pub case_type_id: u32,
}

fn default_epoch() -> String {
    "20050101".to_string()
}

fn default_cutoff() -> String {
    "20080101".to_string()
}

fn default_probe_page() -> u32 {
    40
}

fn default_poll_interval_ms() -> u64 {
    500
}

fn default_harvest_timeout_secs() -> u64 {
    300
}

fn default_login_settle_ms() -> u64 {
    1000
}

fn default_max_concurrent_courts() -> usize {
    8
}

fn default_document_type_id() -> u32 {
    150
}

fn default_case_type_id() -> u32 {
    3
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            epoch: default_epoch(),
            cutoff: default_cutoff(),
            probe_page: default_probe_page(),
            poll_interval_ms: default_poll_interval_ms(),
            harvest_timeout_secs: default_harvest_timeout_secs(),
            login_settle_ms: default_login_settle_ms(),
            max_concurrent_courts: default_max_concurrent_courts(),
            document_type_id: default_document_type_id(),
            case_type_id: default_case_type_id(),
        }
    }
}

impl CrawlConfig {
    pub fn epoch_date(&self) -> Result<NaiveDate, ConfigError> {
        parse_date_field("crawl.epoch", &self.epoch)
    }

    pub fn cutoff_date(&self) -> Result<NaiveDate, ConfigError> {
        parse_date_field("crawl.cutoff", &self.cutoff)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn harvest_timeout(&self) -> Duration {
        Duration::from_secs(self.harvest_timeout_secs)
    }

    pub fn login_settle(&self) -> Duration {
        Duration::from_millis(self.login_settle_ms)
    }

    pub fn query_filters(&self) -> Result<QueryFilters, ConfigError> {
        Ok(QueryFilters {
            epoch: self.epoch_date()?,
            document_type_id: self.document_type_id,
            case_type_id: self.case_type_id,
        })
    }

    /// Check the values that would otherwise fail deep inside a crawl.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let epoch = self.epoch_date()?;
        let cutoff = self.cutoff_date()?;
        if cutoff <= epoch {
            return Err(ConfigError::Invalid {
                field: "crawl.cutoff",
                message: format!("{} is not after the epoch {}", self.cutoff, self.epoch),
            });
        }
        if self.probe_page == 0 {
            return Err(ConfigError::Invalid {
                field: "crawl.probe_page",
                message: "pages are numbered from 1".to_string(),
            });
        }
        if self.max_concurrent_courts == 0 {
            return Err(ConfigError::Invalid {
                field: "crawl.max_concurrent_courts",
                message: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

fn parse_date_field(field: &'static str, value: &str) -> Result<NaiveDate, ConfigError> {
    parse_portal_date(value).map_err(|_| ConfigError::InvalidDate {
        field,
        value: value.to_string(),
    })
}

/// CSS selectors for the portal's login form and results view.
///
/// The results view uses generated class names which change when the portal
/// is redeployed, so they are kept out of the code.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectorConfig {
    #[serde(default = "default_email_selector")]
    pub email: String,
    #[serde(default = "default_password_selector")]
    pub password: String,
    #[serde(default = "default_submit_selector")]
    pub submit: String,
    /// The "select all" tick on the results listing.
    #[serde(default = "default_select_all_selector")]
    pub select_all: String,
    /// Export links shown once an export is ready.
    #[serde(default = "default_export_link_selector")]
    pub export_link: String,
}

fn default_email_selector() -> String {
    r#"input[name="email"]"#.to_string()
}

fn default_password_selector() -> String {
    r#"input[name="password"]"#.to_string()
}

fn default_submit_selector() -> String {
    "button".to_string()
}

fn default_select_all_selector() -> String {
    "div.sc-cexmgL.sc-hySdjw.bIWcKG.dGkXVY > div.sc-cexmgL.bIWcKG > div.sc-fAjPcg.cwBrMu > div.sc-cWAxUP.fUJNhd > i.sc-gsnTZi.jwKNJP > svg".to_string()
}

fn default_export_link_selector() -> String {
    "a.sc-ftvSup.fPXEyR".to_string()
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            email: default_email_selector(),
            password: default_password_selector(),
            submit: default_submit_selector(),
            select_all: default_select_all_selector(),
            export_link: default_export_link_selector(),
        }
    }
}

/// Input and output locations. Relative paths resolve against the config
/// file's directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    #[serde(default = "default_catalogue")]
    pub catalogue: String,
    #[serde(default = "default_screenshots_dir")]
    pub screenshots_dir: String,
    #[serde(default = "default_downloads_dir")]
    pub downloads_dir: String,
}

fn default_catalogue() -> String {
    "courts_codes.csv".to_string()
}

fn default_screenshots_dir() -> String {
    "screenshots".to_string()
}

fn default_downloads_dir() -> String {
    "downloads".to_string()
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            catalogue: default_catalogue(),
            screenshots_dir: default_screenshots_dir(),
            downloads_dir: default_downloads_dir(),
        }
    }
}

/// Persistence pipeline settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadSettings {
    /// Concurrent file downloads.
    #[serde(default = "default_download_workers")]
    pub workers: usize,
    /// When false only the item manifest is written.
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_download_workers() -> usize {
    4
}

fn default_true() -> bool {
    true
}

impl Default for DownloadSettings {
    fn default() -> Self {
        Self {
            workers: default_download_workers(),
            enabled: true,
        }
    }
}

/// Configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub portal: PortalConfig,
    #[serde(default)]
    pub crawl: CrawlConfig,
    #[serde(default)]
    pub selectors: SelectorConfig,
    #[serde(default)]
    pub browser: BrowserEngineConfig,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub download: DownloadSettings,
    /// Path to the config file this was loaded from (not serialized).
    #[serde(skip)]
    pub source_path: Option<PathBuf>,
}

/// Filesystem locations after resolving against the config directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPaths {
    pub catalogue: PathBuf,
    pub screenshots_dir: PathBuf,
    pub downloads_dir: PathBuf,
}

impl Config {
    /// Load configuration using prefer crate for discovery.
    /// Automatically discovers caselook config files in standard locations.
    pub async fn load() -> Self {
        match prefer::load("caselook").await {
            Ok(pref_config) => {
                if let Some(path) = pref_config.source_path() {
                    match Self::load_from_path(path).await {
                        Ok(config) => config,
                        Err(e) => {
                            tracing::warn!("{}; using defaults", e);
                            Self::default()
                        }
                    }
                } else {
                    Self::default()
                }
            }
            Err(_) => Self::default(),
        }
    }

    /// Load configuration from a specific file path.
    /// Supports JSON, TOML and YAML based on file extension.
    pub async fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })?;

        let mut config = Self::parse(path, &contents)?;
        config.source_path = Some(path.to_path_buf());
        tracing::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    fn parse(path: &Path, contents: &str) -> Result<Self, ConfigError> {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("json");
        let parse_error = |format: &'static str, message: String| ConfigError::Parse {
            path: path.to_path_buf(),
            format,
            message,
        };

        match ext {
            "toml" => toml::from_str(contents).map_err(|e| parse_error("TOML", e.to_string())),
            "yaml" | "yml" => {
                serde_yaml::from_str(contents).map_err(|e| parse_error("YAML", e.to_string()))
            }
            _ => serde_json::from_str(contents).map_err(|e| parse_error("JSON", e.to_string())),
        }
    }

    /// Get the base directory for resolving relative paths.
    /// Returns the config file's parent directory if available, otherwise None.
    pub fn base_dir(&self) -> Option<PathBuf> {
        self.source_path
            .as_ref()
            .and_then(|p| p.parent().map(|p| p.to_path_buf()))
    }

    /// Resolve a path that may be relative to the config file.
    /// - Absolute paths are returned as-is
    /// - Paths starting with ~ are expanded
    /// - Relative paths are resolved relative to `base_dir`
    pub fn resolve_path(&self, path_str: &str, base_dir: &Path) -> PathBuf {
        let expanded = shellexpand::tilde(path_str);
        let path = Path::new(expanded.as_ref());

        if path.is_absolute() {
            path.to_path_buf()
        } else {
            base_dir.join(path)
        }
    }

    /// Resolve every configured path against the config directory, or the
    /// working directory when no file was loaded.
    pub fn resolved_paths(&self) -> ResolvedPaths {
        let base_dir = self
            .base_dir()
            .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));

        ResolvedPaths {
            catalogue: self.resolve_path(&self.paths.catalogue, &base_dir),
            screenshots_dir: self.resolve_path(&self.paths.screenshots_dir, &base_dir),
            downloads_dir: self.resolve_path(&self.paths.downloads_dir, &base_dir),
        }
    }

    pub fn driver_settings(&self) -> Result<DriverSettings, ConfigError> {
        Ok(DriverSettings {
            cutoff: self.crawl.cutoff_date()?,
            screenshots_dir: self.resolved_paths().screenshots_dir,
        })
    }

    /// Render the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Invalid {
            field: "config",
            message: e.to_string(),
        })
    }
}

/// Portal login. The password never appears in `Debug` output.
#[derive(Clone)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: Option<String>, password: Option<String>) -> Result<Self, ConfigError> {
        let email = email
            .filter(|e| !e.trim().is_empty())
            .ok_or(ConfigError::MissingCredential("email (--email / CASELOOK_EMAIL)"))?;
        let password = password
            .filter(|p| !p.is_empty())
            .ok_or(ConfigError::MissingCredential("password (--password / CASELOOK_PASSWORD)"))?;
        Ok(Self { email, password })
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}
