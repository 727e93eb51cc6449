//! Configuration resolution with layered merge
//!
//! The `ConfigResolver` loads configuration layers for a rules directory
//! and overlays environment and command-line overrides on top.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::time::Instant;

use alertsync_remote::config::DEFAULT_REQUEST_TIMEOUT;
use alertsync_remote::{BackendConfig, DEFAULT_RULES_PATH, RetryPolicy};

use super::file::ConfigFile;
use crate::{Error, Result};

/// Run-wide deadline used when nothing else is configured
pub const DEFAULT_RUN_TIMEOUT: Duration = Duration::from_secs(120);

/// Longest run timeout honoured; larger values are clamped to it
pub const MAX_RUN_TIMEOUT: Duration = Duration::from_secs(86_400 * 365 * 30);

/// Name of the per-directory config file
const DIRECTORY_CONFIG: &str = ".alertsync.toml";

/// Values from environment variables and flags; they beat every file layer
#[derive(Clone, Default)]
pub struct Overrides {
    pub url: Option<String>,
    pub token: Option<String>,
    pub org_id: Option<u64>,
    pub timeout_secs: Option<u64>,
    pub retries: Option<u32>,
    pub retry_base_ms: Option<u64>,
}

impl fmt::Debug for Overrides {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Overrides")
            .field("url", &self.url)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("org_id", &self.org_id)
            .field("timeout_secs", &self.timeout_secs)
            .field("retries", &self.retries)
            .field("retry_base_ms", &self.retry_base_ms)
            .finish()
    }
}

/// The effective settings for one run
#[derive(Clone)]
pub struct Settings {
    pub url: Option<String>,
    token: Option<String>,
    pub org_id: Option<u64>,
    pub rules_path: String,
    pub request_timeout: Duration,
    pub retry: RetryPolicy,
    pub run_timeout: Duration,
}

impl Settings {
    /// Apply `overrides` on top of a merged file configuration
    pub fn from_layers(file: &ConfigFile, overrides: &Overrides) -> Self {
        let defaults = RetryPolicy::default();
        let retry = RetryPolicy {
            max_attempts: overrides
                .retries
                .or(file.retry.attempts)
                .unwrap_or(defaults.max_attempts)
                .max(1),
            base_delay: overrides
                .retry_base_ms
                .or(file.retry.base_delay_ms)
                .map_or(defaults.base_delay, Duration::from_millis),
            max_delay: file
                .retry
                .max_delay_ms
                .map_or(defaults.max_delay, Duration::from_millis),
            multiplier: defaults.multiplier,
            jitter: file.retry.jitter.unwrap_or(defaults.jitter),
        };

        Self {
            url: overrides.url.clone().or_else(|| file.backend.url.clone()),
            token: overrides.token.clone().filter(|t| !t.is_empty()),
            org_id: overrides.org_id.or(file.backend.org_id),
            rules_path: file
                .backend
                .rules_path
                .clone()
                .unwrap_or_else(|| DEFAULT_RULES_PATH.to_string()),
            request_timeout: file
                .backend
                .request_timeout_secs
                .map_or(DEFAULT_REQUEST_TIMEOUT, Duration::from_secs),
            retry,
            run_timeout: overrides
                .timeout_secs
                .or(file.run.timeout_secs)
                .map_or(DEFAULT_RUN_TIMEOUT, Duration::from_secs),
        }
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Connection settings for the HTTP backend.
    ///
    /// # Errors
    ///
    /// Returns `MissingBackendUrl` if no layer configured a URL.
    pub fn backend_config(&self) -> Result<BackendConfig> {
        let url = self.url.as_deref().ok_or(Error::MissingBackendUrl)?;
        let mut config = BackendConfig::new(url)
            .with_rules_path(self.rules_path.clone())
            .with_request_timeout(self.request_timeout);
        if let Some(token) = &self.token {
            config = config.with_token(token.clone());
        }
        if let Some(org_id) = self.org_id {
            config = config.with_org_id(org_id);
        }
        Ok(config)
    }

    /// Deadline for a run starting now.
    ///
    /// Timeouts beyond [`MAX_RUN_TIMEOUT`] are clamped so the addition
    /// cannot overflow.
    pub fn deadline(&self) -> Instant {
        let now = Instant::now();
        now.checked_add(self.run_timeout.min(MAX_RUN_TIMEOUT))
            .unwrap_or(now)
    }
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("url", &self.url)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("org_id", &self.org_id)
            .field("rules_path", &self.rules_path)
            .field("request_timeout", &self.request_timeout)
            .field("retry", &self.retry)
            .field("run_timeout", &self.run_timeout)
            .finish()
    }
}

/// Resolves settings for a rules directory
///
/// Configuration is loaded from:
/// 1. User config (`<config_dir>/alertsync/config.toml`, or an explicit file)
/// 2. Directory config (`<rules dir>/.alertsync.toml`)
///
/// followed by [`Overrides`]. Missing layers are skipped. Invalid TOML in
/// any layer produces an error.
pub struct ConfigResolver {
    rules_dir: PathBuf,

    /// Explicit user config file (`--config`, or tests). When `None`,
    /// `dirs::config_dir()` decides.
    user_config_override: Option<PathBuf>,
}

impl ConfigResolver {
    /// Resolver using the platform config directory:
    /// - Linux: `~/.config/alertsync/config.toml`
    /// - macOS: `~/Library/Application Support/alertsync/config.toml`
    /// - Windows: `%APPDATA%\alertsync\config.toml`
    pub fn new(rules_dir: impl Into<PathBuf>) -> Self {
        Self {
            rules_dir: rules_dir.into(),
            user_config_override: None,
        }
    }

    /// Resolver reading the user layer from `path` instead of the platform
    /// config directory.
    pub fn with_user_config(rules_dir: impl Into<PathBuf>, path: impl Into<PathBuf>) -> Self {
        Self {
            rules_dir: rules_dir.into(),
            user_config_override: Some(path.into()),
        }
    }

    fn user_config_path(&self) -> Option<PathBuf> {
        if let Some(path) = &self.user_config_override {
            return Some(path.clone());
        }
        dirs::config_dir().map(|d| d.join("alertsync").join("config.toml"))
    }

    /// Merge the file layers
    pub fn resolve_file(&self) -> Result<ConfigFile> {
        let mut config = ConfigFile::default();

        // Layer 1 - User config
        if let Some(path) = self.user_config_path() {
            if let Some(layer) = read_layer(&path)? {
                tracing::debug!(?path, "Loaded user config (layer 1)");
                config.merge(&layer);
            } else {
                tracing::debug!(?path, "No user config found (layer 1), skipping");
            }
        }

        // Layer 2 - Directory config
        let path = self.rules_dir.join(DIRECTORY_CONFIG);
        if let Some(layer) = read_layer(&path)? {
            tracing::debug!(?path, "Loaded directory config (layer 2)");
            config.merge(&layer);
        }

        Ok(config)
    }

    /// Merge every layer and apply `overrides`
    pub fn resolve(&self, overrides: &Overrides) -> Result<Settings> {
        let file = self.resolve_file()?;
        let settings = Settings::from_layers(&file, overrides);
        tracing::debug!(?settings, "Resolved settings");
        Ok(settings)
    }
}

fn read_layer(path: &Path) -> Result<Option<ConfigFile>> {
    if !path.is_file() {
        return Ok(None);
    }
    let content = fs::read_to_string(path).map_err(|e| Error::InvalidConfig {
        path: path.to_path_buf(),
        message: format!("cannot read file: {e}"),
    })?;
    ConfigFile::parse(path, &content).map(Some)
}
