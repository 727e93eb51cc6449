//! Configuration resolution
//!
//! Settings are merged from these sources (later sources override earlier):
//!
//! 1. **User config** - `<config_dir>/alertsync/config.toml`
//! 2. **Directory config** - `<rules dir>/.alertsync.toml`
//! 3. **Environment and flags** - `GRAFANA_URL`, `GRAFANA_TOKEN`,
//!    `GRAFANA_ORG_ID`, `--timeout-secs`, ...
//!
//! # Example
//!
//! ```toml
//! [backend]
//! url = "https://grafana.example.com"
//! org_id = 1
//! rules_path = "/api/v1/provisioning/alert-rules"
//! request_timeout_secs = 10
//!
//! [retry]
//! attempts = 3
//! base_delay_ms = 500
//! max_delay_ms = 5000
//! jitter = 0.5
//!
//! [run]
//! timeout_secs = 120
//! ```
//!
//! Tokens are never read from config files.

mod file;
mod resolver;

pub use file::{BackendSection, ConfigFile, RetrySection, RunSection};
pub use resolver::{ConfigResolver, DEFAULT_RUN_TIMEOUT, MAX_RUN_TIMEOUT, Overrides, Settings};
