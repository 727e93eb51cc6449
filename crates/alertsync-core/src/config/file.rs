//! The on-disk `config.toml` / `.alertsync.toml` format

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// One configuration layer. Every key is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigFile {
    pub backend: BackendSection,
    pub retry: RetrySection,
    pub run: RunSection,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BackendSection {
    pub url: Option<String>,
    pub org_id: Option<u64>,
    pub rules_path: Option<String>,
    pub request_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RetrySection {
    pub attempts: Option<u32>,
    pub base_delay_ms: Option<u64>,
    pub max_delay_ms: Option<u64>,
    pub jitter: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunSection {
    pub timeout_secs: Option<u64>,
}

impl ConfigFile {
    /// Parse one layer. `path` is only used in error messages.
    ///
    /// A `token` key anywhere in `[backend]` is refused so credentials
    /// never end up committed next to the rules.
    pub fn parse(path: &Path, content: &str) -> Result<Self> {
        let invalid = |message: String| Error::InvalidConfig {
            path: path.to_path_buf(),
            message,
        };

        let table: toml::Table = toml::from_str(content).map_err(|e| invalid(e.to_string()))?;
        if table
            .get("backend")
            .and_then(|b| b.get("token"))
            .is_some()
        {
            return Err(invalid(
                "tokens are not read from config files; set GRAFANA_TOKEN or pass --token"
                    .to_string(),
            ));
        }

        let config: Self = toml::from_str(content).map_err(|e| invalid(e.to_string()))?;
        match config.retry.jitter {
            Some(jitter) if !(0.0..=1.0).contains(&jitter) => Err(invalid(format!(
                "retry.jitter must be within 0..=1, got {jitter}"
            ))),
            _ => Ok(config),
        }
    }

    /// Overlay `other` on top of `self`; keys set in `other` win
    pub fn merge(&mut self, other: &ConfigFile) {
        fn set<T: Clone>(slot: &mut Option<T>, value: &Option<T>) {
            if value.is_some() {
                slot.clone_from(value);
            }
        }

        set(&mut self.backend.url, &other.backend.url);
        set(&mut self.backend.org_id, &other.backend.org_id);
        set(&mut self.backend.rules_path, &other.backend.rules_path);
        set(
            &mut self.backend.request_timeout_secs,
            &other.backend.request_timeout_secs,
        );
        set(&mut self.retry.attempts, &other.retry.attempts);
        set(&mut self.retry.base_delay_ms, &other.retry.base_delay_ms);
        set(&mut self.retry.max_delay_ms, &other.retry.max_delay_ms);
        set(&mut self.retry.jitter, &other.retry.jitter);
        set(&mut self.run.timeout_secs, &other.run.timeout_secs);
    }
}
