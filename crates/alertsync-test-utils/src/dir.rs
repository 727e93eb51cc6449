//! [`RulesDir`], a temporary rules directory for loader and CLI tests.

use std::fs;
use std::path::{Path, PathBuf};

use alertsync_model::{AlertRule, POLICY_FILE, write_rule};
use tempfile::TempDir;

/// A temporary rules directory with helpers for populating it.
///
/// # Example
///
/// ```rust
/// use alertsync_test_utils::{RuleBuilder, RulesDir};
///
/// let dir = RulesDir::new();
/// dir.add_rule(&RuleBuilder::new("valnodedown01").build());
/// dir.assert_file_exists("validators/valnodedown01.json");
/// ```
pub struct RulesDir {
    temp_dir: TempDir,
}

impl Default for RulesDir {
    fn default() -> Self {
        Self::new()
    }
}

impl RulesDir {
    /// Create an empty temporary rules directory.
    pub fn new() -> Self {
        Self {
            temp_dir: TempDir::new().unwrap(),
        }
    }

    /// A directory pre-populated with `rules`.
    pub fn with_rules(rules: &[AlertRule]) -> Self {
        let dir = Self::new();
        for rule in rules {
            dir.add_rule(rule);
        }
        dir
    }

    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Write `rule` to `<folderUID>/<uid>.json`.
    ///
    /// # Panics
    /// Panics if the rule cannot be written.
    pub fn add_rule(&self, rule: &AlertRule) -> PathBuf {
        write_rule(self.root(), rule)
            .unwrap_or_else(|e| panic!("RulesDir::add_rule: failed to write {}: {e}", rule.uid))
    }

    /// Write raw `content` at `relative`, creating parent directories.
    pub fn write(&self, relative: &str, content: &str) -> PathBuf {
        let path = self.root().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, content).unwrap();
        path
    }

    /// Write the notification policy document.
    pub fn write_policies(&self, json: &serde_json::Value) -> PathBuf {
        self.write(POLICY_FILE, &serde_json::to_string_pretty(json).unwrap())
    }

    /// Write the directory-level `.alertsync.toml`.
    pub fn write_config(&self, toml: &str) -> PathBuf {
        self.write(".alertsync.toml", toml)
    }

    /// Assert that `path` (relative to the root) exists.
    ///
    /// # Panics
    /// Panics with a descriptive message if the path does not exist.
    pub fn assert_file_exists(&self, path: &str) {
        let full_path = self.root().join(path);
        assert!(
            full_path.exists(),
            "Expected file to exist: {}",
            full_path.display()
        );
    }
}
