//! Loader for alert rule documents
//!
//! This module provides the `RuleLoader` which reads one JSON document per
//! rule from a rules directory:
//!
//! ```text
//! rules/
//!   _policies.json        # reserved: notification policies
//!   standalone.json       # must carry its own folderUID
//!   validators/
//!     node-down.json      # folderUID defaults to "validators"
//! ```
//!
//! Files are read in lexicographic order of their path relative to the
//! root, so the resulting rule order is deterministic across runs.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::policy::PolicyDocument;
use crate::query::QueryNode;
use crate::rule::{AlertRule, ExecErrState, NoDataState, REQUIRED_RULE_FIELDS, RULE_FIELDS};
use crate::{Defect, Error, Result};

/// Name of the notification policy document inside a rules directory
pub const POLICY_FILE: &str = "_policies.json";

/// Loads all rule documents beneath a directory
pub struct RuleLoader {
    root: PathBuf,
}

/// A discovered rule document
#[derive(Debug)]
struct RuleFile {
    /// Path relative to the root, used for ordering and logs
    relative: String,
    path: PathBuf,
    /// Folder implied by the containing subdirectory
    folder: Option<String>,
}

impl RuleLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Default location of the notification policy document
    pub fn policy_path(&self) -> PathBuf {
        self.root.join(POLICY_FILE)
    }

    /// Load every rule in the directory.
    ///
    /// # Errors
    ///
    /// Returns `DirectoryNotFound` if the root is not a directory, and
    /// `MalformedRule` for the first document that fails to parse or whose
    /// `uid` was already seen.
    pub fn load(&self) -> Result<Vec<AlertRule>> {
        let files = self.discover()?;
        let mut seen: HashMap<String, PathBuf> = HashMap::new();
        let mut rules = Vec::with_capacity(files.len());

        for file in files {
            let content =
                fs::read_to_string(&file.path).map_err(|e| Error::io(&file.path, e))?;
            let rule = parse_rule(&file.path, &content, file.folder.as_deref())?;

            if let Some(first) = seen.get(&rule.uid) {
                return Err(Error::malformed(
                    &file.path,
                    Defect::DuplicateUid {
                        uid: rule.uid.clone(),
                        first: first.clone(),
                    },
                ));
            }
            seen.insert(rule.uid.clone(), file.path.clone());

            tracing::debug!(uid = %rule.uid, file = %file.relative, "Loaded rule");
            rules.push(rule);
        }

        Ok(rules)
    }

    /// Map each uid already stored beneath the root to the file holding it.
    ///
    /// File names are free-form, so this reads every document. Files that
    /// are not JSON objects with a string `uid` are skipped. A missing root
    /// yields an empty map.
    pub fn locate(&self) -> Result<HashMap<String, PathBuf>> {
        if !self.root.is_dir() {
            return Ok(HashMap::new());
        }

        let mut found = HashMap::new();
        for file in self.discover()? {
            let content =
                fs::read_to_string(&file.path).map_err(|e| Error::io(&file.path, e))?;
            let uid = match serde_json::from_str::<Value>(&content) {
                Ok(Value::Object(mut object)) => match object.remove("uid") {
                    Some(Value::String(uid)) => uid,
                    _ => continue,
                },
                _ => {
                    tracing::debug!(file = %file.relative, "Skipping unparseable document");
                    continue;
                }
            };
            found.entry(uid).or_insert(file.path);
        }
        Ok(found)
    }

    /// Collect rule files from the root and its immediate subdirectories
    fn discover(&self) -> Result<Vec<RuleFile>> {
        if !self.root.is_dir() {
            return Err(Error::DirectoryNotFound {
                path: self.root.clone(),
            });
        }

        let mut files = Vec::new();
        for entry in read_dir_sorted(&self.root)? {
            let name = file_name(&entry);
            if is_reserved(&name) {
                continue;
            }
            if entry.is_dir() {
                for nested in read_dir_sorted(&entry)? {
                    let nested_name = file_name(&nested);
                    if is_reserved(&nested_name) || !is_rule_file(&nested) {
                        continue;
                    }
                    files.push(RuleFile {
                        relative: format!("{name}/{nested_name}"),
                        path: nested,
                        folder: Some(name.clone()),
                    });
                }
            } else if is_rule_file(&entry) {
                files.push(RuleFile {
                    relative: name,
                    path: entry,
                    folder: None,
                });
            }
        }

        files.sort_by(|a, b| a.relative.cmp(&b.relative));
        Ok(files)
    }
}

fn read_dir_sorted(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(dir).map_err(|e| Error::io(dir, e))?;
    let mut paths = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| Error::io(dir, e))?;
        paths.push(entry.path());
    }
    paths.sort();
    Ok(paths)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn is_reserved(name: &str) -> bool {
    name.starts_with('_') || name.starts_with('.')
}

fn is_rule_file(path: &Path) -> bool {
    path.is_file() && path.extension().is_some_and(|ext| ext == "json")
}

/// Parse one rule document.
///
/// `folder` is used as `folderUID` when the document does not set one.
/// Structural problems are reported as `MalformedRule` naming `path` and
/// the offending field.
pub fn parse_rule(path: &Path, content: &str, folder: Option<&str>) -> Result<AlertRule> {
    let value: Value = serde_json::from_str(content)
        .map_err(|e| Error::malformed(path, Defect::InvalidJson(e.to_string())))?;
    let Value::Object(mut object) = value else {
        return Err(Error::malformed(path, Defect::NotAnObject));
    };

    if let Some(folder) = folder {
        object
            .entry("folderUID")
            .or_insert_with(|| Value::String(folder.to_string()));
    }

    if let Some(unknown) = object.keys().find(|k| !RULE_FIELDS.contains(&k.as_str())) {
        return Err(Error::malformed(path, Defect::UnknownField(unknown.clone())));
    }
    if let Some(missing) = REQUIRED_RULE_FIELDS.iter().find(|f| !object.contains_key(**f)) {
        return Err(Error::malformed(
            path,
            Defect::MissingField(missing.to_string()),
        ));
    }

    match serde_json::from_value::<AlertRule>(Value::Object(object.clone())) {
        Ok(rule) => Ok(rule),
        Err(e) => {
            let defect = locate_type_error(&object).unwrap_or(Defect::InvalidValue(e.to_string()));
            Err(Error::malformed(path, defect))
        }
    }
}

/// Find the first field whose value does not deserialize to its type
fn locate_type_error(object: &Map<String, Value>) -> Option<Defect> {
    fn check<T: DeserializeOwned>(value: &Value) -> Option<String> {
        serde_json::from_value::<T>(value.clone())
            .err()
            .map(|e| e.to_string())
    }

    #[derive(Deserialize)]
    struct Duration(#[serde(with = "crate::duration")] #[allow(dead_code)] i64);

    RULE_FIELDS.iter().find_map(|field| {
        let value = object.get(*field)?;
        let message = match *field {
            "uid" | "title" | "folderUID" | "ruleGroup" | "condition" => check::<String>(value),
            "queries" => check::<Vec<QueryNode>>(value),
            "forDuration" => check::<Duration>(value),
            "evaluationIntervalSeconds" => check::<i64>(value),
            "labels" | "annotations" => check::<BTreeMap<String, String>>(value),
            "noDataState" => check::<NoDataState>(value),
            "execErrState" => check::<ExecErrState>(value),
            "isPaused" => check::<bool>(value),
            _ => None,
        }?;
        Some(Defect::WrongType {
            field: field.to_string(),
            message,
        })
    })
}

/// Serialize a rule as a pretty-printed document with a trailing newline
pub fn rule_to_json(rule: &AlertRule) -> Result<String> {
    let mut out = serde_json::to_string_pretty(rule)?;
    out.push('\n');
    Ok(out)
}

/// Write a rule to `<root>/<folderUID>/<uid>.json`, creating the folder.
///
/// # Errors
///
/// Returns `UnsafePathComponent` if the folder or uid cannot be used as a
/// file name, or an I/O error if the write fails.
pub fn write_rule(root: &Path, rule: &AlertRule) -> Result<PathBuf> {
    ensure_safe_component(&rule.folder_uid)?;
    ensure_safe_component(&rule.uid)?;

    let dir = root.join(&rule.folder_uid);
    fs::create_dir_all(&dir).map_err(|e| Error::io(&dir, e))?;

    let path = dir.join(format!("{}.json", rule.uid));
    fs::write(&path, rule_to_json(rule)?).map_err(|e| Error::io(&path, e))?;
    Ok(path)
}

/// Write every rule into `root`, returning the written paths.
///
/// A rule whose uid already lives in a document beneath `root` overwrites
/// that document whatever its file name. Other rules go through
/// [`write_rule`].
pub fn write_rules(root: &Path, rules: &[AlertRule]) -> Result<Vec<PathBuf>> {
    let existing = RuleLoader::new(root).locate()?;
    rules
        .iter()
        .map(|rule| match existing.get(&rule.uid) {
            Some(path) => {
                fs::write(path, rule_to_json(rule)?).map_err(|e| Error::io(path, e))?;
                Ok(path.clone())
            }
            None => write_rule(root, rule),
        })
        .collect()
}

fn ensure_safe_component(component: &str) -> Result<()> {
    let unsafe_name = component.is_empty()
        || is_reserved(component)
        || component.contains(['/', '\\'])
        || component.contains("..");
    if unsafe_name {
        return Err(Error::UnsafePathComponent {
            component: component.to_string(),
        });
    }
    Ok(())
}

/// Read a notification policy document
pub fn load_policies(path: &Path) -> Result<PolicyDocument> {
    let content = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
    serde_json::from_str(&content).map_err(|e| Error::InvalidPolicy {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reserved_names() {
        assert!(is_reserved("_policies.json"));
        assert!(is_reserved(".alertsync.toml"));
        assert!(!is_reserved("node-down.json"));
    }

    #[test]
    fn test_safe_components() {
        assert!(ensure_safe_component("validators").is_ok());
        assert!(ensure_safe_component("").is_err());
        assert!(ensure_safe_component("../etc").is_err());
        assert!(ensure_safe_component("a/b").is_err());
        assert!(ensure_safe_component("_hidden").is_err());
    }

    #[test]
    fn test_load_from_missing_dir() {
        let loader = RuleLoader::new("/nonexistent/alertsync/rules");
        let err = loader.load().unwrap_err();
        assert!(matches!(err, Error::DirectoryNotFound { .. }));
    }

    #[test]
    fn test_not_an_object() {
        let err = parse_rule(Path::new("x.json"), "[1, 2]", None).unwrap_err();
        assert!(matches!(
            err,
            Error::MalformedRule {
                defect: Defect::NotAnObject,
                ..
            }
        ));
    }
}
