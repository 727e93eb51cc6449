//! SyncEngine: the load, validate, plan, apply pipeline
//!
//! Local state is read and validated before the backend is contacted. The
//! backend is read fresh for every plan, and a plan is applied only when
//! the caller asks for it.

use std::path::{Path, PathBuf};

use tokio::time::Instant;

use alertsync_model::{AlertRule, PolicyDocument, RuleLoader, load_policies, write_rules};
use alertsync_remote::RuleBackend;

use crate::apply::{ApplyReport, apply_plan};
use crate::plan::Plan;
use crate::validate::{ValidationReport, validate_all};
use crate::{Error, Result};

/// A loaded and validated rules directory
#[derive(Debug, Clone)]
pub struct LocalRules {
    pub root: PathBuf,
    pub rules: Vec<AlertRule>,
    pub policies: Option<PolicyDocument>,
    pub report: ValidationReport,
}

impl LocalRules {
    /// Load every rule under `root` and validate the set.
    ///
    /// Policies come from `policies` when given, otherwise from the
    /// directory's `_policies.json` if present.
    ///
    /// # Errors
    ///
    /// Loader errors (missing directory, malformed rule, unreadable policy
    /// document). Violations are not errors; see [`LocalRules::ensure_valid`].
    pub fn load(root: &Path, policies: Option<&Path>) -> Result<Self> {
        let loader = RuleLoader::new(root);
        let rules = loader.load()?;

        let policies = match policies {
            Some(path) => Some(load_policies(path)?),
            None => {
                let path = loader.policy_path();
                if path.is_file() {
                    Some(load_policies(&path)?)
                } else {
                    None
                }
            }
        };

        let report = validate_all(&rules, policies.as_ref());
        tracing::info!(
            dir = %root.display(),
            rules = rules.len(),
            errors = report.error_count(),
            warnings = report.warning_count(),
            "Loaded rules"
        );

        Ok(Self {
            root: root.to_path_buf(),
            rules,
            policies,
            report,
        })
    }

    /// Fail if any rule has an error violation
    pub fn ensure_valid(&self) -> Result<()> {
        if self.report.has_errors() {
            return Err(Error::ValidationFailed {
                errors: self.report.error_count(),
            });
        }
        Ok(())
    }
}

/// Orchestrates backend reads and writes for one run.
///
/// The engine borrows one backend for the whole run and shares one
/// deadline across every call it makes.
pub struct SyncEngine<'a> {
    backend: &'a dyn RuleBackend,
    deadline: Instant,
}

impl<'a> SyncEngine<'a> {
    pub fn new(backend: &'a dyn RuleBackend, deadline: Instant) -> Self {
        Self { backend, deadline }
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    /// Fetch backend state and diff `local` against it.
    ///
    /// # Errors
    ///
    /// Any backend error from listing rules aborts planning; no partial
    /// plan is produced.
    pub async fn plan(&self, local: &[AlertRule]) -> Result<Plan> {
        let remote = self.backend.list_rules(self.deadline).await?;
        tracing::debug!(remote = remote.len(), "Fetched remote rules");
        Ok(Plan::compute(local, &remote))
    }

    /// Execute `plan`; see [`apply_plan`]
    pub async fn apply(&self, plan: &Plan) -> ApplyReport {
        apply_plan(plan, self.backend, self.deadline).await
    }

    /// Write every backend rule to `dir` as `<folderUID>/<uid>.json`
    pub async fn export(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        let remote = self.backend.list_rules(self.deadline).await?;
        let rules: Vec<AlertRule> = remote.into_iter().map(|r| r.rule).collect();
        let written = write_rules(dir, &rules)?;
        tracing::info!(dir = %dir.display(), count = written.len(), "Exported rules");
        Ok(written)
    }
}
