//! Plan execution
//!
//! Operations run one at a time: creates, then updates, then deletes, each
//! in uid order. A failed operation does not stop the run; later
//! operations still execute and nothing already applied is rolled back.
//! Once the deadline passes, every remaining operation is skipped.

use std::fmt;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use alertsync_remote::{Precondition, RemoteError, RuleBackend};

use crate::plan::Plan;

/// Kind of mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Create,
    Update,
    Delete,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Create => write!(f, "create"),
            Self::Update => write!(f, "update"),
            Self::Delete => write!(f, "delete"),
        }
    }
}

/// What happened to one operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "reason", rename_all = "lowercase")]
pub enum Outcome {
    Applied,
    Failed(String),
    Skipped(String),
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Applied => write!(f, "applied"),
            Self::Failed(reason) => write!(f, "failed: {reason}"),
            Self::Skipped(reason) => write!(f, "skipped: {reason}"),
        }
    }
}

/// Result of one planned operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpReport {
    pub uid: String,
    pub action: Action,
    #[serde(flatten)]
    pub outcome: Outcome,
}

/// Report from applying a plan, in execution order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplyReport {
    pub operations: Vec<OpReport>,
}

impl ApplyReport {
    pub fn applied(&self) -> impl Iterator<Item = &OpReport> {
        self.operations
            .iter()
            .filter(|op| op.outcome == Outcome::Applied)
    }

    pub fn failed(&self) -> impl Iterator<Item = &OpReport> {
        self.operations
            .iter()
            .filter(|op| matches!(op.outcome, Outcome::Failed(_)))
    }

    pub fn skipped(&self) -> impl Iterator<Item = &OpReport> {
        self.operations
            .iter()
            .filter(|op| matches!(op.outcome, Outcome::Skipped(_)))
    }

    /// Every operation was applied
    pub fn is_success(&self) -> bool {
        self.operations.iter().all(|op| op.outcome == Outcome::Applied)
    }

    /// Uids whose operation failed or was skipped
    pub fn unfinished_uids(&self) -> Vec<&str> {
        self.operations
            .iter()
            .filter(|op| op.outcome != Outcome::Applied)
            .map(|op| op.uid.as_str())
            .collect()
    }

    fn record(&mut self, uid: &str, action: Action, outcome: Outcome) {
        match &outcome {
            Outcome::Applied => tracing::info!(uid, %action, "Applied"),
            Outcome::Failed(reason) => tracing::warn!(uid, %action, %reason, "Operation failed"),
            Outcome::Skipped(reason) => tracing::debug!(uid, %action, %reason, "Operation skipped"),
        }
        self.operations.push(OpReport {
            uid: uid.to_string(),
            action,
            outcome,
        });
    }
}

/// One queued mutation borrowed from the plan
enum Op<'a> {
    Upsert {
        rule: &'a alertsync_model::AlertRule,
        action: Action,
        precondition: Precondition,
    },
    Delete {
        uid: &'a str,
    },
}

impl Op<'_> {
    fn uid(&self) -> &str {
        match self {
            Self::Upsert { rule, .. } => &rule.uid,
            Self::Delete { uid } => uid,
        }
    }

    fn action(&self) -> Action {
        match self {
            Self::Upsert { action, .. } => *action,
            Self::Delete { .. } => Action::Delete,
        }
    }
}

fn operations(plan: &Plan) -> Vec<Op<'_>> {
    let creates = plan.to_create.iter().map(|rule| Op::Upsert {
        rule,
        action: Action::Create,
        precondition: Precondition::MustNotExist,
    });
    let updates = plan.to_update.iter().map(|update| Op::Upsert {
        rule: &update.local,
        action: Action::Update,
        precondition: update
            .remote
            .meta
            .version
            .map_or(Precondition::Unconditional, Precondition::Version),
    });
    let deletes = plan
        .to_delete
        .iter()
        .map(|remote| Op::Delete { uid: remote.uid() });

    creates.chain(updates).chain(deletes).collect()
}

/// Execute `plan` against `backend`, one operation at a time.
///
/// Creates must not already exist and updates are guarded by the version
/// read during planning, so a rule changed concurrently fails with a
/// conflict instead of being overwritten. Deleting a rule that is already
/// gone counts as applied.
pub async fn apply_plan(plan: &Plan, backend: &dyn RuleBackend, deadline: Instant) -> ApplyReport {
    let mut report = ApplyReport::default();
    let mut halted: Option<String> = None;

    for op in operations(plan) {
        let (uid, action) = (op.uid(), op.action());

        if let Some(reason) = &halted {
            report.record(uid, action, Outcome::Skipped(reason.clone()));
            continue;
        }
        if Instant::now() >= deadline {
            let reason = "deadline exceeded before dispatch".to_string();
            report.record(uid, action, Outcome::Skipped(reason.clone()));
            halted = Some(reason);
            continue;
        }

        let result = match &op {
            Op::Upsert {
                rule, precondition, ..
            } => backend.upsert_rule(rule, *precondition, deadline).await,
            Op::Delete { uid } => match backend.delete_rule(uid, deadline).await {
                Err(RemoteError::NotFound { .. }) => {
                    tracing::debug!(uid, "Rule already absent");
                    Ok(())
                }
                other => other,
            },
        };

        match result {
            Ok(()) => report.record(uid, action, Outcome::Applied),
            Err(err) => {
                if err.is_timeout() && Instant::now() >= deadline {
                    halted = Some("deadline exceeded".to_string());
                }
                report.record(uid, action, Outcome::Failed(err.to_string()));
            }
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_display() {
        assert_eq!(Outcome::Applied.to_string(), "applied");
        assert_eq!(
            Outcome::Failed("boom".into()).to_string(),
            "failed: boom"
        );
    }

    #[test]
    fn test_op_report_serializes_flat() {
        let op = OpReport {
            uid: "noderule01".into(),
            action: Action::Update,
            outcome: Outcome::Failed("conflict".into()),
        };
        let value = serde_json::to_value(&op).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "uid": "noderule01",
                "action": "update",
                "status": "failed",
                "reason": "conflict"
            })
        );
    }

    #[test]
    fn test_report_helpers() {
        let report = ApplyReport {
            operations: vec![
                OpReport {
                    uid: "a".into(),
                    action: Action::Create,
                    outcome: Outcome::Applied,
                },
                OpReport {
                    uid: "b".into(),
                    action: Action::Delete,
                    outcome: Outcome::Skipped("deadline exceeded".into()),
                },
            ],
        };
        assert!(!report.is_success());
        assert_eq!(report.applied().count(), 1);
        assert_eq!(report.skipped().count(), 1);
        assert_eq!(report.unfinished_uids(), vec!["b"]);
    }
}
