//! Reconciliation of local rules against backend state
//!
//! A [`Plan`] is computed without side effects, so it can be printed as a
//! dry run and applied later by [`crate::apply_plan`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use similar::TextDiff;

use alertsync_model::AlertRule;
use alertsync_model::rule::RULE_FIELDS;
use alertsync_remote::RemoteRule;

/// A rule present on both sides whose content differs
#[derive(Debug, Clone, PartialEq)]
pub struct RuleUpdate {
    pub local: AlertRule,
    pub remote: RemoteRule,
    /// Top-level fields that differ, in document order
    pub changed_fields: Vec<String>,
}

impl RuleUpdate {
    fn new(local: AlertRule, remote: RemoteRule) -> Self {
        let changed_fields = changed_fields(&remote.rule, &local);
        Self {
            local,
            remote,
            changed_fields,
        }
    }

    pub fn uid(&self) -> &str {
        &self.local.uid
    }

    /// Unified diff of the rule JSON, remote to local
    pub fn unified_diff(&self) -> String {
        let old = pretty(&self.remote.rule);
        let new = pretty(&self.local);
        TextDiff::from_lines(&old, &new)
            .unified_diff()
            .context_radius(3)
            .header(
                &format!("remote/{}", self.uid()),
                &format!("local/{}", self.uid()),
            )
            .to_string()
    }
}

fn pretty(rule: &AlertRule) -> String {
    let mut out = serde_json::to_string_pretty(rule).unwrap_or_default();
    out.push('\n');
    out
}

fn changed_fields(before: &AlertRule, after: &AlertRule) -> Vec<String> {
    let before = serde_json::to_value(before).unwrap_or_default();
    let after = serde_json::to_value(after).unwrap_or_default();
    RULE_FIELDS
        .iter()
        .filter(|field| before.get(**field) != after.get(**field))
        .map(|field| field.to_string())
        .collect()
}

/// Operations needed to make the backend match the local rule set.
///
/// The four lists are disjoint and each is sorted by uid. Equality is
/// structural over [`AlertRule`] and ignores server metadata.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Plan {
    pub to_create: Vec<AlertRule>,
    pub to_update: Vec<RuleUpdate>,
    pub to_delete: Vec<RemoteRule>,
    /// Uids already in sync
    pub unchanged: Vec<String>,
}

/// Counts per plan list
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanSummary {
    pub create: usize,
    pub update: usize,
    pub delete: usize,
    pub unchanged: usize,
}

impl Plan {
    /// Diff `local` against `remote`.
    ///
    /// Uids are assumed unique on each side; for duplicates the last entry
    /// wins.
    pub fn compute(local: &[AlertRule], remote: &[RemoteRule]) -> Self {
        let local: BTreeMap<&str, &AlertRule> =
            local.iter().map(|r| (r.uid.as_str(), r)).collect();
        let remote: BTreeMap<&str, &RemoteRule> =
            remote.iter().map(|r| (r.uid(), r)).collect();

        let mut plan = Plan::default();

        for (uid, rule) in &local {
            match remote.get(uid) {
                None => plan.to_create.push((*rule).clone()),
                Some(existing) if existing.rule == **rule => plan.unchanged.push(uid.to_string()),
                Some(existing) => plan
                    .to_update
                    .push(RuleUpdate::new((*rule).clone(), (*existing).clone())),
            }
        }

        plan.to_delete = remote
            .iter()
            .filter(|(uid, _)| !local.contains_key(*uid))
            .map(|(_, rule)| (*rule).clone())
            .collect();

        tracing::debug!(
            create = plan.to_create.len(),
            update = plan.to_update.len(),
            delete = plan.to_delete.len(),
            unchanged = plan.unchanged.len(),
            "Computed plan"
        );

        plan
    }

    /// True if applying the plan would change nothing
    pub fn is_empty(&self) -> bool {
        self.to_create.is_empty() && self.to_update.is_empty() && self.to_delete.is_empty()
    }

    pub fn summary(&self) -> PlanSummary {
        PlanSummary {
            create: self.to_create.len(),
            update: self.to_update.len(),
            delete: self.to_delete.len(),
            unchanged: self.unchanged.len(),
        }
    }

    /// Uids with a pending operation, in apply order
    pub fn pending_uids(&self) -> Vec<&str> {
        self.to_create
            .iter()
            .map(|r| r.uid.as_str())
            .chain(self.to_update.iter().map(RuleUpdate::uid))
            .chain(self.to_delete.iter().map(RemoteRule::uid))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use alertsync_remote::RemoteMeta;
    use alertsync_test_utils::RuleBuilder;
    use pretty_assertions::assert_eq;

    use super::*;

    fn remote(rule: AlertRule, version: u64) -> RemoteRule {
        RemoteRule::new(
            rule,
            RemoteMeta {
                version: Some(version),
                ..RemoteMeta::default()
            },
        )
    }

    #[test]
    fn test_metadata_does_not_affect_equality() {
        let rule = RuleBuilder::new("noderule01").build();
        let plan = Plan::compute(&[rule.clone()], &[remote(rule, 42)]);

        assert!(plan.is_empty());
        assert_eq!(plan.unchanged, vec!["noderule01"]);
    }

    #[test]
    fn test_update_lists_changed_fields() {
        let before = RuleBuilder::new("noderule01").build();
        let after = RuleBuilder::new("noderule01")
            .title("Node down")
            .label("severity", "critical")
            .build();

        let plan = Plan::compute(&[after], &[remote(before, 1)]);

        assert_eq!(plan.to_update.len(), 1);
        assert_eq!(plan.to_update[0].changed_fields, vec!["title", "labels"]);
    }

    #[test]
    fn test_unified_diff_shows_remote_to_local() {
        let before = RuleBuilder::new("noderule01").for_duration(300).build();
        let after = RuleBuilder::new("noderule01").for_duration(600).build();
        let plan = Plan::compute(&[after], &[remote(before, 1)]);

        let diff = plan.to_update[0].unified_diff();

        assert!(diff.contains("--- remote/noderule01"));
        assert!(diff.contains("+++ local/noderule01"));
        assert!(diff.contains("-  \"forDuration\": \"5m\""));
        assert!(diff.contains("+  \"forDuration\": \"10m\""));
    }

    #[test]
    fn test_pending_uids_follow_apply_order() {
        let local = vec![
            RuleBuilder::new("createme01").build(),
            RuleBuilder::new("updateme01").title("new").build(),
        ];
        let remote_rules = vec![
            remote(RuleBuilder::new("updateme01").build(), 1),
            remote(RuleBuilder::new("deleteme01").build(), 1),
        ];

        let plan = Plan::compute(&local, &remote_rules);

        assert_eq!(plan.pending_uids(), vec!["createme01", "updateme01", "deleteme01"]);
        assert_eq!(
            plan.summary(),
            PlanSummary {
                create: 1,
                update: 1,
                delete: 1,
                unchanged: 0
            }
        );
    }
}
