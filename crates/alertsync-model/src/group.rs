//! Rule groups: rules sharing a folder and evaluation cadence

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::rule::AlertRule;

/// Identifies a rule group within the backend
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GroupKey {
    pub folder_uid: String,
    pub rule_group: String,
}

impl GroupKey {
    pub fn new(folder_uid: impl Into<String>, rule_group: impl Into<String>) -> Self {
        Self {
            folder_uid: folder_uid.into(),
            rule_group: rule_group.into(),
        }
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.folder_uid, self.rule_group)
    }
}

/// A named bundle of rules sharing a folder and evaluation interval
#[derive(Debug, Clone, PartialEq)]
pub struct RuleGroup {
    pub key: GroupKey,
    pub rules: Vec<AlertRule>,
}

impl RuleGroup {
    /// Distinct evaluation intervals declared by the members
    pub fn intervals(&self) -> BTreeSet<i64> {
        self.rules
            .iter()
            .map(|r| r.evaluation_interval_seconds)
            .collect()
    }

    /// The shared interval, or `None` when members disagree
    pub fn interval(&self) -> Option<i64> {
        let intervals = self.intervals();
        if intervals.len() == 1 {
            intervals.into_iter().next()
        } else {
            None
        }
    }

    pub fn is_consistent(&self) -> bool {
        self.intervals().len() <= 1
    }
}

/// Bucket rules into groups, sorted by (folder, group).
///
/// Rule order inside each group is preserved.
pub fn group_rules(rules: &[AlertRule]) -> Vec<RuleGroup> {
    let mut buckets: BTreeMap<GroupKey, Vec<AlertRule>> = BTreeMap::new();
    for rule in rules {
        buckets.entry(rule.group_key()).or_default().push(rule.clone());
    }
    buckets
        .into_iter()
        .map(|(key, rules)| RuleGroup { key, rules })
        .collect()
}
