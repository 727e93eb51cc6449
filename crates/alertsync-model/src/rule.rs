//! Alert rule definition - loaded from `<rules dir>/**/*.json`
//!
//! # Example JSON
//!
//! ```json
//! {
//!   "uid": "valnodedown01",
//!   "title": "Validator node down",
//!   "folderUID": "validators",
//!   "ruleGroup": "availability",
//!   "condition": "C",
//!   "queries": [ ... ],
//!   "forDuration": "5m",
//!   "evaluationIntervalSeconds": 60,
//!   "labels": { "severity": "critical", "team": "validators" },
//!   "noDataState": "Alerting",
//!   "execErrState": "Error"
//! }
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::group::GroupKey;
use crate::query::QueryNode;

/// Top-level fields a rule document may carry
pub const RULE_FIELDS: &[&str] = &[
    "uid",
    "title",
    "folderUID",
    "ruleGroup",
    "condition",
    "queries",
    "forDuration",
    "evaluationIntervalSeconds",
    "labels",
    "annotations",
    "noDataState",
    "execErrState",
    "isPaused",
];

/// Fields without a default
pub const REQUIRED_RULE_FIELDS: &[&str] =
    &["uid", "title", "folderUID", "ruleGroup", "condition", "queries"];

/// Evaluation interval used when a document does not set one
pub const DEFAULT_EVALUATION_INTERVAL_SECONDS: i64 = 60;

fn default_evaluation_interval() -> i64 {
    DEFAULT_EVALUATION_INTERVAL_SECONDS
}

/// One alert definition.
///
/// Equality is structural over every field. Server-assigned metadata
/// (versions, timestamps) is not part of this type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertRule {
    /// Stable identifier, unique within a rule set
    pub uid: String,
    pub title: String,
    #[serde(rename = "folderUID")]
    pub folder_uid: String,
    pub rule_group: String,
    /// `refID` of the node whose result triggers the alert
    pub condition: String,
    pub queries: Vec<QueryNode>,
    /// Pending duration in seconds
    #[serde(default, with = "crate::duration")]
    pub for_duration: i64,
    /// Inherited from the rule group
    #[serde(default = "default_evaluation_interval")]
    pub evaluation_interval_seconds: i64,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    #[serde(default)]
    pub annotations: BTreeMap<String, String>,
    #[serde(default)]
    pub no_data_state: NoDataState,
    #[serde(default)]
    pub exec_err_state: ExecErrState,
    #[serde(default)]
    pub is_paused: bool,
}

impl AlertRule {
    /// Reference IDs of all query nodes, in document order
    pub fn ref_ids(&self) -> impl Iterator<Item = &str> {
        self.queries.iter().map(QueryNode::ref_id)
    }

    /// Look up a node by reference ID
    pub fn query(&self, ref_id: &str) -> Option<&QueryNode> {
        self.queries.iter().find(|q| q.ref_id() == ref_id)
    }

    /// The node named by `condition`, if it exists
    pub fn condition_node(&self) -> Option<&QueryNode> {
        self.query(&self.condition)
    }

    /// The (folder, group) pair this rule belongs to
    pub fn group_key(&self) -> GroupKey {
        GroupKey::new(&self.folder_uid, &self.rule_group)
    }
}

/// State the rule enters when a query returns no data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum NoDataState {
    #[default]
    NoData,
    Alerting,
    #[serde(rename = "OK")]
    Ok,
    KeepLast,
}

/// State the rule enters when evaluation fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ExecErrState {
    #[default]
    Error,
    Alerting,
    #[serde(rename = "OK")]
    Ok,
    KeepLast,
}
