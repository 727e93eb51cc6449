//! The backend capability set

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use alertsync_model::AlertRule;

use crate::Result;

/// Server-assigned metadata. Never part of rule equality.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provenance: Option<String>,
}

/// A rule as stored by the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteRule {
    #[serde(flatten)]
    pub rule: AlertRule,
    #[serde(flatten)]
    pub meta: RemoteMeta,
}

impl RemoteRule {
    pub fn new(rule: AlertRule, meta: RemoteMeta) -> Self {
        Self { rule, meta }
    }

    pub fn uid(&self) -> &str {
        &self.rule.uid
    }
}

/// Guard attached to an upsert
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Precondition {
    /// Write regardless of the current remote state
    #[default]
    Unconditional,
    /// Fail with a conflict if the rule already exists
    MustNotExist,
    /// Fail with a conflict unless the remote version still matches
    Version(u64),
}

/// Operations every alerting backend supports.
///
/// Implementations are constructed once per run and passed by reference to
/// every component that talks to the backend. All operations are
/// idempotent: repeating an upsert with identical content changes nothing.
#[async_trait]
pub trait RuleBackend: Send + Sync {
    /// Fetch every rule visible to this organization
    async fn list_rules(&self, deadline: Instant) -> Result<Vec<RemoteRule>>;

    /// Fetch one rule, or `NotFound`
    async fn get_rule(&self, uid: &str, deadline: Instant) -> Result<RemoteRule>;

    /// Create or replace the rule with the same uid
    async fn upsert_rule(
        &self,
        rule: &AlertRule,
        precondition: Precondition,
        deadline: Instant,
    ) -> Result<()>;

    /// Delete one rule, or `NotFound` if it does not exist
    async fn delete_rule(&self, uid: &str, deadline: Instant) -> Result<()>;
}
