//! In-process backend for tests and dry runs

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use tokio::time::Instant;

use alertsync_model::AlertRule;

use crate::backend::{Precondition, RemoteMeta, RemoteRule, RuleBackend};
use crate::{RemoteError, Result};

/// Versioned rule store held in memory.
///
/// Every effective write bumps the rule's version. Writing content equal to
/// what is stored changes nothing. Failures can be injected per uid to
/// exercise partial-failure paths.
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    state: Mutex<State>,
}

#[derive(Debug, Default)]
struct State {
    rules: BTreeMap<String, RemoteRule>,
    next_version: u64,
    write_failures: HashMap<String, RemoteError>,
    list_failure: Option<RemoteError>,
    /// Mutations in the order they were accepted, e.g. `upsert:abc123`
    journal: Vec<String>,
}

impl State {
    fn store(&mut self, rule: AlertRule) {
        self.next_version += 1;
        let meta = RemoteMeta {
            version: Some(self.next_version),
            updated: Some(Utc::now()),
            provenance: Some("api".to_string()),
        };
        self.rules
            .insert(rule.uid.clone(), RemoteRule::new(rule, meta));
    }
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend pre-populated with `rules`. Seeding is not journaled.
    pub fn with_rules(rules: impl IntoIterator<Item = AlertRule>) -> Self {
        let backend = Self::new();
        {
            let mut state = backend.lock();
            for rule in rules {
                state.store(rule);
            }
        }
        backend
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Make every upsert or delete of `uid` fail with `error`
    pub fn fail_writes_for(&self, uid: impl Into<String>, error: RemoteError) {
        self.lock().write_failures.insert(uid.into(), error);
    }

    /// Make `list_rules` fail with `error`
    pub fn fail_list(&self, error: RemoteError) {
        self.lock().list_failure = Some(error);
    }

    pub fn clear_failures(&self) {
        let mut state = self.lock();
        state.write_failures.clear();
        state.list_failure = None;
    }

    /// Replace a rule out of band, as a concurrent editor would
    pub fn put_out_of_band(&self, rule: AlertRule) {
        self.lock().store(rule);
    }

    /// Stored rules ordered by uid
    pub fn rules(&self) -> Vec<AlertRule> {
        self.lock().rules.values().map(|r| r.rule.clone()).collect()
    }

    pub fn version_of(&self, uid: &str) -> Option<u64> {
        self.lock().rules.get(uid).and_then(|r| r.meta.version)
    }

    /// Accepted mutations in order
    pub fn journal(&self) -> Vec<String> {
        self.lock().journal.clone()
    }
}

fn check_deadline(operation: &str, deadline: Instant) -> Result<()> {
    if Instant::now() >= deadline {
        return Err(RemoteError::timeout(format!(
            "{operation} did not finish before the deadline"
        )));
    }
    Ok(())
}

#[async_trait]
impl RuleBackend for InMemoryBackend {
    async fn list_rules(&self, deadline: Instant) -> Result<Vec<RemoteRule>> {
        check_deadline("list_rules", deadline)?;
        let state = self.lock();
        if let Some(err) = &state.list_failure {
            return Err(err.clone());
        }
        Ok(state.rules.values().cloned().collect())
    }

    async fn get_rule(&self, uid: &str, deadline: Instant) -> Result<RemoteRule> {
        check_deadline("get_rule", deadline)?;
        self.lock()
            .rules
            .get(uid)
            .cloned()
            .ok_or_else(|| RemoteError::NotFound {
                uid: uid.to_string(),
            })
    }

    async fn upsert_rule(
        &self,
        rule: &AlertRule,
        precondition: Precondition,
        deadline: Instant,
    ) -> Result<()> {
        check_deadline("upsert_rule", deadline)?;
        let mut state = self.lock();
        if let Some(err) = state.write_failures.get(&rule.uid) {
            return Err(err.clone());
        }

        let current = state.rules.get(&rule.uid);
        let conflict = match (precondition, current) {
            (Precondition::MustNotExist, Some(_)) => Some("rule already exists".to_string()),
            (Precondition::Version(_), None) => Some("rule no longer exists".to_string()),
            (Precondition::Version(expected), Some(existing))
                if existing.meta.version != Some(expected) =>
            {
                Some(format!(
                    "expected version {expected}, found {}",
                    existing.meta.version.unwrap_or_default()
                ))
            }
            _ => None,
        };
        if let Some(message) = conflict {
            return Err(RemoteError::Conflict {
                uid: rule.uid.clone(),
                message,
            });
        }

        if current.is_some_and(|existing| existing.rule == *rule) {
            return Ok(());
        }
        state.store(rule.clone());
        state.journal.push(format!("upsert:{}", rule.uid));
        Ok(())
    }

    async fn delete_rule(&self, uid: &str, deadline: Instant) -> Result<()> {
        check_deadline("delete_rule", deadline)?;
        let mut state = self.lock();
        if let Some(err) = state.write_failures.get(uid) {
            return Err(err.clone());
        }
        if state.rules.remove(uid).is_none() {
            return Err(RemoteError::NotFound {
                uid: uid.to_string(),
            });
        }
        state.journal.push(format!("delete:{uid}"));
        Ok(())
    }
}
