//! Notification policy document - `<rules dir>/_policies.json`
//!
//! Read-only reference data: which contact point receives alerts carrying
//! which labels, and how notifications are grouped and throttled.
//!
//! # Example JSON
//!
//! ```json
//! {
//!   "policies": [
//!     {
//!       "receiver": "slack-validators",
//!       "matchers": [{ "label": "team", "type": "=", "value": "validators" }],
//!       "groupBy": ["alertname"],
//!       "groupWait": "30s",
//!       "groupInterval": "5m",
//!       "repeatInterval": "4h"
//!     }
//!   ]
//! }
//! ```

use std::collections::BTreeMap;
use std::fmt;

use regex::Regex;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PolicyDocument {
    #[serde(default)]
    pub policies: Vec<NotificationPolicy>,
}

fn default_group_wait() -> i64 {
    30
}

fn default_group_interval() -> i64 {
    300
}

fn default_repeat_interval() -> i64 {
    4 * 3_600
}

/// Routes alerts matching every matcher to `receiver`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationPolicy {
    /// Contact point identifier
    pub receiver: String,
    #[serde(default)]
    pub matchers: Vec<Matcher>,
    #[serde(default)]
    pub group_by: Vec<String>,
    #[serde(default = "default_group_wait", with = "crate::duration")]
    pub group_wait: i64,
    #[serde(default = "default_group_interval", with = "crate::duration")]
    pub group_interval: i64,
    #[serde(default = "default_repeat_interval", with = "crate::duration")]
    pub repeat_interval: i64,
}

impl NotificationPolicy {
    /// True if a rule with these labels would be routed by this policy
    pub fn routes(&self, labels: &BTreeMap<String, String>) -> bool {
        self.matchers.iter().all(|m| m.matches(labels))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Matcher {
    pub label: String,
    #[serde(rename = "type")]
    pub op: MatchOp,
    pub value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchOp {
    #[serde(rename = "=")]
    Equal,
    #[serde(rename = "!=")]
    NotEqual,
    #[serde(rename = "=~")]
    Regex,
    #[serde(rename = "!~")]
    NotRegex,
}

impl fmt::Display for MatchOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Equal => "=",
            Self::NotEqual => "!=",
            Self::Regex => "=~",
            Self::NotRegex => "!~",
        };
        f.write_str(s)
    }
}

impl fmt::Display for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{:?}", self.label, self.op, self.value)
    }
}

impl Matcher {
    /// Anchored regex for `=~`/`!~` matchers
    pub fn regex(&self) -> Result<Regex, regex::Error> {
        Regex::new(&format!("^(?:{})$", self.value))
    }

    /// Alertmanager semantics: an absent label matches as the empty string.
    /// A matcher with an invalid regex matches nothing.
    pub fn matches(&self, labels: &BTreeMap<String, String>) -> bool {
        let actual = labels.get(&self.label).map(String::as_str).unwrap_or("");
        match self.op {
            MatchOp::Equal => actual == self.value,
            MatchOp::NotEqual => actual != self.value,
            MatchOp::Regex => self.regex().is_ok_and(|re| re.is_match(actual)),
            MatchOp::NotRegex => self.regex().is_ok_and(|re| !re.is_match(actual)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn labels(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn matcher(label: &str, op: MatchOp, value: &str) -> Matcher {
        Matcher {
            label: label.to_string(),
            op,
            value: value.to_string(),
        }
    }

    #[test]
    fn test_policy_defaults() {
        let doc: PolicyDocument =
            serde_json::from_value(json!({"policies": [{"receiver": "slack"}]})).unwrap();
        let policy = &doc.policies[0];
        assert_eq!(policy.group_wait, 30);
        assert_eq!(policy.group_interval, 300);
        assert_eq!(policy.repeat_interval, 14_400);
        assert!(policy.matchers.is_empty());
    }

    #[test]
    fn test_matcher_ops() {
        let l = labels(&[("team", "validators"), ("severity", "critical")]);

        assert!(matcher("team", MatchOp::Equal, "validators").matches(&l));
        assert!(!matcher("team", MatchOp::NotEqual, "validators").matches(&l));
        assert!(matcher("severity", MatchOp::Regex, "crit.*").matches(&l));
        assert!(!matcher("severity", MatchOp::Regex, "crit").matches(&l));
        assert!(matcher("severity", MatchOp::NotRegex, "warn.*").matches(&l));
    }

    #[test]
    fn test_absent_label_matches_empty() {
        let l = labels(&[]);
        assert!(matcher("team", MatchOp::Equal, "").matches(&l));
        assert!(!matcher("team", MatchOp::Equal, "validators").matches(&l));
    }

    #[test]
    fn test_invalid_regex_matches_nothing() {
        let l = labels(&[("team", "x")]);
        let m = matcher("team", MatchOp::Regex, "(unclosed");
        assert!(m.regex().is_err());
        assert!(!m.matches(&l));
    }

    #[test]
    fn test_match_op_serde() {
        let m: Matcher =
            serde_json::from_value(json!({"label": "a", "type": "!~", "value": "b"})).unwrap();
        assert_eq!(m.op, MatchOp::NotRegex);
        assert_eq!(m.to_string(), "a!~\"b\"");
    }

    #[test]
    fn test_routes_requires_all_matchers() {
        let policy: NotificationPolicy = serde_json::from_value(json!({
            "receiver": "slack",
            "matchers": [
                {"label": "team", "type": "=", "value": "validators"},
                {"label": "severity", "type": "=", "value": "critical"}
            ]
        }))
        .unwrap();

        assert!(policy.routes(&labels(&[("team", "validators"), ("severity", "critical")])));
        assert!(!policy.routes(&labels(&[("team", "validators")])));
    }
}
