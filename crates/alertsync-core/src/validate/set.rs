//! Checks spanning the whole rule set

use alertsync_model::{AlertRule, PolicyDocument, group_rules};

use super::{Code, Finding, Subject, Violation};

/// Check group-level and policy-level invariants.
///
/// - every rule in an inconsistent group gets an error naming the intervals
/// - a policy no rule routes to is a `dead_policy` warning
/// - a policy repeating faster than it groups gets a warning
pub fn validate_set(rules: &[AlertRule], policies: Option<&PolicyDocument>) -> Vec<Finding> {
    let mut findings = Vec::new();

    for group in group_rules(rules) {
        if group.is_consistent() {
            continue;
        }
        let intervals = group
            .intervals()
            .iter()
            .map(|s| format!("{s}s"))
            .collect::<Vec<_>>()
            .join(", ");
        tracing::debug!(group = %group.key, %intervals, "Inconsistent group interval");

        for rule in &group.rules {
            findings.push(Finding {
                subject: Subject::Rule {
                    uid: rule.uid.clone(),
                },
                violation: Violation::error(
                    Code::InconsistentGroupInterval,
                    "evaluationIntervalSeconds",
                    format!(
                        "rules in group '{}' disagree on the evaluation interval ({intervals})",
                        group.key
                    ),
                ),
            });
        }
    }

    let Some(document) = policies else {
        return findings;
    };

    for (index, policy) in document.policies.iter().enumerate() {
        let subject = Subject::Policy {
            index,
            receiver: policy.receiver.clone(),
        };

        if !rules.iter().any(|rule| policy.routes(&rule.labels)) {
            let matchers = policy
                .matchers
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ");
            findings.push(Finding {
                subject: subject.clone(),
                violation: Violation::warning(
                    Code::DeadPolicy,
                    format!("policies[{index}].matchers"),
                    format!("no rule matches {{{matchers}}}; receiver '{}' is unreachable", policy.receiver),
                ),
            });
        }

        if policy.repeat_interval < policy.group_interval {
            findings.push(Finding {
                subject,
                violation: Violation::warning(
                    Code::RepeatShorterThanGroupInterval,
                    format!("policies[{index}].repeatInterval"),
                    format!(
                        "repeatInterval {}s is shorter than groupInterval {}s",
                        policy.repeat_interval, policy.group_interval
                    ),
                ),
            });
        }
    }

    findings
}

#[cfg(test)]
mod tests {
    use alertsync_model::{MatchOp, Matcher, NotificationPolicy};
    use alertsync_test_utils::RuleBuilder;

    use super::*;

    fn policy(receiver: &str, matchers: Vec<Matcher>) -> NotificationPolicy {
        NotificationPolicy {
            receiver: receiver.to_string(),
            matchers,
            group_by: vec!["alertname".to_string()],
            group_wait: 30,
            group_interval: 300,
            repeat_interval: 14_400,
        }
    }

    fn matcher(label: &str, op: MatchOp, value: &str) -> Matcher {
        Matcher {
            label: label.to_string(),
            op,
            value: value.to_string(),
        }
    }

    #[test]
    fn test_inconsistent_group_flags_every_member() {
        let rules = vec![
            RuleBuilder::new("grouprule01").interval(60).build(),
            RuleBuilder::new("grouprule02").interval(30).for_duration(300).build(),
            RuleBuilder::new("otherrule01").group("sync").interval(30).build(),
        ];

        let findings = validate_set(&rules, None);

        let flagged: Vec<String> = findings.iter().map(|f| f.subject.to_string()).collect();
        assert_eq!(flagged, vec!["grouprule01", "grouprule02"]);
        assert!(findings.iter().all(|f| f.violation.code == Code::InconsistentGroupInterval));
        assert!(findings[0].violation.message.contains("30s, 60s"));
    }

    #[test]
    fn test_dead_policy_warning() {
        let rules = vec![RuleBuilder::new("noderule01").label("team", "validators").build()];
        let document = PolicyDocument {
            policies: vec![
                policy("slack-validators", vec![matcher("team", MatchOp::Equal, "validators")]),
                policy("pagerduty-infra", vec![matcher("team", MatchOp::Regex, "infra.*")]),
            ],
        };

        let findings = validate_set(&rules, Some(&document));

        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].violation.code, Code::DeadPolicy);
        assert_eq!(
            findings[0].subject,
            Subject::Policy {
                index: 1,
                receiver: "pagerduty-infra".to_string()
            }
        );
        assert!(!findings[0].violation.is_error());
    }

    #[test]
    fn test_repeat_shorter_than_group_interval() {
        let rules = vec![RuleBuilder::new("noderule01").build()];
        let mut fast = policy("slack-validators", Vec::new());
        fast.repeat_interval = 60;
        let document = PolicyDocument {
            policies: vec![fast],
        };

        let findings = validate_set(&rules, Some(&document));

        assert_eq!(findings.len(), 1);
        assert_eq!(
            findings[0].violation.code,
            Code::RepeatShorterThanGroupInterval
        );
    }
}
