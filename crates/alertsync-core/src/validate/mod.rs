//! Rule validation: coded violations for single rules and rule sets
//!
//! Validation never fails. Every check runs independently and reports all
//! of its findings, so one run surfaces every problem in the rule
//! directory. A rule with no `error` violations is safe to submit.

mod rule;
mod set;

use serde::{Deserialize, Serialize};

use alertsync_model::{AlertRule, PolicyDocument};

pub use rule::validate_rule;
pub use set::validate_set;

/// Severity level for violations
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Suspicious but submittable
    Warning,
    /// Would be rejected by the backend or break evaluation
    Error,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Stable violation codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Code {
    InvalidUid,
    EmptyField,
    EmptyQueries,
    MissingCondition,
    DuplicateRefId,
    UnresolvedReference,
    NegativeDuration,
    ForNotMultipleOfInterval,
    EmptyLabel,
    InvalidThreshold,
    EvaluatorArity,
    InvertedRange,
    InvalidNumericLiteral,
    InconsistentGroupInterval,
    DeadPolicy,
    RepeatShorterThanGroupInterval,
}

impl Code {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::InvalidUid => "invalid_uid",
            Self::EmptyField => "empty_field",
            Self::EmptyQueries => "empty_queries",
            Self::MissingCondition => "missing_condition",
            Self::DuplicateRefId => "duplicate_ref_id",
            Self::UnresolvedReference => "unresolved_reference",
            Self::NegativeDuration => "negative_duration",
            Self::ForNotMultipleOfInterval => "for_not_multiple_of_interval",
            Self::EmptyLabel => "empty_label",
            Self::InvalidThreshold => "invalid_threshold",
            Self::EvaluatorArity => "evaluator_arity",
            Self::InvertedRange => "inverted_range",
            Self::InvalidNumericLiteral => "invalid_numeric_literal",
            Self::InconsistentGroupInterval => "inconsistent_group_interval",
            Self::DeadPolicy => "dead_policy",
            Self::RepeatShorterThanGroupInterval => "repeat_shorter_than_group_interval",
        }
    }
}

impl std::fmt::Display for Code {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single problem found by a check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    pub severity: Severity,
    pub code: Code,
    /// Path of the offending field, e.g. `queries[2].evaluator.params[0]`
    pub field: String,
    pub message: String,
}

impl Violation {
    pub fn error(code: Code, field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            code,
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn warning(code: Code, field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            code,
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

/// What a finding is about
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Subject {
    Rule { uid: String },
    Policy { index: usize, receiver: String },
}

impl std::fmt::Display for Subject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Rule { uid } => write!(f, "{uid}"),
            Self::Policy { index, receiver } => write!(f, "policy[{index}] ({receiver})"),
        }
    }
}

/// A violation attributed to a rule or policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    pub subject: Subject,
    #[serde(flatten)]
    pub violation: Violation,
}

/// Every finding for one rule set
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    /// Number of rules checked
    pub rules_checked: usize,
    pub findings: Vec<Finding>,
}

impl ValidationReport {
    pub fn error_count(&self) -> usize {
        self.findings.iter().filter(|f| f.violation.is_error()).count()
    }

    pub fn warning_count(&self) -> usize {
        self.findings.len() - self.error_count()
    }

    pub fn has_errors(&self) -> bool {
        self.findings.iter().any(|f| f.violation.is_error())
    }

    /// Findings for one rule
    pub fn for_rule<'a>(&'a self, uid: &'a str) -> impl Iterator<Item = &'a Violation> + 'a {
        self.findings.iter().filter_map(move |f| match &f.subject {
            Subject::Rule { uid: u } if u == uid => Some(&f.violation),
            _ => None,
        })
    }
}

/// Validate every rule, then the set as a whole.
///
/// Findings are ordered by rule (input order), then set-level findings.
pub fn validate_all(rules: &[AlertRule], policies: Option<&PolicyDocument>) -> ValidationReport {
    let mut findings = Vec::new();

    for rule in rules {
        let violations = validate_rule(rule);
        if !violations.is_empty() {
            tracing::debug!(uid = %rule.uid, count = violations.len(), "Rule has violations");
        }
        findings.extend(violations.into_iter().map(|violation| Finding {
            subject: Subject::Rule {
                uid: rule.uid.clone(),
            },
            violation,
        }));
    }

    findings.extend(validate_set(rules, policies));

    ValidationReport {
        rules_checked: rules.len(),
        findings,
    }
}
