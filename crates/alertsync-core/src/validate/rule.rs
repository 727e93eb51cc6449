//! Checks on a single rule

use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use regex::Regex;

use alertsync_model::{AlertRule, EvaluatorKind, NumericParam, QueryNode, ThresholdEvaluator};

use super::{Code, Violation};

/// Identifier grammar accepted by the backend
static UID: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[a-z0-9]{6,40}$").unwrap());

/// Numeric right-hand operand of a comparison, e.g. `> 1e9` or `< -0x1f`
static COMPARISON_LITERAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?:[<>]=?|==|!=)\s*(?:bool\s+)?([+-]?(?:0[xX][0-9a-fA-F]+|(?:\d+\.?\d*|\.\d+)(?:[eE][+-]?\d+)?))",
    )
    .unwrap()
});

/// Characters that cannot directly follow a numeric literal
fn continues_literal(c: char) -> bool {
    c == '.' || c == '_' || c.is_ascii_alphanumeric()
}

/// Check one rule and return every violation found.
///
/// Never fails; an empty result means the rule is well formed.
pub fn validate_rule(rule: &AlertRule) -> Vec<Violation> {
    let mut out = Vec::new();

    check_identity(rule, &mut out);
    check_queries(rule, &mut out);
    check_timing(rule, &mut out);
    check_labels(rule, &mut out);

    out
}

fn check_identity(rule: &AlertRule, out: &mut Vec<Violation>) {
    if !UID.is_match(&rule.uid) {
        out.push(Violation::error(
            Code::InvalidUid,
            "uid",
            format!(
                "uid '{}' must be 6 to 40 lowercase letters or digits",
                rule.uid
            ),
        ));
    }

    for (field, value) in [
        ("title", &rule.title),
        ("folderUID", &rule.folder_uid),
        ("ruleGroup", &rule.rule_group),
    ] {
        if value.trim().is_empty() {
            out.push(Violation::error(
                Code::EmptyField,
                field,
                format!("{field} must not be empty"),
            ));
        }
    }
}

fn check_queries(rule: &AlertRule, out: &mut Vec<Violation>) {
    if rule.queries.is_empty() {
        out.push(Violation::error(
            Code::EmptyQueries,
            "queries",
            "rule has no query nodes",
        ));
    }

    let mut first_seen: HashMap<&str, usize> = HashMap::new();
    for (index, node) in rule.queries.iter().enumerate() {
        let ref_id = node.ref_id();
        if let Some(first) = first_seen.get(ref_id) {
            out.push(Violation::error(
                Code::DuplicateRefId,
                format!("queries[{index}].refID"),
                format!("refID '{ref_id}' already used by queries[{first}]"),
            ));
        } else {
            first_seen.insert(ref_id, index);
        }
    }

    let known: HashSet<&str> = rule.ref_ids().collect();
    if !known.contains(rule.condition.as_str()) {
        out.push(Violation::error(
            Code::MissingCondition,
            "condition",
            format!(
                "condition '{}' does not name a query node",
                rule.condition
            ),
        ));
    }

    for (index, node) in rule.queries.iter().enumerate() {
        check_references(index, node, &known, out);
        check_evaluators(index, node, out);
        check_literals(index, node, out);
    }
}

fn check_references(index: usize, node: &QueryNode, known: &HashSet<&str>, out: &mut Vec<Violation>) {
    let field = match node {
        QueryNode::Math(_) => format!("queries[{index}].expression"),
        QueryNode::ClassicConditions(_) => format!("queries[{index}].conditions"),
        _ => format!("queries[{index}].input"),
    };

    let mut reported = HashSet::new();
    for reference in node.references() {
        if !known.contains(reference) && reported.insert(reference) {
            out.push(Violation::error(
                Code::UnresolvedReference,
                field.clone(),
                format!(
                    "node '{}' references unknown refID '{reference}'",
                    node.ref_id()
                ),
            ));
        }
    }
}

fn check_evaluators(index: usize, node: &QueryNode, out: &mut Vec<Violation>) {
    match node {
        QueryNode::Threshold(t) => {
            check_evaluator(&format!("queries[{index}].evaluator"), &t.evaluator, out);
        }
        QueryNode::ClassicConditions(c) => {
            for (cond, condition) in c.conditions.iter().enumerate() {
                let path = format!("queries[{index}].conditions[{cond}].evaluator");
                check_evaluator(&path, &condition.evaluator, out);
            }
        }
        _ => {}
    }
}

fn check_evaluator(path: &str, evaluator: &ThresholdEvaluator, out: &mut Vec<Violation>) {
    let mut values = Vec::with_capacity(evaluator.params.len());
    for (i, param) in evaluator.params.iter().enumerate() {
        match param.value() {
            Some(v) => values.push(v),
            None => out.push(Violation::error(
                Code::InvalidThreshold,
                format!("{path}.params[{i}]"),
                match param {
                    NumericParam::Text(text) => format!("threshold '{text}' is not a finite number"),
                    NumericParam::Number(n) => format!("threshold {n} is not a finite number"),
                },
            )),
        }
    }

    let expected = evaluator.kind.arity();
    if evaluator.params.len() != expected {
        out.push(Violation::error(
            Code::EvaluatorArity,
            format!("{path}.params"),
            format!(
                "{} evaluator takes {expected} param(s), found {}",
                evaluator_name(evaluator.kind),
                evaluator.params.len()
            ),
        ));
        return;
    }

    let is_range = matches!(
        evaluator.kind,
        EvaluatorKind::WithinRange | EvaluatorKind::OutsideRange
    );
    match values.as_slice() {
        [low, high] if is_range && low > high => out.push(Violation::error(
            Code::InvertedRange,
            format!("{path}.params"),
            format!("range lower bound {low} exceeds upper bound {high}"),
        )),
        _ => {}
    }
}

fn evaluator_name(kind: EvaluatorKind) -> &'static str {
    match kind {
        EvaluatorKind::Gt => "gt",
        EvaluatorKind::Lt => "lt",
        EvaluatorKind::WithinRange => "within_range",
        EvaluatorKind::OutsideRange => "outside_range",
    }
}

fn check_literals(index: usize, node: &QueryNode, out: &mut Vec<Violation>) {
    let Some(text) = node.expression_text() else {
        return;
    };
    let field = match node {
        QueryNode::Math(_) => format!("queries[{index}].expression"),
        _ => format!("queries[{index}].expr"),
    };

    for capture in COMPARISON_LITERAL.captures_iter(text) {
        let Some(token) = capture.get(1) else {
            continue;
        };
        // `1e9e9` or `1.2.3`: the token stops early and the rest is garbage
        let trailing: String = text[token.end()..]
            .chars()
            .take_while(|c| continues_literal(*c))
            .collect();
        if !trailing.is_empty() {
            out.push(Violation::error(
                Code::InvalidNumericLiteral,
                field.clone(),
                format!(
                    "comparison operand '{}{trailing}' is not a valid number",
                    token.as_str()
                ),
            ));
            continue;
        }
        if parse_literal(token.as_str()).is_none() {
            out.push(Violation::error(
                Code::InvalidNumericLiteral,
                field.clone(),
                format!(
                    "comparison operand '{}' is not a finite number",
                    token.as_str()
                ),
            ));
        }
    }
}

/// Parse a numeric literal as written in PromQL or a math expression
fn parse_literal(literal: &str) -> Option<f64> {
    let (sign, digits) = match literal.strip_prefix('-') {
        Some(rest) => (-1.0, rest),
        None => (1.0, literal.strip_prefix('+').unwrap_or(literal)),
    };
    let value = match digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
    {
        Some(hex) => i64::from_str_radix(hex, 16).ok()? as f64,
        None => digits.parse::<f64>().ok()?,
    };
    let value = sign * value;
    value.is_finite().then_some(value)
}

fn check_timing(rule: &AlertRule, out: &mut Vec<Violation>) {
    if rule.for_duration < 0 {
        out.push(Violation::error(
            Code::NegativeDuration,
            "forDuration",
            format!("forDuration is negative ({}s)", rule.for_duration),
        ));
    }
    if rule.evaluation_interval_seconds < 0 {
        out.push(Violation::error(
            Code::NegativeDuration,
            "evaluationIntervalSeconds",
            format!(
                "evaluationIntervalSeconds is negative ({}s)",
                rule.evaluation_interval_seconds
            ),
        ));
    }

    let interval = rule.evaluation_interval_seconds;
    if rule.for_duration > 0 && interval > 0 && rule.for_duration % interval != 0 {
        out.push(Violation::warning(
            Code::ForNotMultipleOfInterval,
            "forDuration",
            format!(
                "forDuration {}s is not a multiple of the {interval}s evaluation interval",
                rule.for_duration
            ),
        ));
    }
}

fn check_labels(rule: &AlertRule, out: &mut Vec<Violation>) {
    for (key, value) in &rule.labels {
        if key.trim().is_empty() {
            out.push(Violation::error(
                Code::EmptyLabel,
                "labels",
                "label key must not be empty",
            ));
        } else if value.trim().is_empty() {
            out.push(Violation::error(
                Code::EmptyLabel,
                format!("labels.{key}"),
                format!("label '{key}' has an empty value"),
            ));
        }
    }
}
