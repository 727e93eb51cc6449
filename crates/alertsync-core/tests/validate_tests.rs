//! Validator behaviour on individual rules

use alertsync_core::{Code, Severity, validate_rule};
use alertsync_model::{AlertRule, EvaluatorKind, QueryNode};
use alertsync_test_utils::RuleBuilder;
use alertsync_test_utils::rule::{datasource, math, reduce, threshold, threshold_text};
use pretty_assertions::assert_eq;
use rstest::rstest;

fn codes(rule: &AlertRule) -> Vec<Code> {
    validate_rule(rule).into_iter().map(|v| v.code).collect()
}

#[test]
fn test_default_rule_is_clean() {
    let rule = RuleBuilder::new("valnodedown01")
        .label("severity", "critical")
        .build();
    assert_eq!(validate_rule(&rule), Vec::new());
}

#[test]
fn test_condition_naming_missing_node_is_single_violation() {
    let rule = RuleBuilder::new("valnodedown01")
        .queries(vec![datasource("A", "up"), reduce("B", "A")])
        .condition("C")
        .build();

    let violations = validate_rule(&rule);

    assert_eq!(violations.len(), 1);
    assert_eq!(violations[0].code, Code::MissingCondition);
    assert_eq!(violations[0].field, "condition");
    assert!(violations[0].message.contains("'C'"));
}

#[rstest]
#[case::short_uid(RuleBuilder::new("abc").build(), Code::InvalidUid)]
#[case::uppercase_uid(RuleBuilder::new("NodeDown01").build(), Code::InvalidUid)]
#[case::empty_title(RuleBuilder::new("valnodedown01").title(" ").build(), Code::EmptyField)]
#[case::empty_group(RuleBuilder::new("valnodedown01").group("").build(), Code::EmptyField)]
#[case::negative_for(RuleBuilder::new("valnodedown01").for_duration(-300).build(), Code::NegativeDuration)]
#[case::negative_interval(
    RuleBuilder::new("valnodedown01").interval(-60).for_duration(0).build(),
    Code::NegativeDuration
)]
#[case::empty_label_value(RuleBuilder::new("valnodedown01").label("team", "").build(), Code::EmptyLabel)]
#[case::empty_label_key(RuleBuilder::new("valnodedown01").label("", "x").build(), Code::EmptyLabel)]
fn test_single_error(#[case] rule: AlertRule, #[case] expected: Code) {
    let violations = validate_rule(&rule);
    assert_eq!(violations.len(), 1, "{violations:?}");
    assert_eq!(violations[0].code, expected);
    assert_eq!(violations[0].severity, Severity::Error);
}

#[test]
fn test_empty_queries_also_misses_condition() {
    let rule = RuleBuilder::new("valnodedown01").queries(Vec::new()).build();
    assert_eq!(codes(&rule), vec![Code::EmptyQueries, Code::MissingCondition]);
}

#[test]
fn test_duplicate_ref_id() {
    let rule = RuleBuilder::new("valnodedown01")
        .query(reduce("B", "A"))
        .build();

    let violations = validate_rule(&rule);

    assert_eq!(violations.len(), 1);
    assert_eq!(violations[0].code, Code::DuplicateRefId);
    assert_eq!(violations[0].field, "queries[3].refID");
}

#[rstest]
#[case::reduce_input(vec![datasource("A", "up"), reduce("B", "X")], "B", "queries[1].input")]
#[case::threshold_input(
    vec![datasource("A", "up"), threshold("C", "Q", EvaluatorKind::Gt, &[1.0])],
    "C",
    "queries[1].input"
)]
#[case::math_reference(vec![datasource("A", "up"), math("M", "$A / ${Z} > 0.5")], "M", "queries[1].expression")]
fn test_unresolved_reference(
    #[case] queries: Vec<QueryNode>,
    #[case] condition: &str,
    #[case] field: &str,
) {
    let rule = RuleBuilder::new("valnodedown01")
        .queries(queries)
        .condition(condition)
        .build();

    let violations = validate_rule(&rule);

    assert_eq!(violations.len(), 1, "{violations:?}");
    assert_eq!(violations[0].code, Code::UnresolvedReference);
    assert_eq!(violations[0].field, field);
}

#[rstest]
#[case::nan_string(&["NaN"], EvaluatorKind::Gt, vec![Code::InvalidThreshold])]
#[case::garbage_string(&["1e9x"], EvaluatorKind::Lt, vec![Code::InvalidThreshold])]
#[case::overflow_string(&["1e999"], EvaluatorKind::Lt, vec![Code::InvalidThreshold])]
#[case::numeric_string(&["0.95"], EvaluatorKind::Gt, vec![])]
#[case::range_ok(&["1", "5"], EvaluatorKind::WithinRange, vec![])]
#[case::range_inverted(&["5", "1"], EvaluatorKind::OutsideRange, vec![Code::InvertedRange])]
#[case::range_missing_param(&["5"], EvaluatorKind::WithinRange, vec![Code::EvaluatorArity])]
fn test_threshold_params(
    #[case] params: &[&str],
    #[case] kind: EvaluatorKind,
    #[case] expected: Vec<Code>,
) {
    let rule = RuleBuilder::new("valnodedown01")
        .queries(vec![
            datasource("A", "up"),
            reduce("B", "A"),
            threshold_text("C", "B", kind, params),
        ])
        .build();

    assert_eq!(codes(&rule), expected);
}

#[test]
fn test_wrong_param_count_is_arity_error() {
    let rule = RuleBuilder::new("valnodedown01")
        .queries(vec![
            datasource("A", "up"),
            reduce("B", "A"),
            threshold("C", "B", EvaluatorKind::Gt, &[1.0, 2.0]),
        ])
        .build();

    assert_eq!(codes(&rule), vec![Code::EvaluatorArity]);
}

#[rstest]
#[case::valid_exponent("rate(blocks_total[5m]) > 1e9", vec![])]
#[case::corrupted_exponent("rate(blocks_total[5m]) > 1e9e9", vec![Code::InvalidNumericLiteral])]
#[case::overflow("peer_count < 1e400", vec![Code::InvalidNumericLiteral])]
#[case::label_matchers_ignored(r#"up{job!="node"} == 0"#, vec![])]
#[case::vector_comparison("a_total > b_total", vec![])]
#[case::arithmetic_after_literal("node_free_bytes < 100-5", vec![])]
#[case::exponent_then_subtraction("x > 1e9-used_bytes", vec![])]
#[case::trailing_letters("peer_count > 10x", vec![Code::InvalidNumericLiteral])]
fn test_expression_literals(#[case] expr: &str, #[case] expected: Vec<Code>) {
    let rule = RuleBuilder::new("valnodedown01")
        .queries(vec![
            datasource("A", expr),
            reduce("B", "A"),
            threshold("C", "B", EvaluatorKind::Lt, &[1.0]),
        ])
        .build();

    assert_eq!(codes(&rule), expected);
}

#[test]
fn test_math_literal_is_checked() {
    let rule = RuleBuilder::new("valnodedown01")
        .queries(vec![datasource("A", "up"), math("B", "$A >= 1.2.3")])
        .condition("B")
        .build();

    let violations = validate_rule(&rule);
    assert_eq!(violations.len(), 1);
    assert_eq!(violations[0].code, Code::InvalidNumericLiteral);
    assert_eq!(violations[0].field, "queries[1].expression");
}

#[rstest]
#[case::negated_reference("$B > -$A", vec![])]
#[case::signed_literal("$A < -0.5 || $A > +2", vec![])]
#[case::arithmetic("$A * 2 > 100-5", vec![])]
#[case::double_dot("$A >= 1.2.3", vec![Code::InvalidNumericLiteral])]
fn test_math_expression_literals(#[case] expression: &str, #[case] expected: Vec<Code>) {
    let rule = RuleBuilder::new("valnodedown01")
        .queries(vec![
            datasource("A", "up"),
            datasource("B", "up"),
            math("C", expression),
        ])
        .condition("C")
        .build();

    assert_eq!(codes(&rule), expected);
}

#[test]
fn test_for_not_multiple_of_interval_is_warning() {
    let rule = RuleBuilder::new("valnodedown01")
        .interval(60)
        .for_duration(90)
        .build();

    let violations = validate_rule(&rule);

    assert_eq!(violations.len(), 1);
    assert_eq!(violations[0].code, Code::ForNotMultipleOfInterval);
    assert_eq!(violations[0].severity, Severity::Warning);
}

#[test]
fn test_all_checks_report_together() {
    let rule = RuleBuilder::new("BAD")
        .title("")
        .condition("Z")
        .for_duration(-1)
        .label("team", "")
        .build();

    let found = codes(&rule);

    for code in [
        Code::InvalidUid,
        Code::EmptyField,
        Code::MissingCondition,
        Code::NegativeDuration,
        Code::EmptyLabel,
    ] {
        assert!(found.contains(&code), "missing {code} in {found:?}");
    }
}
