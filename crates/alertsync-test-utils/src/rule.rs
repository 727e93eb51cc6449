//! [`RuleBuilder`] for alert rule fixtures.

use std::collections::BTreeMap;

use alertsync_model::{
    AlertRule, DatasourceQuery, EvaluatorKind, ExecErrState, MathExpression, NoDataState,
    NumericParam, QueryNode, ReduceExpression, Reducer, RelativeTimeRange, ThresholdEvaluator,
    ThresholdExpression,
};

/// Builds an [`AlertRule`] that passes validation unless told otherwise.
///
/// The default pipeline is `A` (datasource) -> `B` (reduce last) ->
/// `C` (threshold `lt 1`) with condition `C`, in folder `validators`,
/// group `availability`, evaluated every 60s and firing after 5m.
///
/// # Example
///
/// ```rust
/// use alertsync_test_utils::RuleBuilder;
///
/// let rule = RuleBuilder::new("valnodedown01")
///     .title("Validator node down")
///     .label("severity", "critical")
///     .build();
/// assert_eq!(rule.condition, "C");
/// ```
#[derive(Debug, Clone)]
pub struct RuleBuilder {
    rule: AlertRule,
}

impl RuleBuilder {
    /// Start from the default valid rule with the given uid.
    pub fn new(uid: &str) -> Self {
        Self {
            rule: AlertRule {
                uid: uid.to_string(),
                title: format!("Rule {uid}"),
                folder_uid: "validators".to_string(),
                rule_group: "availability".to_string(),
                condition: "C".to_string(),
                queries: default_pipeline(),
                for_duration: 300,
                evaluation_interval_seconds: 60,
                labels: BTreeMap::new(),
                annotations: BTreeMap::new(),
                no_data_state: NoDataState::default(),
                exec_err_state: ExecErrState::default(),
                is_paused: false,
            },
        }
    }

    pub fn title(mut self, title: &str) -> Self {
        self.rule.title = title.to_string();
        self
    }

    pub fn folder(mut self, folder_uid: &str) -> Self {
        self.rule.folder_uid = folder_uid.to_string();
        self
    }

    pub fn group(mut self, rule_group: &str) -> Self {
        self.rule.rule_group = rule_group.to_string();
        self
    }

    pub fn condition(mut self, condition: &str) -> Self {
        self.rule.condition = condition.to_string();
        self
    }

    /// Replace the whole query pipeline.
    pub fn queries(mut self, queries: Vec<QueryNode>) -> Self {
        self.rule.queries = queries;
        self
    }

    /// Append one query node.
    pub fn query(mut self, node: QueryNode) -> Self {
        self.rule.queries.push(node);
        self
    }

    pub fn for_duration(mut self, seconds: i64) -> Self {
        self.rule.for_duration = seconds;
        self
    }

    pub fn interval(mut self, seconds: i64) -> Self {
        self.rule.evaluation_interval_seconds = seconds;
        self
    }

    pub fn label(mut self, key: &str, value: &str) -> Self {
        self.rule.labels.insert(key.to_string(), value.to_string());
        self
    }

    pub fn annotation(mut self, key: &str, value: &str) -> Self {
        self.rule
            .annotations
            .insert(key.to_string(), value.to_string());
        self
    }

    pub fn no_data_state(mut self, state: NoDataState) -> Self {
        self.rule.no_data_state = state;
        self
    }

    pub fn paused(mut self) -> Self {
        self.rule.is_paused = true;
        self
    }

    pub fn build(self) -> AlertRule {
        self.rule
    }
}

/// The `A -> B -> C` pipeline used by [`RuleBuilder::new`].
pub fn default_pipeline() -> Vec<QueryNode> {
    vec![
        datasource("A", "up{job=\"genlayer-node\"}"),
        reduce("B", "A"),
        threshold("C", "B", EvaluatorKind::Lt, &[1.0]),
    ]
}

/// A datasource query against the `prometheus` datasource.
pub fn datasource(ref_id: &str, expr: &str) -> QueryNode {
    QueryNode::Datasource(DatasourceQuery {
        ref_id: ref_id.to_string(),
        datasource_uid: "prometheus".to_string(),
        expr: expr.to_string(),
        relative_time_range: RelativeTimeRange::default(),
        instant: false,
        interval_ms: None,
        max_data_points: None,
    })
}

/// A `last` reduction of `input`.
pub fn reduce(ref_id: &str, input: &str) -> QueryNode {
    QueryNode::Reduce(ReduceExpression {
        ref_id: ref_id.to_string(),
        input: input.to_string(),
        reducer: Reducer::Last,
    })
}

pub fn math(ref_id: &str, expression: &str) -> QueryNode {
    QueryNode::Math(MathExpression {
        ref_id: ref_id.to_string(),
        expression: expression.to_string(),
    })
}

pub fn threshold(ref_id: &str, input: &str, kind: EvaluatorKind, params: &[f64]) -> QueryNode {
    QueryNode::Threshold(ThresholdExpression {
        ref_id: ref_id.to_string(),
        input: input.to_string(),
        evaluator: ThresholdEvaluator {
            kind,
            params: params.iter().copied().map(NumericParam::from).collect(),
        },
    })
}

/// A threshold whose params are given as raw strings, e.g. `"NaN"`.
pub fn threshold_text(ref_id: &str, input: &str, kind: EvaluatorKind, params: &[&str]) -> QueryNode {
    QueryNode::Threshold(ThresholdExpression {
        ref_id: ref_id.to_string(),
        input: input.to_string(),
        evaluator: ThresholdEvaluator {
            kind,
            params: params
                .iter()
                .map(|p| NumericParam::Text(p.to_string()))
                .collect(),
        },
    })
}
