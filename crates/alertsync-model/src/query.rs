//! Query and expression nodes of an alert rule
//!
//! Every node is discriminated by an explicit `kind` field drawn from a
//! closed set. Nodes reference each other by `refID`.
//!
//! # Example JSON
//!
//! ```json
//! [
//!   { "kind": "datasource", "refID": "A", "datasourceUID": "prom",
//!     "expr": "sum(up{job=\"validator\"})" },
//!   { "kind": "reduce", "refID": "B", "input": "A", "reducer": "last" },
//!   { "kind": "threshold", "refID": "C", "input": "B",
//!     "evaluator": { "type": "lt", "params": [1] } }
//! ]
//! ```

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// `$A` or `${A}` inside a math expression
static MATH_REFERENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{?([A-Za-z][A-Za-z0-9_]*)\}?").unwrap());

/// A node in a rule's query pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum QueryNode {
    /// Query against a data source (Prometheus, Loki, ...)
    Datasource(DatasourceQuery),
    /// Arithmetic over other nodes, e.g. `$A / $B > 0.5`
    Math(MathExpression),
    /// Reduce a series to a single number
    Reduce(ReduceExpression),
    /// Compare a number against fixed thresholds
    Threshold(ThresholdExpression),
    /// Legacy multi-condition evaluation
    ClassicConditions(ClassicConditions),
}

impl QueryNode {
    /// The node's reference identifier
    pub fn ref_id(&self) -> &str {
        match self {
            Self::Datasource(q) => &q.ref_id,
            Self::Math(m) => &m.ref_id,
            Self::Reduce(r) => &r.ref_id,
            Self::Threshold(t) => &t.ref_id,
            Self::ClassicConditions(c) => &c.ref_id,
        }
    }

    /// The `kind` discriminator as written in rule documents
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Datasource(_) => "datasource",
            Self::Math(_) => "math",
            Self::Reduce(_) => "reduce",
            Self::Threshold(_) => "threshold",
            Self::ClassicConditions(_) => "classic_conditions",
        }
    }

    /// Reference IDs of the nodes this node consumes
    pub fn references(&self) -> Vec<&str> {
        match self {
            Self::Datasource(_) => Vec::new(),
            Self::Math(m) => MATH_REFERENCE
                .captures_iter(&m.expression)
                .filter_map(|c| c.get(1).map(|g| g.as_str()))
                .collect(),
            Self::Reduce(r) => vec![r.input.as_str()],
            Self::Threshold(t) => vec![t.input.as_str()],
            Self::ClassicConditions(c) => c.conditions.iter().map(|c| c.input.as_str()).collect(),
        }
    }

    /// Every threshold evaluator carried by this node
    pub fn evaluators(&self) -> Vec<&ThresholdEvaluator> {
        match self {
            Self::Threshold(t) => vec![&t.evaluator],
            Self::ClassicConditions(c) => c.conditions.iter().map(|c| &c.evaluator).collect(),
            _ => Vec::new(),
        }
    }

    /// Free-form expression text, if the node has one
    pub fn expression_text(&self) -> Option<&str> {
        match self {
            Self::Datasource(q) => Some(&q.expr),
            Self::Math(m) => Some(&m.expression),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasourceQuery {
    #[serde(rename = "refID")]
    pub ref_id: String,
    #[serde(rename = "datasourceUID")]
    pub datasource_uid: String,
    pub expr: String,
    #[serde(default)]
    pub relative_time_range: RelativeTimeRange,
    #[serde(default)]
    pub instant: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_data_points: Option<u64>,
}

/// Time window relative to evaluation time, in seconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelativeTimeRange {
    pub from: u64,
    pub to: u64,
}

impl Default for RelativeTimeRange {
    fn default() -> Self {
        Self { from: 600, to: 0 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MathExpression {
    #[serde(rename = "refID")]
    pub ref_id: String,
    pub expression: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReduceExpression {
    #[serde(rename = "refID")]
    pub ref_id: String,
    pub input: String,
    pub reducer: Reducer,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdExpression {
    #[serde(rename = "refID")]
    pub ref_id: String,
    pub input: String,
    pub evaluator: ThresholdEvaluator,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassicConditions {
    #[serde(rename = "refID")]
    pub ref_id: String,
    pub conditions: Vec<ClassicCondition>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassicCondition {
    pub input: String,
    pub reducer: Reducer,
    pub evaluator: ThresholdEvaluator,
    #[serde(default)]
    pub operator: LogicalOperator,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Reducer {
    Last,
    Mean,
    Min,
    Max,
    Sum,
    Count,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogicalOperator {
    #[default]
    And,
    Or,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdEvaluator {
    #[serde(rename = "type")]
    pub kind: EvaluatorKind,
    #[serde(default)]
    pub params: Vec<NumericParam>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvaluatorKind {
    Gt,
    Lt,
    WithinRange,
    OutsideRange,
}

impl EvaluatorKind {
    /// Number of params the evaluator requires
    pub fn arity(self) -> usize {
        match self {
            Self::Gt | Self::Lt => 1,
            Self::WithinRange | Self::OutsideRange => 2,
        }
    }
}

/// A threshold parameter as written in the document.
///
/// Exported rules sometimes carry thresholds as strings (`"1e9"`); those are
/// kept verbatim so the validator can reject corrupted literals instead of
/// the loader silently failing on them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NumericParam {
    Number(f64),
    Text(String),
}

impl NumericParam {
    /// The finite numeric value, if the parameter has one
    pub fn value(&self) -> Option<f64> {
        let v = match self {
            Self::Number(n) => *n,
            Self::Text(s) => s.trim().parse::<f64>().ok()?,
        };
        v.is_finite().then_some(v)
    }
}

impl From<f64> for NumericParam {
    fn from(v: f64) -> Self {
        Self::Number(v)
    }
}
