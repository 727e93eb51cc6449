//! Alert rule data model for alertsync.
//!
//! This crate provides the typed representation of alert rule documents,
//! the directory loader that reads them, rule grouping, and the read-only
//! notification policy document used for cross-checks.
//!
//! ```text
//! rules/
//!   _policies.json          # notification policies (reserved name)
//!   validators/             # folder UID
//!     node-down.json        # one rule per file
//!     block-lag.json
//! ```

pub mod duration;
pub mod error;
pub mod group;
pub mod loader;
pub mod policy;
pub mod query;
pub mod rule;

pub use error::{Defect, Error, Result};
pub use group::{GroupKey, RuleGroup, group_rules};
pub use loader::{
    POLICY_FILE, RuleLoader, load_policies, parse_rule, rule_to_json, write_rule,
    write_rules,
};
pub use policy::{MatchOp, Matcher, NotificationPolicy, PolicyDocument};
pub use query::{
    ClassicCondition, ClassicConditions, DatasourceQuery, EvaluatorKind, LogicalOperator,
    MathExpression, NumericParam, QueryNode, ReduceExpression, Reducer, RelativeTimeRange,
    ThresholdEvaluator, ThresholdExpression,
};
pub use rule::{AlertRule, ExecErrState, NoDataState};
