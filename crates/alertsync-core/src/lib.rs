//! Core orchestration layer for alertsync
//!
//! This crate sits between the rule model and the CLI, implementing:
//!
//! - **Validation**: per-rule and rule-set checks producing coded violations
//! - **Planning**: a side-effect-free diff of local rules against the backend
//! - **Apply**: serialized execution of a plan with a per-rule report
//! - **Configuration resolution**: layered TOML config plus env/flag overrides
//! - **SyncEngine**: the load, validate, plan, apply pipeline
//!
//! # Architecture
//!
//! ```text
//!                   alertsync-cli
//!                         |
//!                  alertsync-core
//!                    /         \
//!      alertsync-model     alertsync-remote
//! ```

pub mod apply;
pub mod config;
pub mod engine;
pub mod error;
pub mod plan;
pub mod validate;

pub use apply::{Action, ApplyReport, OpReport, Outcome, apply_plan};
pub use config::{ConfigFile, ConfigResolver, Overrides, Settings};
pub use engine::{LocalRules, SyncEngine};
pub use error::{Error, Result};
pub use plan::{Plan, PlanSummary, RuleUpdate};
pub use validate::{
    Code, Finding, Severity, Subject, ValidationReport, Violation, validate_all, validate_rule,
    validate_set,
};
