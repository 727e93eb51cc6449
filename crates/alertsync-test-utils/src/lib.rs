//! Shared test utilities for the alertsync workspace.
//!
//! This crate provides standardised fixtures so crate test suites do not
//! each hand-assemble alert rules. It is a dev-dependency only.
//!
//! # Modules
//!
//! - [`rule`] - [`RuleBuilder`] for valid-by-default alert rules
//! - [`dir`] - [`RulesDir`], a temporary rules directory

pub mod dir;
pub mod rule;

pub use dir::RulesDir;
pub use rule::RuleBuilder;
