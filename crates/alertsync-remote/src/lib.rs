//! Alerting backend clients for alertsync
//!
//! The [`RuleBackend`] trait is the capability set every backend offers:
//! list, get, upsert and delete alert rules by UID. Two implementations are
//! provided:
//!
//! - [`HttpBackend`]: a provisioning HTTP API (Grafana-style), with bearer
//!   authentication, per-organization scoping and retried transport errors
//! - [`InMemoryBackend`]: a versioned in-process store with fault injection
//!
//! Every operation takes a caller-supplied deadline. A call still running at
//! the deadline fails with a timeout transport error.

pub mod backend;
pub mod config;
pub mod error;
pub mod http;
pub mod memory;
pub mod retry;

pub use backend::{Precondition, RemoteMeta, RemoteRule, RuleBackend};
pub use config::{BackendConfig, DEFAULT_RULES_PATH};
pub use error::{RemoteError, Result, TransportKind};
pub use http::HttpBackend;
pub use memory::InMemoryBackend;
pub use retry::RetryPolicy;
