//! src/antispam/mod.rs
//!
//! Heuristic spam detection over a bounded window of recent messages:
//! fingerprinted log entries, first-match-wins rule evaluation, and the
//! remediation pass that deletes, times out and alerts.

pub mod heuristics;
pub mod log;
pub mod remediation;

pub use heuristics::{author_history, count_mentions, evaluate, evaluate_rule, HeuristicMatch};
pub use log::{Fingerprint, LogEntry};
pub use remediation::{RemediationReport, Remediator};
