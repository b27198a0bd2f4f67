//! Error types for activity-engine operations.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ActivityError {
    #[error("Invalid timezone: {0}")]
    InvalidTimezone(String),

    #[error("Invalid date range: {0}")]
    InvalidRange(String),

    #[error("Invalid recurrence rule: {0}")]
    InvalidRule(String),

    #[error("Rule evaluation error: {0}")]
    RuleEvaluation(String),

    #[error("Invalid board snapshot: {0}")]
    Snapshot(String),
}

pub type Result<T> = std::result::Result<T, ActivityError>;
