//! Structured error types for the join engine.
//!
//! Each stage reports through one taxonomy so the pipeline can decide
//! propagation scope: record-level errors are skipped and logged, a schema
//! mismatch drops its key group, and sink or deadline failures end the run.

use crate::types::TableTag;
use std::time::Duration;
use thiserror::Error;

/// Result alias used throughout the engine.
pub type JoinResult<T> = Result<T, JoinError>;

/// Main error type for join operations.
#[derive(Debug, Error)]
pub enum JoinError {
    // Record-level errors
    #[error("line {line_no}: cannot classify record: {reason}")]
    Classification { line_no: usize, reason: String },

    /// Raised when a caller routes a record that carries no join key at
    /// all. An empty key is valid and routes normally; records built by
    /// the tagger always have a key column.
    #[error("line {line_no}: record carries no join key")]
    MissingKey { line_no: usize },

    // Key-group errors
    #[error("schema mismatch for key {key:?}: {side} table expected {expected} fields, found {found}")]
    SchemaMismatch {
        key: String,
        side: TableTag,
        expected: usize,
        found: usize,
    },

    // Run-level errors
    #[error("sink unavailable: {reason}")]
    Sink {
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("emit exceeded deadline of {deadline:?}")]
    EmitTimeout { deadline: Duration },

    #[error("bucket worker failed: {reason}")]
    Worker { reason: String },

    #[error("invalid configuration: {field}: {reason}")]
    InvalidConfiguration { field: &'static str, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl JoinError {
    /// Whether this error ends the whole run. Everything else is scoped to
    /// one record or one key group and handled as skip-and-log.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            JoinError::Sink { .. }
                | JoinError::EmitTimeout { .. }
                | JoinError::Worker { .. }
                | JoinError::InvalidConfiguration { .. }
                | JoinError::Io(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_errors_are_not_fatal() {
        let err = JoinError::Classification {
            line_no: 3,
            reason: "record has no fields".to_string(),
        };
        assert!(!err.is_fatal());

        let err = JoinError::SchemaMismatch {
            key: "Alice".to_string(),
            side: TableTag::Right,
            expected: 9,
            found: 4,
        };
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_run_errors_are_fatal() {
        let err = JoinError::Sink {
            reason: "downstream write failed".to_string(),
            source: None,
        };
        assert!(err.is_fatal());

        let err = JoinError::EmitTimeout {
            deadline: Duration::from_secs(30),
        };
        assert!(err.is_fatal());
    }

    #[test]
    fn test_display_includes_context() {
        let err = JoinError::SchemaMismatch {
            key: "Alice".to_string(),
            side: TableTag::Left,
            expected: 1,
            found: 3,
        };
        let msg = err.to_string();
        assert!(msg.contains("Alice"));
        assert!(msg.contains("left"));
        assert!(msg.contains("expected 1"));
    }
}
