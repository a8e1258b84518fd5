//! Error types for the Compliance Training Assignment & Escalation Engine.
//!
//! This module provides strongly-typed errors using the `thiserror` crate.
//! Transient infrastructure failures (`DirectoryUnavailable`,
//! `StorageUnavailable`) abort the current rule's reconciliation pass and are
//! retried wholesale on the next tick; expected races such as a duplicate
//! conditional create are *not* errors and surface as outcome enums instead.

use thiserror::Error;

use crate::models::{AssignmentId, RuleId};

/// The main error type for the compliance engine.
///
/// All fallible operations in the engine return this error type.
///
/// # Example
///
/// ```
/// use compliance_engine::error::EngineError;
///
/// let error = EngineError::ConfigNotFound {
///     path: "/missing/engine.yaml".to_string(),
/// };
/// assert_eq!(error.to_string(), "Configuration file not found: /missing/engine.yaml");
/// ```
#[derive(Debug, Error)]
pub enum EngineError {
    /// Configuration file was not found at the specified path.
    #[error("Configuration file not found: {path}")]
    ConfigNotFound {
        /// The path that was not found.
        path: String,
    },

    /// Configuration file could not be parsed.
    #[error("Failed to parse configuration file '{path}': {message}")]
    ConfigParseError {
        /// The path to the file that failed to parse.
        path: String,
        /// A description of the parse error.
        message: String,
    },

    /// A compliance rule failed write-time validation.
    #[error("Invalid rule {rule_id}: {message}")]
    InvalidRule {
        /// The rule that failed validation.
        rule_id: RuleId,
        /// A description of what made the rule invalid.
        message: String,
    },

    /// No rule exists with the given identifier.
    #[error("Rule not found: {rule_id}")]
    RuleNotFound {
        /// The rule identifier that was not found.
        rule_id: RuleId,
    },

    /// No assignment exists with the given identifier.
    #[error("Assignment not found: {assignment_id}")]
    AssignmentNotFound {
        /// The assignment identifier that was not found.
        assignment_id: AssignmentId,
    },

    /// The employee directory could not be reached or read.
    ///
    /// Transient: the affected rule's pass is retried on the next tick.
    #[error("Employee directory unavailable: {message}")]
    DirectoryUnavailable {
        /// A description of the directory failure.
        message: String,
    },

    /// The assignment store could not be reached or written.
    ///
    /// Transient: the affected rule's pass is retried on the next tick.
    #[error("Assignment storage unavailable: {message}")]
    StorageUnavailable {
        /// A description of the storage failure.
        message: String,
    },
}

/// A type alias for Results that return EngineError.
pub type EngineResult<T> = Result<T, EngineError>;
