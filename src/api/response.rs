//! Response types for the compliance engine API.
//!
//! This module defines the error response structures and error handling
//! for the HTTP API.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::engine::EventOutcome;
use crate::error::EngineError;
use crate::models::{AssignmentId, AssignmentStatus, ComplianceRule};

/// API error response structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    /// Error code for programmatic handling.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// Optional details about the error.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ApiError {
    /// Creates a new API error.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    /// Creates a new API error with details.
    pub fn with_details(
        code: impl Into<String>,
        message: impl Into<String>,
        details: impl Into<String>,
    ) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: Some(details.into()),
        }
    }

    /// Creates a malformed JSON error response.
    pub fn malformed_json(message: impl Into<String>) -> Self {
        Self::new("MALFORMED_JSON", message)
    }
}

/// API error with HTTP status code.
pub struct ApiErrorResponse {
    /// The HTTP status code.
    pub status: StatusCode,
    /// The error body.
    pub error: ApiError,
}

impl IntoResponse for ApiErrorResponse {
    fn into_response(self) -> Response {
        (self.status, Json(self.error)).into_response()
    }
}

impl From<EngineError> for ApiErrorResponse {
    fn from(error: EngineError) -> Self {
        match error {
            EngineError::ConfigNotFound { path } => ApiErrorResponse {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                error: ApiError::with_details(
                    "CONFIG_ERROR",
                    "Configuration error",
                    format!("Configuration file not found: {}", path),
                ),
            },
            EngineError::ConfigParseError { path, message } => ApiErrorResponse {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                error: ApiError::with_details(
                    "CONFIG_ERROR",
                    "Configuration parse error",
                    format!("Failed to parse {}: {}", path, message),
                ),
            },
            EngineError::InvalidRule { rule_id, message } => ApiErrorResponse {
                status: StatusCode::BAD_REQUEST,
                error: ApiError::with_details(
                    "INVALID_RULE",
                    format!("Invalid rule {}: {}", rule_id, message),
                    "The rule definition violates a write-time invariant",
                ),
            },
            EngineError::RuleNotFound { rule_id } => ApiErrorResponse {
                status: StatusCode::NOT_FOUND,
                error: ApiError::new("RULE_NOT_FOUND", format!("Rule not found: {}", rule_id)),
            },
            EngineError::AssignmentNotFound { assignment_id } => ApiErrorResponse {
                status: StatusCode::NOT_FOUND,
                error: ApiError::new(
                    "ASSIGNMENT_NOT_FOUND",
                    format!("Assignment not found: {}", assignment_id),
                ),
            },
            EngineError::DirectoryUnavailable { message } => ApiErrorResponse {
                status: StatusCode::SERVICE_UNAVAILABLE,
                error: ApiError::with_details(
                    "DIRECTORY_UNAVAILABLE",
                    "Employee directory unavailable",
                    message,
                ),
            },
            EngineError::StorageUnavailable { message } => ApiErrorResponse {
                status: StatusCode::SERVICE_UNAVAILABLE,
                error: ApiError::with_details(
                    "STORAGE_UNAVAILABLE",
                    "Assignment storage unavailable",
                    message,
                ),
            },
        }
    }
}

/// One registered rule together with its evaluation bookkeeping, as
/// returned by `GET /rules`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleSummary {
    /// The registered rule.
    pub rule: ComplianceRule,
    /// When the rule last completed an evaluation pass, if it has.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_evaluated_at: Option<DateTime<Utc>>,
}

/// Response body for the `/completions` endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionResponse {
    /// The assignments closed by the completion event. Empty when the event
    /// was a replay or no open assignment matched.
    pub closed: Vec<AssignmentId>,
}

/// Response body for the `/exemptions` endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExemptionResponse {
    /// Whether the exemption changed the assignment.
    pub applied: bool,
    /// The terminal status that caused the request to be ignored, when it
    /// was.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ignored_status: Option<AssignmentStatus>,
}

impl From<EventOutcome> for ExemptionResponse {
    fn from(outcome: EventOutcome) -> Self {
        match outcome {
            EventOutcome::Applied => Self {
                applied: true,
                ignored_status: None,
            },
            EventOutcome::Ignored { status } => Self {
                applied: false,
                ignored_status: Some(status),
            },
        }
    }
}
