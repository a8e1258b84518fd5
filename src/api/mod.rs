//! HTTP API module for the compliance engine.
//!
//! This module provides the REST endpoints for rule authoring, evaluation
//! ticks, completion and exemption events, and compliance rollups.

mod handlers;
mod request;
mod response;
mod state;

pub use handlers::create_router;
pub use request::{
    CompletionRequest, DirectoryRequest, EvaluateRequest, HrAdminsRequest, RuleRequest,
};
pub use response::{ApiError, CompletionResponse, ExemptionResponse, RuleSummary};
pub use state::AppState;
