//! HTTP request handlers for the compliance engine API.
//!
//! This module contains the handler functions for all API endpoints.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::engine::{employee_rollup, manager_rollup, AssignmentRepository, EvaluationPass};
use crate::models::{CompletionEvent, DirectorySnapshot, EmployeeId, ExemptionRequest, RuleId};

use super::request::{CompletionRequest, EvaluateRequest, RuleRequest};
use super::response::{
    ApiError, ApiErrorResponse, CompletionResponse, ExemptionResponse, RuleSummary,
};
use super::state::AppState;

/// Creates the API router with all endpoints.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/rules", post(create_rule_handler).get(list_rules_handler))
        .route("/rules/:id/deactivate", post(deactivate_rule_handler))
        .route("/evaluate", post(evaluate_handler))
        .route("/completions", post(completion_handler))
        .route("/exemptions", post(exemption_handler))
        .route("/rollups/employees/:id", get(employee_rollup_handler))
        .route("/rollups/managers/:id", get(manager_rollup_handler))
        .route(
            "/assignments/employees/:id",
            get(employee_assignments_handler),
        )
        .with_state(state)
}

/// Turns a JSON extraction failure into a 400 response, mirroring the serde
/// error detail back to the caller.
fn parse_json<T>(
    payload: Result<Json<T>, JsonRejection>,
    correlation_id: Uuid,
) -> Result<T, Response> {
    match payload {
        Ok(Json(request)) => Ok(request),
        Err(rejection) => {
            let error = match rejection {
                JsonRejection::JsonDataError(err) => {
                    let body_text = err.body_text();
                    warn!(
                        correlation_id = %correlation_id,
                        error = %body_text,
                        "JSON data error"
                    );
                    if body_text.contains("missing field") {
                        ApiError::new("VALIDATION_ERROR", body_text)
                    } else {
                        ApiError::malformed_json(body_text)
                    }
                }
                JsonRejection::JsonSyntaxError(err) => {
                    warn!(
                        correlation_id = %correlation_id,
                        error = %err,
                        "JSON syntax error"
                    );
                    ApiError::malformed_json(format!("Invalid JSON syntax: {}", err))
                }
                JsonRejection::MissingJsonContentType(_) => {
                    ApiError::new("MISSING_CONTENT_TYPE", "Content-Type must be application/json")
                }
                _ => ApiError::malformed_json("Failed to parse request body"),
            };
            Err((StatusCode::BAD_REQUEST, Json(error)).into_response())
        }
    }
}

fn engine_error(correlation_id: Uuid, err: crate::error::EngineError) -> Response {
    warn!(correlation_id = %correlation_id, error = %err, "Request failed");
    ApiErrorResponse::from(err).into_response()
}

/// Handler for POST /rules.
///
/// Validates and registers a new compliance rule. Rules that target nobody
/// are accepted as valid no-ops.
async fn create_rule_handler(
    State(state): State<AppState>,
    payload: Result<Json<RuleRequest>, JsonRejection>,
) -> impl IntoResponse {
    let correlation_id = Uuid::new_v4();
    info!(correlation_id = %correlation_id, "Processing rule creation");

    let request = match parse_json(payload, correlation_id) {
        Ok(request) => request,
        Err(response) => return response,
    };

    let rule = request.into_rule();
    if let Err(err) = rule.validate() {
        return engine_error(correlation_id, err);
    }
    if rule.targets_nobody() {
        warn!(
            correlation_id = %correlation_id,
            rule_id = %rule.id,
            "Rule targets nobody and will generate no assignments"
        );
    }

    match state.insert_rule(rule.clone()) {
        Ok(()) => {
            info!(
                correlation_id = %correlation_id,
                rule_id = %rule.id,
                course_id = %rule.course_id,
                "Rule registered"
            );
            (StatusCode::CREATED, Json(rule)).into_response()
        }
        Err(err) => engine_error(correlation_id, err),
    }
}

/// Handler for GET /rules.
///
/// Returns every registered rule with its last successful evaluation
/// instant.
async fn list_rules_handler(State(state): State<AppState>) -> impl IntoResponse {
    let correlation_id = Uuid::new_v4();
    let rules = match state.rules() {
        Ok(rules) => rules,
        Err(err) => return engine_error(correlation_id, err),
    };
    let mut summaries = Vec::with_capacity(rules.len());
    for rule in rules {
        let last_evaluated_at = match state.last_evaluated(rule.id) {
            Ok(at) => at,
            Err(err) => return engine_error(correlation_id, err),
        };
        summaries.push(RuleSummary {
            rule,
            last_evaluated_at,
        });
    }
    Json(summaries).into_response()
}

/// Handler for POST /rules/:id/deactivate.
///
/// Stops future assignment generation under the rule. Already-open
/// assignments continue their lifecycle untouched.
async fn deactivate_rule_handler(
    State(state): State<AppState>,
    Path(rule_id): Path<RuleId>,
) -> impl IntoResponse {
    let correlation_id = Uuid::new_v4();
    match state.deactivate_rule(rule_id) {
        Ok(rule) => {
            info!(correlation_id = %correlation_id, rule_id = %rule_id, "Rule deactivated");
            Json(rule).into_response()
        }
        Err(err) => engine_error(correlation_id, err),
    }
}

/// Handler for POST /evaluate.
///
/// Runs one evaluation pass over every registered rule against the posted
/// directory snapshot. The snapshot is retained for the rollup endpoints.
async fn evaluate_handler(
    State(state): State<AppState>,
    payload: Result<Json<EvaluateRequest>, JsonRejection>,
) -> impl IntoResponse {
    let correlation_id = Uuid::new_v4();
    info!(correlation_id = %correlation_id, "Processing evaluation request");

    let request = match parse_json(payload, correlation_id) {
        Ok(request) => request,
        Err(response) => return response,
    };

    let as_of = request.as_of.unwrap_or_else(Utc::now);
    let snapshot: DirectorySnapshot = request.directory.into();
    if let Err(err) = state.set_snapshot(snapshot.clone()) {
        return engine_error(correlation_id, err);
    }
    let rules = match state.rules() {
        Ok(rules) => rules,
        Err(err) => return engine_error(correlation_id, err),
    };

    let pass = EvaluationPass::new(state.repository(), state.config().config());
    let report = pass.run(&rules, &snapshot, as_of);
    if let Err(err) = state.record_evaluations(report.successful_rules(), as_of) {
        return engine_error(correlation_id, err);
    }
    info!(
        correlation_id = %correlation_id,
        rules = report.rules.len(),
        created = report.total_created(),
        intents = report.intents.len(),
        "Evaluation completed"
    );
    Json(report).into_response()
}

/// Handler for POST /completions.
async fn completion_handler(
    State(state): State<AppState>,
    payload: Result<Json<CompletionRequest>, JsonRejection>,
) -> impl IntoResponse {
    let correlation_id = Uuid::new_v4();
    let request = match parse_json(payload, correlation_id) {
        Ok(request) => request,
        Err(response) => return response,
    };

    let event = CompletionEvent {
        employee_id: request.employee_id,
        course_id: request.course_id,
        completed_at: request.completed_at,
    };
    let rules = match state.rules() {
        Ok(rules) => rules,
        Err(err) => return engine_error(correlation_id, err),
    };

    let pass = EvaluationPass::new(state.repository(), state.config().config());
    match pass.apply_completion(&rules, &event) {
        Ok(closed) => {
            info!(
                correlation_id = %correlation_id,
                employee_id = %event.employee_id,
                closed = closed.len(),
                "Completion event applied"
            );
            Json(CompletionResponse { closed }).into_response()
        }
        Err(err) => engine_error(correlation_id, err),
    }
}

/// Handler for POST /exemptions.
async fn exemption_handler(
    State(state): State<AppState>,
    payload: Result<Json<ExemptionRequest>, JsonRejection>,
) -> impl IntoResponse {
    let correlation_id = Uuid::new_v4();
    let request = match parse_json(payload, correlation_id) {
        Ok(request) => request,
        Err(response) => return response,
    };

    let pass = EvaluationPass::new(state.repository(), state.config().config());
    match pass.apply_exemption(&request, Utc::now()) {
        Ok(outcome) => Json(ExemptionResponse::from(outcome)).into_response(),
        Err(err) => engine_error(correlation_id, err),
    }
}

/// Handler for GET /rollups/employees/:id.
async fn employee_rollup_handler(
    State(state): State<AppState>,
    Path(employee_id): Path<EmployeeId>,
) -> impl IntoResponse {
    let correlation_id = Uuid::new_v4();
    match employee_rollup(state.repository(), employee_id) {
        Ok(counts) => Json(counts).into_response(),
        Err(err) => engine_error(correlation_id, err),
    }
}

/// Handler for GET /rollups/managers/:id.
///
/// Rolls up the direct reports found in the snapshot posted with the most
/// recent evaluation.
async fn manager_rollup_handler(
    State(state): State<AppState>,
    Path(manager_id): Path<EmployeeId>,
) -> impl IntoResponse {
    let correlation_id = Uuid::new_v4();
    let snapshot = match state.snapshot() {
        Ok(snapshot) => snapshot,
        Err(err) => return engine_error(correlation_id, err),
    };
    match manager_rollup(state.repository(), manager_id, &snapshot) {
        Ok(rollup) => Json(rollup).into_response(),
        Err(err) => engine_error(correlation_id, err),
    }
}

/// Handler for GET /assignments/employees/:id.
async fn employee_assignments_handler(
    State(state): State<AppState>,
    Path(employee_id): Path<EmployeeId>,
) -> impl IntoResponse {
    let correlation_id = Uuid::new_v4();
    match state.repository().for_employee(employee_id) {
        Ok(assignments) => Json(assignments).into_response(),
        Err(err) => engine_error(correlation_id, err),
    }
}
