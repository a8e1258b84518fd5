//! Batch evaluation pass and out-of-band event entry points.
//!
//! One pass walks every rule independently: target resolution, assignment
//! reconciliation, then a lifecycle tick over the rule's open assignments.
//! Errors during one rule's pass are isolated to that rule: the batch
//! continues, and the failed rule is retried wholesale on the next tick.
//! Rules are independent units of reconciliation, so a host may shard this
//! loop across rules freely; within one rule, resolution completes before
//! generation reads its output.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::engine::repository::{AssignmentRepository, StatusChange, TransitionOutcome};
use crate::engine::{generator, lifecycle, recertification, target_resolver};
use crate::error::{EngineError, EngineResult};
use crate::models::{
    AssignmentId, AssignmentStatus, CompletionEvent, ComplianceRule, DirectorySnapshot,
    EmployeeId, ExemptionRequest, Exemption, NotificationIntent, RuleId,
};

/// Bounded compare-and-swap retries for out-of-band events. Statuses only
/// advance, so a handful of attempts always converges.
const EVENT_CAS_ATTEMPTS: usize = 4;

/// Per-rule slice of an evaluation report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleReport {
    /// The evaluated rule.
    pub rule_id: RuleId,
    /// Assignments created by this pass.
    pub created: usize,
    /// Employees with open assignments who fell out of the rule's scope.
    pub retired: Vec<EmployeeId>,
    /// Error that aborted this rule's pass, when one did.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Result of one batch evaluation pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationReport {
    /// The instant the pass evaluated against.
    pub evaluated_at: DateTime<Utc>,
    /// Per-rule outcomes, in input order.
    pub rules: Vec<RuleReport>,
    /// Reminder and escalation intents for the Notification Dispatcher.
    pub intents: Vec<NotificationIntent>,
}

impl EvaluationReport {
    /// Total assignments created across all rules.
    pub fn total_created(&self) -> usize {
        self.rules.iter().map(|r| r.created).sum()
    }

    /// Rules whose pass completed without error.
    pub fn successful_rules(&self) -> impl Iterator<Item = RuleId> + '_ {
        self.rules
            .iter()
            .filter(|r| r.error.is_none())
            .map(|r| r.rule_id)
    }
}

/// Outcome of applying an out-of-band event to an assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventOutcome {
    /// The event changed the assignment.
    Applied,
    /// The assignment was already terminal; the event was ignored.
    Ignored {
        /// The terminal status that made the event a no-op.
        status: AssignmentStatus,
    },
}

/// One evaluation pass over the rule set, bound to a repository and policy.
pub struct EvaluationPass<'a> {
    repo: &'a dyn AssignmentRepository,
    config: &'a EngineConfig,
}

impl<'a> EvaluationPass<'a> {
    /// Binds a pass to its repository and policy configuration.
    pub fn new(repo: &'a dyn AssignmentRepository, config: &'a EngineConfig) -> Self {
        Self { repo, config }
    }

    /// Runs the batch over every rule against one directory snapshot.
    pub fn run(
        &self,
        rules: &[ComplianceRule],
        snapshot: &DirectorySnapshot,
        now: DateTime<Utc>,
    ) -> EvaluationReport {
        let mut report = EvaluationReport {
            evaluated_at: now,
            rules: Vec::with_capacity(rules.len()),
            intents: Vec::new(),
        };

        for rule in rules {
            match self.run_rule(rule, snapshot, now) {
                Ok((rule_report, intents)) => {
                    report.rules.push(rule_report);
                    report.intents.extend(intents);
                }
                Err(err) => {
                    warn!(
                        rule_id = %rule.id,
                        error = %err,
                        "Rule evaluation failed, continuing with remaining rules"
                    );
                    report.rules.push(RuleReport {
                        rule_id: rule.id,
                        created: 0,
                        retired: Vec::new(),
                        error: Some(err.to_string()),
                    });
                }
            }
        }

        info!(
            rules = report.rules.len(),
            created = report.total_created(),
            intents = report.intents.len(),
            "Evaluation pass complete"
        );
        report
    }

    fn run_rule(
        &self,
        rule: &ComplianceRule,
        snapshot: &DirectorySnapshot,
        now: DateTime<Utc>,
    ) -> EngineResult<(RuleReport, Vec<NotificationIntent>)> {
        let matched = target_resolver::resolve(rule, snapshot, now);
        let outcome = generator::reconcile(rule, &matched, now, self.repo, self.config)?;

        let mut intents = Vec::new();
        for assignment in self.repo.open_for_rule(rule.id)? {
            intents.extend(lifecycle::tick_assignment(
                self.repo,
                &assignment,
                rule,
                snapshot,
                self.config,
                now,
            )?);
        }

        Ok((
            RuleReport {
                rule_id: rule.id,
                created: outcome.created.len(),
                retired: outcome.retired,
                error: None,
            },
            intents,
        ))
    }

    /// Applies a course completion event from the external training provider.
    ///
    /// Closes the open assignment of every rule requiring the completed
    /// course for that employee, then hands each closed assignment to the
    /// recertification planner. Delivery is at-least-once: a replay finds no
    /// open assignment, or finds one whose cycle started at or after the
    /// completion instant, and does nothing. Completion is dominant:
    /// assignments that went terminal first (including exempted ones) ignore
    /// the event.
    pub fn apply_completion(
        &self,
        rules: &[ComplianceRule],
        event: &CompletionEvent,
    ) -> EngineResult<Vec<AssignmentId>> {
        let mut closed = Vec::new();

        for rule in rules.iter().filter(|r| r.course_id == event.course_id) {
            let Some(open) = self.repo.find_open(rule.id, event.employee_id)? else {
                continue;
            };
            // A completion cannot predate or coincide with the start of the
            // cycle it closes. A replay delivered after the next cycle
            // materialized must not close the fresh assignment.
            if open.cycle_start >= event.completed_at {
                debug!(
                    assignment_id = %open.id,
                    rule_id = %rule.id,
                    employee_id = %event.employee_id,
                    "Completion event predates the open cycle, ignoring"
                );
                continue;
            }

            let mut current = open;
            for _ in 0..EVENT_CAS_ATTEMPTS {
                let change = StatusChange {
                    completed_at: Some(event.completed_at),
                    ..Default::default()
                };
                match self.repo.transition(
                    current.id,
                    current.status,
                    AssignmentStatus::Completed,
                    change,
                )? {
                    TransitionOutcome::Applied => {
                        info!(
                            assignment_id = %current.id,
                            rule_id = %rule.id,
                            employee_id = %event.employee_id,
                            "Assignment completed"
                        );
                        current.status = AssignmentStatus::Completed;
                        current.completed_at = Some(event.completed_at);
                        if let Some(plan) = recertification::on_completion(&current, rule) {
                            self.repo.put_plan(plan)?;
                        }
                        closed.push(current.id);
                        break;
                    }
                    TransitionOutcome::Stale { .. } => {
                        match self.repo.get(current.id)? {
                            Some(row) if row.is_open() => current = row,
                            _ => break,
                        }
                    }
                    TransitionOutcome::AlreadyTerminal { status } => {
                        debug!(
                            assignment_id = %current.id,
                            status = %status,
                            "Completion event ignored for terminal assignment"
                        );
                        break;
                    }
                }
            }
        }

        Ok(closed)
    }

    /// Applies an approved exemption, freezing the assignment in the
    /// terminal `Exempted` state regardless of its due-state.
    pub fn apply_exemption(
        &self,
        request: &ExemptionRequest,
        now: DateTime<Utc>,
    ) -> EngineResult<EventOutcome> {
        let Some(mut current) = self.repo.get(request.assignment_id)? else {
            return Err(EngineError::AssignmentNotFound {
                assignment_id: request.assignment_id,
            });
        };

        for _ in 0..EVENT_CAS_ATTEMPTS {
            if current.status.is_terminal() {
                return Ok(EventOutcome::Ignored {
                    status: current.status,
                });
            }
            let change = StatusChange {
                exemption: Some(Exemption {
                    reason: request.reason.clone(),
                    approved_by: request.approved_by.clone(),
                    approved_at: now,
                }),
                ..Default::default()
            };
            match self.repo.transition(
                current.id,
                current.status,
                AssignmentStatus::Exempted,
                change,
            )? {
                TransitionOutcome::Applied => {
                    info!(
                        assignment_id = %current.id,
                        approved_by = %request.approved_by,
                        "Assignment exempted"
                    );
                    return Ok(EventOutcome::Applied);
                }
                TransitionOutcome::Stale { .. } => match self.repo.get(current.id)? {
                    Some(row) => current = row,
                    None => break,
                },
                TransitionOutcome::AlreadyTerminal { status } => {
                    return Ok(EventOutcome::Ignored { status });
                }
            }
        }

        Ok(EventOutcome::Ignored {
            status: current.status,
        })
    }
}
