//! Assignment generation: diffing targeting output against open assignments.
//!
//! Creation always goes through the repository's conditional create on the
//! natural key; overlapping scheduler ticks must not produce duplicates,
//! and a pre-check-then-write would race. Employees who fall out of scope
//! keep their already-issued open assignments (compliance history reflects
//! what was required at assignment time); only future cycle generation
//! stops for them.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::config::EngineConfig;
use crate::engine::repository::{AssignmentRepository, CreateOutcome};
use crate::error::EngineResult;
use crate::models::{ComplianceAssignment, ComplianceRule, EmployeeId};

/// What one reconciliation pass did for one rule.
#[derive(Debug, Clone, Default)]
pub struct ReconcileOutcome {
    /// Assignments created this pass.
    pub created: Vec<ComplianceAssignment>,
    /// Employees with an open assignment who no longer match the rule.
    /// Their obligations stand; no further cycles will be generated while
    /// they remain out of scope.
    pub retired: Vec<EmployeeId>,
}

/// Reconciles a rule's matched employee set against existing assignments.
///
/// For every matched employee without an open assignment, a new cycle is
/// created: from a pending next-cycle plan when the recertification planner
/// left one, otherwise starting at `now` (or the rule's effective date if
/// that is still in the future). Pending plans for employees no longer
/// matched are dropped.
pub fn reconcile(
    rule: &ComplianceRule,
    matched: &BTreeSet<EmployeeId>,
    now: DateTime<Utc>,
    repo: &dyn AssignmentRepository,
    config: &EngineConfig,
) -> EngineResult<ReconcileOutcome> {
    let mut outcome = ReconcileOutcome::default();

    for &employee_id in matched {
        let cycle_start = match repo.take_plan(rule.id, employee_id)? {
            Some(plan) => plan.cycle_start,
            None => now.max(rule.effective_start()),
        };
        let due_date = rule.cycle_due_date(cycle_start, config.one_time_window_for(rule));
        let candidate = ComplianceAssignment::new(rule.id, employee_id, cycle_start, due_date);

        match repo.create_if_absent(candidate.clone())? {
            CreateOutcome::Created => {
                info!(
                    rule_id = %rule.id,
                    employee_id = %employee_id,
                    due_date = %due_date,
                    "Created assignment"
                );
                outcome.created.push(candidate);
            }
            CreateOutcome::AlreadyExists => {
                debug!(
                    rule_id = %rule.id,
                    employee_id = %employee_id,
                    "Assignment already exists, skipping"
                );
            }
        }
    }

    for assignment in repo.open_for_rule(rule.id)? {
        if !matched.contains(&assignment.employee_id) {
            outcome.retired.push(assignment.employee_id);
        }
    }
    for plan in repo.plans_for_rule(rule.id)? {
        if !matched.contains(&plan.employee_id) {
            debug!(
                rule_id = %rule.id,
                employee_id = %plan.employee_id,
                "Dropping next-cycle plan for out-of-scope employee"
            );
            repo.drop_plan(rule.id, plan.employee_id)?;
        }
    }

    Ok(outcome)
}
