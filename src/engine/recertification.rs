//! Recertification planning.
//!
//! On completion of a recurring obligation the next cycle is anchored to the
//! *actual* completion instant, not the original due date: early completion
//! is rewarded with a full period, and late completion does not compress the
//! next cycle. One-time obligations are satisfied permanently.

use tracing::debug;

use crate::models::{ComplianceAssignment, ComplianceRule, NextCycleIntent};

/// Computes the next cycle for a just-completed assignment, if the owning
/// rule recurs.
///
/// The returned intent is consumed by the assignment generator on its next
/// reconciliation pass; the natural-key conditional create there absorbs
/// duplicate planning when the completion event is delivered more than once.
pub fn on_completion(
    assignment: &ComplianceAssignment,
    rule: &ComplianceRule,
) -> Option<NextCycleIntent> {
    if !rule.is_recurring() {
        debug!(
            rule_id = %rule.id,
            employee_id = %assignment.employee_id,
            "One-time obligation satisfied, no next cycle"
        );
        return None;
    }

    let completed_at = assignment.completed_at?;
    Some(NextCycleIntent {
        rule_id: rule.id,
        employee_id: assignment.employee_id,
        cycle_start: completed_at,
    })
}
