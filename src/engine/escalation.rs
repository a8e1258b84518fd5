//! Escalation recipient resolution.
//!
//! Tier 1 goes to the employee's *current* direct manager, looked up in the
//! directory at escalation time rather than at assignment time, so org moves
//! are always reflected. Tier 2 and above go to the company's HR
//! administrators, expanded from the snapshot's registered admin list at
//! escalation time; when no admins are registered the reference stays
//! company-scoped and the dispatcher routes it. An unresolvable manager
//! reroutes to HR with a data-quality warning; an escalation is never
//! silently dropped.

use tracing::warn;

use crate::models::{ComplianceAssignment, ComplianceRule, DirectorySnapshot, RecipientRef};

/// Resolves the recipient for an escalation tier.
pub fn resolve_recipient(
    assignment: &ComplianceAssignment,
    rule: &ComplianceRule,
    tier: u32,
    snapshot: &DirectorySnapshot,
) -> RecipientRef {
    if tier > 1 {
        return hr_recipient(rule, snapshot);
    }

    let manager = snapshot
        .employee(assignment.employee_id)
        .and_then(|e| e.manager_id);
    match manager {
        Some(manager_id) => RecipientRef::Manager { manager_id },
        None => {
            warn!(
                assignment_id = %assignment.id,
                employee_id = %assignment.employee_id,
                tier,
                "No manager resolvable for escalation, rerouting to HR"
            );
            hr_recipient(rule, snapshot)
        }
    }
}

/// Addresses the company's HR administrators, carrying the admins the
/// snapshot registers for the company. An empty list falls back to
/// company-scoped routing by the dispatcher.
fn hr_recipient(rule: &ComplianceRule, snapshot: &DirectorySnapshot) -> RecipientRef {
    RecipientRef::HrAdministrators {
        company_id: rule.company_id,
        admins: snapshot.hr_admins(rule.company_id).to_vec(),
    }
}
