//! Target resolution: which employees does a rule currently apply to?
//!
//! Resolution is a pure function of the rule and a directory snapshot, so a
//! reconciliation pass can be re-evaluated deterministically and tested with
//! synthetic snapshots. An employee transferred into a target department
//! mid-cycle is treated as newly matching as of the first tick that observes
//! the move; there is no backdating.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};

use crate::models::{ComplianceRule, DirectorySnapshot, EmployeeId};

/// Computes the exact set of employees the rule applies to at `now`.
///
/// Returns an empty set when the rule is inactive or outside its validity
/// window. For `applies_to_all` rules the whole active population of the
/// rule's company matches; otherwise the match is the union of employees in
/// a target department or a target position.
pub fn resolve(
    rule: &ComplianceRule,
    snapshot: &DirectorySnapshot,
    now: DateTime<Utc>,
) -> BTreeSet<EmployeeId> {
    if !rule.is_in_effect(now.date_naive()) {
        return BTreeSet::new();
    }

    snapshot
        .employees()
        .filter(|e| e.is_active() && e.company_id == rule.company_id)
        .filter(|e| {
            rule.applies_to_all
                || rule.target_departments.contains(&e.department_id)
                || rule.target_positions.contains(&e.position_id)
        })
        .map(|e| e.id)
        .collect()
}
