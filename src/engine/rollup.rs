//! Compliance rollups: read-model projections over the assignment store.
//!
//! Rollups are computed on demand by scanning assignments; nothing here
//! mutates state. Manager rollups walk the directory snapshot for direct
//! reports, so they always reflect the org chart as of the snapshot.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::engine::repository::AssignmentRepository;
use crate::error::EngineResult;
use crate::models::{AssignmentStatus, DirectorySnapshot, EmployeeId};

/// Per-status assignment counts for one employee.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    /// Assignments in the initial state.
    pub assigned: usize,
    /// Assignments inside the reminder window.
    pub reminder_due: usize,
    /// Assignments past due but within grace.
    pub due: usize,
    /// Assignments past the grace period.
    pub overdue: usize,
    /// Assignments under active escalation.
    pub escalated: usize,
    /// Completed assignments.
    pub completed: usize,
    /// Exempted assignments.
    pub exempted: usize,
}

impl StatusCounts {
    fn record(&mut self, status: AssignmentStatus) {
        match status {
            AssignmentStatus::Assigned => self.assigned += 1,
            AssignmentStatus::ReminderDue => self.reminder_due += 1,
            AssignmentStatus::Due => self.due += 1,
            AssignmentStatus::Overdue => self.overdue += 1,
            AssignmentStatus::Escalated => self.escalated += 1,
            AssignmentStatus::Completed => self.completed += 1,
            AssignmentStatus::Exempted => self.exempted += 1,
        }
    }

    /// Assignments still requiring action.
    pub fn open(&self) -> usize {
        self.assigned + self.reminder_due + self.due + self.overdue + self.escalated
    }

    /// All assignments counted, open and resolved.
    pub fn total(&self) -> usize {
        self.open() + self.completed + self.exempted
    }
}

/// Counts one employee's assignments by status.
pub fn employee_rollup(
    repo: &dyn AssignmentRepository,
    employee_id: EmployeeId,
) -> EngineResult<StatusCounts> {
    let mut counts = StatusCounts::default();
    for assignment in repo.for_employee(employee_id)? {
        counts.record(assignment.status);
    }
    Ok(counts)
}

/// Rolls up the compliance posture of a manager's direct reports.
///
/// Reports are identified from the directory snapshot, so an employee who
/// moved teams shows up under their new manager even while old assignments
/// remain open. Reports with no assignments still appear, with zero counts.
pub fn manager_rollup(
    repo: &dyn AssignmentRepository,
    manager_id: EmployeeId,
    snapshot: &DirectorySnapshot,
) -> EngineResult<BTreeMap<EmployeeId, StatusCounts>> {
    let mut rollup = BTreeMap::new();
    for report in snapshot
        .employees()
        .filter(|e| e.manager_id == Some(manager_id))
    {
        rollup.insert(report.id, employee_rollup(repo, report.id)?);
    }
    Ok(rollup)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    use crate::engine::repository::{MemoryRepository, StatusChange};
    use crate::models::{
        CompanyId, ComplianceAssignment, DepartmentId, EmployeeRecord, EmployeeStatus, PositionId,
        RuleId,
    };

    fn seeded(repo: &MemoryRepository, employee_id: EmployeeId) -> ComplianceAssignment {
        let assignment = ComplianceAssignment::new(
            RuleId::new(),
            employee_id,
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
        );
        repo.create_if_absent(assignment.clone()).unwrap();
        assignment
    }

    fn report(manager_id: EmployeeId) -> EmployeeRecord {
        EmployeeRecord {
            id: EmployeeId::new(),
            company_id: CompanyId::new(),
            department_id: DepartmentId::new(),
            position_id: PositionId::new(),
            manager_id: Some(manager_id),
            status: EmployeeStatus::Active,
        }
    }

    /// RU-001: an employee rollup counts each status bucket.
    #[test]
    fn test_employee_rollup_counts_statuses() {
        let repo = MemoryRepository::new();
        let employee = EmployeeId::new();

        seeded(&repo, employee);
        let completed = seeded(&repo, employee);
        repo.transition(
            completed.id,
            AssignmentStatus::Assigned,
            AssignmentStatus::Completed,
            StatusChange {
                completed_at: Some(Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap()),
                ..Default::default()
            },
        )
        .unwrap();

        let counts = employee_rollup(&repo, employee).unwrap();
        assert_eq!(counts.assigned, 1);
        assert_eq!(counts.completed, 1);
        assert_eq!(counts.open(), 1);
        assert_eq!(counts.total(), 2);
    }

    /// RU-002: an employee with no assignments rolls up to zero counts.
    #[test]
    fn test_employee_rollup_empty() {
        let repo = MemoryRepository::new();
        let counts = employee_rollup(&repo, EmployeeId::new()).unwrap();
        assert_eq!(counts, StatusCounts::default());
    }

    /// RU-003: a manager rollup covers exactly the current direct reports.
    #[test]
    fn test_manager_rollup_covers_direct_reports() {
        let repo = MemoryRepository::new();
        let manager = EmployeeId::new();
        let direct = report(manager);
        let other = report(EmployeeId::new());
        let snapshot = DirectorySnapshot::new([direct.clone(), other.clone()]);

        seeded(&repo, direct.id);
        seeded(&repo, other.id);

        let rollup = manager_rollup(&repo, manager, &snapshot).unwrap();
        assert_eq!(rollup.len(), 1);
        assert_eq!(rollup[&direct.id].assigned, 1);
    }

    /// RU-004: direct reports without assignments appear with zero counts.
    #[test]
    fn test_manager_rollup_includes_idle_reports() {
        let repo = MemoryRepository::new();
        let manager = EmployeeId::new();
        let direct = report(manager);
        let snapshot = DirectorySnapshot::new([direct.clone()]);

        let rollup = manager_rollup(&repo, manager, &snapshot).unwrap();
        assert_eq!(rollup[&direct.id], StatusCounts::default());
    }
}
