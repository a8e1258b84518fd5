//! Directory snapshot types.
//!
//! The engine treats the external Directory/Org Service as a read-only
//! oracle. A [`DirectorySnapshot`] is an immutable value captured at
//! evaluation time so that every reconciliation pass is a pure function of
//! its inputs and never queries live state mid-evaluation.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::models::{CompanyId, DepartmentId, EmployeeId, PositionId};

/// Employment status as reported by the directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmployeeStatus {
    /// Currently employed; eligible for targeting.
    Active,
    /// No longer active; never targeted by new assignments.
    Inactive,
}

/// One employee's current org placement at snapshot time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmployeeRecord {
    /// The employee's identifier.
    pub id: EmployeeId,
    /// Company the employee belongs to.
    pub company_id: CompanyId,
    /// Current department.
    pub department_id: DepartmentId,
    /// Current position.
    pub position_id: PositionId,
    /// Current direct manager, if the directory knows one.
    #[serde(default)]
    pub manager_id: Option<EmployeeId>,
    /// Employment status.
    pub status: EmployeeStatus,
}

impl EmployeeRecord {
    /// Returns true if the employee is active at snapshot time.
    pub fn is_active(&self) -> bool {
        self.status == EmployeeStatus::Active
    }
}

/// An immutable view of the employee population at one instant.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DirectorySnapshot {
    employees: BTreeMap<EmployeeId, EmployeeRecord>,
    hr_admins: BTreeMap<CompanyId, Vec<EmployeeId>>,
}

impl DirectorySnapshot {
    /// Builds a snapshot from employee records.
    pub fn new(employees: impl IntoIterator<Item = EmployeeRecord>) -> Self {
        Self {
            employees: employees.into_iter().map(|e| (e.id, e)).collect(),
            hr_admins: BTreeMap::new(),
        }
    }

    /// Registers the HR administrators for a company.
    pub fn with_hr_admins(mut self, company_id: CompanyId, admins: Vec<EmployeeId>) -> Self {
        self.hr_admins.insert(company_id, admins);
        self
    }

    /// Looks up an employee record.
    pub fn employee(&self, id: EmployeeId) -> Option<&EmployeeRecord> {
        self.employees.get(&id)
    }

    /// Iterates over all employee records.
    pub fn employees(&self) -> impl Iterator<Item = &EmployeeRecord> {
        self.employees.values()
    }

    /// The HR administrators registered for a company.
    pub fn hr_admins(&self, company_id: CompanyId) -> &[EmployeeId] {
        self.hr_admins
            .get(&company_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Number of employees in the snapshot.
    pub fn len(&self) -> usize {
        self.employees.len()
    }

    /// Returns true if the snapshot contains no employees.
    pub fn is_empty(&self) -> bool {
        self.employees.is_empty()
    }
}
