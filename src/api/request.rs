//! Request types for the compliance engine API.
//!
//! This module defines the JSON request structures for the rule authoring,
//! evaluation, and event endpoints.

use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{
    CompanyId, ComplianceRule, CourseId, DepartmentId, DirectorySnapshot, EmployeeId,
    EmployeeRecord, PositionId, RuleId,
};

/// Request body for the `/rules` endpoint.
///
/// The engine assigns the rule identifier; everything else mirrors the
/// declarative rule model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleRequest {
    /// Company scope the rule applies within.
    pub company_id: CompanyId,
    /// The training course this rule requires.
    pub course_id: CourseId,
    /// When true, targets every active employee in the company.
    #[serde(default)]
    pub applies_to_all: bool,
    /// Departments targeted by the rule (union with positions).
    #[serde(default)]
    pub target_departments: BTreeSet<DepartmentId>,
    /// Positions targeted by the rule (union with departments).
    #[serde(default)]
    pub target_positions: BTreeSet<PositionId>,
    /// Recertification cadence in months; omit for one-time rules.
    #[serde(default)]
    pub frequency_months: Option<u32>,
    /// Days after the due date before an assignment becomes overdue.
    pub grace_period_days: i64,
    /// Days before the due date at which the reminder fires.
    pub reminder_days_before: i64,
    /// Date from which the rule is in effect.
    pub effective_date: NaiveDate,
    /// Date after which the rule no longer generates assignments.
    #[serde(default)]
    pub expiry_date: Option<NaiveDate>,
    /// Whether completion of the course is mandatory for the audience.
    #[serde(default = "default_mandatory")]
    pub is_mandatory: bool,
}

fn default_mandatory() -> bool {
    true
}

impl RuleRequest {
    /// Builds the domain rule, minting a fresh identifier. New rules start
    /// active.
    pub fn into_rule(self) -> ComplianceRule {
        ComplianceRule {
            id: RuleId::new(),
            company_id: self.company_id,
            course_id: self.course_id,
            applies_to_all: self.applies_to_all,
            target_departments: self.target_departments,
            target_positions: self.target_positions,
            frequency_months: self.frequency_months,
            grace_period_days: self.grace_period_days,
            reminder_days_before: self.reminder_days_before,
            effective_date: self.effective_date,
            expiry_date: self.expiry_date,
            is_active: true,
            is_mandatory: self.is_mandatory,
        }
    }
}

/// HR administrator registration for one company.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HrAdminsRequest {
    /// The company the administrators belong to.
    pub company_id: CompanyId,
    /// The administrators' employee identifiers.
    pub admins: Vec<EmployeeId>,
}

/// A directory snapshot as posted by the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectoryRequest {
    /// The employee population at snapshot time.
    pub employees: Vec<EmployeeRecord>,
    /// HR administrators per company.
    #[serde(default)]
    pub hr_administrators: Vec<HrAdminsRequest>,
}

impl From<DirectoryRequest> for DirectorySnapshot {
    fn from(req: DirectoryRequest) -> Self {
        let mut snapshot = DirectorySnapshot::new(req.employees);
        for entry in req.hr_administrators {
            snapshot = snapshot.with_hr_admins(entry.company_id, entry.admins);
        }
        snapshot
    }
}

/// Request body for the `/evaluate` endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluateRequest {
    /// The directory snapshot to evaluate against.
    pub directory: DirectoryRequest,
    /// The evaluation instant; defaults to the current time.
    #[serde(default)]
    pub as_of: Option<DateTime<Utc>>,
}

/// Request body for the `/completions` endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRequest {
    /// Who completed the course.
    pub employee_id: EmployeeId,
    /// Which course was completed.
    pub course_id: CourseId,
    /// When the provider recorded completion.
    pub completed_at: DateTime<Utc>,
}
