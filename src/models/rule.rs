//! Compliance rule model.
//!
//! A [`ComplianceRule`] is the declarative definition written by the rule
//! authoring surface: which audience owes which course, on what cadence, and
//! with what reminder and grace windows. The engine only ever reads rules.

use std::collections::BTreeSet;

use chrono::{DateTime, Duration, Months, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};
use crate::models::{CompanyId, CourseId, DepartmentId, PositionId, RuleId};

/// A declarative compliance requirement: course, cadence, and audience.
///
/// Rules are immutable once activated. Deactivating a rule
/// (`is_active = false`) stops new assignment creation but never cancels
/// already-open assignments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplianceRule {
    /// Unique identifier for the rule.
    pub id: RuleId,
    /// Company scope the rule applies within.
    pub company_id: CompanyId,
    /// The training course this rule requires.
    pub course_id: CourseId,
    /// When true, the rule targets every active employee in the company and
    /// the department/position sets are ignored.
    pub applies_to_all: bool,
    /// Departments targeted by the rule (union with positions).
    #[serde(default)]
    pub target_departments: BTreeSet<DepartmentId>,
    /// Positions targeted by the rule (union with departments).
    #[serde(default)]
    pub target_positions: BTreeSet<PositionId>,
    /// Recertification cadence in months; `None` means one-time.
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
    /// Whether the rule currently generates new assignments.
    pub is_active: bool,
    /// Whether completion of the course is mandatory for the audience.
    pub is_mandatory: bool,
}

impl ComplianceRule {
    /// Validates the rule per its write-time invariants.
    ///
    /// A rule with `applies_to_all = false` and empty targeting sets is a
    /// valid no-op rule that matches nobody, so it passes validation.
    ///
    /// # Returns
    ///
    /// Returns `Ok(())` or an [`EngineError::InvalidRule`] describing the
    /// first violated invariant:
    /// - `grace_period_days` must be non-negative
    /// - `reminder_days_before` must be positive
    /// - `frequency_months`, when present, must be positive
    /// - `expiry_date`, when present, must not precede `effective_date`
    pub fn validate(&self) -> EngineResult<()> {
        if self.grace_period_days < 0 {
            return Err(self.invalid("grace_period_days must be non-negative"));
        }
        if self.reminder_days_before <= 0 {
            return Err(self.invalid("reminder_days_before must be positive"));
        }
        if self.frequency_months == Some(0) {
            return Err(self.invalid("frequency_months must be positive when present"));
        }
        if let Some(expiry) = self.expiry_date
            && expiry < self.effective_date
        {
            return Err(self.invalid("expiry_date precedes effective_date"));
        }
        Ok(())
    }

    fn invalid(&self, message: &str) -> EngineError {
        EngineError::InvalidRule {
            rule_id: self.id,
            message: message.to_string(),
        }
    }

    /// Returns true if the rule recurs (has a recertification cadence).
    pub fn is_recurring(&self) -> bool {
        self.frequency_months.is_some()
    }

    /// Returns true if the rule is active and `date` falls inside its
    /// validity window.
    pub fn is_in_effect(&self, date: NaiveDate) -> bool {
        if !self.is_active || date < self.effective_date {
            return false;
        }
        match self.expiry_date {
            Some(expiry) => date <= expiry,
            None => true,
        }
    }

    /// Returns true if the rule can never match any employee.
    pub fn targets_nobody(&self) -> bool {
        !self.applies_to_all
            && self.target_departments.is_empty()
            && self.target_positions.is_empty()
    }

    /// The rule's effective date as the earliest possible cycle start.
    pub fn effective_start(&self) -> DateTime<Utc> {
        self.effective_date
            .and_time(chrono::NaiveTime::MIN)
            .and_utc()
    }

    /// Computes the due date for a cycle starting at `cycle_start`.
    ///
    /// Recurring rules are due `frequency_months` after the cycle start.
    /// One-time rules are due after `one_time_window_days` (policy config,
    /// defaulting to the rule's grace window when unset).
    pub fn cycle_due_date(
        &self,
        cycle_start: DateTime<Utc>,
        one_time_window_days: i64,
    ) -> DateTime<Utc> {
        match self.frequency_months {
            Some(months) => cycle_start
                .checked_add_months(Months::new(months))
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
            None => cycle_start + Duration::days(one_time_window_days),
        }
    }
}
