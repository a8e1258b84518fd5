//! Compliance assignment model and status state machine types.
//!
//! A [`ComplianceAssignment`] is one employee's obligation under one rule for
//! one cycle. Rows are never physically deleted; terminal states are retained
//! for audit.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{AssignmentId, EmployeeId, RuleId};

/// Lifecycle status of a compliance assignment.
///
/// `Completed` and `Exempted` are terminal; all other states are "open".
/// The lifecycle clock only ever moves an assignment forward in severity,
/// never backward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentStatus {
    /// Created, reminder window not yet reached.
    Assigned,
    /// Inside the reminder window before the due date.
    ReminderDue,
    /// On or past the due date, still inside the grace period.
    Due,
    /// Past the grace period, no escalation threshold crossed yet.
    Overdue,
    /// Past at least one escalation threshold; tier is carried on the
    /// assignment's `escalation_tier` field.
    Escalated,
    /// Closed by a course completion event. Terminal.
    Completed,
    /// Closed by an approved exemption. Terminal.
    Exempted,
}

impl AssignmentStatus {
    /// Returns true for the terminal states.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Exempted)
    }

    /// Returns true for the open (non-terminal) states.
    pub fn is_open(&self) -> bool {
        !self.is_terminal()
    }

    /// Total severity order over statuses.
    ///
    /// Invariant: a valid transition never decreases severity.
    pub fn severity(&self) -> u8 {
        match self {
            Self::Assigned => 0,
            Self::ReminderDue => 1,
            Self::Due => 2,
            Self::Overdue => 3,
            Self::Escalated => 4,
            Self::Completed | Self::Exempted => 5,
        }
    }
}

impl std::fmt::Display for AssignmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Assigned => "assigned",
            Self::ReminderDue => "reminder_due",
            Self::Due => "due",
            Self::Overdue => "overdue",
            Self::Escalated => "escalated",
            Self::Completed => "completed",
            Self::Exempted => "exempted",
        };
        write!(f, "{s}")
    }
}

/// A documented override that terminates an assignment without completion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exemption {
    /// Why the obligation was waived.
    pub reason: String,
    /// Who approved the exemption.
    pub approved_by: String,
    /// When the exemption was approved.
    pub approved_at: DateTime<Utc>,
}

/// One obligation instance for one employee for one cycle.
///
/// The natural key `(rule_id, employee_id, cycle_start)` is enforced unique
/// by the repository to guarantee idempotent generation, and at most one
/// *open* assignment may exist per `(rule_id, employee_id)` at any time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplianceAssignment {
    /// Surrogate identifier.
    pub id: AssignmentId,
    /// The rule this obligation was issued under.
    pub rule_id: RuleId,
    /// The employee who owes the obligation.
    pub employee_id: EmployeeId,
    /// Start of this cycle.
    pub cycle_start: DateTime<Utc>,
    /// When the obligation falls due.
    pub due_date: DateTime<Utc>,
    /// Current lifecycle status.
    pub status: AssignmentStatus,
    /// Current escalation tier; 0 until the first escalation threshold.
    pub escalation_tier: u32,
    /// When the obligation was completed, if it was.
    pub completed_at: Option<DateTime<Utc>>,
    /// Approved exemption, if one was granted.
    pub exemption: Option<Exemption>,
}

impl ComplianceAssignment {
    /// Creates a fresh assignment in the `Assigned` state.
    pub fn new(
        rule_id: RuleId,
        employee_id: EmployeeId,
        cycle_start: DateTime<Utc>,
        due_date: DateTime<Utc>,
    ) -> Self {
        Self {
            id: AssignmentId::new(),
            rule_id,
            employee_id,
            cycle_start,
            due_date,
            status: AssignmentStatus::Assigned,
            escalation_tier: 0,
            completed_at: None,
            exemption: None,
        }
    }

    /// The natural key enforced unique by the repository.
    pub fn natural_key(&self) -> (RuleId, EmployeeId, DateTime<Utc>) {
        (self.rule_id, self.employee_id, self.cycle_start)
    }

    /// Returns true while the assignment is in a non-terminal state.
    pub fn is_open(&self) -> bool {
        self.status.is_open()
    }
}
