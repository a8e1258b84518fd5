//! Inbound events, outbound intents, and the escalation audit log.
//!
//! The engine consumes completion events from the external course provider
//! and exemption requests from HR; it emits notification intents that the
//! external Notification Dispatcher owns delivering. [`EscalationEvent`] is
//! the append-only log that makes escalation idempotent per tier.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{AssignmentId, CompanyId, CourseId, EmployeeId, RuleId};

/// A course completion signal from the external training provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionEvent {
    /// Who completed the course.
    pub employee_id: EmployeeId,
    /// Which course was completed.
    pub course_id: CourseId,
    /// When the provider recorded completion.
    pub completed_at: DateTime<Utc>,
}

/// A request to exempt one assignment from its obligation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExemptionRequest {
    /// The assignment to exempt.
    pub assignment_id: AssignmentId,
    /// Why the obligation is being waived.
    pub reason: String,
    /// Who approved the exemption.
    pub approved_by: String,
}

/// Resolved recipient of a reminder or escalation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum RecipientRef {
    /// The employee who owes the obligation.
    Employee {
        /// The employee's identifier.
        employee_id: EmployeeId,
    },
    /// The employee's current direct manager.
    Manager {
        /// The manager's identifier.
        manager_id: EmployeeId,
    },
    /// The HR administrators of a company.
    HrAdministrators {
        /// The company whose HR administrators receive the notification.
        company_id: CompanyId,
        /// The administrators registered in the directory snapshot at
        /// escalation time. Empty when none are registered; the dispatcher
        /// then routes through its company-scoped HR channel.
        #[serde(default)]
        admins: Vec<EmployeeId>,
    },
}

/// Template key handed to the Notification Dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationTemplate {
    /// Upcoming due date reminder to the employee.
    Reminder,
    /// Escalation to a manager or HR tier.
    Escalation,
}

/// An instruction for the external Notification Dispatcher.
///
/// The engine decides *when* and *to whom*; delivery and retries belong to
/// the dispatcher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationIntent {
    /// The assignment the notification concerns.
    pub assignment_id: AssignmentId,
    /// Who should receive the notification.
    pub recipient: RecipientRef,
    /// Which template the dispatcher should render.
    pub template: NotificationTemplate,
    /// Escalation tier, present for escalation intents only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tier: Option<u32>,
}

impl NotificationIntent {
    /// Builds a reminder intent addressed to the employee.
    pub fn reminder(assignment_id: AssignmentId, employee_id: EmployeeId) -> Self {
        Self {
            assignment_id,
            recipient: RecipientRef::Employee { employee_id },
            template: NotificationTemplate::Reminder,
            tier: None,
        }
    }

    /// Builds an escalation intent for a resolved tier recipient.
    pub fn escalation(assignment_id: AssignmentId, tier: u32, recipient: RecipientRef) -> Self {
        Self {
            assignment_id,
            recipient,
            template: NotificationTemplate::Escalation,
            tier: Some(tier),
        }
    }
}

/// Append-only record of one fired escalation tier.
///
/// Keyed by `(assignment_id, tier)`: the same tier is never fired twice for
/// the same assignment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EscalationEvent {
    /// The escalated assignment.
    pub assignment_id: AssignmentId,
    /// The tier that fired.
    pub tier: u32,
    /// The recipient the tier resolved to at escalation time.
    pub recipient: RecipientRef,
    /// When the tier fired.
    pub occurred_at: DateTime<Utc>,
}

/// A planned next recertification cycle, consumed by the assignment
/// generator on its next reconciliation pass for the rule.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NextCycleIntent {
    /// The recurring rule the next cycle belongs to.
    pub rule_id: RuleId,
    /// The employee owing the next cycle.
    pub employee_id: EmployeeId,
    /// Anchor for the next cycle: the actual completion instant.
    pub cycle_start: DateTime<Utc>,
}
