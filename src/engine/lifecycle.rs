//! Lifecycle clock: time-driven assignment state transitions.
//!
//! Each tick recomputes an open assignment's due-state from `now`, the due
//! date, the rule's reminder and grace windows, and the escalation cadence.
//! Transitions are monotonic in time: an assignment already past several
//! thresholds is advanced through all of them in one pass, and only the
//! final transition's side effect fires (skipped reminders are never re-sent
//! retroactively). Intents are edge-triggered and journaled, so re-running
//! an identical tick is a no-op.

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, warn};

use crate::config::EngineConfig;
use crate::engine::escalation;
use crate::engine::repository::{AssignmentRepository, StatusChange, TransitionOutcome};
use crate::error::EngineResult;
use crate::models::{
    AssignmentStatus, ComplianceAssignment, ComplianceRule, DirectorySnapshot, EscalationEvent,
    NotificationIntent,
};

/// Side effect attached to a planned transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickEffect {
    /// Emit a reminder to the employee.
    Reminder,
    /// Emit an escalation to the tier's resolved recipient.
    Escalation {
        /// The tier that fired.
        tier: u32,
    },
}

/// The transition a tick decided to apply to one assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlannedTransition {
    /// The status the assignment should move to.
    pub next: AssignmentStatus,
    /// The escalation tier after the transition.
    pub escalation_tier: u32,
    /// The side effect of the final transition edge, if any.
    pub effect: Option<TickEffect>,
}

/// Computes the transition an open assignment should take at `now`.
///
/// Pure function of its inputs. Returns `None` when the assignment is
/// terminal or already in the state the clock would assign, the no-op
/// result that makes identical re-ticks free.
///
/// The escalation tier at `now` is
/// `min(days_past_grace / interval_days, max_tier)`, with the cadence taken
/// from [`EngineConfig::escalation`] rather than hard-coded.
pub fn plan_transition(
    assignment: &ComplianceAssignment,
    rule: &ComplianceRule,
    config: &EngineConfig,
    now: DateTime<Utc>,
) -> Option<PlannedTransition> {
    if !assignment.is_open() {
        return None;
    }

    let due = assignment.due_date;
    let grace_end = due + Duration::days(rule.grace_period_days);

    let (target, target_tier) = if now > grace_end {
        let days_past_grace = (now - grace_end).num_days();
        let tier = (days_past_grace / config.escalation.interval_days)
            .min(i64::from(config.escalation.max_tier)) as u32;
        if tier >= 1 {
            (AssignmentStatus::Escalated, tier)
        } else {
            (AssignmentStatus::Overdue, 0)
        }
    } else if now >= due {
        (AssignmentStatus::Due, 0)
    } else if now >= due - Duration::days(rule.reminder_days_before) {
        (AssignmentStatus::ReminderDue, 0)
    } else {
        (AssignmentStatus::Assigned, 0)
    };

    // The clock never moves an assignment backward.
    if target.severity() < assignment.status.severity() {
        return None;
    }
    if target == assignment.status && target_tier <= assignment.escalation_tier {
        return None;
    }

    let effect = match target {
        AssignmentStatus::ReminderDue => Some(TickEffect::Reminder),
        AssignmentStatus::Escalated if target_tier > assignment.escalation_tier => {
            Some(TickEffect::Escalation { tier: target_tier })
        }
        _ => None,
    };

    Some(PlannedTransition {
        next: target,
        escalation_tier: target_tier.max(assignment.escalation_tier),
        effect,
    })
}

/// Applies one tick to one open assignment and returns the intents to hand
/// to the Notification Dispatcher.
///
/// The status change goes through the repository's compare-and-swap keyed on
/// the status this tick read; a lost race (completion arriving concurrently,
/// or an overlapping tick) yields no intents; completion is dominant.
pub fn tick_assignment(
    repo: &dyn AssignmentRepository,
    assignment: &ComplianceAssignment,
    rule: &ComplianceRule,
    snapshot: &DirectorySnapshot,
    config: &EngineConfig,
    now: DateTime<Utc>,
) -> EngineResult<Vec<NotificationIntent>> {
    let Some(planned) = plan_transition(assignment, rule, config, now) else {
        return Ok(Vec::new());
    };

    let change = StatusChange {
        escalation_tier: Some(planned.escalation_tier),
        ..Default::default()
    };
    match repo.transition(assignment.id, assignment.status, planned.next, change)? {
        TransitionOutcome::Applied => {}
        TransitionOutcome::Stale { actual } => {
            warn!(
                assignment_id = %assignment.id,
                expected = %assignment.status,
                actual = %actual,
                "Tick lost a transition race, skipping side effects"
            );
            return Ok(Vec::new());
        }
        TransitionOutcome::AlreadyTerminal { status } => {
            debug!(
                assignment_id = %assignment.id,
                status = %status,
                "Assignment resolved before tick applied, skipping"
            );
            return Ok(Vec::new());
        }
    }

    let mut intents = Vec::new();
    match planned.effect {
        Some(TickEffect::Reminder) => {
            if repo.record_reminder(assignment.id, now)? {
                intents.push(NotificationIntent::reminder(
                    assignment.id,
                    assignment.employee_id,
                ));
            }
        }
        Some(TickEffect::Escalation { tier }) => {
            let recipient = escalation::resolve_recipient(assignment, rule, tier, snapshot);
            let recorded = repo.record_escalation(EscalationEvent {
                assignment_id: assignment.id,
                tier,
                recipient: recipient.clone(),
                occurred_at: now,
            })?;
            if recorded {
                intents.push(NotificationIntent::escalation(assignment.id, tier, recipient));
            }
        }
        None => {}
    }

    Ok(intents)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};
    use std::collections::BTreeSet;

    use crate::engine::repository::MemoryRepository;
    use crate::models::{
        CompanyId, CourseId, EmployeeId, NotificationTemplate, RecipientRef, RuleId,
    };

    fn rule() -> ComplianceRule {
        ComplianceRule {
            id: RuleId::new(),
            company_id: CompanyId::new(),
            course_id: CourseId::new(),
            applies_to_all: true,
            target_departments: BTreeSet::new(),
            target_positions: BTreeSet::new(),
            frequency_months: Some(12),
            grace_period_days: 30,
            reminder_days_before: 14,
            effective_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            expiry_date: None,
            is_active: true,
            is_mandatory: true,
        }
    }

    fn assignment(rule: &ComplianceRule) -> ComplianceAssignment {
        // Cycle 2024-01-01 -> due 2025-01-01, per the annual rule.
        ComplianceAssignment::new(
            rule.id,
            EmployeeId::new(),
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
        )
    }

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
    }

    /// LC-001: before the reminder window, nothing happens.
    #[test]
    fn test_no_transition_before_reminder_window() {
        let rule = rule();
        let a = assignment(&rule);
        let config = EngineConfig::default();

        assert!(plan_transition(&a, &rule, &config, at(2024, 6, 1)).is_none());
    }

    /// LC-002: the reminder window opens 14 days before the due date.
    #[test]
    fn test_reminder_due_at_window_edge() {
        let rule = rule();
        let a = assignment(&rule);
        let config = EngineConfig::default();

        let planned = plan_transition(
            &a,
            &rule,
            &config,
            Utc.with_ymd_and_hms(2024, 12, 18, 0, 0, 0).unwrap(),
        )
        .unwrap();
        assert_eq!(planned.next, AssignmentStatus::ReminderDue);
        assert_eq!(planned.effect, Some(TickEffect::Reminder));
    }

    /// LC-003: due on the due date, overdue strictly after the grace period.
    #[test]
    fn test_due_then_overdue_thresholds() {
        let rule = rule();
        let mut a = assignment(&rule);
        let config = EngineConfig::default();

        a.status = AssignmentStatus::ReminderDue;
        let planned = plan_transition(&a, &rule, &config, at(2025, 1, 1)).unwrap();
        assert_eq!(planned.next, AssignmentStatus::Due);
        assert!(planned.effect.is_none());

        a.status = AssignmentStatus::Due;
        // Due + 30 days grace ends 2025-01-31T00:00; midday is past it.
        let planned = plan_transition(&a, &rule, &config, at(2025, 1, 31)).unwrap();
        assert_eq!(planned.next, AssignmentStatus::Overdue);
        assert!(planned.effect.is_none());
    }

    /// LC-004: escalation tiers follow the configured cadence and cap.
    #[test]
    fn test_escalation_cadence_and_cap() {
        let rule = rule();
        let mut a = assignment(&rule);
        let config = EngineConfig::default();
        a.status = AssignmentStatus::Overdue;

        // 30 days past the grace end crosses tier 1.
        let planned = plan_transition(&a, &rule, &config, at(2025, 3, 3)).unwrap();
        assert_eq!(planned.next, AssignmentStatus::Escalated);
        assert_eq!(planned.escalation_tier, 1);
        assert_eq!(planned.effect, Some(TickEffect::Escalation { tier: 1 }));

        // Years later the tier is capped at max_tier.
        let planned = plan_transition(&a, &rule, &config, at(2030, 1, 1)).unwrap();
        assert_eq!(planned.escalation_tier, config.escalation.max_tier);
    }

    /// LC-005: at the cap, further ticks are no-ops.
    #[test]
    fn test_capped_assignment_stops_escalating() {
        let rule = rule();
        let mut a = assignment(&rule);
        let config = EngineConfig::default();
        a.status = AssignmentStatus::Escalated;
        a.escalation_tier = config.escalation.max_tier;

        assert!(plan_transition(&a, &rule, &config, at(2031, 1, 1)).is_none());
    }

    /// LC-006: a tick far past several thresholds advances in one pass and
    /// fires only the final edge's effect.
    #[test]
    fn test_catch_up_fires_only_final_effect() {
        let rule = rule();
        let a = assignment(&rule);
        let config = EngineConfig::default();

        let planned = plan_transition(&a, &rule, &config, at(2025, 4, 15)).unwrap();
        assert_eq!(planned.next, AssignmentStatus::Escalated);
        assert_eq!(planned.escalation_tier, 2);
        // No reminder is re-sent for the skipped reminder_due state.
        assert_eq!(planned.effect, Some(TickEffect::Escalation { tier: 2 }));
    }

    /// LC-007: terminal assignments are never ticked.
    #[test]
    fn test_terminal_assignment_is_ignored() {
        let rule = rule();
        let mut a = assignment(&rule);
        let config = EngineConfig::default();

        a.status = AssignmentStatus::Completed;
        assert!(plan_transition(&a, &rule, &config, at(2026, 1, 1)).is_none());
        a.status = AssignmentStatus::Exempted;
        assert!(plan_transition(&a, &rule, &config, at(2026, 1, 1)).is_none());
    }

    /// LC-008: ticking through the repository emits the reminder intent once.
    #[test]
    fn test_tick_emits_reminder_intent_once() {
        let rule = rule();
        let a = assignment(&rule);
        let repo = MemoryRepository::new();
        repo.create_if_absent(a.clone()).unwrap();
        let snapshot = DirectorySnapshot::default();
        let config = EngineConfig::default();
        let now = at(2024, 12, 20);

        let intents = tick_assignment(&repo, &a, &rule, &snapshot, &config, now).unwrap();
        assert_eq!(intents.len(), 1);
        assert_eq!(intents[0].template, NotificationTemplate::Reminder);
        assert_eq!(
            intents[0].recipient,
            RecipientRef::Employee {
                employee_id: a.employee_id
            }
        );

        // Re-running the same tick against the updated row is a no-op.
        let row = repo.get(a.id).unwrap().unwrap();
        assert_eq!(row.status, AssignmentStatus::ReminderDue);
        let intents = tick_assignment(&repo, &row, &rule, &snapshot, &config, now).unwrap();
        assert!(intents.is_empty());
    }

    /// LC-009: escalation intents dedupe per tier through the event log.
    #[test]
    fn test_tick_escalation_records_event_and_dedupes() {
        let rule = rule();
        let a = assignment(&rule);
        let repo = MemoryRepository::new();
        repo.create_if_absent(a.clone()).unwrap();
        let snapshot = DirectorySnapshot::default();
        let config = EngineConfig::default();
        let now = at(2025, 3, 10);

        let intents = tick_assignment(&repo, &a, &rule, &snapshot, &config, now).unwrap();
        assert_eq!(intents.len(), 1);
        assert_eq!(intents[0].tier, Some(1));

        let log = repo.escalation_log(a.id).unwrap();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].tier, 1);

        let row = repo.get(a.id).unwrap().unwrap();
        let intents = tick_assignment(&repo, &row, &rule, &snapshot, &config, now).unwrap();
        assert!(intents.is_empty());
    }

    /// LC-010: a completion racing the tick wins; the tick emits nothing.
    #[test]
    fn test_completion_dominant_over_racing_tick() {
        let rule = rule();
        let a = assignment(&rule);
        let repo = MemoryRepository::new();
        repo.create_if_absent(a.clone()).unwrap();

        // Completion lands after this tick read the row but before it wrote.
        repo.transition(
            a.id,
            AssignmentStatus::Assigned,
            AssignmentStatus::Completed,
            StatusChange {
                completed_at: Some(at(2025, 3, 9)),
                ..Default::default()
            },
        )
        .unwrap();

        let snapshot = DirectorySnapshot::default();
        let config = EngineConfig::default();
        let intents =
            tick_assignment(&repo, &a, &rule, &snapshot, &config, at(2025, 3, 10)).unwrap();
        assert!(intents.is_empty());
        assert!(repo.escalation_log(a.id).unwrap().is_empty());

        let row = repo.get(a.id).unwrap().unwrap();
        assert_eq!(row.status, AssignmentStatus::Completed);
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Severity and tier never regress across an arbitrary pair of
            /// increasing tick times.
            #[test]
            fn prop_lifecycle_is_monotonic(
                first_offset in 0i64..1500,
                second_gap in 0i64..1500,
                grace in 0i64..90,
                reminder in 1i64..60,
            ) {
                let mut rule = rule();
                rule.grace_period_days = grace;
                rule.reminder_days_before = reminder;
                let mut a = assignment(&rule);
                let config = EngineConfig::default();

                let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
                let t1 = start + Duration::days(first_offset);
                let t2 = t1 + Duration::days(second_gap);

                let before = (a.status.severity(), a.escalation_tier);
                if let Some(p1) = plan_transition(&a, &rule, &config, t1) {
                    prop_assert!(p1.next.severity() >= before.0);
                    prop_assert!(p1.escalation_tier >= before.1);
                    a.status = p1.next;
                    a.escalation_tier = p1.escalation_tier;
                }
                let mid = (a.status.severity(), a.escalation_tier);
                if let Some(p2) = plan_transition(&a, &rule, &config, t2) {
                    prop_assert!(p2.next.severity() >= mid.0);
                    prop_assert!(p2.escalation_tier >= mid.1);
                }
            }

            /// Re-planning at the same instant after applying is a no-op.
            #[test]
            fn prop_replanning_same_instant_is_noop(offset in 0i64..1500) {
                let rule = rule();
                let mut a = assignment(&rule);
                let config = EngineConfig::default();
                let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
                    + Duration::days(offset);

                if let Some(planned) = plan_transition(&a, &rule, &config, now) {
                    a.status = planned.next;
                    a.escalation_tier = planned.escalation_tier;
                    prop_assert!(plan_transition(&a, &rule, &config, now).is_none());
                }
            }

            /// The tier never exceeds the configured cap.
            #[test]
            fn prop_tier_respects_cap(offset in 0i64..100_000) {
                let rule = rule();
                let a = assignment(&rule);
                let config = EngineConfig::default();
                let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
                    + Duration::days(offset);

                if let Some(planned) = plan_transition(&a, &rule, &config, now) {
                    prop_assert!(planned.escalation_tier <= config.escalation.max_tier);
                }
            }
        }
    }
}
