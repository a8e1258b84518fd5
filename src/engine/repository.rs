//! Assignment repository contract and in-memory implementation.
//!
//! The repository is the sole source of truth for "does an open assignment
//! already exist": callers always attempt a conditional create and treat
//! [`CreateOutcome::AlreadyExists`] as "skip", never pre-check and then
//! write. Status changes are single-row compare-and-swap keyed on the
//! current status, so concurrent ticks racing on the same assignment
//! converge safely.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::error::{EngineError, EngineResult};
use crate::models::{
    AssignmentId, AssignmentStatus, ComplianceAssignment, EmployeeId, EscalationEvent, Exemption,
    NextCycleIntent, RuleId,
};

/// Result of a conditional create.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateOutcome {
    /// The assignment was created.
    Created,
    /// The natural key already exists, or an open assignment for the same
    /// (rule, employee) pair is still pending. Expected under concurrent
    /// reconciliation; not an error.
    AlreadyExists,
}

/// Result of a compare-and-swap status transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionOutcome {
    /// The transition was applied.
    Applied,
    /// The row's status no longer matched the expected status; a concurrent
    /// transition won. Callers log and move on rather than retry blindly.
    Stale {
        /// The status actually found on the row.
        actual: AssignmentStatus,
    },
    /// The row is already in a terminal state; terminal rows never change.
    AlreadyTerminal {
        /// The terminal status found on the row.
        status: AssignmentStatus,
    },
}

/// The fields a transition may change alongside the status.
#[derive(Debug, Clone, Default)]
pub struct StatusChange {
    /// The new escalation tier, when the transition escalates.
    pub escalation_tier: Option<u32>,
    /// Completion instant, for transitions to `Completed`.
    pub completed_at: Option<DateTime<Utc>>,
    /// Exemption record, for transitions to `Exempted`.
    pub exemption: Option<Exemption>,
}

/// Durable store contract for compliance assignments.
///
/// Implementations must enforce the natural-key uniqueness of
/// `(rule_id, employee_id, cycle_start)` and the at-most-one-open invariant
/// per `(rule_id, employee_id)` inside [`create_if_absent`], atomically.
///
/// [`create_if_absent`]: AssignmentRepository::create_if_absent
pub trait AssignmentRepository: Send + Sync {
    /// Atomically creates the assignment unless its natural key exists or an
    /// open assignment for the same (rule, employee) pair exists.
    fn create_if_absent(&self, assignment: ComplianceAssignment) -> EngineResult<CreateOutcome>;

    /// Fetches an assignment by its surrogate id.
    fn get(&self, id: AssignmentId) -> EngineResult<Option<ComplianceAssignment>>;

    /// The open assignment for a (rule, employee) pair, if any.
    fn find_open(
        &self,
        rule_id: RuleId,
        employee_id: EmployeeId,
    ) -> EngineResult<Option<ComplianceAssignment>>;

    /// All open assignments issued under a rule.
    fn open_for_rule(&self, rule_id: RuleId) -> EngineResult<Vec<ComplianceAssignment>>;

    /// All assignments (any status) for an employee.
    fn for_employee(&self, employee_id: EmployeeId) -> EngineResult<Vec<ComplianceAssignment>>;

    /// Every assignment in the store; read-model projections scan this.
    fn all(&self) -> EngineResult<Vec<ComplianceAssignment>>;

    /// Compare-and-swap status transition keyed on the current status.
    fn transition(
        &self,
        id: AssignmentId,
        expected: AssignmentStatus,
        next: AssignmentStatus,
        change: StatusChange,
    ) -> EngineResult<TransitionOutcome>;

    /// Appends an escalation event unless the same tier already fired for
    /// the assignment. Returns true when the event was recorded.
    fn record_escalation(&self, event: EscalationEvent) -> EngineResult<bool>;

    /// The escalation log for an assignment, in append order.
    fn escalation_log(&self, assignment_id: AssignmentId) -> EngineResult<Vec<EscalationEvent>>;

    /// Appends to the reminder log unless a reminder was already recorded
    /// for the assignment. Returns true when recorded.
    fn record_reminder(
        &self,
        assignment_id: AssignmentId,
        at: DateTime<Utc>,
    ) -> EngineResult<bool>;

    /// Stores a planned next cycle, replacing any previous plan for the
    /// same (rule, employee) pair.
    fn put_plan(&self, plan: NextCycleIntent) -> EngineResult<()>;

    /// Removes and returns the plan for a (rule, employee) pair.
    fn take_plan(
        &self,
        rule_id: RuleId,
        employee_id: EmployeeId,
    ) -> EngineResult<Option<NextCycleIntent>>;

    /// All pending plans for a rule.
    fn plans_for_rule(&self, rule_id: RuleId) -> EngineResult<Vec<NextCycleIntent>>;

    /// Drops the plan for a (rule, employee) pair, if one exists.
    fn drop_plan(&self, rule_id: RuleId, employee_id: EmployeeId) -> EngineResult<()>;
}

#[derive(Default)]
struct Store {
    assignments: HashMap<AssignmentId, ComplianceAssignment>,
    natural_keys: HashMap<(RuleId, EmployeeId, DateTime<Utc>), AssignmentId>,
    escalations: HashMap<AssignmentId, Vec<EscalationEvent>>,
    reminders: HashMap<AssignmentId, Vec<DateTime<Utc>>>,
    plans: HashMap<(RuleId, EmployeeId), NextCycleIntent>,
}

/// In-memory [`AssignmentRepository`].
///
/// Backs the API surface and the test suite; a durable adapter implements
/// the same trait against real storage.
#[derive(Default)]
pub struct MemoryRepository {
    inner: Mutex<Store>,
}

impl MemoryRepository {
    /// Creates an empty repository.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> EngineResult<std::sync::MutexGuard<'_, Store>> {
        self.inner
            .lock()
            .map_err(|_| EngineError::StorageUnavailable {
                message: "repository lock poisoned".to_string(),
            })
    }
}

impl AssignmentRepository for MemoryRepository {
    fn create_if_absent(&self, assignment: ComplianceAssignment) -> EngineResult<CreateOutcome> {
        let mut store = self.lock()?;

        if store.natural_keys.contains_key(&assignment.natural_key()) {
            debug!(
                rule_id = %assignment.rule_id,
                employee_id = %assignment.employee_id,
                "Natural key already exists, skipping create"
            );
            return Ok(CreateOutcome::AlreadyExists);
        }
        let has_open = store
            .assignments
            .values()
            .any(|a| {
                a.rule_id == assignment.rule_id
                    && a.employee_id == assignment.employee_id
                    && a.is_open()
            });
        if has_open {
            debug!(
                rule_id = %assignment.rule_id,
                employee_id = %assignment.employee_id,
                "Open assignment already pending, skipping create"
            );
            return Ok(CreateOutcome::AlreadyExists);
        }

        store.natural_keys.insert(assignment.natural_key(), assignment.id);
        store.assignments.insert(assignment.id, assignment);
        Ok(CreateOutcome::Created)
    }

    fn get(&self, id: AssignmentId) -> EngineResult<Option<ComplianceAssignment>> {
        Ok(self.lock()?.assignments.get(&id).cloned())
    }

    fn find_open(
        &self,
        rule_id: RuleId,
        employee_id: EmployeeId,
    ) -> EngineResult<Option<ComplianceAssignment>> {
        Ok(self
            .lock()?
            .assignments
            .values()
            .find(|a| a.rule_id == rule_id && a.employee_id == employee_id && a.is_open())
            .cloned())
    }

    fn open_for_rule(&self, rule_id: RuleId) -> EngineResult<Vec<ComplianceAssignment>> {
        let mut open: Vec<_> = self
            .lock()?
            .assignments
            .values()
            .filter(|a| a.rule_id == rule_id && a.is_open())
            .cloned()
            .collect();
        open.sort_by_key(|a| (a.employee_id, a.cycle_start));
        Ok(open)
    }

    fn for_employee(&self, employee_id: EmployeeId) -> EngineResult<Vec<ComplianceAssignment>> {
        let mut rows: Vec<_> = self
            .lock()?
            .assignments
            .values()
            .filter(|a| a.employee_id == employee_id)
            .cloned()
            .collect();
        rows.sort_by_key(|a| (a.rule_id, a.cycle_start));
        Ok(rows)
    }

    fn all(&self) -> EngineResult<Vec<ComplianceAssignment>> {
        Ok(self.lock()?.assignments.values().cloned().collect())
    }

    fn transition(
        &self,
        id: AssignmentId,
        expected: AssignmentStatus,
        next: AssignmentStatus,
        change: StatusChange,
    ) -> EngineResult<TransitionOutcome> {
        let mut store = self.lock()?;
        let Some(assignment) = store.assignments.get_mut(&id) else {
            return Err(EngineError::AssignmentNotFound { assignment_id: id });
        };

        if assignment.status.is_terminal() {
            return Ok(TransitionOutcome::AlreadyTerminal {
                status: assignment.status,
            });
        }
        if assignment.status != expected {
            return Ok(TransitionOutcome::Stale {
                actual: assignment.status,
            });
        }

        assignment.status = next;
        if let Some(tier) = change.escalation_tier {
            assignment.escalation_tier = tier;
        }
        if change.completed_at.is_some() {
            assignment.completed_at = change.completed_at;
        }
        if change.exemption.is_some() {
            assignment.exemption = change.exemption;
        }
        Ok(TransitionOutcome::Applied)
    }

    fn record_escalation(&self, event: EscalationEvent) -> EngineResult<bool> {
        let mut store = self.lock()?;
        let log = store.escalations.entry(event.assignment_id).or_default();
        if log.iter().any(|e| e.tier == event.tier) {
            return Ok(false);
        }
        log.push(event);
        Ok(true)
    }

    fn escalation_log(&self, assignment_id: AssignmentId) -> EngineResult<Vec<EscalationEvent>> {
        Ok(self
            .lock()?
            .escalations
            .get(&assignment_id)
            .cloned()
            .unwrap_or_default())
    }

    fn record_reminder(
        &self,
        assignment_id: AssignmentId,
        at: DateTime<Utc>,
    ) -> EngineResult<bool> {
        let mut store = self.lock()?;
        let log = store.reminders.entry(assignment_id).or_default();
        if !log.is_empty() {
            return Ok(false);
        }
        log.push(at);
        Ok(true)
    }

    fn put_plan(&self, plan: NextCycleIntent) -> EngineResult<()> {
        self.lock()?
            .plans
            .insert((plan.rule_id, plan.employee_id), plan);
        Ok(())
    }

    fn take_plan(
        &self,
        rule_id: RuleId,
        employee_id: EmployeeId,
    ) -> EngineResult<Option<NextCycleIntent>> {
        Ok(self.lock()?.plans.remove(&(rule_id, employee_id)))
    }

    fn plans_for_rule(&self, rule_id: RuleId) -> EngineResult<Vec<NextCycleIntent>> {
        Ok(self
            .lock()?
            .plans
            .values()
            .filter(|p| p.rule_id == rule_id)
            .copied()
            .collect())
    }

    fn drop_plan(&self, rule_id: RuleId, employee_id: EmployeeId) -> EngineResult<()> {
        self.lock()?.plans.remove(&(rule_id, employee_id));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    use crate::models::RecipientRef;

    fn assignment(rule_id: RuleId, employee_id: EmployeeId) -> ComplianceAssignment {
        ComplianceAssignment::new(
            rule_id,
            employee_id,
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
        )
    }

    /// REPO-001: conditional create is idempotent on the natural key.
    #[test]
    fn test_create_if_absent_dedupes_natural_key() {
        let repo = MemoryRepository::new();
        let a = assignment(RuleId::new(), EmployeeId::new());

        assert_eq!(
            repo.create_if_absent(a.clone()).unwrap(),
            CreateOutcome::Created
        );
        assert_eq!(
            repo.create_if_absent(a).unwrap(),
            CreateOutcome::AlreadyExists
        );
    }

    /// REPO-002: at most one open assignment per (rule, employee), even for a
    /// different cycle_start.
    #[test]
    fn test_create_if_absent_enforces_at_most_one_open() {
        let repo = MemoryRepository::new();
        let rule_id = RuleId::new();
        let employee_id = EmployeeId::new();

        let first = assignment(rule_id, employee_id);
        repo.create_if_absent(first.clone()).unwrap();

        let mut second = assignment(rule_id, employee_id);
        second.cycle_start = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        assert_eq!(
            repo.create_if_absent(second).unwrap(),
            CreateOutcome::AlreadyExists
        );
    }

    /// REPO-003: once the prior cycle is terminal, the next cycle can open.
    #[test]
    fn test_new_cycle_allowed_after_terminal() {
        let repo = MemoryRepository::new();
        let rule_id = RuleId::new();
        let employee_id = EmployeeId::new();

        let first = assignment(rule_id, employee_id);
        repo.create_if_absent(first.clone()).unwrap();
        repo.transition(
            first.id,
            AssignmentStatus::Assigned,
            AssignmentStatus::Completed,
            StatusChange {
                completed_at: Some(Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap()),
                ..Default::default()
            },
        )
        .unwrap();

        let mut second = assignment(rule_id, employee_id);
        second.cycle_start = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        assert_eq!(
            repo.create_if_absent(second).unwrap(),
            CreateOutcome::Created
        );
    }

    /// REPO-004: CAS transitions reject stale expectations.
    #[test]
    fn test_transition_cas_detects_stale_status() {
        let repo = MemoryRepository::new();
        let a = assignment(RuleId::new(), EmployeeId::new());
        repo.create_if_absent(a.clone()).unwrap();

        repo.transition(
            a.id,
            AssignmentStatus::Assigned,
            AssignmentStatus::ReminderDue,
            StatusChange::default(),
        )
        .unwrap();

        let outcome = repo
            .transition(
                a.id,
                AssignmentStatus::Assigned,
                AssignmentStatus::Due,
                StatusChange::default(),
            )
            .unwrap();
        assert_eq!(
            outcome,
            TransitionOutcome::Stale {
                actual: AssignmentStatus::ReminderDue
            }
        );
    }

    /// REPO-005: terminal rows never change.
    #[test]
    fn test_transition_rejected_on_terminal_row() {
        let repo = MemoryRepository::new();
        let a = assignment(RuleId::new(), EmployeeId::new());
        repo.create_if_absent(a.clone()).unwrap();

        repo.transition(
            a.id,
            AssignmentStatus::Assigned,
            AssignmentStatus::Completed,
            StatusChange {
                completed_at: Some(Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap()),
                ..Default::default()
            },
        )
        .unwrap();

        let outcome = repo
            .transition(
                a.id,
                AssignmentStatus::Completed,
                AssignmentStatus::Escalated,
                StatusChange::default(),
            )
            .unwrap();
        assert_eq!(
            outcome,
            TransitionOutcome::AlreadyTerminal {
                status: AssignmentStatus::Completed
            }
        );

        let row = repo.get(a.id).unwrap().unwrap();
        assert_eq!(row.status, AssignmentStatus::Completed);
    }

    /// REPO-006: the escalation log refuses the same tier twice.
    #[test]
    fn test_escalation_log_dedupes_by_tier() {
        let repo = MemoryRepository::new();
        let assignment_id = AssignmentId::new();
        let event = EscalationEvent {
            assignment_id,
            tier: 1,
            recipient: RecipientRef::Manager {
                manager_id: EmployeeId::new(),
            },
            occurred_at: Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap(),
        };

        assert!(repo.record_escalation(event.clone()).unwrap());
        assert!(!repo.record_escalation(event.clone()).unwrap());

        let mut tier2 = event;
        tier2.tier = 2;
        assert!(repo.record_escalation(tier2).unwrap());
        assert_eq!(repo.escalation_log(assignment_id).unwrap().len(), 2);
    }

    /// REPO-007: reminders are recorded at most once per assignment.
    #[test]
    fn test_reminder_log_records_once() {
        let repo = MemoryRepository::new();
        let id = AssignmentId::new();
        let at = Utc.with_ymd_and_hms(2024, 12, 18, 0, 0, 0).unwrap();

        assert!(repo.record_reminder(id, at).unwrap());
        assert!(!repo.record_reminder(id, at).unwrap());
    }

    /// REPO-008: plans are keyed per (rule, employee) and taken once.
    #[test]
    fn test_plans_take_and_drop() {
        let repo = MemoryRepository::new();
        let rule_id = RuleId::new();
        let employee_id = EmployeeId::new();
        let plan = NextCycleIntent {
            rule_id,
            employee_id,
            cycle_start: Utc.with_ymd_and_hms(2025, 1, 20, 0, 0, 0).unwrap(),
        };

        repo.put_plan(plan).unwrap();
        assert_eq!(repo.plans_for_rule(rule_id).unwrap().len(), 1);
        assert_eq!(repo.take_plan(rule_id, employee_id).unwrap(), Some(plan));
        assert_eq!(repo.take_plan(rule_id, employee_id).unwrap(), None);

        repo.put_plan(plan).unwrap();
        repo.drop_plan(rule_id, employee_id).unwrap();
        assert!(repo.plans_for_rule(rule_id).unwrap().is_empty());
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Any interleaving of creates and completions leaves at most
            /// one open assignment per (rule, employee) pair.
            #[test]
            fn prop_at_most_one_open_per_pair(
                cycle_offsets in proptest::collection::vec(0i64..400, 1..20),
                complete_mask in proptest::collection::vec(any::<bool>(), 1..20),
            ) {
                let repo = MemoryRepository::new();
                let rule_id = RuleId::new();
                let employee_id = EmployeeId::new();
                let epoch = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();

                for (i, offset) in cycle_offsets.iter().enumerate() {
                    let mut a = assignment(rule_id, employee_id);
                    a.cycle_start = epoch + chrono::Duration::days(*offset);
                    repo.create_if_absent(a).unwrap();

                    if complete_mask.get(i).copied().unwrap_or(false)
                        && let Some(open) = repo.find_open(rule_id, employee_id).unwrap()
                    {
                        repo.transition(
                            open.id,
                            open.status,
                            AssignmentStatus::Completed,
                            StatusChange {
                                completed_at: Some(epoch),
                                ..Default::default()
                            },
                        )
                        .unwrap();
                    }

                    let open_count = repo
                        .all()
                        .unwrap()
                        .iter()
                        .filter(|row| {
                            row.rule_id == rule_id
                                && row.employee_id == employee_id
                                && row.is_open()
                        })
                        .count();
                    prop_assert!(open_count <= 1);
                }
            }
        }
    }

    /// REPO-009: queries scope by rule and employee.
    #[test]
    fn test_open_for_rule_and_for_employee_scoping() {
        let repo = MemoryRepository::new();
        let rule_a = RuleId::new();
        let rule_b = RuleId::new();
        let employee = EmployeeId::new();

        repo.create_if_absent(assignment(rule_a, employee)).unwrap();
        repo.create_if_absent(assignment(rule_b, employee)).unwrap();
        repo.create_if_absent(assignment(rule_a, EmployeeId::new()))
            .unwrap();

        assert_eq!(repo.open_for_rule(rule_a).unwrap().len(), 2);
        assert_eq!(repo.open_for_rule(rule_b).unwrap().len(), 1);
        assert_eq!(repo.for_employee(employee).unwrap().len(), 2);
        assert_eq!(repo.all().unwrap().len(), 3);
    }
}
