//! Core engine: targeting, generation, lifecycle, escalation, and rollups.
//!
//! The modules compose into one evaluation pipeline per rule: the target
//! resolver produces the matched employee set, the generator reconciles it
//! against open assignments, and the lifecycle clock advances each open
//! assignment through its due-state machine, emitting notification intents
//! along the way. [`evaluation::EvaluationPass`] drives the batch and hosts
//! the out-of-band completion and exemption entry points.

pub mod escalation;
pub mod evaluation;
pub mod generator;
pub mod lifecycle;
pub mod recertification;
pub mod repository;
pub mod rollup;
pub mod target_resolver;

pub use evaluation::{EvaluationPass, EvaluationReport, EventOutcome, RuleReport};
pub use generator::{reconcile, ReconcileOutcome};
pub use lifecycle::{plan_transition, tick_assignment, PlannedTransition, TickEffect};
pub use repository::{
    AssignmentRepository, CreateOutcome, MemoryRepository, StatusChange, TransitionOutcome,
};
pub use rollup::{employee_rollup, manager_rollup, StatusCounts};
