//! Core data models for the compliance engine.
//!
//! This module contains all the domain models used throughout the engine.

mod assignment;
mod directory;
mod event;
mod ids;
mod rule;

pub use assignment::{AssignmentStatus, ComplianceAssignment, Exemption};
pub use directory::{DirectorySnapshot, EmployeeRecord, EmployeeStatus};
pub use event::{
    CompletionEvent, EscalationEvent, ExemptionRequest, NextCycleIntent, NotificationIntent,
    NotificationTemplate, RecipientRef,
};
pub use ids::{
    AssignmentId, CompanyId, CourseId, DepartmentId, EmployeeId, PositionId, RuleId,
};
pub use rule::ComplianceRule;
