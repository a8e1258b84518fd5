//! Compliance Training Assignment & Escalation Engine
//!
//! This crate turns declarative compliance rules ("all employees must complete
//! Annual Safety Training every 12 months, 30-day grace period") into concrete,
//! time-tracked obligations per employee, and drives those obligations through
//! a reminder/escalation lifecycle until resolution.

#![warn(missing_docs)]

pub mod api;
pub mod config;
pub mod engine;
pub mod error;
pub mod models;
