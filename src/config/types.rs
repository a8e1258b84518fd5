//! Engine policy configuration types.

use serde::{Deserialize, Serialize};

use crate::error::EngineResult;
use crate::models::ComplianceRule;

/// Escalation cadence policy.
///
/// The threshold cadence past the grace period is a named parameter rather
/// than a hard-coded value: tier `n` fires once
/// `now >= due_date + grace_period + n * interval_days`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EscalationPolicy {
    /// Days between escalation tiers, counted from the end of the grace
    /// period.
    pub interval_days: i64,
    /// Highest tier an assignment can reach; further threshold crossings
    /// are capped here.
    pub max_tier: u32,
}

impl Default for EscalationPolicy {
    fn default() -> Self {
        Self {
            interval_days: 30,
            max_tier: 3,
        }
    }
}

/// Engine-wide policy configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Escalation cadence and cap.
    #[serde(default)]
    pub escalation: EscalationPolicy,
    /// Window for one-time (non-recurring) obligations. When unset, a
    /// one-time rule's grace period doubles as its window.
    #[serde(default)]
    pub one_time_window_days: Option<i64>,
}

impl EngineConfig {
    /// Validates the policy values.
    pub fn validate(&self) -> EngineResult<()> {
        use crate::error::EngineError;

        if self.escalation.interval_days <= 0 {
            return Err(EngineError::ConfigParseError {
                path: "escalation.interval_days".to_string(),
                message: "must be positive".to_string(),
            });
        }
        if self.escalation.max_tier == 0 {
            return Err(EngineError::ConfigParseError {
                path: "escalation.max_tier".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        if let Some(window) = self.one_time_window_days
            && window < 0
        {
            return Err(EngineError::ConfigParseError {
                path: "one_time_window_days".to_string(),
                message: "must be non-negative".to_string(),
            });
        }
        Ok(())
    }

    /// The one-time window to apply for `rule`, falling back to the rule's
    /// grace period when no window is configured.
    pub fn one_time_window_for(&self, rule: &ComplianceRule) -> i64 {
        self.one_time_window_days.unwrap_or(rule.grace_period_days)
    }
}
