//! Application state for the compliance engine API.
//!
//! This module defines the shared application state that is available
//! to all request handlers.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};

use crate::config::ConfigLoader;
use crate::engine::MemoryRepository;
use crate::error::{EngineError, EngineResult};
use crate::models::{ComplianceRule, DirectorySnapshot, RuleId};

struct Inner {
    config: ConfigLoader,
    repository: MemoryRepository,
    rules: Mutex<BTreeMap<RuleId, ComplianceRule>>,
    snapshot: Mutex<DirectorySnapshot>,
    evaluations: Mutex<BTreeMap<RuleId, DateTime<Utc>>>,
}

/// Shared application state.
///
/// Holds the policy configuration, the assignment repository, the registered
/// rule set, and the most recent directory snapshot (captured on each
/// evaluation and reused by the rollup endpoints).
#[derive(Clone)]
pub struct AppState {
    inner: Arc<Inner>,
}

impl AppState {
    /// Creates a new application state with the given configuration loader.
    pub fn new(config: ConfigLoader) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                repository: MemoryRepository::new(),
                rules: Mutex::new(BTreeMap::new()),
                snapshot: Mutex::new(DirectorySnapshot::default()),
                evaluations: Mutex::new(BTreeMap::new()),
            }),
        }
    }

    /// Returns a reference to the configuration loader.
    pub fn config(&self) -> &ConfigLoader {
        &self.inner.config
    }

    /// Returns a reference to the assignment repository.
    pub fn repository(&self) -> &MemoryRepository {
        &self.inner.repository
    }

    /// Registers a rule, replacing any prior version with the same id.
    pub fn insert_rule(&self, rule: ComplianceRule) -> EngineResult<()> {
        let mut rules = self.inner.rules.lock().map_err(|_| Self::poisoned())?;
        rules.insert(rule.id, rule);
        Ok(())
    }

    /// Marks a rule inactive, returning the updated rule.
    pub fn deactivate_rule(&self, rule_id: RuleId) -> EngineResult<ComplianceRule> {
        let mut rules = self.inner.rules.lock().map_err(|_| Self::poisoned())?;
        let rule = rules
            .get_mut(&rule_id)
            .ok_or(EngineError::RuleNotFound { rule_id })?;
        rule.is_active = false;
        Ok(rule.clone())
    }

    /// The registered rules, in id order.
    pub fn rules(&self) -> EngineResult<Vec<ComplianceRule>> {
        let rules = self.inner.rules.lock().map_err(|_| Self::poisoned())?;
        Ok(rules.values().cloned().collect())
    }

    /// Replaces the stored directory snapshot.
    pub fn set_snapshot(&self, snapshot: DirectorySnapshot) -> EngineResult<()> {
        let mut held = self.inner.snapshot.lock().map_err(|_| Self::poisoned())?;
        *held = snapshot;
        Ok(())
    }

    /// The directory snapshot captured by the most recent evaluation.
    pub fn snapshot(&self) -> EngineResult<DirectorySnapshot> {
        let held = self.inner.snapshot.lock().map_err(|_| Self::poisoned())?;
        Ok(held.clone())
    }

    /// Records a successful evaluation instant for each given rule.
    pub fn record_evaluations(
        &self,
        rule_ids: impl IntoIterator<Item = RuleId>,
        at: DateTime<Utc>,
    ) -> EngineResult<()> {
        let mut held = self.inner.evaluations.lock().map_err(|_| Self::poisoned())?;
        for rule_id in rule_ids {
            held.insert(rule_id, at);
        }
        Ok(())
    }

    /// The instant a rule last completed an evaluation pass, if it has.
    pub fn last_evaluated(&self, rule_id: RuleId) -> EngineResult<Option<DateTime<Utc>>> {
        let held = self.inner.evaluations.lock().map_err(|_| Self::poisoned())?;
        Ok(held.get(&rule_id).copied())
    }

    fn poisoned() -> EngineError {
        EngineError::StorageUnavailable {
            message: "state lock poisoned".to_string(),
        }
    }
}
