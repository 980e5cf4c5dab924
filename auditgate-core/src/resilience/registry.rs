use std::{fmt, sync::Arc};

use auditgate_model::BreakerSnapshot;
use dashmap::DashMap;

use crate::error::{AuditError, Result};

use super::breaker::{BreakerConfig, CircuitBreaker};

/// Breaker name for the DOM accessibility scanner.
pub const DOM_SCANNER: &str = "dom-scanner";
/// Breaker name for the AI remediation draft service.
pub const AI_DRAFT_SERVICE: &str = "ai-draft-service";

/// Process-wide set of breakers, one per external dependency name. Cloning
/// shares the same breakers.
#[derive(Clone)]
pub struct BreakerRegistry {
    defaults: BreakerConfig,
    breakers: Arc<DashMap<String, Arc<CircuitBreaker>>>,
}

impl fmt::Debug for BreakerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BreakerRegistry")
            .field("defaults", &self.defaults)
            .field("breakers", &self.breakers.len())
            .finish()
    }
}

impl Default for BreakerRegistry {
    fn default() -> Self {
        Self::new(BreakerConfig::default())
    }
}

impl BreakerRegistry {
    pub fn new(defaults: BreakerConfig) -> Self {
        Self {
            defaults,
            breakers: Arc::new(DashMap::new()),
        }
    }

    /// Returns the breaker for `name`, creating it with the registry defaults
    /// on first use.
    pub fn get(&self, name: &str) -> Arc<CircuitBreaker> {
        if let Some(existing) = self.breakers.get(name) {
            return Arc::clone(existing.value());
        }
        self.breakers
            .entry(name.to_string())
            .or_insert_with(|| {
                Arc::new(CircuitBreaker::new(name, self.defaults))
            })
            .value()
            .clone()
    }

    pub fn snapshots(&self) -> Vec<BreakerSnapshot> {
        let mut snapshots: Vec<BreakerSnapshot> = self
            .breakers
            .iter()
            .map(|entry| entry.value().snapshot())
            .collect();
        snapshots.sort_by(|a, b| a.name.cmp(&b.name));
        snapshots
    }

    pub fn reset(&self, name: &str) -> Result<()> {
        let breaker = self
            .breakers
            .get(name)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| {
                AuditError::NotFound(format!("circuit breaker '{name}'"))
            })?;
        breaker.reset();
        Ok(())
    }
}
