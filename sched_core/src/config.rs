//! Scheduler configuration

use crate::error::SchedError;
use crate::ready_queue::MAX_PRIORITY_LEVELS;
use serde::{Deserialize, Serialize};

/// Scheduler configuration
///
/// Every field has a default, so a partial JSON object such as
/// `{"quantum_ticks": 1000}` deserializes into a complete config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Number of ticks a unit can run before being preempted
    pub quantum_ticks: u64,
    /// Number of priority levels (`Priority(0)` .. `Priority(levels - 1)`)
    pub priority_levels: usize,
    /// Size of the execution-context pool, i.e. the maximum number of
    /// non-terminated units
    pub max_units: usize,
    /// Stack bytes reserved per execution context
    pub stack_size: usize,
    /// Upper bound on dispatches performed by `run_forever`
    pub max_dispatches: Option<u64>,
    /// Number of audit events retained; the oldest are dropped first.
    /// `None` keeps every event.
    pub audit_capacity: Option<usize>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            quantum_ticks: 10, // Small quantum for testing
            priority_levels: 16,
            max_units: 8,
            stack_size: 1024,
            max_dispatches: None,
            audit_capacity: None,
        }
    }
}

impl SchedulerConfig {
    /// Checks that the configuration describes a usable scheduler
    pub fn validate(&self) -> Result<(), SchedError> {
        if self.quantum_ticks == 0 {
            return Err(SchedError::invalid("quantum_ticks must be non-zero"));
        }
        if self.priority_levels == 0 || self.priority_levels > MAX_PRIORITY_LEVELS {
            return Err(SchedError::invalid(format!(
                "priority_levels must be within 1..={}, got {}",
                MAX_PRIORITY_LEVELS, self.priority_levels
            )));
        }
        if self.max_units == 0 {
            return Err(SchedError::invalid("max_units must be non-zero"));
        }
        if self.audit_capacity == Some(0) {
            return Err(SchedError::invalid("audit_capacity must be non-zero"));
        }
        Ok(())
    }
}
