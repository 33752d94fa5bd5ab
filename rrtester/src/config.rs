//! # Tester Configuration
//!
//! The workload and scheduler settings for one run, loadable from JSON.
//!
//! ```json
//! {
//!   "clock": "sim",
//!   "scheduler": { "quantum_ticks": 1000 },
//!   "units": [
//!     { "name": "A", "priority": 1, "target_service_time": 3000 },
//!     { "name": "idle", "priority": 7 }
//!   ]
//! }
//! ```
//!
//! Missing fields take their defaults; a unit without `target_service_time`
//! runs until aborted.

use crate::runner::TesterError;
use sched_core::SchedulerConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Ticks per quantum in the default workload (one second on the host clock)
pub const DEFAULT_QUANTUM_TICKS: u64 = 1_000_000;

/// Dispatch guard for the default workload
pub const DEFAULT_MAX_DISPATCHES: u64 = 10_000;

/// Audit events the harness keeps when the config names no capacity
pub const DEFAULT_AUDIT_CAPACITY: usize = 4_096;

/// Clock source driving the run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClockKind {
    /// Simulated clock; waiting jumps to the deadline
    Sim,
    /// Host monotonic clock in microseconds; waiting sleeps
    Host,
}

/// One unit of the workload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitSpec {
    pub name: String,
    #[serde(default = "default_priority")]
    pub priority: u8,
    #[serde(default)]
    pub target_service_time: Option<u64>,
}

fn default_priority() -> u8 {
    1
}

impl UnitSpec {
    pub fn new(name: &str, priority: u8, target_service_time: Option<u64>) -> Self {
        Self {
            name: name.to_string(),
            priority,
            target_service_time,
        }
    }
}

/// Complete configuration for one tester run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TesterConfig {
    pub clock: ClockKind,
    pub scheduler: SchedulerConfig,
    pub units: Vec<UnitSpec>,
}

impl Default for TesterConfig {
    fn default() -> Self {
        let budgets: [(&str, u64); 5] = [("A", 3), ("B", 6), ("C", 4), ("D", 5), ("E", 2)];
        Self {
            clock: ClockKind::Sim,
            scheduler: SchedulerConfig {
                quantum_ticks: DEFAULT_QUANTUM_TICKS,
                max_dispatches: Some(DEFAULT_MAX_DISPATCHES),
                audit_capacity: Some(DEFAULT_AUDIT_CAPACITY),
                ..SchedulerConfig::default()
            },
            units: budgets
                .iter()
                .map(|(name, quanta)| {
                    UnitSpec::new(name, 1, Some(*quanta * DEFAULT_QUANTUM_TICKS))
                })
                .collect(),
        }
    }
}

impl TesterConfig {
    /// Parses a configuration from JSON text
    pub fn from_json(text: &str) -> Result<Self, TesterError> {
        let config: TesterConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses a configuration file
    pub fn load(path: &Path) -> Result<Self, TesterError> {
        let text = fs::read_to_string(path).map_err(|source| TesterError::ConfigRead {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&text)
    }

    /// Checks the workload against the scheduler settings
    pub fn validate(&self) -> Result<(), TesterError> {
        self.scheduler.validate()?;
        if self.units.len() > self.scheduler.max_units {
            return Err(TesterError::Config(format!(
                "{} units configured but the context pool holds {}",
                self.units.len(),
                self.scheduler.max_units
            )));
        }
        if let Some(unit) = self
            .units
            .iter()
            .find(|unit| unit.priority as usize >= self.scheduler.priority_levels)
        {
            return Err(TesterError::Config(format!(
                "unit {} has priority {} but only {} levels are configured",
                unit.name, unit.priority, self.scheduler.priority_levels
            )));
        }
        Ok(())
    }
}
