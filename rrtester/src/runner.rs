//! # Scenario Runner
//!
//! Builds a scheduler from a [`TesterConfig`], registers the workload and
//! runs it to completion.

use crate::config::{ClockKind, TesterConfig, DEFAULT_AUDIT_CAPACITY};
use core_types::{Priority, ServiceTicks};
use hal::{TickWait, TimerDevice};
use log::info;
use sched_core::{Completion, ExitReason, RunOutcome, RunReport, SchedError, Scheduler};
use sched_core::{HostTimer, SimTimerDevice};
use thiserror::Error;

/// Tester error types
#[derive(Debug, Error)]
pub enum TesterError {
    #[error("Scheduler error: {0}")]
    Sched(#[from] SchedError),

    #[error("Failed to read config file {path}: {source}")]
    ConfigRead {
        path: String,
        source: std::io::Error,
    },

    #[error("Invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid config: {0}")]
    Config(String),

    #[error("Usage error: {0}")]
    Usage(String),
}

/// Runs the configured workload on the configured clock
pub fn run_scenario(config: &TesterConfig) -> Result<RunReport, TesterError> {
    config.validate()?;
    match config.clock {
        ClockKind::Sim => run_with_clock(SimTimerDevice::new(), config),
        ClockKind::Host => run_with_clock(HostTimer::new(), config),
    }
}

fn run_with_clock<C: TickWait>(clock: C, config: &TesterConfig) -> Result<RunReport, TesterError> {
    let mut scheduler = build_scheduler(clock, config)?;
    Ok(scheduler.run_forever()?)
}

/// Creates the scheduler and registers every unit of the workload
///
/// The audit log is always bounded here since a harness run never reads it.
fn build_scheduler<C: TimerDevice>(
    clock: C,
    config: &TesterConfig,
) -> Result<Scheduler<C>, TesterError> {
    let mut scheduler_config = config.scheduler.clone();
    scheduler_config
        .audit_capacity
        .get_or_insert(DEFAULT_AUDIT_CAPACITY);
    let mut scheduler = Scheduler::with_config(clock, scheduler_config)?;

    for spec in &config.units {
        let id = scheduler.create(&spec.name, Priority::new(spec.priority))?;
        if let Some(target) = spec.target_service_time {
            scheduler.set_target_service_time(id, ServiceTicks::new(target))?;
        }
        info!("{} registered as {}", spec.name, id);
    }
    Ok(scheduler)
}

/// One line per terminated unit
pub fn format_completion(completion: &Completion) -> String {
    match (completion.reason, completion.target) {
        (ExitReason::BudgetReached, Some(target)) => format!(
            "{} finished at tick {}: {} of {} (overshoot {})",
            completion.name,
            completion.finished_at,
            completion.accumulated,
            target,
            completion.overshoot()
        ),
        (ExitReason::BudgetReached, None) => format!(
            "{} finished at tick {}: {}",
            completion.name, completion.finished_at, completion.accumulated
        ),
        (ExitReason::Aborted, _) => format!(
            "{} aborted at tick {} after {}",
            completion.name, completion.finished_at, completion.accumulated
        ),
    }
}

/// Closing line for a run
pub fn format_summary(report: &RunReport) -> String {
    let order: Vec<&str> = report
        .completions
        .iter()
        .map(|completion| completion.name.as_str())
        .collect();
    let outcome = match report.outcome {
        RunOutcome::Completed => "completed",
        RunOutcome::Stalled => "stalled",
        RunOutcome::DispatchLimitReached => "hit dispatch limit",
    };
    format!(
        "run {} in {} ticks; {} dispatches, {} context switches; order: {}",
        outcome,
        report.elapsed_ticks(),
        report.stats.dispatches,
        report.stats.context_switches,
        order.join(", ")
    )
}
