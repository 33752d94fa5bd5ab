//! Accounting Test Utilities
//!
//! This crate provides shared helpers for the scheduler's integration tests.
//!
//! ## Test Philosophy
//!
//! - **Exact accounting**: every tick a core is busy is charged to exactly
//!   one unit
//! - **Deterministic schedules**: all runs use the simulated clock, so a
//!   failing schedule is reproducible
//! - **Invariants after every step**: tests call `verify_invariants` as they go

use core_types::{Priority, ServiceTicks, UnitId};
use sched_core::{Scheduler, SchedulerConfig, SimTimerDevice};

/// Initializes logging once per test binary
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Single-core simulated scheduler with the given quantum
pub fn sim_scheduler(quantum_ticks: u64) -> Scheduler<SimTimerDevice> {
    init_logging();
    let config = SchedulerConfig {
        quantum_ticks,
        priority_levels: 8,
        max_units: 16,
        ..SchedulerConfig::default()
    };
    Scheduler::with_config(SimTimerDevice::new(), config)
        .expect("test scheduler config is valid")
}

/// Registers `name` at `priority` with an optional budget
pub fn spawn_unit(
    scheduler: &mut Scheduler<SimTimerDevice>,
    name: &str,
    priority: u8,
    target: Option<u64>,
) -> UnitId {
    let id = scheduler
        .create(name, Priority::new(priority))
        .expect("Failed to create unit");
    if let Some(target) = target {
        scheduler
            .set_target_service_time(id, ServiceTicks::new(target))
            .expect("Failed to set target service time");
    }
    id
}

/// Advances the clock by `ticks` and runs one scheduling point
pub fn advance_and_tick(scheduler: &mut Scheduler<SimTimerDevice>, ticks: u64) {
    scheduler.clock_mut().advance_ticks(ticks);
    scheduler.tick().expect("tick failed");
}

/// Names of completed units, in completion order
pub fn completion_order(scheduler: &mut Scheduler<SimTimerDevice>) -> Vec<String> {
    scheduler
        .drain_completions()
        .into_iter()
        .map(|completion| completion.name)
        .collect()
}
