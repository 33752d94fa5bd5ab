//! Round-Robin Service-Time Scheduler
//!
//! This module provides the single-core scheduler: a deterministic,
//! quantum-preemptive dispatch loop that tracks how much processor time every
//! unit has actually received.
//!
//! ## Philosophy
//!
//! - **Accounting is exact**: a unit is charged precisely the ticks between
//!   being switched in and the next scheduling point, never more.
//! - **Determinism first**: Same inputs + same ticks => same schedule.
//! - **No ambient state**: the running unit lives in the scheduler, and every
//!   scheduling point returns its [`Dispatch`] decision.
//!
//! ## Design
//!
//! - **Round-robin within a priority level**, strict priority across levels.
//! - **Time-sliced execution**: each dispatch grants one quantum of ticks.
//! - **Budgets**: a unit terminates at the first scheduling point where its
//!   accumulated service time meets its target.
//!
//! ## Hardware Seam
//!
//! A timer interrupt handler would call [`Scheduler::tick`]; an idle loop
//! would wait on [`TickWait`] until the next quantum boundary, which is what
//! [`Scheduler::run_forever`] does.

use crate::audit::{Completion, ScheduleEvent, SchedulerStats};
use crate::config::SchedulerConfig;
use crate::dispatch::{CoreSlot, Dispatch, DispatchCore};
use crate::error::SchedError;
use crate::ready_queue::ReadyQueue;
use crate::registry::Registry;
use crate::unit::UnitRecord;
use core_types::{CoreId, Priority, ServiceTicks, UnitId};
use hal::{TickWait, TimerDevice};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

const CORE: CoreId = CoreId(0);

/// How a `run_forever` loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunOutcome {
    /// Every unit terminated
    Completed,
    /// Nothing is runnable but blocked units remain
    Stalled,
    /// `max_dispatches` was reached first
    DispatchLimitReached,
}

/// Summary of a `run_forever` loop
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    pub outcome: RunOutcome,
    /// Terminations in the order they happened
    pub completions: Vec<Completion>,
    pub started_at: u64,
    pub finished_at: u64,
    pub stats: SchedulerStats,
}

impl RunReport {
    pub fn elapsed_ticks(&self) -> u64 {
        self.finished_at.saturating_sub(self.started_at)
    }
}

/// Preemptive single-core scheduler
///
/// Generic over its clock so the same code runs against
/// [`SimTimerDevice`](crate::timer::SimTimerDevice) in tests and
/// [`HostTimer`](crate::timer::HostTimer) in the harness.
pub struct Scheduler<C> {
    dispatcher: DispatchCore,
    clock: C,
    slot: CoreSlot,
}

impl<C: TimerDevice> Scheduler<C> {
    /// Creates a new scheduler with default configuration
    pub fn new(clock: C) -> Self {
        Self::build(clock, SchedulerConfig::default())
    }

    /// Creates a new scheduler with custom configuration
    pub fn with_config(clock: C, config: SchedulerConfig) -> Result<Self, SchedError> {
        config.validate()?;
        Ok(Self::build(clock, config))
    }

    fn build(clock: C, config: SchedulerConfig) -> Self {
        Self {
            dispatcher: DispatchCore::new(config),
            clock,
            slot: CoreSlot::default(),
        }
    }

    /// Registers a new unit and queues it for execution
    pub fn create(&mut self, name: &str, priority: Priority) -> Result<UnitId, SchedError> {
        let now = self.clock.poll_ticks();
        self.dispatcher.create(name, priority, CORE, now)
    }

    /// Sets the unit's budget; must happen before its first dispatch
    pub fn set_target_service_time(
        &mut self,
        unit: UnitId,
        ticks: ServiceTicks,
    ) -> Result<(), SchedError> {
        self.dispatcher.set_target_service_time(unit, ticks)
    }

    pub fn lookup(&self, unit: UnitId) -> Result<&UnitRecord, SchedError> {
        self.dispatcher.registry.lookup(unit)
    }

    /// Runs one scheduling point at the current clock reading
    pub fn tick(&mut self) -> Result<Dispatch, SchedError> {
        let now = self.clock.poll_ticks();
        self.dispatcher.step(&mut self.slot, CORE, now)
    }

    /// The running unit gives up the rest of its quantum
    pub fn yield_now(&mut self) -> Result<Dispatch, SchedError> {
        let now = self.clock.poll_ticks();
        self.dispatcher.yield_running(&mut self.slot, CORE, now)
    }

    /// The running unit enters a blocking wait
    pub fn block_current(&mut self) -> Result<Dispatch, SchedError> {
        let now = self.clock.poll_ticks();
        self.dispatcher.block_running(&mut self.slot, CORE, now)
    }

    /// Makes a blocked unit runnable again
    ///
    /// If it outranks the running unit, it takes over at the next tick.
    pub fn unblock(&mut self, unit: UnitId) -> Result<(), SchedError> {
        let now = self.clock.poll_ticks();
        self.dispatcher.unblock(unit, CORE, now)
    }

    /// Terminates a unit early
    pub fn abort(&mut self, unit: UnitId) -> Result<(), SchedError> {
        let now = self.clock.poll_ticks();
        self.dispatcher
            .abort(unit, Some(&mut self.slot), CORE, now)
    }

    pub fn set_priority(&mut self, unit: UnitId, priority: Priority) -> Result<(), SchedError> {
        self.dispatcher.set_priority(unit, priority)
    }

    /// Drops a terminated unit's record
    pub fn reclaim(&mut self, unit: UnitId) -> Result<UnitRecord, SchedError> {
        self.dispatcher.reclaim(unit)
    }

    /// Drops every terminated record
    pub fn reap_terminated(&mut self) -> Vec<UnitId> {
        self.dispatcher.reap_terminated()
    }

    /// Takes the termination notices posted since the last call
    pub fn drain_completions(&mut self) -> Vec<Completion> {
        self.dispatcher.drain_completions()
    }

    /// Returns the currently running unit
    pub fn current(&self) -> Option<UnitId> {
        self.slot.current()
    }

    /// Returns true once no unit is left to run or wait
    pub fn is_finished(&self) -> bool {
        self.slot.current().is_none() && self.dispatcher.registry.live_count() == 0
    }

    pub fn registry(&self) -> &Registry {
        &self.dispatcher.registry
    }

    pub fn ready_queue(&self) -> &ReadyQueue {
        &self.dispatcher.ready
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.dispatcher.config
    }

    pub fn stats(&self) -> SchedulerStats {
        self.dispatcher.stats()
    }

    /// Returns the audit log
    ///
    /// Used in tests to verify scheduling behavior.
    pub fn audit_log(&self) -> &VecDeque<ScheduleEvent> {
        self.dispatcher.audit_log()
    }

    pub fn clear_audit_log(&mut self) {
        self.dispatcher.clear_audit_log();
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn clock_mut(&mut self) -> &mut C {
        &mut self.clock
    }

    /// Checks queue/state/accounting consistency
    pub fn verify_invariants(&self) -> Result<(), SchedError> {
        self.dispatcher.verify(&[&self.slot])
    }
}

impl<C: TickWait> Scheduler<C> {
    /// Drives the dispatch loop until every unit has terminated
    ///
    /// Between scheduling points the clock is parked until the running
    /// unit's quantum boundary. Stops early if nothing is runnable while
    /// blocked units remain, or when `max_dispatches` is reached.
    pub fn run_forever(&mut self) -> Result<RunReport, SchedError> {
        let started_at = self.clock.poll_ticks();
        let quantum = self.dispatcher.config.quantum_ticks;
        let limit = self.dispatcher.config.max_dispatches;
        let mut completions = Vec::new();

        let outcome = loop {
            self.tick()?;
            completions.extend(self.drain_completions());

            if self.is_finished() {
                break RunOutcome::Completed;
            }
            let Some(remaining) = self.slot.quantum_remaining(quantum) else {
                warn!(
                    "no runnable unit; {} blocked unit(s) remain",
                    self.dispatcher.registry.live_count()
                );
                break RunOutcome::Stalled;
            };
            if limit.map_or(false, |limit| self.stats().dispatches >= limit) {
                warn!("dispatch limit reached before all units terminated");
                break RunOutcome::DispatchLimitReached;
            }

            let now = self.clock.poll_ticks();
            self.clock.wait_until(now.saturating_add(remaining));
        };

        let report = RunReport {
            outcome,
            completions,
            started_at,
            finished_at: self.clock.poll_ticks(),
            stats: self.stats(),
        };
        debug!(
            "run ended {:?} after {} ticks",
            report.outcome,
            report.elapsed_ticks()
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::PreemptionReason;
    use crate::timer::SimTimerDevice;
    use crate::unit::{ExitReason, UnitState};

    fn scheduler(quantum_ticks: u64) -> Scheduler<SimTimerDevice> {
        let _ = env_logger::builder().is_test(true).try_init();
        let config = SchedulerConfig {
            quantum_ticks,
            ..SchedulerConfig::default()
        };
        Scheduler::with_config(SimTimerDevice::new(), config).unwrap()
    }

    fn advance(scheduler: &mut Scheduler<SimTimerDevice>, ticks: u64) {
        scheduler.clock_mut().advance_ticks(ticks);
    }

    #[test]
    fn test_scheduler_creation() {
        let scheduler = Scheduler::new(SimTimerDevice::new());
        assert_eq!(scheduler.ready_queue().len(), 0);
        assert_eq!(scheduler.current(), None);
        assert!(scheduler.is_finished());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = SchedulerConfig {
            quantum_ticks: 0,
            ..SchedulerConfig::default()
        };
        assert!(Scheduler::with_config(SimTimerDevice::new(), config).is_err());
    }

    #[test]
    fn test_create_enqueues_runnable() {
        let mut scheduler = scheduler(10);
        let a = scheduler.create("A", Priority::new(1)).unwrap();

        let record = scheduler.lookup(a).unwrap();
        assert_eq!(record.state(), UnitState::Runnable);
        assert_eq!(record.accumulated_service_time(), ServiceTicks::zero());
        assert!(scheduler.ready_queue().contains(a));
    }

    #[test]
    fn test_round_robin_ordering() {
        let mut scheduler = scheduler(10);
        let a = scheduler.create("A", Priority::new(1)).unwrap();
        let b = scheduler.create("B", Priority::new(1)).unwrap();
        let c = scheduler.create("C", Priority::new(1)).unwrap();

        let mut order = Vec::new();
        for _ in 0..6 {
            let dispatch = scheduler.tick().unwrap();
            order.push(dispatch.running().unwrap());
            advance(&mut scheduler, 10);
        }
        assert_eq!(order, vec![a, b, c, a, b, c]);
    }

    #[test]
    fn test_accounting_charges_only_running_unit() {
        let mut scheduler = scheduler(10);
        let a = scheduler.create("A", Priority::new(1)).unwrap();
        let b = scheduler.create("B", Priority::new(1)).unwrap();

        scheduler.tick().unwrap();
        advance(&mut scheduler, 4);
        scheduler.tick().unwrap();

        assert_eq!(
            scheduler.lookup(a).unwrap().accumulated_service_time(),
            ServiceTicks::new(4)
        );
        assert_eq!(
            scheduler.lookup(b).unwrap().accumulated_service_time(),
            ServiceTicks::zero()
        );
    }

    #[test]
    fn test_mid_quantum_tick_keeps_running_unit() {
        let mut scheduler = scheduler(10);
        let a = scheduler.create("A", Priority::new(1)).unwrap();
        scheduler.create("B", Priority::new(1)).unwrap();

        scheduler.tick().unwrap();
        advance(&mut scheduler, 5);
        assert_eq!(scheduler.tick().unwrap(), Dispatch::Continued(a));

        advance(&mut scheduler, 5);
        let dispatch = scheduler.tick().unwrap();
        assert_ne!(dispatch.running(), Some(a));
        assert_eq!(
            scheduler.lookup(a).unwrap().accumulated_service_time(),
            ServiceTicks::new(10)
        );
    }

    #[test]
    fn test_budget_reached_terminates() {
        let mut scheduler = scheduler(10);
        let a = scheduler.create("A", Priority::new(1)).unwrap();
        scheduler
            .set_target_service_time(a, ServiceTicks::new(20))
            .unwrap();

        scheduler.tick().unwrap();
        advance(&mut scheduler, 10);
        scheduler.tick().unwrap();
        assert_eq!(scheduler.lookup(a).unwrap().state(), UnitState::Running);

        advance(&mut scheduler, 10);
        assert_eq!(scheduler.tick().unwrap(), Dispatch::Idle);

        let record = scheduler.lookup(a).unwrap();
        assert_eq!(record.state(), UnitState::Terminated);
        assert_eq!(record.exit_reason(), Some(ExitReason::BudgetReached));
        assert_eq!(record.accumulated_service_time(), ServiceTicks::new(20));
        assert_eq!(record.context(), None);
        assert!(scheduler.is_finished());
    }

    #[test]
    fn test_zero_target_terminates_on_first_dispatch() {
        let mut scheduler = scheduler(10);
        let zero = scheduler.create("zero", Priority::new(1)).unwrap();
        let b = scheduler.create("B", Priority::new(1)).unwrap();
        scheduler
            .set_target_service_time(zero, ServiceTicks::zero())
            .unwrap();

        let dispatch = scheduler.tick().unwrap();
        assert_eq!(dispatch.running(), Some(b));

        let record = scheduler.lookup(zero).unwrap();
        assert_eq!(record.state(), UnitState::Terminated);
        assert_eq!(record.accumulated_service_time(), ServiceTicks::zero());
        assert_eq!(record.dispatch_count(), 1);
    }

    #[test]
    fn test_set_target_after_dispatch_rejected() {
        let mut scheduler = scheduler(10);
        let a = scheduler.create("A", Priority::new(1)).unwrap();
        scheduler.tick().unwrap();

        assert!(matches!(
            scheduler.set_target_service_time(a, ServiceTicks::new(5)),
            Err(SchedError::InvalidState(_))
        ));
    }

    #[test]
    fn test_create_fails_when_pool_full_then_recovers() {
        let config = SchedulerConfig {
            quantum_ticks: 5,
            max_units: 1,
            ..SchedulerConfig::default()
        };
        let mut scheduler = Scheduler::with_config(SimTimerDevice::new(), config).unwrap();
        let a = scheduler.create("A", Priority::new(1)).unwrap();
        scheduler
            .set_target_service_time(a, ServiceTicks::new(5))
            .unwrap();

        assert!(matches!(
            scheduler.create("B", Priority::new(1)),
            Err(SchedError::ResourceExhausted(_))
        ));

        scheduler.tick().unwrap();
        advance(&mut scheduler, 5);
        scheduler.tick().unwrap();
        assert!(scheduler.create("B", Priority::new(1)).is_ok());
    }

    #[test]
    fn test_higher_priority_preempts_within_one_tick() {
        let mut scheduler = scheduler(100);
        let low = scheduler.create("low", Priority::new(5)).unwrap();
        scheduler.tick().unwrap();
        advance(&mut scheduler, 3);

        let high = scheduler.create("high", Priority::new(1)).unwrap();
        let dispatch = scheduler.tick().unwrap();
        assert_eq!(
            dispatch,
            Dispatch::Switched {
                previous: Some(low),
                next: high
            }
        );
        assert_eq!(scheduler.lookup(low).unwrap().state(), UnitState::Runnable);
        assert!(scheduler.audit_log().iter().any(|event| matches!(
            event,
            ScheduleEvent::UnitPreempted {
                unit_id,
                reason: PreemptionReason::HigherPriority,
                ..
            } if *unit_id == low
        )));
    }

    #[test]
    fn test_lower_priority_never_runs_while_higher_is_ready() {
        let mut scheduler = scheduler(10);
        let high = scheduler.create("high", Priority::new(0)).unwrap();
        let low = scheduler.create("low", Priority::new(3)).unwrap();

        for _ in 0..5 {
            assert_eq!(scheduler.tick().unwrap().running(), Some(high));
            advance(&mut scheduler, 10);
        }
        assert!(!scheduler.lookup(low).unwrap().has_run());
    }

    #[test]
    fn test_yield_moves_to_tail() {
        let mut scheduler = scheduler(10);
        let a = scheduler.create("A", Priority::new(1)).unwrap();
        let b = scheduler.create("B", Priority::new(1)).unwrap();

        scheduler.tick().unwrap();
        advance(&mut scheduler, 2);
        let dispatch = scheduler.yield_now().unwrap();
        assert_eq!(dispatch.running(), Some(b));
        assert_eq!(
            scheduler.lookup(a).unwrap().accumulated_service_time(),
            ServiceTicks::new(2)
        );
        assert_eq!(scheduler.ready_queue().iter().collect::<Vec<_>>(), vec![a]);
    }

    #[test]
    fn test_yield_without_running_unit_fails() {
        let mut scheduler = scheduler(10);
        assert!(matches!(
            scheduler.yield_now(),
            Err(SchedError::InvalidState(_))
        ));
    }

    #[test]
    fn test_block_unblock() {
        let mut scheduler = scheduler(10);
        let a = scheduler.create("A", Priority::new(1)).unwrap();

        scheduler.tick().unwrap();
        advance(&mut scheduler, 3);
        assert_eq!(scheduler.block_current().unwrap(), Dispatch::Idle);
        assert_eq!(scheduler.lookup(a).unwrap().state(), UnitState::Blocked);
        assert_eq!(
            scheduler.lookup(a).unwrap().accumulated_service_time(),
            ServiceTicks::new(3)
        );

        advance(&mut scheduler, 50);
        scheduler.tick().unwrap();
        assert_eq!(
            scheduler.lookup(a).unwrap().accumulated_service_time(),
            ServiceTicks::new(3)
        );

        scheduler.unblock(a).unwrap();
        assert_eq!(scheduler.tick().unwrap().running(), Some(a));
        assert!(matches!(
            scheduler.unblock(a),
            Err(SchedError::InvalidState(_))
        ));
    }

    #[test]
    fn test_abort_running_unit() {
        let mut scheduler = scheduler(10);
        let a = scheduler.create("A", Priority::new(1)).unwrap();
        let b = scheduler.create("B", Priority::new(1)).unwrap();

        scheduler.tick().unwrap();
        advance(&mut scheduler, 4);
        scheduler.abort(a).unwrap();

        let record = scheduler.lookup(a).unwrap();
        assert_eq!(record.state(), UnitState::Terminated);
        assert_eq!(record.exit_reason(), Some(ExitReason::Aborted));
        assert_eq!(record.accumulated_service_time(), ServiceTicks::new(4));
        assert_eq!(scheduler.current(), None);

        assert_eq!(scheduler.tick().unwrap().running(), Some(b));
        assert!(matches!(
            scheduler.abort(a),
            Err(SchedError::InvalidState(_))
        ));
        scheduler.verify_invariants().unwrap();
    }

    #[test]
    fn test_abort_queued_unit_is_never_dispatched() {
        let mut scheduler = scheduler(10);
        let a = scheduler.create("A", Priority::new(1)).unwrap();
        let b = scheduler.create("B", Priority::new(1)).unwrap();

        scheduler.abort(b).unwrap();
        assert!(!scheduler.ready_queue().contains(b));

        for _ in 0..3 {
            assert_eq!(scheduler.tick().unwrap().running(), Some(a));
            advance(&mut scheduler, 10);
        }
        assert!(!scheduler.lookup(b).unwrap().has_run());
    }

    #[test]
    fn test_reclaim_then_lookup_not_found() {
        let mut scheduler = scheduler(10);
        let a = scheduler.create("A", Priority::new(1)).unwrap();
        scheduler.abort(a).unwrap();

        let record = scheduler.reclaim(a).unwrap();
        assert_eq!(record.id(), a);
        assert_eq!(scheduler.lookup(a).unwrap_err(), SchedError::NotFound(a));
        scheduler.verify_invariants().unwrap();
    }

    #[test]
    fn test_set_priority_requeues_at_new_level() {
        let mut scheduler = scheduler(10);
        let a = scheduler.create("A", Priority::new(2)).unwrap();
        let b = scheduler.create("B", Priority::new(2)).unwrap();

        scheduler.set_priority(b, Priority::new(0)).unwrap();
        assert_eq!(scheduler.tick().unwrap().running(), Some(b));
        assert_eq!(scheduler.lookup(b).unwrap().priority(), Priority::new(0));
        assert!(scheduler.ready_queue().contains(a));

        assert!(matches!(
            scheduler.set_priority(a, Priority::new(200)),
            Err(SchedError::InvalidState(_))
        ));
    }

    #[test]
    fn test_completions_are_pushed_in_order() {
        let mut scheduler = scheduler(1);
        let long = scheduler.create("long", Priority::new(1)).unwrap();
        let short = scheduler.create("short", Priority::new(1)).unwrap();
        scheduler
            .set_target_service_time(long, ServiceTicks::new(3))
            .unwrap();
        scheduler
            .set_target_service_time(short, ServiceTicks::new(1))
            .unwrap();

        let report = scheduler.run_forever().unwrap();
        assert_eq!(report.outcome, RunOutcome::Completed);
        let order: Vec<UnitId> = report.completions.iter().map(|c| c.unit_id).collect();
        assert_eq!(order, vec![short, long]);
        assert!(scheduler.drain_completions().is_empty());
    }

    #[test]
    fn test_run_forever_stalls_on_blocked_units() {
        let mut scheduler = scheduler(10);
        let a = scheduler.create("A", Priority::new(1)).unwrap();
        scheduler.tick().unwrap();
        scheduler.block_current().unwrap();

        let report = scheduler.run_forever().unwrap();
        assert_eq!(report.outcome, RunOutcome::Stalled);
        assert_eq!(scheduler.lookup(a).unwrap().state(), UnitState::Blocked);
    }

    #[test]
    fn test_run_forever_respects_dispatch_limit() {
        let config = SchedulerConfig {
            quantum_ticks: 10,
            max_dispatches: Some(5),
            ..SchedulerConfig::default()
        };
        let mut scheduler = Scheduler::with_config(SimTimerDevice::new(), config).unwrap();
        scheduler.create("forever", Priority::new(1)).unwrap();

        let report = scheduler.run_forever().unwrap();
        assert_eq!(report.outcome, RunOutcome::DispatchLimitReached);
        assert_eq!(report.stats.dispatches, 5);
    }

    #[test]
    fn test_idle_ticks_are_not_charged() {
        let mut scheduler = scheduler(10);
        assert_eq!(scheduler.tick().unwrap(), Dispatch::Idle);
        advance(&mut scheduler, 25);
        let a = scheduler.create("A", Priority::new(1)).unwrap();
        assert_eq!(scheduler.tick().unwrap().running(), Some(a));

        assert_eq!(scheduler.stats().idle_ticks, 25);
        assert_eq!(scheduler.stats().accounted_ticks, 0);
        assert_eq!(
            scheduler.lookup(a).unwrap().accumulated_service_time(),
            ServiceTicks::zero()
        );
    }

    #[test]
    fn test_audit_log_interleaving() {
        let mut scheduler = scheduler(5);
        let a = scheduler.create("A", Priority::new(1)).unwrap();
        let b = scheduler.create("B", Priority::new(1)).unwrap();
        scheduler.clear_audit_log();

        scheduler.tick().unwrap();
        advance(&mut scheduler, 5);
        scheduler.tick().unwrap();

        let log = scheduler.audit_log();
        // Expected: Dispatch(a), Preempt(a), Dispatch(b)
        assert_eq!(log.len(), 3);
        assert!(matches!(log[0], ScheduleEvent::UnitDispatched { unit_id, .. } if unit_id == a));
        assert!(matches!(
            log[1],
            ScheduleEvent::UnitPreempted {
                unit_id,
                reason: PreemptionReason::QuantumExpired,
                timestamp_ticks: 5,
                ..
            } if unit_id == a
        ));
        assert!(matches!(log[2], ScheduleEvent::UnitDispatched { unit_id, .. } if unit_id == b));
    }

    #[test]
    fn test_context_switch_counting() {
        let mut scheduler = scheduler(5);
        scheduler.create("solo", Priority::new(1)).unwrap();

        for _ in 0..4 {
            scheduler.tick().unwrap();
            advance(&mut scheduler, 5);
        }
        let stats = scheduler.stats();
        assert_eq!(stats.dispatches, 4);
        assert_eq!(stats.context_switches, 1);
        assert_eq!(stats.preemptions, 3);
    }

    #[test]
    fn test_deterministic_behavior() {
        fn run() -> Vec<ScheduleEvent> {
            let mut scheduler = scheduler(3);
            for (name, budget) in [("A", 7), ("B", 2), ("C", 5)] {
                let id = scheduler.create(name, Priority::new(1)).unwrap();
                scheduler
                    .set_target_service_time(id, ServiceTicks::new(budget))
                    .unwrap();
            }
            scheduler.run_forever().unwrap();
            scheduler.audit_log().iter().cloned().collect()
        }

        assert_eq!(run(), run());
    }

    #[test]
    fn test_audit_log_bounded_over_long_run() {
        let config = SchedulerConfig {
            quantum_ticks: 1,
            audit_capacity: Some(64),
            ..SchedulerConfig::default()
        };
        let mut scheduler = Scheduler::with_config(SimTimerDevice::new(), config).unwrap();
        let mut last = None;
        for name in ["A", "B"] {
            let id = scheduler.create(name, Priority::new(1)).unwrap();
            scheduler
                .set_target_service_time(id, ServiceTicks::new(20_000))
                .unwrap();
            last = Some(id);
        }

        let report = scheduler.run_forever().unwrap();
        assert_eq!(report.outcome, RunOutcome::Completed);
        assert_eq!(report.stats.accounted_ticks, 40_000);

        // Only the newest events survive
        let log = scheduler.audit_log();
        assert_eq!(log.len(), 64);
        assert!(matches!(log.back(), Some(ScheduleEvent::CoreIdle { .. })));
        assert!(matches!(
            log[log.len() - 2],
            ScheduleEvent::UnitTerminated { unit_id, .. } if Some(unit_id) == last
        ));
    }
}
