//! SMP: multi-core scheduler and per-core time sources.
//!
//! All cores share one registry and one ready queue, so a unit preempted on
//! one core may resume on another. Each core reads its own clock and charges
//! the unit it runs against that clock only.

use crate::audit::{Completion, ScheduleEvent, SchedulerStats};
use crate::config::SchedulerConfig;
use crate::dispatch::{CoreSlot, Dispatch, DispatchCore};
use crate::error::SchedError;
use crate::registry::Registry;
use crate::scheduler::{RunOutcome, RunReport};
use crate::timer::SimTimerDevice;
use crate::unit::UnitRecord;
use core_types::{CoreId, Priority, ServiceTicks, UnitId};
use hal::{TickWait, TimerDevice};
use log::{debug, warn};
use std::collections::VecDeque;

/// Core that creation and unblocking are attributed to
const BOOT_CORE: CoreId = CoreId(0);

/// Per-core time sources
#[derive(Debug, Clone)]
pub struct PerCoreClocks<C> {
    clocks: Vec<C>,
}

impl<C> PerCoreClocks<C> {
    pub fn new(clocks: Vec<C>) -> Self {
        Self { clocks }
    }

    pub fn core_count(&self) -> usize {
        self.clocks.len()
    }

    pub fn get(&self, core_id: CoreId) -> Option<&C> {
        self.clocks.get(core_id.0)
    }

    pub fn get_mut(&mut self, core_id: CoreId) -> Option<&mut C> {
        self.clocks.get_mut(core_id.0)
    }
}

impl PerCoreClocks<SimTimerDevice> {
    /// `core_count` simulated clocks, all starting at tick 0
    pub fn simulated(core_count: usize) -> Self {
        Self::new((0..core_count).map(|_| SimTimerDevice::new()).collect())
    }

    pub fn ticks(&self, core_id: CoreId) -> u64 {
        self.get(core_id).map_or(0, SimTimerDevice::current_ticks)
    }

    pub fn advance(&mut self, core_id: CoreId, delta: u64) {
        if let Some(clock) = self.get_mut(core_id) {
            clock.advance_ticks(delta);
        }
    }
}

/// Deterministic multi-core scheduler.
pub struct MultiCoreScheduler<C> {
    dispatcher: DispatchCore,
    clocks: PerCoreClocks<C>,
    slots: Vec<CoreSlot>,
}

impl<C: TimerDevice> MultiCoreScheduler<C> {
    /// One core per clock
    pub fn with_config(
        clocks: PerCoreClocks<C>,
        config: SchedulerConfig,
    ) -> Result<Self, SchedError> {
        config.validate()?;
        if clocks.core_count() == 0 {
            return Err(SchedError::invalid("at least one core is required"));
        }
        let slots = (0..clocks.core_count())
            .map(|_| CoreSlot::default())
            .collect();
        Ok(Self {
            dispatcher: DispatchCore::new(config),
            clocks,
            slots,
        })
    }

    pub fn core_count(&self) -> usize {
        self.slots.len()
    }

    fn now(&mut self, core_id: CoreId) -> Result<u64, SchedError> {
        self.clocks
            .get_mut(core_id)
            .map(|clock| clock.poll_ticks())
            .ok_or_else(|| SchedError::invalid(format!("no such core: {}", core_id)))
    }

    fn slot_index(&self, core_id: CoreId) -> Result<usize, SchedError> {
        if core_id.0 < self.slots.len() {
            Ok(core_id.0)
        } else {
            Err(SchedError::invalid(format!("no such core: {}", core_id)))
        }
    }

    pub fn create(&mut self, name: &str, priority: Priority) -> Result<UnitId, SchedError> {
        let now = self.now(BOOT_CORE)?;
        self.dispatcher.create(name, priority, BOOT_CORE, now)
    }

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

    /// Runs one scheduling point on `core_id`
    pub fn tick_core(&mut self, core_id: CoreId) -> Result<Dispatch, SchedError> {
        let index = self.slot_index(core_id)?;
        let now = self.now(core_id)?;
        self.dispatcher.step(&mut self.slots[index], core_id, now)
    }

    /// Runs one scheduling point on every core
    ///
    /// Idle cores go first, so a newly runnable unit lands on a free core
    /// instead of preempting a busy one. Results are indexed by core id.
    pub fn tick_all(&mut self) -> Result<Vec<Dispatch>, SchedError> {
        let (idle, busy): (Vec<usize>, Vec<usize>) =
            (0..self.slots.len()).partition(|&index| self.slots[index].current().is_none());

        let mut dispatches = vec![Dispatch::Idle; self.slots.len()];
        for index in idle.into_iter().chain(busy) {
            dispatches[index] = self.tick_core(CoreId(index))?;
        }
        Ok(dispatches)
    }

    pub fn yield_core(&mut self, core_id: CoreId) -> Result<Dispatch, SchedError> {
        let index = self.slot_index(core_id)?;
        let now = self.now(core_id)?;
        self.dispatcher
            .yield_running(&mut self.slots[index], core_id, now)
    }

    pub fn block_core(&mut self, core_id: CoreId) -> Result<Dispatch, SchedError> {
        let index = self.slot_index(core_id)?;
        let now = self.now(core_id)?;
        self.dispatcher
            .block_running(&mut self.slots[index], core_id, now)
    }

    pub fn unblock(&mut self, unit: UnitId) -> Result<(), SchedError> {
        let now = self.now(BOOT_CORE)?;
        self.dispatcher.unblock(unit, BOOT_CORE, now)
    }

    /// Terminates `unit`, charging it up to the clock of the core running it
    pub fn abort(&mut self, unit: UnitId) -> Result<(), SchedError> {
        let core_id = self.running_on(unit).unwrap_or(BOOT_CORE);
        let now = self.now(core_id)?;
        let slot = self.slots.get_mut(core_id.0);
        self.dispatcher.abort(unit, slot, core_id, now)
    }

    pub fn set_priority(&mut self, unit: UnitId, priority: Priority) -> Result<(), SchedError> {
        self.dispatcher.set_priority(unit, priority)
    }

    pub fn reclaim(&mut self, unit: UnitId) -> Result<UnitRecord, SchedError> {
        self.dispatcher.reclaim(unit)
    }

    pub fn drain_completions(&mut self) -> Vec<Completion> {
        self.dispatcher.drain_completions()
    }

    /// The core currently running `unit`, if any
    pub fn running_on(&self, unit: UnitId) -> Option<CoreId> {
        self.slots
            .iter()
            .position(|slot| slot.current() == Some(unit))
            .map(CoreId)
    }

    pub fn current(&self, core_id: CoreId) -> Option<UnitId> {
        self.slots.get(core_id.0).and_then(CoreSlot::current)
    }

    pub fn is_finished(&self) -> bool {
        self.slots.iter().all(|slot| slot.current().is_none())
            && self.dispatcher.registry.live_count() == 0
    }

    pub fn registry(&self) -> &Registry {
        &self.dispatcher.registry
    }

    pub fn clocks(&self) -> &PerCoreClocks<C> {
        &self.clocks
    }

    pub fn clocks_mut(&mut self) -> &mut PerCoreClocks<C> {
        &mut self.clocks
    }

    pub fn stats(&self) -> SchedulerStats {
        self.dispatcher.stats()
    }

    pub fn audit_log(&self) -> &VecDeque<ScheduleEvent> {
        self.dispatcher.audit_log()
    }

    pub fn verify_invariants(&self) -> Result<(), SchedError> {
        let slots: Vec<&CoreSlot> = self.slots.iter().collect();
        self.dispatcher.verify(&slots)
    }

    fn latest_tick(&mut self) -> u64 {
        (0..self.slots.len())
            .filter_map(|index| self.clocks.get_mut(CoreId(index)).map(|clock| clock.poll_ticks()))
            .max()
            .unwrap_or(0)
    }
}

impl<C: TickWait> MultiCoreScheduler<C> {
    /// Drives every core until all units have terminated
    ///
    /// Each round ticks all cores, then parks every busy core's clock at its
    /// quantum boundary and every idle core's clock at the latest of those.
    pub fn run_forever(&mut self) -> Result<RunReport, SchedError> {
        let started_at = self.latest_tick();
        let quantum = self.dispatcher.config.quantum_ticks;
        let limit = self.dispatcher.config.max_dispatches;
        let mut completions = Vec::new();

        let outcome = loop {
            self.tick_all()?;
            completions.extend(self.drain_completions());

            if self.is_finished() {
                break RunOutcome::Completed;
            }
            if self.slots.iter().all(|slot| slot.current().is_none()) {
                warn!("all cores idle with blocked units remaining");
                break RunOutcome::Stalled;
            }
            if limit.map_or(false, |limit| self.stats().dispatches >= limit) {
                warn!("dispatch limit reached before all units terminated");
                break RunOutcome::DispatchLimitReached;
            }

            let mut latest_deadline = 0;
            for index in 0..self.slots.len() {
                let Some(remaining) = self.slots[index].quantum_remaining(quantum) else {
                    continue;
                };
                if let Some(clock) = self.clocks.get_mut(CoreId(index)) {
                    let deadline = clock.poll_ticks().saturating_add(remaining);
                    clock.wait_until(deadline);
                    latest_deadline = latest_deadline.max(deadline);
                }
            }
            // Idle cores sit out the round so their idle time is counted
            for index in 0..self.slots.len() {
                if self.slots[index].current().is_some() {
                    continue;
                }
                if let Some(clock) = self.clocks.get_mut(CoreId(index)) {
                    clock.wait_until(latest_deadline);
                }
            }
        };

        let report = RunReport {
            outcome,
            completions,
            started_at,
            finished_at: self.latest_tick(),
            stats: self.stats(),
        };
        debug!(
            "{}-core run ended {:?} after {} ticks",
            self.slots.len(),
            report.outcome,
            report.elapsed_ticks()
        );
        Ok(report)
    }
}
