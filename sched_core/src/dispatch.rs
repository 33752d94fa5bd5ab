//! Dispatch engine
//!
//! The accounting and state-transition logic shared by [`Scheduler`] and
//! [`MultiCoreScheduler`]. It owns the registry and the ready queue; each
//! processor contributes a [`CoreSlot`] holding the unit it is running.
//!
//! One scheduling point ([`DispatchCore::step`]) performs, in order:
//!
//! 1. charge the running unit with the ticks elapsed since its last
//!    checkpoint,
//! 2. retire it if its budget is met, or preempt it to the tail of its level
//!    if its quantum expired or a more urgent unit is waiting,
//! 3. if the core is now empty, dispatch the head of the ready queue.
//!
//! [`Scheduler`]: crate::scheduler::Scheduler
//! [`MultiCoreScheduler`]: crate::smp::MultiCoreScheduler

use crate::audit::{Completion, PreemptionReason, ScheduleEvent, SchedulerStats};
use crate::config::SchedulerConfig;
use crate::error::SchedError;
use crate::ready_queue::ReadyQueue;
use crate::registry::Registry;
use crate::unit::{ExitReason, UnitRecord, UnitState};
use core_types::{ContextSlot, CoreId, Priority, ServiceTicks, UnitId};
use log::{debug, info, trace};
use std::collections::{BTreeSet, VecDeque};

/// Dispatch decision taken at a scheduling point
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// Nothing is runnable; the core idles until the next event
    Idle,
    /// The running unit keeps the processor
    Continued(UnitId),
    /// Execution switched into `next`
    Switched {
        previous: Option<UnitId>,
        next: UnitId,
    },
}

impl Dispatch {
    /// The unit occupying the core after this decision
    pub fn running(&self) -> Option<UnitId> {
        match self {
            Dispatch::Idle => None,
            Dispatch::Continued(unit) => Some(*unit),
            Dispatch::Switched { next, .. } => Some(*next),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct Running {
    unit: UnitId,
    context: ContextSlot,
    /// Tick up to which service time has been charged
    checkpoint: u64,
    ticks_in_quantum: u64,
}

/// What one processor is doing
#[derive(Debug, Default)]
pub(crate) struct CoreSlot {
    running: Option<Running>,
    idle_since: Option<u64>,
}

impl CoreSlot {
    pub(crate) fn current(&self) -> Option<UnitId> {
        self.running.as_ref().map(|running| running.unit)
    }

    /// Ticks left before the running unit's quantum expires
    pub(crate) fn quantum_remaining(&self, quantum_ticks: u64) -> Option<u64> {
        self.running
            .as_ref()
            .map(|running| quantum_ticks.saturating_sub(running.ticks_in_quantum).max(1))
    }
}

pub(crate) struct DispatchCore {
    pub(crate) config: SchedulerConfig,
    pub(crate) registry: Registry,
    pub(crate) ready: ReadyQueue,
    completions: VecDeque<Completion>,
    audit_log: VecDeque<ScheduleEvent>,
    stats: SchedulerStats,
    /// Service time of records that have been reclaimed
    reclaimed_ticks: u64,
}

impl DispatchCore {
    /// Builds the engine; `config` must already be validated
    pub(crate) fn new(config: SchedulerConfig) -> Self {
        Self {
            registry: Registry::new(config.max_units, config.stack_size, config.priority_levels),
            ready: ReadyQueue::new(config.priority_levels),
            completions: VecDeque::new(),
            audit_log: VecDeque::new(),
            stats: SchedulerStats::default(),
            reclaimed_ticks: 0,
            config,
        }
    }

    pub(crate) fn create(
        &mut self,
        name: &str,
        priority: Priority,
        core_id: CoreId,
        now: u64,
    ) -> Result<UnitId, SchedError> {
        let unit_id = self.registry.create(name, priority, now)?;
        self.ready.enqueue(self.registry.lookup(unit_id)?)?;

        self.record(ScheduleEvent::UnitCreated {
            core_id,
            unit_id,
            priority,
            timestamp_ticks: now,
        });
        debug!("created {} {:?} at {}", unit_id, name, priority);
        Ok(unit_id)
    }

    pub(crate) fn set_target_service_time(
        &mut self,
        unit: UnitId,
        ticks: ServiceTicks,
    ) -> Result<(), SchedError> {
        self.registry.set_target_service_time(unit, ticks)?;
        debug!("{} target service time set to {}", unit, ticks);
        Ok(())
    }

    /// One scheduling point on `slot`
    pub(crate) fn step(
        &mut self,
        slot: &mut CoreSlot,
        core_id: CoreId,
        now: u64,
    ) -> Result<Dispatch, SchedError> {
        let previous = slot.current();

        if let Some(mut running) = slot.running.take() {
            self.account(&mut running, now)?;
            if let Some(running) = self.settle(running, core_id, now)? {
                let unit = running.unit;
                slot.running = Some(running);
                return Ok(Dispatch::Continued(unit));
            }
        } else if let Some(since) = slot.idle_since {
            self.stats.idle_ticks += now.saturating_sub(since);
            slot.idle_since = Some(now.max(since));
        }

        self.dispatch_next(slot, core_id, now, previous)
    }

    /// The running unit gives up the processor voluntarily
    pub(crate) fn yield_running(
        &mut self,
        slot: &mut CoreSlot,
        core_id: CoreId,
        now: u64,
    ) -> Result<Dispatch, SchedError> {
        let previous = slot.current();
        let mut running = slot
            .running
            .take()
            .ok_or_else(|| SchedError::invalid("no unit is running"))?;

        self.account(&mut running, now)?;
        if self.registry.lookup(running.unit)?.budget_reached() {
            self.retire(running.unit, ExitReason::BudgetReached, core_id, now)?;
        } else {
            self.preempt(running, PreemptionReason::Yielded, core_id, now)?;
        }
        self.dispatch_next(slot, core_id, now, previous)
    }

    /// The running unit enters a blocking wait
    pub(crate) fn block_running(
        &mut self,
        slot: &mut CoreSlot,
        core_id: CoreId,
        now: u64,
    ) -> Result<Dispatch, SchedError> {
        let previous = slot.current();
        let mut running = slot
            .running
            .take()
            .ok_or_else(|| SchedError::invalid("no unit is running"))?;

        self.account(&mut running, now)?;
        if self.registry.lookup(running.unit)?.budget_reached() {
            self.retire(running.unit, ExitReason::BudgetReached, core_id, now)?;
        } else {
            self.registry.contexts_mut().save(running.context, now)?;
            self.registry
                .lookup_mut(running.unit)?
                .transition(UnitState::Blocked)?;
            self.record(ScheduleEvent::UnitBlocked {
                core_id,
                unit_id: running.unit,
                timestamp_ticks: now,
            });
            debug!("{} blocked at {}", running.unit, now);
        }
        self.dispatch_next(slot, core_id, now, previous)
    }

    pub(crate) fn unblock(
        &mut self,
        unit: UnitId,
        core_id: CoreId,
        now: u64,
    ) -> Result<(), SchedError> {
        let record = self.registry.lookup_mut(unit)?;
        if record.state() != UnitState::Blocked {
            return Err(SchedError::invalid(format!(
                "{} is {:?}, not blocked",
                unit,
                record.state()
            )));
        }
        record.transition(UnitState::Runnable)?;
        self.ready.enqueue(record)?;

        self.record(ScheduleEvent::UnitUnblocked {
            core_id,
            unit_id: unit,
            timestamp_ticks: now,
        });
        debug!("{} unblocked at {}", unit, now);
        Ok(())
    }

    /// Terminates `unit` from outside
    ///
    /// `running_on` is the slot of the core currently running the unit, if
    /// any; the ticks it ran up to `now` are charged before it is retired.
    pub(crate) fn abort(
        &mut self,
        unit: UnitId,
        running_on: Option<&mut CoreSlot>,
        core_id: CoreId,
        now: u64,
    ) -> Result<(), SchedError> {
        if self.registry.lookup(unit)?.is_terminated() {
            return Err(SchedError::invalid(format!("{} is already terminated", unit)));
        }

        if let Some(slot) = running_on {
            if slot.current() == Some(unit) {
                if let Some(mut running) = slot.running.take() {
                    self.account(&mut running, now)?;
                }
                slot.idle_since = Some(now);
            }
        }
        self.retire(unit, ExitReason::Aborted, core_id, now)
    }

    /// Changes a unit's priority; a queued unit moves to the tail of its
    /// new level
    pub(crate) fn set_priority(&mut self, unit: UnitId, priority: Priority) -> Result<(), SchedError> {
        self.registry.check_priority(priority)?;
        if self.registry.lookup(unit)?.is_terminated() {
            return Err(SchedError::invalid(format!("{} is already terminated", unit)));
        }

        let was_queued = self.ready.remove(unit);
        let record = self.registry.lookup_mut(unit)?;
        record.set_priority(priority);
        if was_queued {
            self.ready.enqueue(record)?;
        }
        Ok(())
    }

    pub(crate) fn reclaim(&mut self, unit: UnitId) -> Result<UnitRecord, SchedError> {
        let record = self.registry.reclaim(unit)?;
        self.reclaimed_ticks += record.accumulated_service_time().as_u64();
        Ok(record)
    }

    pub(crate) fn reap_terminated(&mut self) -> Vec<UnitId> {
        self.registry
            .reap_terminated()
            .into_iter()
            .map(|record| {
                self.reclaimed_ticks += record.accumulated_service_time().as_u64();
                record.id()
            })
            .collect()
    }

    pub(crate) fn drain_completions(&mut self) -> Vec<Completion> {
        self.completions.drain(..).collect()
    }

    pub(crate) fn stats(&self) -> SchedulerStats {
        self.stats
    }

    pub(crate) fn audit_log(&self) -> &VecDeque<ScheduleEvent> {
        &self.audit_log
    }

    /// Appends to the audit log, evicting the oldest events past capacity
    fn record(&mut self, event: ScheduleEvent) {
        if let Some(capacity) = self.config.audit_capacity {
            while self.audit_log.len() >= capacity {
                self.audit_log.pop_front();
            }
        }
        self.audit_log.push_back(event);
    }

    pub(crate) fn clear_audit_log(&mut self) {
        self.audit_log.clear();
    }

    /// Checks the structural invariants across the given core slots
    pub(crate) fn verify(&self, slots: &[&CoreSlot]) -> Result<(), SchedError> {
        let mut running = BTreeSet::new();
        for unit in slots.iter().filter_map(|slot| slot.current()) {
            if !running.insert(unit) {
                return Err(SchedError::invalid(format!("{} runs on two cores", unit)));
            }
            if self.ready.contains(unit) {
                return Err(SchedError::invalid(format!("{} is running and queued", unit)));
            }
            if self.registry.lookup(unit)?.state() != UnitState::Running {
                return Err(SchedError::invalid(format!("{} occupies a core but is not Running", unit)));
            }
        }

        for unit in self.ready.iter() {
            let state = self.registry.lookup(unit)?.state();
            if state != UnitState::Runnable {
                return Err(SchedError::invalid(format!("{} is queued in state {:?}", unit, state)));
            }
        }

        for record in self.registry.iter() {
            if record.state() == UnitState::Running && !running.contains(&record.id()) {
                return Err(SchedError::invalid(format!("{} is Running on no core", record.id())));
            }
            if record.state() == UnitState::Runnable && !self.ready.contains(record.id()) {
                return Err(SchedError::invalid(format!("{} is Runnable but not queued", record.id())));
            }
            if record.is_terminated() == record.context().is_some() {
                return Err(SchedError::invalid(format!(
                    "{} context ownership does not match state {:?}",
                    record.id(),
                    record.state()
                )));
            }
        }

        let charged = self.registry.total_service_time().as_u64() + self.reclaimed_ticks;
        if charged != self.stats.accounted_ticks {
            return Err(SchedError::invalid(format!(
                "units hold {} ticks but {} were accounted",
                charged, self.stats.accounted_ticks
            )));
        }
        Ok(())
    }

    /// Step 1: charge elapsed ticks to the running unit
    fn account(&mut self, running: &mut Running, now: u64) -> Result<(), SchedError> {
        let delta = now.saturating_sub(running.checkpoint);
        if delta == 0 {
            return Ok(());
        }
        running.checkpoint = now;
        running.ticks_in_quantum += delta;

        self.registry
            .lookup_mut(running.unit)?
            .charge(ServiceTicks::new(delta))?;
        self.stats.accounted_ticks += delta;
        trace!("charged {} ticks to {}", delta, running.unit);
        Ok(())
    }

    /// Step 2: retire, preempt, or keep the running unit
    fn settle(
        &mut self,
        running: Running,
        core_id: CoreId,
        now: u64,
    ) -> Result<Option<Running>, SchedError> {
        let record = self.registry.lookup(running.unit)?;
        if record.budget_reached() {
            self.retire(running.unit, ExitReason::BudgetReached, core_id, now)?;
            return Ok(None);
        }

        let outranked = self
            .ready
            .highest_priority()
            .map_or(false, |waiting| waiting.is_higher_than(record.priority()));
        let reason = if running.ticks_in_quantum >= self.config.quantum_ticks {
            Some(PreemptionReason::QuantumExpired)
        } else if outranked {
            Some(PreemptionReason::HigherPriority)
        } else {
            None
        };

        match reason {
            Some(reason) => {
                self.preempt(running, reason, core_id, now)?;
                Ok(None)
            }
            None => Ok(Some(running)),
        }
    }

    fn preempt(
        &mut self,
        running: Running,
        reason: PreemptionReason,
        core_id: CoreId,
        now: u64,
    ) -> Result<(), SchedError> {
        self.registry.contexts_mut().save(running.context, now)?;
        let record = self.registry.lookup_mut(running.unit)?;
        record.transition(UnitState::Runnable)?;
        self.ready.enqueue(record)?;

        self.stats.preemptions += 1;
        self.record(ScheduleEvent::UnitPreempted {
            core_id,
            unit_id: running.unit,
            reason,
            timestamp_ticks: now,
        });
        trace!("{} preempted ({:?}) at {}", running.unit, reason, now);
        Ok(())
    }

    /// Moves `unit` to `Terminated`, releases its context and posts the
    /// completion notice
    fn retire(
        &mut self,
        unit: UnitId,
        reason: ExitReason,
        core_id: CoreId,
        now: u64,
    ) -> Result<(), SchedError> {
        self.ready.remove(unit);
        let record = self.registry.lookup_mut(unit)?;
        let context = record.terminate(reason, now)?;
        let completion = Completion {
            unit_id: unit,
            name: record.name().to_string(),
            accumulated: record.accumulated_service_time(),
            target: record.target_service_time(),
            reason,
            finished_at: now,
        };
        self.registry.release_context(context);

        info!(
            "{} {:?} terminated ({:?}) after {} at {}",
            unit, completion.name, reason, completion.accumulated, now
        );
        self.record(ScheduleEvent::UnitTerminated {
            core_id,
            unit_id: unit,
            reason,
            timestamp_ticks: now,
        });
        self.completions.push_back(completion);
        Ok(())
    }

    /// Step 3: move the head of the ready queue onto the core
    fn dispatch_next(
        &mut self,
        slot: &mut CoreSlot,
        core_id: CoreId,
        now: u64,
        previous: Option<UnitId>,
    ) -> Result<Dispatch, SchedError> {
        while let Some(unit) = self.ready.dequeue_next() {
            let record = self.registry.lookup_mut(unit)?;
            record.mark_dispatched()?;
            let budget_met = record.budget_reached();
            let context = record.context();

            self.stats.dispatches += 1;
            self.record(ScheduleEvent::UnitDispatched {
                core_id,
                unit_id: unit,
                timestamp_ticks: now,
            });

            if budget_met {
                // Zero budget: done after zero accounted ticks
                self.retire(unit, ExitReason::BudgetReached, core_id, now)?;
                continue;
            }

            let context = context
                .ok_or_else(|| SchedError::invalid(format!("{} has no execution context", unit)))?;
            self.registry.contexts_mut().resume(context)?;
            if previous != Some(unit) {
                self.stats.context_switches += 1;
            }

            slot.running = Some(Running {
                unit,
                context,
                checkpoint: now,
                ticks_in_quantum: 0,
            });
            slot.idle_since = None;
            trace!("{} dispatched on {} at {}", unit, core_id, now);
            return Ok(Dispatch::Switched {
                previous,
                next: unit,
            });
        }

        if slot.idle_since.is_none() {
            slot.idle_since = Some(now);
            self.record(ScheduleEvent::CoreIdle {
                core_id,
                timestamp_ticks: now,
            });
            trace!("{} idle at {}", core_id, now);
        }
        Ok(Dispatch::Idle)
    }
}
