//! Scheduling audit trail and completion notices

use crate::unit::ExitReason;
use core_types::{CoreId, Priority, ServiceTicks, UnitId};
use serde::{Deserialize, Serialize};

/// Scheduling event for audit trail
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScheduleEvent {
    /// Unit was registered and queued
    UnitCreated {
        core_id: CoreId,
        unit_id: UnitId,
        priority: Priority,
        timestamp_ticks: u64,
    },
    /// Unit was selected to run
    UnitDispatched {
        core_id: CoreId,
        unit_id: UnitId,
        timestamp_ticks: u64,
    },
    /// Unit left the processor but stays runnable
    UnitPreempted {
        core_id: CoreId,
        unit_id: UnitId,
        reason: PreemptionReason,
        timestamp_ticks: u64,
    },
    /// Running unit entered a blocking wait
    UnitBlocked {
        core_id: CoreId,
        unit_id: UnitId,
        timestamp_ticks: u64,
    },
    /// Blocked unit became runnable again
    UnitUnblocked {
        core_id: CoreId,
        unit_id: UnitId,
        timestamp_ticks: u64,
    },
    /// Unit terminated
    UnitTerminated {
        core_id: CoreId,
        unit_id: UnitId,
        reason: ExitReason,
        timestamp_ticks: u64,
    },
    /// Core found nothing to run
    CoreIdle {
        core_id: CoreId,
        timestamp_ticks: u64,
    },
}

impl ScheduleEvent {
    /// The unit the event is about, if any
    pub fn unit_id(&self) -> Option<UnitId> {
        match self {
            ScheduleEvent::UnitCreated { unit_id, .. }
            | ScheduleEvent::UnitDispatched { unit_id, .. }
            | ScheduleEvent::UnitPreempted { unit_id, .. }
            | ScheduleEvent::UnitBlocked { unit_id, .. }
            | ScheduleEvent::UnitUnblocked { unit_id, .. }
            | ScheduleEvent::UnitTerminated { unit_id, .. } => Some(*unit_id),
            ScheduleEvent::CoreIdle { .. } => None,
        }
    }
}

/// Reason for preemption
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PreemptionReason {
    /// Time quantum expired
    QuantumExpired,
    /// A more urgent unit became runnable
    HigherPriority,
    /// Unit yielded voluntarily
    Yielded,
}

/// Notice pushed when a unit terminates
///
/// Drivers drain these instead of polling each unit's counter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Completion {
    pub unit_id: UnitId,
    pub name: String,
    pub accumulated: ServiceTicks,
    pub target: Option<ServiceTicks>,
    pub reason: ExitReason,
    pub finished_at: u64,
}

impl Completion {
    /// Service time granted beyond the target
    pub fn overshoot(&self) -> ServiceTicks {
        self.target
            .map_or(ServiceTicks::zero(), |target| {
                self.accumulated.saturating_sub(target)
            })
    }
}

/// Aggregate counters kept by the dispatch loop
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerStats {
    /// Units moved from the ready queue into a running slot
    pub dispatches: u64,
    /// Dispatches that changed which unit occupied a core
    pub context_switches: u64,
    /// Preemptions of any reason
    pub preemptions: u64,
    /// Ticks charged to units
    pub accounted_ticks: u64,
    /// Ticks during which a core had nothing to run
    pub idle_ticks: u64,
}
