//! Schedulable unit records
//!
//! A [`UnitRecord`] is the scheduler's view of one independent thread of
//! control. Its mutable fields (`state`, accumulated service time, context
//! handle) are only writable from inside this crate; callers get shared
//! references and may read but never write them.

use crate::error::SchedError;
use core_types::{ContextSlot, Priority, ServiceTicks, UnitId};
use serde::{Deserialize, Serialize};

/// Unit state in the scheduler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnitState {
    /// Waiting in the ready queue
    Runnable,
    /// Currently occupying a processor
    Running,
    /// Waiting for an explicit `unblock`
    Blocked,
    /// Finished; never scheduled again
    Terminated,
}

/// Reason for unit termination
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExitReason {
    /// Accumulated service time reached the target
    BudgetReached,
    /// Terminated externally before reaching its target
    Aborted,
}

/// Unit metadata tracked by the scheduler
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitRecord {
    id: UnitId,
    name: String,
    priority: Priority,
    state: UnitState,
    accumulated: ServiceTicks,
    target: Option<ServiceTicks>,
    context: Option<ContextSlot>,
    dispatch_count: u64,
    exit_reason: Option<ExitReason>,
    created_at: u64,
    terminated_at: Option<u64>,
}

impl UnitRecord {
    pub(crate) fn new(
        id: UnitId,
        name: String,
        priority: Priority,
        context: ContextSlot,
        created_at: u64,
    ) -> Self {
        Self {
            id,
            name,
            priority,
            state: UnitState::Runnable,
            accumulated: ServiceTicks::zero(),
            target: None,
            context: Some(context),
            dispatch_count: 0,
            exit_reason: None,
            created_at,
            terminated_at: None,
        }
    }

    pub fn id(&self) -> UnitId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }

    pub fn state(&self) -> UnitState {
        self.state
    }

    /// Ticks this unit has spent in the `Running` state
    pub fn accumulated_service_time(&self) -> ServiceTicks {
        self.accumulated
    }

    /// The unit's budget; `None` means it never self-terminates
    pub fn target_service_time(&self) -> Option<ServiceTicks> {
        self.target
    }

    /// Context slot owned by this unit, released on termination
    pub fn context(&self) -> Option<ContextSlot> {
        self.context
    }

    /// Number of times the unit has been dispatched
    pub fn dispatch_count(&self) -> u64 {
        self.dispatch_count
    }

    pub fn exit_reason(&self) -> Option<ExitReason> {
        self.exit_reason
    }

    pub fn created_at(&self) -> u64 {
        self.created_at
    }

    pub fn terminated_at(&self) -> Option<u64> {
        self.terminated_at
    }

    /// Returns true once the unit has entered `Running` at least once
    pub fn has_run(&self) -> bool {
        self.dispatch_count > 0
    }

    pub fn is_terminated(&self) -> bool {
        self.state == UnitState::Terminated
    }

    /// Returns true if accumulated service time has met the target
    ///
    /// The completion check the unit itself would perform; a unit without a
    /// target never reaches its budget.
    pub fn budget_reached(&self) -> bool {
        self.target
            .map_or(false, |target| self.accumulated >= target)
    }

    /// Service time still owed to the unit, if it has a target
    pub fn remaining_service_time(&self) -> Option<ServiceTicks> {
        self.target
            .map(|target| target.saturating_sub(self.accumulated))
    }

    pub(crate) fn set_target(&mut self, target: ServiceTicks) -> Result<(), SchedError> {
        if self.is_terminated() {
            return Err(SchedError::invalid(format!(
                "{} is terminated; target cannot change",
                self.id
            )));
        }
        if self.has_run() {
            return Err(SchedError::invalid(format!(
                "{} has already been dispatched; target must be set before first run",
                self.id
            )));
        }
        if self.target.is_some() {
            return Err(SchedError::invalid(format!(
                "{} already has a target service time",
                self.id
            )));
        }
        self.target = Some(target);
        Ok(())
    }

    pub(crate) fn set_priority(&mut self, priority: Priority) {
        self.priority = priority;
    }

    /// Adds ticks actually spent on the processor
    pub(crate) fn charge(&mut self, delta: ServiceTicks) -> Result<(), SchedError> {
        if self.state != UnitState::Running {
            return Err(SchedError::invalid(format!(
                "cannot charge service time to {} in state {:?}",
                self.id, self.state
            )));
        }
        self.accumulated = self.accumulated.saturating_add(delta);
        Ok(())
    }

    pub(crate) fn mark_dispatched(&mut self) -> Result<(), SchedError> {
        self.transition(UnitState::Running)?;
        self.dispatch_count += 1;
        Ok(())
    }

    /// Moves the unit to `Terminated` and hands back its context slot
    pub(crate) fn terminate(
        &mut self,
        reason: ExitReason,
        now: u64,
    ) -> Result<Option<ContextSlot>, SchedError> {
        self.transition(UnitState::Terminated)?;
        self.exit_reason = Some(reason);
        self.terminated_at = Some(now);
        Ok(self.context.take())
    }

    /// Applies a state transition, rejecting the ones the lifecycle forbids
    pub(crate) fn transition(&mut self, to: UnitState) -> Result<(), SchedError> {
        use UnitState::*;

        let allowed = matches!(
            (self.state, to),
            (Runnable, Running)
                | (Running, Runnable)
                | (Running, Blocked)
                | (Blocked, Runnable)
                | (Runnable, Terminated)
                | (Running, Terminated)
                | (Blocked, Terminated)
        );
        if !allowed {
            return Err(SchedError::invalid(format!(
                "{} cannot move from {:?} to {:?}",
                self.id, self.state, to
            )));
        }
        self.state = to;
        Ok(())
    }
}
